// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebP: a RIFF container whose first sub-chunk tag selects one of three
//! dimension encodings. All three fit inside the leading window, so no
//! further reads are needed.

use crate::{ParseFailure, ParseResult, SHORT_HEADER, le_u16_at, le_u24_at, u8_at};

pub(crate) fn parse(prefix: &[u8]) -> ParseResult {
    match prefix.get(12..16) {
        Some(b"VP8 ") => parse_lossy(prefix),
        Some(b"VP8L") => parse_lossless(prefix),
        Some(b"VP8X") => parse_extended(prefix),
        Some(_) => Err(ParseFailure("unrecognized first chunk in WEBP form")),
        None => Err(SHORT_HEADER),
    }
}

/// Lossy bitstream: a fixed frame header with a 3-byte start code, then
/// 16-bit little-endian words whose low 14 bits are the dimension and whose
/// top 2 bits are a scaling hint we discard.
fn parse_lossy(prefix: &[u8]) -> ParseResult {
    if prefix.get(23..26) != Some(&[0x9d, 0x01, 0x2a][..]) {
        return Err(ParseFailure("missing VP8 frame start code"));
    }
    let width = le_u16_at(prefix, 26)? & 0x3fff;
    let height = le_u16_at(prefix, 28)? & 0x3fff;
    Ok((width.into(), height.into()))
}

/// Lossless bitstream: after the 0x2F signature byte, width-1 and height-1
/// are 14-bit fields packed LSB-first across the next four bytes.
fn parse_lossless(prefix: &[u8]) -> ParseResult {
    if u8_at(prefix, 20)? != 0x2f {
        return Err(ParseFailure("missing VP8L signature byte"));
    }
    let b0 = u32::from(u8_at(prefix, 21)?);
    let b1 = u32::from(u8_at(prefix, 22)?);
    let b2 = u32::from(u8_at(prefix, 23)?);
    let b3 = u32::from(u8_at(prefix, 24)?);
    let width = 1 + (((b1 & 0x3f) << 8) | b0);
    let height = 1 + (((b3 & 0x0f) << 10) | (b2 << 2) | (b1 >> 6));
    Ok((width.into(), height.into()))
}

/// Extended container: canvas size as 24-bit little-endian minus-one fields.
fn parse_extended(prefix: &[u8]) -> ParseResult {
    let width = u64::from(le_u24_at(prefix, 24)?) + 1;
    let height = u64::from(le_u24_at(prefix, 27)?) + 1;
    Ok((width, height))
}
