// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsers for formats whose dimensions sit at fixed offsets inside the
//! leading window: one header read, no further seeking.

use crate::{
    ParseFailure, ParseResult, be_u32_at, le_i16_at, le_i32_at, le_u16_at, le_u32_at,
};

pub(crate) fn parse_gif(prefix: &[u8]) -> ParseResult {
    let width = le_u16_at(prefix, 6)?;
    let height = le_u16_at(prefix, 8)?;
    Ok((width.into(), height.into()))
}

/// PNG requires `IHDR` to be the very first chunk, so the dimensions are at
/// fixed offsets despite the chunked container.
pub(crate) fn parse_png(prefix: &[u8]) -> ParseResult {
    let chunk_len = be_u32_at(prefix, 8)?;
    if chunk_len < 8 {
        return Err(ParseFailure("first chunk too small for IHDR"));
    }
    if prefix.get(12..16) != Some(&b"IHDR"[..]) {
        return Err(ParseFailure("first chunk is not IHDR"));
    }
    let width = be_u32_at(prefix, 16)?;
    let height = be_u32_at(prefix, 20)?;
    Ok((width.into(), height.into()))
}

/// The header-size field at offset 14 selects between the Windows 2.0 core
/// header (16-bit fields at 18/20) and the info header (32-bit at 18/22).
pub(crate) fn parse_bmp(prefix: &[u8]) -> ParseResult {
    let file_size = le_u32_at(prefix, 2)? as usize;
    let available = file_size.min(prefix.len());
    if available < 22 {
        return Err(ParseFailure("file too small for any bitmap header"));
    }
    let header_size = le_u32_at(prefix, 14)?;
    if header_size == 12 {
        let width = le_i16_at(prefix, 18)?;
        let height = le_i16_at(prefix, 20)?;
        if width <= 0 || height == 0 {
            return Err(ParseFailure("core header dimensions out of range"));
        }
        // negative height means the rows are stored bottom-up
        Ok((width as u64, u64::from(height.unsigned_abs())))
    } else {
        if available < 26 || header_size < 12 {
            return Err(ParseFailure("truncated or malformed info header"));
        }
        let width = le_i32_at(prefix, 18)?;
        let height = le_i32_at(prefix, 22)?;
        if width <= 0 || height == 0 {
            return Err(ParseFailure("info header dimensions out of range"));
        }
        Ok((width as u64, u64::from(height.unsigned_abs())))
    }
}

pub(crate) fn parse_qoi(prefix: &[u8]) -> ParseResult {
    let width = be_u32_at(prefix, 4)?;
    let height = be_u32_at(prefix, 8)?;
    Ok((width.into(), height.into()))
}

// PSD stores height before width.
pub(crate) fn parse_psd(prefix: &[u8]) -> ParseResult {
    let height = be_u32_at(prefix, 14)?;
    let width = be_u32_at(prefix, 18)?;
    Ok((width.into(), height.into()))
}

pub(crate) fn parse_xcf(prefix: &[u8]) -> ParseResult {
    let width = be_u32_at(prefix, 14)?;
    let height = be_u32_at(prefix, 18)?;
    Ok((width.into(), height.into()))
}

/// PCX stores an inclusive window rather than a size.
pub(crate) fn parse_pcx(prefix: &[u8]) -> ParseResult {
    let x_min = i64::from(le_u16_at(prefix, 4)?);
    let y_min = i64::from(le_u16_at(prefix, 6)?);
    let x_max = i64::from(le_u16_at(prefix, 8)?);
    let y_max = i64::from(le_u16_at(prefix, 10)?);
    let width = x_max - x_min + 1;
    let height = y_max - y_min + 1;
    if width <= 0 || height <= 0 {
        return Err(ParseFailure("window coordinates are inverted"));
    }
    Ok((width as u64, height as u64))
}

pub(crate) fn parse_dds(prefix: &[u8]) -> ParseResult {
    // DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT minimum
    let flags = le_u32_at(prefix, 8)?;
    if flags & 0x1007 == 0 {
        return Err(ParseFailure("required DDS header flags missing"));
    }
    let height = le_u32_at(prefix, 12)?;
    let width = le_u32_at(prefix, 16)?;
    Ok((width.into(), height.into()))
}

/// Dimensions only; the footer that makes TGA detectable at all was already
/// verified during dispatch.
pub(crate) fn parse_tga(prefix: &[u8]) -> ParseResult {
    let width = le_u16_at(prefix, 12)?;
    let height = le_u16_at(prefix, 14)?;
    if width == 0 || height == 0 {
        return Err(ParseFailure("zero dimension in TGA header"));
    }
    Ok((width.into(), height.into()))
}
