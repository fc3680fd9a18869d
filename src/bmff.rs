// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ISO Base Media File Format box walking, shared by AVIF/HEIC and the JP2
//! flavor of JPEG 2000.
//!
//! Boxes are length-prefixed: 4-byte size, 4-byte type, then content. A
//! size of 1 switches to a 64-bit size following the type; a size of 0
//! means "to end of file" and is only valid for the last top-level box.
//! See ISO 14496-12:2015 § 4.2.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::{ParseFailure, ParseResult, ProbeLimits, be_u32, be_u32_at, be_u64, skip_fwd};

/// 4-byte size + 4-byte type
const MIN_BOX_SIZE: u64 = 8;
/// 4-byte size + 4-byte type + 8-byte size
const MIN_LARGE_BOX_SIZE: u64 = 16;

/// Box type tag, printable for the traversal log.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct FourCC(pub(crate) [u8; 4]);

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => write!(f, "{:02x?}", self.0),
        }
    }
}

struct BoxHeader {
    kind: FourCC,
    /// Bytes occupied by the size/type fields themselves.
    header_len: u64,
    /// Declared content length; `u64::MAX` when the box runs to EOF.
    content_len: u64,
}

fn read_box_header<R: Read>(src: &mut R) -> ParseResult<BoxHeader> {
    let size32 = be_u32(src)?;
    let mut kind = [0u8; 4];
    src.read_exact(&mut kind)?;
    let kind = FourCC(kind);
    match size32 {
        // valid only for the last top-level box, usually mdat
        0 => Ok(BoxHeader { kind, header_len: MIN_BOX_SIZE, content_len: u64::MAX }),
        1 => {
            let size64 = be_u64(src)?;
            if size64 < MIN_LARGE_BOX_SIZE {
                return Err(ParseFailure("malformed wide box size"));
            }
            Ok(BoxHeader {
                kind,
                header_len: MIN_LARGE_BOX_SIZE,
                content_len: size64 - MIN_LARGE_BOX_SIZE,
            })
        }
        _ => {
            let size = u64::from(size32);
            if size < MIN_BOX_SIZE {
                return Err(ParseFailure("malformed box size"));
            }
            Ok(BoxHeader { kind, header_len: MIN_BOX_SIZE, content_len: size - MIN_BOX_SIZE })
        }
    }
}

/// Scan sibling boxes forward until `kind` is found, skipping the others by
/// their declared lengths. `budget` bounds the scan to the parent box's
/// content (`u64::MAX` for the unbounded top level). On success the source
/// is positioned at the box content and its declared length is returned.
fn find_box<R: Read + Seek>(
    src: &mut R,
    kind: &[u8; 4],
    mut budget: u64,
    limits: &ProbeLimits,
) -> ParseResult<u64> {
    let mut scanned = 0u32;
    loop {
        if scanned >= limits.max_boxes_per_level {
            return Err(ParseFailure("box scan limit exceeded"));
        }
        scanned += 1;

        if budget != u64::MAX && budget < MIN_BOX_SIZE {
            return Err(ParseFailure("parent box ended before target box"));
        }
        let head = read_box_header(src)?;
        if budget != u64::MAX {
            let remaining = budget
                .checked_sub(head.header_len)
                .ok_or(ParseFailure("box overruns its parent"))?;
            if head.content_len == u64::MAX || head.content_len > remaining {
                return Err(ParseFailure("box overruns its parent"));
            }
            budget = remaining - head.content_len;
        }
        if head.kind.0 == *kind {
            return Ok(head.content_len);
        }
        debug!("skipping '{}' ({} bytes)", head.kind, head.content_len);
        if head.content_len == u64::MAX {
            return Err(ParseFailure("unsized box before target box"));
        }
        skip_fwd(src, head.content_len)?;
    }
}

/// AVIF/HEIC: the image spatial extents live at `meta` > `iprp` > `ipco` >
/// `ispe`, each a plain container except `meta`, which is a full box with a
/// 4-byte version/flags field. See ISO 23008-12:2017 § 6.5.3.
pub(crate) fn parse_ispe<R: Read + Seek>(
    src: &mut R,
    prefix: &[u8],
    limits: &ProbeLimits,
) -> ParseResult {
    let ftyp_size = u64::from(be_u32_at(prefix, 0)?);
    if ftyp_size < 12 {
        return Err(ParseFailure("ftyp box too small"));
    }
    src.seek(SeekFrom::Start(ftyp_size))?;

    let meta_len = find_box(src, b"meta", u64::MAX, limits)?;
    if meta_len < 4 {
        return Err(ParseFailure("meta box too small for version field"));
    }
    skip_fwd(src, 4)?; // meta is a full box
    let iprp_len = find_box(src, b"iprp", meta_len - 4, limits)?;
    let ipco_len = find_box(src, b"ipco", iprp_len, limits)?;
    let ispe_len = find_box(src, b"ispe", ipco_len, limits)?;
    if ispe_len < 12 {
        return Err(ParseFailure("ispe box too small"));
    }
    skip_fwd(src, 4)?; // ispe version/flags
    let width = be_u32(src)?;
    let height = be_u32(src)?;
    Ok((width.into(), height.into()))
}

/// JP2: after the 12-byte signature box and the `ftyp` box, the codestream
/// header lives at `jp2h` > `ihdr`, height before width.
pub(crate) fn parse_jp2<R: Read + Seek>(
    src: &mut R,
    prefix: &[u8],
    limits: &ProbeLimits,
) -> ParseResult {
    if prefix.get(16..24) != Some(&b"ftypjp2 "[..]) {
        return Err(ParseFailure("signature box not followed by jp2 ftyp"));
    }
    let ftyp_size = u64::from(be_u32_at(prefix, 12)?);
    if ftyp_size < MIN_BOX_SIZE {
        return Err(ParseFailure("ftyp box too small"));
    }
    src.seek(SeekFrom::Start(12 + ftyp_size))?;

    let jp2h_len = find_box(src, b"jp2h", u64::MAX, limits)?;
    let ihdr_len = find_box(src, b"ihdr", jp2h_len, limits)?;
    if ihdr_len < 8 {
        return Err(ParseFailure("ihdr box too small"));
    }
    let height = be_u32(src)?;
    let width = be_u32(src)?;
    Ok((width.into(), height.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn simple_box(kind: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(8 + content.len() as u32).to_be_bytes());
        data.extend_from_slice(kind);
        data.extend_from_slice(content);
        data
    }

    #[test]
    fn find_box_skips_preceding_siblings() {
        let mut data = simple_box(b"free", &[0u8; 16]);
        data.extend_from_slice(&simple_box(b"want", b"payload"));
        let mut src = Cursor::new(&data);
        let len = find_box(&mut src, b"want", u64::MAX, &ProbeLimits::default()).unwrap();
        assert_eq!(len, 7);
        let mut payload = [0u8; 7];
        src.read_exact(&mut payload).unwrap();
        assert_eq!(&payload, b"payload");
    }

    #[test]
    fn find_box_honors_large_size() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"want");
        data.extend_from_slice(&20u64.to_be_bytes()); // 16 header + 4 content
        data.extend_from_slice(&[0xAB; 4]);
        let mut src = Cursor::new(&data);
        let len = find_box(&mut src, b"want", u64::MAX, &ProbeLimits::default()).unwrap();
        assert_eq!(len, 4);
    }

    #[test]
    fn find_box_rejects_child_overrunning_parent() {
        // declared child is larger than the parent budget allows
        let data = simple_box(b"want", &[0u8; 64]);
        let mut src = Cursor::new(&data);
        assert!(find_box(&mut src, b"want", 32, &ProbeLimits::default()).is_err());
    }

    #[test]
    fn find_box_respects_scan_cap() {
        let mut data = Vec::new();
        for _ in 0..8 {
            data.extend_from_slice(&simple_box(b"free", &[]));
        }
        data.extend_from_slice(&simple_box(b"want", &[]));
        let limits = ProbeLimits::default().with_max_boxes_per_level(4);
        let mut src = Cursor::new(&data);
        assert!(find_box(&mut src, b"want", u64::MAX, &limits).is_err());
    }

    #[test]
    fn malformed_box_size_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u32.to_be_bytes()); // below the 8-byte minimum
        data.extend_from_slice(b"oops");
        let mut src = Cursor::new(&data);
        assert!(find_box(&mut src, b"want", u64::MAX, &ProbeLimits::default()).is_err());
    }
}
