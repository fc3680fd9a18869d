// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OpenEXR: the header is a list of `name\0 type\0 length value` attribute
//! records ending at an empty name. Dimensions come from the mandatory
//! `displayWindow` attribute, an inclusive box2i.
//!
//! See the OpenEXR file layout document for the attribute encoding.

use std::io::{Read, Seek, SeekFrom};

use arrayvec::ArrayVec;

use crate::{ParseFailure, ParseResult, ProbeLimits, le_i32, le_u32, read_u8, skip_fwd};

/// Attribute names are limited to 255 bytes by the format.
const MAX_NAME_LEN: usize = 255;

pub(crate) fn parse<R: Read + Seek>(src: &mut R, limits: &ProbeLimits) -> ParseResult {
    src.seek(SeekFrom::Start(8))?; // magic + version/flags

    let mut scanned = 0u32;
    loop {
        if scanned >= limits.max_attributes {
            return Err(ParseFailure("attribute scan limit exceeded"));
        }
        scanned += 1;

        let name = read_text(src)?;
        if name.is_empty() {
            // end of header without a displayWindow
            return Err(ParseFailure("header lacks a displayWindow attribute"));
        }
        let attr_type = read_text(src)?;
        let attr_len = le_u32(src)?;

        if name.as_slice() != b"displayWindow" {
            skip_fwd(src, attr_len.into())?;
            continue;
        }
        if attr_type.as_slice() != b"box2i" || attr_len != 16 {
            return Err(ParseFailure("displayWindow is not a box2i"));
        }
        let x_min = i64::from(le_i32(src)?);
        let y_min = i64::from(le_i32(src)?);
        let x_max = i64::from(le_i32(src)?);
        let y_max = i64::from(le_i32(src)?);
        let width = x_max - x_min + 1;
        let height = y_max - y_min + 1;
        if width <= 0 || height <= 0 {
            return Err(ParseFailure("empty display window"));
        }
        return Ok((width as u64, height as u64));
    }
}

/// Read a nul-terminated string without allocating. The format caps names
/// at 255 bytes, so anything longer is structural corruption.
fn read_text<R: Read>(src: &mut R) -> ParseResult<ArrayVec<u8, MAX_NAME_LEN>> {
    let mut buf = ArrayVec::new();
    loop {
        let byte = read_u8(src)?;
        if byte == 0 {
            return Ok(buf);
        }
        buf.try_push(byte)
            .map_err(|_| ParseFailure("attribute name too long"))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn attribute(name: &[u8], attr_type: &[u8], value: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(name);
        data.push(0);
        data.extend_from_slice(attr_type);
        data.push(0);
        data.extend_from_slice(&(value.len() as u32).to_le_bytes());
        data.extend_from_slice(value);
        data
    }

    fn box2i(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Vec<u8> {
        let mut v = Vec::new();
        for field in [x_min, y_min, x_max, y_max] {
            v.extend_from_slice(&field.to_le_bytes());
        }
        v
    }

    fn exr_header(attributes: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![0x76, 0x2f, 0x31, 0x01, 0x02, 0, 0, 0];
        for a in attributes {
            data.extend_from_slice(a);
        }
        data.push(0); // empty name terminates the header
        data
    }

    #[test]
    fn display_window_behind_other_attributes() {
        let data = exr_header(&[
            attribute(b"channels", b"chlist", &[0u8; 18]),
            attribute(b"displayWindow", b"box2i", &box2i(0, 0, 31, 15)),
        ]);
        let mut src = Cursor::new(&data);
        let parsed = parse(&mut src, &ProbeLimits::default());
        assert_eq!(parsed.map_err(|e| e.0), Ok((32, 16)));
    }

    #[test]
    fn nonzero_window_origin_is_respected() {
        let data = exr_header(&[attribute(b"displayWindow", b"box2i", &box2i(8, 4, 15, 11))]);
        let mut src = Cursor::new(&data);
        assert_eq!(parse(&mut src, &ProbeLimits::default()).map_err(|e| e.0), Ok((8, 8)));
    }

    #[test]
    fn wrong_attribute_type_fails() {
        let data = exr_header(&[attribute(b"displayWindow", b"box2f", &[0u8; 16])]);
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &ProbeLimits::default()).is_err());
    }

    #[test]
    fn missing_display_window_fails() {
        let data = exr_header(&[attribute(b"channels", b"chlist", &[0u8; 18])]);
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &ProbeLimits::default()).is_err());
    }
}
