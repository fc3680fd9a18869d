// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TIFF: a byte-order marker selects the endianness of every later field,
//! then the first image file directory (IFD) is walked for the ImageWidth
//! and ImageLength tags.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use crate::{ParseFailure, ParseResult, ProbeLimits, SHORT_HEADER};

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;

pub(crate) fn parse<R: Read + Seek>(
    src: &mut R,
    prefix: &[u8],
    limits: &ProbeLimits,
) -> ParseResult {
    if prefix.starts_with(b"MM") {
        walk_ifd::<BigEndian, R>(src, prefix, limits)
    } else {
        walk_ifd::<LittleEndian, R>(src, prefix, limits)
    }
}

fn walk_ifd<E: ByteOrder, R: Read + Seek>(
    src: &mut R,
    prefix: &[u8],
    limits: &ProbeLimits,
) -> ParseResult {
    let ifd_offset = u64::from(prefix.get(4..8).map(E::read_u32).ok_or(SHORT_HEADER)?);
    src.seek(SeekFrom::Start(ifd_offset))?;
    let entry_count = src.read_u16::<E>()?;
    if u32::from(entry_count) > limits.max_ifd_entries {
        return Err(ParseFailure("IFD entry limit exceeded"));
    }

    let mut width: Option<u64> = None;
    let mut height: Option<u64> = None;

    for index in 0..u64::from(entry_count) {
        // each entry: 2-byte tag, 2-byte type, 4-byte count, 4-byte value
        let entry_offset = ifd_offset + 2 + index * 12;
        src.seek(SeekFrom::Start(entry_offset))?;
        let tag = src.read_u16::<E>()?;
        if tag != TAG_IMAGE_WIDTH && tag != TAG_IMAGE_LENGTH {
            continue;
        }
        let value_type = src.read_u16::<E>()?;
        src.seek(SeekFrom::Start(entry_offset + 8))?;
        let value = read_value::<E, R>(src, value_type)?;

        if tag == TAG_IMAGE_WIDTH {
            width = Some(value);
        } else {
            height = Some(value);
        }
        if let (Some(w), Some(h)) = (width, height) {
            return Ok((w, h));
        }
    }

    Err(ParseFailure("IFD lacks width or height tag"))
}

/// Read one IFD value in place, honoring the entry's declared type so the
/// right number of bytes is consumed. Values that fit in the 4-byte slot
/// are stored inline, which covers every type a dimension tag uses in
/// practice.
fn read_value<E: ByteOrder, R: Read>(src: &mut R, value_type: u16) -> ParseResult<u64> {
    Ok(match value_type {
        // BYTE, ASCII
        1 | 2 => src.read_u8()?.into(),
        // SHORT
        3 => src.read_u16::<E>()?.into(),
        // LONG
        4 => src.read_u32::<E>()?.into(),
        // RATIONAL
        5 => {
            let numerator = u64::from(src.read_u32::<E>()?);
            let denominator = u64::from(src.read_u32::<E>()?);
            numerator
                .checked_div(denominator)
                .ok_or(ParseFailure("rational with zero denominator"))?
        }
        // SBYTE, UNDEFINED
        6 | 7 => src.read_i8()?.max(0) as u64,
        // SSHORT
        8 => src.read_i16::<E>()?.max(0) as u64,
        // SLONG
        9 => src.read_i32::<E>()?.max(0) as u64,
        // SRATIONAL
        10 => {
            let numerator = i64::from(src.read_i32::<E>()?);
            let denominator = i64::from(src.read_i32::<E>()?);
            numerator
                .checked_div(denominator)
                .ok_or(ParseFailure("rational with zero denominator"))?
                .max(0) as u64
        }
        // FLOAT, DOUBLE
        11 => src.read_f32::<E>()? as u64,
        12 => src.read_f64::<E>()? as u64,
        _ => return Err(ParseFailure("unknown IFD value type")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entry_le(tag: u16, value_type: u16, value: u32) -> [u8; 12] {
        let mut e = [0u8; 12];
        e[..2].copy_from_slice(&tag.to_le_bytes());
        e[2..4].copy_from_slice(&value_type.to_le_bytes());
        e[4..8].copy_from_slice(&1u32.to_le_bytes());
        e[8..12].copy_from_slice(&value.to_le_bytes());
        e
    }

    fn tiff_le(entries: &[[u8; 12]]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"II*\0");
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for e in entries {
            data.extend_from_slice(e);
        }
        data.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
        data
    }

    #[test]
    fn short_and_long_types_are_both_honored() {
        let data = tiff_le(&[
            entry_le(TAG_IMAGE_WIDTH, 3, 640),
            entry_le(TAG_IMAGE_LENGTH, 4, 480),
        ]);
        let mut src = Cursor::new(&data);
        let parsed = parse(&mut src, &data, &ProbeLimits::default());
        assert_eq!(parsed.map_err(|e| e.0), Ok((640, 480)));
    }

    #[test]
    fn unrelated_tags_are_skipped() {
        let data = tiff_le(&[
            entry_le(259, 3, 1), // Compression
            entry_le(TAG_IMAGE_LENGTH, 3, 32),
            entry_le(TAG_IMAGE_WIDTH, 3, 64),
        ]);
        let mut src = Cursor::new(&data);
        let parsed = parse(&mut src, &data, &ProbeLimits::default());
        assert_eq!(parsed.map_err(|e| e.0), Ok((64, 32)));
    }

    #[test]
    fn missing_dimension_tag_fails() {
        let data = tiff_le(&[entry_le(TAG_IMAGE_WIDTH, 3, 64)]);
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &data, &ProbeLimits::default()).is_err());
    }

    #[test]
    fn entry_limit_is_enforced() {
        let data = tiff_le(&[
            entry_le(TAG_IMAGE_WIDTH, 3, 64),
            entry_le(TAG_IMAGE_LENGTH, 3, 32),
        ]);
        let limits = ProbeLimits::default().with_max_ifd_entries(1);
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &data, &limits).is_err());
    }
}
