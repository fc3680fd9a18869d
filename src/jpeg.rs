// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JPEG: walk the marker segments, skipping each by its declared length,
//! until a start-of-frame marker yields the dimensions.

use std::io::{Read, Seek, SeekFrom};

use crate::{ParseFailure, ParseResult, ProbeLimits, be_u16, read_u8, skip_fwd, u8_at};

/// Markers are byte-aligned and may be padded with any number of 0xFF fill
/// bytes. Unknown or vendor segments are skipped, never rejected; the scan
/// ends at start-of-scan (0xDA) since frame headers precede entropy data.
pub(crate) fn parse<R: Read + Seek>(
    src: &mut R,
    prefix: &[u8],
    limits: &ProbeLimits,
) -> ParseResult {
    let mut byte = u8_at(prefix, 2)?;
    src.seek(SeekFrom::Start(3))?;

    let mut scanned = 0u32;
    while byte != 0xda && byte != 0 {
        if scanned >= limits.max_markers {
            return Err(ParseFailure("marker scan limit exceeded"));
        }
        scanned += 1;

        while byte != 0xff {
            byte = read_u8(src)?;
        }
        while byte == 0xff {
            byte = read_u8(src)?;
        }
        // SOF0-SOF3: baseline, extended, progressive, lossless
        if (0xc0..=0xc3).contains(&byte) {
            skip_fwd(src, 3)?; // segment length + sample precision
            let height = be_u16(src)?;
            let width = be_u16(src)?;
            return Ok((width.into(), height.into()));
        }
        let segment_len = be_u16(src)?;
        let payload = segment_len
            .checked_sub(2)
            .ok_or(ParseFailure("segment length below minimum"))?;
        skip_fwd(src, payload.into())?;
        byte = read_u8(src)?;
    }

    Err(ParseFailure("no start-of-frame before scan data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sof0(width: u16, height: u16) -> Vec<u8> {
        let mut seg = vec![0xff, 0xc0, 0x00, 0x11, 0x08];
        seg.extend_from_slice(&height.to_be_bytes());
        seg.extend_from_slice(&width.to_be_bytes());
        seg
    }

    #[test]
    fn vendor_segments_are_skipped() {
        let mut data = vec![0xff, 0xd8];
        // APP0 with 14 payload bytes
        data.extend_from_slice(&[0xff, 0xe0, 0x00, 0x10]);
        data.extend_from_slice(&[0u8; 14]);
        data.extend_from_slice(&sof0(123, 45));
        let mut src = Cursor::new(&data);
        let parsed = parse(&mut src, &data, &ProbeLimits::default());
        assert_eq!(parsed.map_err(|e| e.0), Ok((123, 45)));
    }

    #[test]
    fn fill_bytes_before_marker_are_tolerated() {
        let mut data = vec![0xff, 0xd8, 0xff, 0xff, 0xff];
        data.extend_from_slice(&sof0(8, 8)[1..]); // marker byte follows the fill run
        let mut src = Cursor::new(&data);
        let parsed = parse(&mut src, &data, &ProbeLimits::default());
        assert_eq!(parsed.map_err(|e| e.0), Ok((8, 8)));
    }

    #[test]
    fn scan_data_without_frame_header_fails() {
        let data = vec![0xff, 0xd8, 0xff, 0xda, 0x00, 0x02];
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &data, &ProbeLimits::default()).is_err());
    }

    #[test]
    fn marker_limit_is_enforced() {
        let mut data = vec![0xff, 0xd8];
        for _ in 0..8 {
            data.extend_from_slice(&[0xff, 0xe1, 0x00, 0x02]);
        }
        data.extend_from_slice(&sof0(4, 4));
        let limits = ProbeLimits::default().with_max_markers(4);
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &data, &limits).is_err());
    }
}
