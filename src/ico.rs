// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ICO: a directory of sub-images. The probe reports the largest entry by
//! area without touching the embedded images themselves.

use std::io::{Read, Seek, SeekFrom};

use crate::{ParseFailure, ParseResult, le_u16_at};

pub(crate) fn parse<R: Read + Seek>(src: &mut R, prefix: &[u8]) -> ParseResult {
    let count = le_u16_at(prefix, 4)?;
    src.seek(SeekFrom::Start(6))?;

    let mut entry = [0u8; 16];
    let mut best: Option<(u64, u64, u64)> = None; // (area, width, height)
    for _ in 0..count {
        src.read_exact(&mut entry)?;
        // a stored zero means 256; entries are one byte per axis
        let width = if entry[0] == 0 { 256u64 } else { entry[0].into() };
        let height = if entry[1] == 0 { 256u64 } else { entry[1].into() };
        let area = width * height;
        // strictly greater keeps the first entry on area ties
        if best.is_none_or(|(best_area, _, _)| area > best_area) {
            best = Some((area, width, height));
        }
    }

    match best {
        Some((_, width, height)) => Ok((width, height)),
        None => Err(ParseFailure("icon directory declares no images")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ico(entries: &[(u8, u8)]) -> Vec<u8> {
        let mut data = vec![0, 0, 1, 0];
        data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for &(w, h) in entries {
            let mut e = [0u8; 16];
            e[0] = w;
            e[1] = h;
            data.extend_from_slice(&e);
        }
        data
    }

    #[test]
    fn zero_encodes_256() {
        let data = ico(&[(16, 16), (0, 0)]);
        let mut src = Cursor::new(&data);
        assert_eq!(parse(&mut src, &data).map_err(|e| e.0), Ok((256, 256)));
    }

    #[test]
    fn area_ties_go_to_the_first_entry() {
        // 64x16 and 32x32 share an area; the first one wins
        let data = ico(&[(64, 16), (32, 32)]);
        let mut src = Cursor::new(&data);
        assert_eq!(parse(&mut src, &data).map_err(|e| e.0), Ok((64, 16)));
    }

    #[test]
    fn empty_directory_fails() {
        let data = ico(&[]);
        let mut src = Cursor::new(&data);
        assert!(parse(&mut src, &data).is_err());
    }
}
