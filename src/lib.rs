#![deny(unsafe_code)]
//! Probe the pixel dimensions and container format of an image file by
//! reading only its structural metadata.
//!
//! The probe reads a short leading window of the byte source, matches it
//! against a signature table, and hands off to a format-specific parser
//! that reads (and seeks over) just enough of the file to answer
//! "what format, how wide, how tall". Pixel data is never decoded, so a
//! query typically touches well under a hundred bytes even for large files.
//!
//! ```no_run
//! let info = zenprobe::ImageInfo::from_path("photo.jpg")?;
//! println!("{}: {} x {}", info.format, info.width, info.height);
//! # Ok::<(), zenprobe::Error>(())
//! ```

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use log::debug;

mod bmff;
mod exr;
mod flat;
mod format;
mod ico;
mod jpeg;
mod tiff;
mod webp;

pub use crate::format::ImageFormat;

/// Describes probe failures.
///
/// The taxonomy is deliberately small: either the byte source itself failed,
/// or no signature matched, or a signature matched but the structure did not
/// parse. In the last case the detected format is preserved so diagnostics
/// can name the culprit container.
#[derive(Debug)]
pub enum Error {
    /// Reading or seeking the byte source failed before any format was
    /// identified. Carries the underlying OS error when available.
    Io(std::io::Error),
    /// A signature matched, but the file's structure was truncated,
    /// inconsistent, or otherwise failed to parse as that format.
    Parser(ImageFormat),
    /// No known signature matched the leading bytes.
    Unsupported,
}

impl Error {
    /// The format that was detected before parsing failed, if any.
    pub fn format(&self) -> Option<ImageFormat> {
        match self {
            Self::Parser(format) => Some(*format),
            _ => None,
        }
    }

    /// Integer code for binding layers: `-1` for I/O failures without an
    /// OS code, `-2` for parser failures, `-3` for unsupported input, and
    /// the positive raw OS error code when one is available. Success is `0`
    /// by convention, so the sign partitions the space unambiguously.
    pub fn code(&self) -> i32 {
        match self {
            Self::Io(err) => err.raw_os_error().unwrap_or(-1),
            Self::Parser(_) => -2,
            Self::Unsupported => -3,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => err.fmt(f),
            Self::Parser(format) => write!(f, "error parsing {format} image"),
            Self::Unsupported => f.write_str("unknown format"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Result shorthand using our Error enum.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Internal parser failure. Every post-detection failure collapses to
/// `Error::Parser(format)` at the dispatch boundary; the message only
/// feeds the debug log.
#[derive(Debug)]
pub(crate) struct ParseFailure(pub(crate) &'static str);

impl From<std::io::Error> for ParseFailure {
    #[cold]
    fn from(_: std::io::Error) -> Self {
        Self("byte source ended or failed mid-parse")
    }
}

pub(crate) type ParseResult<T = (u64, u64)> = std::result::Result<T, ParseFailure>;

pub(crate) const SHORT_HEADER: ParseFailure = ParseFailure("header shorter than required");

/// Probe result: dimensions plus the detected container format.
///
/// `width` and `height` are only meaningful when the probe returned `Ok`;
/// on failure the format (when detection succeeded) travels in
/// [`Error::Parser`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u64,
    /// Height in pixels.
    pub height: u64,
    /// Detected container format.
    pub format: ImageFormat,
}

impl ImageInfo {
    /// Probe a file by filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        probe(&mut reader)
    }

    /// Probe an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        probe(&mut Cursor::new(data))
    }

    /// Probe an already-open file. The handle's cursor should be at the
    /// start of the image; its position afterwards is unspecified.
    pub fn from_file(file: &mut File) -> Result<Self> {
        probe(&mut BufReader::new(file))
    }

    /// Probe any seekable byte source.
    ///
    /// Formats like JPEG and TIFF issue repeated small reads, so wrapping a
    /// raw `File` in a `std::io::BufReader` is recommended.
    pub fn from_reader<R: Read + Seek>(src: &mut R) -> Result<Self> {
        probe(src)
    }
}

/// Caps on how far the structural scans are allowed to walk.
///
/// Several formats store dimensions behind a list of self-describing
/// sub-blocks. A malformed or adversarial file could declare an arbitrary
/// number of them; these limits bound every such scan. Exceeding a limit on
/// a detected file reports [`Error::Parser`] for that format.
#[derive(Debug, Clone, Copy)]
pub struct ProbeLimits {
    /// Boxes examined per ISO-BMFF nesting level (AVIF, HEIC, JP2K).
    pub max_boxes_per_level: u32,
    /// TIFF image-file-directory entries examined.
    pub max_ifd_entries: u32,
    /// JPEG marker segments skipped before a start-of-frame.
    pub max_markers: u32,
    /// OpenEXR header attributes examined.
    pub max_attributes: u32,
}

impl Default for ProbeLimits {
    fn default() -> Self {
        Self {
            max_boxes_per_level: 256,
            max_ifd_entries: 4096,
            max_markers: 1024,
            max_attributes: 512,
        }
    }
}

impl ProbeLimits {
    /// Create limits that never trigger.
    pub fn unlimited() -> Self {
        Self {
            max_boxes_per_level: u32::MAX,
            max_ifd_entries: u32::MAX,
            max_markers: u32::MAX,
            max_attributes: u32::MAX,
        }
    }

    /// Set the ISO-BMFF per-level box cap.
    pub fn with_max_boxes_per_level(mut self, boxes: u32) -> Self {
        self.max_boxes_per_level = boxes;
        self
    }

    /// Set the TIFF IFD entry cap.
    pub fn with_max_ifd_entries(mut self, entries: u32) -> Self {
        self.max_ifd_entries = entries;
        self
    }

    /// Set the JPEG marker segment cap.
    pub fn with_max_markers(mut self, markers: u32) -> Self {
        self.max_markers = markers;
        self
    }

    /// Set the OpenEXR attribute cap.
    pub fn with_max_attributes(mut self, attributes: u32) -> Self {
        self.max_attributes = attributes;
        self
    }
}

/// Leading window handed to the signature table. Sized to the longest
/// signature the table needs to see in one read: a RIFF header, the WEBP
/// form type, the first sub-chunk header, and the VP8X dimension bytes.
const PREFIX_LEN: usize = 30;

const TGA_FOOTER: &[u8; 18] = b"TRUEVISION-XFILE.\0";

/// Probe a seekable byte source with default [`ProbeLimits`].
pub fn probe<R: Read + Seek>(src: &mut R) -> Result<ImageInfo> {
    probe_with_limits(src, &ProbeLimits::default())
}

/// Probe a seekable byte source.
///
/// Reads a fixed leading window from the current position, matches it
/// against the signature table, and runs the selected parser against the
/// same source. The source's position afterwards is unspecified.
pub fn probe_with_limits<R: Read + Seek>(src: &mut R, limits: &ProbeLimits) -> Result<ImageInfo> {
    let mut window = [0u8; PREFIX_LEN];
    let got = read_prefix(src, &mut window)?;
    let prefix = &window[..got];

    let format = match ImageFormat::detect(prefix) {
        Some(format) => format,
        // TGA has no leading magic; accept it only on the footer check.
        None if format::tga_candidate(prefix) && has_tga_footer(src)? => ImageFormat::Tga,
        None => return Err(Error::Unsupported),
    };

    let parsed = match format {
        ImageFormat::Gif => flat::parse_gif(prefix),
        ImageFormat::Png => flat::parse_png(prefix),
        ImageFormat::Bmp => flat::parse_bmp(prefix),
        ImageFormat::Qoi => flat::parse_qoi(prefix),
        ImageFormat::Psd => flat::parse_psd(prefix),
        ImageFormat::Xcf => flat::parse_xcf(prefix),
        ImageFormat::Pcx => flat::parse_pcx(prefix),
        ImageFormat::Dds => flat::parse_dds(prefix),
        ImageFormat::Tga => flat::parse_tga(prefix),
        ImageFormat::WebP => webp::parse(prefix),
        ImageFormat::Jpeg => jpeg::parse(src, prefix, limits),
        ImageFormat::Avif | ImageFormat::Heic => bmff::parse_ispe(src, prefix, limits),
        ImageFormat::Jp2k => bmff::parse_jp2(src, prefix, limits),
        ImageFormat::Tiff => tiff::parse(src, prefix, limits),
        ImageFormat::Ico => ico::parse(src, prefix),
        ImageFormat::OpenExr => exr::parse(src, limits),
    };

    match parsed {
        Ok((width, height)) => Ok(ImageInfo { width, height, format }),
        Err(failure) => {
            debug!("{format} parse failed: {}", failure.0);
            Err(Error::Parser(format))
        }
    }
}

/// Fill as much of `buf` as the source allows. A clean end-of-input is not
/// an error here; the caller decides what a short window means.
fn read_prefix<R: Read>(src: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn has_tga_footer<R: Read + Seek>(src: &mut R) -> std::io::Result<bool> {
    src.seek(SeekFrom::End(-(TGA_FOOTER.len() as i64)))?;
    let mut buf = [0u8; TGA_FOOTER.len()];
    src.read_exact(&mut buf)?;
    Ok(&buf == TGA_FOOTER)
}

// Fixed-offset accessors over the prefix window. Out-of-range reads mean
// the file is shorter than the detected format's header requires.

pub(crate) fn u8_at(buf: &[u8], at: usize) -> ParseResult<u8> {
    buf.get(at).copied().ok_or(SHORT_HEADER)
}

pub(crate) fn be_u16_at(buf: &[u8], at: usize) -> ParseResult<u16> {
    buf.get(at..at + 2).map(BigEndian::read_u16).ok_or(SHORT_HEADER)
}

pub(crate) fn be_u32_at(buf: &[u8], at: usize) -> ParseResult<u32> {
    buf.get(at..at + 4).map(BigEndian::read_u32).ok_or(SHORT_HEADER)
}

pub(crate) fn le_u16_at(buf: &[u8], at: usize) -> ParseResult<u16> {
    buf.get(at..at + 2).map(LittleEndian::read_u16).ok_or(SHORT_HEADER)
}

pub(crate) fn le_u24_at(buf: &[u8], at: usize) -> ParseResult<u32> {
    buf.get(at..at + 3).map(LittleEndian::read_u24).ok_or(SHORT_HEADER)
}

pub(crate) fn le_u32_at(buf: &[u8], at: usize) -> ParseResult<u32> {
    buf.get(at..at + 4).map(LittleEndian::read_u32).ok_or(SHORT_HEADER)
}

pub(crate) fn le_i16_at(buf: &[u8], at: usize) -> ParseResult<i16> {
    buf.get(at..at + 2).map(LittleEndian::read_i16).ok_or(SHORT_HEADER)
}

pub(crate) fn le_i32_at(buf: &[u8], at: usize) -> ParseResult<i32> {
    buf.get(at..at + 4).map(LittleEndian::read_i32).ok_or(SHORT_HEADER)
}

// Streaming reads used by the parsers that walk past the prefix window.

pub(crate) fn read_u8<R: Read>(src: &mut R) -> ParseResult<u8> {
    src.read_u8().map_err(From::from)
}

pub(crate) fn be_u16<R: Read>(src: &mut R) -> ParseResult<u16> {
    src.read_u16::<BigEndian>().map_err(From::from)
}

pub(crate) fn be_u32<R: Read>(src: &mut R) -> ParseResult<u32> {
    src.read_u32::<BigEndian>().map_err(From::from)
}

pub(crate) fn be_u64<R: Read>(src: &mut R) -> ParseResult<u64> {
    src.read_u64::<BigEndian>().map_err(From::from)
}

pub(crate) fn le_u32<R: Read>(src: &mut R) -> ParseResult<u32> {
    src.read_u32::<LittleEndian>().map_err(From::from)
}

pub(crate) fn le_i32<R: Read>(src: &mut R) -> ParseResult<i32> {
    src.read_i32::<LittleEndian>().map_err(From::from)
}

/// Seek forward over bytes we don't care to parse.
pub(crate) fn skip_fwd<R: Seek>(src: &mut R, bytes: u64) -> ParseResult<()> {
    let delta = i64::try_from(bytes).map_err(|_| ParseFailure("skip distance out of range"))?;
    src.seek(SeekFrom::Current(delta))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_accessors_reject_short_buffers() {
        let buf = [1u8, 2, 3];
        assert!(be_u32_at(&buf, 0).is_err());
        assert!(be_u16_at(&buf, 2).is_err());
        assert!(u8_at(&buf, 3).is_err());
        assert_eq!(be_u16_at(&buf, 0).map_err(|e| e.0), Ok(0x0102));
        assert_eq!(le_u16_at(&buf, 0).map_err(|e| e.0), Ok(0x0201));
        assert_eq!(le_u24_at(&buf, 0).map_err(|e| e.0), Ok(0x0003_0201));
    }

    #[test]
    fn error_codes_follow_binding_convention() {
        assert_eq!(Error::Parser(ImageFormat::Png).code(), -2);
        assert_eq!(Error::Unsupported.code(), -3);
        let io = Error::Io(std::io::Error::other("boom"));
        assert_eq!(io.code(), -1);
        let os = Error::Io(std::io::Error::from_raw_os_error(2));
        assert_eq!(os.code(), 2);
    }

    #[test]
    fn error_preserves_detected_format() {
        assert_eq!(Error::Parser(ImageFormat::Tiff).format(), Some(ImageFormat::Tiff));
        assert_eq!(Error::Unsupported.format(), None);
    }

    #[test]
    fn read_prefix_stops_cleanly_at_eof() {
        let mut short = Cursor::new(&b"abc"[..]);
        let mut buf = [0u8; 8];
        assert_eq!(read_prefix(&mut short, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn empty_input_is_unsupported() {
        match probe(&mut Cursor::new(&[][..])) {
            Err(Error::Unsupported) => {}
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }
}
