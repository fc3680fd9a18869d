// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Format identities and the magic-byte signature table.

/// Container formats the probe can identify.
///
/// Each variant carries a stable small-integer code, exposed through
/// [`code`](Self::code) and [`from_code`](Self::from_code). The codes are
/// part of the binding ABI: new formats are appended with fresh codes,
/// existing codes are never renumbered.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ImageFormat {
    /// Graphics Interchange Format, version 87a or 89a.
    Gif = 1,
    /// Portable Network Graphics. The first chunk must be `IHDR`.
    Png = 2,
    /// Windows Bitmap, both the Windows 2.0 core header and the newer
    /// info header layouts.
    Bmp = 3,
    /// Joint Photographic Experts Group.
    Jpeg = 4,
    /// WebP. Supported sub-chunks: `VP8 `, `VP8L`, `VP8X`.
    WebP = 5,
    /// Quite OK Image format.
    Qoi = 6,
    /// Adobe Photoshop.
    Psd = 7,
    /// GIMP native format.
    Xcf = 8,
    /// Windows icon. Files can contain several images; the probe reports
    /// the dimensions of the largest one by area.
    Ico = 9,
    /// AV1 Image File Format (`avif`/`avis` brands).
    Avif = 10,
    /// Tag Image File Format, little or big endian.
    Tiff = 11,
    /// OpenEXR.
    OpenExr = 12,
    /// PiCture eXchange.
    Pcx = 13,
    /// Truevision TGA. Only recognized when the optional
    /// `TRUEVISION-XFILE.\0` footer is present, since the header alone has
    /// no reliable magic.
    Tga = 14,
    /// DirectDraw Surface.
    Dds = 15,
    /// HEIC/HEIF (`heic`/`heix` brands). Same box layout as AVIF.
    Heic = 16,
    /// JPEG 2000 (JP2 container).
    Jp2k = 17,
}

impl ImageFormat {
    /// Short ASCII label for the format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gif => "GIF",
            Self::Png => "PNG",
            Self::Bmp => "BMP",
            Self::Jpeg => "JPEG",
            Self::WebP => "WebP",
            Self::Qoi => "QOI",
            Self::Psd => "PSD",
            Self::Xcf => "XCF",
            Self::Ico => "ICO",
            Self::Avif => "AVIF",
            Self::Tiff => "TIFF",
            Self::OpenExr => "OpenEXR",
            Self::Pcx => "PCX",
            Self::Tga => "TGA",
            Self::Dds => "DDS",
            Self::Heic => "HEIC",
            Self::Jp2k => "JPEG 2000",
        }
    }

    /// Stable integer code for binding layers.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Look up a format by its stable code.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Gif,
            2 => Self::Png,
            3 => Self::Bmp,
            4 => Self::Jpeg,
            5 => Self::WebP,
            6 => Self::Qoi,
            7 => Self::Psd,
            8 => Self::Xcf,
            9 => Self::Ico,
            10 => Self::Avif,
            11 => Self::Tiff,
            12 => Self::OpenExr,
            13 => Self::Pcx,
            14 => Self::Tga,
            15 => Self::Dds,
            16 => Self::Heic,
            17 => Self::Jp2k,
            _ => return None,
        })
    }

    /// Label for a raw code. Unrecognized codes map to `"(unknown)"`
    /// rather than failing, so binding layers can print anything.
    pub fn name_for_code(code: u32) -> &'static str {
        Self::from_code(code).map_or("(unknown)", Self::name)
    }

    /// Match the leading bytes of a file against the signature table.
    ///
    /// Signatures are tried in a fixed total priority order, strongest
    /// first, so a longer or more specific magic always wins over a looser
    /// one that happens to share bytes:
    ///
    /// 1. GIF, PNG, BMP, JPEG (exact leading magics)
    /// 2. WebP (RIFF form type), AVIF/HEIC (`ftyp` brand), JP2K (signature
    ///    box) — container formats identified by an inner tag
    /// 3. TIFF, QOI, PSD, XCF, ICO, OpenEXR, DDS (exact but shorter magics)
    /// 4. PCX last: its one-byte magic plus plausibility checks is the
    ///    weakest signature in the table
    ///
    /// TGA is absent here on purpose: it has no leading magic at all and is
    /// only accepted after the end-of-file footer check, which needs the
    /// reader (see [`tga_candidate`] and the dispatcher).
    ///
    /// Only signatures that fit entirely within `prefix` are considered, so
    /// a short prefix can never mis-match a longer magic.
    pub fn detect(prefix: &[u8]) -> Option<Self> {
        let n = prefix.len();

        if n >= 6 && (&prefix[..6] == b"GIF87a" || &prefix[..6] == b"GIF89a") {
            return Some(Self::Gif);
        }
        if n >= 8 && prefix.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(Self::Png);
        }
        if n >= 10 && prefix.starts_with(b"BM") && prefix[6..10] == [0, 0, 0, 0] {
            return Some(Self::Bmp);
        }
        if n >= 2 && prefix[..2] == [0xff, 0xd8] {
            return Some(Self::Jpeg);
        }
        if n >= 12 && prefix.starts_with(b"RIFF") && &prefix[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        if n >= 12 && &prefix[4..8] == b"ftyp" {
            match &prefix[8..12] {
                b"avif" | b"avis" => return Some(Self::Avif),
                b"heic" | b"heix" => return Some(Self::Heic),
                _ => {}
            }
        }
        if n >= 12 && prefix.starts_with(b"\0\0\0\x0CjP  \r\n\x87\n") {
            return Some(Self::Jp2k);
        }
        if n >= 4 && (prefix.starts_with(b"II*\0") || prefix.starts_with(b"MM\0*")) {
            return Some(Self::Tiff);
        }
        if n >= 4 && prefix.starts_with(b"qoif") {
            return Some(Self::Qoi);
        }
        if n >= 12 && prefix.starts_with(b"8BPS\0\x01\0\0\0\0\0\0") {
            return Some(Self::Psd);
        }
        if n >= 14 && prefix.starts_with(b"gimp xcf ") && prefix[13] == 0 {
            return Some(Self::Xcf);
        }
        if n >= 4 && prefix.starts_with(b"\0\0\x01\0") {
            return Some(Self::Ico);
        }
        if n >= 5 && prefix.starts_with(b"\x76\x2f\x31\x01") && (prefix[4] == 1 || prefix[4] == 2) {
            return Some(Self::OpenExr);
        }
        if n >= 8 && prefix.starts_with(b"DDS \x7C\0\0\0") {
            return Some(Self::Dds);
        }
        if n >= 4
            && prefix[0] == 0x0A
            && prefix[1] < 6
            && matches!(prefix[3], 1 | 2 | 4 | 8)
        {
            return Some(Self::Pcx);
        }

        None
    }
}

impl std::fmt::Display for ImageFormat {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the header bytes are plausible for TGA. TGA carries no magic up
/// front, so a positive answer still needs the footer confirmation against
/// the end of the file before the format is accepted.
pub(crate) fn tga_candidate(prefix: &[u8]) -> bool {
    // color map type is 0 or 1; image type codes stop at 11
    prefix.len() >= 18 && prefix[1] < 2 && prefix[2] < 12
}
