//! Supported formats.
//!
//! Output formats are a closed set: [`TargetFormat`]. `JPG` and `JPEG` share
//! the JPEG encoder and only differ in the extension written to disk.
//!
//! Inputs are recognized by file extension, case-insensitively:
//!
//! | Extension | Decoder | Carries EXIF |
//! |---|---|---|
//! | `jpg`, `jpeg` | JPEG | yes |
//! | `png` | PNG | yes (`eXIf`) |
//! | `webp` | WebP | yes |
//! | `tif`, `tiff` | TIFF | yes |
//! | `bmp` | BMP | no |
//! | `gif` | GIF (input only) | no |

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// A format name or extension outside the supported set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported format: {0:?}")]
pub struct UnsupportedFormat(pub String);

/// Output format selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Tiff,
    Bmp,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 6] = [
        TargetFormat::Jpg,
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::Webp,
        TargetFormat::Tiff,
        TargetFormat::Bmp,
    ];

    /// User-facing name, as shown in the format picker.
    pub fn name(self) -> &'static str {
        match self {
            TargetFormat::Jpg => "JPG",
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Png => "PNG",
            TargetFormat::Webp => "WEBP",
            TargetFormat::Tiff => "TIFF",
            TargetFormat::Bmp => "BMP",
        }
    }

    /// Extension of files written in this format (no leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
            TargetFormat::Tiff => "tiff",
            TargetFormat::Bmp => "bmp",
        }
    }

    /// Codec used to encode this format.
    pub fn image_format(self) -> ImageFormat {
        match self {
            TargetFormat::Jpg | TargetFormat::Jpeg => ImageFormat::Jpeg,
            TargetFormat::Png => ImageFormat::Png,
            TargetFormat::Webp => ImageFormat::WebP,
            TargetFormat::Tiff => ImageFormat::Tiff,
            TargetFormat::Bmp => ImageFormat::Bmp,
        }
    }

    pub fn is_jpeg(self) -> bool {
        matches!(self, TargetFormat::Jpg | TargetFormat::Jpeg)
    }

    /// Whether an EXIF block can be embedded in files of this format.
    pub fn supports_exif(self) -> bool {
        !matches!(self, TargetFormat::Bmp)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_uppercase();
        TargetFormat::ALL
            .into_iter()
            .find(|f| f.name() == normalized)
            .ok_or_else(|| UnsupportedFormat(s.to_string()))
    }
}

impl TryFrom<String> for TargetFormat {
    type Error = UnsupportedFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetFormat> for String {
    fn from(format: TargetFormat) -> Self {
        format.name().to_string()
    }
}

/// Input extensions with a compiled-in decoder.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("bmp", ImageFormat::Bmp),
    ("gif", ImageFormat::Gif),
];

/// Returns the accepted input extensions, lowercase, without dots.
pub fn supported_input_extensions() -> impl Iterator<Item = &'static str> {
    INPUT_CANDIDATES.iter().map(|(ext, _)| *ext)
}

/// Codec implied by a source path's extension, if it is an accepted input.
pub fn source_format(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?;
    INPUT_CANDIDATES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
        .map(|(_, fmt)| *fmt)
}

pub fn is_supported_input(path: &Path) -> bool {
    source_format(path).is_some()
}

/// Whether files of this codec can carry an EXIF block we know how to read.
pub fn carries_exif(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Tiff
    )
}
