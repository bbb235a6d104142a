//! Shared test utilities for the dropconvert test suite.
//!
//! Fixtures are generated in code so tests never depend on binary files in
//! the repository:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("camera.jpg");
//! create_jpeg_with_exif(&path, "Acme", "Model 7");
//! ```

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

// =========================================================================
// Image files
// =========================================================================

/// Gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Gradient RGB image, encoded according to the path's extension.
pub fn create_test_image(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 64])
    });
    img.save(path).unwrap();
}

/// PNG with a fully transparent left half and an opaque red right half.
pub fn create_transparent_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 255, 0])
        } else {
            Rgba([255, 0, 0, 255])
        }
    });
    img.save(path).unwrap();
}

/// JPEG whose first segment after SOI is an Exif APP1 with Make and Model.
pub fn create_jpeg_with_exif(path: &Path, make: &str, model: &str) {
    let jpeg = tiny_jpeg_bytes();
    let block = exif_block(make, model);
    let mut out = Vec::with_capacity(jpeg.len() + block.len() + 10);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((2 + 6 + block.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&block);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}

// =========================================================================
// In-memory fixtures
// =========================================================================

/// Little-endian TIFF-structured EXIF block with Make, Model and
/// DateTimeOriginal.
pub fn exif_block(make: &str, model: &str) -> Vec<u8> {
    let ascii = |tag: Tag, text: &str| Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    };
    let fields = [
        ascii(Tag::Make, make),
        ascii(Tag::Model, model),
        ascii(Tag::DateTimeOriginal, "2024:05:01 12:34:56"),
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, true).unwrap();
    buf.into_inner()
}

/// 8x8 baseline JPEG.
pub fn tiny_jpeg_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 200]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .write_image(img.as_raw(), 8, 8, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// 8x6 lossless WebP (simple `VP8L` layout). Semi-transparent with `alpha`.
pub fn tiny_webp_bytes(alpha: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    if alpha {
        let img = RgbaImage::from_fn(8, 6, |x, y| Rgba([(x * 30) as u8, (y * 40) as u8, 90, 128]));
        WebPEncoder::new_lossless(&mut buf)
            .write_image(img.as_raw(), 8, 6, image::ExtendedColorType::Rgba8)
            .unwrap();
    } else {
        let img = RgbImage::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 90]));
        WebPEncoder::new_lossless(&mut buf)
            .write_image(img.as_raw(), 8, 6, image::ExtendedColorType::Rgb8)
            .unwrap();
    }
    buf
}
