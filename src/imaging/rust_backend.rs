//! Pure Rust codec backend, no system libraries.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, TIFF, BMP, GIF) | `image::ImageReader` (magic-byte sniffing, extension fallback) |
//! | Read EXIF | `kamadak-exif` via [`exif::read_exif`](super::exif::read_exif) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality, EXIF in APP1) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (EXIF in `eXIf`) |
//! | Encode → WebP | `zenwebp` lossy encoder (quality, EXIF chunk) |
//! | Encode → TIFF | `image::codecs::tiff::TiffEncoder`, or the EXIF-aware writer |
//! | Encode → BMP | `image::codecs::bmp::BmpEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::compose::is_high_depth;
use super::exif;
use super::params::EncodeParams;
use crate::formats::{self, TargetFormat};
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ImageEncoder, ImageError, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format().is_none() {
        // Nothing recognizable in the header: trust the extension so the
        // decoder reports what is wrong with the data.
        if let Some(format) = formats::source_format(path) {
            reader.set_format(format);
        }
    }
    let image = reader.decode()?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "decoded"
    );
    Ok(image)
}

/// Run an `image` encoder, handing it the EXIF block first when there is one.
fn write_with<E: ImageEncoder>(
    image: &DynamicImage,
    mut encoder: E,
    exif: Option<&[u8]>,
) -> Result<(), BackendError> {
    if let Some(block) = exif {
        encoder
            .set_exif_metadata(block.to_vec())
            .map_err(ImageError::Unsupported)?;
    }
    image.write_with_encoder(encoder)?;
    Ok(())
}

fn encode_jpeg(image: &DynamicImage, quality: u8, block: Option<&[u8]>) -> Result<Vec<u8>, BackendError> {
    if let Some(block) = block {
        exif::fits_in_app1(block)?;
    }
    let mut buf = Cursor::new(Vec::new());
    write_with(image, JpegEncoder::new_with_quality(&mut buf, quality), block)?;
    Ok(buf.into_inner())
}

fn encode_png(image: &DynamicImage, exif: Option<&[u8]>) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    write_with(image, PngEncoder::new(&mut buf), exif)?;
    Ok(buf.into_inner())
}

fn encode_webp(image: &DynamicImage, quality: u32, exif: Option<&[u8]>) -> Result<Vec<u8>, BackendError> {
    let (pixels, layout) = if image.color().has_alpha() {
        (image.to_rgba8().into_raw(), zenwebp::PixelLayout::Rgba8)
    } else {
        (image.to_rgb8().into_raw(), zenwebp::PixelLayout::Rgb8)
    };
    let config = zenwebp::LossyConfig::new().with_quality(quality as f32);
    let mut metadata = zenwebp::ImageMetadata::new();
    if let Some(block) = exif {
        metadata = metadata.with_exif(block);
    }
    zenwebp::EncodeRequest::lossy(&config, &pixels, layout, image.width(), image.height())
        .with_metadata(metadata)
        .encode()
        .map_err(|e| BackendError::Codec {
            format: "WebP",
            source: Box::new(e),
        })
}

fn encode_bmp(image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    write_with(image, BmpEncoder::new(&mut buf), None)?;
    Ok(buf.into_inner())
}

fn encode_tiff(image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    write_with(image, TiffEncoder::new(&mut buf), None)?;
    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        load_image(path)
    }

    fn read_exif(&self, path: &Path) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(exif::read_exif(path)?)
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let block = params.exif.as_deref();
        let bytes = match params.format {
            TargetFormat::Jpg | TargetFormat::Jpeg => {
                encode_jpeg(image, params.quality.value() as u8, block)?
            }
            TargetFormat::Png => encode_png(image, block)?,
            TargetFormat::Webp => encode_webp(image, params.quality.value(), block)?,
            // The `image` TIFF encoder has no EXIF support.
            TargetFormat::Tiff => match block {
                Some(block) => exif::encode_tiff(image, block)?,
                None => encode_tiff(image)?,
            },
            TargetFormat::Bmp => encode_bmp(image)?,
        };
        debug!(
            format = %params.format,
            bytes = bytes.len(),
            high_depth = is_high_depth(image),
            exif = block.is_some(),
            "encoded"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::imaging::exif::{ExifError, find_in_jpeg, find_in_webp};
    use crate::test_helpers::{
        create_jpeg_with_exif, create_test_image, create_test_jpeg, create_transparent_png,
        exif_block,
    };
    use ::exif::{In, Reader, Tag};
    use image::{ImageFormat, Rgba, RgbaImage};

    fn params(format: TargetFormat, exif: Option<Vec<u8>>) -> EncodeParams {
        EncodeParams {
            format,
            quality: Quality::default(),
            exif,
        }
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let img = RustBackend::new().decode(&path).unwrap();
        assert_eq!((img.width(), img.height()), (200, 150));
    }

    #[test]
    fn decode_nonexistent_file_errors() {
        let result = RustBackend::new().decode(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn decode_sniffs_mislabelled_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        create_test_image(&png, 10, 10);
        let lying = tmp.path().join("actually-png.jpg");
        std::fs::copy(&png, &lying).unwrap();

        let img = RustBackend::new().decode(&lying).unwrap();
        assert_eq!(img.width(), 10);
    }

    #[test]
    fn decode_garbage_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("noise.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(RustBackend::new().decode(&path).is_err());
    }

    #[test]
    fn encode_each_target_produces_its_format() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(7, 5, image::Rgb([9, 8, 7])));
        let backend = RustBackend::new();
        for format in TargetFormat::ALL {
            let bytes = backend.encode(&img, &params(format, None)).unwrap();
            assert_eq!(
                image::guess_format(&bytes).unwrap(),
                format.image_format(),
                "wrong container for {format}"
            );
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (7, 5));
        }
    }

    #[test]
    fn png_keeps_16_bit_samples() {
        let img = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(
            2,
            2,
            image::Rgb([1000u16, 2000, 65535]),
        ));
        let bytes = RustBackend::new()
            .encode(&img, &params(TargetFormat::Png, None))
            .unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.to_rgb16().get_pixel(1, 1).0, [1000, 2000, 65535]);
    }

    #[test]
    fn png_carries_exif_chunk() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 10])));
        let block = exif_block("Acme", "Model 7");
        let bytes = RustBackend::new()
            .encode(&img, &params(TargetFormat::Png, Some(block.clone())))
            .unwrap();

        let chunk_pos = bytes.windows(4).position(|w| w == b"eXIf").unwrap();
        let idat_pos = bytes.windows(4).position(|w| w == b"IDAT").unwrap();
        assert!(chunk_pos < idat_pos);
        let len = u32::from_be_bytes(bytes[chunk_pos - 4..chunk_pos].try_into().unwrap()) as usize;
        assert_eq!(&bytes[chunk_pos + 4..chunk_pos + 4 + len], &block[..]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [0, 0, 0, 10]);
    }

    fn detailed() -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x * y) % 256) as u8])
        }))
    }

    fn encoded_len(format: TargetFormat, quality: u32) -> usize {
        RustBackend::new()
            .encode(
                &detailed(),
                &EncodeParams {
                    format,
                    quality: Quality::new(quality),
                    exif: None,
                },
            )
            .unwrap()
            .len()
    }

    #[test]
    fn jpeg_quality_changes_size() {
        assert!(encoded_len(TargetFormat::Jpg, 10) < encoded_len(TargetFormat::Jpg, 100));
    }

    #[test]
    fn webp_quality_changes_size() {
        assert!(encoded_len(TargetFormat::Webp, 10) < encoded_len(TargetFormat::Webp, 100));
    }

    #[test]
    fn jpeg_carries_exif_segment() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])));
        let block = exif_block("Acme", "Model 7");
        let bytes = RustBackend::new()
            .encode(&img, &params(TargetFormat::Jpeg, Some(block.clone())))
            .unwrap();

        assert_eq!(find_in_jpeg(&bytes), Some(&block[..]));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn jpeg_rejects_block_larger_than_one_segment() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let result = RustBackend::new().encode(
            &img,
            &params(TargetFormat::Jpg, Some(vec![0u8; u16::MAX as usize])),
        );
        assert!(matches!(
            result,
            Err(BackendError::Exif(ExifError::TooLarge(_)))
        ));
    }

    #[test]
    fn webp_carries_exif_chunk_and_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([10, 200, 30, 128])));
        let block = exif_block("Acme", "Model 7");
        let bytes = RustBackend::new()
            .encode(&img, &params(TargetFormat::Webp, Some(block.clone())))
            .unwrap();

        let found = find_in_webp(&bytes).expect("EXIF chunk");
        let parsed = Reader::new().read_raw(found.to_vec()).unwrap();
        assert!(parsed.get_field(Tag::Make, In::PRIMARY).is_some());

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn read_exif_from_camera_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("camera.jpg");
        create_jpeg_with_exif(&path, "Acme", "Model 7");

        let block = RustBackend::new().read_exif(&path).unwrap().expect("EXIF block");
        let parsed = Reader::new().read_raw(block).unwrap();
        assert!(parsed.get_field(Tag::Model, In::PRIMARY).is_some());
        assert!(parsed.get_field(Tag::DateTimeOriginal, In::PRIMARY).is_some());
    }

    #[test]
    fn decode_transparent_png_keeps_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        create_transparent_png(&path, 6, 2);

        let img = RustBackend::new().decode(&path).unwrap();
        assert!(img.color().has_alpha());
        let rgba = img.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
        assert_eq!(rgba.get_pixel(5, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn read_exif_plain_png_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.png");
        create_test_image(&path, 4, 4);
        assert!(RustBackend::new().read_exif(&path).unwrap().is_none());
    }
}
