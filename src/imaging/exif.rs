//! EXIF carry-over between formats.
//!
//! Reading and re-serializing go through `kamadak-exif`. The encoders place
//! the block themselves, except for TIFF where it becomes part of the
//! output's own directory:
//!
//! | Target | Where the block goes |
//! |---|---|
//! | JPEG | `APP1` segment `"Exif\0\0" + TIFF block` (`JpegEncoder`) |
//! | PNG | `eXIf` chunk (`PngEncoder`) |
//! | WebP | `EXIF` chunk in the extended `VP8X` layout (`zenwebp`) |
//! | TIFF | IFD0 + Exif sub-IFD of the output file itself ([`encode_tiff`]) |
//!
//! A block is always *sanitized* before it is written: fields describing the
//! source file's pixel storage would be wrong for the re-encoded output.

use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use image::DynamicImage;
use std::io::{BufReader, Cursor};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
    #[error("EXIF block of {0} bytes does not fit in a JPEG APP1 segment")]
    TooLarge(usize),
    #[error("Malformed {container} data: {reason}")]
    Malformed {
        container: &'static str,
        reason: &'static str,
    },
}

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Largest TIFF block that fits in one APP1 segment (length field + header).
const MAX_APP1_PAYLOAD: usize = u16::MAX as usize - 2 - EXIF_HEADER.len();

/// TIFF IFD0 tags describing how the source stored its pixels.
const STRUCTURAL_TIFF_TAGS: &[u16] = &[
    254,  // NewSubfileType
    255,  // SubfileType
    256,  // ImageWidth
    257,  // ImageLength
    258,  // BitsPerSample
    259,  // Compression
    262,  // PhotometricInterpretation
    273,  // StripOffsets
    277,  // SamplesPerPixel
    278,  // RowsPerStrip
    279,  // StripByteCounts
    284,  // PlanarConfiguration
    317,  // Predictor
    322,  // TileWidth
    323,  // TileLength
    324,  // TileOffsets
    325,  // TileByteCounts
    330,  // SubIFDs
    338,  // ExtraSamples
    339,  // SampleFormat
    513,  // JPEGInterchangeFormat
    514,  // JPEGInterchangeFormatLength
    530,  // YCbCrSubSampling
    531,  // YCbCrPositioning
];

fn is_carried(field: &Field) -> bool {
    if field.ifd_num != In::PRIMARY {
        return false;
    }
    if matches!(field.value, Value::Unknown(..)) {
        return false;
    }
    if field.tag == Tag::ExifIFDPointer
        || field.tag == Tag::GPSInfoIFDPointer
        || field.tag == Tag::InteropIFDPointer
    {
        return false;
    }
    !(field.tag.context() == Context::Tiff && STRUCTURAL_TIFF_TAGS.contains(&field.tag.number()))
}

/// Read the EXIF block of an image file and return it sanitized.
///
/// Returns `Ok(None)` when the file has no EXIF, or nothing is left after
/// sanitizing.
pub fn read_exif(path: &Path) -> Result<Option<Vec<u8>>, ExifError> {
    let file = std::fs::File::open(path)?;
    let exif = match Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let fields: Vec<&Field> = exif.fields().filter(|f| is_carried(f)).collect();
    serialize(&fields, exif.little_endian())
}

/// Parse a TIFF-structured block and keep only the carried fields.
fn carried_fields(block: &[u8]) -> Result<(Vec<Field>, bool), ExifError> {
    let exif = Reader::new().read_raw(block.to_vec())?;
    let fields = exif.fields().filter(|f| is_carried(f)).cloned().collect();
    Ok((fields, exif.little_endian()))
}

fn serialize(fields: &[&Field], little_endian: bool) -> Result<Option<Vec<u8>>, ExifError> {
    if fields.is_empty() {
        return Ok(None);
    }
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, little_endian)?;
    Ok(Some(buf.into_inner()))
}

// ---------------------------------------------------------------------------
// JPEG: APP1
// ---------------------------------------------------------------------------

/// Fail with [`ExifError::TooLarge`] when `block` cannot be one APP1 segment.
pub fn fits_in_app1(block: &[u8]) -> Result<(), ExifError> {
    if block.len() > MAX_APP1_PAYLOAD {
        return Err(ExifError::TooLarge(block.len()));
    }
    Ok(())
}

/// Raw TIFF block of the first Exif APP1 segment, if any.
pub fn find_in_jpeg(jpeg: &[u8]) -> Option<&[u8]> {
    let mut pos = 2;
    while pos + 4 <= jpeg.len() && jpeg[pos] == 0xFF {
        let marker = jpeg[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        // The length field counts itself.
        let seg_len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let seg_end = pos + 2 + seg_len;
        if seg_len < 2 || seg_end > jpeg.len() {
            return None;
        }
        let payload = &jpeg[pos + 4..seg_end];
        if marker == 0xE1 && payload.starts_with(EXIF_HEADER) {
            return Some(&payload[EXIF_HEADER.len()..]);
        }
        pos = seg_end;
    }
    None
}

// ---------------------------------------------------------------------------
// WebP: RIFF chunks
// ---------------------------------------------------------------------------

fn malformed_webp(reason: &'static str) -> ExifError {
    ExifError::Malformed {
        container: "WebP",
        reason,
    }
}

/// A chunk inside the RIFF body: fourcc and payload (without padding).
struct Chunk<'a> {
    fourcc: [u8; 4],
    data: &'a [u8],
}

fn webp_chunks(webp: &[u8]) -> Result<Vec<Chunk<'_>>, ExifError> {
    if webp.len() < 12 || &webp[0..4] != b"RIFF" || &webp[8..12] != b"WEBP" {
        return Err(malformed_webp("missing RIFF/WEBP header"));
    }
    let mut chunks = Vec::new();
    let mut pos = 12;
    while pos + 8 <= webp.len() {
        let fourcc = [webp[pos], webp[pos + 1], webp[pos + 2], webp[pos + 3]];
        let size = u32::from_le_bytes([webp[pos + 4], webp[pos + 5], webp[pos + 6], webp[pos + 7]])
            as usize;
        let start = pos + 8;
        let end = start + size;
        if end > webp.len() {
            return Err(malformed_webp("chunk runs past end of data"));
        }
        chunks.push(Chunk {
            fourcc,
            data: &webp[start..end],
        });
        pos = end + (size & 1);
    }
    Ok(chunks)
}

/// TIFF block of the `EXIF` chunk of a WebP file, if any.
///
/// Some writers prefix the chunk with the JPEG-style `"Exif\0\0"` header;
/// it is skipped.
pub fn find_in_webp(webp: &[u8]) -> Option<&[u8]> {
    webp_chunks(webp)
        .ok()?
        .into_iter()
        .find(|c| &c.fourcc == b"EXIF")
        .map(|c| c.data.strip_prefix(EXIF_HEADER).unwrap_or(c.data))
}

// ---------------------------------------------------------------------------
// TIFF: the output's own IFD0
// ---------------------------------------------------------------------------

fn short(tag: Tag, values: Vec<u16>) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Short(values),
    }
}

fn long(tag: Tag, value: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Long(vec![value]),
    }
}

/// Interleaved little-endian samples plus their layout.
struct Samples {
    data: Vec<u8>,
    bits: u16,
    channels: u16,
    gray: bool,
    alpha: bool,
}

fn samples_of(image: &DynamicImage) -> Samples {
    fn le16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
    let (data, bits, channels, gray) = match image {
        DynamicImage::ImageLuma8(img) => (img.as_raw().clone(), 8, 1, true),
        DynamicImage::ImageLumaA8(img) => (img.as_raw().clone(), 8, 2, true),
        DynamicImage::ImageRgb8(img) => (img.as_raw().clone(), 8, 3, false),
        DynamicImage::ImageRgba8(img) => (img.as_raw().clone(), 8, 4, false),
        DynamicImage::ImageLuma16(img) => (le16(img.as_raw()), 16, 1, true),
        DynamicImage::ImageLumaA16(img) => (le16(img.as_raw()), 16, 2, true),
        DynamicImage::ImageRgb16(img) => (le16(img.as_raw()), 16, 3, false),
        DynamicImage::ImageRgba16(img) => (le16(img.as_raw()), 16, 4, false),
        other if other.color().has_alpha() => (le16(other.to_rgba16().as_raw()), 16, 4, false),
        other => (le16(other.to_rgb16().as_raw()), 16, 3, false),
    };
    Samples {
        data,
        bits,
        channels,
        gray,
        alpha: channels == 2 || channels == 4,
    }
}

/// Encode a baseline uncompressed TIFF whose IFD0 carries the EXIF fields.
pub fn encode_tiff(image: &DynamicImage, block: &[u8]) -> Result<Vec<u8>, ExifError> {
    let (carried, _) = carried_fields(block)?;
    let samples = samples_of(image);

    let mut structure = vec![
        long(Tag::ImageWidth, image.width()),
        long(Tag::ImageLength, image.height()),
        short(Tag::BitsPerSample, vec![samples.bits; samples.channels as usize]),
        short(Tag::Compression, vec![1]),
        short(
            Tag::PhotometricInterpretation,
            vec![if samples.gray { 1 } else { 2 }],
        ),
        short(Tag::SamplesPerPixel, vec![samples.channels]),
        long(Tag::RowsPerStrip, image.height()),
        short(Tag::PlanarConfiguration, vec![1]),
    ];
    if samples.alpha {
        // ExtraSamples = 2: unassociated alpha
        structure.push(short(Tag(Context::Tiff, 338), vec![2]));
    }

    let strips: Vec<&[u8]> = vec![&samples.data];
    let mut writer = Writer::new();
    for field in structure.iter().chain(carried.iter()) {
        writer.push_field(field);
    }
    writer.set_strips(&strips, In::PRIMARY);
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, true)?;
    Ok(buf.into_inner())
}
