//! Image backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the three operations the dispatcher
//! needs: decode, read EXIF, and encode. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use a recording
//! mock so dispatch rules can be checked without touching codecs.

use super::exif::ExifError;
use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("{format} encode error: {source}")]
    Codec {
        format: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Exif(#[from] ExifError),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    /// Decode an image file into pixels.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Read the file's EXIF block, sanitized for re-embedding.
    fn read_exif(&self, path: &Path) -> Result<Option<Vec<u8>>, BackendError>;

    /// Encode pixels into the bytes of an output file.
    ///
    /// The image is already prepared for `params.format` (see
    /// [`compose::prepare_for`](super::compose::prepare_for)).
    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
