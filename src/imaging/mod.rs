//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` |
//! | **Alpha flatten** | [`compose::flatten_onto`] |
//! | **EXIF** | `kamadak-exif` in [`exif`], embedded by the encoders |
//! | **Encode** | `image` encoders, `zenwebp` for WebP |
//!
//! The module is split into:
//! - **Compose**: pure pixel preparation per target (unit testable)
//! - **Parameters**: data structures describing an encode
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **EXIF**: read and sanitize metadata blocks, write EXIF-carrying TIFF

pub mod backend;
pub mod compose;
pub mod exif;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use params::{Background, EncodeParams, Quality};
pub use rust_backend::RustBackend;
