//! # dropconvert
//!
//! Convert dropped image files and folders between JPG, JPEG, PNG, WebP, TIFF
//! and BMP. Transparency is flattened onto a background color for JPEG, and
//! EXIF metadata travels along whenever both formats can hold it.
//!
//! # Architecture
//!
//! A drop becomes a queue, the queue becomes a batch, and the batch is one
//! dispatcher call per file:
//!
//! ```text
//! paths / drop payload  →  ConversionQueue  →  convert_batch  →  convert(request, options)
//!                                                   │
//!                                                   └─ BatchEvent stream → status lines
//! ```
//!
//! Every file is independent. A failure is reported with its kind
//! ([`convert::ErrorKind`]) and the batch carries on.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | The closed set of output formats and the accepted input extensions |
//! | [`convert`] | The conversion dispatcher: one source file → one output file |
//! | [`imaging`] | Pure-Rust decode, pixel preparation, EXIF handling and encoding |
//! | [`queue`] | Drop payload parsing, folder expansion, the deduplicating queue |
//! | [`batch`] | Sequential conversion of a queue with progress events and a report |
//! | [`relocate`] | Move converted files into a folder without overwriting anything |
//! | [`config`] | `dropconvert.toml` loading, validation and merging over stock defaults |
//! | [`output`] | CLI status line formatting |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Codecs
//!
//! Decoding and encoding use the `image` crate, lossy WebP uses `zenwebp`,
//! EXIF uses `kamadak-exif`. No system libraries are linked, so the binary runs
//! anywhere it compiles.
//!
//! ## Backend Trait
//!
//! The dispatcher talks to an [`imaging::ImageBackend`], never to codecs
//! directly. Tests drive it with a recording mock to check which steps ran
//! without encoding real images.

pub mod batch;
pub mod config;
pub mod convert;
pub mod formats;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod queue;
pub mod relocate;

#[cfg(test)]
pub(crate) mod test_helpers;
