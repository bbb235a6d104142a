//! The conversion dispatcher.
//!
//! One call converts one file: validate the source extension, decode, carry
//! EXIF when both sides can hold it, prepare pixels for the target, encode,
//! write. Every call is independent and leaves the source untouched.
//!
//! ## Output naming
//!
//! ```text
//! <output_dir>/<source stem><suffix>.<target extension>
//! photos/IMG_0042.webp  --JPG, suffix "_converted"-->  out/IMG_0042_converted.jpg
//! ```
//!
//! An existing file at the output path is replaced. A path that resolves to
//! the source itself is refused, and so is a suffix holding a path separator:
//! outputs only ever land directly in `output_dir`.

use crate::formats::{self, TargetFormat};
use crate::imaging::compose::prepare_for;
use crate::imaging::{Background, BackendError, EncodeParams, ImageBackend, Quality, RustBackend};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// What went wrong, without the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UnsupportedFormat,
    DecodeFailure,
    WriteFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::UnsupportedFormat => "unsupported format",
            ErrorKind::DecodeFailure => "decode failure",
            ErrorKind::WriteFailure => "write failure",
        })
    }
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Unsupported format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Failed to decode {}: {source}", path.display())]
    DecodeFailure {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            ConvertError::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            ConvertError::WriteFailure { .. } => ErrorKind::WriteFailure,
        }
    }

    /// The file the error is about: the source for unsupported/decode
    /// errors, the destination for write errors.
    pub fn path(&self) -> &Path {
        match self {
            ConvertError::UnsupportedFormat { path }
            | ConvertError::DecodeFailure { path, .. }
            | ConvertError::WriteFailure { path, .. } => path,
        }
    }
}

/// A single (source, target) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub source: PathBuf,
    pub target: TargetFormat,
}

impl ConvertRequest {
    pub fn new(source: impl Into<PathBuf>, target: TargetFormat) -> Self {
        Self {
            source: source.into(),
            target,
        }
    }
}

/// Settings shared by every file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub keep_exif: bool,
    pub suffix: String,
    pub background: Background,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("converted_output"),
            quality: Quality::default(),
            keep_exif: true,
            suffix: "_converted".to_string(),
            background: Background::default(),
        }
    }
}

/// Where the converted file for `source` will be written.
pub fn output_path(source: &Path, target: TargetFormat, options: &ConvertOptions) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    options
        .output_dir
        .join(format!("{}{}.{}", stem, options.suffix, target.extension()))
}

/// Convert one file with the pure-Rust backend.
pub fn convert(request: &ConvertRequest, options: &ConvertOptions) -> Result<PathBuf, ConvertError> {
    convert_with_backend(&RustBackend::new(), request, options)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Convert one file using a specific backend (allows testing with mock).
pub fn convert_with_backend(
    backend: &impl ImageBackend,
    request: &ConvertRequest,
    options: &ConvertOptions,
) -> Result<PathBuf, ConvertError> {
    let output = output_path(&request.source, request.target, options);
    convert_into(backend, request, options, output)
}

/// Convert one file to an explicit output path.
///
/// The batch uses this to give sources that share a stem distinct outputs.
pub fn convert_into(
    backend: &impl ImageBackend,
    request: &ConvertRequest,
    options: &ConvertOptions,
    output: PathBuf,
) -> Result<PathBuf, ConvertError> {
    let source = &request.source;
    let Some(source_format) = formats::source_format(source) else {
        return Err(ConvertError::UnsupportedFormat {
            path: source.clone(),
        });
    };

    if options.suffix.contains(['/', '\\']) {
        return Err(ConvertError::WriteFailure {
            path: output,
            source: BackendError::ProcessingFailed(
                "suffix must not contain path separators".into(),
            ),
        });
    }
    if is_same_file(source, &output) {
        return Err(ConvertError::WriteFailure {
            path: output,
            source: BackendError::ProcessingFailed("output would overwrite the source".into()),
        });
    }

    let image = backend
        .decode(source)
        .map_err(|e| ConvertError::DecodeFailure {
            path: source.clone(),
            source: e,
        })?;

    let exif = if options.keep_exif
        && formats::carries_exif(source_format)
        && request.target.supports_exif()
    {
        match backend.read_exif(source) {
            Ok(block) => block,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "EXIF not carried over");
                None
            }
        }
    } else {
        None
    };

    let prepared = prepare_for(image, request.target, options.background);
    let mut params = EncodeParams {
        format: request.target,
        quality: options.quality,
        exif,
    };
    let bytes = match backend.encode(&prepared, &params) {
        Ok(bytes) => bytes,
        Err(BackendError::Exif(e)) if params.exif.is_some() => {
            warn!(path = %source.display(), error = %e, "EXIF not embedded");
            params.exif = None;
            backend
                .encode(&prepared, &params)
                .map_err(|e| ConvertError::WriteFailure {
                    path: output.clone(),
                    source: e,
                })?
        }
        Err(e) => {
            return Err(ConvertError::WriteFailure {
                path: output,
                source: e,
            });
        }
    };

    write_output(&output, &bytes).map_err(|e| ConvertError::WriteFailure {
        path: output.clone(),
        source: e.into(),
    })?;
    info!(
        source = %source.display(),
        output = %output.display(),
        exif = params.exif.is_some(),
        "converted"
    );
    Ok(output)
}

/// Write the encoded bytes, removing a partial file on failure.
fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if let Err(e) = std::fs::write(path, bytes) {
        if path.is_file() {
            debug!(path = %path.display(), "removing partial output");
            let _ = std::fs::remove_file(path);
        }
        return Err(e);
    }
    Ok(())
}
