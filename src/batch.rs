//! Sequential batch conversion over the queue.
//!
//! Files are converted one at a time, in queue order. A failing file is
//! recorded and the batch moves on. Sources that share a stem (`a.png` and
//! `a.bmp`) never overwrite each other: later ones get `a_converted (1).jpg`
//! and so on. Progress is streamed as [`BatchEvent`]s
//! over an optional channel so a printer (or a UI) can follow along from
//! another thread.

use crate::convert::{ConvertOptions, ConvertRequest, ErrorKind, convert_into, output_path};
use crate::formats::TargetFormat;
use crate::imaging::{ImageBackend, RustBackend};
use crate::relocate::first_free;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::warn;

/// Progress notification for one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Converted {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        source: PathBuf,
        output: PathBuf,
    },
    Failed {
        index: usize,
        total: usize,
        source: PathBuf,
        kind: ErrorKind,
        message: String,
    },
    Finished {
        converted: usize,
        failed: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedFile {
    pub source: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFile {
    pub source: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of a batch, in queue order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub converted: Vec<ConvertedFile>,
    pub failed: Vec<FailedFile>,
}

impl BatchReport {
    /// Paths of the files written by this batch.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.converted.iter().map(|c| c.output.clone()).collect()
    }
}

/// Convert every source with the pure-Rust backend.
pub fn convert_batch(
    sources: &[PathBuf],
    target: TargetFormat,
    options: &ConvertOptions,
    events: Option<Sender<BatchEvent>>,
) -> BatchReport {
    convert_batch_with_backend(&RustBackend::new(), sources, target, options, events)
}

/// Convert every source using a specific backend (allows testing with mock).
pub fn convert_batch_with_backend(
    backend: &impl ImageBackend,
    sources: &[PathBuf],
    target: TargetFormat,
    options: &ConvertOptions,
    events: Option<Sender<BatchEvent>>,
) -> BatchReport {
    // A dropped receiver only means nobody is listening any more.
    let emit = |event: BatchEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    let total = sources.len();
    emit(BatchEvent::Started { total });

    let mut report = BatchReport::default();
    let mut written: HashSet<PathBuf> = HashSet::new();
    for (i, source) in sources.iter().enumerate() {
        let index = i + 1;
        let request = ConvertRequest::new(source.as_path(), target);
        let output = first_free(&output_path(source, target, options), |p: &Path| {
            written.contains(p)
        });
        match convert_into(backend, &request, options, output) {
            Ok(output) => {
                written.insert(output.clone());
                emit(BatchEvent::Converted {
                    index,
                    total,
                    source: source.clone(),
                    output: output.clone(),
                });
                report.converted.push(ConvertedFile {
                    source: source.clone(),
                    output,
                });
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "conversion failed");
                let failure = FailedFile {
                    source: source.clone(),
                    kind: e.kind(),
                    message: e.to_string(),
                };
                emit(BatchEvent::Failed {
                    index,
                    total,
                    source: failure.source.clone(),
                    kind: failure.kind,
                    message: failure.message.clone(),
                });
                report.failed.push(failure);
            }
        }
    }

    emit(BatchEvent::Finished {
        converted: report.converted.len(),
        failed: report.failed.len(),
    });
    report
}
