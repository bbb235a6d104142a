//! CLI output formatting.
//!
//! Each stage has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Diagnostics go through
//! `tracing` on stderr, so stdout only carries these lines.
//!
//! # Output Format
//!
//! ```text
//! Added 3 file(s). Total in queue: 3.
//! Converting 3 file(s) to JPG
//! [1/3] holiday.png → converted_output/holiday_converted.jpg
//! [2/3] broken.jpg failed: decode failure
//!     Failed to decode drop/broken.jpg: IO error: failed to fill whole buffer
//! [3/3] scan.tif → converted_output/scan_converted.jpg
//! Done. Converted 2 file(s), 1 failed. Output: converted_output
//! ```

use crate::batch::{BatchEvent, BatchReport};
use crate::formats::{self, TargetFormat};
use crate::relocate::MoveReport;
use std::path::Path;

/// File name for display, falling back to the full path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `[index/total]` progress prefix.
fn progress(index: usize, total: usize) -> String {
    format!("[{}/{}]", index, total)
}

// ============================================================================
// Queue
// ============================================================================

pub fn format_queue_summary(added: usize, total: usize) -> String {
    format!("Added {} file(s). Total in queue: {}.", added, total)
}

pub fn print_queue_summary(added: usize, total: usize) {
    println!("{}", format_queue_summary(added, total));
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
///
/// `Finished` prints nothing: the summary comes from [`format_batch_summary`],
/// which also knows the output directory.
pub fn format_batch_event(event: &BatchEvent, target: TargetFormat) -> Vec<String> {
    match event {
        BatchEvent::Started { total: 0 } => vec!["Nothing to convert.".to_string()],
        BatchEvent::Started { total } => {
            vec![format!("Converting {} file(s) to {}", total, target)]
        }
        BatchEvent::Converted {
            index,
            total,
            source,
            output,
        } => vec![format!(
            "{} {} → {}",
            progress(*index, *total),
            display_name(source),
            output.display()
        )],
        BatchEvent::Failed {
            index,
            total,
            source,
            kind,
            message,
        } => vec![
            format!(
                "{} {} failed: {}",
                progress(*index, *total),
                display_name(source),
                kind
            ),
            format!("    {}", message),
        ],
        BatchEvent::Finished { .. } => Vec::new(),
    }
}

pub fn print_batch_event(event: &BatchEvent, target: TargetFormat) {
    for line in format_batch_event(event, target) {
        println!("{}", line);
    }
}

pub fn format_batch_summary(report: &BatchReport, output_dir: &Path) -> String {
    format!(
        "Done. Converted {} file(s), {} failed. Output: {}",
        report.converted.len(),
        report.failed.len(),
        output_dir.display()
    )
}

pub fn print_batch_summary(report: &BatchReport, output_dir: &Path) {
    println!("{}", format_batch_summary(report, output_dir));
}

// ============================================================================
// Relocate
// ============================================================================

pub fn format_move_summary(report: &MoveReport, dest: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Moved {} file(s) to {}",
        report.moved.len(),
        dest.display()
    )];
    for (path, message) in &report.failed {
        lines.push(format!("    {} not moved: {}", display_name(path), message));
    }
    lines
}

pub fn print_move_summary(report: &MoveReport, dest: &Path) {
    for line in format_move_summary(report, dest) {
        println!("{}", line);
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Listing for the `formats` command.
pub fn format_formats() -> Vec<String> {
    let mut lines = vec!["Output formats".to_string()];
    for format in TargetFormat::ALL {
        let exif = if format.supports_exif() {
            ""
        } else {
            " (no EXIF)"
        };
        lines.push(format!("    {:<5} .{}{}", format.name(), format.extension(), exif));
    }
    lines.push(String::new());
    lines.push("Accepted inputs".to_string());
    let inputs: Vec<&str> = formats::supported_input_extensions().collect();
    lines.push(format!("    {}", inputs.join(" ")));
    lines
}

pub fn print_formats() {
    for line in format_formats() {
        println!("{}", line);
    }
}
