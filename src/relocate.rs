//! Move converted files into a destination folder.
//!
//! Existing files in the destination are never replaced: a taken name gets
//! a numbered variant, `photo.jpg` → `photo (1).jpg` → `photo (2).jpg`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveReport {
    pub moved: Vec<(PathBuf, PathBuf)>,
    pub failed: Vec<(PathBuf, String)>,
}

/// `path` itself when `taken` says it is free, otherwise the first free
/// numbered variant `stem (n).ext` in the same folder.
pub fn first_free(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(path) {
        return path.to_path_buf();
    }
    let dir = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}){ext}")))
        .find(|p| !taken(p))
        .unwrap_or_else(|| path.to_path_buf())
}

/// First free path for `file_name` inside `dest`.
pub fn unique_destination(dest: &Path, file_name: &Path) -> PathBuf {
    first_free(&dest.join(file_name), |p| p.exists())
}

/// Rename, falling back to copy + remove (e.g. across filesystems).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

/// Move every file into `dest`, creating it if needed.
///
/// Failures are per file; the rest still move.
pub fn move_converted(files: &[PathBuf], dest: &Path) -> io::Result<MoveReport> {
    fs::create_dir_all(dest)?;
    let mut report = MoveReport::default();
    for file in files {
        let Some(name) = file.file_name() else {
            report.failed.push((file.clone(), "not a file path".to_string()));
            continue;
        };
        let target = unique_destination(dest, Path::new(name));
        match move_file(file, &target) {
            Ok(()) => {
                info!(from = %file.display(), to = %target.display(), "moved");
                report.moved.push((file.clone(), target));
            }
            Err(e) => {
                warn!(path = %file.display(), error = %e, "move failed");
                report.failed.push((file.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}
