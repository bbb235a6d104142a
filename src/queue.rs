//! The conversion queue: what the user has dropped so far.
//!
//! Dropped items arrive either as separate paths or as a raw Tk
//! `DND_FILES` payload, a Tcl list where paths containing spaces are wrapped
//! in braces:
//!
//! ```text
//! {C:/Users/me/My Pictures/a.png} C:/tmp/b.jpg
//! ```
//!
//! Folders expand recursively to every supported image beneath them. The
//! queue keeps insertion order and ignores files it already holds, compared
//! by canonical path.

use crate::formats;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Split a drop payload into its items, without touching the filesystem.
pub fn split_drop_payload(data: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = data.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut item = String::new();
        if c == '{' {
            chars.next();
            let mut depth = 1;
            for c in chars.by_ref() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                item.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                item.push(c);
                chars.next();
            }
        }
        if !item.is_empty() {
            items.push(item);
        }
    }
    items
}

/// Parse a drop payload into the paths that exist on disk.
pub fn parse_drop_payload(data: &str) -> Vec<PathBuf> {
    split_drop_payload(data)
        .into_iter()
        .map(|item| PathBuf::from(item.strip_prefix("file://").unwrap_or(&item)))
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                debug!(path = %path.display(), "dropped path does not exist");
            }
            exists
        })
        .collect()
}

/// Expand dropped paths: supported files as-is, folders recursively.
///
/// Folder contents come back sorted by file name. Unsupported files and
/// unreadable directory entries are skipped.
pub fn expand_dropped(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| formats::is_supported_input(p));
            files.extend(found);
        } else if path.is_file() && formats::is_supported_input(path) {
            files.push(path.clone());
        }
    }
    files
}

fn identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Ordered, duplicate-free list of files waiting to be converted.
#[derive(Debug, Default)]
pub struct ConversionQueue {
    items: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl ConversionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add supported image files; returns how many were new.
    pub fn add<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut added = 0;
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() || !formats::is_supported_input(path) {
                continue;
            }
            if self.seen.insert(identity(path)) {
                self.items.push(path.to_path_buf());
                added += 1;
            }
        }
        added
    }

    /// Expand dropped files and folders, then add them.
    pub fn add_dropped(&mut self, paths: &[PathBuf]) -> usize {
        self.add(expand_dropped(paths))
    }

    /// Remove entries by position; returns how many were removed.
    ///
    /// Out-of-range and repeated indices are ignored.
    pub fn remove(&mut self, indices: &[usize]) -> usize {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.items.len())
            .collect();
        sorted.sort_unstable();
        sorted.dedup();
        for &i in sorted.iter().rev() {
            let removed = self.items.remove(i);
            self.seen.remove(&identity(&removed));
        }
        sorted.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().map(PathBuf::as_path)
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.items
    }
}
