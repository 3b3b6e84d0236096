//! Local directory enumeration.
//!
//! The local source lists the image directory on every request. Only regular
//! files directly inside the directory count; subdirectories are ignored and
//! the match on extension is case-insensitive.
//!
//! ```text
//! images/
//! ├── a.jpg        ✓
//! ├── B.PNG        ✓
//! ├── notes.txt    ✗ not an image
//! └── drafts/      ✗ directory
//! ```
//!
//! Two entry points with different failure contracts:
//!
//! | Function            | On a missing/unreadable directory |
//! |---------------------|-----------------------------------|
//! | [`scan_dir`]        | `Err(ScanError)`                  |
//! | [`list_images`]     | warn and return `[]`              |
//!
//! The page route uses [`list_images`] so a broken directory renders the
//! empty state instead of an error page. [`build_local_manifest`] is the
//! offline generator behind `ember-gal manifest`.

use crate::collate;
use crate::types::{Manifest, ManifestEntry};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions recognised as images. Compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "avif"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Whether the text after the last `.` in `name` is one of
/// [`IMAGE_EXTENSIONS`]. A bare `.png` counts.
pub fn is_image(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// List image filenames directly inside `dir`, in directory order.
pub fn scan_dir(dir: &Path) -> Result<Vec<String>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    if !dir.is_dir() {
        if dir.exists() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }
        return Err(io_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "directory does not exist",
        )));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        // Non-UTF-8 names cannot be addressed by URL; skip them.
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_image(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Like [`scan_dir`] but never fails: errors are logged and yield `[]`.
pub fn list_images(dir: &Path) -> Vec<String> {
    match scan_dir(dir) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot list image directory");
            Vec::new()
        }
    }
}

/// Snapshot `dir` into a manifest of sorted filenames.
///
/// A missing directory produces an empty manifest and a warning rather than
/// an error, so deploy scripts can run the generator before any image exists.
pub fn build_local_manifest(dir: &Path) -> Manifest {
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "image directory not found, writing empty manifest");
        return Manifest::new(Vec::new());
    }
    let mut names = list_images(dir);
    names.sort_by(|a, b| collate::compare(a, b));
    Manifest::new(names.into_iter().map(ManifestEntry::Name).collect())
}
