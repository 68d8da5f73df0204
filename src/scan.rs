//! Sibling-directory scanning for the image collection.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Error;

/// Extensions (lowercase, without dot) that make up a collection.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// Ordered collection produced by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Image paths in directory-listing order, sorted by file name.
    pub paths: Vec<PathBuf>,
    /// Index of the target path, `Some(0)` if it was filtered out, `None`
    /// when the collection is empty.
    pub selection: Option<usize>,
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// List the images next to `target` and locate `target` among them.
///
/// # Errors
/// Returns [`Error::Path`] if `target` is missing or not a regular file.
pub fn scan(target: &Path) -> Result<ScanResult, Error> {
    if !target.is_file() {
        return Err(Error::Path(target.to_path_buf()));
    }
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut paths = Vec::new();
    let mut selection = None;
    for entry in WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .flatten()
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_image_extension(path) {
            continue;
        }
        if selection.is_none() && same_file(path, target) {
            selection = Some(paths.len());
        }
        paths.push(path.to_path_buf());
    }

    if paths.is_empty() {
        selection = None;
    } else if selection.is_none() {
        selection = Some(0);
    }
    debug!(
        dir = %parent.display(),
        count = paths.len(),
        selection = ?selection,
        "scanned collection"
    );
    Ok(ScanResult { paths, selection })
}

fn same_file(candidate: &Path, target: &Path) -> bool {
    if candidate == target {
        return true;
    }
    // "./a.png" and "a.png" name the same entry
    candidate.file_name() == target.file_name()
}
