//! Local filesystem collaborator
//!
//! Blocking helpers for the local side of a copy: walking a source tree,
//! copying files and trees, and creating destination directories.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::metadata::PosixMetadata;

/// Every regular file under `root`, sorted by path
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Create a directory and all of its parents
pub fn mkdir_all(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Create the parent directory of `path` if it is missing.
///
/// Fails with `NotADirectory` when an ancestor exists as a regular file.
pub fn ensure_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }
    if let Some(file) = parent.ancestors().find(|p| p.is_file()) {
        return Err(Error::NotADirectory(file.display().to_string()));
    }
    mkdir_all(parent)
}

/// Copy a single file.
///
/// When `dst` is an existing directory the file lands under it by name.
pub fn copy_file(src: &Path, dst: &Path) -> Result<PathBuf> {
    let target = if dst.is_dir() {
        let name = src
            .file_name()
            .ok_or_else(|| Error::InvalidPath(format!("No file name in {}", src.display())))?;
        dst.join(name)
    } else {
        dst.to_path_buf()
    };
    ensure_parent(&target)?;
    std::fs::copy(src, &target)?;
    Ok(target)
}

/// Copy the directory tree `src` to `dst`, merging into existing directories.
///
/// With `preserve_posix` each copied file gets its source's times, owner and
/// mode.
pub fn copy_tree(src: &Path, dst: &Path, preserve_posix: bool) -> Result<usize> {
    if dst.is_file() {
        return Err(Error::NotADirectory(dst.display().to_string()));
    }
    mkdir_all(dst)?;

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::General(e.to_string()))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            mkdir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)?;
            if preserve_posix {
                let meta = entry.metadata().map_err(std::io::Error::from)?;
                PosixMetadata::from_local(&meta).apply(&target);
            }
            copied += 1;
        }
    }
    Ok(copied)
}
