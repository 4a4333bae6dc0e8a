//! Preconditions checked before a stream opens a named path.

use crate::error::{FileStreamError, Result};
use std::path::Path;

/// Require that `path` already exists and is not a directory.
///
/// Both input and output streams call this: an output stream never creates
/// its target by name, callers pre-create it or write through a temp file.
pub fn require_existing_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(FileStreamError::file_not_found(path));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| FileStreamError::file_error("Failed to read file metadata", e))?;

    if metadata.is_dir() {
        return Err(FileStreamError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}
