//! Platform backends for creating and releasing temporary files.
//!
//! Every platform goes through the same [`TempFileBackend`] interface; the
//! implementation is picked at build time. Unix unlinks an early-unlink file
//! right after creation. Windows cannot drop the name of an open file, so it
//! opens with delete-on-close instead.

use crate::error::Result;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) type PlatformBackend = unix::UnixBackend;
#[cfg(windows)]
pub(crate) type PlatformBackend = windows::WindowsBackend;

/// Random characters appended after the name prefix
pub(crate) const UNIQUE_SUFFIX_LEN: usize = 6;

pub(crate) trait TempFileBackend {
    /// Turn a user-supplied base into the string the temp name is built on
    fn normalize_base(base: &Path) -> PathBuf {
        normalize_dir_base(base)
    }

    /// Exclusively create `base + prefix + <unique>` and open it read/write
    fn create(base: &Path, prefix: &str, early_unlink: bool) -> Result<(File, PathBuf)>;

    /// Remove (when deferred) and close a file made by [`Self::create`]
    fn release(file: File, path: &Path, early_unlink: bool) -> Result<()>;
}

/// Append a separator when `base` names an existing directory without one.
///
/// A base that does not exist is left alone and becomes a name prefix.
pub(crate) fn normalize_dir_base(base: &Path) -> PathBuf {
    if base.as_os_str().is_empty() || ends_with_separator(base) || !base.is_dir() {
        return base.to_path_buf();
    }
    let mut normalized = base.as_os_str().to_os_string();
    normalized.push(MAIN_SEPARATOR_STR);
    PathBuf::from(normalized)
}

fn ends_with_separator(path: &Path) -> bool {
    path.to_string_lossy()
        .chars()
        .last()
        .map(std::path::is_separator)
        .unwrap_or(false)
}

/// Split a normalized base into the directory that will hold the file and
/// the name prefix, so `/tmp/` gives (`/tmp/`, `marian.`) and `/tmp/run`
/// gives (`/tmp`, `runmarian.`). A bare prefix gives an empty directory,
/// meaning the current one.
pub(crate) fn split_base(base: &Path, prefix: &str) -> (PathBuf, OsString) {
    if base.as_os_str().is_empty() {
        return (PathBuf::new(), OsString::from(prefix));
    }
    if ends_with_separator(base) {
        return (base.to_path_buf(), OsString::from(prefix));
    }

    let dir = base.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut name_prefix = base
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name_prefix.push(prefix);
    (dir, name_prefix)
}

/// The name of a created file spelled relative to `dir` as the caller gave it.
///
/// `tempfile` resolves relative directories against the working directory;
/// an empty base still yields a bare `marian.XXXXXX`.
pub(crate) fn reported_name(dir: &Path, created: &Path) -> PathBuf {
    match created.file_name() {
        Some(name) => dir.join(name),
        None => created.to_path_buf(),
    }
}
