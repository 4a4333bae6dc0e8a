//! Error types and the fatal-error bridge for marian-io.
//!
//! Every fallible step inside the crate returns [`Result`] with a
//! [`FileStreamError`]. The public constructors of the stream and temp-file
//! types do not hand these errors back: they route them through
//! [`OrAbort::or_abort`], which reports the error as a critical diagnostic and
//! terminates the process. The `try_*` constructors expose the underlying
//! `Result` for callers (and tests) that need to observe the failure.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for marian-io operations.
#[derive(Error, Debug)]
pub enum FileStreamError {
    /// File system related errors (permission denied, short write, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A stream was opened over a path that does not exist
    #[error("File '{}' does not exist", path.display())]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },

    /// Unique temp file creation failed
    #[error("Error while making a temporary based on '{}'", base.display())]
    TempFile {
        base: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Removing or closing a temp file failed during teardown
    #[error("Error while deleting '{}'", path.display())]
    Teardown {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

}

/// Standard Result type for marian-io operations.
pub type Result<T> = std::result::Result<T, FileStreamError>;

impl FileStreamError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn temp_file(base: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::TempFile {
            base: base.into(),
            source,
        }
    }

    pub fn teardown(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Teardown {
            path: path.into(),
            source,
        }
    }

    /// Create a Config error with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FileStreamError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

/// Turns a recoverable [`Result`] into the crate's fail-loud policy.
///
/// On `Err` the error (and its source chain) is logged at critical level, the
/// call stack is printed and the process aborts. The reported location is the
/// caller's, not this trait's.
pub trait OrAbort<T> {
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T> {
    #[track_caller]
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => crate::logging::abort_with(
                std::panic::Location::caller(),
                concat!(module_path!(), "::OrAbort::or_abort"),
                format_args!("{}", describe(&err)),
            ),
        }
    }
}

/// Render an error together with its source chain on one line.
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display_messages() {
        let path = PathBuf::from("/data/corpus.en.gz");

        let not_found = FileStreamError::file_not_found(&path);
        assert_eq!(
            not_found.to_string(),
            "File '/data/corpus.en.gz' does not exist"
        );

        let not_a_file = FileStreamError::NotAFile { path: path.clone() };
        assert_eq!(
            not_a_file.to_string(),
            "Path is not a regular file: /data/corpus.en.gz"
        );

        let temp = FileStreamError::temp_file(
            "/tmp/",
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exhausted"),
        );
        assert_eq!(
            temp.to_string(),
            "Error while making a temporary based on '/tmp/'"
        );
    }

    #[test]
    fn test_describe_includes_source_chain() {
        let err = FileStreamError::teardown(
            "/tmp/marian.abc123",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            describe(&err),
            "Error while deleting '/tmp/marian.abc123': denied"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let converted: FileStreamError = io_err.into();

        match converted {
            FileStreamError::FileError { message, .. } => {
                assert_eq!(message, "File not found");
            }
            _ => panic!("Expected FileError variant"),
        }
    }

    #[test]
    fn test_or_abort_passes_ok_through() {
        let value: Result<u32> = Ok(7);
        assert_eq!(value.or_abort(), 7);
    }
}
