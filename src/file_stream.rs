//! Scoped file resources: temporary files and gzip-aware file streams.
//!
//! - [`TemporaryFile`] creates a uniquely named scratch file and removes it
//!   when dropped (or right away, with early unlink).
//! - [`InputFileStream`] / [`OutputFileStream`] read and write a named path,
//!   a borrowed [`TemporaryFile`], or an already-open reader/writer, with gzip
//!   framing selected by the `.gz` suffix.
//!
//! Construction failures are fatal. Each constructor also has a `try_*`
//! counterpart that returns the error instead.

use std::path::PathBuf;

pub mod compression;
pub mod element;
pub mod input;
pub mod output;
pub mod temporary;
pub mod validation;

mod platform;

pub use compression::CompressionType;
pub use element::RawElement;
pub use input::InputFileStream;
pub use output::OutputFileStream;
pub use temporary::{TemporaryFile, TEMP_PREFIX};
pub use validation::require_existing_file;

/// Default directory temp files are created in
pub const DEFAULT_TEMP_BASE: &str = "/tmp/";

/// Buffer used when streaming through a borrowed temp file
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Gzip level used when writing `.gz` files
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Tuning knobs shared by input and output streams.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct StreamOptions {
    /// Buffer capacity for temp-file sources and sinks
    pub buffer_size: usize,
    /// Gzip level (0-9) for `.gz` output
    pub compression_level: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Where and how [`TemporaryFile`]s are created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TempFileOptions {
    /// Directory (or name prefix) the temp name is built on
    pub base: PathBuf,
    /// Remove the directory entry right after creation
    pub early_unlink: bool,
}

impl Default for TempFileOptions {
    fn default() -> Self {
        Self {
            base: PathBuf::from(DEFAULT_TEMP_BASE),
            early_unlink: true,
        }
    }
}
