//! # marian-io - scoped file resources for NMT training pipelines
//!
//! Temporary files with guaranteed cleanup and file streams that read and
//! write gzip transparently, plus the logging facade they report through.
//!
//! ## Architecture
//!
//! - [`error`] - Error types and the fatal-abort bridge
//! - [`logging`] - Named loggers, level dispatch and `abort!`
//! - [`file_stream`] - `TemporaryFile`, `InputFileStream`, `OutputFileStream`
//! - [`config`] - Settings for temp files, streams and logging
//!
//! ## Failure model
//!
//! Opening a missing path, failing to create a temp file, or failing to
//! remove or close one are fatal: a diagnostic naming the path is logged and
//! the process aborts. Read and write failures after construction only clear
//! the stream's validity flag.

pub mod config;
pub mod error;
pub mod file_stream;
pub mod logging;

pub use config::IoConfig;
pub use error::{FileStreamError, OrAbort, Result};
pub use file_stream::{
    CompressionType, InputFileStream, OutputFileStream, StreamOptions, TempFileOptions,
    TemporaryFile,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
