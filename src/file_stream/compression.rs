//! Compression framing selection for file streams.
//!
//! The filename suffix is the only signal: a path ending in `.gz` is read and
//! written through gzip, everything else is raw bytes. Content is never
//! sniffed, so a `.gz` file that holds plain text fails on the first read.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Framing applied between a stream and its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Raw bytes
    None,
    /// Gzip member format (.gz files)
    Gzip,
}

impl CompressionType {
    /// Select the framing for `path` from its extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::Gzip,
            _ => Self::None,
        }
    }

    /// Get human-readable name for the compression type
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }

    /// Check if this type represents a compressed format
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Wrap `source` so reads yield decompressed bytes.
///
/// Concatenated gzip members are decoded as one stream, as `gzip -d` does.
pub(crate) fn decoding_reader<R>(source: R, compression: CompressionType) -> Box<dyn BufRead>
where
    R: Read + 'static,
{
    match compression {
        CompressionType::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(
            source,
        )))),
        CompressionType::None => Box::new(BufReader::new(source)),
    }
}

/// Gzip encoder over a buffered sink at `level` (clamped to 0-9)
pub(crate) fn gzip_writer<W: Write>(sink: W, level: u32) -> GzEncoder<BufWriter<W>> {
    GzEncoder::new(BufWriter::new(sink), Compression::new(level.min(9)))
}
