//! Read side of the file streams.

use super::compression::{decoding_reader, CompressionType};
use super::element::{decode_into, RawElement};
use super::temporary::TemporaryFile;
use super::validation::require_existing_file;
use super::StreamOptions;
use crate::error::{FileStreamError, OrAbort, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Buffered byte/text source over a path, a temp file, or a borrowed reader.
///
/// Like a C++ istream, a failed operation clears [`is_valid`](Self::is_valid)
/// and later extractions become no-ops; callers check validity after reading.
pub struct InputFileStream<'a> {
    path: Option<PathBuf>,
    compression: CompressionType,
    reader: Box<dyn BufRead + 'a>,
    valid: bool,
}

impl<'a> InputFileStream<'a> {
    /// Open `path` for reading, aborting if it does not exist.
    #[track_caller]
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::try_open(path).or_abort()
    }

    #[track_caller]
    pub fn open_with(path: impl AsRef<Path>, options: &StreamOptions) -> Self {
        Self::try_open_with(path, options).or_abort()
    }

    pub fn try_open(path: impl AsRef<Path>) -> Result<Self> {
        Self::try_open_with(path, &StreamOptions::default())
    }

    /// Open `path`, decompressing transparently when it ends in `.gz`.
    ///
    /// Named files use the default `BufReader` capacity; `options` only sizes
    /// temp-file buffers, it is accepted here so both sides share one config.
    pub fn try_open_with(path: impl AsRef<Path>, _options: &StreamOptions) -> Result<Self> {
        let path = path.as_ref();
        require_existing_file(path)?;

        let file = File::open(path).map_err(|e| {
            FileStreamError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;
        let compression = CompressionType::from_path(path);
        let len = file
            .metadata()
            .map_err(|e| {
                FileStreamError::file_error(
                    format!("Failed to get file metadata: {}", path.display()),
                    e,
                )
            })?
            .len();
        crate::log_at!(
            trace,
            "[io] Reading '{}' ({}, {} bytes)",
            path.display(),
            compression.name(),
            len
        );

        // A touched .gz file has no gzip header yet; it reads as end of input
        let reader: Box<dyn BufRead> = if compression.is_compressed() && len == 0 {
            Box::new(io::empty())
        } else {
            decoding_reader(file, compression)
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            compression,
            reader,
            valid: true,
        })
    }

    /// Read a borrowed temp file from its start.
    #[track_caller]
    pub fn from_temp(temp: &'a TemporaryFile) -> Self {
        Self::from_temp_with(temp, &StreamOptions::default())
    }

    #[track_caller]
    pub fn from_temp_with(temp: &'a TemporaryFile, options: &StreamOptions) -> Self {
        Self::try_from_temp_with(temp, options).or_abort()
    }

    pub fn try_from_temp_with(temp: &'a TemporaryFile, options: &StreamOptions) -> Result<Self> {
        let mut handle = temp.file_descriptor();
        handle.seek(SeekFrom::Start(0)).map_err(|e| {
            FileStreamError::file_error(
                format!("Failed to rewind '{}'", temp.file_name().display()),
                e,
            )
        })?;

        Ok(Self {
            path: None,
            compression: CompressionType::None,
            reader: Box::new(BufReader::with_capacity(options.buffer_size.max(1), handle)),
            valid: true,
        })
    }

    /// Wrap an already-open reader without adding a buffer of our own.
    ///
    /// Pass `&mut reader` to keep ownership with the caller.
    pub fn from_reader<R: BufRead + 'a>(reader: R) -> Self {
        Self {
            path: None,
            compression: CompressionType::None,
            reader: Box::new(reader),
            valid: true,
        }
    }

    /// Originating path; `None` for temp-file and reader sources
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// False once any read, extraction or parse has failed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The stream as a generic buffered reader
    pub fn as_reader(&mut self) -> &mut (dyn BufRead + 'a) {
        &mut *self.reader
    }

    /// Whether the stream is at end of input. Peeks, consuming nothing.
    pub fn empty(&mut self) -> bool {
        match self.reader.fill_buf() {
            Ok(buf) => buf.is_empty(),
            Err(_) => {
                self.valid = false;
                true
            }
        }
    }

    /// Extract the next whitespace-delimited token and parse it as `T`.
    ///
    /// Returns `None` and clears validity at end of input or when the token
    /// does not parse. The delimiter after the token is left unread.
    pub fn read_value<T: FromStr>(&mut self) -> Option<T> {
        if !self.valid {
            return None;
        }

        let parsed = match self.next_token() {
            Ok(Some(token)) => std::str::from_utf8(&token)
                .ok()
                .and_then(|text| text.parse().ok()),
            Ok(None) | Err(_) => None,
        };
        if parsed.is_none() {
            self.valid = false;
        }
        parsed
    }

    /// Chained extraction, the counterpart of `stream >> a >> b`.
    ///
    /// `dst` is left untouched when extraction fails.
    pub fn extract<T: FromStr>(&mut self, dst: &mut T) -> &mut Self {
        if let Some(value) = self.read_value() {
            *dst = value;
        }
        self
    }

    /// Read the next line into `line` without its `\n` or `\r\n` terminator.
    ///
    /// Returns false (and clears validity) when no line could be read.
    pub fn read_line(&mut self, line: &mut String) -> bool {
        line.clear();
        if !self.valid {
            return false;
        }

        match self.reader.read_line(line) {
            Ok(0) | Err(_) => {
                self.valid = false;
                false
            }
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                true
            }
        }
    }

    /// Fill `dst` with raw native-endian elements.
    ///
    /// Returns the number of bytes requested, not the number transferred. A
    /// short read clears validity and leaves `dst` untouched.
    pub fn read_raw<T: RawElement>(&mut self, dst: &mut [T]) -> usize {
        let requested = dst.len() * T::SIZE;
        if !self.valid {
            return requested;
        }

        let mut bytes = vec![0u8; requested];
        match self.reader.read_exact(&mut bytes) {
            Ok(()) => decode_into(&bytes, dst),
            Err(_) => self.valid = false,
        }
        requested
    }

    fn next_token(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let exhausted = skip == buf.len();
            self.reader.consume(skip);
            if !exhausted {
                break;
            }
        }

        let mut token = Vec::new();
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let len = buf.iter().take_while(|b| !b.is_ascii_whitespace()).count();
            token.extend_from_slice(&buf[..len]);
            let delimited = len < buf.len();
            self.reader.consume(len);
            if delimited {
                break;
            }
        }
        Ok(Some(token))
    }
}

impl Read for InputFileStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.reader.read(buf);
        if result.is_err() {
            self.valid = false;
        }
        result
    }
}

impl BufRead for InputFileStream<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self.reader.fill_buf() {
            Ok(buf) => Ok(buf),
            Err(e) => {
                self.valid = false;
                Err(e)
            }
        }
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl fmt::Debug for InputFileStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFileStream")
            .field("path", &self.path)
            .field("compression", &self.compression)
            .field("valid", &self.valid)
            .finish()
    }
}
