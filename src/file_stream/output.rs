//! Write side of the file streams.

use super::compression::{gzip_writer, CompressionType};
use super::element::{encode, RawElement};
use super::temporary::TemporaryFile;
use super::validation::require_existing_file;
use super::StreamOptions;
use crate::error::{describe, FileStreamError, OrAbort, Result};
use flate2::write::GzEncoder;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

enum Sink<'a> {
    /// Needs an explicit trailer on finish
    Gzip(GzEncoder<BufWriter<File>>),
    Plain(Box<dyn Write + 'a>),
}

/// Byte/text sink over an existing path, a temp file, or a borrowed writer.
///
/// Dropping the stream finishes it: buffers are flushed and the gzip trailer
/// is written. Call [`finish`](Self::finish) to observe failures there.
pub struct OutputFileStream<'a> {
    path: Option<PathBuf>,
    compression: CompressionType,
    sink: Sink<'a>,
    valid: bool,
    finished: bool,
}

impl<'a> OutputFileStream<'a> {
    /// Open `path` for writing, aborting if it does not already exist.
    ///
    /// The file is truncated. A new file is never created by name.
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

    pub fn try_open_with(path: impl AsRef<Path>, options: &StreamOptions) -> Result<Self> {
        let path = path.as_ref();
        require_existing_file(path)?;

        let file = File::create(path).map_err(|e| {
            FileStreamError::file_error(
                format!("Failed to open file for writing: {}", path.display()),
                e,
            )
        })?;
        let compression = CompressionType::from_path(path);
        let sink = match compression {
            CompressionType::Gzip => Sink::Gzip(gzip_writer(file, options.compression_level)),
            CompressionType::None => Sink::Plain(Box::new(BufWriter::new(file))),
        };
        crate::log_at!(
            trace,
            "[io] Writing '{}' ({})",
            path.display(),
            compression.name()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            compression,
            sink,
            valid: true,
            finished: false,
        })
    }

    /// Write into a borrowed temp file from its start.
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

        let writer = BufWriter::with_capacity(options.buffer_size.max(1), handle);
        Ok(Self::with_sink(Sink::Plain(Box::new(writer))))
    }

    /// Wrap an already-open writer without adding a buffer of our own.
    ///
    /// Pass `&mut writer` to keep ownership with the caller.
    pub fn from_writer<W: Write + 'a>(writer: W) -> Self {
        Self::with_sink(Sink::Plain(Box::new(writer)))
    }

    fn with_sink(sink: Sink<'a>) -> Self {
        Self {
            path: None,
            compression: CompressionType::None,
            sink,
            valid: true,
            finished: false,
        }
    }

    /// Target path; `None` for temp-file and writer sinks
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// False once any write has failed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The stream as a generic writer
    pub fn as_writer(&mut self) -> &mut (dyn Write + 'a) {
        match &mut self.sink {
            Sink::Gzip(encoder) => encoder as &mut (dyn Write + 'a),
            Sink::Plain(writer) => &mut **writer,
        }
    }

    /// Formatted insertion, the counterpart of `stream << value`.
    pub fn write_value<T: Display + ?Sized>(&mut self, value: &T) -> &mut Self {
        if self.valid && write!(self, "{value}").is_err() {
            self.valid = false;
        }
        self
    }

    /// Write raw native-endian elements.
    ///
    /// Returns the number of bytes requested, not the number transferred;
    /// check [`is_valid`](Self::is_valid) afterwards.
    pub fn write_raw<T: RawElement>(&mut self, src: &[T]) -> usize {
        let bytes = encode(src);
        if self.valid && self.write_all(&bytes).is_err() {
            self.valid = false;
        }
        bytes.len()
    }

    /// Flush all buffers and, for gzip, write the trailer.
    ///
    /// Later writes fail. Calling this again is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let result = match &mut self.sink {
            Sink::Gzip(encoder) => encoder
                .try_finish()
                .and_then(|()| encoder.get_mut().flush()),
            Sink::Plain(writer) => writer.flush(),
        };
        result.map_err(|e| {
            self.valid = false;
            let target = self
                .path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stream".to_string());
            FileStreamError::file_error(format!("Failed to finish {target}"), e)
        })
    }

    fn check_open(&self) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output stream already finished",
            ));
        }
        Ok(())
    }
}

impl Write for OutputFileStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        let result = self.as_writer().write(buf);
        if result.is_err() {
            self.valid = false;
        }
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()?;
        let result = self.as_writer().flush();
        if result.is_err() {
            self.valid = false;
        }
        result
    }
}

impl Drop for OutputFileStream<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            crate::log_at!(error, "[io] {}", describe(&err));
        }
    }
}

impl fmt::Debug for OutputFileStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFileStream")
            .field("path", &self.path)
            .field("compression", &self.compression)
            .field("valid", &self.valid)
            .field("finished", &self.finished)
            .finish()
    }
}
