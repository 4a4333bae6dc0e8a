use super::{reported_name, split_base, TempFileBackend, UNIQUE_SUFFIX_LEN};
use crate::error::{FileStreamError, Result};
use std::fs::File;
use std::io;
use std::os::fd::IntoRawFd;
use std::path::{Path, PathBuf};

pub(crate) struct UnixBackend;

impl TempFileBackend for UnixBackend {
    fn create(base: &Path, prefix: &str, early_unlink: bool) -> Result<(File, PathBuf)> {
        let (dir, name_prefix) = split_base(base, prefix);
        let named = tempfile::Builder::new()
            .prefix(&name_prefix)
            .rand_bytes(UNIQUE_SUFFIX_LEN)
            .tempfile_in(&dir)
            .map_err(|e| FileStreamError::temp_file(base, e))?;
        let (file, temp_path) = named.into_parts();
        let path = reported_name(&dir, &temp_path);

        // `temp_path` owns the name until it is unlinked or kept; a failed
        // unlink drops `file` on the way out.
        if early_unlink {
            temp_path
                .close()
                .map_err(|e| FileStreamError::teardown(&path, e))?;
        } else {
            temp_path
                .keep()
                .map_err(|e| FileStreamError::temp_file(base, io::Error::from(e)))?;
        }
        Ok((file, path))
    }

    fn release(file: File, path: &Path, early_unlink: bool) -> Result<()> {
        if !early_unlink {
            std::fs::remove_file(path).map_err(|e| FileStreamError::teardown(path, e))?;
        }

        let fd = file.into_raw_fd();
        // SAFETY: `into_raw_fd` handed over sole ownership of `fd`.
        if unsafe { libc::close(fd) } == -1 {
            return Err(FileStreamError::file_error(
                format!("Could not close file {fd}"),
                io::Error::last_os_error(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn test_create_with_early_unlink_hides_name() {
        let dir = tempfile::tempdir().unwrap();
        let base = PathBuf::from(format!("{}/", dir.path().display()));
        let (mut file, path) = UnixBackend::create(&base, "marian.", true).unwrap();

        assert!(!path.exists());
        file.write_all(b"still usable").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text, "still usable");

        UnixBackend::release(file, &path, true).unwrap();
    }

    #[test]
    fn test_release_removes_deferred_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = PathBuf::from(format!("{}/", dir.path().display()));
        let (file, path) = UnixBackend::create(&base, "marian.", false).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("marian."));
        assert_eq!(name.len(), "marian.".len() + UNIQUE_SUFFIX_LEN);

        UnixBackend::release(file, &path, false).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = PathBuf::from(format!("{}/", dir.path().display()));
        let (file, path) = UnixBackend::create(&base, "marian.", false).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            UnixBackend::release(file, &path, false),
            Err(FileStreamError::Teardown { .. })
        ));
    }

    #[test]
    fn test_relative_base_gives_relative_name() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        let relative = relative_to(dir.path(), &cwd);
        let base = PathBuf::from(format!("{}/run-", relative.display()));

        let (file, path) = UnixBackend::create(&base, "marian.", false).unwrap();
        assert!(path.is_relative(), "{}", path.display());
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("run-marian."));

        UnixBackend::release(file, &path, false).unwrap();
        assert!(!path.exists());
    }

    fn relative_to(target: &Path, from: &Path) -> PathBuf {
        let ups = from.components().count().saturating_sub(1);
        let mut relative = PathBuf::new();
        for _ in 0..ups {
            relative.push("..");
        }
        relative.join(target.strip_prefix("/").unwrap())
    }

    #[test]
    fn test_early_unlink_leaves_directory_empty() {
        let dir = tempfile::tempdir().unwrap();
        let base = PathBuf::from(format!("{}/", dir.path().display()));
        let (file, path) = UnixBackend::create(&base, "marian.", true).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(path.parent(), Some(dir.path()));
        UnixBackend::release(file, &path, true).unwrap();
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let result = UnixBackend::create(Path::new("/no/such/dir/"), "marian.", true);
        assert!(matches!(result, Err(FileStreamError::TempFile { .. })));
    }
}
