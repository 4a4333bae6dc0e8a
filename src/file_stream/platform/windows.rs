use super::{normalize_dir_base, reported_name, split_base, TempFileBackend, UNIQUE_SUFFIX_LEN};
use crate::error::{FileStreamError, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::windows::fs::OpenOptionsExt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

const FILE_SHARE_READ_WRITE_DELETE: u32 = 0x0000_0007;
const FILE_FLAG_DELETE_ON_CLOSE: u32 = 0x0400_0000;

pub(crate) struct WindowsBackend;

impl TempFileBackend for WindowsBackend {
    /// `/tmp` does not exist here; it maps to the user's temp directory.
    fn normalize_base(base: &Path) -> PathBuf {
        if base.to_string_lossy().starts_with("/tmp") {
            let mut temp = std::env::temp_dir().into_os_string();
            if !temp.to_string_lossy().ends_with(MAIN_SEPARATOR_STR) {
                temp.push(MAIN_SEPARATOR_STR);
            }
            return PathBuf::from(temp);
        }
        normalize_dir_base(base)
    }

    fn create(base: &Path, prefix: &str, early_unlink: bool) -> Result<(File, PathBuf)> {
        let (dir, name_prefix) = split_base(base, prefix);
        let named = tempfile::Builder::new()
            .prefix(&name_prefix)
            .rand_bytes(UNIQUE_SUFFIX_LEN)
            .make_in(&dir, |path| {
                let mut options = OpenOptions::new();
                options
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .share_mode(FILE_SHARE_READ_WRITE_DELETE);
                if early_unlink {
                    options.custom_flags(FILE_FLAG_DELETE_ON_CLOSE);
                }
                options.open(path)
            })
            .map_err(|e| FileStreamError::temp_file(base, e))?;

        let (file, created) = named
            .keep()
            .map_err(|e| FileStreamError::temp_file(base, io::Error::from(e)))?;
        Ok((file, reported_name(&dir, &created)))
    }

    fn release(file: File, path: &Path, early_unlink: bool) -> Result<()> {
        // The handle must be closed before the name can be removed. std does
        // not surface CloseHandle failures; removal below is still checked.
        drop(file);
        if !early_unlink {
            std::fs::remove_file(path).map_err(|e| FileStreamError::teardown(path, e))?;
        }
        Ok(())
    }
}
