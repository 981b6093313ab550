//! Temp file target of one file part.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{trace, warn};

use crate::UploadError;

static SINK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// An open temp file with a size ceiling.
///
/// Dropping a sink that was never [`finish`]ed closes the handle and removes
/// the file, so a failed or aborted upload leaves nothing behind.
///
/// [`finish`]: FileSink::finish
#[derive(Debug)]
pub(crate) struct FileSink {
    file: Option<File>,
    path: PathBuf,
    size: u64,
    limit: u64,
    kept: bool,
}

impl FileSink {
    /// Create a uniquely named, owner-only temp file in `dir`.
    pub(crate) fn open(dir: &Path, limit: u64) -> Result<Self, UploadError> {
        let path = temp_path(dir);

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(&path).map_err(|err| {
            UploadError::resource(
                format!(
                    "Can't open upload temp file {}. Check upload temp dir {}",
                    path.display(),
                    dir.display()
                ),
                err,
            )
        })?;

        Ok(Self {
            file: Some(file),
            path,
            size: 0,
            limit,
            kept: false,
        })
    }

    /// Write `bytes` at the end of the file.
    ///
    /// Nothing is written if the file would grow past its ceiling.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<(), UploadError> {
        let len = bytes.len() as u64;
        if self.size.saturating_add(len) > self.limit {
            return Err(UploadError::LimitExceeded { limit: self.limit });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                return Err(UploadError::resource(
                    format!("Can't write to upload temp file {}", self.path.display()),
                    io::Error::new(io::ErrorKind::Other, "file already closed"),
                ))
            }
        };
        file.write_all(bytes).map_err(|err| {
            UploadError::resource(
                format!("Can't write to upload temp file {}", self.path.display()),
                err,
            )
        })?;

        self.size += len;
        trace!("Wrote {} bytes to {}", len, self.path.display());
        Ok(())
    }

    /// Flush and release the handle. Closing twice is a no-op.
    pub(crate) fn close(&mut self) -> Result<(), UploadError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|err| {
                UploadError::resource(
                    format!("Can't close upload temp file {}", self.path.display()),
                    err,
                )
            })?;
        }
        Ok(())
    }

    /// Close the file and keep it on disk, returning its path and size.
    pub(crate) fn finish(mut self) -> Result<(PathBuf, u64), UploadError> {
        self.close()?;
        self.kept = true;
        let size = self.size();
        Ok((std::mem::take(&mut self.path), size))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        drop(self.file.take());
        match fs::remove_file(&self.path) {
            Ok(()) => warn!("Removed partial upload {}", self.path.display()),
            Err(err) => warn!(
                "Can't remove partial upload {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

fn temp_path(dir: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = SINK_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(
        "upload-{}-{}-{}.tmp",
        std::process::id(),
        nanos,
        counter
    ))
}
