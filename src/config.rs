use std::path::{Path, PathBuf};

use log::debug;

use crate::{MAX_FIELD_SIZE, MAX_FILE_SIZE, MAX_LINE_LENGTH, READ_CHUNK_SIZE};

/// Configure upload decoding.
///
/// Built once at startup and shared read-only by every session, usually
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory temp files are created in. Defaults to the platform temp dir.
    upload_dir: PathBuf,
    /// Ceiling for a single uploaded file. Defaults to 200 MiB.
    max_file_size: u64,
    /// Ceiling for a plain field value. Defaults to 64 KiB.
    max_field_size: usize,
    /// Longest accepted boundary or part header line. Defaults to 8 KiB.
    max_line_length: usize,
    /// Read size of the async driver. Defaults to 8 KiB.
    read_chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir(),
            max_file_size: MAX_FILE_SIZE,
            max_field_size: MAX_FIELD_SIZE,
            max_line_length: MAX_LINE_LENGTH,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

impl UploadConfig {
    /// Create a new instance with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory temp files are written to.
    ///
    /// An empty path falls back to the platform temp dir.
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.upload_dir = if dir.as_os_str().is_empty() {
            std::env::temp_dir()
        } else {
            dir
        };
        self
    }

    /// Set the maximum size of a single uploaded file.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the maximum size of a plain field value.
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Set the longest accepted boundary or part header line.
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len;
        self
    }

    /// Set how many bytes the async driver reads at a time.
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Finish configuring, logging the directory uploads will land in.
    pub fn open(self) -> Self {
        debug!("Upload directory is {}", self.upload_dir.display());
        self
    }

    /// The directory temp files are created in.
    pub fn get_upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// The ceiling for a single uploaded file.
    pub fn get_max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// The ceiling for a plain field value.
    pub fn get_max_field_size(&self) -> usize {
        self.max_field_size
    }

    /// The longest accepted boundary or part header line.
    pub fn get_max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// How many bytes the async driver reads at a time.
    pub fn get_read_chunk_size(&self) -> usize {
        self.read_chunk_size
    }
}
