use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// Request variables produced by an upload.
///
/// Keys keep the order they were first inserted in. Inserting a key again
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    entries: IndexMap<String, String>,
}

impl Vars {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Get the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A file part that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub(crate) client_filename: String,
    pub(crate) path: PathBuf,
    pub(crate) content_type: Option<String>,
    pub(crate) size: u64,
}

impl UploadedFile {
    /// The filename the client sent. Untrusted.
    pub fn client_filename(&self) -> &str {
        &self.client_filename
    }

    /// Where the server stored the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `Content-Type` declared for the part, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Bytes written to disk.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Uploaded files keyed by field id, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files {
    entries: IndexMap<String, UploadedFile>,
}

impl Files {
    pub(crate) fn insert(&mut self, id: String, file: UploadedFile) -> Option<UploadedFile> {
        self.entries.insert(id, file)
    }

    /// Get the file uploaded under field `id`.
    pub fn get(&self, id: &str) -> Option<&UploadedFile> {
        self.entries.get(id)
    }

    /// Iterate over files in upload order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadedFile)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file was uploaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything an upload published for the downstream handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub(crate) vars: Vars,
    pub(crate) files: Files,
}

impl Form {
    /// String variables: `UPLOAD_DIR`, plain fields and `FILE_*_<id>` entries.
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// Uploaded files by field id.
    pub fn files(&self) -> &Files {
        &self.files
    }

    /// Split into the variable and file maps.
    pub fn into_parts(self) -> (Vars, Files) {
        (self.vars, self.files)
    }
}
