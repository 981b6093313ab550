//! Exposing completed parts to the request.

use std::fs;

use log::{debug, warn};

use crate::{Form, UploadedFile};

/// Key of the variable holding the upload directory.
pub(crate) const UPLOAD_DIR: &str = "UPLOAD_DIR";

/// Publish a completed file part under field `id`.
///
/// Besides the typed entry in [`Form::files`], four string variables are
/// set so handlers that only look at variables see the upload too.
pub(crate) fn publish_file(form: &mut Form, id: &str, file: UploadedFile) {
    debug!(
        "Set files[{}] = {} ({} bytes) stored as {}",
        id,
        file.client_filename,
        file.size,
        file.path.display()
    );

    let vars = &mut form.vars;
    vars.insert(
        format!("FILE_CLIENT_FILENAME_{}", id),
        file.client_filename.as_str(),
    );
    vars.insert(
        format!("FILE_CONTENT_TYPE_{}", id),
        file.content_type.as_deref().unwrap_or(""),
    );
    vars.insert(
        format!("FILE_FILENAME_{}", id),
        file.path.to_string_lossy(),
    );
    vars.insert(format!("FILE_SIZE_{}", id), file.size.to_string());

    // A repeated file field replaces the earlier upload.
    if let Some(old) = form.files.insert(id.to_string(), file) {
        if let Err(err) = fs::remove_file(&old.path) {
            warn!("Can't remove replaced upload {}: {}", old.path.display(), err);
        }
    }
}

/// Publish a plain field. The value is stored as it arrived on the wire.
pub(crate) fn publish_field(form: &mut Form, id: &str, value: &[u8]) {
    let value = String::from_utf8_lossy(value);
    debug!("Set form[{}] = {}", id, value);
    form.vars.insert(id, value);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn file_vars() {
        let mut form = Form::default();
        let file = UploadedFile {
            client_filename: "x.txt".into(),
            path: PathBuf::from("/tmp/upload-1.tmp"),
            content_type: None,
            size: 42,
        };
        publish_file(&mut form, "f", file);

        let vars = form.vars();
        assert_eq!(vars.get("FILE_CLIENT_FILENAME_f"), Some("x.txt"));
        assert_eq!(vars.get("FILE_CONTENT_TYPE_f"), Some(""));
        assert_eq!(vars.get("FILE_FILENAME_f"), Some("/tmp/upload-1.tmp"));
        assert_eq!(vars.get("FILE_SIZE_f"), Some("42"));
        assert_eq!(form.files().get("f").map(|f| f.size()), Some(42));
    }

    #[test]
    fn repeated_field_overwrites() {
        let mut form = Form::default();
        publish_field(&mut form, "a", b"first");
        publish_field(&mut form, "a", b"second");
        assert_eq!(form.vars().get("a"), Some("second"));
        assert_eq!(form.vars().len(), 1);
    }
}
