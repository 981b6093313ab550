//! Decode upload bodies of incoming requests.

use std::sync::Arc;

use http_types::headers::CONTENT_TYPE;
use http_types::{Method, Request};
use log::trace;

use crate::{UploadConfig, UploadError, UploadSession};

mod decode;

pub use decode::{decode, decode_body};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Whether `req` carries a multipart/form-data body the decoder applies to.
pub fn is_upload(req: &Request) -> bool {
    if !matches!(req.method(), Method::Post | Method::Put) {
        return false;
    }
    match content_type(req) {
        Some(value) => essence(value).eq_ignore_ascii_case(MULTIPART_FORM_DATA),
        None => false,
    }
}

/// Extract the boundary token from a `Content-Type` value.
///
/// ```
/// let value = r#"multipart/form-data; boundary="----X""#;
/// assert_eq!(async_upload::server::boundary(value).unwrap(), "----X");
/// ```
pub fn boundary(content_type: &str) -> Result<&str, UploadError> {
    for param in content_type.split(';').skip(1) {
        let (key, value) = match param.split_once('=') {
            Some(pair) => pair,
            None => continue,
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                break;
            }
            return Ok(value);
        }
    }
    Err(UploadError::protocol("Bad boundary"))
}

/// Start an upload session for `req`.
///
/// Returns `None` when the request is not an upload at all.
pub fn session(
    req: &Request,
    config: Arc<UploadConfig>,
) -> Result<Option<UploadSession>, UploadError> {
    if !is_upload(req) {
        return Ok(None);
    }
    let value = content_type(req).unwrap_or("");
    let token = boundary(value)?;
    trace!("Upload boundary is {}", token);
    UploadSession::new(token, config).map(Some)
}

fn content_type(req: &Request) -> Option<&str> {
    req.header(CONTENT_TYPE).map(|values| values.last().as_str())
}

fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, content_type: &str) -> Request {
        let mut req = Request::new(method, "http://localhost/upload");
        req.insert_header(CONTENT_TYPE, content_type);
        req
    }

    #[test]
    fn boundary_forms() {
        assert_eq!(
            boundary("multipart/form-data; boundary=----X").unwrap(),
            "----X"
        );
        assert_eq!(
            boundary("multipart/form-data; charset=utf-8; BOUNDARY=\"abc\"").unwrap(),
            "abc"
        );
        assert!(boundary("multipart/form-data").is_err());
        assert!(boundary("multipart/form-data; boundary=").is_err());
        assert!(boundary("multipart/form-data; boundary=\"\"").is_err());
    }

    #[test]
    fn upload_detection() {
        assert!(is_upload(&request(
            Method::Post,
            "multipart/form-data; boundary=x"
        )));
        assert!(is_upload(&request(
            Method::Put,
            "Multipart/Form-Data; boundary=x"
        )));
        assert!(!is_upload(&request(
            Method::Get,
            "multipart/form-data; boundary=x"
        )));
        assert!(!is_upload(&request(
            Method::Post,
            "application/x-www-form-urlencoded"
        )));
        assert!(!is_upload(&Request::new(Method::Post, "http://localhost/")));
    }

    #[test]
    fn session_for_request() {
        let config = Arc::new(UploadConfig::new());

        let req = request(Method::Post, "multipart/form-data; boundary=----X");
        let upload = session(&req, config.clone()).unwrap().unwrap();
        assert_eq!(upload.boundary(), b"------X");

        let req = request(Method::Post, "text/plain");
        assert!(session(&req, config.clone()).unwrap().is_none());

        let req = request(Method::Post, "multipart/form-data");
        let err = session(&req, config).unwrap_err();
        assert_eq!(err.status(), http_types::StatusCode::BadRequest);
    }
}
