use std::error::Error;
use std::fmt;
use std::io;

use http_types::StatusCode;

/// Errors that end an upload session.
///
/// Every variant is fatal to the request it came from, never to the server.
/// Nothing is retried; the client has to submit the body again.
#[derive(Debug)]
pub enum UploadError {
    /// The body does not follow the multipart framing.
    Protocol(String),
    /// A temp file could not be created, written or closed, or the body could
    /// not be read.
    Resource {
        /// What was being attempted.
        context: String,
        /// The underlying I/O failure.
        source: io::Error,
    },
    /// A file or field grew past its configured ceiling.
    LimitExceeded {
        /// The ceiling in bytes.
        limit: u64,
    },
}

impl UploadError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        UploadError::Protocol(msg.into())
    }

    pub(crate) fn resource(context: impl Into<String>, source: io::Error) -> Self {
        UploadError::Resource {
            context: context.into(),
            source,
        }
    }

    /// The HTTP status the failed request should be answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Protocol(_) => StatusCode::BadRequest,
            UploadError::Resource { .. } => StatusCode::InternalServerError,
            UploadError::LimitExceeded { .. } => StatusCode::PayloadTooLarge,
        }
    }

    /// Convert into an `http_types::Error` answering with [`status`].
    ///
    /// A plain `?` would go through the blanket conversion and answer 500.
    ///
    /// [`status`]: UploadError::status
    pub fn into_http_error(self) -> http_types::Error {
        let status = self.status();
        http_types::Error::new(status, self)
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Protocol(msg) => write!(f, "Bad upload state. {}", msg),
            UploadError::Resource { context, source } => write!(f, "{}: {}", context, source),
            UploadError::LimitExceeded { limit } => {
                write!(f, "Uploaded file exceeds maximum {} bytes", limit)
            }
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UploadError::Resource { source, .. } => Some(source),
            _ => None,
        }
    }
}
