//! Streaming multipart/form-data upload decoder.
//!
//! An upload body arrives in arbitrarily split chunks. Instead of collecting
//! the whole body, an [`UploadSession`] is fed whatever bytes are buffered,
//! consumes what it can, and suspends until more arrive. Form fields and
//! uploaded files are published into a [`Form`] as each part completes.
//!
//! ```txt
//!   socket ──> RingBuffer ──> UploadSession ──> Form
//!                               │      │         ├─ vars   (UPLOAD_DIR, fields, FILE_*_<id>)
//!                          boundary  header      └─ files  (id -> UploadedFile)
//!                               │
//!                            FileSink ──> <upload_dir>/upload-*.tmp
//! ```
//!
//! - `upload` holds the sans-io state machine.
//! - `server` drives it from an async request body.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> http_types::Result<()> { async_std::task::block_on(async {
//! use std::sync::Arc;
//! use async_upload::{server, Form, UploadConfig};
//!
//! let config = Arc::new(UploadConfig::new().open());
//! # let mut req = http_types::Request::new(http_types::Method::Post, "http://localhost/");
//! if server::is_upload(&req) {
//!     server::decode(&mut req, config).await?;
//!     let form: &Form = req.ext().get::<Form>().unwrap();
//!     println!("{:?}", form.vars().get("FILE_SIZE_avatar"));
//! }
//! # Ok(()) }) }
//! ```

#![forbid(unsafe_code, future_incompatible, rust_2018_idioms)]
#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]
#![cfg_attr(test, deny(warnings))]

/// The longest part header line accepted before the body is rejected.
const MAX_LINE_LENGTH: usize = 8 * 1024;

/// The default ceiling for a single uploaded file.
const MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// The default ceiling for a plain form field value.
const MAX_FIELD_SIZE: usize = 64 * 1024;

/// How many bytes the async driver asks the body for at a time.
const READ_CHUNK_SIZE: usize = 8 * 1024;

pub mod buffer;
mod config;
mod error;
mod form;
pub mod server;
pub mod upload;

pub use config::UploadConfig;
pub use error::UploadError;
pub use form::{Files, Form, UploadedFile, Vars};
pub use upload::{State, Status, UploadSession};
