//! The sans-io multipart state machine.
//!
//! An [`UploadSession`] is fed from a [`BodyBuffer`] every time new body
//! bytes arrive. It handles as many lines and data blocks as are buffered
//! and returns [`Status::Partial`] the moment it cannot make progress. It
//! never waits for I/O itself.
//!
//! ```txt
//!            line: --X              empty line
//! AwaitingBoundary ─────> AwaitingPartHeader ─────> StreamingPartData
//!        │    ^                 │   ^ header line           │
//!        │    │                 └───┘                       │
//!        │    └─────────────────────────────────────────────┘
//!        │ line: --X--                  boundary found, part published
//!        v
//!      Ended
//! ```

use std::fmt;
use std::fs;
use std::sync::Arc;

use log::{debug, error, trace, warn};

use crate::buffer::BodyBuffer;
use crate::{Form, UploadConfig, UploadError, UploadedFile};

mod boundary;
mod header;
mod publish;
mod sink;

use header::PartHeader;
use sink::FileSink;

/// Where a session is in the multipart body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// Expecting a `--boundary` line.
    AwaitingBoundary,
    /// Reading the header lines of a part.
    AwaitingPartHeader,
    /// Copying part data until the next boundary.
    StreamingPartData,
    /// The closing `--boundary--` was seen.
    Ended,
}

/// The outcome of a processing pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    /// More bytes are needed.
    Partial,
    /// The closing boundary was reached.
    Complete,
}

/// The file part currently being streamed to disk.
#[derive(Debug)]
struct FilePart {
    sink: FileSink,
    client_filename: String,
    content_type: Option<String>,
}

/// Per-request multipart decoding state.
pub struct UploadSession {
    config: Arc<UploadConfig>,
    /// `--` followed by the boundary token.
    boundary: Vec<u8>,
    state: State,
    /// The `name` of the part being decoded.
    field: Option<String>,
    /// Present only while a file part is being streamed.
    file: Option<FilePart>,
    /// Data of the plain field being decoded.
    value: Vec<u8>,
    form: Form,
    failed: bool,
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("boundary", &String::from_utf8_lossy(&self.boundary))
            .field("state", &self.state)
            .field("field", &self.field)
            .field("file", &self.file)
            .field("failed", &self.failed)
            .finish()
    }
}

impl UploadSession {
    /// Create a session for a body delimited by `boundary`.
    ///
    /// `boundary` is the token from the `Content-Type` header, without the
    /// leading `--`. `UPLOAD_DIR` is published right away.
    pub fn new(boundary: &str, config: Arc<UploadConfig>) -> Result<Self, UploadError> {
        if boundary.is_empty() {
            return Err(UploadError::protocol("Bad boundary"));
        }

        let mut form = Form::default();
        form.vars.insert(
            publish::UPLOAD_DIR,
            config.get_upload_dir().to_string_lossy(),
        );

        Ok(Self {
            config,
            boundary: format!("--{}", boundary).into_bytes(),
            state: State::AwaitingBoundary,
            field: None,
            file: None,
            value: Vec::new(),
            form,
            failed: false,
        })
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The configuration the session was created with.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// The working delimiter, `--` followed by the boundary token.
    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    /// Everything published so far.
    ///
    /// The files listed here belong to the session until it hands the form
    /// over through [`finish`] or [`into_form`]. Dropping the session before
    /// that removes them from disk.
    ///
    /// [`finish`]: UploadSession::finish
    /// [`into_form`]: UploadSession::into_form
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Take the published form once the closing boundary was seen.
    pub fn into_form(mut self) -> Result<Form, UploadError> {
        if self.failed || self.state != State::Ended {
            return Err(UploadError::protocol("Incomplete upload"));
        }
        Ok(std::mem::take(&mut self.form))
    }

    /// Process whatever is buffered.
    ///
    /// Consumed bytes are released from `buf` before returning. Any error is
    /// final: the open temp file is removed and every later call fails.
    pub fn process<B>(&mut self, buf: &mut B) -> Result<Status, UploadError>
    where
        B: BodyBuffer + ?Sized,
    {
        self.pass(buf, false)
    }

    /// Process what is left once the body has ended.
    ///
    /// A last line without a line ending, such as a closing boundary sent
    /// without CRLF, is accepted. Ending anywhere but after the closing
    /// boundary is an error.
    pub fn finish<B>(&mut self, buf: &mut B) -> Result<Form, UploadError>
    where
        B: BodyBuffer + ?Sized,
    {
        match self.pass(buf, true)? {
            Status::Complete => Ok(std::mem::take(&mut self.form)),
            Status::Partial => {
                let err = UploadError::protocol("Unexpected end of upload body");
                self.abort(&err);
                Err(err)
            }
        }
    }

    fn pass<B>(&mut self, buf: &mut B, eof: bool) -> Result<Status, UploadError>
    where
        B: BodyBuffer + ?Sized,
    {
        if self.failed {
            return Err(UploadError::protocol("Upload session already failed"));
        }

        let res = self.drive(buf, eof);
        buf.compact();

        if let Err(err) = &res {
            self.abort(err);
        }
        res
    }

    fn drive<B>(&mut self, buf: &mut B, eof: bool) -> Result<Status, UploadError>
    where
        B: BodyBuffer + ?Sized,
    {
        loop {
            let consumed = match self.state {
                State::AwaitingBoundary | State::AwaitingPartHeader => {
                    let (line, consumed) = match self.next_line(buf.peek(), eof)? {
                        Some(next) => next,
                        None => return Ok(Status::Partial),
                    };
                    if self.state == State::AwaitingBoundary {
                        self.on_boundary_line(line)?;
                    } else {
                        self.on_header_line(&String::from_utf8_lossy(line))?;
                    }
                    consumed
                }
                State::StreamingPartData => match self.on_part_data(buf.peek())? {
                    Some(consumed) => consumed,
                    None => return Ok(Status::Partial),
                },
                State::Ended => return Ok(Status::Complete),
            };
            buf.consume(consumed);
        }
    }

    /// Split the next line off `window`, returning it without its line
    /// ending along with the number of bytes it occupies.
    fn next_line<'b>(
        &self,
        window: &'b [u8],
        eof: bool,
    ) -> Result<Option<(&'b [u8], usize)>, UploadError> {
        let max = self.config.get_max_line_length();
        let (line, consumed) = match memchr::memchr(b'\n', window) {
            Some(idx) => (&window[..idx], idx + 1),
            None if eof && !window.is_empty() => (window, window.len()),
            None if window.len() > max => {
                return Err(UploadError::protocol("Part header line too long"))
            }
            None => return Ok(None),
        };

        // Prevent CWE-400 with endless header lines.
        if line.len() > max {
            return Err(UploadError::protocol("Part header line too long"));
        }
        Ok(Some((line.strip_suffix(b"\r").unwrap_or(line), consumed)))
    }

    fn on_boundary_line(&mut self, line: &[u8]) -> Result<(), UploadError> {
        let rest = match line.strip_prefix(self.boundary.as_slice()) {
            Some(rest) => rest,
            None => return Err(UploadError::protocol("Incomplete boundary")),
        };

        if rest == b"--" {
            debug!("Upload complete, {} files", self.form.files.len());
            self.state = State::Ended;
        } else {
            self.field = None;
            self.file = None;
            self.value.clear();
            self.state = State::AwaitingPartHeader;
        }
        Ok(())
    }

    fn on_header_line(&mut self, line: &str) -> Result<(), UploadError> {
        if line.is_empty() {
            if self.field.is_none() {
                return Err(UploadError::protocol("Missing name field"));
            }
            self.state = State::StreamingPartData;
            return Ok(());
        }
        trace!("Header line: {}", line);

        match header::parse(line) {
            PartHeader::Disposition(params) => {
                // Each Content-Disposition describes the part from scratch.
                self.field = None;
                self.file = None;

                for (key, value) in params {
                    if key.eq_ignore_ascii_case("form-data") {
                        // Nothing to do
                    } else if key.eq_ignore_ascii_case("name") {
                        self.field = Some(value.to_string());
                    } else if key.eq_ignore_ascii_case("filename") {
                        self.open_file(value)?;
                    }
                }
            }
            PartHeader::ContentType(value) => {
                if let Some(file) = self.file.as_mut() {
                    trace!("Set files[{:?}][CONTENT_TYPE] = {}", self.field, value);
                    file.content_type = Some(value.to_string());
                }
            }
            PartHeader::Other => {}
        }
        Ok(())
    }

    fn open_file(&mut self, client_filename: &str) -> Result<(), UploadError> {
        if self.field.is_none() {
            return Err(UploadError::protocol("Missing name field"));
        }
        if self.file.is_some() {
            return Err(UploadError::protocol("Duplicate filename attribute"));
        }

        let sink = FileSink::open(
            self.config.get_upload_dir(),
            self.config.get_max_file_size(),
        )?;
        trace!(
            "File upload of: {} stored as {}",
            client_filename,
            sink.path().display()
        );
        self.file = Some(FilePart {
            sink,
            client_filename: client_filename.to_string(),
            content_type: None,
        });
        Ok(())
    }

    /// Move part data out of `window`. Returns how much was consumed, or
    /// `None` when more bytes are needed to decide.
    fn on_part_data(&mut self, window: &[u8]) -> Result<Option<usize>, UploadError> {
        if window.len() < self.boundary.len() {
            return Ok(None);
        }

        match boundary::find(window, &self.boundary) {
            Some(pos) => {
                self.complete_part(boundary::trim_crlf(&window[..pos]))?;
                self.state = State::AwaitingBoundary;
                Ok(Some(pos))
            }
            None => {
                // The tail may be a boundary split across chunks.
                let keep = boundary::holdback(&self.boundary);
                if window.len() <= keep {
                    return Ok(None);
                }
                let flush = window.len() - keep;
                self.write_data(&window[..flush])?;
                Ok(Some(flush))
            }
        }
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), UploadError> {
        if let Some(file) = self.file.as_mut() {
            return file.sink.append(data);
        }

        let limit = self.config.get_max_field_size();
        if self.value.len().saturating_add(data.len()) > limit {
            return Err(UploadError::LimitExceeded {
                limit: limit as u64,
            });
        }
        self.value.extend_from_slice(data);
        Ok(())
    }

    fn complete_part(&mut self, data: &[u8]) -> Result<(), UploadError> {
        self.write_data(data)?;

        let id = match self.field.take() {
            Some(id) => id,
            None => return Err(UploadError::protocol("Missing name field")),
        };

        match self.file.take() {
            Some(part) => {
                let (path, size) = part.sink.finish()?;
                let file = UploadedFile {
                    client_filename: part.client_filename,
                    path,
                    content_type: part.content_type,
                    size,
                };
                publish::publish_file(&mut self.form, &id, file);
            }
            None => {
                let value = std::mem::take(&mut self.value);
                publish::publish_field(&mut self.form, &id, &value);
            }
        }
        Ok(())
    }

    /// Release everything held for the part in flight, along with the files
    /// of parts that were already published.
    fn abort(&mut self, err: &UploadError) {
        error!("Upload failed: {}", err);
        self.failed = true;
        self.field = None;
        self.file = None;
        self.value = Vec::new();
        self.discard_published();
    }

    fn discard_published(&mut self) {
        let form = std::mem::take(&mut self.form);
        for (id, file) in form.files().iter() {
            match fs::remove_file(file.path()) {
                Ok(()) => warn!("Removed upload of {} at {}", id, file.path().display()),
                Err(err) => warn!(
                    "Can't remove upload of {} at {}: {}",
                    id,
                    file.path().display(),
                    err
                ),
            }
        }
    }
}

/// Files nobody took ownership of through [`UploadSession::finish`] or
/// [`UploadSession::into_form`] are removed.
impl Drop for UploadSession {
    fn drop(&mut self) {
        if !self.form.files().is_empty() {
            self.discard_published();
        }
    }
}
