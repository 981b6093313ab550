use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_upload::buffer::RingBuffer;
use async_upload::{Form, Status, UploadError, UploadSession};
use futures_lite::io::{AsyncRead, BufReader};
use http_types::headers::CONTENT_TYPE;
use http_types::{Body, Method, Request};

pub const BOUNDARY: &str = "--X";

/// Read `tests/fixtures/<name>.txt`, turning every LF into CRLF.
#[allow(dead_code)]
pub fn read_fixture(name: &str) -> Vec<u8> {
    use std::io::Read;

    let directory: PathBuf = env!("CARGO_MANIFEST_DIR").into();
    let path: PathBuf = format!("tests/fixtures/{}.txt", name).into();
    let mut file = File::open(directory.join(path)).expect("Reading fixture file didn't work");
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .expect("Couldn't read fixture files contents");

    let mut result = Vec::<u8>::new();
    for byte in contents {
        if byte == 0x0A {
            result.push(0x0D);
        }
        result.push(byte);
    }
    result
}

/// Payload of the `f` file part, with bytes that look like framing.
#[allow(dead_code)]
pub fn payload() -> Vec<u8> {
    let mut payload: Vec<u8> = (0..=255).collect();
    payload.extend_from_slice(b"\r\n---- almost\r\n----");
    payload.extend_from_slice(b"\r\n--");
    payload
}

/// A field, a binary file, and a field containing near-boundaries.
#[allow(dead_code)]
pub fn multipart_body() -> Vec<u8> {
    let mut body = read_fixture("file_head");
    body.extend_from_slice(&payload());
    body.extend_from_slice(&read_fixture("file_tail"));
    body
}

/// An async reader that never returns more than `step` bytes per read.
#[derive(Debug)]
pub struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
    fail_at: Option<usize>,
}

impl Trickle {
    #[allow(dead_code)]
    pub fn new(data: Vec<u8>, step: usize) -> Self {
        Self {
            data,
            pos: 0,
            step,
            fail_at: None,
        }
    }

    /// Fail with a connection reset once `pos` bytes have been read.
    #[allow(dead_code)]
    pub fn fail_at(mut self, pos: usize) -> Self {
        self.fail_at = Some(pos);
        self
    }
}

impl AsyncRead for Trickle {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(fail_at) = self.fail_at {
            if self.pos >= fail_at {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)));
            }
        }
        let start = self.pos;
        let end = (start + self.step).min(self.data.len());
        let n = (end - start).min(buf.len());
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(n))
    }
}

/// A multipart POST whose body is read from `reader`.
#[allow(dead_code)]
pub fn upload_request(reader: Trickle) -> Request {
    let mut req = Request::new(Method::Post, "http://localhost/upload");
    req.insert_header(
        CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    req.set_body(Body::from_reader(BufReader::new(reader), None));
    req
}

/// Feed `body` to `session` split at each offset in `splits`, then finish.
#[allow(dead_code)]
pub fn feed_split(
    mut session: UploadSession,
    body: &[u8],
    splits: &[usize],
) -> Result<Form, UploadError> {
    let mut buf = RingBuffer::new();
    let mut start = 0;
    for &end in splits.iter().chain(Some(&body.len())) {
        buf.extend_from_slice(&body[start..end]);
        start = end;
        if let Status::Complete = session.process(&mut buf)? {
            return session.into_form();
        }
    }
    session.finish(&mut buf)
}

/// Feed `body` to `session` in chunks of `step` bytes, then finish.
#[allow(dead_code)]
pub fn feed_in_chunks(
    session: UploadSession,
    body: &[u8],
    step: usize,
) -> Result<Form, UploadError> {
    let splits: Vec<usize> = (step..body.len()).step_by(step).collect();
    feed_split(session, body, &splits)
}

/// Published vars without server-chosen paths, and file contents by id.
#[allow(dead_code)]
pub fn snapshot(form: &Form) -> (Vec<(String, String)>, Vec<(String, Vec<u8>)>) {
    let vars = form
        .vars()
        .iter()
        .filter(|(key, _)| !key.starts_with("FILE_FILENAME_"))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let files = form
        .files()
        .iter()
        .map(|(id, file)| (id.to_string(), fs::read(file.path()).unwrap()))
        .collect();
    (vars, files)
}

#[allow(dead_code)]
pub fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}
