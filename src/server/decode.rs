//! Pump an async request body through an upload session.

use std::sync::Arc;

use futures_lite::io::{AsyncRead, AsyncReadExt};
use http_types::Request;
use log::trace;

use crate::buffer::{BodyBuffer, RingBuffer};
use crate::{Form, Status, UploadConfig, UploadError, UploadSession};

/// Decode the multipart body of `req`.
///
/// The body is taken out of the request and the resulting [`Form`] is stored
/// in the request's extensions, where handlers find it with
/// `req.ext().get::<Form>()`. Nothing is stored if decoding fails; the error
/// carries the status the request should be answered with.
pub async fn decode(req: &mut Request, config: Arc<UploadConfig>) -> http_types::Result<()> {
    let session = match super::session(req, config).map_err(UploadError::into_http_error)? {
        Some(session) => session,
        None => {
            return Err(UploadError::protocol("Not a multipart/form-data request").into_http_error())
        }
    };

    let body = req.take_body();
    let form = decode_body(body, session)
        .await
        .map_err(UploadError::into_http_error)?;

    req.ext_mut().insert(form);
    Ok(())
}

/// Read `reader` to the closing boundary, feeding `session` as bytes arrive.
///
/// Bytes after the closing boundary are left unread. If the future is
/// dropped midway, the session goes with it and removes any partial file.
pub async fn decode_body<R>(mut reader: R, mut session: UploadSession) -> Result<Form, UploadError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = RingBuffer::new();
    let mut chunk = vec![0; session.config().get_read_chunk_size()];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|err| UploadError::resource("Can't read upload body", err))?;

        // The body ended.
        if n == 0 {
            return session.finish(&mut buf);
        }

        buf.extend_from_slice(&chunk[..n]);
        trace!("Read {} body bytes, {} buffered", n, buf.len());

        if let Status::Complete = session.process(&mut buf)? {
            return session.into_form();
        }
    }
}
