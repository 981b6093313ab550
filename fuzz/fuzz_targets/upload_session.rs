#![no_main]
use libfuzzer_sys::fuzz_target;

use std::sync::Arc;

use async_upload::buffer::RingBuffer;
use async_upload::{Status, UploadConfig, UploadSession};

fuzz_target!(|input: &[u8]| {
    let (split, body) = match input.split_first() {
        Some((&split, body)) => (split as usize % (body.len() + 1), body),
        None => return,
    };

    let dir = tempfile::tempdir().unwrap();
    let config = UploadConfig::new()
        .upload_dir(dir.path())
        .max_file_size(4096)
        .max_field_size(1024)
        .max_line_length(256);
    let mut session = UploadSession::new("--X", Arc::new(config)).unwrap();

    let mut buf = RingBuffer::new();
    for chunk in [&body[..split], &body[split..]] {
        buf.extend_from_slice(chunk);
        match session.process(&mut buf) {
            Ok(Status::Partial) => {}
            Ok(Status::Complete) => return,
            Err(_) => {
                drop(session);
                assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
                return;
            }
        }
    }
    if session.finish(&mut buf).is_err() {
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
});
