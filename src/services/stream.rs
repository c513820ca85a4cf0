// src/services/stream.rs
use crate::errors::SquishError;
use actix_web::web;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, TryStreamExt};
use std::io;
use tokio::sync::mpsc;

type BodyItem = Result<Bytes, SquishError>;

/// Drain the request payload into a contiguous buffer the codec engine can
/// decode from. A failure while reading (client aborting the upload,
/// transport error) is terminal for the request.
pub async fn read_body(mut payload: web::Payload) -> Result<Bytes, SquishError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = payload
        .try_next()
        .await
        .map_err(|e| SquishError::Decode(format!("failed to read request body: {e}")))?
    {
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

/// Bounded channel connecting the blocking encode task to the HTTP response
/// body. Encoded chunks flow out as they are produced; when the client goes
/// away the receiver is dropped and the next write fails with a broken pipe,
/// which aborts the encode instead of finishing work nobody will read.
pub fn body_channel(capacity: usize) -> (ChannelWriter, impl Stream<Item = BodyItem>) {
    let (tx, rx) = mpsc::channel(capacity);
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (ChannelWriter { tx }, stream)
}

/// `io::Write` adapter over the body channel. `blocking_send` panics on an
/// async runtime thread, so this must only be driven from a blocking context.
pub struct ChannelWriter {
    tx: mpsc::Sender<BodyItem>,
}

impl ChannelWriter {
    /// Handle for reporting a terminal error into the body stream after the
    /// response status has already been committed.
    pub fn error_handle(&self) -> ErrorHandle {
        ErrorHandle {
            tx: self.tx.clone(),
        }
    }
}

impl io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response stream closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct ErrorHandle {
    tx: mpsc::Sender<BodyItem>,
}

impl ErrorHandle {
    pub fn send(self, err: SquishError) {
        // The receiver may already be gone; nothing left to report to then.
        let _ = self.tx.blocking_send(Err(err));
    }
}
