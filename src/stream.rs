//! Stream adapters (component G).
//!
//! `ReadStream` chunks a fully-assembled payload into ≤8 KiB pieces and
//! emits them in event-loop turn order via [`crate::coroutine`], with
//! cooperative pause/resume. `WriteSink` accumulates PUT bytes in memory and
//! hands them to a caller-supplied close handler on `end()`.

use crate::coroutine::{self, Yielder};
use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// Maximum number of bytes emitted per chunk.
pub const MAX_CHUNK_LEN: usize = 8 * 1024;

struct PauseState {
    paused: bool,
    waker: Option<Waker>,
}

pub struct ReadStream {
    inner: Pin<Box<dyn Stream<Item = Bytes> + Send>>,
    pause: Arc<Mutex<PauseState>>,
}

impl ReadStream {
    /// Build a stream over an already-assembled payload, splitting it into
    /// chunks no larger than [`MAX_CHUNK_LEN`]. An empty payload yields a
    /// stream that ends immediately without emitting any chunks.
    pub fn from_bytes(bytes: Bytes) -> Self {
        let generator = coroutine::generator(move |mut yielder: Yielder<Bytes>| async move {
            let mut offset = 0;
            while offset < bytes.len() {
                let end = (offset + MAX_CHUNK_LEN).min(bytes.len());
                yielder.emit(bytes.slice(offset..end)).await;
                offset = end;
            }
        });
        Self {
            inner: Box::pin(generator),
            pause: Arc::new(Mutex::new(PauseState {
                paused: false,
                waker: None,
            })),
        }
    }

    /// Suspend emission. No further chunks are produced until [`Self::resume`].
    pub fn pause(&self) {
        self.pause.lock().unwrap().paused = true;
    }

    /// Resume emission, waking the task polling this stream if it is parked.
    pub fn resume(&self) {
        let mut state = self.pause.lock().unwrap();
        state.paused = false;
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }
}

impl Stream for ReadStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        {
            let mut state = self.pause.lock().unwrap();
            if state.paused {
                state.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
        }
        self.inner.as_mut().poll_next(cx)
    }
}

/// Accumulates bytes handed to PUT before the script call is composed.
pub struct WriteSink {
    buffer: BytesMut,
}

impl Default for WriteSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteSink {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    pub fn write(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// The configured write-queue-limit surface is a no-op at this layer;
    /// backpressure is the caller's responsibility.
    pub fn is_queue_full(&self) -> bool {
        false
    }

    /// Hand the accumulated bytes to `close_handler`, which composes the PUT
    /// script call and returns the resulting [`crate::result::Resource`].
    pub async fn end<F, Fut>(self, close_handler: F) -> Fut::Output
    where
        F: FnOnce(Bytes) -> Fut,
        Fut: Future,
    {
        close_handler(self.buffer.freeze()).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn chunks_payload_to_the_configured_size() {
        let bytes = Bytes::from(vec![7u8; MAX_CHUNK_LEN * 2 + 1]);
        let stream = ReadStream::from_bytes(bytes);
        let chunks: Vec<Bytes> = stream.collect().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), MAX_CHUNK_LEN);
        assert_eq!(chunks[1].len(), MAX_CHUNK_LEN);
        assert_eq!(chunks[2].len(), 1);
    }

    #[tokio::test]
    async fn empty_payload_emits_no_chunks() {
        let stream = ReadStream::from_bytes(Bytes::new());
        let chunks: Vec<Bytes> = stream.collect().await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn pausing_withholds_emission_until_resumed() {
        let stream = ReadStream::from_bytes(Bytes::from_static(b"hello"));
        stream.pause();
        let mut stream = Box::pin(stream);

        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), stream.next())
            .await
            .is_err();
        assert!(timed_out, "paused stream must not emit while paused");

        stream.resume();
        let chunk = stream.next().await.unwrap();
        assert_eq!(&chunk[..], b"hello");
    }

    #[tokio::test]
    async fn write_sink_hands_accumulated_bytes_to_close_handler() {
        let mut sink = WriteSink::new();
        sink.write(b"ab");
        sink.write(b"cd");
        let collected = sink.end(|bytes| async move { bytes }).await;
        assert_eq!(&collected[..], b"abcd");
    }
}
