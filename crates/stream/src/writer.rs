use std::convert::Infallible;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::message::encode_event;
use crate::subscription::Subscription;

/// Comment line sent when a stream has been idle, so a vanished peer is
/// detected by the next write.
pub const KEEP_ALIVE_FRAME: &[u8] = b":\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    HeadersSent,
    Streaming,
    Closed,
}

/// Drains one subscriber's buffer into framed chunks for its connection.
///
/// The writer is created once the response preamble has been produced and
/// moves to `Streaming` on the first poll. It reaches `Closed` on shutdown,
/// on an explicit [`close`](StreamWriter::close), or when it is dropped
/// because the connection failed; the subscriber is unregistered on entry
/// to `Closed` in every case.
#[derive(Debug)]
pub struct StreamWriter {
    subscription: Subscription,
    shutdown: CancellationToken,
    keep_alive: Option<Duration>,
    state: WriterState,
    frames_written: u64,
}

impl StreamWriter {
    pub fn new(subscription: Subscription, shutdown: CancellationToken) -> Self {
        Self {
            subscription,
            shutdown,
            keep_alive: None,
            state: WriterState::HeadersSent,
            frames_written: 0,
        }
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval).filter(|i| !i.is_zero());
        self
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Next chunk to write to the peer, or `None` once the writer is closed.
    /// Waits while the buffer is empty.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        loop {
            match self.state {
                WriterState::Closed => return None,
                WriterState::HeadersSent => self.state = WriterState::Streaming,
                WriterState::Streaming => {}
            }

            if self.shutdown.is_cancelled() {
                self.close();
                return None;
            }

            if let Some(chunk) = self.encode_available() {
                return Some(chunk);
            }

            let wake = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => Wake::Shutdown,
                () = self.subscription.buffer().ready() => Wake::Ready,
                () = idle(self.keep_alive) => Wake::Idle,
            };

            match wake {
                Wake::Shutdown => {
                    self.close();
                    return None;
                }
                Wake::Idle => return Some(Bytes::from_static(KEEP_ALIVE_FRAME)),
                Wake::Ready => {}
            }
        }
    }

    fn encode_available(&mut self) -> Option<Bytes> {
        let events = self.subscription.drain();
        if events.is_empty() {
            return None;
        }

        let mut out = BytesMut::new();
        for event in &events {
            match encode_event(event, &mut out) {
                Ok(()) => self.frames_written += 1,
                Err(e) => tracing::warn!(
                    subscriber = %self.subscription.id(),
                    error = %e,
                    "Skipping unserializable event"
                ),
            }
        }

        (!out.is_empty()).then(|| out.freeze())
    }

    /// Move to `Closed` and unregister the subscriber. Idempotent.
    pub fn close(&mut self) {
        if self.state == WriterState::Closed {
            return;
        }
        self.state = WriterState::Closed;
        self.subscription.close();

        tracing::debug!(
            subscriber = %self.subscription.id(),
            frames = self.frames_written,
            "Stream writer closed"
        );
    }

    /// Body stream for an HTTP response. Dropping the stream, as the server
    /// does when the peer goes away or a write fails, closes the writer.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        futures_util::stream::unfold(self, |mut writer| async move {
            writer.next_chunk().await.map(|chunk| (Ok::<_, Infallible>(chunk), writer))
        })
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        self.close();
    }
}

enum Wake {
    Shutdown,
    Ready,
    Idle,
}

async fn idle(keep_alive: Option<Duration>) {
    match keep_alive {
        Some(interval) => tokio::time::sleep(interval).await,
        None => std::future::pending().await,
    }
}
