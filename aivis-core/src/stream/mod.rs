//! Live query stream transport
//!
//! A run's answer arrives as a Server-Sent-Events body. One reader task per
//! open stream decodes the body and forwards typed events, in arrival order,
//! over a bounded channel to whoever owns the [`StreamHandle`].
//!
//! ```text
//! reqwest body ──► SseDecoder ──► StreamEvent ──► mpsc ──► StreamHandle::next()
//!   (reader task)                                             (session)
//! ```
//!
//! Dropping or closing the handle aborts the reader task, which drops the
//! HTTP response and with it the connection.

mod events;
mod sse;

pub use events::{StreamEvent, GENERIC_STREAM_ERROR};
pub use sse::{SseDecoder, SseFrame};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events buffered between the reader task and the consumer.
const CHANNEL_CAPACITY: usize = 64;

/// Consumer end of one open stream.
#[derive(Debug)]
pub struct StreamHandle {
    events: mpsc::Receiver<StreamEvent>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Spawn a reader task over an event-stream HTTP response.
    pub fn spawn(response: reqwest::Response) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(read_events(response, tx));
        Self {
            events: rx,
            task: Some(task),
        }
    }

    /// A handle fed by the returned sender, with no reader task.
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                events: rx,
                task: None,
            },
        )
    }

    /// A handle that yields `events` and then ends.
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, handle) = Self::channel(events.len());
        for event in events {
            // Capacity covers every event, so this cannot fail.
            let _ = tx.try_send(event);
        }
        handle
    }

    /// Next event, or `None` once the stream has ended or been closed.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Stop reading. Safe to call more than once.
    pub fn close(&mut self) {
        self.events.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_events(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, "Live query stream failed");
                let _ = tx
                    .send(StreamEvent::Error {
                        message: format!("stream connection error: {}", e),
                    })
                    .await;
                return;
            }
        };

        for frame in decoder.feed(&chunk) {
            let Some(event) = StreamEvent::from_frame(&frame) else {
                continue;
            };
            if tx.send(event).await.is_err() {
                tracing::debug!("Stream consumer went away, stopping reader");
                return;
            }
        }
    }

    tracing::debug!("Live query stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_events_yields_in_order() {
        let mut handle = StreamHandle::from_events(vec![
            StreamEvent::Start { run_id: None },
            StreamEvent::Delta {
                text: "a".to_string(),
            },
        ]);

        assert_eq!(handle.next().await, Some(StreamEvent::Start { run_id: None }));
        assert_eq!(
            handle.next().await,
            Some(StreamEvent::Delta {
                text: "a".to_string()
            })
        );
        assert_eq!(handle.next().await, None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (tx, mut handle) = StreamHandle::channel(4);
        handle.close();
        handle.close();

        assert!(tx
            .send(StreamEvent::Start { run_id: None })
            .await
            .is_err());
        assert_eq!(handle.next().await, None);
    }
}
