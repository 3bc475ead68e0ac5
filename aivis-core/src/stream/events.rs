//! Typed live-query stream events.

use serde_json::Value;

use super::sse::SseFrame;
use crate::ingest::fields::parse_string;

/// Message used when an `error` event carries no readable message.
pub const GENERIC_STREAM_ERROR: &str = "Stream error";

/// An event of the live query stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The backend created the run
    Start { run_id: Option<String> },
    /// A fragment of answer text
    Delta { text: String },
    /// The run finished; the id may repeat or replace the start id
    Done { run_id: Option<String> },
    /// The run failed
    Error { message: String },
}

impl StreamEvent {
    /// Map a decoded frame to an event.
    ///
    /// Returns `None` for unknown event names and for `delta` frames that
    /// carry no text. Malformed payloads on the other events degrade
    /// instead of being dropped.
    pub fn from_frame(frame: &SseFrame) -> Option<Self> {
        let payload: Option<Value> = serde_json::from_str(&frame.data).ok();
        let field = |name: &str| {
            payload
                .as_ref()
                .and_then(|p| p.get(name))
                .and_then(parse_string)
        };

        match frame.event.as_str() {
            "start" => Some(StreamEvent::Start {
                run_id: field("run_id"),
            }),
            "delta" => {
                let text = payload
                    .as_ref()
                    .and_then(|p| p.get("text"))
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())?;
                Some(StreamEvent::Delta {
                    text: text.to_string(),
                })
            }
            "done" => Some(StreamEvent::Done {
                run_id: field("run_id"),
            }),
            "error" => Some(StreamEvent::Error {
                message: payload
                    .as_ref()
                    .and_then(|p| p.get("message"))
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(GENERIC_STREAM_ERROR)
                    .to_string(),
            }),
            other => {
                tracing::trace!(event = other, "Ignoring unknown stream event");
                None
            }
        }
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}
