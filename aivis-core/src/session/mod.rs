//! Live query session controller
//!
//! One [`LiveSession`] drives one submitted query from cache pre-check to a
//! persisted run id (or an error). Every transition is explicit:
//!
//! ```text
//!            submit            no match / run_anyway
//!   Idle ──────────► CachePending ─────────────────► Streaming ◄─┐ delta
//!                         │                              │  └──────┘
//!                         │ open_cached                  │ done
//!                         ▼                              ▼
//!                     Navigated ◄──── run id ────── Finalizing
//!                                                        │ no run id
//!                                   error event ──►  Errored
//! ```
//!
//! `close()` from any non-terminal state moves to `Closed`. `Navigated`,
//! `Errored` and `Closed` are final; a new query needs a new session.

mod controller;

pub use controller::{LiveSession, SubmitOutcome};

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::stream::StreamHandle;
use crate::types::{CacheMatch, QueryRequest};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    CachePending,
    Streaming,
    Finalizing,
    Navigated,
    Errored,
    /// Torn down by the consumer before finishing
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::CachePending => "cache_pending",
            SessionState::Streaming => "streaming",
            SessionState::Finalizing => "finalizing",
            SessionState::Navigated => "navigated",
            SessionState::Errored => "errored",
            SessionState::Closed => "closed",
        }
    }

    /// `Navigated` or `Errored`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Navigated | SessionState::Errored)
    }

    /// No further transition is possible.
    pub fn is_final(&self) -> bool {
        self.is_terminal() || *self == SessionState::Closed
    }

    /// Ended on a persisted run. A cancelled or failed session did not.
    pub fn produced_run(&self) -> bool {
        *self == SessionState::Navigated
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend calls a session needs.
#[allow(async_fn_in_trait)]
pub trait QueryBackend {
    /// Same-day runs for the request's query and engines.
    async fn lookup_runs(&self, request: &QueryRequest) -> Result<Vec<CacheMatch>>;

    /// Open the live stream for the request.
    async fn open_stream(&self, request: &QueryRequest) -> Result<StreamHandle>;
}

/// Receives session output as it happens.
pub trait SessionObserver {
    /// A text fragment was appended to the buffer.
    fn on_delta(&mut self, _text: &str) {}

    /// The run is persisted under `run_id`; show it.
    fn on_terminal(&mut self, run_id: &str);

    /// The session failed with a user-facing message.
    fn on_error(&mut self, message: &str);
}
