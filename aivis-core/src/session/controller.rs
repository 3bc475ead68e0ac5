use std::time::Duration;

use super::{QueryBackend, SessionObserver, SessionState};
use crate::error::{Error, Result};
use crate::stream::{StreamEvent, StreamHandle};
use crate::types::{CacheMatch, QueryRequest};

/// Message for a stream that ends without `done` or `error`.
const CLOSED_EARLY: &str = "stream closed before completion";
/// Message for a `done` event when no run id was ever seen.
const NO_RUN_ID: &str = "stream finished without a run id";

/// Result of [`LiveSession::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No cached run; the stream is open
    Streaming,
    /// A same-day run exists; call `open_cached` or `run_anyway`
    CacheHit(CacheMatch),
}

/// State machine for one live query.
pub struct LiveSession<B> {
    backend: B,
    lookup_timeout: Duration,
    state: SessionState,
    request: Option<QueryRequest>,
    cache_match: Option<CacheMatch>,
    stream: Option<StreamHandle>,
    text: String,
    run_id: Option<String>,
    error: Option<String>,
}

impl<B: QueryBackend> LiveSession<B> {
    pub fn new(backend: B, lookup_timeout: Duration) -> Self {
        Self {
            backend,
            lookup_timeout,
            state: SessionState::Idle,
            request: None,
            cache_match: None,
            stream: None,
            text: String::new(),
            run_id: None,
            error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Answer text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cache_match(&self) -> Option<&CacheMatch> {
        self.cache_match.as_ref()
    }

    /// Submit a query: check for a same-day run, then stream if there is none.
    ///
    /// A lookup that fails or exceeds the lookup timeout counts as no match.
    pub async fn submit(&mut self, request: QueryRequest) -> Result<SubmitOutcome> {
        self.expect_state(SessionState::Idle, "submit")?;
        if request.query_text().is_empty() {
            return Err(Error::InvalidRequest("no query provided".to_string()));
        }

        self.state = SessionState::CachePending;
        tracing::info!(
            query = request.query_text(),
            engines = ?request.engines,
            "Submitting live query"
        );

        let lookup = tokio::time::timeout(self.lookup_timeout, self.backend.lookup_runs(&request));
        let found = match lookup.await {
            Ok(Ok(matches)) => matches.into_iter().next(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Run lookup failed, assuming no cached run");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Run lookup timed out, assuming no cached run"
                );
                None
            }
        };
        self.request = Some(request);

        match found {
            Some(hit) => {
                tracing::info!(run_id = %hit.id, "Found same-day run");
                self.cache_match = Some(hit.clone());
                Ok(SubmitOutcome::CacheHit(hit))
            }
            None => {
                self.start_stream().await?;
                Ok(SubmitOutcome::Streaming)
            }
        }
    }

    /// Go straight to the cached run. No stream is opened.
    pub fn open_cached(&mut self, observer: &mut impl SessionObserver) -> Result<String> {
        self.expect_state(SessionState::CachePending, "open a cached run")?;
        let Some(hit) = self.cache_match.clone() else {
            return Err(self.invalid("open a cached run"));
        };

        self.run_id = Some(hit.id.clone());
        self.state = SessionState::Navigated;
        observer.on_terminal(&hit.id);
        Ok(hit.id)
    }

    /// Ignore the cached run and stream a fresh one.
    pub async fn run_anyway(&mut self) -> Result<()> {
        self.expect_state(SessionState::CachePending, "run anyway")?;
        self.start_stream().await
    }

    /// Apply one stream event.
    pub fn apply(&mut self, event: StreamEvent, observer: &mut impl SessionObserver) -> Result<()> {
        self.expect_state(SessionState::Streaming, "apply a stream event")?;

        match event {
            StreamEvent::Start { run_id } => {
                if let Some(id) = run_id {
                    tracing::debug!(run_id = %id, "Run started");
                    self.run_id = Some(id);
                }
            }
            StreamEvent::Delta { text } => {
                self.text.push_str(&text);
                observer.on_delta(&text);
            }
            StreamEvent::Done { run_id } => {
                self.state = SessionState::Finalizing;
                if let Some(id) = run_id {
                    self.run_id = Some(id);
                }
                match self.run_id.clone() {
                    Some(id) => self.navigate(&id, observer),
                    None => self.fail(NO_RUN_ID.to_string(), observer),
                }
            }
            StreamEvent::Error { message } => self.fail(message, observer),
        }
        Ok(())
    }

    /// Consume the open stream until the session finishes.
    pub async fn run(&mut self, observer: &mut impl SessionObserver) -> Result<SessionState> {
        self.expect_state(SessionState::Streaming, "run")?;

        while self.state == SessionState::Streaming {
            let next = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => None,
            };
            match next {
                Some(event) => self.apply(event, observer)?,
                None => self.fail(CLOSED_EARLY.to_string(), observer),
            }
        }
        Ok(self.state)
    }

    /// Tear the session down. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        if !self.state.is_final() {
            tracing::debug!(state = %self.state, "Closing live session");
            self.state = SessionState::Closed;
        }
    }

    async fn start_stream(&mut self) -> Result<()> {
        let Some(request) = self.request.as_ref() else {
            return Err(self.invalid("open a stream"));
        };

        match self.backend.open_stream(request).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = SessionState::Streaming;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to open live query stream");
                self.error = Some(e.to_string());
                self.state = SessionState::Errored;
                Err(e)
            }
        }
    }

    fn navigate(&mut self, run_id: &str, observer: &mut impl SessionObserver) {
        tracing::info!(run_id, "Live query finished");
        self.stream = None;
        self.state = SessionState::Navigated;
        observer.on_terminal(run_id);
    }

    fn fail(&mut self, message: String, observer: &mut impl SessionObserver) {
        tracing::warn!(error = %message, "Live query failed");
        self.stream = None;
        self.state = SessionState::Errored;
        observer.on_error(&message);
        self.error = Some(message);
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.state,
            action,
        }
    }
}

impl<B> Drop for LiveSession<B> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }
}
