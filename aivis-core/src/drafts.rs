//! Query draft persistence
//!
//! The query form's last unsent state is kept in a small JSON file in the
//! data directory:
//!
//! ```json
//! { "data": { "text": "...", "engines": ["openai"], ... }, "saved_at": "2025-08-04T10:00:00Z" }
//! ```
//!
//! Drafts older than the configured TTL are discarded on load. Storage
//! failures are logged and never reach the caller as errors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{QueryRequest, DEFAULT_ENGINE};

/// Saved query form state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDraft {
    pub text: String,
    pub engines: Vec<String>,
    pub intent: String,
    pub temperature: f32,
    pub openai_model: String,
    pub perplexity_model: String,
}

impl Default for QueryDraft {
    fn default() -> Self {
        Self {
            text: String::new(),
            engines: vec![DEFAULT_ENGINE.to_string()],
            intent: "commercial".to_string(),
            temperature: 0.2,
            openai_model: "gpt-4o-search-preview".to_string(),
            perplexity_model: "sonar".to_string(),
        }
    }
}

impl QueryDraft {
    fn uses_perplexity(&self) -> bool {
        !self.engines.iter().any(|e| e.eq_ignore_ascii_case("openai"))
            && self
                .engines
                .iter()
                .any(|e| e.eq_ignore_ascii_case("perplexity") || e.eq_ignore_ascii_case("pplx"))
    }

    /// Model used for the input-cost estimate.
    pub fn active_model(&self) -> String {
        if self.uses_perplexity() {
            "sonar".to_string()
        } else {
            "gpt-4o".to_string()
        }
    }

    /// Build the request this draft would submit.
    ///
    /// The model follows the engine the stream opens on, the first one
    /// listed.
    pub fn to_request(&self) -> QueryRequest {
        let mut request = QueryRequest {
            query: self.text.clone(),
            engines: if self.engines.is_empty() {
                vec![DEFAULT_ENGINE.to_string()]
            } else {
                self.engines.clone()
            },
            model: None,
            intent: Some(self.intent.clone()).filter(|i| !i.is_empty()),
            temperature: self.temperature,
        };

        let model = if request.stream_engine() == "perplexity" {
            &self.perplexity_model
        } else {
            &self.openai_model
        };
        request.model = Some(model.clone()).filter(|m| !m.is_empty());
        request
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDraft {
    data: QueryDraft,
    saved_at: DateTime<Utc>,
}

/// File-backed store for a single draft.
#[derive(Debug, Clone)]
pub struct DraftStore {
    path: PathBuf,
    ttl: Duration,
}

impl DraftStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the draft if one exists and has not expired.
    pub fn load(&self) -> Option<QueryDraft> {
        self.load_at(Utc::now())
    }

    fn load_at(&self, now: DateTime<Utc>) -> Option<QueryDraft> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read draft");
                return None;
            }
        };

        let stored: StoredDraft = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable draft");
                return None;
            }
        };

        let age = now.signed_duration_since(stored.saved_at);
        let expired = age
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false);
        if expired {
            tracing::info!(saved_at = %stored.saved_at, "Discarding expired draft");
            self.clear();
            return None;
        }

        Some(stored.data)
    }

    /// Save the draft. Returns whether it was written.
    pub fn save(&self, draft: &QueryDraft) -> bool {
        let stored = StoredDraft {
            data: draft.clone(),
            saved_at: Utc::now(),
        };

        match self.write(&stored) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Saved draft");
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to save draft");
                false
            }
        }
    }

    fn write(&self, stored: &StoredDraft) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Remove any saved draft.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Cleared draft"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to clear draft")
            }
        }
    }
}
