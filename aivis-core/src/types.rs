//! Core domain types for aivis
//!
//! These types describe what the metrics backend records about AI-engine
//! query runs, and the filters used to ask for them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Record** | One logged AI-engine query execution with its metadata ([`QueryRecord`]) |
//! | **Engine** | The external AI provider that answered a query (openai, perplexity, ...) |
//! | **Intent bucket** | One of four canonical query-purpose classifications ([`IntentBucket`]) |
//! | **Trend point** | One time-bucketed aggregate value for a chosen metric |
//! | **Run** | A persisted query execution, addressed by a backend-assigned run id |
//!
//! Records are owned by the backend. This crate only reads snapshots of them,
//! fetched again whenever the [`DashboardFilter`] changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Query records
// ============================================

/// One executed AI-engine query, as fetched from `/metrics/recent-queries`.
///
/// Built once at the ingestion boundary (see [`crate::ingest`]); every
/// optional numeric field is `None` when the backend did not provide a
/// usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Opaque backend identifier
    pub id: String,
    /// The query text sent to the engine
    pub query_text: String,
    /// Engine identifier (free-form, e.g. "openai", "gpt-4o", "perplexity")
    pub engine: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Intent label, free-form or one of the canonical buckets
    pub intent: Option<String>,
    /// Cost in USD
    pub cost: Option<f64>,
    /// Response time in seconds
    pub response_time: Option<f64>,
    /// Input token count
    pub input_tokens: Option<i64>,
    /// Output token count
    pub output_tokens: Option<i64>,
    /// Completion status ("completed", "error", ...)
    pub status: Option<String>,
    /// When the query was executed
    pub created_at: Option<DateTime<Utc>>,
    /// Extracted citation URLs or domains
    pub citations: Vec<String>,
    /// Competitor/vendor names mentioned in the answer
    pub competitor_mentions: Vec<String>,
}

impl QueryRecord {
    /// Engine key used for grouping; missing or blank engines group as `"unknown"`.
    pub fn engine_key(&self) -> &str {
        match self.engine.as_deref().map(str::trim) {
            Some(engine) if !engine.is_empty() => engine,
            _ => UNKNOWN_ENGINE,
        }
    }

    /// Whether the run finished successfully.
    pub fn is_completed(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("completed"))
    }
}

/// Grouping key for records without an engine.
pub const UNKNOWN_ENGINE: &str = "unknown";

// ============================================
// Intent buckets
// ============================================

/// Canonical query-purpose classification.
///
/// Every record maps to exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntentBucket {
    Transactional,
    Commercial,
    Informational,
    Navigational,
}

impl IntentBucket {
    /// All buckets, in display order.
    pub const ALL: [IntentBucket; 4] = [
        IntentBucket::Transactional,
        IntentBucket::Commercial,
        IntentBucket::Informational,
        IntentBucket::Navigational,
    ];

    /// Capitalized display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentBucket::Transactional => "Transactional",
            IntentBucket::Commercial => "Commercial",
            IntentBucket::Informational => "Informational",
            IntentBucket::Navigational => "Navigational",
        }
    }

    /// Parse an explicit intent label, case-insensitively.
    ///
    /// Returns `None` for anything that is not one of the four canonical labels.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        IntentBucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for IntentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Dashboard filter
// ============================================

/// Time window and engine selection shared by the dashboard views.
///
/// Passed explicitly to every fetch; a change means a fresh fetch and a full
/// recomputation of derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilter {
    /// Look-back window in days
    pub days: u32,
    /// Engine filter (None = all engines)
    pub engine: Option<String>,
}

impl Default for DashboardFilter {
    fn default() -> Self {
        Self {
            days: 30,
            engine: None,
        }
    }
}

// ============================================
// Trends
// ============================================

/// Metric plotted by the trend view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    /// Runs mentioning the tracked brand
    #[serde(rename = "extreme_mentions")]
    Mentions,
    /// Citations pointing at the tracked brand
    #[serde(rename = "extreme_citations")]
    Citations,
    /// Average answer rank of the tracked brand
    AvgRank,
}

impl TrendMetric {
    /// Wire name used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::Mentions => "extreme_mentions",
            TrendMetric::Citations => "extreme_citations",
            TrendMetric::AvgRank => "avg_rank",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TrendMetric::Mentions => "Mentions",
            TrendMetric::Citations => "Citations",
            TrendMetric::AvgRank => "Avg Rank",
        }
    }

    /// Parse a metric name; accepts wire names and short names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extreme_mentions" | "mentions" => Some(TrendMetric::Mentions),
            "extreme_citations" | "citations" => Some(TrendMetric::Citations),
            "avg_rank" | "rank" => Some(TrendMetric::AvgRank),
            _ => None,
        }
    }
}

/// Granularity of the backend-supplied trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Weekly,
    Monthly,
}

impl TimeBucket {
    /// Days of history requested from `/metrics/extreme-trends`.
    pub fn lookback_days(&self) -> u32 {
        match self {
            TimeBucket::Weekly => 56,
            TimeBucket::Monthly => 180,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBucket::Weekly => "weekly",
            TimeBucket::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Some(TimeBucket::Weekly),
            "monthly" | "month" => Some(TimeBucket::Monthly),
            _ => None,
        }
    }
}

/// One point of the backend trend series, after ingestion.
///
/// Metric values are `None` when absent or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrendPoint {
    /// Date string as sent by the backend (ISO-8601 date or datetime)
    pub date: String,
    pub extreme_mentions: Option<f64>,
    pub extreme_citations: Option<f64>,
    pub avg_rank: Option<f64>,
}

impl RawTrendPoint {
    /// Value of `metric` at this point, defaulting to 0 when absent.
    pub fn value(&self, metric: TrendMetric) -> f64 {
        let value = match metric {
            TrendMetric::Mentions => self.extreme_mentions,
            TrendMetric::Citations => self.extreme_citations,
            TrendMetric::AvgRank => self.avg_rank,
        };
        value.unwrap_or(0.0)
    }
}

// ============================================
// Live queries
// ============================================

/// Default engine when none is selected.
pub const DEFAULT_ENGINE: &str = "openai";

/// A query submitted for a live run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Query text (trimmed before sending)
    pub query: String,
    /// Selected engines; the stream is scoped to the first one
    pub engines: Vec<String>,
    /// Model for the streaming engine
    pub model: Option<String>,
    /// Intent label attached to the run
    pub intent: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            engines: vec![DEFAULT_ENGINE.to_string()],
            model: None,
            intent: None,
            temperature: 0.2,
        }
    }

    /// Trimmed query text.
    pub fn query_text(&self) -> &str {
        self.query.trim()
    }

    /// The single engine a live stream is opened for.
    pub fn stream_engine(&self) -> String {
        let engine = self
            .engines
            .first()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENGINE.to_string());
        if engine == "pplx" {
            "perplexity".to_string()
        } else {
            engine
        }
    }
}

/// A same-day run returned by `POST /runs/lookup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMatch {
    pub id: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

// ============================================
// Citation and competitor analysis
// ============================================

/// Headline figures from `GET /metrics/enhanced-analysis`.
///
/// The backend computes these; counts it omits read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub total_citations: i64,
    pub unique_domains: i64,
    pub avg_quality_score: Option<f64>,
    pub top_domains: Vec<DomainMentions>,
    pub total_entity_mentions: i64,
    pub unique_entities: i64,
    pub top_competitors: Vec<CompetitorMentions>,
}

impl AnalysisSummary {
    pub fn is_empty(&self) -> bool {
        self.total_citations == 0 && self.total_entity_mentions == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainMentions {
    pub domain: String,
    pub mentions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorMentions {
    pub name: String,
    pub mentions: i64,
    pub avg_rank: Option<f64>,
}
