//! # aivis-core
//!
//! Core library for aivis - a client for tracking how AI answer engines
//! talk about a brand.
//!
//! This library provides:
//! - Domain types for query records, trend points, and live query requests
//! - An ingestion boundary that turns loose backend JSON into typed records
//! - Dashboard analytics (engine rollups, intent mix, trends, cost estimates)
//! - An HTTP client for the backend API
//! - A state machine for live, streamed query runs
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows one way through three stages:
//! - **Fetch:** [`ApiClient`] calls the backend
//! - **Ingest:** [`ingest`] converts each payload once into typed records
//! - **Derive:** [`analytics::aggregate`] computes everything the dashboard shows
//!
//! Live runs go through [`LiveSession`], which owns at most one open stream.
//!
//! ## Example
//!
//! ```rust,no_run
//! use aivis_core::analytics::{aggregate, TrendSelection};
//! use aivis_core::{ApiClient, Config};
//!
//! # async fn run() -> aivis_core::Result<()> {
//! let config = Config::load()?;
//! let client = ApiClient::new(&config.api)?;
//!
//! let filter = config.dashboard.filter();
//! let records = client.recent_queries(&filter, None).await?;
//! let selection = TrendSelection::default();
//! let points = client
//!     .extreme_trends(selection.bucket.lookback_days())
//!     .await?;
//!
//! let metrics = aggregate(&records, &points, &selection);
//! println!("{} queries", metrics.overview.total_queries);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use api::ApiClient;
pub use config::Config;
pub use drafts::{DraftStore, QueryDraft};
pub use error::{Error, Result};
pub use session::{LiveSession, QueryBackend, SessionObserver, SessionState, SubmitOutcome};
pub use stream::{StreamEvent, StreamHandle};
pub use types::*;

// Public modules
pub mod analytics;
pub mod api;
pub mod config;
pub mod drafts;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod session;
pub mod stream;
pub mod types;
