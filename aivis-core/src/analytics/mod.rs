//! Dashboard analytics
//!
//! Everything here is a pure derivation over already-fetched data. Nothing
//! performs I/O and nothing fails: malformed inputs were normalized at the
//! ingestion boundary, and empty inputs produce well-typed empty results.
//!
//! ```text
//! QueryRecord[] ──┬── overview::Overview
//!                 ├── engines::rollup ──────► engine → EngineMetrics
//!                 └── intent::IntentDistribution
//! RawTrendPoint[] ─── trend::build_trend ───► TrendSeries
//! ```

pub mod cost;
pub mod engines;
pub mod intent;
pub mod overview;
pub mod trend;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{QueryRecord, RawTrendPoint};

pub use cost::{
    estimate_draft, estimate_tokens, project_costs, CostProjection, DraftEstimate,
    PricingModel, PricingTable, ProjectionInput,
};
pub use engines::{rollup, CostScale, EngineMetrics, Mean};
pub use intent::{classify, classify_text, IntentDistribution};
pub use overview::Overview;
pub use trend::{build_trend, PreviousPeriod, TrendPoint, TrendSelection, TrendSeries};

/// Everything the dashboard renders, derived in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub overview: Overview,
    pub engine_metrics: BTreeMap<String, EngineMetrics>,
    pub intent_distribution: IntentDistribution,
    pub trend: TrendSeries,
}

/// Derive all dashboard metrics from fetched records and trend points.
pub fn aggregate(
    records: &[QueryRecord],
    trend_points: &[RawTrendPoint],
    selection: &TrendSelection,
) -> DerivedMetrics {
    let metrics = DerivedMetrics {
        overview: Overview::from_records(records),
        engine_metrics: rollup(records),
        intent_distribution: IntentDistribution::from_records(records),
        trend: build_trend(trend_points, selection),
    };

    tracing::debug!(
        records = records.len(),
        engines = metrics.engine_metrics.len(),
        trend_points = metrics.trend.points.len(),
        "Aggregated dashboard metrics"
    );

    metrics
}
