//! Per-engine performance rollups.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::QueryRecord;

/// Running mean over present values only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Mean {
    pub sum: f64,
    pub samples: usize,
}

impl Mean {
    /// Add a value if present; `None` is skipped, never counted as zero.
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.samples += 1;
        }
    }

    /// Mean of the pushed values, `None` if nothing was pushed.
    pub fn value(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / self.samples as f64)
    }
}

/// How a view presents cost figures.
///
/// A single view uses one scale for every cost it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostScale {
    /// Average USD per query
    #[default]
    PerQuery,
    /// Average USD per 1000 queries (`avg_cost × 1000`)
    Per1000,
}

impl CostScale {
    pub fn apply(&self, avg_cost: f64) -> f64 {
        match self {
            CostScale::PerQuery => avg_cost,
            CostScale::Per1000 => avg_cost * 1000.0,
        }
    }

    /// Column heading for the scaled figure.
    pub fn label(&self) -> &'static str {
        match self {
            CostScale::PerQuery => "Avg cost / query",
            CostScale::Per1000 => "Avg cost / 1K queries",
        }
    }
}

/// Aggregate metrics for one engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineMetrics {
    pub engine: String,
    /// Number of records for this engine
    pub count: usize,
    pub cost: Mean,
    pub response_time: Mean,
}

impl EngineMetrics {
    fn new(engine: &str) -> Self {
        Self {
            engine: engine.to_string(),
            ..Default::default()
        }
    }

    fn push(&mut self, record: &QueryRecord) {
        self.count += 1;
        self.cost.push(record.cost);
        self.response_time.push(record.response_time);
    }

    /// Average cost per query over records that carry a cost.
    pub fn avg_cost(&self) -> Option<f64> {
        self.cost.value()
    }

    /// Average response time in seconds over records that carry one.
    pub fn avg_response_time(&self) -> Option<f64> {
        self.response_time.value()
    }

    /// Average cost expressed in `scale`.
    pub fn scaled_cost(&self, scale: CostScale) -> Option<f64> {
        self.avg_cost().map(|c| scale.apply(c))
    }

    /// Sum of all present costs.
    pub fn total_cost(&self) -> f64 {
        self.cost.sum
    }
}

/// Group records by engine (missing engine → `"unknown"`) and roll up.
///
/// Keys are sorted so output is stable across runs.
pub fn rollup(records: &[QueryRecord]) -> BTreeMap<String, EngineMetrics> {
    let mut by_engine: BTreeMap<String, EngineMetrics> = BTreeMap::new();
    for record in records {
        let key = record.engine_key();
        by_engine
            .entry(key.to_string())
            .or_insert_with(|| EngineMetrics::new(key))
            .push(record);
    }
    by_engine
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(engine: Option<&str>, cost: Option<f64>, response_time: Option<f64>) -> QueryRecord {
        QueryRecord {
            engine: engine.map(str::to_string),
            cost,
            response_time,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_cost_is_excluded_not_zero() {
        let records = vec![
            record(Some("openai"), Some(1.0), None),
            record(Some("openai"), None, None),
            record(Some("openai"), Some(3.0), None),
        ];

        let metrics = rollup(&records);
        let openai = &metrics["openai"];
        assert_eq!(openai.count, 3);
        assert_eq!(openai.avg_cost(), Some(2.0));
        assert_eq!(openai.cost.samples, 2);
        assert_eq!(openai.avg_response_time(), None);
    }

    #[test]
    fn test_groups_unknown_engine() {
        let records = vec![
            record(None, None, Some(2.0)),
            record(Some(""), None, Some(4.0)),
            record(Some("perplexity"), Some(0.002), Some(1.5)),
        ];

        let metrics = rollup(&records);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics["unknown"].count, 2);
        assert_eq!(metrics["unknown"].avg_response_time(), Some(3.0));
        assert_eq!(metrics["perplexity"].avg_response_time(), Some(1.5));
    }

    #[test]
    fn test_zero_cost_is_a_present_value() {
        let records = vec![
            record(Some("openai"), Some(0.0), None),
            record(Some("openai"), Some(0.004), None),
        ];
        let metrics = rollup(&records);
        assert_eq!(metrics["openai"].avg_cost(), Some(0.002));
    }

    #[test]
    fn test_cost_scale() {
        let records = vec![record(Some("openai"), Some(0.0042), None)];
        let metrics = rollup(&records);
        let openai = &metrics["openai"];

        let per_query = openai.scaled_cost(CostScale::PerQuery).unwrap();
        let per_1000 = openai.scaled_cost(CostScale::Per1000).unwrap();
        assert!((per_query - 0.0042).abs() < 1e-12);
        assert!((per_1000 - 4.2).abs() < 1e-9);
        assert!((openai.total_cost() - 0.0042).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rollup() {
        assert!(rollup(&[]).is_empty());
    }
}
