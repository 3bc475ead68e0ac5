//! Headline numbers for the query overview.

use serde::Serialize;

use super::engines::Mean;
use crate::types::QueryRecord;

/// Totals across all fetched records, regardless of engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    pub total_queries: usize,
    pub completed_queries: usize,
    pub cost: Mean,
    pub response_time: Mean,
    /// Sum of present input token counts
    pub input_tokens: i64,
    /// Sum of present output token counts
    pub output_tokens: i64,
    pub citations: usize,
    pub competitor_mentions: usize,
}

impl Overview {
    pub fn from_records(records: &[QueryRecord]) -> Self {
        let mut overview = Overview {
            total_queries: records.len(),
            ..Default::default()
        };

        for record in records {
            if record.is_completed() {
                overview.completed_queries += 1;
            }
            overview.cost.push(record.cost);
            overview.response_time.push(record.response_time);
            overview.input_tokens += record.input_tokens.unwrap_or(0);
            overview.output_tokens += record.output_tokens.unwrap_or(0);
            overview.citations += record.citations.len();
            overview.competitor_mentions += record.competitor_mentions.len();
        }

        overview
    }

    /// Percentage of records with a completed status. 0 when empty.
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.completed_queries as f64 / self.total_queries as f64 * 100.0
        }
    }

    pub fn avg_cost(&self) -> Option<f64> {
        self.cost.value()
    }

    pub fn avg_response_time(&self) -> Option<f64> {
        self.response_time.value()
    }

    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}
