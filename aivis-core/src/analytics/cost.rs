//! Cost estimates from the backend's per-model pricing.
//!
//! Prices are USD per 1K tokens, as served by `GET /pricing/models`.

use serde::{Deserialize, Serialize};

use crate::drafts::QueryDraft;

/// Fallback input price when a model is not priced.
pub const DEFAULT_INPUT_PER_1K: f64 = 0.0025;
/// Fallback output price when a model is not priced.
pub const DEFAULT_OUTPUT_PER_1K: f64 = 0.01;

/// Price of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingModel {
    pub id: String,
    #[serde(default)]
    pub input_per_1k: f64,
    #[serde(default)]
    pub output_per_1k: f64,
}

/// Fallback prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingDefaults {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for PricingDefaults {
    fn default() -> Self {
        Self {
            input_per_1k: DEFAULT_INPUT_PER_1K,
            output_per_1k: DEFAULT_OUTPUT_PER_1K,
        }
    }
}

/// The `/pricing/models` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    #[serde(default)]
    pub models: Vec<PricingModel>,
    #[serde(default)]
    pub defaults: PricingDefaults,
}

impl PricingTable {
    /// Prices for `model`, falling back to the table defaults.
    pub fn pricing_for(&self, model: &str) -> PricingModel {
        let model = model.trim();
        self.models
            .iter()
            .find(|m| m.id == model)
            .cloned()
            .unwrap_or_else(|| PricingModel {
                id: model.to_string(),
                input_per_1k: self.defaults.input_per_1k,
                output_per_1k: self.defaults.output_per_1k,
            })
    }
}

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Input-side estimate for a query draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftEstimate {
    pub model: String,
    pub input_tokens: u64,
    pub input_per_1k: f64,
    pub estimated_cost: f64,
}

/// Estimate the input cost of sending `draft` to its active model.
pub fn estimate_draft(draft: &QueryDraft, pricing: &PricingTable) -> DraftEstimate {
    let model = pricing.pricing_for(&draft.active_model());
    let input_tokens = estimate_tokens(&draft.text);
    DraftEstimate {
        estimated_cost: input_tokens as f64 / 1000.0 * model.input_per_1k,
        input_tokens,
        input_per_1k: model.input_per_1k,
        model: model.id,
    }
}

/// Inputs for a spend projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInput {
    pub model: String,
    pub queries_per_day: f64,
    pub days: f64,
    pub avg_input_tokens: f64,
    pub avg_output_tokens: f64,
}

impl Default for ProjectionInput {
    fn default() -> Self {
        Self {
            model: "gpt-4o-search-preview".to_string(),
            queries_per_day: 50.0,
            days: 30.0,
            avg_input_tokens: 800.0,
            avg_output_tokens: 400.0,
        }
    }
}

/// Projected spend for a sustained query volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostProjection {
    pub total_input_tokens: f64,
    pub total_output_tokens: f64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Project spend. Negative inputs clamp to 0; days clamp to at least 1.
pub fn project_costs(input: &ProjectionInput, pricing: &PricingTable) -> CostProjection {
    let model = pricing.pricing_for(&input.model);
    let queries = input.queries_per_day.max(0.0);
    let days = input.days.max(1.0);

    let total_input_tokens = queries * days * input.avg_input_tokens.max(0.0);
    let total_output_tokens = queries * days * input.avg_output_tokens.max(0.0);
    let input_cost = total_input_tokens / 1000.0 * model.input_per_1k;
    let output_cost = total_output_tokens / 1000.0 * model.output_per_1k;

    CostProjection {
        total_input_tokens,
        total_output_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    }
}
