//! Backend API access
//!
//! Every endpoint the client consumes goes through [`ApiClient`]. JSON
//! record payloads are converted by [`crate::ingest`] before they leave
//! this module; analysis and run bodies are passed through untouched.
//!
//! | Method | Endpoint |
//! |--------|----------|
//! | `recent_queries` | `GET /metrics/recent-queries` |
//! | `enhanced_analysis` | `GET /metrics/enhanced-analysis` |
//! | `extreme_trends` | `GET /metrics/extreme-trends` |
//! | `lookup_runs` | `POST /runs/lookup` |
//! | `get_run` | `GET /runs/{id}` |
//! | `pricing_models` | `GET /pricing/models` |
//! | `health_check` | `GET /healthz` |
//! | `open_stream` | `GET /query/stream` |

mod client;

pub use client::ApiClient;
