//! HTTP client for the query-run backend.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Serialize;
use serde_json::Value;

use crate::analytics::PricingTable;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::ingest;
use crate::session::QueryBackend;
use crate::stream::StreamHandle;
use crate::types::{CacheMatch, DashboardFilter, QueryRecord, QueryRequest, RawTrendPoint};

/// Body of `POST /runs/lookup`.
#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    query: &'a str,
    engines: &'a [String],
}

/// HTTP client for the backend API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    lookup_timeout: Duration,
}

impl ApiClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        // Only connects are bounded client-wide; live streams run as long as
        // the backend keeps them open.
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            request_timeout: Duration::from_secs(config.timeout_secs),
            lookup_timeout: config.lookup_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch recent query records for the dashboard
    pub async fn recent_queries(
        &self,
        filter: &DashboardFilter,
        limit: Option<u32>,
    ) -> Result<Vec<QueryRecord>> {
        let mut params = filter_params(filter);
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let body = self.get_json("/metrics/recent-queries", &params).await?;
        let records = ingest::query_records(&body);
        tracing::debug!(count = records.len(), days = filter.days, "Fetched recent queries");
        Ok(records)
    }

    /// Fetch the citation and competitor analysis, passed through as-is
    pub async fn enhanced_analysis(&self, filter: &DashboardFilter) -> Result<Value> {
        self.get_json("/metrics/enhanced-analysis", &filter_params(filter))
            .await
    }

    /// Fetch pre-bucketed trend points covering the last `days` days.
    ///
    /// The series is not filtered by engine.
    pub async fn extreme_trends(&self, days: u32) -> Result<Vec<RawTrendPoint>> {
        let params = [("days", days.to_string())];
        let body = self.get_json("/metrics/extreme-trends", &params).await?;
        Ok(ingest::trend_points(&body))
    }

    /// Look up same-day runs of the same query and engines
    pub async fn lookup_runs(&self, request: &QueryRequest) -> Result<Vec<CacheMatch>> {
        let url = format!("{}/runs/lookup", self.base_url);
        let body = LookupRequest {
            query: request.query_text(),
            engines: &request.engines,
        };

        let response = self
            .http_client
            .post(&url)
            .timeout(self.lookup_timeout)
            .json(&body)
            .send()
            .await?;

        let body: Value = check_status(response).await?.json().await?;
        Ok(ingest::cache_matches(&body))
    }

    /// Fetch a persisted run
    pub async fn get_run(&self, run_id: &str) -> Result<Value> {
        let path = format!("/runs/{}", urlencoding::encode(run_id));
        self.get_json(&path, &[]).await
    }

    /// Fetch per-model pricing
    pub async fn pricing_models(&self) -> Result<PricingTable> {
        let body = self.get_json("/pricing/models", &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Check that the backend is up
    ///
    /// Returns false when the backend answers but reports `ok: false`.
    pub async fn health_check(&self) -> Result<bool> {
        let body = self.get_json("/healthz", &[]).await?;
        Ok(body.get("ok").and_then(Value::as_bool).unwrap_or(true))
    }

    /// Open the live event stream for a query
    ///
    /// The stream is scoped to the first selected engine.
    pub async fn open_stream(&self, request: &QueryRequest) -> Result<StreamHandle> {
        let url = format!("{}/query/stream", self.base_url);

        let mut params = vec![
            ("query", request.query_text().to_string()),
            ("engine", request.stream_engine()),
            ("temperature", request.temperature.to_string()),
        ];
        if let Some(model) = request.model.as_deref().filter(|m| !m.is_empty()) {
            params.push(("model", model.to_string()));
        }
        if let Some(intent) = request.intent.as_deref().filter(|i| !i.is_empty()) {
            params.push(("intent", intent.to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::Stream(format!("failed to connect: {}", e)))?;

        let response = check_status(response).await?;
        tracing::info!(engine = %request.stream_engine(), "Opened live query stream");
        Ok(StreamHandle::spawn(response))
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.request_timeout)
            .query(params)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

impl QueryBackend for ApiClient {
    async fn lookup_runs(&self, request: &QueryRequest) -> Result<Vec<CacheMatch>> {
        ApiClient::lookup_runs(self, request).await
    }

    async fn open_stream(&self, request: &QueryRequest) -> Result<StreamHandle> {
        ApiClient::open_stream(self, request).await
    }
}

fn filter_params(filter: &DashboardFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![("days", filter.days.to_string())];
    if let Some(engine) = filter.engine.as_deref().filter(|e| !e.is_empty()) {
        params.push(("engine", engine.to_string()));
    }
    params
}

/// Map a non-success status to [`Error::Api`] with the response body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::warn!(status = status.as_u16(), "Backend returned an error");
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}
