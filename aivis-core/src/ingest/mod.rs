//! Ingestion boundary for backend payloads
//!
//! Every value fetched from the metrics backend passes through here exactly
//! once, converting loosely-typed JSON into the typed shapes the rest of the
//! crate works with.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Backend JSON   │ ──► │     ingest       │ ──► │  QueryRecord /  │
//! │ (numbers, "1.2",│     │ parse-and-default│     │  RawTrendPoint  │
//! │  nulls, ...)    │     │                  │     │                 │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Convert once**: downstream code never re-coerces a field
//! 2. **Resilience**: a malformed field becomes `None`, never an error
//! 3. **No invented zeros**: a missing number stays missing

pub mod fields;

use serde_json::Value;

use crate::types::{
    AnalysisSummary, CacheMatch, CompetitorMentions, DomainMentions, QueryRecord, RawTrendPoint,
};
use fields::{parse_f64, parse_i64, parse_name_list, parse_string, parse_timestamp};

static NULL: Value = Value::Null;

/// Convert one backend query object into a [`QueryRecord`].
///
/// Non-object values yield an empty record rather than an error.
pub fn query_record(value: &Value) -> QueryRecord {
    QueryRecord {
        id: parse_string(field(value, "id")).unwrap_or_default(),
        query_text: first_of(value, &["query_text", "query"])
            .as_str()
            .unwrap_or_default()
            .to_string(),
        engine: parse_string(field(value, "engine")),
        model: parse_string(field(value, "model")),
        intent: parse_string(first_of(value, &["intent", "intent_category"])),
        cost: parse_f64(first_of(value, &["cost", "cost_usd"])),
        response_time: parse_f64(field(value, "response_time")),
        input_tokens: parse_i64(field(value, "input_tokens")),
        output_tokens: parse_i64(field(value, "output_tokens")),
        status: parse_string(field(value, "status")),
        created_at: parse_timestamp(first_of(value, &["created_at", "ts"])),
        citations: parse_name_list(
            first_of(value, &["citations", "domains"]),
            &["url", "domain"],
        ),
        competitor_mentions: parse_name_list(
            field(value, "competitor_mentions"),
            &["name", "vendor"],
        ),
    }
}

fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
    value.get(name).unwrap_or(&NULL)
}

/// First non-null field among `names`, in order.
fn first_of<'a>(value: &'a Value, names: &[&str]) -> &'a Value {
    names
        .iter()
        .map(|name| field(value, name))
        .find(|v| !v.is_null())
        .unwrap_or(&NULL)
}

/// Convert the `queries` array of a `/metrics/recent-queries` response.
///
/// A missing or non-array `queries` field yields an empty list.
pub fn query_records(response: &Value) -> Vec<QueryRecord> {
    let Some(items) = response.get("queries").and_then(Value::as_array) else {
        tracing::debug!("recent-queries response has no queries array");
        return Vec::new();
    };

    let records: Vec<QueryRecord> = items
        .iter()
        .filter(|item| item.is_object())
        .map(query_record)
        .collect();

    if records.len() != items.len() {
        tracing::warn!(
            received = items.len(),
            kept = records.len(),
            "Skipped non-object entries in recent-queries response"
        );
    }
    records
}

/// Convert the `trends` array of a `/metrics/extreme-trends` response.
///
/// Entries without a date string are skipped.
pub fn trend_points(response: &Value) -> Vec<RawTrendPoint> {
    response
        .get("trends")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let date = item.get("date")?.as_str()?.to_string();
                    let metric = |name: &str| item.get(name).and_then(parse_f64);
                    Some(RawTrendPoint {
                        date,
                        extreme_mentions: metric("extreme_mentions"),
                        extreme_citations: metric("extreme_citations"),
                        avg_rank: metric("avg_rank"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Convert the `matches` array of a `POST /runs/lookup` response.
///
/// Matches without an id are unusable for navigation and are dropped.
pub fn cache_matches(response: &Value) -> Vec<CacheMatch> {
    response
        .get("matches")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let id = item.get("id").and_then(parse_string)?;
                    Some(CacheMatch {
                        id,
                        engine: item.get("engine").and_then(parse_string),
                        ts: item.get("ts").and_then(parse_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Summarize a `/metrics/enhanced-analysis` response.
///
/// Key spellings differ between backend versions, so each figure accepts
/// the known aliases. A response with no runs carries an empty `analysis`
/// object and yields an empty summary.
pub fn analysis_summary(response: &Value) -> AnalysisSummary {
    let analysis = field(response, "analysis");
    let citations = field(analysis, "citations");
    let competitors = field(analysis, "competitors");
    let count = |item: &Value, names: &[&str]| parse_i64(first_of(item, names)).unwrap_or(0);
    let list = |section: &Value, names: &[&str]| -> Vec<Value> {
        first_of(section, names)
            .as_array()
            .cloned()
            .unwrap_or_default()
    };

    let top_domains = list(
        citations,
        &["top_5_websites_by_mentions", "top_5_domains_by_frequency"],
    )
    .iter()
    .filter_map(|item| {
        let domain = parse_string(first_of(item, &["domain", "website"]))?;
        Some(DomainMentions {
            domain,
            mentions: count(item, &["total_mentions", "mentions", "count"]),
        })
    })
    .collect();

    let top_competitors = list(competitors, &["top_competitors"])
        .iter()
        .filter_map(|item| {
            let name = parse_string(field(item, "name"))?;
            Some(CompetitorMentions {
                name,
                mentions: count(item, &["mentions"]),
                avg_rank: parse_f64(field(item, "avg_rank")),
            })
        })
        .collect();

    AnalysisSummary {
        total_citations: count(citations, &["total_citations"]),
        unique_domains: count(citations, &["unique_domains"]),
        avg_quality_score: parse_f64(field(citations, "avg_quality_score")),
        top_domains,
        total_entity_mentions: count(
            competitors,
            &["total_entity_mentions", "total_entities_mentions"],
        ),
        unique_entities: count(competitors, &["unique_entities"]),
        top_competitors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_record_full_payload() {
        let value = json!({
            "id": 42,
            "query_text": "best enterprise wifi vendors",
            "engine": "gpt-4o-search-preview",
            "model": "gpt-4o-search-preview",
            "created_at": "2025-08-05T14:30:00",
            "status": "completed",
            "response_time": 3.25,
            "cost": "0.0042",
            "input_tokens": 812,
            "output_tokens": "430",
            "intent": "commercial",
            "domains": ["extremenetworks.com", "cisco.com"],
            "competitor_mentions": {"cisco": 2, "aruba": 1}
        });

        let record = query_record(&value);
        assert_eq!(record.id, "42");
        assert_eq!(record.query_text, "best enterprise wifi vendors");
        assert_eq!(record.cost, Some(0.0042));
        assert_eq!(record.response_time, Some(3.25));
        assert_eq!(record.input_tokens, Some(812));
        assert_eq!(record.output_tokens, Some(430));
        assert_eq!(record.intent.as_deref(), Some("commercial"));
        assert!(record.created_at.is_some());
        assert_eq!(record.citations, vec!["extremenetworks.com", "cisco.com"]);
        assert_eq!(record.competitor_mentions.len(), 2);
        assert!(record.is_completed());
    }

    #[test]
    fn test_query_record_missing_fields_stay_missing() {
        let record = query_record(&json!({
            "id": "abc",
            "query": "extreme networks login",
            "cost": null,
            "response_time": "",
            "intent_category": "brand_focused"
        }));

        assert_eq!(record.query_text, "extreme networks login");
        assert_eq!(record.cost, None);
        assert_eq!(record.response_time, None);
        assert_eq!(record.engine, None);
        assert_eq!(record.intent.as_deref(), Some("brand_focused"));
        assert!(record.citations.is_empty());
    }

    #[test]
    fn test_query_records_skips_non_objects() {
        let response = json!({"queries": [{"id": "a"}, 7, null, {"id": "b"}]});
        let records = query_records(&response);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");

        assert!(query_records(&json!({})).is_empty());
        assert!(query_records(&json!({"queries": "nope"})).is_empty());
    }

    #[test]
    fn test_trend_points() {
        let response = json!({"trends": [
            {"date": "2025-07-28", "extreme_mentions": 3, "extreme_citations": "2", "avg_rank": 1.0},
            {"extreme_mentions": 5},
            {"date": "2025-08-04", "extreme_mentions": null}
        ]});

        let points = trend_points(&response);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].extreme_citations, Some(2.0));
        assert_eq!(points[1].extreme_mentions, None);
    }

    #[test]
    fn test_cache_matches_require_id() {
        let response = json!({"matches": [
            {"id": "run-1", "engine": "openai", "ts": "2025-08-05T10:00:00"},
            {"engine": "perplexity"}
        ]});

        let matches = cache_matches(&response);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "run-1");
        assert!(cache_matches(&json!({"matches": []})).is_empty());
    }

    #[test]
    fn test_analysis_summary_accepts_key_aliases() {
        let summary = analysis_summary(&json!({
            "period_days": 30,
            "analysis": {
                "citations": {
                    "total_citations": 12,
                    "unique_domains": "4",
                    "top_5_domains_by_frequency": [
                        { "domain": "extremenetworks.com", "count": 5 },
                        { "count": 3 }
                    ]
                },
                "competitors": {
                    "total_entities_mentions": 9,
                    "unique_entities": 3,
                    "top_competitors": [
                        { "name": "Cisco", "mentions": 4, "avg_rank": 1.5 },
                        { "name": "Aruba", "mentions": 2, "avg_rank": "N/A" }
                    ]
                }
            }
        }));

        assert_eq!(summary.total_citations, 12);
        assert_eq!(summary.unique_domains, 4);
        assert_eq!(summary.avg_quality_score, None);
        assert_eq!(summary.top_domains.len(), 1);
        assert_eq!(summary.top_domains[0].domain, "extremenetworks.com");
        assert_eq!(summary.top_domains[0].mentions, 5);
        assert_eq!(summary.total_entity_mentions, 9);
        assert_eq!(summary.top_competitors[0].avg_rank, Some(1.5));
        assert_eq!(summary.top_competitors[1].avg_rank, None);
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_analysis_summary_without_runs() {
        let summary = analysis_summary(&json!({
            "message": "No automated runs found for the specified period and engine filter",
            "analysis": {},
            "run_source": "none"
        }));
        assert!(summary.is_empty());
        assert!(summary.top_competitors.is_empty());
        assert_eq!(analysis_summary(&json!(null)), AnalysisSummary::default());
    }
}
