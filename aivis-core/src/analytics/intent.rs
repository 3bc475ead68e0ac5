//! Intent classification.
//!
//! Each record is classified once, in strict priority order:
//! 1. an explicit canonical intent label on the record;
//! 2. keyword groups on the query text: transactional, then commercial,
//!    then navigational;
//! 3. otherwise [`IntentBucket::Informational`].
//!
//! Keywords match whole words (or whole phrases for multi-word keywords)
//! in the lowercased text, so "top" does not match "laptop".

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{IntentBucket, QueryRecord};

const TRANSACTIONAL_KEYWORDS: &[&str] = &[
    "buy",
    "purchase",
    "price",
    "prices",
    "pricing",
    "cost",
    "costs",
    "quote",
    "license",
    "licenses",
    "licensing",
    "subscription",
    "discount",
    "free trial",
    "order",
];

const COMMERCIAL_KEYWORDS: &[&str] = &[
    "best",
    "top",
    "vs",
    "versus",
    "compare",
    "comparison",
    "alternative",
    "alternatives",
    "review",
    "reviews",
    "rating",
    "ratings",
    "recommend",
    "recommended",
    "leading",
];

const NAVIGATIONAL_KEYWORDS: &[&str] = &[
    "login",
    "log in",
    "sign in",
    "signin",
    "support",
    "portal",
    "documentation",
    "docs",
    "download",
    "downloads",
    "contact",
    "website",
    "homepage",
    "official site",
];

/// Keyword groups in the order they are checked.
const KEYWORD_GROUPS: &[(IntentBucket, &[&str])] = &[
    (IntentBucket::Transactional, TRANSACTIONAL_KEYWORDS),
    (IntentBucket::Commercial, COMMERCIAL_KEYWORDS),
    (IntentBucket::Navigational, NAVIGATIONAL_KEYWORDS),
];

/// Classify a single record into exactly one bucket.
pub fn classify(record: &QueryRecord) -> IntentBucket {
    if let Some(bucket) = record.intent.as_deref().and_then(IntentBucket::from_label) {
        return bucket;
    }
    classify_text(&record.query_text)
}

/// Keyword-based classification of query text.
pub fn classify_text(text: &str) -> IntentBucket {
    let normalized = normalize(text);

    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|kw| normalized.contains(&format!(" {kw} ")))
        })
        .map(|(bucket, _)| *bucket)
        .unwrap_or(IntentBucket::Informational)
}

/// Lowercase, replace non-alphanumerics with spaces, collapse runs of
/// whitespace, and pad with one space on each side.
fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut normalized = String::with_capacity(lowered.len() + 2);
    normalized.push(' ');
    for word in lowered.split_whitespace() {
        normalized.push_str(word);
        normalized.push(' ');
    }
    normalized
}

/// Count of records per intent bucket.
///
/// Always carries all four buckets; counts sum to `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentDistribution {
    pub counts: BTreeMap<IntentBucket, usize>,
    pub total: usize,
}

impl Default for IntentDistribution {
    fn default() -> Self {
        Self {
            counts: IntentBucket::ALL.iter().map(|b| (*b, 0)).collect(),
            total: 0,
        }
    }
}

impl IntentDistribution {
    /// Classify every record.
    pub fn from_records(records: &[QueryRecord]) -> Self {
        let mut distribution = Self::default();
        for record in records {
            *distribution.counts.entry(classify(record)).or_insert(0) += 1;
            distribution.total += 1;
        }
        distribution
    }

    pub fn count(&self, bucket: IntentBucket) -> usize {
        self.counts.get(&bucket).copied().unwrap_or(0)
    }

    /// Share of records in `bucket`, in percent. 0 when there are no records.
    pub fn percentage(&self, bucket: IntentBucket) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(bucket) as f64 / self.total as f64 * 100.0
        }
    }
}
