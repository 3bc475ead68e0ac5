//! Trend series construction from the backend's pre-bucketed points.
//!
//! Points whose selected-metric value is not strictly positive are dropped
//! before labeling and change computation. This hides empty leading periods,
//! but it also hides periods where the metric is legitimately zero; see
//! DESIGN.md before relying on it for anything but chart parity.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::ingest::fields::parse_date;
use crate::types::{RawTrendPoint, TimeBucket, TrendMetric};

/// Options that shape a trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendSelection {
    pub metric: TrendMetric,
    pub bucket: TimeBucket,
    /// Calendar days `(month, day)` dropped in every year
    pub excluded_month_days: Vec<(u32, u32)>,
}

impl TrendSelection {
    pub fn new(metric: TrendMetric, bucket: TimeBucket) -> Self {
        Self {
            metric,
            bucket,
            excluded_month_days: Vec::new(),
        }
    }

    fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded_month_days
            .iter()
            .any(|&(month, day)| date.month() == month && date.day() == day)
    }
}

impl Default for TrendSelection {
    fn default() -> Self {
        Self::new(TrendMetric::Mentions, TimeBucket::Weekly)
    }
}

/// One plotted point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: f64,
}

/// What the series reports as the comparison period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "label")]
pub enum PreviousPeriod {
    Label(String),
    NoPreviousData,
}

impl PreviousPeriod {
    pub fn display(&self) -> &str {
        match self {
            PreviousPeriod::Label(label) => label,
            PreviousPeriod::NoPreviousData => "No previous data",
        }
    }
}

/// A filtered, labeled trend series with its latest change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub metric: TrendMetric,
    pub bucket: TimeBucket,
    pub points: Vec<TrendPoint>,
    pub current_value: f64,
    pub previous_value: f64,
    /// Label of the latest point, `None` when the series is empty
    pub current_period: Option<String>,
    pub previous_period: PreviousPeriod,
    /// Percent change from previous to current, one decimal
    pub change: f64,
}

impl TrendSeries {
    /// The well-typed empty series.
    pub fn empty(metric: TrendMetric, bucket: TimeBucket) -> Self {
        Self {
            metric,
            bucket,
            points: Vec::new(),
            current_value: 0.0,
            previous_value: 0.0,
            current_period: None,
            previous_period: PreviousPeriod::NoPreviousData,
            change: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Labels in plotting order.
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    /// Values in plotting order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Format a point label for the bucket granularity.
///
/// Weekly: `Week of Aug 4`. Monthly: `Aug 2025`.
pub fn period_label(date: NaiveDate, bucket: TimeBucket) -> String {
    match bucket {
        TimeBucket::Weekly => format!("Week of {}", date.format("%b %-d")),
        TimeBucket::Monthly => date.format("%b %Y").to_string(),
    }
}

/// Percent change, rounded to one decimal. Defined as 0 when `previous` is 0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let change = (current - previous) / previous * 100.0;
    (change * 10.0).round() / 10.0
}

/// Build the series for `selection` from backend points, in the order given.
pub fn build_trend(points: &[RawTrendPoint], selection: &TrendSelection) -> TrendSeries {
    let metric = selection.metric;
    let bucket = selection.bucket;

    let kept: Vec<TrendPoint> = points
        .iter()
        .filter_map(|raw| {
            let value = raw.value(metric);
            if !(value > 0.0) {
                return None;
            }
            let Some(date) = parse_date(&raw.date) else {
                tracing::debug!(date = %raw.date, "Dropping trend point with unparseable date");
                return None;
            };
            if selection.is_excluded(date) {
                return None;
            }
            Some(TrendPoint {
                date,
                label: period_label(date, bucket),
                value,
            })
        })
        .collect();

    let mut series = TrendSeries::empty(metric, bucket);
    let Some(current) = kept.last() else {
        return series;
    };

    series.current_value = current.value;
    series.current_period = Some(current.label.clone());

    if kept.len() >= 2 {
        let previous = &kept[kept.len() - 2];
        series.previous_value = previous.value;
        series.previous_period = PreviousPeriod::Label(previous.label.clone());
        series.change = percent_change(current.value, previous.value);
    }

    series.points = kept;
    series
}
