//! aivis-analyze - dashboard metrics in the terminal
//!
//! Fetches recent query records and the trend series for a dashboard
//! filter, derives engine, intent and trend metrics, and prints them.

use aivis_core::analytics::{aggregate, CostScale, DerivedMetrics, TrendSelection};
use aivis_core::ingest::analysis_summary;
use aivis_core::{
    AnalysisSummary, ApiClient, Config, DashboardFilter, IntentBucket, TimeBucket, TrendMetric,
};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "aivis-analyze")]
#[command(about = "Show AI visibility metrics for recent query runs")]
#[command(version)]
struct Args {
    /// Look-back window in days (defaults to dashboard.days)
    #[arg(short, long)]
    days: Option<u32>,

    /// Only include runs from this engine
    #[arg(short, long)]
    engine: Option<String>,

    /// Maximum number of records to fetch
    #[arg(short, long)]
    limit: Option<u32>,

    /// Trend metric: mentions, citations, or avg_rank
    #[arg(short, long, default_value = "mentions", value_parser = parse_metric)]
    metric: TrendMetric,

    /// Trend granularity: weekly or monthly
    #[arg(short, long, default_value = "weekly", value_parser = parse_bucket)]
    bucket: TimeBucket,

    /// Show engine costs per 1000 queries instead of per query
    #[arg(long)]
    per_1000: bool,

    /// Also fetch the citation and competitor analysis
    #[arg(short, long)]
    analysis: bool,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Also log to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_metric(s: &str) -> Result<TrendMetric, String> {
    TrendMetric::parse(s).ok_or_else(|| format!("unknown metric '{s}'"))
}

fn parse_bucket(s: &str) -> Result<TimeBucket, String> {
    TimeBucket::parse(s).ok_or_else(|| format!("unknown time bucket '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = aivis_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    let client = ApiClient::new(&config.api).context("failed to create API client")?;

    let defaults = config.dashboard.filter();
    let filter = DashboardFilter {
        days: args.days.unwrap_or(defaults.days),
        engine: args.engine.clone().or(defaults.engine),
    };
    let limit = args.limit.or(config.dashboard.recent_limit);

    let mut selection = TrendSelection::new(args.metric, args.bucket);
    selection.excluded_month_days = config.trends.excluded_month_days();

    let (records, points) = tokio::join!(
        client.recent_queries(&filter, limit),
        client.extreme_trends(selection.bucket.lookback_days()),
    );
    let records = records.context("failed to fetch recent queries")?;
    let points = points.context("failed to fetch trend series")?;

    let analysis = if args.analysis {
        let response = client
            .enhanced_analysis(&filter)
            .await
            .context("failed to fetch citation and competitor analysis")?;
        Some(analysis_summary(&response))
    } else {
        None
    };

    let metrics = aggregate(&records, &points, &selection);
    let scale = if args.per_1000 {
        CostScale::Per1000
    } else {
        CostScale::PerQuery
    };

    if args.format == "json" {
        print_json(&filter, &metrics, scale, analysis.as_ref())?;
    } else {
        print_text(&filter, &metrics, scale);
        if let Some(summary) = &analysis {
            print_analysis(summary);
        }
    }

    Ok(())
}

fn print_text(filter: &DashboardFilter, metrics: &DerivedMetrics, scale: CostScale) {
    let overview = &metrics.overview;

    println!(
        "Last {} days, {}",
        filter.days,
        filter.engine.as_deref().unwrap_or("all engines")
    );
    println!();

    if overview.total_queries == 0 {
        println!("No query runs found.");
        println!("Run a query with 'aivis-query run' first.");
    } else {
        println!("Overview");
        println!(
            "  Queries:        {} ({} completed, {:.1}% success)",
            overview.total_queries,
            overview.completed_queries,
            overview.success_rate()
        );
        println!(
            "  Avg response:   {}",
            format_seconds(overview.avg_response_time())
        );
        println!(
            "  {:<15} {}",
            format!("{}:", scale.label()),
            format_cost(overview.avg_cost().map(|c| scale.apply(c)))
        );
        println!(
            "  Tokens:         {} in / {} out",
            overview.input_tokens, overview.output_tokens
        );
        println!();

        println!("Engines");
        println!(
            "  {:<12} {:>7} {:>12} {:>22}",
            "engine",
            "runs",
            "avg time",
            scale.label()
        );
        for engine in metrics.engine_metrics.values() {
            println!(
                "  {:<12} {:>7} {:>12} {:>22}",
                engine.engine,
                engine.count,
                format_seconds(engine.avg_response_time()),
                format_cost(engine.scaled_cost(scale))
            );
        }
        println!();

        println!("Intent");
        let intents = &metrics.intent_distribution;
        for bucket in IntentBucket::ALL {
            println!(
                "  {:<14} {:>5} {:>6.1}%",
                bucket.to_string(),
                intents.count(bucket),
                intents.percentage(bucket)
            );
        }
        println!();
    }

    let trend = &metrics.trend;
    println!("Trend: {} ({})", trend.metric.label(), trend.bucket.as_str());
    if trend.is_empty() {
        println!("  No trend data.");
        return;
    }
    for point in &trend.points {
        println!("  {:<18} {}", point.label, format_value(point.value));
    }
    println!(
        "  Current {} ({}), previous {} ({}), change {:+.1}%",
        format_value(trend.current_value),
        trend.current_period.as_deref().unwrap_or("-"),
        format_value(trend.previous_value),
        trend.previous_period.display(),
        trend.change
    );
}

fn print_analysis(summary: &AnalysisSummary) {
    println!();
    println!("Citations");
    if summary.is_empty() {
        println!("  No analysis for this period.");
        return;
    }
    println!(
        "  {} citations across {} domains",
        summary.total_citations, summary.unique_domains
    );
    for (i, domain) in summary.top_domains.iter().enumerate() {
        println!("  #{} {:<28} {:>5}", i + 1, domain.domain, domain.mentions);
    }
    println!();

    println!("Competitors");
    println!(
        "  {} mentions of {} entities",
        summary.total_entity_mentions, summary.unique_entities
    );
    for (i, competitor) in summary.top_competitors.iter().take(10).enumerate() {
        println!(
            "  #{:<2} {:<24} {:>5}  avg rank {}",
            i + 1,
            competitor.name,
            competitor.mentions,
            competitor
                .avg_rank
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_json(
    filter: &DashboardFilter,
    metrics: &DerivedMetrics,
    scale: CostScale,
    analysis: Option<&AnalysisSummary>,
) -> Result<()> {
    let engines: Vec<_> = metrics
        .engine_metrics
        .values()
        .map(|engine| {
            serde_json::json!({
                "engine": engine.engine,
                "count": engine.count,
                "avg_response_time": engine.avg_response_time(),
                "avg_cost": engine.scaled_cost(scale),
                "total_cost": engine.total_cost(),
            })
        })
        .collect();

    let intents: serde_json::Map<String, serde_json::Value> = IntentBucket::ALL
        .iter()
        .map(|bucket| {
            (
                bucket.as_str().to_string(),
                serde_json::json!({
                    "count": metrics.intent_distribution.count(*bucket),
                    "percentage": metrics.intent_distribution.percentage(*bucket),
                }),
            )
        })
        .collect();

    let overview = &metrics.overview;
    let mut output = serde_json::json!({
        "filter": filter,
        "cost_scale": scale,
        "overview": {
            "total_queries": overview.total_queries,
            "completed_queries": overview.completed_queries,
            "success_rate": overview.success_rate(),
            "avg_response_time": overview.avg_response_time(),
            "avg_cost": overview.avg_cost().map(|c| scale.apply(c)),
            "input_tokens": overview.input_tokens,
            "output_tokens": overview.output_tokens,
            "citations": overview.citations,
            "competitor_mentions": overview.competitor_mentions,
        },
        "engines": engines,
        "intents": intents,
        "trend": metrics.trend,
    });
    if let Some(summary) = analysis {
        output["analysis"] = serde_json::to_value(summary)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn format_seconds(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}s", v))
        .unwrap_or_else(|| "-".to_string())
}

fn format_cost(value: Option<f64>) -> String {
    value
        .map(|v| format!("${:.6}", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Whole numbers without decimals, ranks with two.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
