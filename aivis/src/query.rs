//! aivis-query - run live queries against AI answer engines
//!
//! Streams a query's answer as it is generated, manages the saved query
//! draft, and estimates what queries will cost.

use std::io::{BufRead, IsTerminal, Write};

use aivis_core::analytics::{
    estimate_draft, project_costs, PricingTable, ProjectionInput,
};
use aivis_core::{
    ApiClient, Config, DraftStore, LiveSession, QueryDraft, SessionObserver, SessionState,
    SubmitOutcome,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aivis-query")]
#[command(about = "Run live AI engine queries and manage query drafts")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a query run (uses the saved draft when no query is given)
    Run {
        /// Query text
        query: Option<String>,

        /// Engine to query; repeat for several (the stream uses the first)
        #[arg(short, long = "engine")]
        engines: Vec<String>,

        /// Model for the streaming engine
        #[arg(short, long)]
        model: Option<String>,

        /// Intent label for the run
        #[arg(short, long)]
        intent: Option<String>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Stream a new run even if one exists from today
        #[arg(long, conflicts_with = "open_cached")]
        run_anyway: bool,

        /// Open today's existing run without asking
        #[arg(long)]
        open_cached: bool,
    },

    /// Print a persisted run as JSON
    Show {
        /// Run ID
        run_id: String,
    },

    /// Manage the saved query draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Estimate query cost
    Estimate {
        /// Text to estimate (defaults to the saved draft)
        #[arg(long)]
        text: Option<String>,

        /// Project spend for a sustained volume instead
        #[arg(long)]
        project: bool,

        /// Model to price the projection with
        #[arg(long)]
        model: Option<String>,

        /// Queries per day for the projection
        #[arg(long)]
        queries_per_day: Option<f64>,

        /// Days covered by the projection
        #[arg(long)]
        days: Option<f64>,

        /// Average input tokens per query
        #[arg(long)]
        input_tokens: Option<f64>,

        /// Average output tokens per query
        #[arg(long)]
        output_tokens: Option<f64>,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that the backend is reachable
    Health,
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print the saved draft
    Show,

    /// Save a draft
    Save {
        /// Query text
        text: String,

        /// Engine; repeat for several
        #[arg(short, long = "engine")]
        engines: Vec<String>,

        /// Intent label
        #[arg(short, long)]
        intent: Option<String>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// OpenAI model
        #[arg(long)]
        openai_model: Option<String>,

        /// Perplexity model
        #[arg(long)]
        perplexity_model: Option<String>,
    },

    /// Delete the saved draft
    Clear,
}

/// Prints answer text to stdout as it arrives.
struct TerminalObserver {
    stdout: std::io::Stdout,
}

impl SessionObserver for TerminalObserver {
    fn on_delta(&mut self, text: &str) {
        let mut out = self.stdout.lock();
        let _ = write!(out, "{}", text);
        let _ = out.flush();
    }

    fn on_terminal(&mut self, run_id: &str) {
        println!();
        eprintln!("Run saved: {}", run_id);
        eprintln!("View it with: aivis-query show {}", run_id);
    }

    fn on_error(&mut self, message: &str) {
        println!();
        eprintln!("Error: {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = aivis_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    let drafts = DraftStore::new(Config::draft_path(), config.drafts.ttl());

    match args.command {
        Command::Run {
            query,
            engines,
            model,
            intent,
            temperature,
            run_anyway,
            open_cached,
        } => {
            let from_draft = query.is_none();
            let mut draft = match query {
                Some(text) => QueryDraft {
                    text,
                    ..Default::default()
                },
                None => drafts
                    .load()
                    .context("no query given and no saved draft (see 'aivis-query draft save')")?,
            };
            if !engines.is_empty() {
                draft.engines = engines;
            }
            if let Some(intent) = intent {
                draft.intent = intent;
            }
            if let Some(temperature) = temperature {
                draft.temperature = temperature;
            }

            let mut request = draft.to_request();
            if model.is_some() {
                request.model = model;
            }

            let client = ApiClient::new(&config.api).context("failed to create API client")?;
            let on_cache_hit = if run_anyway {
                CacheChoice::RunAnyway
            } else if open_cached {
                CacheChoice::Open
            } else {
                CacheChoice::Ask
            };
            let state = run_query(client, &config, request, on_cache_hit).await?;

            if from_draft && state.produced_run() {
                drafts.clear();
            }
        }

        Command::Show { run_id } => {
            let client = ApiClient::new(&config.api).context("failed to create API client")?;
            let run = client
                .get_run(&run_id)
                .await
                .with_context(|| format!("failed to fetch run {}", run_id))?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }

        Command::Draft { action } => match action {
            DraftAction::Show => match drafts.load() {
                Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
                None => println!("No saved draft."),
            },
            DraftAction::Save {
                text,
                engines,
                intent,
                temperature,
                openai_model,
                perplexity_model,
            } => {
                let defaults = QueryDraft::default();
                let draft = QueryDraft {
                    text,
                    engines: if engines.is_empty() {
                        defaults.engines
                    } else {
                        engines
                    },
                    intent: intent.unwrap_or(defaults.intent),
                    temperature: temperature.unwrap_or(defaults.temperature),
                    openai_model: openai_model.unwrap_or(defaults.openai_model),
                    perplexity_model: perplexity_model.unwrap_or(defaults.perplexity_model),
                };
                if !drafts.save(&draft) {
                    anyhow::bail!("failed to save draft to {}", drafts.path().display());
                }
                println!("Draft saved.");
            }
            DraftAction::Clear => {
                drafts.clear();
                println!("Draft cleared.");
            }
        },

        Command::Estimate {
            text,
            project,
            model,
            queries_per_day,
            days,
            input_tokens,
            output_tokens,
            format,
        } => {
            let client = ApiClient::new(&config.api).context("failed to create API client")?;
            let pricing = fetch_pricing(&client).await;

            let output = if project {
                let defaults = ProjectionInput::default();
                let input = ProjectionInput {
                    model: model.unwrap_or(defaults.model),
                    queries_per_day: queries_per_day.unwrap_or(defaults.queries_per_day),
                    days: days.unwrap_or(defaults.days),
                    avg_input_tokens: input_tokens.unwrap_or(defaults.avg_input_tokens),
                    avg_output_tokens: output_tokens.unwrap_or(defaults.avg_output_tokens),
                };
                let projection = project_costs(&input, &pricing);
                if format != "json" {
                    println!(
                        "{} queries/day for {} days on {}",
                        input.queries_per_day, input.days, input.model
                    );
                    println!("  Input:  {:.0} tokens  ${:.4}", projection.total_input_tokens, projection.input_cost);
                    println!("  Output: {:.0} tokens  ${:.4}", projection.total_output_tokens, projection.output_cost);
                    println!("  Total:  ${:.4}", projection.total_cost);
                }
                serde_json::json!({ "input": input, "projection": projection })
            } else {
                let draft = match text {
                    Some(text) => QueryDraft {
                        text,
                        ..drafts.load().unwrap_or_default()
                    },
                    None => drafts
                        .load()
                        .context("no text given and no saved draft")?,
                };
                let estimate = estimate_draft(&draft, &pricing);
                if format != "json" {
                    println!(
                        "~{} input tokens on {} (${}/1K)",
                        estimate.input_tokens, estimate.model, estimate.input_per_1k
                    );
                    println!("Estimated input cost: ${:.6}", estimate.estimated_cost);
                }
                serde_json::json!(estimate)
            };

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }

        Command::Health => {
            let client = ApiClient::new(&config.api).context("failed to create API client")?;
            let ok = client
                .health_check()
                .await
                .with_context(|| format!("backend at {} is unreachable", client.base_url()))?;
            if !ok {
                anyhow::bail!("backend at {} reports unhealthy", client.base_url());
            }
            println!("Backend at {} is healthy.", client.base_url());
        }
    }

    Ok(())
}

/// What to do when a run of the same query already exists from today.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CacheChoice {
    /// Prompt on a terminal, otherwise open the existing run.
    Ask,
    Open,
    RunAnyway,
}

impl CacheChoice {
    fn resolve(self) -> Result<CacheChoice> {
        match self {
            CacheChoice::Ask if std::io::stdin().is_terminal() => {
                eprint!("Open it instead of running the query again? [Y/n] ");
                std::io::stderr().flush()?;
                let mut answer = String::new();
                std::io::stdin().lock().read_line(&mut answer)?;
                Ok(match answer.trim().to_ascii_lowercase().as_str() {
                    "n" | "no" => CacheChoice::RunAnyway,
                    _ => CacheChoice::Open,
                })
            }
            CacheChoice::Ask => Ok(CacheChoice::Open),
            choice => Ok(choice),
        }
    }
}

async fn run_query(
    client: ApiClient,
    config: &Config,
    request: aivis_core::QueryRequest,
    on_cache_hit: CacheChoice,
) -> Result<SessionState> {
    let mut session = LiveSession::new(client, config.api.lookup_timeout());
    let mut observer = TerminalObserver {
        stdout: std::io::stdout(),
    };

    match session.submit(request).await.context("failed to start query")? {
        SubmitOutcome::Streaming => {}
        SubmitOutcome::CacheHit(hit) => {
            eprintln!("Found a run of this query from today ({}).", hit.id);
            match on_cache_hit.resolve()? {
                CacheChoice::RunAnyway => {
                    eprintln!("Streaming a new run.");
                    session.run_anyway().await.context("failed to start query")?;
                }
                CacheChoice::Open | CacheChoice::Ask => {
                    tracing::info!(run_id = %hit.id, "Opening cached run");
                    session.open_cached(&mut observer)?;
                    return Ok(session.state());
                }
            }
        }
    }

    let finished = tokio::select! {
        result = session.run(&mut observer) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let state = match finished {
        Some(result) => result?,
        None => {
            session.close();
            println!();
            eprintln!("Cancelled.");
            session.state()
        }
    };

    match state {
        SessionState::Navigated | SessionState::Closed => Ok(state),
        _ => anyhow::bail!(
            "query failed: {}",
            session.error().unwrap_or("unknown error")
        ),
    }
}

/// Pricing from the backend, or the built-in defaults if it is unavailable.
async fn fetch_pricing(client: &ApiClient) -> PricingTable {
    match client.pricing_models().await {
        Ok(pricing) => pricing,
        Err(e) => {
            tracing::warn!(error = %e, "Pricing unavailable, using default prices");
            eprintln!("Pricing unavailable, using default prices.");
            PricingTable::default()
        }
    }
}
