use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Address nothing listens on, for runs that must fall back offline.
const UNREACHABLE: &str = "http://127.0.0.1:9";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new(base_url: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(xdg_config.join("aivis")).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        let config = format!(
            "[api]\nbase_url = \"{base_url}\"\ntimeout_secs = 5\nlookup_timeout_secs = 2\n"
        );
        fs::write(xdg_config.join("aivis/config.toml"), config).expect("failed to write config");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn draft_path(&self) -> PathBuf {
        self.xdg_data.join("aivis/query-draft.json")
    }
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "aivis-analyze" => PathBuf::from(assert_cmd::cargo::cargo_bin!("aivis-analyze")),
        "aivis-query" => PathBuf::from(assert_cmd::cargo::cargo_bin!("aivis-query")),
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn run_ok(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> (String, String) {
    let output = run_bin(env, bin_name, args);
    assert_success(bin_name, args, &output);
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

#[test]
fn draft_save_show_and_clear() {
    let env = CliTestEnv::new(UNREACHABLE);

    let (stdout, _) = run_ok(&env, "aivis-query", &["draft", "show"]);
    assert!(stdout.contains("No saved draft."));

    let save_args = [
        "draft",
        "save",
        "best campus wifi vendors",
        "--engine",
        "perplexity",
        "--temperature",
        "0.5",
    ];
    let (stdout, _) = run_ok(&env, "aivis-query", &save_args);
    assert!(stdout.contains("Draft saved."));
    assert!(env.draft_path().exists());

    let (stdout, _) = run_ok(&env, "aivis-query", &["draft", "show"]);
    let draft: Value = serde_json::from_str(&stdout).expect("draft show prints JSON");
    assert_eq!(draft["text"], "best campus wifi vendors");
    assert_eq!(draft["engines"], json!(["perplexity"]));
    assert_eq!(draft["intent"], "commercial");
    assert_eq!(draft["temperature"], 0.5);

    let (stdout, _) = run_ok(&env, "aivis-query", &["draft", "clear"]);
    assert!(stdout.contains("Draft cleared."));
    assert!(!env.draft_path().exists());
}

#[test]
fn estimate_falls_back_to_default_prices() {
    let env = CliTestEnv::new(UNREACHABLE);

    let args = ["estimate", "--text", "abcdefghij", "--format", "json"];
    let (stdout, stderr) = run_ok(&env, "aivis-query", &args);
    assert!(stderr.contains("Pricing unavailable"));

    let estimate: Value = serde_json::from_str(&stdout).expect("estimate prints JSON");
    assert_eq!(estimate["model"], "gpt-4o");
    assert_eq!(estimate["input_tokens"], 3);
    assert_eq!(estimate["input_per_1k"], 0.0025);

    let args = [
        "estimate",
        "--project",
        "--queries-per-day",
        "10",
        "--days",
        "2",
        "--input-tokens",
        "500",
        "--output-tokens",
        "250",
        "--format",
        "json",
    ];
    let (stdout, _) = run_ok(&env, "aivis-query", &args);
    let output: Value = serde_json::from_str(&stdout).expect("projection prints JSON");
    assert_eq!(output["projection"]["total_input_tokens"], 10000.0);
    assert_eq!(output["projection"]["total_output_tokens"], 5000.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn analyze_reports_metrics_from_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metrics/recent-queries"))
        .and(query_param("days", "14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queries": [
                { "id": 1, "query_text": "buy wifi 7 access points", "engine": "openai",
                  "cost": 0.002, "response_time": 2.0, "status": "completed" },
                { "id": 2, "query_text": "what is sase", "engine": "perplexity",
                  "cost": "0.004", "response_time": "4", "status": "completed" },
                { "id": 3, "query_text": "aruba vs extreme", "engine": null,
                  "cost": null, "status": "error" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metrics/extreme-trends"))
        .and(query_param("days", "180"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "trends": [
                { "date": "2025-06-01", "extreme_mentions": 0 },
                { "date": "2025-07-01", "extreme_mentions": 8 },
                { "date": "2025-08-01", "extreme_mentions": 10 }
            ]
        })))
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());

    let args = ["--days", "14", "--bucket", "monthly", "--format", "json"];
    let (stdout, _) = run_ok(&env, "aivis-analyze", &args);
    let output: Value = serde_json::from_str(&stdout).expect("analyze prints JSON");

    assert_eq!(output["overview"]["total_queries"], 3);
    assert_eq!(output["engines"].as_array().map(Vec::len), Some(3));
    assert_eq!(output["intents"]["Transactional"]["count"], 1);
    assert_eq!(output["intents"]["Commercial"]["count"], 1);
    assert_eq!(output["intents"]["Informational"]["count"], 1);
    assert_eq!(output["trend"]["current_value"], 10.0);
    assert_eq!(output["trend"]["change"], 25.0);
    assert_eq!(output["trend"]["current_period"], "Aug 2025");

    let args = ["--days", "14", "--bucket", "monthly", "--per-1000"];
    let (stdout, _) = run_ok(&env, "aivis-analyze", &args);
    assert!(stdout.contains("Avg cost / 1K queries"));
    assert!(!stdout.contains("Week of"));
    assert!(stdout.contains("change +25.0%"));
}

#[tokio::test(flavor = "multi_thread")]
async fn analyze_includes_citation_and_competitor_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metrics/recent-queries"))
        .and(query_param("engine", "openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "queries": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metrics/extreme-trends"))
        .and(query_param_is_missing("engine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "trends": [] })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metrics/enhanced-analysis"))
        .and(query_param("days", "7"))
        .and(query_param("engine", "openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "period_days": 7,
            "analysis": {
                "citations": {
                    "total_citations": 12,
                    "unique_domains": 4,
                    "top_5_domains_by_frequency": [
                        { "domain": "extremenetworks.com", "count": 5 }
                    ]
                },
                "competitors": {
                    "total_entities_mentions": 9,
                    "unique_entities": 3,
                    "top_competitors": [
                        { "name": "Cisco", "mentions": 4, "avg_rank": 1.5 }
                    ]
                }
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());

    let args = ["--days", "7", "--engine", "openai", "--analysis", "--format", "json"];
    let (stdout, _) = run_ok(&env, "aivis-analyze", &args);
    let output: Value = serde_json::from_str(&stdout).expect("analyze prints JSON");
    assert_eq!(output["analysis"]["total_citations"], 12);
    assert_eq!(output["analysis"]["total_entity_mentions"], 9);
    assert_eq!(output["analysis"]["top_domains"][0]["domain"], "extremenetworks.com");
    assert_eq!(output["analysis"]["top_competitors"][0]["name"], "Cisco");

    let args = ["--days", "7", "--engine", "openai", "--analysis"];
    let (stdout, _) = run_ok(&env, "aivis-analyze", &args);
    assert!(stdout.contains("12 citations across 4 domains"));
    assert!(stdout.contains("Cisco"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_streams_answer_and_reports_run_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/runs/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query/stream"))
        .and(query_param("engine", "openai"))
        .respond_with(event_stream(concat!(
            "event: start\ndata: {\"run_id\":\"abc\"}\n\n",
            "event: delta\ndata: {\"text\":\"Hello, \"}\n\n",
            "event: delta\ndata: {\"text\":\"world\"}\n\n",
            "event: done\ndata: {}\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());
    let (stdout, stderr) = run_ok(&env, "aivis-query", &["run", "best wifi vendors"]);

    assert!(stdout.contains("Hello, world"));
    assert!(stderr.contains("Run saved: abc"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_opens_cached_run_without_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/runs/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "matches": [{ "id": "cached-1", "engine": "openai" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query/stream"))
        .respond_with(event_stream(""))
        .expect(0)
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());
    let (_, stderr) = run_ok(&env, "aivis-query", &["run", "best wifi vendors"]);
    assert!(stderr.contains("Run saved: cached-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_anyway_streams_despite_cached_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/runs/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "matches": [{ "id": "cached-1", "engine": "openai" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query/stream"))
        .respond_with(event_stream(concat!(
            "event: delta\ndata: {\"text\":\"fresh\"}\n\n",
            "event: done\ndata: {\"run_id\":\"new-2\"}\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());
    let args = ["run", "best wifi vendors", "--run-anyway"];
    let (stdout, stderr) = run_ok(&env, "aivis-query", &args);
    assert!(stdout.contains("fresh"));
    assert!(stderr.contains("Run saved: new-2"));

    let output = run_bin(
        &env,
        "aivis-query",
        &["run", "best wifi vendors", "--run-anyway", "--open-cached"],
    );
    assert!(!output.status.success(), "the two cache flags conflict");
}

#[tokio::test(flavor = "multi_thread")]
async fn run_fails_on_stream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/runs/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query/stream"))
        .respond_with(event_stream(
            "event: error\ndata: {\"message\":\"OpenAI API error\"}\n\n",
        ))
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());
    let output = run_bin(&env, "aivis-query", &["run", "best wifi vendors"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OpenAI API error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_from_draft_keeps_draft_until_a_run_is_saved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/runs/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query/stream"))
        .respond_with(event_stream("event: delta\ndata: {\"text\":\"partial\"}\n\n"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query/stream"))
        .and(query_param("model", "sonar"))
        .respond_with(event_stream(concat!(
            "event: start\ndata: {\"run_id\":\"r-7\"}\n\n",
            "event: done\ndata: {}\n\n",
        )))
        .mount(&server)
        .await;

    let env = CliTestEnv::new(&server.uri());
    let save_args = [
        "draft",
        "save",
        "best campus wifi vendors",
        "--engine",
        "perplexity",
        "--engine",
        "openai",
    ];
    run_ok(&env, "aivis-query", &save_args);

    let output = run_bin(&env, "aivis-query", &["run"]);
    assert!(!output.status.success());
    assert!(env.draft_path().exists(), "unfinished run must keep the draft");

    let (_, stderr) = run_ok(&env, "aivis-query", &["run"]);
    assert!(stderr.contains("Run saved: r-7"));
    assert!(!env.draft_path().exists());
}
