//! CLI options interaction tests
//!
//! These tests drive the `nst` binary end to end. Runs that need a sink use
//! a local wiremock server so nothing leaves the machine.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const ENV_VARS: &[&str] = &[
    "DOWNLOAD_URL",
    "UPLOAD_URL",
    "PING_COUNT",
    "DOWNLOAD_WINDOW_MS",
    "UPLOAD_WINDOW_MS",
    "WORKERS",
    "REQUEST_TIMEOUT_MS",
    "RETRY_BACKOFF_MS",
    "ENABLE_COLOR",
];

/// Helper function to create a test command isolated from the caller's environment
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nst").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper function to create a temporary directory holding a `.env` file
fn create_temp_config(content: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".env"), content).unwrap();
    temp_dir
}

/// Streams back `?bytes=N` zero bytes
struct SizedBody;

impl Respond for SizedBody {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let bytes = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "bytes")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        ResponseTemplate::new(200).set_body_bytes(vec![0u8; bytes])
    }
}

async fn start_sink() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(SizedBody)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

async fn run_blocking(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap()).await.unwrap()
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--download-url"))
        .stdout(predicate::str::contains("--upload-url"))
        .stdout(predicate::str::contains("--pings"))
        .stdout(predicate::str::contains("--skip-upload"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_conflicting_color_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot specify both --color and --no-color"));
}

#[test]
fn test_json_with_verbose_is_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--json", "--verbose"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--json"));
}

#[test]
fn test_invalid_values_fail_before_any_network_activity() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args(["--download-url", "ftp://example.com/__down"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));

    create_test_cmd(&dir)
        .args(["--pings", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Ping count"));

    create_test_cmd(&dir)
        .args(["--workers", "64"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Worker count"));
}

#[test]
fn test_malformed_window_is_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    for bad in ["0", "-1", "abc", "500"] {
        create_test_cmd(&dir)
            .args(["--download-secs", bad])
            .assert()
            .failure();
    }
}

#[test]
fn test_env_file_values_are_validated() {
    let dir = create_temp_config("UPLOAD_URL=not-a-url\n");
    create_test_cmd(&dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("upload"));
}

#[test]
fn test_cli_overrides_env_file() {
    // The .env value is invalid but the CLI value wins
    let dir = create_temp_config("PING_COUNT=0\n");
    create_test_cmd(&dir)
        .args([
            "--pings",
            "1",
            "--download-url",
            "http://127.0.0.1:9/__down",
            "--upload-url",
            "http://127.0.0.1:9/__up",
            "--request-timeout-ms",
            "200",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("latency probes failed"));
}

#[test]
fn test_unreachable_sink_exits_with_network_code() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args([
            "--download-url",
            "http://127.0.0.1:9/__down",
            "--upload-url",
            "http://127.0.0.1:9/__up",
            "--pings",
            "2",
            "--request-timeout-ms",
            "200",
            "--no-color",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Network unavailable"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_run_against_local_sink() {
    let server = start_sink().await;
    let dir = TempDir::new().unwrap();

    let mut cmd = create_test_cmd(&dir);
    cmd.args([
        "--download-url",
        &format!("{}/__down", server.uri()),
        "--upload-url",
        &format!("{}/__up", server.uri()),
        "--pings",
        "3",
        "--download-secs",
        "0.3",
        "--upload-secs",
        "0.3",
        "--workers",
        "2",
        "--json",
    ]);

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["latency"]["successful_trips"], 3);
    assert!(report["download"]["mbps"].as_f64().unwrap() > 0.0);
    assert!(report["upload"]["bytes_transferred"].as_u64().unwrap() > 0);
    assert!(report["grade"]["grade"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_text_run_with_skipped_upload() {
    let server = start_sink().await;
    let dir = TempDir::new().unwrap();

    let mut cmd = create_test_cmd(&dir);
    cmd.args([
        "--download-url",
        &format!("{}/__down", server.uri()),
        "--upload-url",
        &format!("{}/__up", server.uri()),
        "--pings",
        "2",
        "--download-secs",
        "0.3",
        "--skip-upload",
        "--no-color",
    ]);

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Network Speed Test Results"));
    assert!(stdout.contains("Download:"));
    assert!(!stdout.contains("Upload:"));
    assert!(stdout.contains("Grade:"));

    // No upload request ever reached the sink
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "POST"));
}
