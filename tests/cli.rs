//! Runs the `mcpm` binary against a temporary config and store.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mcpm_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mcpm");
    path
}

const PAGE: &str = "Chat transcript\n\
[MCP-START]\n\
Deploy with #docker on Fridays\n\
[MCP-END]\n\
some chatter\n\
[MCP-START]\n\
TODO: rotate keys at https://vault.example.com\n\
[MCP-END]\n";

fn setup_test_env(endpoint: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let pages_dir = root.join("pages");
    fs::create_dir_all(&pages_dir).unwrap();
    fs::write(pages_dir.join("chat.md"), PAGE).unwrap();

    let config_content = format!(
        r#"[store]
path = "{root}/data/memories.json"

[agent]
endpoint = "{endpoint}"
timeout_secs = 1
queue_path = "{root}/data/agent-queue.json"

[scan]
include_globs = ["**/*.md"]
"#,
        root = root.display(),
        endpoint = endpoint,
    );

    let config_path = config_dir.join("mcpm.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mcpm(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mcpm_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--no-color")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mcpm binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_hash_command() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:1");
    let (stdout, _, ok) = run_mcpm(&config, &["hash", "  a  "]);
    assert!(ok);
    assert_eq!(stdout.trim(), "2p");
}

#[test]
fn test_hash_ignores_config_file() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:1");
    fs::write(&config, "[search\nnot toml").unwrap();

    let (stdout, stderr, ok) = run_mcpm(&config, &["hash", "ab"]);
    assert!(ok, "hash should not read the config: {}", stderr);
    assert_eq!(stdout.trim(), "2e9");

    let (_, _, ok) = run_mcpm(&config, &["stats"]);
    assert!(!ok);
}

#[test]
fn test_scan_local_then_query() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:1");
    let pages = tmp.path().join("pages");

    let (stdout, stderr, ok) = run_mcpm(&config, &["scan", pages.to_str().unwrap(), "--local"]);
    assert!(ok, "scan failed: {}", stderr);
    assert!(stdout.contains("captured:   2"), "got: {}", stdout);
    assert!(stdout.contains("stored:     2"), "got: {}", stdout);
    assert!(stdout.contains("ok"));

    // Second scan captures nothing new.
    let (stdout, _, ok) = run_mcpm(&config, &["scan", pages.to_str().unwrap(), "--local"]);
    assert!(ok);
    assert!(stdout.contains("captured:   0"), "got: {}", stdout);

    let (stdout, _, ok) = run_mcpm(&config, &["search", "--tags", "docker"]);
    assert!(ok);
    assert!(stdout.contains("Deploy with #docker on Fridays"));
    assert!(!stdout.contains("rotate keys"));

    let (stdout, _, ok) = run_mcpm(&config, &["stats"]);
    assert!(ok);
    assert!(stdout.contains("Records:     2"), "got: {}", stdout);

    let (stdout, _, ok) = run_mcpm(&config, &["export"]);
    assert!(ok);
    let exported: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = exported.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["source"]["title"], "chat.md");

    let id = records[0]["id"].as_str().unwrap().to_string();
    let (stdout, _, ok) = run_mcpm(&config, &["get", &id]);
    assert!(ok);
    assert!(stdout.contains(&id));

    let (_, _, ok) = run_mcpm(&config, &["delete", &id]);
    assert!(ok);
    let (_, stderr, ok) = run_mcpm(&config, &["get", &id]);
    assert!(!ok);
    assert!(stderr.contains("not found"), "got: {}", stderr);

    let (stdout, _, ok) = run_mcpm(&config, &["clear"]);
    assert!(ok);
    assert!(stdout.contains("Cleared 1 record(s)"));
}

#[test]
fn test_unreachable_endpoint_keeps_blocks_pending() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:1");
    let page = tmp.path().join("pages/chat.md");

    let (stdout, stderr, ok) = run_mcpm(&config, &["scan", page.to_str().unwrap()]);
    assert!(ok, "scan should not fail on transport errors: {}", stderr);
    assert!(stdout.contains("pending:    2"), "got: {}", stdout);

    let (stdout, _, ok) = run_mcpm(&config, &["pending"]);
    assert!(ok);
    assert!(stdout.contains("2 pending"), "got: {}", stdout);

    let (stdout, _, ok) = run_mcpm(&config, &["resend", "--local"]);
    assert!(ok);
    assert!(stdout.contains("stored:     2"), "got: {}", stdout);
    assert!(stdout.contains("pending:    0"), "got: {}", stdout);

    let (stdout, _, ok) = run_mcpm(&config, &["pending"]);
    assert!(ok);
    assert!(stdout.contains("No pending blocks."));
}

#[test]
fn test_corrupt_store_is_reported() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:1");
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("memories.json"), "{ broken").unwrap();

    let (_, stderr, ok) = run_mcpm(&config, &["stats"]);
    assert!(!ok);
    assert!(stderr.contains("corrupt"), "got: {}", stderr);
    assert_eq!(
        fs::read_to_string(data.join("memories.json")).unwrap(),
        "{ broken"
    );
}
