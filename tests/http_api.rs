//! End-to-end tests for the HTTP API: a real server on a free port, a
//! temporary store file, and reqwest as the producer.

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use mcp_memory::config::{parse_config, Config};
use mcp_memory::memory_store::MemoryStore;
use mcp_memory::server::serve;
use mcp_memory_core::hash::content_hash;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let content = format!(
        r#"[store]
path = "{}/data/memories.json"

[server]
bind = "127.0.0.1:{}"

[search]
default_limit = 50
max_limit = 100
"#,
        tmp.path().display(),
        port
    );
    parse_config(&content).unwrap()
}

async fn start_server(tmp: &TempDir) -> (String, Arc<MemoryStore>) {
    let port = find_free_port();
    let cfg = test_config(tmp, port);
    let store = Arc::new(MemoryStore::open(&cfg).await.unwrap());
    let server_store = store.clone();
    tokio::spawn(async move {
        serve(&cfg, server_store).await.ok();
    });
    wait_for_server(port).await;
    (format!("http://127.0.0.1:{}", port), store)
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health_reports_count() {
    let tmp = TempDir::new().unwrap();
    let (base, _store) = start_server(&tmp).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["memoryCount"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_store_then_resubmit_reports_duplicates() {
    let tmp = TempDir::new().unwrap();
    let (base, store) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let batch = json!({
        "blocks": [
            {"content": "Remember #rust uses ownership"},
            {"content": "TODO: visit https://example.com"}
        ],
        "metadata": {"url": "https://chat.example.com/c/1", "title": "Chat"}
    });

    let (status, first) = post(&client, format!("{}/store", base), batch.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(first["stored"], 2);
    assert_eq!(first["duplicates"], 0);
    assert_eq!(first["totalRecords"], 2);
    assert_eq!(first["entries"].as_array().unwrap().len(), 2);

    let (status, second) = post(&client, format!("{}/store", base), batch).await;
    assert_eq!(status, 200);
    assert_eq!(second["stored"], 0);
    assert_eq!(second["duplicates"], 2);
    assert_eq!(second["totalRecords"], 2);
    assert_eq!(second["duplicateDetails"].as_array().unwrap().len(), 2);

    // Persisted before the response was sent.
    let on_disk: Value = serde_json::from_str(
        &std::fs::read_to_string(tmp.path().join("data/memories.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk.as_array().unwrap().len(), 2);
    assert_eq!(store.len().await, 2);

    let listed: Value = reqwest::get(format!("{}/memories?tags=rust", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["total"], 2);
    assert_eq!(listed["filtered"], 1);
    let record = &listed["results"][0];
    assert_eq!(record["content"], "Remember #rust uses ownership");
    assert_eq!(record["source"]["title"], "Chat");
    assert_eq!(record["contentHash"], content_hash("Remember #rust uses ownership"));
}

#[tokio::test]
async fn test_store_rejects_malformed_bodies() {
    let tmp = TempDir::new().unwrap();
    let (base, store) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = post(&client, format!("{}/store", base), json!({"blocks": "nope"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = post(&client, format!("{}/store", base), json!({})).await;
    assert_eq!(status, 400);

    let resp = client
        .post(format!("{}/store", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_empty_blocks_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let (base, _store) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        format!("{}/store", base),
        json!({"blocks": [{"content": "   "}, {"content": "kept"}]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["stored"], 1);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["details"][0]["status"], "skipped");
    assert_eq!(body["details"][1]["status"], "stored");
}

#[tokio::test]
async fn test_check_hashes() {
    let tmp = TempDir::new().unwrap();
    let (base, _store) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    post(
        &client,
        format!("{}/store", base),
        json!({"blocks": [{"content": "known block"}]}),
    )
    .await;

    let known = content_hash("known block");
    let (status, body) = post(
        &client,
        format!("{}/check-hashes", base),
        json!({"hashes": [known.clone(), "zzzz"]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["hashStatus"][&known], true);
    assert_eq!(body["hashStatus"]["zzzz"], false);
    assert_eq!(body["summary"]["total"], 2);
    assert_eq!(body["summary"]["existing"], 1);
    assert_eq!(body["summary"]["new"], 1);

    let (status, _) = post(&client, format!("{}/check-hashes", base), json!({"hashes": 3})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_get_delete_clear_and_stats() {
    let tmp = TempDir::new().unwrap();
    let (base, _store) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (_, stored) = post(
        &client,
        format!("{}/store", base),
        json!({"blocks": [{"content": "one two three"}, {"content": "four five"}]}),
    )
    .await;
    let id = stored["entries"][0]["id"].as_str().unwrap().to_string();

    let resp = client.get(format!("{}/memories/{}", base, id)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["wordCount"], 3);

    let stats: Value = client
        .get(format!("{}/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalRecords"], 2);
    assert_eq!(stats["totalWords"], 5);

    let resp = client.delete(format!("{}/memories/{}", base, id)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client.delete(format!("{}/memories/{}", base, id)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client.get(format!("{}/memories/missing", base)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let cleared: Value = client
        .delete(format!("{}/memories", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["cleared"], 1);

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["memoryCount"], 0);
}

#[tokio::test]
async fn test_memories_query_validation() {
    let tmp = TempDir::new().unwrap();
    let (base, _store) = start_server(&tmp).await;

    let resp = reqwest::get(format!("{}/memories?limit=0", base)).await.unwrap();
    assert_eq!(resp.status(), 400);
    let resp = reqwest::get(format!("{}/memories?limit=abc", base)).await.unwrap();
    assert_eq!(resp.status(), 400);
    let resp = reqwest::get(format!("{}/memories?since=garbage", base)).await.unwrap();
    assert_eq!(resp.status(), 400);
    let resp = reqwest::get(format!("{}/memories?since=2020-01-01", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
}
