//! HTTP ingestion endpoint.
//!
//! Exposes the Memory Store to scanning agents and dashboards as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`   | `/store` | Store a batch of blocks |
//! | `POST`   | `/check-hashes` | Report which hashes are already stored |
//! | `GET`    | `/memories` | Search records (`search`, `tags`, `since`, `limit`) |
//! | `GET`    | `/memories/{id}` | Fetch one record |
//! | `DELETE` | `/memories/{id}` | Delete one record |
//! | `DELETE` | `/memories` | Delete every record |
//! | `GET`    | `/stats` | Aggregate statistics |
//! | `GET`    | `/health` | Liveness and record count |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid request: blocks must be an array" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; scanning agents run
//! inside arbitrary pages and call the endpoint cross-origin.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use mcp_memory_core::models::{Record, SearchCriteria, StoreStats};
use mcp_memory_core::search::parse_since;

use crate::config::Config;
use crate::ingest::{
    CheckHashesRequest, CheckHashesResponse, IngestService, StoreRequest, StoreResponse,
};
use crate::memory_store::MemoryStore;

/// Shared state handed to every handler.
#[derive(Clone)]
struct AppState {
    ingest: IngestService,
    max_limit: usize,
}

/// Open the configured store and serve until the process is terminated.
///
/// A corrupt store file stops startup here with an error.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::open(config).await?);
    serve(config, store).await
}

/// Serve an already-open store on `[server].bind`.
pub async fn serve(config: &Config, store: Arc<MemoryStore>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(store, config.search.max_limit);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "ingestion endpoint listening");
    println!("Ingestion endpoint listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router; exposed so tests can mount it without binding.
pub fn router(store: Arc<MemoryStore>, max_limit: usize) -> Router {
    let state = AppState {
        ingest: IngestService::new(store),
        max_limit,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/store", post(handle_store))
        .route("/check-hashes", post(handle_check_hashes))
        .route(
            "/memories",
            get(handle_list_memories).delete(handle_clear_memories),
        )
        .route(
            "/memories/{id}",
            get(handle_get_memory).delete(handle_delete_memory),
        )
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

fn json_body(body: Result<Json<serde_json::Value>, JsonRejection>) -> Result<serde_json::Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| bad_request(format!("invalid JSON body: {}", rejection.body_text())))
}

// ============ POST /store ============

async fn handle_store(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<StoreResponse>, AppError> {
    let request =
        StoreRequest::from_json(json_body(body)?).map_err(|e| bad_request(format!("{:#}", e)))?;
    let source = request.metadata.into_source();

    let response = state
        .ingest
        .store_batch(&request.blocks, source)
        .await
        .map_err(internal)?;
    Ok(Json(response))
}

// ============ POST /check-hashes ============

async fn handle_check_hashes(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<CheckHashesResponse>, AppError> {
    let request = CheckHashesRequest::from_json(json_body(body)?)
        .map_err(|e| bad_request(format!("{:#}", e)))?;
    Ok(Json(state.ingest.check_hashes(&request.hashes).await))
}

// ============ GET /memories ============

/// Query string for `GET /memories`. Values arrive as strings so parse
/// failures can be reported in the JSON error format.
#[derive(Debug, Deserialize)]
struct MemoriesQuery {
    search: Option<String>,
    /// Comma-separated tag list.
    tags: Option<String>,
    since: Option<String>,
    limit: Option<String>,
}

#[derive(Serialize)]
struct MemoriesResponse {
    results: Vec<Record>,
    /// Records in the store.
    total: usize,
    /// Records matching the criteria before the limit was applied.
    filtered: usize,
}

fn criteria_from_query(query: MemoriesQuery, max_limit: usize) -> Result<SearchCriteria, AppError> {
    let since = match query.since.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_since(s).map_err(|e| bad_request(e.to_string()))?),
        _ => None,
    };

    let limit = match query.limit.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => {
            let n: usize = s
                .parse()
                .map_err(|_| bad_request(format!("invalid limit: '{}'", s)))?;
            if n == 0 {
                return Err(bad_request("limit must be >= 1"));
            }
            Some(n.min(max_limit))
        }
        _ => None,
    };

    let tags = query
        .tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(SearchCriteria {
        text: query.search,
        tags,
        since,
        limit,
    })
}

async fn handle_list_memories(
    State(state): State<AppState>,
    Query(query): Query<MemoriesQuery>,
) -> Result<Json<MemoriesResponse>, AppError> {
    let criteria = criteria_from_query(query, state.max_limit)?;
    let store = state.ingest.store();
    let outcome = store.search(&criteria).await;
    Ok(Json(MemoriesResponse {
        results: outcome.results,
        total: store.len().await,
        filtered: outcome.filtered,
    }))
}

// ============ GET/DELETE /memories/{id} ============

async fn handle_get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    state
        .ingest
        .store()
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("memory not found: {}", id)))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn handle_delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.ingest.store().delete(&id).await.map_err(internal)?;
    if !deleted {
        return Err(not_found(format!("memory not found: {}", id)));
    }
    tracing::info!(id = %id, "memory deleted");
    Ok(Json(DeleteResponse { deleted }))
}

// ============ DELETE /memories ============

#[derive(Serialize)]
struct ClearResponse {
    cleared: usize,
}

async fn handle_clear_memories(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, AppError> {
    let cleared = state.ingest.store().clear().await.map_err(internal)?;
    tracing::info!(cleared, "memories cleared");
    Ok(Json(ClearResponse { cleared }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.ingest.store().stats().await)
}

// ============ GET /health ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    memory_count: usize,
    timestamp: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        memory_count: state.ingest.store().len().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(search: Option<&str>, tags: Option<&str>, since: Option<&str>, limit: Option<&str>) -> MemoriesQuery {
        MemoriesQuery {
            search: search.map(String::from),
            tags: tags.map(String::from),
            since: since.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_criteria_parsing() {
        let c = criteria_from_query(query(Some("rust"), Some("code, todo,,"), Some("2024-01-01"), Some("5")), 100)
            .ok()
            .unwrap();
        assert_eq!(c.text.as_deref(), Some("rust"));
        assert_eq!(c.tags, vec!["code", "todo"]);
        assert!(c.since.is_some());
        assert_eq!(c.limit, Some(5));
    }

    #[test]
    fn test_limit_clamped_to_max() {
        let c = criteria_from_query(query(None, None, None, Some("5000")), 100)
            .ok()
            .unwrap();
        assert_eq!(c.limit, Some(100));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(criteria_from_query(query(None, None, Some("last week"), None), 100).is_err());
        assert!(criteria_from_query(query(None, None, None, Some("ten")), 100).is_err());
        assert!(criteria_from_query(query(None, None, None, Some("0")), 100).is_err());
    }

    #[test]
    fn test_empty_values_ignored() {
        let c = criteria_from_query(query(Some(""), Some(""), Some(""), Some("")), 100)
            .ok()
            .unwrap();
        assert!(c.tags.is_empty());
        assert!(c.since.is_none());
        assert!(c.limit.is_none());
    }
}
