//! HTTP interface over the two stores and the replicator.
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /api/store` | insert one record into the primary store |
//! | `GET /api/retrieve-primary` | page through the primary store |
//! | `GET /api/retrieve-secondary` | page through the secondary store |
//! | `POST /api/replicate` | copy records into the secondary store |
//! | `GET /health` | reachability of both stores |
//!
//! Error bodies are `{ "error": "..." }`. Store failures are logged in full
//! and answered with a generic message.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::SyncConfig;
use crate::core::page::{Page, PageRequest};
use crate::core::record::Record;
use crate::core::traits::{PrimaryStore, SecondaryStore};
use crate::error::{Result, SyncError};
use crate::pipeline::{ReplicationSource, ReplicationSummary, Replicator};

/// Shared handler state.
pub struct AppState {
    primary: Arc<dyn PrimaryStore>,
    secondary: Arc<dyn SecondaryStore>,
    read_batch_size: usize,
    default_page_size: u32,
    max_page_size: u32,
}

/// HTTP server for the sync service.
pub struct SyncServer {
    state: Arc<AppState>,
}

impl SyncServer {
    pub fn new(
        primary: Arc<dyn PrimaryStore>,
        secondary: Arc<dyn SecondaryStore>,
        sync: &SyncConfig,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                primary,
                secondary,
                read_batch_size: sync.read_batch_size,
                default_page_size: sync.default_page_size,
                max_page_size: sync.max_page_size,
            }),
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health_handler))
            .route("/api/store", post(store_record))
            .route("/api/retrieve-primary", get(retrieve_primary))
            .route("/api/retrieve-secondary", get(retrieve_secondary))
            .route("/api/replicate", post(replicate))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled, then drain in-flight requests.
    pub async fn run(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Sync server listening on {}", addr);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("Sync server stopped");
        Ok(())
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReplicationSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreHealth {
    pub r#type: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub primary: StoreHealth,
    pub secondary: StoreHealth,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    #[serde(rename = "pageSize")]
    page_size: Option<i64>,
    search: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_of(e: &SyncError) -> StatusCode {
    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Log a failure and convert it to a response that leaks no store detail.
fn error_response(e: SyncError, fallback: &str) -> ApiError {
    if e.is_client_error() {
        info!("{}: {}", fallback, e);
    } else {
        error!("{}: {}", fallback, e.format_detailed());
    }
    (
        status_of(&e),
        Json(ErrorResponse {
            error: e.public_message(fallback),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl AppState {
    fn page_request(
        &self,
        query: std::result::Result<Query<PageQuery>, QueryRejection>,
    ) -> std::result::Result<PageRequest, ApiError> {
        let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
        PageRequest::from_query(
            query.page,
            query.page_size,
            query.search.as_deref(),
            self.default_page_size,
            self.max_page_size,
        )
        .map_err(|e| error_response(e, "Invalid paging parameters"))
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (primary, secondary) = tokio::join!(
        state.primary.test_connection(),
        state.secondary.test_connection()
    );
    let primary = StoreHealth {
        r#type: state.primary.db_type().to_string(),
        ok: primary.is_ok(),
        error: primary.err().map(|e| e.public_message("unreachable")),
    };
    let secondary = StoreHealth {
        r#type: state.secondary.db_type().to_string(),
        ok: secondary.is_ok(),
        error: secondary.err().map(|e| e.public_message("unreachable")),
    };
    let healthy = primary.ok && secondary.ok;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            healthy,
            primary,
            secondary,
        }),
    )
}

async fn store_record(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Record>, JsonRejection>,
) -> std::result::Result<Json<MessageResponse>, ApiError> {
    let Json(record) = body.map_err(|e| bad_request(e.body_text()))?;
    record
        .validate()
        .map_err(|e| error_response(e, "Invalid record"))?;

    state
        .primary
        .insert(&record)
        .await
        .map_err(|e| error_response(e, "Failed to store record in primary store"))?;

    Ok(Json(MessageResponse {
        message: format!(
            "Record {} stored in primary store successfully",
            record.primary_key
        ),
    }))
}

async fn retrieve_primary(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> std::result::Result<Json<Page>, ApiError> {
    let request = state.page_request(query)?;
    let page = state
        .primary
        .list(&request)
        .await
        .map_err(|e| error_response(e, "Failed to retrieve data from primary store"))?;
    Ok(Json(page))
}

async fn retrieve_secondary(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> std::result::Result<Json<Page>, ApiError> {
    let request = state.page_request(query)?;
    let page = state
        .secondary
        .list(&request)
        .await
        .map_err(|e| error_response(e, "Failed to retrieve data from secondary store"))?;
    Ok(Json(page))
}

/// Empty body: replicate every primary record, or one primary page when
/// `page`/`pageSize` are given. JSON array body: replicate those records.
async fn replicate(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
    body: Bytes,
) -> (StatusCode, Json<ReplicateResponse>) {
    match replicate_inner(&state, query, body).await {
        Ok(summary) if summary.is_success() => (
            StatusCode::OK,
            Json(ReplicateResponse {
                message: Some(format!(
                    "Replicated {} records to secondary store",
                    summary.succeeded
                )),
                error: None,
                summary: Some(summary),
            }),
        ),
        Ok(mut summary) => {
            error!(
                "Replication {} stopped: {}",
                summary.run_id,
                summary.error.as_deref().unwrap_or("unknown error")
            );
            let error = match summary.failed_primary_key {
                Some(pk) => format!(
                    "Replication stopped at primary key {} after {} record(s)",
                    pk, summary.succeeded
                ),
                None => "Replication failed".to_string(),
            };
            summary.error = Some(error.clone());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReplicateResponse {
                    message: None,
                    error: Some(error),
                    summary: Some(summary),
                }),
            )
        }
        Err((status, Json(body))) => (
            status,
            Json(ReplicateResponse {
                message: None,
                error: Some(body.error),
                summary: None,
            }),
        ),
    }
}

async fn replicate_inner(
    state: &AppState,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
    body: Bytes,
) -> std::result::Result<ReplicationSummary, ApiError> {
    let source = if !body.iter().all(u8::is_ascii_whitespace) {
        let records: Vec<Record> = serde_json::from_slice(&body)
            .map_err(|e| bad_request(format!("Invalid record list: {}", e)))?;
        ReplicationSource::Records(records)
    } else {
        let Query(params) = query
            .as_ref()
            .map_err(|e| bad_request(e.body_text()))?;
        if params.page.is_some() || params.page_size.is_some() {
            ReplicationSource::Page(state.page_request(query)?)
        } else {
            ReplicationSource::All
        }
    };

    // One replicator per request keeps phase updates of concurrent runs apart.
    Replicator::new(state.primary.clone(), state.secondary.clone())
        .with_read_batch_size(state.read_batch_size)
        .replicate(source)
        .await
        .map_err(|e| error_response(e, "Failed to replicate data to secondary store"))
}
