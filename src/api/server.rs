//! HTTP server implementation for the task API.
//!
//! This module provides the axum-based HTTP server exposing the task
//! collection as a REST resource.

use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{ListParams, NewTask, Stats, Task, TaskFilter, TaskPatch};

/// Server state shared across handlers.
#[derive(Clone)]
pub struct ApiServer {
    /// Reference to the task database.
    db: Arc<Database>,
}

impl ApiServer {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/tasks
async fn create_task(
    State(state): State<ApiServer>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(input) = body.map_err(|e| ApiError::malformed(e.body_text()))?;
    let task = state.db().create_task(input)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks
async fn list_tasks(
    State(state): State<ApiServer>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Task>>> {
    let Query(params) = params.map_err(|e| ApiError::malformed(e.body_text()))?;
    let filter = TaskFilter::from(params);
    let tasks = state.db().list_tasks(&filter)?;
    Ok(Json(tasks))
}

/// GET /api/tasks/stats
async fn task_stats(State(state): State<ApiServer>) -> ApiResult<Json<Stats>> {
    Ok(Json(state.db().get_stats()?))
}

/// GET /api/tasks/{id}
async fn get_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .db()
        .get_task(&task_id)?
        .map(Json)
        .ok_or_else(|| ApiError::task_not_found(&task_id))
}

/// PUT /api/tasks/{id}
async fn update_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Json(patch) = body.map_err(|e| ApiError::malformed(e.body_text()))?;
    let task = state.db().update_task(&task_id, &patch)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/{id}
async fn delete_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state.db().delete_task(&task_id)?;
    Ok(Json(task))
}

/// Build the router with all routes.
pub fn build_router(db: Arc<Database>) -> Router {
    // Browser clients are served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/stats", get(task_stats))
        .route(
            "/api/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ApiServer::new(db))
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the task collection, e.g. `http://127.0.0.1:3500/api/tasks`.
    pub fn tasks_url(&self) -> String {
        format!("http://{}/api/tasks", self.addr)
    }

    /// Signal shutdown and wait for in-flight requests to drain.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

/// Bind and start serving in the background.
///
/// Port 0 binds an ephemeral port; the actual address is on the handle.
pub async fn start_server(db: Arc<Database>, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
    let app = build_router(db);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task API shutting down");
            })
            .await
        {
            tracing::error!("Task API server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: bound_addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }
}
