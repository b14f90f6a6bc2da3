//! HTTP server mode for triggering sync jobs
//!
//! Jobs for the same tenant never overlap: every job, scheduled or requested,
//! holds that tenant's lock while it runs.

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bookkeeping::Bookkeeper;
use crate::config::{Settings, StoreConfig};
use crate::engine::{run_job, JobFailure, JobParams, JobResult};
use crate::error::{Error, FailureKind, Result};
use crate::registry;
use crate::store::Store;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Source, store and sync settings
    pub settings: Settings,
    /// Store shared by every job; opened from settings when `None`
    pub store: Option<Arc<dyn Store>>,
    /// Recurring job, if any
    pub schedule: Option<Schedule>,
}

/// A job repeated on a fixed period
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Period between job starts
    pub every: Duration,
    /// What to sync
    pub params: JobParams,
}

/// One async lock per tenant. An entry lives only while some job holds or
/// awaits it.
#[derive(Debug, Default)]
struct TenantLocks(Mutex<HashMap<String, Arc<Mutex<()>>>>);

impl TenantLocks {
    async fn for_tenant(&self, tenant: &str) -> Arc<Mutex<()>> {
        self.0
            .lock()
            .await
            .entry(tenant.to_string())
            .or_default()
            .clone()
    }

    /// Drop the tenant's entry once no job references it
    async fn release(&self, tenant: &str) {
        let mut locks = self.0.lock().await;
        if locks
            .get(tenant)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(tenant);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}

/// App state shared across handlers
#[derive(Debug)]
struct AppState {
    settings: Settings,
    store: Option<Arc<dyn Store>>,
    locks: TenantLocks,
}

impl AppState {
    fn new(settings: Settings, store: Option<Arc<dyn Store>>) -> Arc<Self> {
        Arc::new(Self {
            settings,
            store,
            locks: TenantLocks::default(),
        })
    }

    /// Store for a request: a user session when a bearer token is given to
    /// a REST store, the shared store otherwise
    fn request_store(&self, headers: &HeaderMap) -> Result<Option<Arc<dyn Store>>> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match (token, &self.settings.store) {
            (Some(token), StoreConfig::Rest { .. }) => {
                Ok(Some(self.settings.store.open(Some(token))?))
            }
            _ => Ok(self.store.clone()),
        }
    }

    /// Run one job under the tenant's lock
    async fn run_locked(
        &self,
        params: &JobParams,
        store: Option<Arc<dyn Store>>,
    ) -> std::result::Result<JobResult, JobFailure> {
        let outcome = {
            let lock = self.locks.for_tenant(&params.tenant_id).await;
            let _guard = lock.lock().await;
            run_job(&self.settings, params, store).await
        };
        self.locks.release(&params.tenant_id).await;
        outcome
    }
}

/// Query string of `GET /sync/status`
#[derive(Debug, Deserialize)]
struct StatusQuery {
    tenant: String,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// HTTP status for a job-fatal failure
fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Credentials => StatusCode::BAD_REQUEST,
        FailureKind::Permission => StatusCode::FORBIDDEN,
        FailureKind::SourceAccess | FailureKind::Store => StatusCode::BAD_GATEWAY,
        FailureKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the router over a configuration. The schedule is not started.
pub fn router(config: ServerConfig) -> Router {
    routes(AppState::new(config.settings, config.store))
}

fn routes(state: Arc<AppState>) -> Router {
    // Build CORS layer - allow all origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/tables", get(list_tables))
        .route("/sync", post(sync))
        .route("/sync/status", get(sync_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server, and the scheduled job when configured
pub async fn serve(config: ServerConfig, port: u16) -> Result<()> {
    let store = match config.store {
        Some(store) => Some(store),
        None if config.settings.store.validate().is_ok() => {
            Some(config.settings.store.open(None)?)
        }
        None => None,
    };
    let state = AppState::new(config.settings, store);

    if let Some(schedule) = config.schedule {
        info!(
            tenant = %schedule.params.tenant_id,
            every_secs = schedule.every.as_secs(),
            "Scheduling sync job"
        );
        tokio::spawn(run_schedule(state.clone(), schedule));
    }

    let app = routes(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

async fn run_schedule(state: Arc<AppState>, schedule: Schedule) {
    let mut ticker = tokio::time::interval(schedule.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let tenant = schedule.params.tenant_id.as_str();
        match state.run_locked(&schedule.params, state.store.clone()).await {
            Ok(result) => info!(
                tenant,
                success = result.success,
                rows = result.rows_processed(),
                "Scheduled sync finished"
            ),
            Err(failure) => warn!(
                tenant,
                kind = ?failure.kind,
                error = %failure.error,
                "Scheduled sync failed"
            ),
        }
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// List registered tables
async fn list_tables() -> impl IntoResponse {
    Json(ApiResponse::success(json!({
        "type": "TABLES",
        "tables": registry::describe()
    })))
}

/// Run one job and return its result
async fn sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(params): Json<JobParams>,
) -> Response {
    let outcome = match state.request_store(&headers) {
        Ok(store) => state.run_locked(&params, store).await,
        Err(e) => Err(JobFailure::from(e)),
    };
    match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(failure) => (status_for(failure.kind), Json(failure)).into_response(),
    }
}

/// Last successful sync of a tenant
async fn sync_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Response {
    let lookup = async {
        let store = match state.request_store(&headers)? {
            Some(store) => store,
            None => state.settings.store.open(None)?,
        };
        Bookkeeper::new(store.as_ref(), state.settings.sync.bookkeeping)
            .last_sync(&query.tenant)
            .await
    };

    match lookup.await {
        Ok(last) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "tenantId": query.tenant,
                "lastSyncedAt": last.map(|t| t.to_rfc3339())
            }))),
        )
            .into_response(),
        Err(e) => (
            status_for(e.failure_kind()),
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response(),
    }
}
