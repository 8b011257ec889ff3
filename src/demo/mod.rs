//! # Password Demo
//!
//! A tiny workload that mounts a secret and serves its `password` file, used to
//! watch a rotation propagate end to end.
//!
//! Provides endpoints:
//! - `/` - HTML page showing the mounted password
//! - `/metrics` - `password_access_total{status="success"|"error"}`

use crate::observability::metrics::encode;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use prometheus::{IntCounterVec, Opts, Registry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

/// Shown instead of the password when the file cannot be read
pub const READ_FAILURE_MESSAGE: &str = "❌ Failed to read secret";

pub struct DemoState {
    secret_path: PathBuf,
    registry: Registry,
    access_total: IntCounterVec,
}

impl std::fmt::Debug for DemoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoState")
            .field("secret_path", &self.secret_path)
            .finish_non_exhaustive()
    }
}

impl DemoState {
    /// # Errors
    ///
    /// Fails if the access counter cannot be registered.
    pub fn new(secret_path: impl Into<PathBuf>) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let access_total = IntCounterVec::new(
            Opts::new(
                "password_access_total",
                "Total number of times the secret password is accessed",
            ),
            &["status"],
        )?;
        registry.register(Box::new(access_total.clone()))?;

        Ok(Self {
            secret_path: secret_path.into(),
            registry,
            access_total,
        })
    }

    /// Number of accesses recorded with `status`
    #[must_use]
    pub fn accesses(&self, status: &str) -> u64 {
        self.access_total.with_label_values(&[status]).get()
    }

    async fn read_password(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.secret_path).await {
            Ok(password) => {
                self.access_total.with_label_values(&[STATUS_SUCCESS]).inc();
                Some(password)
            }
            Err(e) => {
                warn!(path = %self.secret_path.display(), error = %e, "failed to read secret file");
                self.access_total.with_label_values(&[STATUS_ERROR]).inc();
                None
            }
        }
    }
}

pub fn router(state: Arc<DemoState>) -> Router {
    Router::new()
        .route("/", get(password_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve the demo until the process exits
///
/// # Errors
///
/// Fails if the address cannot be bound or the server stops with an error.
pub async fn serve(addr: SocketAddr, state: Arc<DemoState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("🌍 Server running on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn password_handler(State(state): State<Arc<DemoState>>) -> Html<String> {
    let shown = match state.read_password().await {
        Some(password) => html_escape(&password),
        None => READ_FAILURE_MESSAGE.to_string(),
    };
    Html(format!("<h1>🔑 Secret Password:</h1><h2>{shown}</h2>"))
}

async fn metrics_handler(State(state): State<Arc<DemoState>>) -> impl IntoResponse {
    match encode(&state.registry) {
        Ok((content_type, body)) => (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                format!("Failed to encode metrics: {e}").into_bytes(),
            )
        }
    }
}

fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
