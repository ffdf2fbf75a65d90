//! HTTP surface of the exporter: pool construction, server-version
//! detection and the axum router serving `/metrics` and `/health`.

use crate::collectors::config::CollectorConfig;
use crate::collectors::registry::CollectorRegistry;
use crate::collectors::util;
use anyhow::{Context, Result};
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use secrecy::{ExposeSecret, SecretString};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use url::Url;

struct AppState {
    pool: MySqlPool,
    registry: CollectorRegistry,
}

#[derive(Clone, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = ulid::Ulid::new().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Connect to the server, detect its version, build the collector registry
/// and serve `/metrics` and `/health` until the task is aborted.
///
/// # Errors
///
/// Returns an error if the database connection, the version detection or the
/// listener bind fails.
pub async fn new(
    port: u16,
    listen: Option<String>,
    dsn: SecretString,
    collectors: Vec<String>,
) -> Result<()> {
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(dsn.expose_secret())
        .await
        .context("failed to connect to MySQL")?;

    if let Ok(url) = Url::parse(dsn.expose_secret()) {
        info!(
            host = url.host_str().unwrap_or("localhost"),
            port = url.port().unwrap_or(3306),
            "connected to MySQL"
        );
    }

    let version_string = sqlx::query_scalar::<_, String>("SELECT VERSION()")
        .fetch_one(&pool)
        .await
        .context("failed to detect server version")?;
    util::set_server_version(util::parse_server_version(&version_string));
    info!(version = %version_string, "detected server version");

    let config = CollectorConfig::new().with_enabled(&collectors);
    let registry = CollectorRegistry::new(&config);
    info!(collectors = ?registry.collector_names(), "enabled collectors");

    let state = Arc::new(AppState { pool, registry });

    let app = Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUlid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::SERVER,
                    HeaderValue::from_static("mysql_exporter"),
                )),
        )
        .with_state(state);

    let listener = bind(port, listen).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn bind(port: u16, listen: Option<String>) -> Result<tokio::net::TcpListener> {
    match listen {
        Some(host) => {
            let addr = if host.contains(':') && !host.starts_with('[') {
                format!("[{host}]:{port}")
            } else {
                format!("{host}:{port}")
            };
            tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))
        }
        None => match tokio::net::TcpListener::bind(format!("[::]:{port}")).await {
            Ok(listener) => Ok(listener),
            Err(e) => {
                debug!(error = %e, "IPv6 bind failed; falling back to IPv4");
                tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
                    .await
                    .with_context(|| format!("failed to bind 0.0.0.0:{port}"))
            }
        },
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.registry.collect_all(&state.pool).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "encoding failure").into_response()
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ok", "database": "up"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "degraded", "database": "down"})),
            )
                .into_response()
        }
    }
}
