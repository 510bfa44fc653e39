//! HTTP server for the catalog relay API.
//!
//! # API Endpoints
//!
//! | Method | Path                         | Auth  | Description                    |
//! |--------|------------------------------|-------|--------------------------------|
//! | GET    | `/`, `/health`               | none  | Health check                   |
//! | POST   | `/api/integrate_products[/]` | Basic | Upload a catalog CSV and relay |
//! | GET    | `/api/logs`                  | Basic | SSE stream of pipeline progress|

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, Method},
    middleware,
    response::{sse::Event, sse::KeepAlive, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

use super::auth::{require_basic_auth, BasicAuthState};
use super::logs::{log_info, LOG_BROADCASTER};
use super::types::ApiError;
use crate::config::Settings;
use crate::dispatch::{Dispatcher, EnvCredentials};
use crate::models::IntegrationReport;
use crate::transform::pipeline::{integrate_bytes, PipelineOptions};

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub options: PipelineOptions,
}

/// Assemble the router. Auth applies to the integration and log routes only.
pub fn build_app(state: AppState, auth: BasicAuthState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_TYPE]);

    let protected = Router::new()
        .route("/api/integrate_products", post(integrate_products))
        .route("/api/integrate_products/", post(integrate_products))
        .route("/api/logs", get(sse_logs))
        .route_layer(middleware::from_fn_with_state(auth, require_basic_auth));

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and run until ctrl-c / SIGTERM.
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let auth = BasicAuthState::new(settings.require_basic_auth()?.clone());
    let dispatcher = Dispatcher::new(settings.dispatch_settings()?, Arc::new(EnvCredentials));

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        options: PipelineOptions {
            delimiter: settings.csv_delimiter,
        },
    };
    let app = build_app(state, auth, settings.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "catalog relay listening");
    tracing::info!("POST /api/integrate_products - upload catalog CSV");
    tracing::info!("GET  /api/logs - SSE progress stream");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "catalog-relay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time progress
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip the dropped entries.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: run the whole pipeline for one multipart file.
async fn integrate_products(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IntegrationReport>, ApiError> {
    let upload_id = Uuid::new_v4();
    let span = tracing::info_span!("upload", upload_id = %upload_id);

    async move {
        let multipart = multipart.map_err(|e| {
            tracing::warn!(error = %e, "request is not a multipart upload");
            ApiError::UnreadableFile
        })?;
        let (file_name, bytes) = read_file_field(multipart).await?;

        tracing::info!(file = file_name.as_deref().unwrap_or("unknown"), bytes = bytes.len(), "upload received");
        log_info(format!(
            "New upload: {} ({} bytes)",
            file_name.as_deref().unwrap_or("unknown"),
            bytes.len()
        ));

        let report = integrate_bytes(&bytes, &state.options, &state.dispatcher).await?;

        tracing::info!(
            shops = report.detail.failed.len(),
            failed = report.failure_count(),
            "upload integrated"
        );
        Ok(Json(report))
    }
    .instrument(span)
    .await
}

/// Read the first `file` part. Other parts are ignored.
async fn read_file_field(
    mut multipart: Multipart,
) -> Result<(Option<String>, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "malformed multipart body");
        ApiError::UnreadableFile
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "could not read file part");
            ApiError::UnreadableFile
        })?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(ApiError::UnreadableFile)
}
