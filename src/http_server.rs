// HTTP server for the legacy v2 surface
// Every v2 route answers with exactly one legacy envelope and HTTP 200;
// success or failure is carried by the envelope's `result` flag.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::GatewayConfig,
    form::LegacyForm,
    http_types::LegacyEnvelope,
    legacy_service::{LegacyHostService, LegacyOperation},
    observability::{request_counts, with_request_id, RequestCounts},
    request_context::RequestContext,
    v3_client::{HttpV3Client, V3Client},
};

// Global server start time for uptime tracking
static SERVER_START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    service: LegacyHostService,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub requests: RequestCounts,
}

/// Create HTTP server with all legacy routes configured
pub fn create_server(client: Arc<dyn V3Client>) -> Router {
    let state = AppState {
        service: LegacyHostService::new(client),
    };

    Router::new()
        .route("/health", get(health_check))
        .route(
            LegacyOperation::IpAndProxyByCompany.path(),
            get(ip_and_proxy_by_company).post(ip_and_proxy_by_company),
        )
        .route(
            LegacyOperation::HostListByIp.path(),
            get(host_list_by_ip).post(host_list_by_ip),
        )
        .route(
            LegacyOperation::SetHostList.path(),
            get(set_host_list).post(set_host_list),
        )
        .route(
            LegacyOperation::ModuleHostList.path(),
            get(module_host_list).post(module_host_list),
        )
        .route(
            LegacyOperation::AppHostList.path(),
            get(app_host_list).post(app_host_list),
        )
        .route(
            LegacyOperation::HostsByProperty.path(),
            get(hosts_by_property).post(hosts_by_property),
        )
        .route(
            LegacyOperation::ModulesByApp.path(),
            get(modules_by_app).post(modules_by_app),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Start the HTTP server using `config`
pub async fn start_server(config: &GatewayConfig) -> Result<()> {
    let client = HttpV3Client::new(&config.upstream_url()?, config.upstream.request_timeout)?;
    let app = create_server(Arc::new(client));
    let listener =
        TcpListener::bind(&format!("{}:{}", config.server.host, config.server.port)).await?;

    Lazy::force(&SERVER_START_TIME);
    info!(
        upstream = %config.upstream.base_url,
        "v2 gateway starting on {}:{}", config.server.host, config.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: SERVER_START_TIME.elapsed().as_secs(),
        requests: request_counts(),
    })
}

/// Parse, run and emit one legacy request
///
/// This is the only place envelopes are produced, so every path through a
/// pipeline, early rejections included, ends in exactly one response.
async fn serve_legacy(
    operation: LegacyOperation,
    state: AppState,
    headers: HeaderMap,
    query: Option<String>,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    let ctx = RequestContext::from_headers(&headers);

    let outcome = with_request_id(operation.name(), &ctx.request_id, async {
        let form = LegacyForm::from_parts(&headers, query.as_deref(), &body)?;
        state.service.execute(operation, &ctx, &form).await
    })
    .await;

    Json(match outcome {
        Ok(data) => LegacyEnvelope::success(data),
        Err(e) => LegacyEnvelope::from_error(&e, ctx.language),
    })
}

async fn ip_and_proxy_by_company(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::IpAndProxyByCompany, state, headers, query, body).await
}

async fn host_list_by_ip(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::HostListByIp, state, headers, query, body).await
}

async fn set_host_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::SetHostList, state, headers, query, body).await
}

async fn module_host_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::ModuleHostList, state, headers, query, body).await
}

async fn app_host_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::AppHostList, state, headers, query, body).await
}

async fn hosts_by_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::HostsByProperty, state, headers, query, body).await
}

async fn modules_by_app(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LegacyEnvelope> {
    serve_legacy(LegacyOperation::ModulesByApp, state, headers, query, body).await
}
