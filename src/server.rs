use crate::error::{GatewayError, Result};
use crate::kubernetes::{PodApi, list_pod_summaries};
use crate::relay::Relay;
use crate::types::{LogRequest, PodSummary};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const HEALTH_RESPONSE: &str = "health check worked!\n";

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Per-process settings the handlers read.
#[derive(Debug)]
pub struct Settings {
    pub namespace: String,
    pub manifest_path: PathBuf,
    pub static_root: PathBuf,
}

/// Shared handler state: the cluster handle plus read-only settings.
#[derive(Clone)]
pub struct AppState<C> {
    pub cluster: C,
    pub settings: Arc<Settings>,
}

impl<C: PodApi> AppState<C> {
    pub fn new(cluster: C, settings: Settings) -> Self {
        Self {
            cluster,
            settings: Arc::new(settings),
        }
    }
}

/// How the listener is exposed.
#[derive(Debug)]
pub enum Transport {
    /// HTTPS with a PEM certificate/key pair.
    Tls { cert: PathBuf, key: PathBuf },
    /// Plain HTTP, with CORS allowing a single origin.
    Plain { allowed_origin: HeaderValue },
}

pub fn router<C: PodApi>(state: AppState<C>) -> Router {
    let assets = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .service(ServeDir::new(&state.settings.static_root));

    Router::new()
        .route("/example", get(health))
        .route("/plugin-manifest.json", get(manifest::<C>))
        .route("/api/pods", get(list_pods::<C>))
        .route("/api/pods/", get(list_pods::<C>))
        .route("/api/logs", get(missing_log_target))
        .route("/api/logs/", get(missing_log_target))
        .route("/api/logs/{*target}", get(pod_logs::<C>))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    info!("health check worked!");
    HEALTH_RESPONSE
}

async fn manifest<C: PodApi>(State(state): State<AppState<C>>) -> Result<Response> {
    let path = &state.settings.manifest_path;
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| GatewayError::Manifest {
            path: path.clone(),
            source,
        })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], data).into_response())
}

async fn list_pods<C: PodApi>(State(state): State<AppState<C>>) -> Result<Json<Vec<PodSummary>>> {
    let pods = list_pod_summaries(&state.cluster, &state.settings.namespace).await?;
    Ok(Json(pods))
}

async fn missing_log_target() -> GatewayError {
    GatewayError::MalformedLogPath(String::new())
}

async fn pod_logs<C: PodApi>(
    State(state): State<AppState<C>>,
    Path(target): Path<String>,
) -> Result<Response> {
    let request = LogRequest::from_path(&target)?;
    info!(
        "Streaming logs for {} in namespace {}",
        request, state.settings.namespace
    );
    let upstream = state
        .cluster
        .open_log_stream(&state.settings.namespace, &request)
        .await?;
    let relay = Relay::start(request, upstream).await?;
    Ok(Body::from_stream(relay).into_response())
}

fn cors(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Serve `app` on `addr` until the listener fails.
pub async fn serve(app: Router, addr: SocketAddr, transport: Transport) -> anyhow::Result<()> {
    match transport {
        Transport::Tls { cert, key } => {
            let config = RustlsConfig::from_pem_file(&cert, &key).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to load TLS certificate {} / key {}: {}",
                    cert.display(),
                    key.display(),
                    e
                )
            })?;
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| anyhow::anyhow!("Server on {} failed: {}", addr, e))?;
        }
        Transport::Plain { allowed_origin } => {
            let app = app.layer(cors(allowed_origin));
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
            info!("Starting server on http://{}", addr);
            axum::serve(listener, app)
                .await
                .map_err(|e| anyhow::anyhow!("Server on {} failed: {}", addr, e))?;
        }
    }
    Ok(())
}
