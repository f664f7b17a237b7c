use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use tracing::{error, warn};

/// Errors a request handler can surface to the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid request")]
    MalformedLogPath(String),

    #[error("{0}")]
    Kube(#[from] kube::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read manifest file {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedLogPath(_) => StatusCode::BAD_REQUEST,
            // Not-found from the API server is deliberately not mapped to 404.
            GatewayError::Kube(_) | GatewayError::Io(_) | GatewayError::Manifest { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            GatewayError::MalformedLogPath(path) => {
                warn!("Rejecting malformed log path '{}'", path);
            }
            other => error!("Request failed: {}", other),
        }
        (status, self.to_string()).into_response()
    }
}
