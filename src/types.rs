use crate::error::GatewayError;
use serde::Serialize;

/// One entry of the `/api/pods` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub containers: Vec<String>,
}

/// Pod/container pair addressed by `/api/logs/{pod}/{container}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub pod_name: String,
    pub container_name: String,
}

impl LogRequest {
    /// Parse the part of the path that follows `/api/logs/`.
    ///
    /// Exactly two non-empty segments are accepted; anything else is a
    /// malformed request.
    pub fn from_path(path: &str) -> Result<Self, GatewayError> {
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [pod, container] if !pod.is_empty() && !container.is_empty() => Ok(Self {
                pod_name: pod.to_string(),
                container_name: container.to_string(),
            }),
            _ => Err(GatewayError::MalformedLogPath(path.to_string())),
        }
    }
}

impl std::fmt::Display for LogRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pod_name, self.container_name)
    }
}

/// Where the gateway runs, which decides both credentials and transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Service-account credentials, TLS listener.
    InCluster,
    /// Kubeconfig credentials, plaintext listener with CORS.
    Local,
}

impl Mode {
    pub fn default_port(self) -> u16 {
        match self {
            Mode::InCluster => 9443,
            Mode::Local => 9002,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::InCluster => f.write_str("in-cluster"),
            Mode::Local => f.write_str("local"),
        }
    }
}
