use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable naming the kubeconfig file in local mode.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Set by the kubelet in every pod; its presence means we run in-cluster.
pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Resolve the kubeconfig file: an explicit, non-empty override wins,
/// otherwise `<home>/.kube/config`.
pub fn kubeconfig_path(env_override: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    match env_override {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => home.map(|h| h.join(".kube").join("config")),
    }
}

/// Whether the process looks like it runs inside a pod.
pub fn running_in_cluster() -> bool {
    std::env::var_os(SERVICE_HOST_ENV).is_some_and(|v| !v.is_empty())
}
