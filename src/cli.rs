use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::types::Mode;

#[derive(Parser)]
#[command(name = "pod-log-gateway")]
#[command(about = "Console plugin backend: list pods and stream container logs")]
pub struct Cli {
    /// Deployment mode; `auto` picks in-cluster when running inside a pod
    #[arg(long, env = "GATEWAY_MODE", value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Namespace whose pods are exposed
    #[arg(short = 'n', long, env = "GATEWAY_NAMESPACE", default_value = "cnf-certsuite-operator")]
    pub namespace: String,

    /// Listening port (9443 in-cluster, 9002 local)
    #[arg(short, long, env = "GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Directory with the plugin's static assets
    #[arg(long, env = "GATEWAY_STATIC_ROOT", default_value = "/opt/app-root/web/dist")]
    pub static_root: PathBuf,

    /// Plugin manifest served at /plugin-manifest.json
    #[arg(
        long,
        env = "GATEWAY_MANIFEST",
        default_value = "/opt/app-root/web/dist/plugin-manifest.json"
    )]
    pub manifest: PathBuf,

    /// TLS certificate (in-cluster mode)
    #[arg(long, env = "GATEWAY_TLS_CERT", default_value = "/var/cert/tls.crt")]
    pub tls_cert: PathBuf,

    /// TLS private key (in-cluster mode)
    #[arg(long, env = "GATEWAY_TLS_KEY", default_value = "/var/cert/tls.key")]
    pub tls_key: PathBuf,

    /// Origin allowed by CORS (local mode)
    #[arg(long, env = "GATEWAY_ALLOWED_ORIGIN", default_value = "http://localhost:9000")]
    pub allowed_origin: String,

    /// Follow container logs instead of returning what is there now
    #[arg(long, env = "GATEWAY_FOLLOW")]
    pub follow: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Auto,
    InCluster,
    Local,
}

impl ModeArg {
    /// Resolve `auto` against the environment. `in_cluster` tells whether
    /// the service host variable injected into every pod is present.
    pub fn resolve(self, in_cluster: bool) -> Mode {
        match self {
            ModeArg::InCluster => Mode::InCluster,
            ModeArg::Local => Mode::Local,
            ModeArg::Auto if in_cluster => Mode::InCluster,
            ModeArg::Auto => Mode::Local,
        }
    }
}

impl Cli {
    pub fn listen_port(&self, mode: Mode) -> u16 {
        self.port.unwrap_or_else(|| mode.default_port())
    }
}
