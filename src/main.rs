mod cli;
mod error;
mod kubernetes;
mod relay;
mod server;
mod types;
mod utils;

use axum::http::HeaderValue;
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::{debug, info};

use cli::Cli;
use kubernetes::{KubeCluster, connect};
use server::{AppState, Settings, Transport};
use types::Mode;
use utils::running_in_cluster;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.mode.resolve(running_in_cluster());
    info!("Running in {} mode", mode);

    let transport = match mode {
        Mode::InCluster => {
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                debug!("TLS crypto provider already installed");
            }
            Transport::Tls {
                cert: cli.tls_cert.clone(),
                key: cli.tls_key.clone(),
            }
        }
        Mode::Local => Transport::Plain {
            allowed_origin: HeaderValue::from_str(&cli.allowed_origin).map_err(|e| {
                anyhow::anyhow!("Invalid allowed origin '{}': {}", cli.allowed_origin, e)
            })?,
        },
    };

    let client = connect(mode).await?;
    let cluster = KubeCluster::new(client, cli.follow);
    let state = AppState::new(
        cluster,
        Settings {
            namespace: cli.namespace.clone(),
            manifest_path: cli.manifest.clone(),
            static_root: cli.static_root.clone(),
        },
    );
    info!("Serving pods from namespace {}", cli.namespace);

    let app = server::router(state);
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.listen_port(mode)));

    tokio::select! {
        res = server::serve(app, addr, transport) => res,
        res = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            res.map_err(Into::into)
        }
    }
}
