use crate::error::Result;
use crate::types::{LogRequest, Mode, PodSummary};
use crate::utils::{KUBECONFIG_ENV, kubeconfig_path};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Raw log bytes for one container, in the order the API server sends them.
pub type LogStream = BoxStream<'static, std::io::Result<Bytes>>;

/// The two things the gateway needs from the control plane.
///
/// Implementations must be cheap to clone and safe to share between
/// concurrent requests.
pub trait PodApi: Clone + Send + Sync + 'static {
    fn list_pods(&self, namespace: &str) -> impl Future<Output = Result<Vec<Pod>>> + Send;

    fn open_log_stream(
        &self,
        namespace: &str,
        request: &LogRequest,
    ) -> impl Future<Output = Result<LogStream>> + Send;
}

/// `PodApi` backed by a real cluster.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    follow: bool,
}

impl KubeCluster {
    pub fn new(client: Client, follow: bool) -> Self {
        Self { client, follow }
    }
}

impl PodApi for KubeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api.list(&ListParams::default()).await?;
        Ok(pods.items)
    }

    async fn open_log_stream(&self, namespace: &str, request: &LogRequest) -> Result<LogStream> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = LogParams {
            container: Some(request.container_name.clone()),
            follow: self.follow,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(RELAY_BUFFER);
        let (opened_tx, opened_rx) = oneshot::channel();
        tokio::spawn(pump_logs(api, request.clone(), lp, tx, opened_tx));

        match opened_rx.await {
            Ok(Ok(())) => Ok(ReceiverStream::new(rx).boxed()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(std::io::Error::other("log stream task ended before opening").into()),
        }
    }
}

/// Chunks buffered between the API server reader and the HTTP body.
const RELAY_BUFFER: usize = 16;

/// Copy one container's log stream into `tx` until the API server ends it,
/// a read fails, or the receiving side goes away.
///
/// The outcome of opening the stream is reported through `opened` first so
/// that callers can still answer with an error status.
async fn pump_logs(
    api: Api<Pod>,
    request: LogRequest,
    lp: LogParams,
    tx: mpsc::Sender<std::io::Result<Bytes>>,
    opened: oneshot::Sender<kube::Result<()>>,
) {
    let reader = match api.log_stream(&request.pod_name, &lp).await {
        Ok(reader) => {
            if opened.send(Ok(())).is_err() {
                return;
            }
            reader
        }
        Err(e) => {
            let _ = opened.send(Err(e));
            return;
        }
    };

    let chunks = std::pin::pin!(ReaderStream::new(reader.compat()));
    pump(chunks, tx, &request).await;
}

/// Forward `chunks` into `tx`. Returns after the source ends, after the
/// first error has been forwarded, or as soon as the receiver is dropped,
/// even while the source is silent. The source is dropped on return.
pub(crate) async fn pump<S>(mut chunks: S, tx: mpsc::Sender<std::io::Result<Bytes>>, request: &LogRequest)
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!("Receiver for {} went away, closing upstream", request);
                return;
            }
            chunk = chunks.next() => match chunk {
                Some(chunk) => {
                    let failed = chunk.is_err();
                    if tx.send(chunk).await.is_err() || failed {
                        return;
                    }
                }
                None => {
                    debug!("API server ended log stream for {}", request);
                    return;
                }
            }
        }
    }
}

/// Build the cluster client for `mode` and make sure the API server answers.
///
/// Any failure here is fatal: the gateway has nothing to serve without a client.
pub async fn connect(mode: Mode) -> anyhow::Result<Client> {
    let config = match mode {
        Mode::InCluster => Config::incluster()
            .map_err(|e| anyhow::anyhow!("Failed to load in-cluster configuration: {}", e))?,
        Mode::Local => {
            let path = kubeconfig_path(std::env::var_os(KUBECONFIG_ENV), home::home_dir())
                .ok_or_else(|| {
                    anyhow::anyhow!("Cannot locate kubeconfig: {} unset and no home directory", KUBECONFIG_ENV)
                })?;
            info!("Using kubeconfig file: {}", path.display());
            let kubeconfig = Kubeconfig::read_from(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read kubeconfig {}: {}", path.display(), e))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| anyhow::anyhow!("Invalid kubeconfig {}: {}", path.display(), e))?
        }
    };
    debug!("Cluster URL: {}", config.cluster_url);

    let client = Client::try_from(config)?;
    let version = client
        .apiserver_version()
        .await
        .map_err(|e| anyhow::anyhow!("API server unreachable: {}", e))?;
    info!("Connected to API server {}", version.git_version);
    Ok(client)
}

/// Project a pod onto its name and container names, keeping declared order.
pub fn summarize(pod: &Pod) -> PodSummary {
    PodSummary {
        name: pod.name_any(),
        containers: pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default(),
    }
}

pub async fn list_pod_summaries<C: PodApi>(cluster: &C, namespace: &str) -> Result<Vec<PodSummary>> {
    let pods = cluster.list_pods(namespace).await?;
    debug!("Listed {} pods in namespace {}", pods.len(), namespace);
    Ok(pods.iter().map(summarize).collect())
}
