use crate::error::Result;
use crate::kubernetes::LogStream;
use crate::types::LogRequest;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::{debug, info, warn};

/// HTTP body that forwards one upstream log stream chunk by chunk.
///
/// The upstream is dropped exactly once: when it ends, after the first read
/// error, or when the relay itself is dropped because the client went away.
pub struct Relay {
    request: LogRequest,
    upstream: Option<LogStream>,
    pending: Option<Bytes>,
    relayed: u64,
}

impl Relay {
    /// Wait for the first chunk before committing to a response, so a stream
    /// that fails straight away can still be reported with a status code.
    pub async fn start(request: LogRequest, mut upstream: LogStream) -> Result<Self> {
        let first = upstream.next().await;
        let (pending, upstream) = match first {
            Some(Ok(chunk)) => (Some(chunk), Some(upstream)),
            Some(Err(e)) => return Err(e.into()),
            None => {
                debug!("Log stream for {} is empty", request);
                drop(upstream);
                (None, None)
            }
        };
        Ok(Self {
            request,
            upstream,
            pending,
            relayed: 0,
        })
    }

    pub fn is_released(&self) -> bool {
        self.upstream.is_none()
    }

    fn release(&mut self) {
        if self.upstream.take().is_some() {
            debug!(
                "Released log stream for {} after {} bytes",
                self.request, self.relayed
            );
        }
    }
}

impl Stream for Relay {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(chunk) = this.pending.take() {
            this.relayed += chunk.len() as u64;
            return Poll::Ready(Some(Ok(chunk)));
        }
        let Some(upstream) = this.upstream.as_mut() else {
            return Poll::Ready(None);
        };
        match ready!(upstream.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                this.relayed += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                warn!("Log relay for {} failed mid-stream: {}", this.request, e);
                this.release();
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.release();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if !self.is_released() {
            info!("Client stopped reading logs for {}", self.request);
            self.release();
        }
    }
}
