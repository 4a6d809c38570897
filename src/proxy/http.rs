//! HTTP transport for remote service calls.
//!
//! Posts an [`InvokeRequest`] to the target node's internal invoke endpoint and maps the
//! answer back to a dispatch result. Failures while sending the request (refused or reset
//! connection, peer gone before answering, timeout) mean the node is gone as far as the
//! proxy is concerned and are reported as `TopologyChanged`. Only a response that cannot
//! be read is a `Transport` failure.

use super::error::DispatchError;
use super::protocol::{ENDPOINT_INTERNAL_INVOKE, InvokeRequest, InvokeResponse};
use super::remote::{CallDescriptor, Failover, RemoteDispatch};
use crate::cluster::{ClusterView, Node};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Attempts against the same node when failover is enabled.
pub(crate) const FAILOVER_ATTEMPTS: usize = 3;

pub struct HttpDispatch {
    cluster: Arc<dyn ClusterView>,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpDispatch {
    pub fn new(cluster: Arc<dyn ClusterView>, timeout: Duration) -> Self {
        Self {
            cluster,
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    fn invoke_url(node: &Node) -> String {
        format!("http://{}{}", node.http_addr, ENDPOINT_INTERNAL_INVOKE)
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
        attempts: usize,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut delay_ms = 150u64;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::debug!("POST {} failed (attempt {}): {}", url, attempt, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }
    }
}

#[async_trait]
impl RemoteDispatch for HttpDispatch {
    async fn submit(
        &self,
        target: &Node,
        call: CallDescriptor,
        failover: Failover,
    ) -> Result<Value, DispatchError> {
        let node = self
            .cluster
            .node(&target.id)
            .ok_or_else(|| DispatchError::TopologyChanged {
                node: target.id.clone(),
            })?;

        let attempts = match failover {
            Failover::Disabled => 1,
            Failover::Enabled => FAILOVER_ATTEMPTS,
        };

        let payload = InvokeRequest {
            target: node.id.clone(),
            call,
        };

        let response = self
            .post_with_retry(Self::invoke_url(&node), &payload, attempts)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach node {} at {}: {}", node.id, node.http_addr, e);
                if e.is_builder() {
                    DispatchError::Transport(anyhow::anyhow!(e))
                } else {
                    DispatchError::TopologyChanged {
                        node: node.id.clone(),
                    }
                }
            })?;

        let status = response.status();
        let body: InvokeResponse = response.json().await.map_err(|e| {
            DispatchError::Transport(anyhow::anyhow!(
                "invalid response from node {} ({}): {}",
                node.id,
                status,
                e
            ))
        })?;

        body.into_result(&node.id)
    }
}
