use super::error::InvocationError;
use super::remote::{RemoteDispatch, RemoteInvoker};
use super::retry::{Backoff, Retry};
use super::selector::{NodeSelector, SelectorOptions};
use crate::cluster::{Node, Projection};
use crate::service::{MethodKey, ServiceName, ServiceRegistry};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Construction options of a [`ServiceProxy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyOptions {
    pub selector: SelectorOptions,
    pub backoff: Backoff,
}

impl ProxyOptions {
    pub fn sticky(mut self, sticky: bool) -> Self {
        self.selector.sticky = sticky;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Invokes methods of a named service wherever in the projection it is deployed.
///
/// A proxy is meant to be shared (`Arc<ServiceProxy>`): any number of tasks may call
/// [`invoke`](ServiceProxy::invoke) concurrently. The only state they share is the
/// sticky node slot of the selector.
pub struct ServiceProxy {
    name: ServiceName,
    selector: NodeSelector,
    registry: Arc<dyn ServiceRegistry>,
    invoker: RemoteInvoker,
    retry: Retry,
}

impl ServiceProxy {
    pub fn new(
        name: &str,
        projection: Projection,
        registry: Arc<dyn ServiceRegistry>,
        dispatch: Arc<dyn RemoteDispatch>,
        options: ProxyOptions,
    ) -> Self {
        let selector = NodeSelector::new(projection, registry.clone(), options.selector);

        Self {
            name: name.to_string(),
            selector,
            registry,
            invoker: RemoteInvoker::new(dispatch),
            retry: Retry::new(options.backoff),
        }
    }

    /// Replaces the proxy's cancellation token, e.g. with a node-wide shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.retry = Retry::with_cancellation(self.retry.backoff(), cancel);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &NodeSelector {
        &self.selector
    }

    pub fn is_sticky(&self) -> bool {
        self.selector.options().sticky
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.retry.cancel_token()
    }

    /// Calls `method(args)` on the service.
    ///
    /// Cluster-transient failures (service withdrawn from the resolved node, node gone)
    /// clear the sticky node and start over with a fresh resolution; there is no
    /// attempt limit. Everything else is returned on first occurrence.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        let mut attempt = 0u32;

        loop {
            let Some(node) = self.selector.resolve(&self.name) else {
                return Err(InvocationError::ServiceUnavailable {
                    service: self.name.clone(),
                });
            };

            match self.call_on(&node, method, &args).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::debug!(
                        "Service was not found or topology changed (will retry): {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            // The previous node failed: drop it from the sticky slot (if still there)
            // and resolve again after a pause.
            self.selector.cache().clear_if(&node);

            attempt = attempt.saturating_add(1);
            self.retry.pause(attempt).await?;
        }
    }

    /// [`invoke`](ServiceProxy::invoke) and deserialize the result into `R`.
    pub async fn invoke_as<R: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<R, InvocationError> {
        let value = self.invoke(method, args).await?;
        serde_json::from_value(value).map_err(|e| InvocationError::Dispatch(e.into()))
    }

    async fn call_on(
        &self,
        node: &Node,
        method: &str,
        args: &[Value],
    ) -> Result<Value, InvocationError> {
        if !self.selector.is_local(node) {
            return self
                .invoker
                .dispatch(node, &self.name, method, args.to_vec())
                .await
                .map_err(InvocationError::from);
        }

        // Local fast path: run in the caller's task, no dispatch.
        let Some(service) = self.registry.local_handle(&self.name) else {
            return Err(InvocationError::ServiceNotFound {
                service: self.name.clone(),
                node: node.id.clone(),
            });
        };

        let key = MethodKey::for_call(method, args);
        let Some(handler) = service.lookup(&key) else {
            return Err(InvocationError::MethodNotFound {
                service: self.name.clone(),
                method: key,
            });
        };

        handler(args.to_vec()).await.map_err(InvocationError::Service)
    }
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("name", &self.name)
            .field("projection", self.selector.projection())
            .field("sticky", &self.is_sticky())
            .field("backoff", &self.retry.backoff())
            .finish()
    }
}
