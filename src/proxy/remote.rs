//! Remote Invocation
//!
//! Packages a call into a [`CallDescriptor`] and hands it to a [`RemoteDispatch`]
//! transport for exactly one target node. The transport never fails over to another
//! node on its own: re-resolution is the proxy's job.
//!
//! [`execute_call`] is the receiving side: it resolves a descriptor against the services
//! deployed on the node that received it.

use super::error::DispatchError;
use crate::cluster::{Node, NodeId};
use crate::service::{MethodKey, ServiceName, ServiceRegistry};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Everything the target node needs to run a call, without any caller-side types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallDescriptor {
    pub service: ServiceName,
    pub method: String,
    pub args: Vec<Value>,
}

impl CallDescriptor {
    pub fn new(service: &str, method: &str, args: Vec<Value>) -> Self {
        Self {
            service: service.to_string(),
            method: method.to_string(),
            args,
        }
    }

    pub fn method_key(&self) -> MethodKey {
        MethodKey::for_call(&self.method, &self.args)
    }
}

/// Whether the transport may retry a submission on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failover {
    /// One attempt against the given node; every failure is reported to the caller.
    Disabled,
    /// The transport may retry transient failures against the same node.
    Enabled,
}

/// Transport that carries a call to a single remote node and waits for its result.
#[async_trait]
pub trait RemoteDispatch: Send + Sync {
    async fn submit(
        &self,
        target: &Node,
        call: CallDescriptor,
        failover: Failover,
    ) -> Result<Value, DispatchError>;
}

/// Client side of remote calls made by a service proxy.
#[derive(Clone)]
pub struct RemoteInvoker {
    dispatch: Arc<dyn RemoteDispatch>,
}

impl RemoteInvoker {
    pub fn new(dispatch: Arc<dyn RemoteDispatch>) -> Self {
        Self { dispatch }
    }

    /// Runs `method(args)` of `service` on `target` and waits for the result.
    pub async fn dispatch(
        &self,
        target: &Node,
        service: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        let call = CallDescriptor::new(service, method, args);

        tracing::debug!(
            "Dispatching {}.{} to node {} at {}",
            call.service,
            call.method_key(),
            target.id,
            target.http_addr
        );

        self.dispatch.submit(target, call, Failover::Disabled).await
    }
}

/// Executes a received call against the services deployed on node `local`.
pub async fn execute_call(
    registry: &dyn ServiceRegistry,
    local: &NodeId,
    call: CallDescriptor,
) -> Result<Value, DispatchError> {
    let Some(service) = registry.local_handle(&call.service) else {
        return Err(DispatchError::ServiceNotFound {
            service: call.service,
            node: local.clone(),
        });
    };

    let key = call.method_key();
    let Some(handler) = service.lookup(&key) else {
        return Err(DispatchError::MethodNotFound {
            service: call.service,
            method: key,
        });
    };

    handler(call.args).await.map_err(|e| {
        tracing::debug!("Method {} of {} failed: {:#}", key, call.service, e);
        DispatchError::Failed {
            message: format!("{:#}", e),
        }
    })
}

/// Dispatch between registries living in the same process.
///
/// Each attached node id maps to the registry of that node. Submitting to a node that
/// is not attached reports `TopologyChanged`, the same as an unreachable peer.
#[derive(Default)]
pub struct InProcessDispatch {
    nodes: DashMap<NodeId, Arc<dyn ServiceRegistry>>,
}

impl InProcessDispatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, node: NodeId, registry: Arc<dyn ServiceRegistry>) {
        self.nodes.insert(node, registry);
    }

    pub fn detach(&self, node: &NodeId) -> bool {
        self.nodes.remove(node).is_some()
    }
}

#[async_trait]
impl RemoteDispatch for InProcessDispatch {
    async fn submit(
        &self,
        target: &Node,
        call: CallDescriptor,
        _failover: Failover,
    ) -> Result<Value, DispatchError> {
        let registry = self
            .nodes
            .get(&target.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DispatchError::TopologyChanged {
                node: target.id.clone(),
            })?;

        execute_call(registry.as_ref(), &target.id, call).await
    }
}
