use crate::cluster::NodeId;
use crate::service::{MethodKey, ServiceName};
use thiserror::Error;

/// Failure of a service invocation, as seen by the caller of a proxy.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// No node in the projection currently hosts the service.
    #[error("failed to find deployed service: {service}")]
    ServiceUnavailable { service: ServiceName },

    /// The resolved node no longer hosts the service. Retryable.
    #[error("service {service} is not deployed on node {node}")]
    ServiceNotFound { service: ServiceName, node: NodeId },

    /// The resolved node is no longer a reachable member. Retryable.
    #[error("node {node} is no longer part of the topology")]
    TopologyChanged { node: NodeId },

    /// The service exists but has no method for this name and argument shape.
    #[error("service {service} has no method matching {method}")]
    MethodNotFound {
        service: ServiceName,
        method: MethodKey,
    },

    /// The proxy was cancelled while waiting between retries.
    #[error("service invocation interrupted")]
    Interrupted,

    /// Error raised by the service method itself.
    #[error(transparent)]
    Service(anyhow::Error),

    /// Any other dispatch failure.
    #[error("service dispatch failed: {0}")]
    Dispatch(#[source] anyhow::Error),
}

impl InvocationError {
    /// `true` for the cluster-transient failures the proxy retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InvocationError::ServiceNotFound { .. } | InvocationError::TopologyChanged { .. }
        )
    }
}

/// Failure reported by a [`RemoteDispatch`](super::remote::RemoteDispatch) implementation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("service {service} is not deployed on node {node}")]
    ServiceNotFound { service: ServiceName, node: NodeId },

    #[error("service {service} has no method matching {method}")]
    MethodNotFound {
        service: ServiceName,
        method: MethodKey,
    },

    #[error("node {node} is not reachable")]
    TopologyChanged { node: NodeId },

    /// The remote method ran and returned an error.
    #[error("remote method failed: {message}")]
    Failed { message: String },

    #[error("transport failure: {0}")]
    Transport(#[source] anyhow::Error),
}

impl From<DispatchError> for InvocationError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::ServiceNotFound { service, node } => {
                InvocationError::ServiceNotFound { service, node }
            }
            DispatchError::MethodNotFound { service, method } => {
                InvocationError::MethodNotFound { service, method }
            }
            DispatchError::TopologyChanged { node } => InvocationError::TopologyChanged { node },
            DispatchError::Failed { message } => InvocationError::Service(anyhow::anyhow!(message)),
            DispatchError::Transport(source) => InvocationError::Dispatch(source),
        }
    }
}
