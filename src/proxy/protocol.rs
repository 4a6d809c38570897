//! Service Invocation Protocol
//!
//! Data Transfer Objects exchanged between nodes when a proxy sends a call to a remote
//! node, plus the public endpoints a node exposes for its own proxies.
//!
//! Bodies are JSON; the outcome of a remote call is always an [`InvokeResponse`] so the
//! caller can tell "service missing on that node" (retryable) from a failed method.

use super::error::DispatchError;
use super::remote::CallDescriptor;
use crate::cluster::NodeId;
use crate::service::{MethodKey, ServiceName, TopologySnapshot};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- API Endpoints ---

/// Internal endpoint executing a call on the receiving node.
pub const ENDPOINT_INTERNAL_INVOKE: &str = "/internal/service/invoke";
/// Public endpoint invoking a service method through this node's proxy.
pub const ENDPOINT_SERVICE_INVOKE: &str = "/service/:name/:method";
/// Public endpoint reporting a service's topology as seen by this node.
pub const ENDPOINT_SERVICE_TOPOLOGY: &str = "/topology/:name";

// --- Data Transfer Objects ---

/// Payload of a node-to-node call.
///
/// `target` is the node the caller resolved. A receiver with a different identity
/// (e.g. an address reused by a restarted node) rejects the call as misrouted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub target: NodeId,
    pub call: CallDescriptor,
}

/// Outcome of a node-to-node call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvokeResponse {
    Ok {
        value: Value,
    },
    ServiceNotFound {
        service: ServiceName,
    },
    MethodNotFound {
        service: ServiceName,
        method: MethodKey,
    },
    WrongNode {
        node: NodeId,
    },
    Failed {
        message: String,
    },
}

impl InvokeResponse {
    /// Builds the response for the result of executing a call on this node.
    pub fn from_result(result: Result<Value, DispatchError>) -> Self {
        match result {
            Ok(value) => InvokeResponse::Ok { value },
            Err(DispatchError::ServiceNotFound { service, .. }) => {
                InvokeResponse::ServiceNotFound { service }
            }
            Err(DispatchError::MethodNotFound { service, method }) => {
                InvokeResponse::MethodNotFound { service, method }
            }
            Err(DispatchError::TopologyChanged { node }) => InvokeResponse::WrongNode { node },
            Err(DispatchError::Failed { message }) => InvokeResponse::Failed { message },
            Err(DispatchError::Transport(e)) => InvokeResponse::Failed {
                message: format!("{:#}", e),
            },
        }
    }

    /// Turns a response received from node `from` back into a dispatch result.
    pub fn into_result(self, from: &NodeId) -> Result<Value, DispatchError> {
        match self {
            InvokeResponse::Ok { value } => Ok(value),
            InvokeResponse::ServiceNotFound { service } => Err(DispatchError::ServiceNotFound {
                service,
                node: from.clone(),
            }),
            InvokeResponse::MethodNotFound { service, method } => {
                Err(DispatchError::MethodNotFound { service, method })
            }
            InvokeResponse::WrongNode { .. } => Err(DispatchError::TopologyChanged {
                node: from.clone(),
            }),
            InvokeResponse::Failed { message } => Err(DispatchError::Failed { message }),
        }
    }

    /// HTTP status code the response is sent with.
    pub fn status_code(&self) -> u16 {
        match self {
            InvokeResponse::Ok { .. } => 200,
            InvokeResponse::ServiceNotFound { .. } | InvokeResponse::MethodNotFound { .. } => 404,
            InvokeResponse::WrongNode { .. } => 421,
            InvokeResponse::Failed { .. } => 500,
        }
    }
}

/// Response of the public invoke endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInvokeResponse {
    pub value: Option<Value>,
    pub error: Option<String>,
}

/// Response of the topology endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyResponse {
    pub service: ServiceName,
    pub topology: TopologySnapshot,
    pub total_instances: usize,
}
