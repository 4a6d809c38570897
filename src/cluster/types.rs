use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeState {
    Alive,
    Suspect,
    Dead,
}

/// Represents a single member in the cluster.
///
/// Carries the identity used as the key of every topology snapshot and the address
/// remote calls are sent to. Only `Alive` nodes count as cluster members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub http_addr: SocketAddr,
    pub state: NodeState,
}

impl Node {
    pub fn new(id: NodeId, http_addr: SocketAddr) -> Self {
        Self {
            id,
            http_addr,
            state: NodeState::Alive,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == NodeState::Alive
    }
}
