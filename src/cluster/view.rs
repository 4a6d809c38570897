use dashmap::DashMap;
use std::sync::Arc;

use super::types::{Node, NodeId, NodeState};

/// Read access to cluster membership.
///
/// Implementations must be cheap to query: proxies call `members` and `node` on every
/// non-sticky resolution.
pub trait ClusterView: Send + Sync {
    /// Current members, in a stable order.
    fn members(&self) -> Vec<Node>;

    /// `true` if the view covers the whole cluster without any filter.
    fn is_unrestricted(&self) -> bool;

    /// Looks up a member by identity. Nodes that left (or are not alive) yield `None`.
    fn node(&self, id: &NodeId) -> Option<Node>;

    /// The node this process runs on.
    fn local_node(&self) -> Node;

    fn is_local(&self, id: &NodeId) -> bool {
        self.local_node().id == *id
    }
}

/// In-memory member table.
///
/// Holds every node this process knows about keyed by identity. Whatever drives
/// membership (configuration, an external discovery feed) calls `join`, `leave` and
/// `set_state`; readers only ever see `Alive` nodes.
pub struct StaticCluster {
    local_node: Node,
    members: DashMap<NodeId, Node>,
}

impl StaticCluster {
    pub fn new(local_node: Node) -> Arc<Self> {
        let members = DashMap::new();
        members.insert(local_node.id.clone(), local_node.clone());

        Arc::new(Self {
            local_node,
            members,
        })
    }

    pub fn join(&self, node: Node) {
        tracing::info!("Node {} joined at {}", node.id, node.http_addr);
        self.members.insert(node.id.clone(), node);
        tracing::debug!("Cluster size now: {}", self.members.len());
    }

    pub fn leave(&self, id: &NodeId) -> Option<Node> {
        if *id == self.local_node.id {
            tracing::warn!("Refusing to remove local node {} from the member table", id);
            return None;
        }

        let removed = self.members.remove(id).map(|(_, node)| node);
        if removed.is_some() {
            tracing::info!("Node {} left the cluster", id);
        }
        removed
    }

    /// Updates the lifecycle state of a known member. Returns `false` for unknown nodes.
    pub fn set_state(&self, id: &NodeId, state: NodeState) -> bool {
        match self.members.get_mut(id) {
            Some(mut member) => {
                if member.state != state {
                    tracing::info!("Node {} is now {:?}", id, state);
                    member.state = state;
                }
                true
            }
            None => {
                tracing::debug!("State change for unknown node {}", id);
                false
            }
        }
    }

    pub fn get_alive_members(&self) -> Vec<Node> {
        let mut alive: Vec<Node> = self
            .members
            .iter()
            .filter(|entry| entry.value().is_alive())
            .map(|entry| entry.value().clone())
            .collect();
        alive.sort_by(|a, b| a.id.cmp(&b.id));
        alive
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl ClusterView for StaticCluster {
    fn members(&self) -> Vec<Node> {
        self.get_alive_members()
    }

    fn is_unrestricted(&self) -> bool {
        true
    }

    fn node(&self, id: &NodeId) -> Option<Node> {
        self.members
            .get(id)
            .filter(|entry| entry.value().is_alive())
            .map(|entry| entry.value().clone())
    }

    fn local_node(&self) -> Node {
        self.local_node.clone()
    }
}
