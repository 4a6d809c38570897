use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::types::{Node, NodeId};
use super::view::ClusterView;

/// Membership predicate of a restricted projection.
pub type NodePredicate = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

/// The set of nodes a service proxy is allowed to target.
///
/// Either the whole cluster (`Projection::all`) or the members accepted by a predicate.
/// A projection is itself a [`ClusterView`]: `members` and `node` only return nodes that
/// pass the filter, while `cluster()` still gives access to cluster-wide lookups.
#[derive(Clone)]
pub struct Projection {
    cluster: Arc<dyn ClusterView>,
    filter: Option<NodePredicate>,
}

impl Projection {
    pub fn all(cluster: Arc<dyn ClusterView>) -> Self {
        Self {
            cluster,
            filter: None,
        }
    }

    /// Restricts the projection to an explicit set of node ids.
    pub fn nodes(cluster: Arc<dyn ClusterView>, ids: impl IntoIterator<Item = NodeId>) -> Self {
        let ids: HashSet<NodeId> = ids.into_iter().collect();
        Self::filtered(cluster, move |node: &Node| ids.contains(&node.id))
    }

    pub fn filtered<F>(cluster: Arc<dyn ClusterView>, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        Self {
            cluster,
            filter: Some(Arc::new(predicate)),
        }
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterView> {
        &self.cluster
    }

    pub fn contains(&self, node: &Node) -> bool {
        match &self.filter {
            Some(predicate) => predicate(node),
            None => true,
        }
    }

    /// Scans the projection once for the local node.
    pub fn contains_local(&self) -> bool {
        let local = self.cluster.local_node().id;
        self.members().iter().any(|node| node.id == local)
    }
}

impl ClusterView for Projection {
    fn members(&self) -> Vec<Node> {
        let members = self.cluster.members();
        match &self.filter {
            Some(predicate) => members.into_iter().filter(|node| predicate(node)).collect(),
            None => members,
        }
    }

    fn is_unrestricted(&self) -> bool {
        self.filter.is_none() && self.cluster.is_unrestricted()
    }

    fn node(&self, id: &NodeId) -> Option<Node> {
        self.cluster.node(id).filter(|node| self.contains(node))
    }

    fn local_node(&self) -> Node {
        self.cluster.local_node()
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("unrestricted", &self.is_unrestricted())
            .field(
                "members",
                &self
                    .members()
                    .into_iter()
                    .map(|node| node.id.0)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
