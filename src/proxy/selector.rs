//! Target Node Selection
//!
//! Resolves which node a service call should go to.
//!
//! ## Selection Order
//! 1. **Local affinity**: if the projection includes this node and the service runs here,
//!    the local node wins, sticky or not.
//! 2. **Singleton**: a topology with a single entry resolves to that node.
//! 3. **Single-node projection**: the only projection member, if it hosts an instance.
//! 4. **Whole cluster**: a weighted circular scan over the topology snapshot.
//! 5. **Restricted projection**: uniform pick among members with a positive count.
//!
//! In sticky mode the first resolved node is cached in a lock-free slot shared by all
//! callers of the proxy; concurrent resolvers defer to whichever one installed first.

use crate::cluster::{ClusterView, Node, NodeId, Projection};
use crate::service::{ServiceRegistry, TopologySnapshot};

use arc_swap::ArcSwapOption;
use rand::Rng;
use std::sync::Arc;

/// The sticky node slot of one proxy.
///
/// Only ever mutated with compare-and-swap: `install` succeeds against an empty slot,
/// `clear_if` only empties the slot while it still holds the failed node.
#[derive(Debug, Default)]
pub struct StickyNodeCache {
    slot: ArcSwapOption<Node>,
}

impl StickyNodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Node>> {
        self.slot.load_full()
    }

    /// Installs `node` if the slot is empty and returns the node the slot holds afterwards.
    ///
    /// Losing the race returns the winner's node; `node` is discarded.
    pub fn install(&self, node: Arc<Node>) -> Arc<Node> {
        let previous = self.slot.compare_and_swap(&None::<Arc<Node>>, Some(node.clone()));

        match &*previous {
            None => {
                tracing::debug!("Sticky node set to {}", node.id);
                node
            }
            Some(winner) => {
                tracing::debug!(
                    "Sticky node already set to {} (discarding {})",
                    winner.id,
                    node.id
                );
                winner.clone()
            }
        }
    }

    /// Empties the slot if it still holds `failed`. Returns `true` if it was cleared.
    pub fn clear_if(&self, failed: &Arc<Node>) -> bool {
        let current = Some(failed.clone());
        let previous = self.slot.compare_and_swap(&current, None::<Arc<Node>>);

        let cleared = matches!(&*previous, Some(node) if Arc::ptr_eq(node, failed));
        if cleared {
            tracing::debug!("Cleared sticky node {}", failed.id);
        }
        cleared
    }
}

/// Resolution options fixed at proxy construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOptions {
    /// Reuse the first resolved node until a call against it fails.
    pub sticky: bool,
    /// Only accept the sole node of a single-entry topology if it is in the projection.
    pub verify_singleton: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            sticky: false,
            verify_singleton: true,
        }
    }
}

/// Picks target nodes for calls made through one proxy.
pub struct NodeSelector {
    projection: Projection,
    registry: Arc<dyn ServiceRegistry>,
    options: SelectorOptions,
    local_id: NodeId,
    has_local_node: bool,
    cache: StickyNodeCache,
}

impl NodeSelector {
    pub fn new(
        projection: Projection,
        registry: Arc<dyn ServiceRegistry>,
        options: SelectorOptions,
    ) -> Self {
        let local_id = projection.local_node().id;
        let has_local_node = projection.contains_local();

        Self {
            projection,
            registry,
            options,
            local_id,
            has_local_node,
            cache: StickyNodeCache::new(),
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn options(&self) -> SelectorOptions {
        self.options
    }

    pub fn cache(&self) -> &StickyNodeCache {
        &self.cache
    }

    pub fn has_local_node(&self) -> bool {
        self.has_local_node
    }

    pub fn is_local(&self, node: &Node) -> bool {
        node.id == self.local_id
    }

    /// Resolves the node to send the next call of `service` to, or `None` if no node in
    /// the projection hosts it.
    pub fn resolve(&self, service: &str) -> Option<Arc<Node>> {
        if !self.options.sticky {
            return self.select(service).map(Arc::new);
        }

        if let Some(cached) = self.cache.get() {
            return Some(cached);
        }

        let fresh = Arc::new(self.select(service)?);
        Some(self.cache.install(fresh))
    }

    /// Computes a fresh target without touching the sticky slot.
    pub fn select(&self, service: &str) -> Option<Node> {
        self.select_with(service, &mut rand::thread_rng())
    }

    pub(crate) fn select_with<R: Rng + ?Sized>(&self, service: &str, rng: &mut R) -> Option<Node> {
        if self.has_local_node && self.registry.local_handle(service).is_some() {
            return Some(self.projection.local_node());
        }

        let snapshot = match self.registry.topology(service) {
            Some(snapshot) if !snapshot.is_empty() => snapshot,
            _ => {
                tracing::debug!("No topology for service {}", service);
                return None;
            }
        };

        // Cluster singletons.
        if snapshot.len() == 1 {
            let id = snapshot.keys().next()?;
            return if self.options.verify_singleton {
                self.projection.node(id)
            } else {
                self.projection.cluster().node(id)
            };
        }

        let nodes = self.projection.members();

        if nodes.len() == 1 {
            let node = nodes.into_iter().next()?;
            return match snapshot.get(&node.id) {
                Some(&count) if count > 0 => Some(node),
                _ => None,
            };
        }

        if self.projection.is_unrestricted() {
            let start = rng.gen_range(0..snapshot.len());
            let id = circular_scan(&snapshot, start)?;
            return self.projection.cluster().node(id);
        }

        let candidates: Vec<Node> = nodes
            .into_iter()
            .filter(|node| snapshot.get(&node.id).is_some_and(|&count| count > 0))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let idx = rng.gen_range(0..candidates.len());
        candidates.into_iter().nth(idx)
    }
}

/// Weighted pick over a topology snapshot starting at entry `start`.
///
/// Returns the first entry at or after `start` with a positive count. If there is none,
/// wraps around and returns the first positive entry in `[0, start]`. Runs of zero-count
/// entries therefore bias the pick towards the positive entry that follows them.
pub fn circular_scan(snapshot: &TopologySnapshot, start: usize) -> Option<&NodeId> {
    if let Some((id, _)) = snapshot
        .iter()
        .skip(start)
        .find(|&(_, &count)| count > 0)
    {
        return Some(id);
    }

    // Circle back.
    for (i, (id, &count)) in snapshot.iter().enumerate() {
        if count > 0 {
            return Some(id);
        }
        if i == start {
            return None;
        }
    }

    None
}
