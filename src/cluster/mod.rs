//! Cluster View Module
//!
//! Read-only view of the cluster used by service proxies to decide where a call can go.
//! Membership itself (discovery, failure detection) is maintained elsewhere; this module
//! only exposes who is currently a member and lets callers narrow that set.
//!
//! ## Core Concepts
//! - **`ClusterView`**: the collaborator contract (members, node lookup, local node).
//! - **`StaticCluster`**: an in-memory member table that a node process keeps up to date.
//! - **`Projection`**: the subset of members a proxy is allowed to target, either the
//!   whole cluster or the members accepted by a predicate.

pub mod projection;
pub mod types;
pub mod view;

pub use projection::{NodePredicate, Projection};
pub use types::{Node, NodeId, NodeState};
pub use view::{ClusterView, StaticCluster};
