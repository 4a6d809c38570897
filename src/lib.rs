//! Service Grid Library
//!
//! Client-side service invocation for a distributed compute grid. A caller obtains a
//! proxy for a named service and calls its methods; the proxy decides which node runs
//! each call and transparently re-resolves when the cluster changes underneath it.
//!
//! ## Architecture Modules
//! - **`cluster`**: Membership as seen by this process (`ClusterView`, `StaticCluster`)
//!   and projections restricting which nodes a proxy may target.
//! - **`service`**: Deployed services: the per-service method dispatch table and the
//!   registry reporting where each service runs (`TopologySnapshot`).
//! - **`proxy`**: Node selection, remote invocation, the retry loop and the HTTP
//!   transport/handlers connecting nodes.
//! - **`grid`**: Per-node bundle of the above, shared with the HTTP layer.
//! - **`config`**: TOML node configuration.

pub mod cluster;
pub mod config;
pub mod grid;
pub mod proxy;
pub mod service;
