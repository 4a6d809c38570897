//! Service Registry Module
//!
//! Describes which named services are deployed where, and holds the services that run
//! on this node.
//!
//! ## Core Concepts
//! - **Topology snapshot**: `node id -> live instance count` for one service, read fresh
//!   on every resolution.
//! - **`ServiceContext`**: a locally deployed service. Its methods live in a dispatch
//!   table keyed by `(method name, argument kinds)`, built once at deployment.
//! - **`ServiceRegistry`**: the collaborator contract used by proxies, implemented here
//!   by `LocalServiceRegistry`.
//! - **Built-ins**: demo services (`echo`, `calculator`) a node deploys by name.

pub mod builtin;
pub mod context;
pub mod registry;
pub mod types;

pub use builtin::{BUILTIN_SERVICES, builtin};
pub use context::{MethodHandler, ServiceContext};
pub use registry::{LocalServiceRegistry, ServiceRegistry};
pub use types::{ArgKind, MethodKey, ServiceDescriptor, ServiceName, TopologySnapshot};

#[cfg(test)]
mod tests;
