//! Service Proxy Module
//!
//! Client side of service invocation: a [`ServiceProxy`] turns a method call on a named
//! service into a call on whichever node of a projection currently hosts that service.
//!
//! ## Architecture
//! - **`NodeSelector`**: Picks the target node (local affinity, singletons, weighted scan
//!   over the topology) and optionally keeps it in a lock-free sticky slot.
//! - **`RemoteInvoker`**: Packages the call into a [`CallDescriptor`] and submits it to
//!   exactly one node through a [`RemoteDispatch`] transport, without failover.
//! - **`ServiceProxy`**: Runs the invoke loop. Transient cluster failures (service gone
//!   from the node, node gone from the cluster) invalidate the sticky node and trigger a
//!   fresh resolution after a cancellable pause.
//!
//! Transports: [`HttpDispatch`] for real nodes, [`InProcessDispatch`] for registries
//! living in the same process.

pub mod error;
pub mod handlers;
pub mod http;
pub mod protocol;
#[allow(clippy::module_inception)]
pub mod proxy;
pub mod remote;
pub mod retry;
pub mod selector;

pub use error::{DispatchError, InvocationError};
pub use http::HttpDispatch;
pub use proxy::{ProxyOptions, ServiceProxy};
pub use remote::{CallDescriptor, Failover, InProcessDispatch, RemoteDispatch, RemoteInvoker};
pub use retry::{Backoff, Retry};
pub use selector::{NodeSelector, SelectorOptions, StickyNodeCache, circular_scan};
