//! Grid Node
//!
//! Bundles what one node needs to serve and issue service calls: the membership view,
//! the service registry, the transport for remote calls and a cache of service proxies.
//! The HTTP handlers receive it as an axum `Extension`.

use crate::cluster::{ClusterView, NodeId, Projection, StaticCluster};
use crate::proxy::{ProxyOptions, RemoteDispatch, ServiceProxy};
use crate::service::{LocalServiceRegistry, ServiceName, ServiceRegistry};

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct GridNode {
    pub cluster: Arc<StaticCluster>,
    pub registry: Arc<LocalServiceRegistry>,
    dispatch: Arc<dyn RemoteDispatch>,
    options: ProxyOptions,
    shutdown: CancellationToken,
    proxies: DashMap<ServiceName, Arc<ServiceProxy>>,
}

impl GridNode {
    pub fn new(
        cluster: Arc<StaticCluster>,
        registry: Arc<LocalServiceRegistry>,
        dispatch: Arc<dyn RemoteDispatch>,
        options: ProxyOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            cluster,
            registry,
            dispatch,
            options,
            shutdown: CancellationToken::new(),
            proxies: DashMap::new(),
        })
    }

    pub fn local_id(&self) -> NodeId {
        self.cluster.local_node().id
    }

    pub fn options(&self) -> ProxyOptions {
        self.options
    }

    /// Cluster-wide proxy for `name`, created on first use and shared afterwards.
    pub fn service_proxy(&self, name: &str) -> Arc<ServiceProxy> {
        if let Some(proxy) = self.proxies.get(name) {
            return proxy.value().clone();
        }

        self.proxies
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating proxy for service {}", name);
                let cluster: Arc<dyn ClusterView> = self.cluster.clone();
                Arc::new(self.new_proxy(name, Projection::all(cluster), self.options))
            })
            .value()
            .clone()
    }

    /// Uncached proxy restricted to `projection`.
    pub fn proxy_for(
        &self,
        name: &str,
        projection: Projection,
        options: ProxyOptions,
    ) -> ServiceProxy {
        self.new_proxy(name, projection, options)
    }

    fn new_proxy(&self, name: &str, projection: Projection, options: ProxyOptions) -> ServiceProxy {
        let registry: Arc<dyn ServiceRegistry> = self.registry.clone();
        ServiceProxy::new(name, projection, registry, self.dispatch.clone(), options)
            .with_cancellation(self.shutdown.child_token())
    }

    pub fn cached_proxies(&self) -> usize {
        self.proxies.len()
    }

    /// Cancels every proxy created by this node; pending retries end with `Interrupted`.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down grid node {}", self.local_id());
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
