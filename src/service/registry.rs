use super::context::ServiceContext;
use super::types::{ServiceDescriptor, ServiceName, TopologySnapshot};
use crate::cluster::NodeId;

use dashmap::DashMap;
use std::sync::Arc;

/// Deployment information consumed by service proxies.
pub trait ServiceRegistry: Send + Sync {
    /// Every deployed service with its current topology.
    fn deployed_services(&self) -> Vec<ServiceDescriptor>;

    /// The instance running on this node, if the service is deployed here.
    fn local_handle(&self, name: &str) -> Option<Arc<ServiceContext>>;

    /// Topology of a single service, or `None` if it is not deployed anywhere.
    fn topology(&self, name: &str) -> Option<TopologySnapshot> {
        self.deployed_services()
            .into_iter()
            .find(|desc| desc.name == name)
            .map(|desc| desc.topology)
    }
}

/// Registry backing a single node.
///
/// Keeps the cluster-wide topology table (fed by whatever deploys services) next to
/// the services instantiated in this process.
pub struct LocalServiceRegistry {
    local_node: NodeId,
    topologies: DashMap<ServiceName, TopologySnapshot>,
    local: DashMap<ServiceName, Arc<ServiceContext>>,
}

impl LocalServiceRegistry {
    pub fn new(local_node: NodeId) -> Arc<Self> {
        Arc::new(Self {
            local_node,
            topologies: DashMap::new(),
            local: DashMap::new(),
        })
    }

    pub fn local_node_id(&self) -> &NodeId {
        &self.local_node
    }

    /// Replaces the topology of `name` with `snapshot`.
    pub fn set_topology(&self, name: &str, snapshot: TopologySnapshot) {
        tracing::debug!("Topology of {} set to {:?}", name, snapshot);
        self.topologies.insert(name.to_string(), snapshot);
    }

    /// Sets the instance count of `name` on `node`, creating the service entry if needed.
    pub fn set_instances(&self, name: &str, node: NodeId, count: usize) {
        self.topologies
            .entry(name.to_string())
            .or_insert_with(TopologySnapshot::new)
            .insert(node, count);
    }

    /// Forgets a service entirely, including any local instance.
    pub fn remove_service(&self, name: &str) {
        self.topologies.remove(name);
        if self.local.remove(name).is_some() {
            tracing::info!("Removed local instance of {}", name);
        }
    }

    /// Deploys `service` on this node.
    ///
    /// The local node's instance count for the service becomes at least 1.
    pub fn deploy_local(&self, service: ServiceContext) -> Arc<ServiceContext> {
        let name = service.name().to_string();
        let service = Arc::new(service);

        self.local.insert(name.clone(), service.clone());

        let mut topology = self
            .topologies
            .entry(name.clone())
            .or_insert_with(TopologySnapshot::new);
        let count = topology.entry(self.local_node.clone()).or_insert(0);
        *count = (*count).max(1);
        drop(topology);

        tracing::info!(
            "Deployed service {} locally ({} methods)",
            name,
            service.method_count()
        );

        service
    }

    /// Removes the local instance of `name` and zeroes the local instance count.
    pub fn undeploy_local(&self, name: &str) -> Option<Arc<ServiceContext>> {
        let removed = self.local.remove(name).map(|(_, ctx)| ctx);

        if let Some(mut topology) = self.topologies.get_mut(name) {
            topology.insert(self.local_node.clone(), 0);
        }

        if removed.is_some() {
            tracing::info!("Undeployed local instance of {}", name);
        }

        removed
    }

    pub fn service_count(&self) -> usize {
        self.topologies.len()
    }
}

impl ServiceRegistry for LocalServiceRegistry {
    fn deployed_services(&self) -> Vec<ServiceDescriptor> {
        let mut services: Vec<ServiceDescriptor> = self
            .topologies
            .iter()
            .map(|entry| ServiceDescriptor {
                name: entry.key().clone(),
                topology: entry.value().clone(),
            })
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }

    fn local_handle(&self, name: &str) -> Option<Arc<ServiceContext>> {
        self.local.get(name).map(|entry| entry.value().clone())
    }

    fn topology(&self, name: &str) -> Option<TopologySnapshot> {
        self.topologies.get(name).map(|entry| entry.value().clone())
    }
}
