//! Node Configuration
//!
//! A node is described by a TOML file:
//!
//! ```toml
//! node_id = "node-1"
//! bind = "127.0.0.1:6001"
//! deploy = ["calculator"]
//!
//! [[peers]]
//! id = "node-2"
//! addr = "127.0.0.1:6002"
//!
//! [[services]]
//! name = "calculator"
//! topology = { node-1 = 1, node-2 = 2 }
//!
//! [proxy]
//! retry_delay_ms = 10
//! sticky = false
//! ```
//!
//! Everything but `node_id` and `bind` is optional.

use crate::cluster::{Node, NodeId};
use crate::proxy::{Backoff, ProxyOptions, SelectorOptions};
use crate::service::{BUILTIN_SERVICES, ServiceName, TopologySnapshot};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub node_id: String,
    /// Address the HTTP server listens on; peers reach this node here.
    pub bind: SocketAddr,
    /// Built-in services deployed on this node.
    #[serde(default)]
    pub deploy: Vec<ServiceName>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerConfig {
    pub id: String,
    pub addr: SocketAddr,
}

/// Known deployment of a service: instance count per node id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub name: ServiceName,
    #[serde(default)]
    pub topology: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Pause between retries; `0` retries immediately.
    pub retry_delay_ms: u64,
    /// Upper bound of an exponential backoff starting at `retry_delay_ms`.
    pub max_retry_delay_ms: Option<u64>,
    pub request_timeout_ms: u64,
    pub verify_singleton: bool,
    pub sticky: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 10,
            max_retry_delay_ms: None,
            request_timeout_ms: 5000,
            verify_singleton: true,
            sticky: false,
        }
    }
}

impl ProxyConfig {
    pub fn backoff(&self) -> Backoff {
        let initial = Duration::from_millis(self.retry_delay_ms);
        match self.max_retry_delay_ms {
            _ if self.retry_delay_ms == 0 => Backoff::None,
            Some(max) if max > self.retry_delay_ms => Backoff::Exponential {
                initial,
                max: Duration::from_millis(max),
            },
            _ => Backoff::Fixed(initial),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn options(&self) -> ProxyOptions {
        ProxyOptions {
            selector: SelectorOptions {
                sticky: self.sticky,
                verify_singleton: self.verify_singleton,
            },
            backoff: self.backoff(),
        }
    }
}

impl NodeConfig {
    /// Reads and validates the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::Invalid("node_id must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if peer.id == self.node_id {
                return Err(ConfigError::Invalid(format!(
                    "peer {} has the local node id",
                    peer.id
                )));
            }
            if !seen.insert(peer.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate peer id {}", peer.id)));
            }
        }

        let mut deployed = HashSet::new();
        for name in &self.deploy {
            if !BUILTIN_SERVICES.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "unknown built-in service {} (expected one of {:?})",
                    name, BUILTIN_SERVICES
                )));
            }
            if !deployed.insert(name.as_str()) {
                return Err(ConfigError::Invalid(format!("service {} deployed twice", name)));
            }
        }

        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                return Err(ConfigError::Invalid("service name must not be empty".to_string()));
            }
            if !names.insert(service.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "service {} is configured twice",
                    service.name
                )));
            }
        }

        Ok(())
    }

    pub fn local_node(&self) -> Node {
        Node::new(NodeId(self.node_id.clone()), self.bind)
    }

    pub fn peer_nodes(&self) -> Vec<Node> {
        self.peers
            .iter()
            .map(|peer| Node::new(NodeId(peer.id.clone()), peer.addr))
            .collect()
    }

    /// Configured topologies, keyed by service name.
    pub fn topologies(&self) -> Vec<(ServiceName, TopologySnapshot)> {
        self.services
            .iter()
            .map(|service| {
                let snapshot = service
                    .topology
                    .iter()
                    .map(|(id, &count)| (NodeId(id.clone()), count))
                    .collect();
                (service.name.clone(), snapshot)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        node_id = "node-1"
        bind = "127.0.0.1:6001"
        deploy = ["calculator"]

        [[peers]]
        id = "node-2"
        addr = "127.0.0.1:6002"

        [[services]]
        name = "calculator"
        topology = { node-1 = 1, node-2 = 2 }

        [proxy]
        sticky = true
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config = NodeConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.local_node().id, NodeId::from("node-1"));
        assert_eq!(config.peer_nodes().len(), 1);
        assert_eq!(config.peer_nodes()[0].http_addr.port(), 6002);

        let topologies = config.topologies();
        assert_eq!(topologies.len(), 1);
        assert_eq!(topologies[0].0, "calculator");
        assert_eq!(topologies[0].1.get(&NodeId::from("node-2")), Some(&2));
        assert_eq!(config.deploy, vec!["calculator".to_string()]);
    }

    #[test]
    fn test_proxy_defaults() {
        let config = NodeConfig::from_toml_str(SAMPLE).unwrap();
        let options = config.proxy.options();

        assert!(options.selector.sticky);
        assert!(options.selector.verify_singleton);
        assert_eq!(options.backoff, Backoff::Fixed(Duration::from_millis(10)));
        assert_eq!(config.proxy.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_proxy_backoff_variants() {
        let none = ProxyConfig {
            retry_delay_ms: 0,
            ..ProxyConfig::default()
        };
        assert_eq!(none.backoff(), Backoff::None);

        let exponential = ProxyConfig {
            retry_delay_ms: 20,
            max_retry_delay_ms: Some(500),
            ..ProxyConfig::default()
        };
        assert_eq!(
            exponential.backoff(),
            Backoff::Exponential {
                initial: Duration::from_millis(20),
                max: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn test_rejects_invalid_configs() {
        let empty_id = r#"
            node_id = ""
            bind = "127.0.0.1:6001"
        "#;
        assert!(matches!(
            NodeConfig::from_toml_str(empty_id),
            Err(ConfigError::Invalid(_))
        ));

        let self_peer = r#"
            node_id = "a"
            bind = "127.0.0.1:6001"
            peers = [{ id = "a", addr = "127.0.0.1:6002" }]
        "#;
        assert!(matches!(
            NodeConfig::from_toml_str(self_peer),
            Err(ConfigError::Invalid(_))
        ));

        let duplicate_peer = r#"
            node_id = "a"
            bind = "127.0.0.1:6001"
            peers = [
                { id = "b", addr = "127.0.0.1:6002" },
                { id = "b", addr = "127.0.0.1:6003" },
            ]
        "#;
        assert!(matches!(
            NodeConfig::from_toml_str(duplicate_peer),
            Err(ConfigError::Invalid(_))
        ));

        let unknown_service = r#"
            node_id = "a"
            bind = "127.0.0.1:6001"
            deploy = ["calculator", "weather"]
        "#;
        assert!(matches!(
            NodeConfig::from_toml_str(unknown_service),
            Err(ConfigError::Invalid(_))
        ));

        let deployed_twice = r#"
            node_id = "a"
            bind = "127.0.0.1:6001"
            deploy = ["echo", "echo"]
        "#;
        assert!(matches!(
            NodeConfig::from_toml_str(deployed_twice),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            NodeConfig::from_toml_str("node_id = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_demo_configs_split_services_between_nodes() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs");
        let node1 = NodeConfig::load(dir.join("node-1.toml")).unwrap();
        let node2 = NodeConfig::load(dir.join("node-2.toml")).unwrap();

        assert_eq!(node1.deploy, vec!["calculator".to_string()]);
        assert_eq!(node2.deploy, vec!["echo".to_string()]);

        // Each node's topology sends the other node's service over the wire.
        for (config, remote_service, peer) in [(&node1, "echo", "node-2"), (&node2, "calculator", "node-1")] {
            assert!(!config.deploy.iter().any(|name| name == remote_service));
            let topologies = config.topologies();
            let (_, snapshot) = topologies
                .iter()
                .find(|(name, _)| name == remote_service)
                .unwrap();
            assert_eq!(snapshot.get(&NodeId::from(peer)), Some(&1));
            assert!(!snapshot.contains_key(&config.local_node().id));
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.node_id, "node-1");

        let missing = NodeConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
