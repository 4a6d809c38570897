use anyhow::Context;
use service_grid::cluster::{ClusterView, StaticCluster};
use service_grid::config::NodeConfig;
use service_grid::grid::GridNode;
use service_grid::proxy::HttpDispatch;
use service_grid::proxy::handlers::router;
use service_grid::service::{LocalServiceRegistry, ServiceRegistry, builtin};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} --config <node.toml> [--bind <addr:port>]", args[0]);
        eprintln!("Example: {} --config node-1.toml", args[0]);
        eprintln!(
            "Example: {} --config node-2.toml --bind 127.0.0.1:6002",
            args[0]
        );

        std::process::exit(1);
    }

    let mut config_path: Option<PathBuf> = None;
    let mut bind_override: Option<SocketAddr> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let value = args.get(i + 1).context("--config needs a path")?;
                config_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--bind" => {
                let value = args.get(i + 1).context("--bind needs an address")?;
                bind_override = Some(value.parse()?);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let config_path = config_path.context("--config is required")?;
    let mut config = NodeConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(bind) = bind_override {
        config.bind = bind;
    }

    tracing::info!("Starting node {} on {}", config.node_id, config.bind);

    // 1. Membership:
    let cluster = StaticCluster::new(config.local_node());
    for peer in config.peer_nodes() {
        cluster.join(peer);
    }

    // 2. Services:
    let registry = LocalServiceRegistry::new(cluster.local_node().id);
    for (name, topology) in config.topologies() {
        registry.set_topology(&name, topology);
    }
    for name in &config.deploy {
        let service = builtin(name).with_context(|| format!("unknown built-in service {}", name))?;
        registry.deploy_local(service);
    }

    // 3. Proxies and transport:
    let dispatch = Arc::new(HttpDispatch::new(
        cluster.clone(),
        config.proxy.request_timeout(),
    ));
    let grid = GridNode::new(cluster.clone(), registry.clone(), dispatch, config.proxy.options());

    // 4. HTTP Router:
    let app = router(grid.clone());

    // 5. Spawn stats reporter:
    let stats_registry = registry.clone();
    let stats_cluster = cluster.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));

        loop {
            interval.tick().await;
            tracing::info!(
                "Cluster stats: {} alive nodes",
                stats_cluster.get_alive_members().len()
            );
            for service in stats_registry.deployed_services() {
                tracing::info!(
                    "  - {} ({} instances): {:?}",
                    service.name,
                    service.total_instances(),
                    service.topology
                );
            }
        }
    });

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let shutdown_grid = grid.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            shutdown_grid.shutdown();
        })
        .await?;

    Ok(())
}
