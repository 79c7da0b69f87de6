use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use replicated_records::cluster::{ClusterManager, StaticCluster};
use replicated_records::config::NodeConfig;
use replicated_records::graph::MemoryGraph;
use replicated_records::replication::{NodeRuntime, ReplicationCoordinator};
use replicated_records::storage::MemoryStore;
use replicated_records::task::{Database, TaskFactory};
use replicated_records::transport::HttpTransport;
use replicated_records::transport::handlers::*;
use replicated_records::transport::protocol::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --config <file.json> | --bind <addr:port> [--name <node>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:7000 --name node-a", args[0]);
        eprintln!("Example: {} --config node-b.json", args[0]);

        std::process::exit(1);
    }

    let mut config_path: Option<PathBuf> = None;
    let mut bind_addr: Option<SocketAddr> = None;
    let mut node_name: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        let value = || {
            args.get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("{} needs a value", args[i]))
        };
        match args[i].as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(value()?));
                i += 2;
            }
            "--bind" => {
                bind_addr = Some(value()?.parse()?);
                i += 2;
            }
            "--name" => {
                node_name = Some(value()?.clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let mut config = match &config_path {
        Some(path) => NodeConfig::from_file(path)?,
        None => {
            let bind_addr =
                bind_addr.ok_or_else(|| anyhow::anyhow!("--bind or --config is required"))?;
            NodeConfig::local("node-1", bind_addr)
        }
    };
    if let Some(bind_addr) = bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(node_name) = node_name {
        config.node_name = node_name;
    }
    config.validate()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        "Starting node {} on {} (protocol v{})",
        config.node_name,
        config.bind_addr,
        config.protocol_version
    );

    // 1. Task kinds and cluster view:
    let factory = TaskFactory::for_protocol(config.protocol_version);
    let cluster = StaticCluster::from_config(&config, factory.clone());

    // 2. Storage layer:
    let store = MemoryStore::new();
    let graph = MemoryGraph::new(store.clone());
    let database = Database::new(&config.database, store, graph);

    // 3. Replication:
    let runtime = NodeRuntime::new(cluster.clone(), factory, database);
    let transport = Arc::new(HttpTransport::from_config(&config));
    let coordinator = Arc::new(ReplicationCoordinator::new(
        runtime.clone(),
        transport.clone(),
        config.quorum,
    ));

    // 4. HTTP Router:
    let app = Router::new()
        .route(ENDPOINT_EXECUTE_TASK, post(handle_execute_task))
        .route(ENDPOINT_TASK_KINDS, get(handle_task_kinds))
        .route(ENDPOINT_REPLICATE, post(handle_replicate::<HttpTransport>))
        .layer(Extension(runtime))
        .layer(Extension(coordinator))
        .layer(Extension(cluster.clone()));

    // 5. Spawn protocol refresher:
    let peers: Vec<String> = config.peers.iter().map(|peer| peer.name.clone()).collect();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));

        loop {
            interval.tick().await;
            for peer in &peers {
                match transport.fetch_task_kinds(peer).await {
                    Ok(kinds) => {
                        let known = cluster
                            .task_factory(peer)
                            .map(|factory| factory.protocol_version())
                            .ok();
                        if known != Some(kinds.protocol_version) {
                            let factory = TaskFactory::for_protocol(kinds.protocol_version);
                            cluster.advertise(peer, factory);
                        }
                    }
                    Err(e) => tracing::debug!("Peer {} not reachable: {}", peer, e),
                }
            }
        }
    });

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
