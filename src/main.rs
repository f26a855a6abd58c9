use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use tokio::time::sleep;

use ringleader::election::{ElectionConfig, Node};
use ringleader::{identity, Config, MemoryBus, NodeRole};

/// Run a cluster of election nodes over an in-process message bus and watch
/// them converge on a single master.
#[derive(Parser)]
#[command(name = "ringleader", about = "Master election cluster simulator")]
struct Args {
    /// Number of nodes to run
    #[arg(long, default_value_t = 3)]
    nodes: usize,

    /// JSON config file (timings, id file naming)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding per-node identity files
    #[arg(long, default_value = "./data")]
    id_dir: PathBuf,

    /// How long to run before reporting the outcome, in seconds
    #[arg(long, default_value_t = 30)]
    run_for: u64,

    /// Use sub-second timings instead of the production defaults
    #[arg(long)]
    fast: bool,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let election = if args.fast {
        ElectionConfig {
            election_timeout_ms: 300,
            heartbeat_interval_ms: 200,
            stale_threshold_ms: 700,
            poll_interval_ms: 100,
            election_cooldown_ms: 1_000,
        }
    } else {
        config.election.clone()
    };

    let bus = MemoryBus::new();
    let mut cluster = Vec::with_capacity(args.nodes);

    for i in 0..args.nodes {
        let id_file = args.id_dir.join(format!("{i}-{}", config.id_file));
        let id = identity::load_or_generate(&id_file);
        info!("Starting node {i} with identity {id}");
        let node = Node::start(election.clone(), id, Arc::new(bus.clone()))
            .await
            .context("failed to start node")?;
        cluster.push(node);
    }

    sleep(Duration::from_secs(args.run_for)).await;

    for node in &cluster {
        let id = node.node_id();
        match node.role() {
            NodeRole::Leader => info!("Node {id} is the master"),
            NodeRole::Follower {
                leader: Some(leader),
            } => info!("Node {id} follows {leader}"),
            NodeRole::Follower { leader: None } => {
                info!("Node {id} is a follower with no known master")
            }
            NodeRole::Electing => info!("Node {id} is still electing"),
            NodeRole::Idle => info!("Node {id} has seen no cluster traffic"),
        }
    }

    let masters = cluster.iter().filter(|n| n.is_master()).count();
    if masters != 1 {
        log::warn!(
            "Cluster has {masters} masters after {}s; with production timings the first \
             election takes well over a minute (try --fast)",
            args.run_for
        );
    }
    Ok(())
}
