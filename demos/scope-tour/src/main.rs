//! Scope tour
//!
//! Builds a global -> org -> project hierarchy, connects two peers, propagates
//! a status change into the org and prints what each peer received.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use scopemesh::prelude::*;
use scopemesh::{FanOutError, PropagationStats};
use scopemesh_logging::{FileSink, LogConfig, MeshSubscriberBuilder};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Parser)]
#[command(name = "scope-tour", about = "Walk through scope registration, discovery and fan-out")]
struct Cli {
    /// Architecture config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Human-readable log output instead of JSON lines
    #[arg(long)]
    pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write daily-rotated JSONL logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// Transport that records deliveries in memory after a short delay
#[derive(Default)]
struct InboxTransport {
    inbox: Arc<Mutex<Vec<(PeerId, StateUpdate)>>>,
}

#[async_trait]
impl PeerTransport for InboxTransport {
    async fn send(&self, peer: &Peer, update: &StateUpdate) -> Result<(), FanOutError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.inbox.lock().await.push((peer.id.clone(), update.clone()));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.pretty {
        LogConfig::development()
    } else {
        LogConfig::default()
    };
    let mut logging = MeshSubscriberBuilder::new()
        .with_config(log_config)
        .with_level(&cli.log_level);
    if let Some(dir) = &cli.log_dir {
        logging = logging.with_file_output(FileSink::in_dir(dir));
    }
    // Dropping the guard flushes the file writer
    let _guard = logging.init()?;

    let config = match &cli.config {
        Some(path) => ArchitectureConfig::load(path)?,
        None => ArchitectureConfig::default(),
    };

    let transport = InboxTransport::default();
    let inbox = Arc::clone(&transport.inbox);

    let arch = MultiScopeArchitecture::builder()
        .config(config)
        .transport(transport)
        .build()?;
    let mut events = arch.subscribe();

    arch.register_scope(Scope::new("global", ScopeKind::global()))?;
    arch.register_scope(Scope::new("org-1", ScopeKind::org()).with_parent("global"))?;
    arch.register_scope(Scope::new("project-1", ScopeKind::project()).with_parent("org-1"))?;

    arch.connect_peer(Peer::new("peer-1", "10.0.0.1:7000").with_scopes(["org-1"]))?;
    arch.connect_peer(Peer::new("peer-2", "10.0.0.2:7000").with_scopes(["project-1"]))?;

    let org = ScopeId::from("org-1");
    let mut delta = StateMap::new();
    delta.insert("status".to_string(), json!("active"));
    arch.propagate_state(&org, delta)?;

    while let Ok(event) = events.try_recv() {
        info!(?event, "Event");
    }

    let scope = arch.get_scope(&org)?;
    println!("Scope {} ({}):", scope.id, scope.kind);
    println!("  state:      {}", serde_json::to_string(&scope.state)?);
    println!("  updated_at: {}", scope.updated_at);

    let ancestors = arch.ancestors(&ScopeId::from("project-1"))?;
    println!(
        "Ancestors of project-1: {}",
        ancestors
            .iter()
            .map(ScopeId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    println!("Active peers: {}", arch.active_peers().len());
    for peer in arch.discover_peers(&org) {
        println!("  serves {}: {} @ {}", org, peer.id, peer.address);
    }

    // Deliveries run on background tasks
    tokio::time::sleep(Duration::from_millis(200)).await;
    for (peer_id, update) in inbox.lock().await.iter() {
        println!(
            "Delivered to {}: {} -> {}",
            peer_id,
            update.scope_id,
            serde_json::to_string(&update.delta)?
        );
    }

    let PropagationStats {
        propagations,
        recipients,
        fan_out_failures,
    } = arch.stats();
    println!("Propagations: {propagations}, recipients: {recipients}, failures: {fan_out_failures}");

    arch.shutdown();
    Ok(())
}
