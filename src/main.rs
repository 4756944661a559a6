//! Runs a chained HotStuff cluster over a simulated network and prints
//! per-replica metrics.
//!
//! ```bash
//! hotstuff-sim --replicas 8 --rounds 6 --network-delay-ms 3
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use hotstuff_sim::{
    config::RunConfig,
    network::{Cluster, ClusterError, SignatureScheme},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Signatures {
    Placeholder,
    Ed25519,
}

impl From<Signatures> for SignatureScheme {
    fn from(signatures: Signatures) -> Self {
        match signatures {
            Signatures::Placeholder => SignatureScheme::Placeholder,
            Signatures::Ed25519 => SignatureScheme::Ed25519,
        }
    }
}

/// Chained HotStuff simulator
#[derive(Parser, Debug)]
#[command(name = "hotstuff-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of replicas (replica 0 leads)
    #[arg(short = 'n', long, default_value = "4")]
    replicas: usize,

    /// Number of views to drive
    #[arg(short = 'r', long, default_value = "6")]
    rounds: u64,

    /// Payload size in bytes every message is padded or truncated to
    #[arg(long, default_value = "4096")]
    tx_size: usize,

    /// One-way network delay in milliseconds
    #[arg(long, default_value = "1")]
    network_delay_ms: u64,

    /// Vote signature scheme
    #[arg(long, value_enum, default_value = "placeholder")]
    signatures: Signatures,
}

#[tokio::main]
async fn main() -> Result<(), ClusterError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,hotstuff_sim=info")),
        )
        .init();

    let args = Args::parse();
    info!(
        replicas = args.replicas,
        rounds = args.rounds,
        tx_size = args.tx_size,
        network_delay_ms = args.network_delay_ms,
        "starting simulation"
    );

    let config = RunConfig::new(args.replicas)
        .with_tx_size(args.tx_size)
        .with_network_delay(Duration::from_millis(args.network_delay_ms));
    let cluster = Cluster::start(config, args.signatures.into())?;

    for round in 1..=args.rounds {
        cluster.submit(format!("cmd-{round}")).await?;
    }
    let started = std::time::Instant::now();
    let report = cluster.run_rounds(args.rounds).await?;
    let elapsed = started.elapsed();
    cluster.shutdown();

    println!(
        "\n=== Simulation Complete ({} replicas, {} ms) ===",
        args.replicas,
        elapsed.as_millis()
    );
    println!(
        "{:>8} {:>8} {:>10} {:>14} {:>10} {:>9}",
        "replica", "sent", "received", "avg latency", "consensus", "executed"
    );
    for replica in &report.replicas {
        let metrics = &replica.status.metrics;
        println!(
            "{:>8} {:>8} {:>10} {:>14} {:>10} {:>9}",
            replica.status.id,
            metrics.messages_sent,
            metrics.messages_received,
            format!("{:?}", metrics.average_latency()),
            metrics.reached_consensus,
            replica.executed.len()
        );
    }
    println!("All replicas reached consensus: {}", report.all_reached_consensus());

    Ok(())
}
