//! CASPaxos register store node.
//!
//! Runs either an acceptor (the replicated storage side) or a proposer (the
//! client-facing side) over the HTTP transport.

mod acceptor;
mod address;
mod proposer;

use clap::{Args as ClapArgs, Parser, Subcommand};

const DEFAULT_API_PORT: u16 = 8050;
const DEFAULT_CLUSTER_PORT: u16 = 8051;

#[derive(Parser, Debug)]
#[command(name = "caspaxos-node")]
#[command(about = "Run a CASPaxos register store node")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run as an acceptor
    Acceptor(AcceptorArgs),
    /// Run as a proposer
    Proposer(ProposerArgs),
}

#[derive(ClapArgs, Debug)]
struct AcceptorArgs {
    /// Listen address for the HTTP API
    #[arg(long, default_value = "tcp://0.0.0.0:8050")]
    api: String,

    /// Listen address for cluster comms
    #[arg(long, default_value = "tcp://0.0.0.0:8051")]
    cluster: String,

    /// Explicit address to advertise in the cluster
    #[arg(long = "cluster-advertise-addr")]
    cluster_advertise_addr: Option<String>,

    /// Cluster peer host:port (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[derive(ClapArgs, Debug)]
struct ProposerArgs {
    /// Log debug information
    #[arg(long)]
    debug: bool,

    /// Listen address for the HTTP API
    #[arg(long, default_value = "tcp://0.0.0.0:8050")]
    api: String,

    /// Listen address for cluster comms
    #[arg(long, default_value = "tcp://0.0.0.0:8051")]
    cluster: String,

    /// Explicit address to advertise in the cluster
    #[arg(long = "cluster-advertise-addr")]
    cluster_advertise_addr: Option<String>,

    /// Acceptor peer host:port (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Per-request proposal deadline in seconds
    #[arg(long, default_value_t = 5)]
    propose_timeout_secs: u64,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.mode {
        Mode::Acceptor(args) => {
            init_tracing(false);
            acceptor::run(args).await
        }
        Mode::Proposer(args) => {
            init_tracing(args.debug);
            proposer::run(args).await
        }
    }
}
