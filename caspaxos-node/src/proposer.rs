//! Proposer mode: the client-facing register API over a captured acceptor
//! snapshot.

use std::sync::Arc;
use std::time::Duration;

use caspaxos::Proposer;
use caspaxos_http::client::HttpAcceptor;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::address::{Address, advertise_addr};
use crate::{DEFAULT_API_PORT, DEFAULT_CLUSTER_PORT, ProposerArgs};

pub(crate) async fn run(args: ProposerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let api = Address::parse(&args.api, DEFAULT_API_PORT)?;
    let cluster = Address::parse(&args.cluster, DEFAULT_CLUSTER_PORT)?;
    let advertise = advertise_addr(
        &cluster,
        args.cluster_advertise_addr.as_deref(),
        &args.peers,
        DEFAULT_CLUSTER_PORT,
    )?;

    // Membership is a snapshot captured once at startup; changing the
    // acceptor set means restarting the proposer.
    let acceptors = snapshot(&args.peers)?;
    info!(count = acceptors.len(), "captured acceptor snapshot");

    let id = proposer_id(&advertise.host_port());
    debug!(proposer_id = id, "derived proposer identity");

    let proposer = Arc::new(Proposer::new(id, acceptors));

    let listener = tokio::net::TcpListener::bind((api.host.as_str(), api.port)).await?;
    info!(addr = %listener.local_addr()?, "proposer API listening");

    axum::serve(
        listener,
        caspaxos_http::proposer::router(
            proposer,
            Duration::from_secs(args.propose_timeout_secs),
        ),
    )
    .with_graceful_shutdown(crate::acceptor::shutdown_signal())
    .await?;

    Ok(())
}

/// Resolve the peer flags into acceptor clients. One shared HTTP client
/// carries the per-RPC timeouts; the proposal deadline lives in the API
/// layer's cancellation token.
fn snapshot(peers: &[String]) -> Result<Vec<HttpAcceptor>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(1))
        .timeout(Duration::from_secs(3))
        .build()?;

    peers
        .iter()
        .map(|peer| {
            let address = Address::parse(peer, DEFAULT_API_PORT)?;
            let url = Url::parse(&format!("http://{}/", address.host_port()))?;
            debug!(%url, "adding acceptor");
            Ok(HttpAcceptor::with_client(url, client.clone()))
        })
        .collect()
}

/// Stable nonzero identity derived from the advertised address, so a
/// restarted proposer keeps its ballot id.
fn proposer_id(advertise: &str) -> u64 {
    let digest = Sha256::digest(advertise.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let id = u64::from_le_bytes(bytes);
    if id == 0 { 1 } else { id }
}

#[cfg(test)]
mod tests {
    use caspaxos::Acceptor;

    use super::*;

    #[test]
    fn proposer_id_is_stable_and_nonzero() {
        let a = proposer_id("10.0.0.7:8051");
        let b = proposer_id("10.0.0.7:8051");
        let c = proposer_id("10.0.0.8:8051");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, 0);
    }

    #[test]
    fn snapshot_resolves_peers() {
        let acceptors = snapshot(&["10.0.0.7".into(), "10.0.0.8:9000".into()]).unwrap();
        assert_eq!(acceptors.len(), 2);
        assert_eq!(acceptors[0].address(), "http://10.0.0.7:8050/");
        assert_eq!(acceptors[1].address(), "http://10.0.0.8:9000/");
    }
}
