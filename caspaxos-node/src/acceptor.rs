//! Acceptor mode: volatile per-key storage behind the acceptor wire API.

use std::sync::Arc;

use caspaxos::MemoryAcceptor;
use tracing::info;

use crate::address::{Address, advertise_addr};
use crate::{AcceptorArgs, DEFAULT_API_PORT, DEFAULT_CLUSTER_PORT};

pub(crate) async fn run(args: AcceptorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let api = Address::parse(&args.api, DEFAULT_API_PORT)?;
    let cluster = Address::parse(&args.cluster, DEFAULT_CLUSTER_PORT)?;
    let advertise = advertise_addr(
        &cluster,
        args.cluster_advertise_addr.as_deref(),
        &args.peers,
        DEFAULT_CLUSTER_PORT,
    )?;

    // State is volatile on purpose: a restarted acceptor comes back cold and
    // rejoins under the same advertised identity.
    let acceptor = Arc::new(MemoryAcceptor::new(advertise.host_port()));

    let listener = tokio::net::TcpListener::bind((api.host.as_str(), api.port)).await?;
    info!(addr = %listener.local_addr()?, identity = %advertise.host_port(), "acceptor API listening");

    axum::serve(listener, caspaxos_http::acceptor::router(acceptor))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub(crate) async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
