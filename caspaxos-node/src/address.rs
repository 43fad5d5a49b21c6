//! `[scheme://]host[:port]` address parsing and advertise-address selection.

use core::fmt;
use std::net::IpAddr;

use tracing::{info, warn};

/// A parsed listen or advertise address. The scheme defaults to `tcp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Address {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AddressError {
    input: String,
    reason: &'static str,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.input, self.reason)
    }
}

impl std::error::Error for AddressError {}

impl Address {
    /// Accepts `host`, `host:port`, and `scheme://host[:port]`, filling in
    /// `tcp` and `default_port` where omitted.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, AddressError> {
        let fail = |reason| AddressError {
            input: input.to_owned(),
            reason,
        };

        let input = input.to_lowercase();
        let (scheme, rest) = match input.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("tcp", input.as_str()),
        };
        if scheme.is_empty() {
            return Err(fail("empty scheme"));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse().map_err(|_| fail("invalid port"))?,
            ),
            None => (rest, default_port),
        };
        if host.is_empty() {
            return Err(fail("empty host"));
        }
        if host.contains(':') {
            return Err(fail("invalid host"));
        }

        Ok(Self {
            scheme: scheme.to_owned(),
            host: host.to_owned(),
            port,
        })
    }

    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

fn host_of(peer: &str) -> &str {
    peer.rsplit_once(':').map_or(peer, |(host, _)| host)
}

/// Whether this node's own identity cannot be reached from elsewhere,
/// typically `0.0.0.0` or localhost.
fn is_unroutable(host: &str) -> bool {
    if let Ok(ip) = host.parse::<IpAddr>() {
        ip.is_unspecified() || ip.is_loopback()
    } else {
        host.eq_ignore_ascii_case("localhost")
    }
}

/// Whether a configured peer points back at this machine. Unlike
/// [`is_unroutable`], an unspecified IP such as `0.0.0.0` counts as
/// non-local here.
fn is_peer_local(host: &str) -> bool {
    if let Ok(ip) = host.parse::<IpAddr>() {
        ip.is_loopback()
    } else {
        host.eq_ignore_ascii_case("localhost")
    }
}

fn has_nonlocal(peers: &[String]) -> bool {
    peers.iter().any(|peer| !is_peer_local(host_of(peer)))
}

/// Pick the address this node announces as its stable identity: the explicit
/// advertise flag when given, otherwise the cluster bind address. An
/// unroutable identity is only a problem when the cluster has non-local
/// peers, which gets a warning rather than an error.
pub(crate) fn advertise_addr(
    bind: &Address,
    advertise: Option<&str>,
    peers: &[String],
    default_port: u16,
) -> Result<Address, AddressError> {
    let mut chosen = match advertise {
        Some(explicit) => {
            let mut parsed = Address::parse(explicit, default_port)?;
            if parsed.port == 0 {
                parsed.port = bind.port;
            }
            parsed
        }
        None => bind.clone(),
    };
    if chosen.port == 0 {
        chosen.port = bind.port;
    }

    if has_nonlocal(peers) && is_unroutable(&chosen.host) {
        warn!(addr = %chosen, "this node advertises itself on an unroutable address");
        warn!("this node will be unreachable in the cluster");
        warn!("provide --cluster-advertise-addr as a routable IP address or hostname");
    }
    info!(bind = %bind, advertise = %chosen, "selected advertise address");

    Ok(chosen)
}
