//! HTTP transport for the CASPaxos register store.
//!
//! Two surfaces share this crate:
//!
//! - The acceptor wire API ([`acceptor::router`] server side,
//!   [`client::HttpAcceptor`] client side). Ballots travel out-of-band in the
//!   `X-Caspaxos-Ballot` header; protocol conflicts map to dedicated statuses
//!   (412 for prepare, 406 for accept) so they stay distinguishable from
//!   transport faults.
//! - The client-facing register API ([`proposer::router`]): linearizable
//!   reads and compare-and-swap over a proposer.

pub mod acceptor;
pub mod client;
pub mod proposer;

use axum::http::HeaderMap;
use caspaxos::Ballot;

/// Header carrying the ballot on acceptor requests and responses, formatted
/// as `counter/id`.
pub const BALLOT_HEADER: &str = "X-Caspaxos-Ballot";

/// Extract the mandatory ballot header. The error text becomes the 400 body.
fn ballot_from_headers(headers: &HeaderMap) -> Result<Ballot, String> {
    let Some(raw) = headers.get(BALLOT_HEADER) else {
        return Err(format!("{BALLOT_HEADER} not provided"));
    };
    let Ok(raw) = raw.to_str() else {
        return Err(format!("{BALLOT_HEADER} is not valid ASCII"));
    };
    raw.parse()
        .map_err(|_| format!("{BALLOT_HEADER} has invalid format {raw:?}"))
}
