//! Single-decree CASPaxos: a replicated compare-and-swap register protocol.
//!
//! Clients address opaque byte-string values by key and update them through
//! change functions, replicated across a set of acceptors. Any proposer may
//! coordinate an update; concurrent proposers are resolved by ballot ordering
//! at the acceptors.
//!
//! # Architecture
//!
//! - [`proposer::Proposer`]: allocates ballots, runs the two-phase protocol
//!   against the acceptor set, and applies the caller's change function
//! - [`acceptor::MemoryAcceptor`]: per-key promise/accept state machine
//! - [`acceptor::Acceptor`]: the transport seam; implemented in-process here
//!   and over HTTP by the transport crate
//!
//! # Quick Start
//!
//! ```ignore
//! use caspaxos::{MemoryAcceptor, Proposer, change};
//! use tokio_util::sync::CancellationToken;
//!
//! let acceptors = vec![
//!     MemoryAcceptor::new("a1"),
//!     MemoryAcceptor::new("a2"),
//!     MemoryAcceptor::new("a3"),
//! ];
//! let proposer = Proposer::new(1, acceptors);
//!
//! let cancel = CancellationToken::new();
//! let value = proposer.propose("greeting", change::read(), &cancel).await?;
//! ```
//!
//! Reference: <https://arxiv.org/abs/1802.07000>

#![warn(clippy::pedantic)]

pub mod acceptor;
pub mod ballot;
pub mod change;
mod error;
pub mod proposer;

pub use acceptor::{Acceptor, MemoryAcceptor, Prepared, Record};
pub use ballot::{Ballot, ParseBallotError};
pub use change::Value;
pub use error::{AcceptorError, ProposeError, TransportError};
pub use proposer::Proposer;
