//! Error taxonomy for the protocol and its transports.

use core::fmt;

use error_stack::Report;

use crate::ballot::Ballot;

/// Marker error for transport-level failures. Wrap in `error_stack::Report`
/// with context attachments for details.
#[derive(Debug)]
pub struct TransportError;

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("acceptor transport failed")
    }
}

impl core::error::Error for TransportError {}

/// A failed reply from a single acceptor.
///
/// Conflicts are protocol-level rejections, not infrastructure faults: a
/// competing ballot dominates the request. Prepare conflicts always carry the
/// acceptor's current ballot so the proposer can fast-forward; accept
/// conflicts carry it when the transport preserves it.
#[derive(Debug)]
pub enum AcceptorError {
    PrepareConflict { current: Ballot },
    AcceptConflict { current: Option<Ballot> },
    Transport(Report<TransportError>),
}

impl AcceptorError {
    /// The ballot carried by a protocol conflict, if any.
    #[must_use]
    pub fn conflict_ballot(&self) -> Option<Ballot> {
        match self {
            Self::PrepareConflict { current } => Some(*current),
            Self::AcceptConflict { current } => *current,
            Self::Transport(_) => None,
        }
    }
}

impl fmt::Display for AcceptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrepareConflict { current } => {
                write!(f, "prepare conflict: dominated by ballot {current}")
            }
            Self::AcceptConflict { current: Some(current) } => {
                write!(f, "accept conflict: dominated by ballot {current}")
            }
            Self::AcceptConflict { current: None } => f.write_str("accept conflict"),
            Self::Transport(report) => write!(f, "transport: {report}"),
        }
    }
}

impl core::error::Error for AcceptorError {}

/// A failed proposal. The proposer never retries on its own; callers see the
/// first fatal condition once the running phase has settled.
#[derive(Debug)]
pub enum ProposeError {
    /// The membership snapshot is empty.
    NoAcceptors,
    /// Fewer than a quorum of acceptors promised. `highest` is the highest
    /// ballot observed across conflict replies (the proposer has already
    /// fast-forwarded past it).
    PrepareQuorumFailed { highest: Ballot },
    /// Fewer than a quorum of acceptors confirmed the accept.
    AcceptQuorumFailed,
    /// The caller's cancellation token fired.
    Cancelled,
}

impl fmt::Display for ProposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcceptors => f.write_str("no acceptors in membership snapshot"),
            Self::PrepareQuorumFailed { highest } => {
                write!(f, "prepare quorum failed (highest ballot seen {highest})")
            }
            Self::AcceptQuorumFailed => f.write_str("accept quorum failed"),
            Self::Cancelled => f.write_str("proposal cancelled"),
        }
    }
}

impl core::error::Error for ProposeError {}
