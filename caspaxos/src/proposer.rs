//! Proposer: ballot allocation and the two-phase protocol.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::acceptor::{Acceptor, Prepared};
use crate::ballot::Ballot;
use crate::change::Value;
use crate::error::ProposeError;

/// Coordinates proposals against a captured snapshot of the acceptor set.
///
/// The proposer is shared-state concurrent: any number of `propose` calls may
/// run at once. Each call allocates its own ballot; the counter advance is
/// the only synchronization between them, so calls may complete out of
/// allocation order. Retrying failed proposals is the caller's business.
pub struct Proposer<A> {
    id: u64,
    counter: AtomicU64,
    acceptors: Vec<A>,
}

impl<A> Proposer<A> {
    /// Build a proposer with a fixed identity over a membership snapshot.
    ///
    /// # Panics
    ///
    /// Panics when `id` is zero: the zero id is reserved so that the zero
    /// ballot sorts below every real proposal.
    #[must_use]
    pub fn new(id: u64, acceptors: Vec<A>) -> Self {
        assert!(id != 0, "proposer id must be nonzero");
        Self {
            id,
            counter: AtomicU64::new(0),
            acceptors,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn acceptors(&self) -> &[A] {
        &self.acceptors
    }

    fn next_ballot(&self) -> Ballot {
        let counter = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ballot::new(counter, self.id)
    }

    /// Advance the counter past an observed competing ballot so every future
    /// allocation dominates it.
    fn fast_forward(&self, observed: Ballot) {
        self.counter.fetch_max(observed.counter, Ordering::SeqCst);
    }
}

impl<A: Acceptor> Proposer<A> {
    /// Run one proposal: prepare at a quorum, apply `change` to the value the
    /// quorum recovered, and commit the result at a quorum.
    ///
    /// Returns the chosen value, which is `change`'s output whether or not it
    /// differs from the recovered value; an unchanged value still goes
    /// through the accept round so the caller observes a consistent outcome.
    ///
    /// Cancelling the token aborts outstanding RPCs and fails the call with
    /// [`ProposeError::Cancelled`].
    ///
    /// # Errors
    ///
    /// Fails without retrying when the snapshot is empty, when either phase
    /// falls short of a quorum, or on cancellation.
    pub async fn propose<F>(
        &self,
        key: &str,
        change: F,
        cancel: &CancellationToken,
    ) -> Result<Value, ProposeError>
    where
        F: FnOnce(Value) -> Value,
    {
        let quorum = match self.acceptors.len() {
            0 => return Err(ProposeError::NoAcceptors),
            n => n / 2 + 1,
        };
        let ballot = self.next_ballot();
        debug!(%key, %ballot, quorum, "starting proposal");

        let previous = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProposeError::Cancelled),
            previous = self.prepare_phase(key, ballot, quorum) => previous?,
        };

        let next = change(previous);

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProposeError::Cancelled),
            confirmed = self.accept_phase(key, ballot, next.clone(), quorum) => confirmed?,
        }

        debug!(%key, %ballot, "proposal chosen");
        Ok(next)
    }

    /// Phase 1 fan-out. Resolves to the value accepted under the highest
    /// ballot across a quorum of promises, or fails once a quorum can no
    /// longer be reached. Dropping the in-flight remainder cancels it.
    async fn prepare_phase(
        &self,
        key: &str,
        ballot: Ballot,
        quorum: usize,
    ) -> Result<Value, ProposeError> {
        let mut replies: FuturesUnordered<_> = self
            .acceptors
            .iter()
            .map(|acceptor| async move { (acceptor.address(), acceptor.prepare(key, ballot).await) })
            .collect();

        let allowed_failures = self.acceptors.len() - quorum;
        let mut prepared: Vec<Prepared> = Vec::with_capacity(quorum);
        let mut failures = 0;
        let mut highest = ballot;

        while let Some((address, reply)) = replies.next().await {
            match reply {
                Ok(reply) => {
                    trace!(address, accepted = %reply.accepted, "promise");
                    prepared.push(reply);
                    if prepared.len() >= quorum {
                        break;
                    }
                }
                Err(err) => {
                    if let Some(current) = err.conflict_ballot() {
                        highest = highest.max(current);
                    }
                    debug!(address, error = %err, "prepare rejected");
                    failures += 1;
                    if failures > allowed_failures {
                        break;
                    }
                }
            }
        }
        drop(replies);
        self.fast_forward(highest);

        if prepared.len() < quorum {
            return Err(ProposeError::PrepareQuorumFailed { highest });
        }

        // With no prior accept anywhere, every reply carries the zero ballot
        // and an empty value, so max selection degenerates to "absent".
        let previous = prepared
            .into_iter()
            .max_by_key(|reply| reply.accepted)
            .map(|reply| reply.value)
            .unwrap_or_default();
        Ok(previous)
    }

    /// Phase 2 fan-out. Requires a quorum of confirmations for the chosen
    /// value.
    async fn accept_phase(
        &self,
        key: &str,
        ballot: Ballot,
        value: Value,
        quorum: usize,
    ) -> Result<(), ProposeError> {
        let mut replies: FuturesUnordered<_> = self
            .acceptors
            .iter()
            .map(|acceptor| {
                let value = value.clone();
                async move { (acceptor.address(), acceptor.accept(key, ballot, value).await) }
            })
            .collect();

        let allowed_failures = self.acceptors.len() - quorum;
        let mut confirmed = 0;
        let mut failures = 0;
        let mut highest = ballot;

        while let Some((address, reply)) = replies.next().await {
            match reply {
                Ok(()) => {
                    trace!(address, "accept confirmed");
                    confirmed += 1;
                    if confirmed >= quorum {
                        break;
                    }
                }
                Err(err) => {
                    if let Some(current) = err.conflict_ballot() {
                        highest = highest.max(current);
                    }
                    debug!(address, error = %err, "accept rejected");
                    failures += 1;
                    if failures > allowed_failures {
                        break;
                    }
                }
            }
        }
        drop(replies);
        self.fast_forward(highest);

        if confirmed < quorum {
            return Err(ProposeError::AcceptQuorumFailed);
        }
        Ok(())
    }
}
