//! Acceptor: the per-key promise/accept state machine.
//!
//! The decision logic is pure and synchronous; [`MemoryAcceptor`] adds the
//! per-process record map and lock. Acceptors are volatile: a crash loses
//! every record and the process restarts cold.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, trace};

use crate::ballot::Ballot;
use crate::change::Value;
use crate::error::AcceptorError;

/// Pure decision functions for the two request types.
pub mod decision {
    use crate::ballot::Ballot;

    /// Prepare succeeds only when the ballot strictly dominates the promise.
    /// A replayed ballot equals the existing promise and is rejected, which
    /// is what keeps duplicate prepares harmless.
    #[must_use]
    pub fn should_promise(ballot: Ballot, promise: Ballot) -> bool {
        ballot > promise
    }

    /// Accept succeeds when the ballot is at least the promise and strictly
    /// above the last accepted ballot. `ballot > promise` happens when this
    /// acceptor missed the prepare round but a quorum elsewhere granted it.
    #[must_use]
    pub fn should_accept(ballot: Ballot, promise: Ballot, accepted: Ballot) -> bool {
        ballot >= promise && ballot > accepted
    }
}

/// A successful prepare reply: the value last accepted at this acceptor and
/// the ballot it was accepted under (zero if never).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prepared {
    pub value: Value,
    pub accepted: Ballot,
}

/// Per-key acceptor state.
///
/// Invariants: `accepted <= promise` at all times, both are non-decreasing
/// over the life of the process, and a zero `accepted` implies an empty
/// `value`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Record {
    pub promise: Ballot,
    pub accepted: Ballot,
    pub value: Value,
}

impl Record {
    /// Process a prepare request. On success the promise advances to
    /// `ballot` and the last accepted value is returned; on conflict the
    /// record is untouched and the highest known ballot comes back for
    /// fast-forwarding.
    pub fn prepare(&mut self, ballot: Ballot) -> Result<Prepared, Ballot> {
        if !decision::should_promise(ballot, self.promise) {
            return Err(self.current());
        }
        self.promise = ballot;
        Ok(Prepared {
            value: self.value.clone(),
            accepted: self.accepted,
        })
    }

    /// Process an accept request. On success the record holds `value` as
    /// accepted under `ballot`; the promise is raised alongside so it never
    /// trails the accepted ballot.
    pub fn accept(&mut self, ballot: Ballot, value: Value) -> Result<(), Ballot> {
        if !decision::should_accept(ballot, self.promise, self.accepted) {
            return Err(self.current());
        }
        self.promise = self.promise.max(ballot);
        self.accepted = ballot;
        self.value = value;
        Ok(())
    }

    /// The highest ballot this record knows about.
    #[must_use]
    pub fn current(&self) -> Ballot {
        self.promise.max(self.accepted)
    }
}

/// The transport seam between proposers and acceptors.
///
/// Implemented in-process by [`MemoryAcceptor`] and over the wire by the
/// transport crate's HTTP client. Errors are per-request; acceptors never
/// retry and never push.
#[expect(async_fn_in_trait)]
pub trait Acceptor: Send + Sync {
    /// Stable identifier for quorum-set membership and de-duplication.
    fn address(&self) -> &str;

    /// Phase 1: reserve `ballot` for `key` and fetch the last accepted value.
    async fn prepare(&self, key: &str, ballot: Ballot) -> Result<Prepared, AcceptorError>;

    /// Phase 2: commit `value` under `ballot` for `key`.
    async fn accept(&self, key: &str, ballot: Ballot, value: Value) -> Result<(), AcceptorError>;
}

impl<A: Acceptor + ?Sized> Acceptor for std::sync::Arc<A> {
    fn address(&self) -> &str {
        (**self).address()
    }

    async fn prepare(&self, key: &str, ballot: Ballot) -> Result<Prepared, AcceptorError> {
        (**self).prepare(key, ballot).await
    }

    async fn accept(&self, key: &str, ballot: Ballot, value: Value) -> Result<(), AcceptorError> {
        (**self).accept(key, ballot, value).await
    }
}

/// In-memory acceptor. Records are created lazily per key and serialized
/// behind one map-level lock.
pub struct MemoryAcceptor {
    address: String,
    records: Mutex<HashMap<String, Record>>,
}

impl MemoryAcceptor {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Acceptor for MemoryAcceptor {
    fn address(&self) -> &str {
        &self.address
    }

    async fn prepare(&self, key: &str, ballot: Ballot) -> Result<Prepared, AcceptorError> {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(key.to_owned()).or_default();
        match record.prepare(ballot) {
            Ok(prepared) => {
                trace!(%key, %ballot, accepted = %prepared.accepted, "promised");
                Ok(prepared)
            }
            Err(current) => {
                debug!(%key, %ballot, %current, "prepare conflict");
                Err(AcceptorError::PrepareConflict { current })
            }
        }
    }

    async fn accept(&self, key: &str, ballot: Ballot, value: Value) -> Result<(), AcceptorError> {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(key.to_owned()).or_default();
        match record.accept(ballot, value) {
            Ok(()) => {
                trace!(%key, %ballot, "accepted");
                Ok(())
            }
            Err(current) => {
                debug!(%key, %ballot, %current, "accept conflict");
                Err(AcceptorError::AcceptConflict {
                    current: Some(current),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn b(counter: u64, id: u64) -> Ballot {
        Ballot::new(counter, id)
    }

    #[test]
    fn prepare_on_fresh_record_promises() {
        let mut record = Record::default();
        let prepared = record.prepare(b(1, 1)).unwrap();
        assert_eq!(prepared.value, Value::new());
        assert_eq!(prepared.accepted, Ballot::zero());
        assert_eq!(record.promise, b(1, 1));
    }

    #[test]
    fn prepare_with_equal_ballot_conflicts() {
        let mut record = Record::default();
        record.prepare(b(1, 1)).unwrap();
        assert_eq!(record.prepare(b(1, 1)), Err(b(1, 1)));
        assert_eq!(record.promise, b(1, 1));
    }

    #[test]
    fn prepare_with_lower_ballot_conflicts_without_mutation() {
        let mut record = Record::default();
        record.prepare(b(5, 1)).unwrap();
        let before = record.clone();
        assert_eq!(record.prepare(b(5, 0)), Err(b(5, 1)));
        assert_eq!(record.prepare(b(4, 9)), Err(b(5, 1)));
        assert_eq!(record, before);
    }

    #[test]
    fn prepare_returns_last_accepted() {
        let mut record = Record::default();
        record.prepare(b(1, 1)).unwrap();
        record.accept(b(1, 1), Value::from_static(b"v")).unwrap();
        let prepared = record.prepare(b(2, 2)).unwrap();
        assert_eq!(prepared.value, Value::from_static(b"v"));
        assert_eq!(prepared.accepted, b(1, 1));
    }

    #[test]
    fn accept_below_promise_conflicts() {
        let mut record = Record::default();
        record.prepare(b(3, 1)).unwrap();
        assert_eq!(record.accept(b(2, 9), Value::from_static(b"v")), Err(b(3, 1)));
        assert_eq!(record.value, Value::new());
    }

    #[test]
    fn accept_at_promise_succeeds() {
        let mut record = Record::default();
        record.prepare(b(3, 1)).unwrap();
        record.accept(b(3, 1), Value::from_static(b"v")).unwrap();
        assert_eq!(record.accepted, b(3, 1));
        assert_eq!(record.value, Value::from_static(b"v"));
    }

    #[test]
    fn accept_above_promise_succeeds_after_missed_prepare() {
        let mut record = Record::default();
        record.accept(b(4, 2), Value::from_static(b"v")).unwrap();
        assert_eq!(record.accepted, b(4, 2));
        assert_eq!(record.promise, b(4, 2));
    }

    #[test]
    fn accept_replay_conflicts() {
        let mut record = Record::default();
        record.prepare(b(1, 1)).unwrap();
        record.accept(b(1, 1), Value::from_static(b"v")).unwrap();
        assert_eq!(record.accept(b(1, 1), Value::from_static(b"w")), Err(b(1, 1)));
        assert_eq!(record.value, Value::from_static(b"v"));
    }

    #[test]
    fn ballots_stay_monotone_under_random_interleavings() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let mut record = Record::default();
            let mut last = record.clone();

            for _ in 0..200 {
                let ballot = b(rng.random_range(0..8), rng.random_range(0..4));
                if rng.random_bool(0.5) {
                    let _ = record.prepare(ballot);
                } else {
                    let value = Value::from(ballot.to_string());
                    let _ = record.accept(ballot, value);
                }

                assert!(record.promise >= last.promise, "promise regressed");
                assert!(record.accepted >= last.accepted, "accepted regressed");
                assert!(record.accepted <= record.promise);
                if record.accepted.is_zero() {
                    assert!(record.value.is_empty());
                }
                last = record.clone();
            }
        }
    }

    #[tokio::test]
    async fn memory_acceptor_tracks_keys_independently() {
        let acceptor = MemoryAcceptor::new("a1");
        acceptor.prepare("x", b(1, 1)).await.unwrap();
        acceptor.accept("x", b(1, 1), Value::from_static(b"vx")).await.unwrap();

        // A fresh key starts from the zero record.
        let prepared = acceptor.prepare("y", b(1, 1)).await.unwrap();
        assert_eq!(prepared.value, Value::new());
        assert_eq!(prepared.accepted, Ballot::zero());

        let prepared = acceptor.prepare("x", b(2, 1)).await.unwrap();
        assert_eq!(prepared.value, Value::from_static(b"vx"));
    }

    #[tokio::test]
    async fn memory_acceptor_reports_conflicts() {
        let acceptor = MemoryAcceptor::new("a1");
        acceptor.prepare("k", b(2, 1)).await.unwrap();

        let err = acceptor.prepare("k", b(1, 9)).await.unwrap_err();
        assert_eq!(err.conflict_ballot(), Some(b(2, 1)));

        let err = acceptor
            .accept("k", b(1, 9), Value::from_static(b"v"))
            .await
            .unwrap_err();
        assert_eq!(err.conflict_ballot(), Some(b(2, 1)));
    }
}
