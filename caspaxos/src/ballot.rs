//! Ballot numbers: per-proposer logical clocks, totally ordered.

use core::fmt;
use core::str::FromStr;

/// A ballot `(counter, id)`, compared counter-first. The derived ordering on
/// the declared field order is exactly the lexicographic order the protocol
/// requires.
///
/// The zero ballot `(0, 0)` is smaller than any ballot a live proposer can
/// allocate; `id` is the proposer identity and is never zero for a real
/// proposal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ballot {
    pub counter: u64,
    pub id: u64,
}

impl Ballot {
    #[must_use]
    pub const fn new(counter: u64, id: u64) -> Self {
        Self { counter, id }
    }

    /// The zero ballot: nothing promised, nothing accepted.
    #[must_use]
    pub const fn zero() -> Self {
        Self { counter: 0, id: 0 }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.counter == 0 && self.id == 0
    }
}

/// Wire format `counter/id`, both base-10. Protocol-observable: this exact
/// encoding travels in the `X-Caspaxos-Ballot` header.
impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.counter, self.id)
    }
}

/// Rejected `counter/id` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseBallotError;

impl fmt::Display for ParseBallotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected ballot as counter/id with base-10 components")
    }
}

impl core::error::Error for ParseBallotError {}

impl FromStr for Ballot {
    type Err = ParseBallotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (counter, id) = s.split_once('/').ok_or(ParseBallotError)?;
        Ok(Self {
            counter: counter.parse().map_err(|_| ParseBallotError)?,
            id: id.parse().map_err(|_| ParseBallotError)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_smallest() {
        assert!(Ballot::zero() < Ballot::new(0, 1));
        assert!(Ballot::zero() < Ballot::new(1, 0));
        assert!(Ballot::zero().is_zero());
        assert!(!Ballot::new(0, 1).is_zero());
        assert_eq!(Ballot::zero(), Ballot::default());
    }

    #[test]
    fn ordering_is_counter_major() {
        assert!(Ballot::new(1, 9) < Ballot::new(2, 1));
        assert!(Ballot::new(2, 1) < Ballot::new(2, 2));
        assert_eq!(Ballot::new(3, 4), Ballot::new(3, 4));
        assert!(Ballot::new(u64::MAX, 0) > Ballot::new(u64::MAX - 1, u64::MAX));
    }

    #[test]
    fn encoding_round_trips() {
        for ballot in [
            Ballot::zero(),
            Ballot::new(1, 2),
            Ballot::new(u64::MAX, u64::MAX),
            Ballot::new(0, 17),
        ] {
            let encoded = ballot.to_string();
            assert_eq!(encoded.parse::<Ballot>(), Ok(ballot), "encoded as {encoded}");
        }
    }

    #[test]
    fn malformed_encodings_reject() {
        for input in [
            "", "1", "1/", "/1", "/", "1/2/3", "a/1", "1/b", "1 /2", "1/ 2", "-1/2", "1/-2",
            "18446744073709551616/1",
        ] {
            assert_eq!(
                input.parse::<Ballot>(),
                Err(ParseBallotError),
                "input {input:?}"
            );
        }
    }
}
