//! Change functions: pure transforms from the current register value to the
//! next one.
//!
//! The protocol does not distinguish reads from writes; both are a change
//! function applied to the value recovered during the prepare phase. Change
//! functions must be deterministic and side-effect free. Taking them as
//! `FnOnce` makes the at-most-once invocation per proposal a compile-time
//! fact.

use bytes::Bytes;

/// Register values are opaque byte strings. The empty value doubles as
/// "key does not exist".
pub type Value = Bytes;

/// The identity change. Proposing it performs a linearizable read.
#[must_use]
pub fn read() -> impl FnOnce(Value) -> Value {
    |current| current
}

/// Compare-and-swap: moves the register to `next` only when it currently
/// holds `expected`. On mismatch the register keeps the current value and the
/// proposer returns it, so callers detect failure by comparing the result
/// against `next`.
#[must_use]
pub fn cas(expected: Value, next: Value) -> impl FnOnce(Value) -> Value {
    move |current| {
        if current == expected {
            next
        } else {
            current
        }
    }
}
