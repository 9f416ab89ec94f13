//! Error types.
//!
//! Problems a caller can cause (wrong input lengths, sweeps requested out of
//! order, plug-ins returning the wrong number of values) come back as
//! [`AdError`]. Broken tape invariants are bugs in whoever built the tape and
//! abort through [`internal_error`].

use std::fmt::Display;

use thiserror::Error;

/// Errors reported by public entry points.
///
/// Every variant is checked before the sweep that would be affected starts
/// mutating evaluator state, except [`AdError::VecAdIndex`] and the plug-in
/// variants, which can only be discovered while a sweep runs. A sweep that
/// fails that way keeps only the orders below its first order, so a failed
/// zero-order sweep leaves nothing to reverse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdError {
    #[error("{what}: expected length {expected}, got {got}")]
    Length {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("forward order {requested} requested but only orders below {available} are computed")]
    OrderNotReady { requested: usize, available: usize },

    #[error("reverse order {requested} requested but only {available} orders are computed")]
    ReverseNotReady { requested: usize, available: usize },

    #[error("order 0 is direction independent; {directions} directions requested")]
    MultiDirectionOrderZero { directions: usize },

    #[error("reverse mode needs a single direction, store holds {directions}")]
    ReverseMultiDirection { directions: usize },

    #[error("direction count changed from {previous} to {requested} at order {order}")]
    DirectionMismatch {
        previous: usize,
        requested: usize,
        order: usize,
    },

    #[error("plug-in call needs at least one argument and one result (got n = {n}, m = {m})")]
    EmptyAtomicCall { n: usize, m: usize },

    #[error("plug-in `{name}` {phase} returned {got} values, expected {expected}")]
    AtomicResult {
        name: String,
        phase: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("plug-in `{name}` rejected {phase}: {message}")]
    AtomicFailed {
        name: String,
        phase: &'static str,
        message: String,
    },

    #[error("no plug-in registered under id {0}")]
    UnknownAtomic(u32),

    #[error("no discrete function registered under id {0}")]
    UnknownDiscrete(u32),

    #[error("array {array} has length {len}, index {index} is out of range (op {op})")]
    VecAdIndex {
        array: u32,
        index: i64,
        len: usize,
        op: usize,
    },

    #[error("sparsity pattern has {got_sets} sets of end {got_end}, expected {expected_sets} sets of end {expected_end}")]
    PatternShape {
        expected_sets: usize,
        expected_end: usize,
        got_sets: usize,
        got_end: usize,
    },

    #[error("dependent {index} requested, tape has {count}")]
    DependentIndex { index: usize, count: usize },

    #[error("tape has {0} dependents; a scalar function is required")]
    NotScalar(usize),

    #[error("unknown optimize option `{0}`")]
    UnknownOption(String),

    #[error("tape data is inconsistent: {0}")]
    Malformed(String),
}

/// Result alias used across the crate.
pub type Result<T, E = AdError> = std::result::Result<T, E>;

/// Abort on a broken tape invariant.
///
/// Such failures mean a bug in the tape builder or in this crate, so no
/// recovery is attempted; the message carries the op code and tape position
/// of the fault.
#[cold]
#[inline(never)]
#[track_caller]
pub fn internal_error(op: impl Display, position: usize, message: &str) -> ! {
    panic!("adtape internal error at op {position} ({op}): {message}")
}

/// Check a tape invariant, aborting through [`internal_error`] when it fails.
macro_rules! ensure_internal {
    ($cond:expr, $op:expr, $pos:expr, $($msg:tt)+) => {
        if !$cond {
            $crate::error::internal_error($op, $pos, &format!($($msg)+));
        }
    };
}
pub(crate) use ensure_internal;

pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(AdError::Length {
            what,
            expected,
            got,
        })
    }
}
