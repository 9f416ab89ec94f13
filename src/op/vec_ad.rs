//! Dynamically indexed arrays.
//!
//! Every array element is either a variable or a parameter at any point of
//! an order-0 sweep. A load resolves its index at order 0 and records which
//! variable it read (or none, for a parameter element); higher orders and
//! the reverse sweep reuse that binding instead of re-reading the array.

use crate::error::{AdError, Result};
use crate::float::Float;
use crate::index::ParIndex;
use crate::sweep::{Partials, TaylorStore};
use crate::tape::VecAdInfo;

use super::{arith, Orders};

/// Current content of one array element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Var(u32),
    Par(u32),
}

/// Element contents of every array of a tape, in element-space order.
#[derive(Clone, Debug, Default)]
pub(crate) struct ArrayState {
    slots: Vec<Slot>,
}

impl ArrayState {
    /// Restore the recorded initial parameters.
    pub fn reset(&mut self, init: &[ParIndex]) {
        self.slots.clear();
        self.slots.extend(init.iter().map(|p| Slot::Par(p.0)));
    }

    #[inline]
    pub fn get(&self, element: usize) -> Slot {
        self.slots[element]
    }

    #[inline]
    pub fn set(&mut self, element: usize, slot: Slot) {
        self.slots[element] = slot;
    }
}

/// Element position of `array[value]`, truncating `value` toward zero.
pub(crate) fn element<F: Float>(value: F, array: u32, info: VecAdInfo, op: usize) -> Result<usize> {
    let index = value.to_i64();
    match index {
        Some(i) if i >= 0 && (i as u64) < u64::from(info.len) => Ok(info.offset as usize + i as usize),
        _ => Err(AdError::VecAdIndex {
            array,
            index: index.unwrap_or(i64::MIN),
            len: info.len as usize,
            op,
        }),
    }
}

/// Load through a binding resolved at order 0. `bound` is `None` when the
/// element held a parameter, whose value is `value`.
pub(crate) fn load<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, bound: Option<usize>, value: F) {
    match bound {
        Some(v) => arith::copy(t, o, z, v),
        None => arith::constant(t, o, z, value),
    }
}

pub(crate) fn rev_load<F: Float>(pd: &mut Partials<F>, d: usize, z: usize, bound: Option<usize>) {
    if let Some(v) = bound {
        arith::rev_linear(pd, d, z, v, F::one());
    }
}
