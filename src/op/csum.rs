//! Cumulative sum: `z = c + Σ add - Σ sub`.

use crate::float::Float;
use crate::sweep::{Partials, TaylorStore};

use super::Orders;

/// `c` is the order-0 constant part (initial parameter plus dynamic
/// parameter terms); `add` and `sub` are variable indices.
pub(crate) fn forward<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, c: F, add: &[u32], sub: &[u32]) {
    if o.has_zero() {
        let mut sum = c;
        for &v in add {
            sum = sum + t.get(v as usize, 0, 0);
        }
        for &v in sub {
            sum = sum - t.get(v as usize, 0, 0);
        }
        t.set(z, 0, 0, sum);
    }
    o.each(|k, ell| {
        let mut sum = F::zero();
        for &v in add {
            sum = sum + t.get(v as usize, k, ell);
        }
        for &v in sub {
            sum = sum - t.get(v as usize, k, ell);
        }
        t.set(z, k, ell, sum);
    });
}

pub(crate) fn reverse<F: Float>(pd: &mut Partials<F>, d: usize, z: usize, add: &[u32], sub: &[u32]) {
    for k in 0..=d {
        let pz = pd.get(z, k);
        if pz == F::zero() {
            continue;
        }
        for &v in add {
            pd.add(v as usize, k, pz);
        }
        for &v in sub {
            pd.add(v as usize, k, -pz);
        }
    }
}
