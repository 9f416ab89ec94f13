//! Conditional expressions.
//!
//! The branch is decided from order-0 values of the comparison operands and
//! every higher order follows the same branch, so a Taylor expansion never
//! mixes the two sides.

use crate::float::Float;
use crate::opcode::CompareOp;
use crate::sweep::{Partials, TaylorStore};

use super::{arith, Arg, Orders};

/// Evaluate the recorded comparison at order 0.
#[inline]
pub(crate) fn holds<F: Float>(t: &TaylorStore<F>, cop: CompareOp, left: Arg<F>, right: Arg<F>) -> bool {
    cop.apply(left.value(t), right.value(t))
}

/// `z = if cond { if_true } else { if_false }`
pub(crate) fn forward<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, cond: bool, if_true: Arg<F>, if_false: Arg<F>) {
    match if cond { if_true } else { if_false } {
        Arg::Var(v) => arith::copy(t, o, z, v),
        Arg::Par(p) => arith::constant(t, o, z, p),
    }
}

/// Route the partials of `z` to the branch taken at order 0.
pub(crate) fn reverse<F: Float>(pd: &mut Partials<F>, d: usize, z: usize, cond: bool, if_true: Arg<F>, if_false: Arg<F>) {
    let taken = if cond { if_true } else { if_false };
    if let Arg::Var(v) = taken {
        arith::rev_linear(pd, d, z, v, F::one());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_is_fixed_at_order_zero() {
        let mut t = TaylorStore::<f64>::new(4);
        t.reserve(2, 1);
        t.set(1, 0, 0, 1.0);
        t.set(1, 1, 0, 5.0);
        t.set(2, 0, 0, 2.0);
        t.set(2, 1, 0, 7.0);
        let cond = holds(&t, CompareOp::Lt, Arg::Var(1), Arg::Var(2));
        assert!(cond);
        forward(&mut t, Orders { p: 0, q: 1, r: 1 }, 3, cond, Arg::Var(1), Arg::Par(0.0));
        assert_eq!(t.get(3, 0, 0), 1.0);
        assert_eq!(t.get(3, 1, 0), 5.0);
    }
}
