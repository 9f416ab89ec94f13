//! Sweep engines: Taylor coefficient storage plus the forward and reverse
//! passes over a tape.
//!
//! The passes themselves live in [`forward`] and [`reverse`] as `impl`
//! blocks on [`Evaluator`](crate::Evaluator); the per-operator recurrences
//! they dispatch to live in [`crate::op`].

pub(crate) mod forward;
pub(crate) mod reverse;
pub(crate) mod subgraph;

use crate::error::internal_error;
use crate::eval::Evaluator;
use crate::float::Float;
use crate::op::Arg;
use crate::opcode::{CompareOp, FLAG_FALSE, FLAG_LEFT, FLAG_RIGHT, FLAG_TRUE};
use crate::tape::OpView;

/// Dense Taylor coefficient matrix `[variable][order][direction]`.
///
/// Order 0 is shared by every direction, so each variable occupies
/// `(cap_order - 1) * num_dir + 1` slots: the value, then `num_dir`
/// coefficients for each higher order. With a single direction the
/// coefficients of one variable are contiguous ([`TaylorStore::row`]).
#[derive(Clone, Debug)]
pub struct TaylorStore<F> {
    data: Vec<F>,
    num_var: usize,
    cap_order: usize,
    num_dir: usize,
    /// Orders `0..num_order` hold valid coefficients.
    num_order: usize,
}

impl<F: Float> TaylorStore<F> {
    pub fn new(num_var: usize) -> Self {
        TaylorStore {
            data: vec![F::zero(); num_var],
            num_var,
            cap_order: 1,
            num_dir: 1,
            num_order: 0,
        }
    }

    #[inline]
    fn stride(&self) -> usize {
        (self.cap_order - 1) * self.num_dir + 1
    }

    #[inline]
    fn idx(&self, v: usize, k: usize, ell: usize) -> usize {
        if k == 0 {
            v * self.stride()
        } else {
            v * self.stride() + (k - 1) * self.num_dir + 1 + ell
        }
    }

    /// Coefficient of order `k`, direction `ell` (ignored at order 0).
    #[inline]
    pub fn get(&self, v: usize, k: usize, ell: usize) -> F {
        self.data[self.idx(v, k, ell)]
    }

    #[inline]
    pub fn set(&mut self, v: usize, k: usize, ell: usize, value: F) {
        let i = self.idx(v, k, ell);
        self.data[i] = value;
    }

    /// All coefficients of one variable; requires a single direction.
    #[inline]
    pub fn row(&self, v: usize) -> &[F] {
        debug_assert_eq!(self.num_dir, 1);
        let s = self.stride();
        &self.data[v * s..(v + 1) * s]
    }

    #[inline]
    pub fn num_order(&self) -> usize {
        self.num_order
    }

    #[inline]
    pub fn num_dir(&self) -> usize {
        self.num_dir
    }

    #[inline]
    pub fn cap_order(&self) -> usize {
        self.cap_order
    }

    #[inline]
    pub fn num_var(&self) -> usize {
        self.num_var
    }

    pub(crate) fn set_num_order(&mut self, n: usize) {
        debug_assert!(n <= self.cap_order);
        self.num_order = n;
    }

    /// Make room for `orders` orders with `num_dir` directions.
    ///
    /// Existing coefficients survive. Capacity grows to at least twice the
    /// old capacity so repeated one-order steps stay amortized. A change in
    /// direction count keeps order 0 only.
    pub(crate) fn reserve(&mut self, orders: usize, num_dir: usize) {
        if num_dir != self.num_dir {
            let keep = self.num_order.min(1);
            let cap = orders.max(self.cap_order);
            self.relayout(cap, num_dir, keep);
            return;
        }
        if orders > self.cap_order {
            let cap = orders.max(2 * self.cap_order);
            log::debug!("taylor store grows from {} to {cap} orders", self.cap_order);
            self.relayout(cap, num_dir, self.num_order);
        }
    }

    /// Set the capacity to exactly `cap` orders, keeping what fits.
    pub(crate) fn resize_capacity(&mut self, cap: usize) {
        let cap = cap.max(1);
        let keep = self.num_order.min(cap);
        self.relayout(cap, self.num_dir, keep);
    }

    fn relayout(&mut self, cap_order: usize, num_dir: usize, keep: usize) {
        let mut next = TaylorStore {
            data: vec![F::zero(); self.num_var * ((cap_order - 1) * num_dir + 1)],
            num_var: self.num_var,
            cap_order,
            num_dir,
            num_order: keep,
        };
        let dirs = self.num_dir.min(num_dir);
        for v in 0..self.num_var {
            for k in 0..keep {
                if k == 0 {
                    next.set(v, 0, 0, self.get(v, 0, 0));
                } else {
                    for ell in 0..dirs {
                        next.set(v, k, ell, self.get(v, k, ell));
                    }
                }
            }
        }
        *self = next;
    }
}

// Operand decoding shared by both sweep directions.
impl<F: Float> Evaluator<F> {
    #[inline]
    pub(crate) fn operand(&self, is_var: bool, raw: u32) -> Arg<F> {
        if is_var {
            Arg::Var(raw as usize)
        } else {
            Arg::Par(self.par[raw as usize])
        }
    }

    /// Comparison code and operands of a `CExp` or `CSkip`.
    pub(crate) fn condition(&self, op: &OpView<'_>) -> (CompareOp, Arg<F>, Arg<F>) {
        let cop = CompareOp::decode(op.arg(0))
            .unwrap_or_else(|| internal_error(op.code, op.index.get(), "invalid comparison code"));
        let flags = op.arg(1);
        let left = self.operand(flags & FLAG_LEFT != 0, op.arg(2));
        let right = self.operand(flags & FLAG_RIGHT != 0, op.arg(3));
        (cop, left, right)
    }

    /// Branch operands of a `CExp`.
    pub(crate) fn branches(&self, op: &OpView<'_>) -> (Arg<F>, Arg<F>) {
        let flags = op.arg(1);
        (
            self.operand(flags & FLAG_TRUE != 0, op.arg(4)),
            self.operand(flags & FLAG_FALSE != 0, op.arg(5)),
        )
    }
}

/// Reverse-mode partials, laid out `[variable * num_order + order]`.
pub(crate) struct Partials<F> {
    data: Vec<F>,
    num_order: usize,
}

impl<F: Float> Partials<F> {
    pub(crate) fn new(num_var: usize, num_order: usize) -> Self {
        Partials {
            data: vec![F::zero(); num_var * num_order],
            num_order,
        }
    }

    #[inline]
    pub(crate) fn get(&self, v: usize, k: usize) -> F {
        self.data[v * self.num_order + k]
    }

    #[inline]
    pub(crate) fn add(&mut self, v: usize, k: usize, value: F) {
        self.data[v * self.num_order + k] = self.data[v * self.num_order + k] + value;
    }

    #[inline]
    pub(crate) fn set(&mut self, v: usize, k: usize, value: F) {
        self.data[v * self.num_order + k] = value;
    }

    /// Zero every order of `v`.
    #[inline]
    pub(crate) fn clear(&mut self, v: usize) {
        let s = v * self.num_order;
        self.data[s..s + self.num_order].fill(F::zero());
    }

    #[inline]
    pub(crate) fn num_order(&self) -> usize {
        self.num_order
    }

    /// True when every order of `v` has a zero partial.
    #[inline]
    pub(crate) fn is_zero(&self, v: usize) -> bool {
        let s = v * self.num_order;
        self.data[s..s + self.num_order].iter().all(|&p| p == F::zero())
    }

    #[inline]
    pub(crate) fn row(&self, v: usize) -> &[F] {
        let s = v * self.num_order;
        &self.data[s..s + self.num_order]
    }
}
