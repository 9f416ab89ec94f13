//! Per-operator Taylor recurrences.
//!
//! Every forward rule computes orders `p..=q` of its result(s) from the
//! already-computed orders of its arguments; order 0 is the plain value.
//! With `r > 1` directions only a single order `q` is computed, reusing the
//! shared order-0 value. Every reverse rule takes the partials of its
//! results for orders `0..=d` and adds the induced partials into its
//! arguments. Reverse rules may overwrite their own results' partials: by
//! the time an op is visited in reverse, no later op still needs them.
//!
//! Convention: coefficients are normalized, `x_k = x^(k)(0) / k!`.
//!
//! Parameters have no coefficients above order 0; rules that take a
//! parameter receive its value directly.

pub(crate) mod arith;
pub(crate) mod atomic;
pub(crate) mod cond;
pub(crate) mod csum;
pub(crate) mod pow;
pub(crate) mod transcendental;
pub(crate) mod vec_ad;

use crate::float::Float;

/// Which orders and directions a forward rule fills in.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Orders {
    pub p: usize,
    pub q: usize,
    pub r: usize,
}

impl Orders {
    /// Call `f(k, ell)` for every order `k >= 1` in range and every
    /// direction.
    #[inline]
    pub fn each(self, mut f: impl FnMut(usize, usize)) {
        for k in self.p.max(1)..=self.q {
            for ell in 0..self.r {
                f(k, ell);
            }
        }
    }

    #[inline]
    pub fn has_zero(self) -> bool {
        self.p == 0
    }
}

#[inline]
pub(crate) fn count<F: Float>(k: usize) -> F {
    F::from_count(k)
}

/// An operand resolved for a rule: a variable slot or a parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Arg<F> {
    Var(usize),
    Par(F),
}

impl<F: Float> Arg<F> {
    /// Order-0 value.
    #[inline]
    pub fn value(self, t: &crate::sweep::TaylorStore<F>) -> F {
        match self {
            Arg::Var(v) => t.get(v, 0, 0),
            Arg::Par(p) => p,
        }
    }

    #[inline]
    pub fn var(self) -> Option<usize> {
        match self {
            Arg::Var(v) => Some(v),
            Arg::Par(_) => None,
        }
    }
}
