//! Power functions.
//!
//! `pow(x, y)` with a variable exponent is evaluated through three results,
//! `z0 = ln x`, `z1 = y * z0`, `z2 = exp(z1)`, so its recurrences reuse the
//! log, multiply and exp rules. Order 0 of `z2` is `powf(x, y)` so plain
//! values match the base type exactly. With a parameter exponent the single
//! result follows `x z' = y z x'` directly, which stays finite at `x = 0`.

use crate::float::Float;
use crate::sweep::{Partials, TaylorStore};

use super::{arith, count, transcendental, Orders};

/// `pow(p, y)`; `z` is the first of the three results.
pub(crate) fn pow_pv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, p: F, y: usize) {
    let log_p = p.ln();
    arith::constant(t, o, z, log_p);
    arith::mul_pv(t, o, z + 1, log_p, y, false);
    if o.has_zero() {
        t.set(z + 2, 0, 0, p.powf(t.get(y, 0, 0)));
    }
    transcendental::exp(t, Orders { p: o.p.max(1), ..o }, z + 2, z + 1, false);
}

/// `pow(x, y)`; `z` is the first of the three results.
pub(crate) fn pow_vv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, y: usize) {
    transcendental::log(t, o, z, x, false);
    arith::mul_vv(t, o, z + 1, z, y, false);
    if o.has_zero() {
        t.set(z + 2, 0, 0, t.get(x, 0, 0).powf(t.get(y, 0, 0)));
    }
    transcendental::exp(t, Orders { p: o.p.max(1), ..o }, z + 2, z + 1, false);
}

/// `z = pow(x, y)` with parameter `y`.
///
/// `z_j = (y z_0 x_j + (1/j) Σ_{k=1}^{j-1} k (y x_k z_{j-k} - z_k x_{j-k})) / x_0`,
/// and zero when `x_0 = 0`.
pub(crate) fn pow_vp<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, y: F) {
    let x0 = t.get(x, 0, 0);
    if o.has_zero() {
        t.set(z, 0, 0, x0.powf(y));
    }
    let z0 = t.get(z, 0, 0);
    o.each(|j, ell| {
        if x0 == F::zero() {
            t.set(z, j, ell, F::zero());
            return;
        }
        let mut sum = F::zero();
        for k in 1..j {
            let kf = count::<F>(k);
            sum = sum
                + kf * (y * t.get(x, k, ell) * t.get(z, j - k, ell)
                    - t.get(z, k, ell) * t.get(x, j - k, ell));
        }
        let zj = (y * z0 * t.get(x, j, ell) + sum / count(j)) / x0;
        t.set(z, j, ell, zj);
    });
}

/// Reverse of [`pow_pv`].
pub(crate) fn rev_pow_pv<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    p: F,
    y: usize,
) {
    transcendental::rev_exp(t, pd, d, z + 2, z + 1, false);
    arith::rev_mul_pv(pd, d, z + 1, p.ln(), y, false);
}

/// Reverse of [`pow_vv`].
pub(crate) fn rev_pow_vv<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    x: usize,
    y: usize,
) {
    transcendental::rev_exp(t, pd, d, z + 2, z + 1, false);
    arith::rev_mul_vv(t, pd, d, z + 1, z, y, false);
    transcendental::rev_log(t, pd, d, z, x, false);
}

/// Reverse of [`pow_vp`]. Contributes nothing when `x_0 = 0`.
pub(crate) fn rev_pow_vp<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    x: usize,
    y: F,
) {
    let xs = t.row(x);
    let zs = t.row(z);
    let x0 = xs[0];
    if x0 == F::zero() {
        return;
    }
    let z0 = zs[0];
    for j in (1..=d).rev() {
        let pz = pd.get(z, j);
        let jf = count::<F>(j);
        pd.add(x, j, pz.azmul(y * z0 / x0));
        for k in 1..j {
            let kf = count::<F>(k);
            let jk = count::<F>(j - k);
            let tx = (kf * y - jk) * zs[j - k] / (jf * x0);
            pd.add(x, k, pz.azmul(tx));
            let tz = (jk * y - kf) * xs[j - k] / (jf * x0);
            pd.add(z, k, pz.azmul(tz));
        }
        pd.add(x, 0, -pz.azmul(zs[j] / x0));
        pd.add(z, 0, pz.azmul(y * xs[j] / x0));
    }
    pd.add(x, 0, pd.get(z, 0).azmul(y * z0 / x0));
}
