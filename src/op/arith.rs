//! Arithmetic: add, subtract, negate, multiply, divide, absolute-zero
//! multiply, abs and sign.

use crate::float::Float;
use crate::sweep::{Partials, TaylorStore};

use super::Orders;

// ══════════════════════════════════════════════
//  Forward
// ══════════════════════════════════════════════

/// `z = x + y`
pub(crate) fn add_vv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, y: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0) + t.get(y, 0, 0));
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(x, k, ell) + t.get(y, k, ell)));
}

/// `z = p + y`
pub(crate) fn add_pv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, p: F, y: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, p + t.get(y, 0, 0));
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(y, k, ell)));
}

/// `z = x - y`
pub(crate) fn sub_vv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, y: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0) - t.get(y, 0, 0));
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(x, k, ell) - t.get(y, k, ell)));
}

/// `z = p - y`
pub(crate) fn sub_pv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, p: F, y: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, p - t.get(y, 0, 0));
    }
    o.each(|k, ell| t.set(z, k, ell, -t.get(y, k, ell)));
}

/// `z = x - p`
pub(crate) fn sub_vp<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, p: F) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0) - p);
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(x, k, ell)));
}

/// `z = -x`
pub(crate) fn neg<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, -t.get(x, 0, 0));
    }
    o.each(|k, ell| t.set(z, k, ell, -t.get(x, k, ell)));
}

/// `z = x * y` (Cauchy product), or `azmul(x, y)` term by term when `zero`
/// is set.
///
/// `z_k = Σ_{j=0}^{k} x_j y_{k-j}`
pub(crate) fn mul_vv<F: Float>(
    t: &mut TaylorStore<F>,
    o: Orders,
    z: usize,
    x: usize,
    y: usize,
    zero: bool,
) {
    let prod = |a: F, b: F| if zero { a.azmul(b) } else { a * b };
    if o.has_zero() {
        t.set(z, 0, 0, prod(t.get(x, 0, 0), t.get(y, 0, 0)));
    }
    o.each(|k, ell| {
        let mut sum = F::zero();
        for j in 0..=k {
            sum = sum + prod(t.get(x, j, ell), t.get(y, k - j, ell));
        }
        t.set(z, k, ell, sum);
    });
}

/// `z = p * y`, or `azmul(p, y)`.
pub(crate) fn mul_pv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, p: F, y: usize, zero: bool) {
    let prod = |b: F| if zero { p.azmul(b) } else { p * b };
    if o.has_zero() {
        t.set(z, 0, 0, prod(t.get(y, 0, 0)));
    }
    o.each(|k, ell| t.set(z, k, ell, prod(t.get(y, k, ell))));
}

/// `z = azmul(x, p)`
pub(crate) fn zmul_vp<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, p: F) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0).azmul(p));
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(x, k, ell).azmul(p)));
}

/// `z = x / y`
///
/// `z_k = (x_k - Σ_{j=1}^{k} z_{k-j} y_j) / y_0`
pub(crate) fn div_vv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, y: usize) {
    let y0 = t.get(y, 0, 0);
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0) / y0);
    }
    o.each(|k, ell| {
        let mut sum = t.get(x, k, ell);
        for j in 1..=k {
            sum = sum - t.get(z, k - j, ell) * t.get(y, j, ell);
        }
        t.set(z, k, ell, sum / y0);
    });
}

/// `z = p / y`
///
/// `z_k = -(Σ_{j=1}^{k} z_{k-j} y_j) / y_0`
pub(crate) fn div_pv<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, p: F, y: usize) {
    let y0 = t.get(y, 0, 0);
    if o.has_zero() {
        t.set(z, 0, 0, p / y0);
    }
    o.each(|k, ell| {
        let mut sum = F::zero();
        for j in 1..=k {
            sum = sum + t.get(z, k - j, ell) * t.get(y, j, ell);
        }
        t.set(z, k, ell, -sum / y0);
    });
}

/// `z = x / p`
pub(crate) fn div_vp<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, p: F) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0) / p);
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(x, k, ell) / p));
}

/// `z = |x|`; higher orders follow the sign of `x_0`.
pub(crate) fn abs<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize) {
    let x0 = t.get(x, 0, 0);
    if o.has_zero() {
        t.set(z, 0, 0, x0.abs());
    }
    let s = x0.sign();
    o.each(|k, ell| t.set(z, k, ell, s * t.get(x, k, ell)));
}

/// `z = sign(x)`; piecewise constant.
pub(crate) fn sign<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0).sign());
    }
    o.each(|k, ell| t.set(z, k, ell, F::zero()));
}

/// Result that is constant for this sweep: `z_0 = value`, higher orders 0.
pub(crate) fn constant<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, value: F) {
    if o.has_zero() {
        t.set(z, 0, 0, value);
    }
    o.each(|k, ell| t.set(z, k, ell, F::zero()));
}

/// `z = x`, used by loads and conditional expressions bound to a variable.
pub(crate) fn copy<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0));
    }
    o.each(|k, ell| t.set(z, k, ell, t.get(x, k, ell)));
}

// ══════════════════════════════════════════════
//  Reverse
// ══════════════════════════════════════════════

/// `x += sz * z` over all orders, for linear ops with slope `sz`.
#[inline]
pub(crate) fn rev_linear<F: Float>(pd: &mut Partials<F>, d: usize, z: usize, x: usize, sz: F) {
    for k in 0..=d {
        let pz = pd.get(z, k);
        pd.add(x, k, sz * pz);
    }
}

/// Reverse of `z = x * y` (or `azmul(x, y)`).
pub(crate) fn rev_mul_vv<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    x: usize,
    y: usize,
    zero: bool,
) {
    let xs = t.row(x);
    let ys = t.row(y);
    for k in (0..=d).rev() {
        let pz = pd.get(z, k);
        for j in 0..=k {
            if zero {
                pd.add(x, j, pz.azmul(ys[k - j]));
                pd.add(y, k - j, xs[j].azmul(pz));
            } else {
                pd.add(x, j, pz * ys[k - j]);
                pd.add(y, k - j, pz * xs[j]);
            }
        }
    }
}

/// Reverse of `z = p * y` (or `azmul(p, y)`).
pub(crate) fn rev_mul_pv<F: Float>(pd: &mut Partials<F>, d: usize, z: usize, p: F, y: usize, zero: bool) {
    for k in 0..=d {
        let pz = pd.get(z, k);
        let inc = if zero { p.azmul(pz) } else { p * pz };
        pd.add(y, k, inc);
    }
}

/// Reverse of `z = azmul(x, p)`.
pub(crate) fn rev_zmul_vp<F: Float>(pd: &mut Partials<F>, d: usize, z: usize, x: usize, p: F) {
    for k in 0..=d {
        let pz = pd.get(z, k);
        pd.add(x, k, pz.azmul(p));
    }
}

/// Reverse of `z = x / y`; `x` is `None` for `p / y`.
///
/// Processes orders from high to low, folding each order's partial back
/// into the lower-order result coefficients it was computed from.
pub(crate) fn rev_div<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    x: Option<usize>,
    y: usize,
) {
    let ys = t.row(y);
    let zs = t.row(z);
    let y0 = ys[0];
    for k in (0..=d).rev() {
        let pz = pd.get(z, k) / y0;
        pd.set(z, k, pz);
        if let Some(x) = x {
            pd.add(x, k, pz);
        }
        for j in 1..=k {
            pd.add(z, k - j, -pz * ys[j]);
            pd.add(y, j, -pz * zs[k - j]);
        }
        pd.add(y, 0, -pz * zs[k]);
    }
}

/// Reverse of `z = |x|`.
pub(crate) fn rev_abs<F: Float>(t: &TaylorStore<F>, pd: &mut Partials<F>, d: usize, z: usize, x: usize) {
    let s = t.get(x, 0, 0).sign();
    rev_linear(pd, d, z, x, s);
}
