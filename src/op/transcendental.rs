//! Transcendental functions.
//!
//! Recurrences follow the logarithmic-derivative technique: for `z = f(x)`
//! with `z' = g * x'`, matching coefficients of `k z_k = Σ j x_j g_{k-j}`
//! gives each order from lower ones. Functions whose `g` is not already a
//! result (sine needs cosine, tangent needs `1 + tan²`, inverse functions
//! need `sqrt(1 - x²)` and friends) carry it as an auxiliary result.

use crate::float::Float;
use crate::sweep::{Partials, TaylorStore};

use super::{count, Orders};

// ══════════════════════════════════════════════
//  Exponential and logarithm
// ══════════════════════════════════════════════

/// `z = exp(x)`, or `exp(x) - 1` when `m1` is set.
///
/// `z_k = [m1] x_k + (1/k) Σ_{j=1}^{k} j x_j z_{k-j}`
pub(crate) fn exp<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, m1: bool) {
    if o.has_zero() {
        let x0 = t.get(x, 0, 0);
        t.set(z, 0, 0, if m1 { x0.exp_m1() } else { x0.exp() });
    }
    o.each(|k, ell| {
        let mut sum = F::zero();
        for j in 1..=k {
            sum = sum + count::<F>(j) * t.get(x, j, ell) * t.get(z, k - j, ell);
        }
        let mut zk = sum / count(k);
        if m1 {
            zk = zk + t.get(x, k, ell);
        }
        t.set(z, k, ell, zk);
    });
}

/// `z = ln(x)`, or `ln(1 + x)` when `p1` is set.
///
/// `z_k = (x_k - (1/k) Σ_{j=1}^{k-1} j z_j x_{k-j}) / (x_0 [+ 1])`
pub(crate) fn log<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize, p1: bool) {
    let x0 = t.get(x, 0, 0);
    let base = if p1 { F::one() + x0 } else { x0 };
    if o.has_zero() {
        t.set(z, 0, 0, if p1 { x0.ln_1p() } else { x0.ln() });
    }
    o.each(|k, ell| {
        let mut sum = F::zero();
        for j in 1..k {
            sum = sum + count::<F>(j) * t.get(z, j, ell) * t.get(x, k - j, ell);
        }
        t.set(z, k, ell, (t.get(x, k, ell) - sum / count(k)) / base);
    });
}

/// `z = sqrt(x)`
///
/// `z_k = (x_k - Σ_{j=1}^{k-1} z_j z_{k-j}) / (2 z_0)`
pub(crate) fn sqrt<F: Float>(t: &mut TaylorStore<F>, o: Orders, z: usize, x: usize) {
    if o.has_zero() {
        t.set(z, 0, 0, t.get(x, 0, 0).sqrt());
    }
    let two_z0 = count::<F>(2) * t.get(z, 0, 0);
    o.each(|k, ell| {
        let mut sum = F::zero();
        for j in 1..k {
            sum = sum + t.get(z, j, ell) * t.get(z, k - j, ell);
        }
        t.set(z, k, ell, (t.get(x, k, ell) - sum) / two_z0);
    });
}

// ══════════════════════════════════════════════
//  Trigonometric and hyperbolic pairs
// ══════════════════════════════════════════════

/// Sine and cosine (or their hyperbolic versions) of the same argument.
///
/// `s_k = (1/k) Σ j x_j c_{k-j}`, `c_k = σ (1/k) Σ j x_j s_{k-j}`, where
/// `σ = -1` for the circular and `+1` for the hyperbolic pair.
pub(crate) fn sin_cos<F: Float>(
    t: &mut TaylorStore<F>,
    o: Orders,
    s: usize,
    c: usize,
    x: usize,
    hyperbolic: bool,
) {
    if o.has_zero() {
        let x0 = t.get(x, 0, 0);
        let (s0, c0) = if hyperbolic {
            (x0.sinh(), x0.cosh())
        } else {
            x0.sin_cos()
        };
        t.set(s, 0, 0, s0);
        t.set(c, 0, 0, c0);
    }
    let sigma = if hyperbolic { F::one() } else { -F::one() };
    o.each(|k, ell| {
        let mut ss = F::zero();
        let mut cc = F::zero();
        for j in 1..=k {
            let jx = count::<F>(j) * t.get(x, j, ell);
            ss = ss + jx * t.get(c, k - j, ell);
            cc = cc + jx * t.get(s, k - j, ell);
        }
        let kf = count::<F>(k);
        t.set(s, k, ell, ss / kf);
        t.set(c, k, ell, sigma * cc / kf);
    });
}

/// `z = tan(x)` (or `tanh`) with auxiliary `y = z²`.
///
/// `z_k = x_k + σ (1/k) Σ_{j=1}^{k} j x_j y_{k-j}`, `y_k = Σ_{j=0}^{k} z_j z_{k-j}`,
/// with `σ = +1` for tan and `-1` for tanh.
pub(crate) fn tan<F: Float>(
    t: &mut TaylorStore<F>,
    o: Orders,
    z: usize,
    y: usize,
    x: usize,
    hyperbolic: bool,
) {
    if o.has_zero() {
        let x0 = t.get(x, 0, 0);
        let z0 = if hyperbolic { x0.tanh() } else { x0.tan() };
        t.set(z, 0, 0, z0);
        t.set(y, 0, 0, z0 * z0);
    }
    let sigma = if hyperbolic { -F::one() } else { F::one() };
    o.each(|k, ell| {
        let mut sum = F::zero();
        for j in 1..=k {
            sum = sum + count::<F>(j) * t.get(x, j, ell) * t.get(y, k - j, ell);
        }
        t.set(z, k, ell, t.get(x, k, ell) + sigma * sum / count(k));
        let mut sq = F::zero();
        for j in 0..=k {
            sq = sq + t.get(z, j, ell) * t.get(z, k - j, ell);
        }
        t.set(y, k, ell, sq);
    });
}

// ══════════════════════════════════════════════
//  Inverse functions
// ══════════════════════════════════════════════

/// Inverse functions sharing the recurrence `b z' = c x'`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Inverse {
    /// `b = sqrt(1 - x²)`, `c = 1`
    Asin,
    /// `b = sqrt(1 - x²)`, `c = -1`
    Acos,
    /// `b = sqrt(1 + x²)`
    Asinh,
    /// `b = sqrt(x² - 1)`
    Acosh,
    /// `b = 1 + x²`
    Atan,
    /// `b = 1 - x²`
    Atanh,
}

impl Inverse {
    #[inline]
    fn c<F: Float>(self) -> F {
        if self == Inverse::Acos {
            -F::one()
        } else {
            F::one()
        }
    }

    /// Sign of `x²` in the definition of `b` (or `b²`).
    #[inline]
    fn tau<F: Float>(self) -> F {
        match self {
            Inverse::Asin | Inverse::Acos | Inverse::Atanh => -F::one(),
            _ => F::one(),
        }
    }

    /// True when `b` is a square root, false when it is the polynomial.
    #[inline]
    fn is_root(self) -> bool {
        !matches!(self, Inverse::Atan | Inverse::Atanh)
    }

    fn value<F: Float>(self, x0: F) -> F {
        match self {
            Inverse::Asin => x0.asin(),
            Inverse::Acos => x0.acos(),
            Inverse::Asinh => x0.asinh(),
            Inverse::Acosh => x0.acosh(),
            Inverse::Atan => x0.atan(),
            Inverse::Atanh => x0.atanh(),
        }
    }

    fn aux<F: Float>(self, x0: F) -> F {
        let one = F::one();
        let sq = x0 * x0;
        match self {
            Inverse::Asin | Inverse::Acos => (one - sq).sqrt(),
            Inverse::Asinh => (one + sq).sqrt(),
            Inverse::Acosh => (sq - one).sqrt(),
            Inverse::Atan => one + sq,
            Inverse::Atanh => one - sq,
        }
    }
}

/// `z = f(x)` for an inverse function with auxiliary `b`.
///
/// `b_k = (τ Σ_{j=0}^{k} x_j x_{k-j} - Σ_{j=1}^{k-1} b_j b_{k-j}) / (2 b_0)` (root form)
/// or `b_k = τ Σ_{j=0}^{k} x_j x_{k-j}` (polynomial form), then
/// `z_k = (c x_k - (1/k) Σ_{j=1}^{k-1} j z_j b_{k-j}) / b_0`.
pub(crate) fn inverse<F: Float>(
    t: &mut TaylorStore<F>,
    o: Orders,
    kind: Inverse,
    z: usize,
    b: usize,
    x: usize,
) {
    if o.has_zero() {
        let x0 = t.get(x, 0, 0);
        t.set(b, 0, 0, kind.aux(x0));
        t.set(z, 0, 0, kind.value(x0));
    }
    let b0 = t.get(b, 0, 0);
    let c = kind.c::<F>();
    let tau = kind.tau::<F>();
    o.each(|k, ell| {
        let mut sq = F::zero();
        for j in 0..=k {
            sq = sq + t.get(x, j, ell) * t.get(x, k - j, ell);
        }
        let bk = if kind.is_root() {
            let mut bb = F::zero();
            for j in 1..k {
                bb = bb + t.get(b, j, ell) * t.get(b, k - j, ell);
            }
            (tau * sq - bb) / (count::<F>(2) * b0)
        } else {
            tau * sq
        };
        t.set(b, k, ell, bk);

        let mut sum = F::zero();
        for j in 1..k {
            sum = sum + count::<F>(j) * t.get(z, j, ell) * t.get(b, k - j, ell);
        }
        t.set(z, k, ell, (c * t.get(x, k, ell) - sum / count(k)) / b0);
    });
}

// ══════════════════════════════════════════════
//  Reverse
// ══════════════════════════════════════════════

/// Reverse of [`exp`].
pub(crate) fn rev_exp<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    x: usize,
    m1: bool,
) {
    let xs = t.row(x);
    let zs = t.row(z);
    for k in (1..=d).rev() {
        let pz = pd.get(z, k);
        if m1 {
            pd.add(x, k, pz);
        }
        let pzk = pz / count(k);
        for j in 1..=k {
            let jf = count::<F>(j);
            pd.add(x, j, pzk * jf * zs[k - j]);
            pd.add(z, k - j, pzk * jf * xs[j]);
        }
    }
    let slope = if m1 { zs[0] + F::one() } else { zs[0] };
    pd.add(x, 0, pd.get(z, 0) * slope);
}

/// Reverse of [`log`].
pub(crate) fn rev_log<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    x: usize,
    p1: bool,
) {
    let xs = t.row(x);
    let zs = t.row(z);
    let base = if p1 { F::one() + xs[0] } else { xs[0] };
    for k in (1..=d).rev() {
        let pz = pd.get(z, k) / base;
        pd.add(x, 0, -pz * zs[k]);
        pd.add(x, k, pz);
        let pzk = pz / count(k);
        for j in 1..k {
            let jf = count::<F>(j);
            pd.add(z, j, -pzk * jf * xs[k - j]);
            pd.add(x, k - j, -pzk * jf * zs[j]);
        }
    }
    pd.add(x, 0, pd.get(z, 0) / base);
}

/// Reverse of [`sqrt`].
pub(crate) fn rev_sqrt<F: Float>(t: &TaylorStore<F>, pd: &mut Partials<F>, d: usize, z: usize, x: usize) {
    let zs = t.row(z);
    let z0 = zs[0];
    let two = count::<F>(2);
    for k in (1..=d).rev() {
        let pz = pd.get(z, k) / z0;
        pd.add(x, k, pz / two);
        for j in 1..k {
            pd.add(z, j, -pz * zs[k - j]);
        }
        pd.add(z, 0, -pz * zs[k]);
    }
    pd.add(x, 0, pd.get(z, 0) / (two * z0));
}

/// Reverse of [`sin_cos`]; both results may carry partials.
pub(crate) fn rev_sin_cos<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    s: usize,
    c: usize,
    x: usize,
    hyperbolic: bool,
) {
    let xs = t.row(x);
    let ss = t.row(s);
    let cs = t.row(c);
    let sigma = if hyperbolic { F::one() } else { -F::one() };
    for k in (1..=d).rev() {
        let kf = count::<F>(k);
        let psk = pd.get(s, k) / kf;
        let pck = pd.get(c, k) / kf;
        for j in 1..=k {
            let jf = count::<F>(j);
            pd.add(x, j, jf * (psk * cs[k - j] + sigma * pck * ss[k - j]));
            pd.add(c, k - j, psk * jf * xs[j]);
            pd.add(s, k - j, sigma * pck * jf * xs[j]);
        }
    }
    pd.add(x, 0, pd.get(s, 0) * cs[0] + sigma * pd.get(c, 0) * ss[0]);
}

/// Reverse of [`tan`].
pub(crate) fn rev_tan<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    z: usize,
    y: usize,
    x: usize,
    hyperbolic: bool,
) {
    let xs = t.row(x);
    let zs = t.row(z);
    let ys = t.row(y);
    let sigma = if hyperbolic { -F::one() } else { F::one() };
    let two = count::<F>(2);
    for k in (0..=d).rev() {
        // y_k = Σ z_j z_{k-j}
        let py = pd.get(y, k) * two;
        for j in 0..=k {
            pd.add(z, j, py * zs[k - j]);
        }
        let pz = pd.get(z, k);
        if k == 0 {
            pd.add(x, 0, pz * (F::one() + sigma * ys[0]));
        } else {
            pd.add(x, k, pz);
            let u = sigma * pz / count(k);
            for j in 1..=k {
                let jf = count::<F>(j);
                pd.add(x, j, u * jf * ys[k - j]);
                pd.add(y, k - j, u * jf * xs[j]);
            }
        }
    }
}

/// Reverse of [`inverse`].
pub(crate) fn rev_inverse<F: Float>(
    t: &TaylorStore<F>,
    pd: &mut Partials<F>,
    d: usize,
    kind: Inverse,
    z: usize,
    b: usize,
    x: usize,
) {
    let xs = t.row(x);
    let zs = t.row(z);
    let bs = t.row(b);
    let b0 = bs[0];
    let c = kind.c::<F>();
    let tau = kind.tau::<F>();
    let two = count::<F>(2);
    for k in (0..=d).rev() {
        // z_k
        if k == 0 {
            pd.add(x, 0, pd.get(z, 0) * c / b0);
        } else {
            let pz = pd.get(z, k) / b0;
            pd.add(x, k, c * pz);
            pd.add(b, 0, -pz * zs[k]);
            let pzk = pz / count(k);
            for j in 1..k {
                let jf = count::<F>(j);
                pd.add(z, j, -pzk * jf * bs[k - j]);
                pd.add(b, k - j, -pzk * jf * zs[j]);
            }
        }
        // b_k
        let pb = pd.get(b, k);
        if kind.is_root() {
            let pbk = pb / b0;
            for j in 0..=k {
                pd.add(x, j, tau * pbk * xs[k - j]);
            }
            if k > 0 {
                for j in 1..k {
                    pd.add(b, j, -pbk * bs[k - j]);
                }
                pd.add(b, 0, -pbk * bs[k]);
            }
        } else {
            for j in 0..=k {
                pd.add(x, j, two * tau * pb * xs[k - j]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(x0: f64, q: usize) -> TaylorStore<f64> {
        let mut t = TaylorStore::new(4);
        t.reserve(q + 1, 1);
        t.set(1, 0, 0, x0);
        if q > 0 {
            t.set(1, 1, 0, 1.0);
        }
        t
    }

    #[test]
    fn exp_series_of_identity() {
        let mut t = line(0.0, 4);
        exp(&mut t, Orders { p: 0, q: 4, r: 1 }, 2, 1, false);
        let expected = [1.0, 1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0];
        for (k, e) in expected.iter().enumerate() {
            assert_relative_eq!(t.get(2, k, 0), *e, epsilon = 1e-14);
        }
    }

    #[test]
    fn sin_second_coefficient() {
        // sin(x0 + t) = sin x0 + cos x0 t - sin x0 t^2 / 2 + ...
        let mut t = line(0.7, 2);
        sin_cos(&mut t, Orders { p: 0, q: 2, r: 1 }, 3, 2, 1, false);
        assert_relative_eq!(t.get(3, 1, 0), 0.7_f64.cos(), epsilon = 1e-14);
        assert_relative_eq!(t.get(3, 2, 0), -0.7_f64.sin() / 2.0, epsilon = 1e-14);
    }

    #[test]
    fn atan_first_coefficient() {
        let mut t = line(0.5, 1);
        inverse(&mut t, Orders { p: 0, q: 1, r: 1 }, Inverse::Atan, 3, 2, 1);
        assert_relative_eq!(t.get(3, 1, 0), 1.0 / 1.25, epsilon = 1e-14);
    }
}
