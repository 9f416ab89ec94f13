//! Extension points: plug-in (atomic) functions and discrete functions.
//!
//! A plug-in is an operation the engines treat as indivisible. On the tape it
//! appears as a call bracket:
//!
//! ```text
//! AFun  [atomic_id, call_id, n, m]
//! FunAP | FunAV     one per argument, n in total
//! FunRP | FunRV     one per result, m in total
//! AFun  [atomic_id, call_id, n, m]
//! ```
//!
//! The engines know nothing about a plug-in beyond the five operations of
//! [`AtomicFunction`]. Plug-ins and discrete functions are kept in a
//! [`Registry`] owned by the tape, so registration is explicit and scoped to
//! one recording rather than global.

use std::fmt;
use std::sync::Arc;

use crate::float::Float;
use crate::index::{AtomicId, DiscreteId};

/// What a plug-in learns about one call site.
#[derive(Clone, Copy, Debug)]
pub struct CallInfo<'a> {
    /// Value the recorder attached to this call, passed through unchanged.
    pub call_id: u32,
    /// Number of arguments.
    pub n: usize,
    /// Number of results.
    pub m: usize,
    /// `x_is_var[j]` is true when argument `j` is a variable.
    pub x_is_var: &'a [bool],
}

/// Callback contract of a plug-in function.
///
/// Taylor coefficient arrays use the layout `t[j * (q + 1) + k]` for argument
/// (or result) `j` and order `k`, where `q` is the highest order involved.
/// Sparsity patterns are lists of `(result, argument)` or `(argument,
/// argument)` pairs.
///
/// # Example
///
/// ```ignore
/// struct AddMul;
///
/// impl AtomicFunction<f64> for AddMul {
///     fn name(&self) -> &str { "add_mul" }
///     fn forward(&self, call: &CallInfo<'_>, p: usize, q: usize, tx: &[f64], ty: &mut [f64])
///         -> Result<(), String> { /* y0 = x0 + x1, y1 = x2 * x3 */ }
///     fn reverse(&self, call: &CallInfo<'_>, q: usize, tx: &[f64], ty: &[f64], py: &[f64], px: &mut [f64])
///         -> Result<(), String> { /* ... */ }
/// }
/// ```
pub trait AtomicFunction<F: Float>: Send + Sync {
    /// Name used in error messages and tape listings.
    fn name(&self) -> &str;

    /// Compute result coefficients for orders `p..=q`.
    ///
    /// `tx` holds orders `0..=q` of every argument (parameters have zero
    /// coefficients above order 0). `ty` arrives with orders below `p`
    /// filled in; the plug-in writes orders `p..=q`.
    fn forward(
        &self,
        call: &CallInfo<'_>,
        p: usize,
        q: usize,
        tx: &[F],
        ty: &mut [F],
    ) -> Result<(), String>;

    /// Propagate partials back through orders `0..=q`.
    ///
    /// `py[i * (q + 1) + k]` is the partial of the target with respect to
    /// result coefficient `y_i^(k)`; the plug-in writes the partials with
    /// respect to the argument coefficients into the zeroed `px`.
    fn reverse(
        &self,
        call: &CallInfo<'_>,
        q: usize,
        tx: &[F],
        ty: &[F],
        py: &[F],
        px: &mut [F],
    ) -> Result<(), String>;

    /// Result count this plug-in produces for `n` arguments, if fixed.
    ///
    /// When this returns `Some(m)` and the call site was recorded with a
    /// different count, sweeps fail with [`AdError::AtomicResult`](crate::AdError::AtomicResult).
    fn num_results(&self, _call_id: u32, _n: usize) -> Option<usize> {
        None
    }

    /// `(i, j)` pairs where result `i` may depend on argument `j`, used by
    /// forward Jacobian sparsity. Defaults to every pair.
    fn for_jac_sparsity(&self, call: &CallInfo<'_>) -> Vec<(usize, usize)> {
        dense_pairs(call.m, call.n)
    }

    /// Dependency pairs used by reverse Jacobian sparsity.
    fn rev_jac_sparsity(&self, call: &CallInfo<'_>) -> Vec<(usize, usize)> {
        self.for_jac_sparsity(call)
    }

    /// `(j, l)` argument pairs whose second cross partial may be nonzero for
    /// some result `i` with `select_y[i]`. Defaults to every pair.
    fn for_hes_sparsity(&self, call: &CallInfo<'_>, select_y: &[bool]) -> Vec<(usize, usize)> {
        if select_y.iter().any(|&s| s) {
            dense_pairs(call.n, call.n)
        } else {
            Vec::new()
        }
    }
}

fn dense_pairs(rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            out.push((i, j));
        }
    }
    out
}

/// Discrete (piecewise-constant) function: zero derivative everywhere.
pub type DiscreteFn<F> = Arc<dyn Fn(F) -> F + Send + Sync>;

struct Discrete<F> {
    name: String,
    f: DiscreteFn<F>,
}

impl<F> Clone for Discrete<F> {
    fn clone(&self) -> Self {
        Discrete {
            name: self.name.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

/// Registry of plug-in and discrete functions for one recording.
pub struct Registry<F: Float> {
    atomics: Vec<Arc<dyn AtomicFunction<F>>>,
    discretes: Vec<Discrete<F>>,
}

impl<F: Float> Registry<F> {
    pub fn new() -> Self {
        Registry {
            atomics: Vec::new(),
            discretes: Vec::new(),
        }
    }

    /// Register a plug-in. Returns the id recorded in call brackets.
    pub fn register_atomic(&mut self, f: Arc<dyn AtomicFunction<F>>) -> AtomicId {
        let id = AtomicId::from_usize(self.atomics.len());
        log::debug!("registered plug-in `{}` as {id}", f.name());
        self.atomics.push(f);
        id
    }

    /// Register a discrete function. Returns the id recorded by `Dis` ops.
    pub fn register_discrete(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(F) -> F + Send + Sync + 'static,
    ) -> DiscreteId {
        let id = DiscreteId::from_usize(self.discretes.len());
        self.discretes.push(Discrete {
            name: name.into(),
            f: Arc::new(f),
        });
        id
    }

    pub fn atomic(&self, id: AtomicId) -> Option<&Arc<dyn AtomicFunction<F>>> {
        self.atomics.get(id.get())
    }

    pub fn discrete(&self, id: DiscreteId) -> Option<&DiscreteFn<F>> {
        self.discretes.get(id.get()).map(|d| &d.f)
    }

    pub fn discrete_name(&self, id: DiscreteId) -> Option<&str> {
        self.discretes.get(id.get()).map(|d| d.name.as_str())
    }

    pub fn num_atomic(&self) -> usize {
        self.atomics.len()
    }

    pub fn num_discrete(&self) -> usize {
        self.discretes.len()
    }
}

impl<F: Float> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Clone for Registry<F> {
    fn clone(&self) -> Self {
        Registry {
            atomics: self.atomics.clone(),
            discretes: self.discretes.clone(),
        }
    }
}

impl<F: Float> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "atomics",
                &self.atomics.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field(
                "discretes",
                &self.discretes.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl AtomicFunction<f64> for Identity {
        fn name(&self) -> &str {
            "identity"
        }
        fn forward(
            &self,
            _call: &CallInfo<'_>,
            p: usize,
            q: usize,
            tx: &[f64],
            ty: &mut [f64],
        ) -> Result<(), String> {
            ty[p..=q].copy_from_slice(&tx[p..=q]);
            Ok(())
        }
        fn reverse(
            &self,
            _call: &CallInfo<'_>,
            _q: usize,
            _tx: &[f64],
            _ty: &[f64],
            py: &[f64],
            px: &mut [f64],
        ) -> Result<(), String> {
            px.copy_from_slice(py);
            Ok(())
        }
    }

    #[test]
    fn registry_assigns_sequential_ids() {
        let mut reg = Registry::<f64>::new();
        let a = reg.register_atomic(Arc::new(Identity));
        let d0 = reg.register_discrete("floor", f64::floor);
        let d1 = reg.register_discrete("round", f64::round);
        assert_eq!(a, AtomicId(0));
        assert_eq!((d0, d1), (DiscreteId(0), DiscreteId(1)));
        assert_eq!(reg.discrete_name(d1), Some("round"));
        assert_eq!((reg.discrete(d0).unwrap())(2.7), 2.0);
    }

    #[test]
    fn default_sparsity_is_dense() {
        let x_is_var = [true, false];
        let call = CallInfo {
            call_id: 0,
            n: 2,
            m: 1,
            x_is_var: &x_is_var,
        };
        assert_eq!(Identity.for_jac_sparsity(&call), vec![(0, 0), (0, 1)]);
        assert!(Identity.for_hes_sparsity(&call, &[false]).is_empty());
    }
}
