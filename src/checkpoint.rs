//! Checkpoint functions: a finished tape called from another recording.
//!
//! [`Checkpoint`] wraps a tape as an [`AtomicFunction`], so the outer tape
//! holds one call bracket per use instead of a copy of the inner ops. Every
//! outer sweep replays the inner tape through its own forward, reverse and
//! sparsity passes.
//!
//! ```ignore
//! let inner = Checkpoint::new("step", inner_tape.into_shared())?;
//! let id = rec.register_atomic(Arc::new(inner));
//! let y = rec.call_atomic(id, 0, &args, m)?;
//! ```

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::eval::Evaluator;
use crate::extension::{AtomicFunction, CallInfo};
use crate::float::Float;
use crate::sparse::{JacobianPattern, SparsityEncoding};
use crate::tape::Tape;

/// A finalized tape usable as a plug-in.
///
/// Evaluators over the inner tape are pooled; concurrent sweeps of outer
/// tapes each take one of their own.
pub struct Checkpoint<F: Float> {
    name: String,
    tape: Arc<Tape<F>>,
    jac: JacobianPattern,
    pool: Mutex<Vec<Evaluator<F>>>,
}

impl<F: Float> Checkpoint<F> {
    /// Wrap `tape`, computing its Jacobian sparsity once.
    pub fn new(name: impl Into<String>, tape: Arc<Tape<F>>) -> Result<Self> {
        let jac = tape.jacobian_pattern(SparsityEncoding::Auto)?;
        let name = name.into();
        log::debug!(
            "checkpoint `{name}`: {} -> {}, {} ops",
            tape.num_independent(),
            tape.num_dependent(),
            tape.num_op()
        );
        Ok(Checkpoint {
            name,
            tape,
            jac,
            pool: Mutex::new(Vec::new()),
        })
    }

    #[inline]
    pub fn tape(&self) -> &Arc<Tape<F>> {
        &self.tape
    }

    fn check_call(&self, call: &CallInfo<'_>) -> Result<(), String> {
        let (n, m) = (self.tape.num_independent(), self.tape.num_dependent());
        if call.n != n || call.m != m {
            return Err(format!("tape maps {n} -> {m}, call has {} -> {}", call.n, call.m));
        }
        Ok(())
    }

    fn with_evaluator(
        &self,
        f: impl FnOnce(&mut Evaluator<F>) -> Result<()>,
    ) -> Result<(), String> {
        let taken = self
            .pool
            .lock()
            .map_err(|_| "evaluator pool poisoned".to_owned())?
            .pop();
        let mut ev = taken.unwrap_or_else(|| Evaluator::new(Arc::clone(&self.tape)));
        let done = f(&mut ev).map_err(|e| e.to_string());
        if let Ok(mut pool) = self.pool.lock() {
            pool.push(ev);
        }
        done
    }
}

impl<F: Float> AtomicFunction<F> for Checkpoint<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(
        &self,
        call: &CallInfo<'_>,
        p: usize,
        q: usize,
        tx: &[F],
        ty: &mut [F],
    ) -> Result<(), String> {
        self.check_call(call)?;
        let w = q + 1;
        self.with_evaluator(|ev| {
            // tx carries every order, so the inner sweep starts at 0
            let y = ev.forward(q, tx)?;
            for i in 0..call.m {
                ty[i * w + p..(i + 1) * w].copy_from_slice(&y[i * w + p..(i + 1) * w]);
            }
            Ok(())
        })
    }

    fn reverse(
        &self,
        call: &CallInfo<'_>,
        q: usize,
        tx: &[F],
        _ty: &[F],
        py: &[F],
        px: &mut [F],
    ) -> Result<(), String> {
        self.check_call(call)?;
        self.with_evaluator(|ev| {
            ev.forward(q, tx)?;
            let partials = ev.reverse(q + 1, py)?;
            for (a, &b) in px.iter_mut().zip(&partials) {
                *a = *a + b;
            }
            Ok(())
        })
    }

    fn num_results(&self, _call_id: u32, _n: usize) -> Option<usize> {
        Some(self.tape.num_dependent())
    }

    fn for_jac_sparsity(&self, _call: &CallInfo<'_>) -> Vec<(usize, usize)> {
        self.jac.iter().collect()
    }

    fn for_hes_sparsity(&self, call: &CallInfo<'_>, select_y: &[bool]) -> Vec<(usize, usize)> {
        match self.tape.hessian_pattern(select_y, SparsityEncoding::Auto) {
            Ok(h) => {
                let mut pairs = Vec::with_capacity(2 * h.nnz());
                for (j, l) in h.iter() {
                    pairs.push((j, l));
                    if j != l {
                        pairs.push((l, j));
                    }
                }
                pairs
            }
            Err(e) => {
                log::warn!("checkpoint `{}`: {e}; assuming a dense Hessian", self.name);
                (0..call.n).flat_map(|j| (0..call.n).map(move |l| (j, l))).collect()
            }
        }
    }
}

impl<F: Float> std::fmt::Debug for Checkpoint<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("name", &self.name)
            .field("tape", &self.tape)
            .finish()
    }
}
