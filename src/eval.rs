//! Per-worker evaluation state over a shared tape.

use std::sync::Arc;

use crate::error::{check_len, Result};
use crate::float::Float;
use crate::index::{OpIndex, VarIndex};
use crate::op::atomic::CallFrame;
use crate::op::vec_ad::ArrayState;
use crate::sweep::TaylorStore;
use crate::tape::{replay_dynamic, Tape};

/// Everything a sweep mutates, kept apart from the immutable [`Tape`].
///
/// One tape can back any number of evaluators, one per thread. Forward
/// sweeps ([`forward_zero`](Evaluator::forward_zero),
/// [`forward`](Evaluator::forward), [`forward_dir`](Evaluator::forward_dir))
/// fill the Taylor store; [`reverse`](Evaluator::reverse) reads it.
///
/// ```ignore
/// let tape = rec.finalize(&[y]).into_shared();
/// let mut ev = Evaluator::new(tape);
/// let y = ev.forward_zero(&[1.0, 2.0])?;
/// let g = ev.reverse(1, &[1.0])?;
/// ```
pub struct Evaluator<F: Float> {
    pub(crate) tape: Arc<Tape<F>>,
    pub(crate) taylor: TaylorStore<F>,
    /// Parameter values; dynamic entries follow [`Evaluator::new_dynamic`].
    pub(crate) par: Vec<F>,
    /// Ops marked inert by a conditional skip during the last order-0 sweep.
    pub(crate) skip: Vec<bool>,
    /// Variable each load read at order 0, 0 when it read a parameter.
    pub(crate) load_binding: Vec<u32>,
    pub(crate) arrays: ArrayState,
    pub(crate) compare_change_count: usize,
    pub(crate) compare_change_op_index: Option<OpIndex>,
    pub(crate) printed: Vec<String>,
    pub(crate) frame: CallFrame<F>,
}

impl<F: Float> Evaluator<F> {
    pub fn new(tape: Arc<Tape<F>>) -> Self {
        let num_var = tape.num_var();
        let num_op = tape.num_op();
        let num_load = tape.num_load();
        let par = tape.params.clone();
        Evaluator {
            tape,
            taylor: TaylorStore::new(num_var),
            par,
            skip: vec![false; num_op],
            load_binding: vec![0; num_load],
            arrays: ArrayState::default(),
            compare_change_count: 0,
            compare_change_op_index: None,
            printed: Vec::new(),
            frame: CallFrame::new(),
        }
    }

    /// Evaluator over a tape it owns.
    pub fn from_tape(tape: Tape<F>) -> Self {
        Self::new(Arc::new(tape))
    }

    #[inline]
    pub fn tape(&self) -> &Arc<Tape<F>> {
        &self.tape
    }

    /// Taylor coefficients of the last sweeps.
    #[inline]
    pub fn taylor(&self) -> &TaylorStore<F> {
        &self.taylor
    }

    /// Number of orders currently computed.
    #[inline]
    pub fn num_order(&self) -> usize {
        self.taylor.num_order()
    }

    /// Coefficient of variable `v`, order `k`, direction `ell`.
    pub fn coefficient(&self, v: VarIndex, k: usize, ell: usize) -> F {
        self.taylor.get(v.get(), k, ell)
    }

    /// Set the Taylor store capacity to `c` orders. Orders at or above `c`
    /// are discarded.
    pub fn capacity_order(&mut self, c: usize) {
        self.taylor.resize_capacity(c);
    }

    /// Replace the independent dynamic parameters and recompute the
    /// dependent ones. Invalidates every computed order.
    pub fn new_dynamic(&mut self, values: &[F]) -> Result<()> {
        check_len("dynamic parameter values", self.tape.num_dynamic(), values.len())?;
        replay_dynamic(&self.tape.dynamic, values, &mut self.par);
        self.taylor.set_num_order(0);
        Ok(())
    }

    /// Current value of a parameter (dynamic parameters included).
    pub fn parameter(&self, p: crate::index::ParIndex) -> F {
        self.par[p.get()]
    }

    /// Comparison ops whose recorded relation failed in the last order-0
    /// sweep. A nonzero count means the tape may not represent the function
    /// at the current point.
    #[inline]
    pub fn compare_change_count(&self) -> usize {
        self.compare_change_count
    }

    /// First comparison op whose relation failed in the last order-0 sweep.
    #[inline]
    pub fn compare_change_op_index(&self) -> Option<OpIndex> {
        self.compare_change_op_index
    }

    /// Lines produced by print ops during the last order-0 sweep.
    #[inline]
    pub fn printed(&self) -> &[String] {
        &self.printed
    }

    /// True when the op was marked inert by a conditional skip.
    #[inline]
    pub fn is_skipped(&self, op: OpIndex) -> bool {
        self.skip[op.get()]
    }

    /// Order-`k` coefficients of the dependents for direction `ell`.
    pub(crate) fn dependent_order(&self, k: usize, ell: usize) -> Vec<F> {
        self.tape
            .dependents
            .iter()
            .map(|d| self.taylor.get(d.get(), k, ell))
            .collect()
    }
}

impl<F: Float> Clone for Evaluator<F> {
    fn clone(&self) -> Self {
        Evaluator {
            tape: Arc::clone(&self.tape),
            taylor: self.taylor.clone(),
            par: self.par.clone(),
            skip: self.skip.clone(),
            load_binding: self.load_binding.clone(),
            arrays: self.arrays.clone(),
            compare_change_count: self.compare_change_count,
            compare_change_op_index: self.compare_change_op_index,
            printed: self.printed.clone(),
            frame: self.frame.clone(),
        }
    }
}

impl<F: Float> std::fmt::Debug for Evaluator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("tape", &self.tape)
            .field("num_order", &self.taylor.num_order())
            .field("num_dir", &self.taylor.num_dir())
            .field("cap_order", &self.taylor.cap_order())
            .finish()
    }
}
