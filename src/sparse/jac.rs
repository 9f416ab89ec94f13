//! Jacobian sparsity, forward and reverse.
//!
//! Forward: `J(v)` is the set of seed columns variable `v` may depend on.
//! Reverse: `R(v)` is the set of seed rows (dependent combinations) that may
//! depend on `v`.
//!
//! Arrays keep per-element sets for constant-index access and per-array
//! `any`/`all` sets for everything else ([`ArrayRows`]). In reverse the same
//! rows hold the dual quantities: the rows reached through constant-index
//! loads of an element, through variable-index loads (`any`), and through
//! any load (`all`).

use std::sync::Arc;

use crate::error::{AdError, Result};
use crate::extension::AtomicFunction;
use crate::float::Float;
use crate::index::AtomicId;
use crate::opcode::OpCode;
use crate::tape::{for_each_jac_var, OpView, Tape};

use super::{check_shape, constant_element, ArrayRows, SetVector, SparseFrame};

impl<F: Float> Tape<F> {
    /// Forward Jacobian sparsity.
    ///
    /// `seed` has one set per independent (`seed.end()` columns). Returns one
    /// set per dependent: the columns it may depend on.
    pub fn for_jac_sparsity<S: SetVector>(&self, seed: &S) -> Result<S> {
        check_shape(seed, self.num_independent(), None)?;
        let work = self.for_jac_sets(seed)?;
        let mut out = S::new(self.num_dependent(), seed.end());
        for (i, d) in self.dependents.iter().enumerate() {
            out.union_from(i, &work, d.get());
        }
        Ok(out)
    }

    /// Forward Jacobian sets of every variable (plus array rows).
    pub(crate) fn for_jac_sets<S: SetVector>(&self, seed: &S) -> Result<S> {
        self.for_jac_sets_masked(seed, None)
    }

    /// As [`Tape::for_jac_sets`], leaving the result set of every op whose
    /// primary result is not in `needed` empty.
    pub(crate) fn for_jac_sets_masked<S: SetVector>(&self, seed: &S, needed: Option<&[bool]>) -> Result<S> {
        log::trace!("forward jacobian sparsity, {} columns", seed.end());
        let rows = ArrayRows::new(self);
        let mut s = S::new(self.num_var() + ArrayRows::count(self), seed.end());
        for j in 0..self.num_independent() {
            s.union_from(j + 1, seed, j);
        }
        let mut frame = SparseFrame::default();
        for op in self.iter() {
            if let Some(needed) = needed {
                let plain = op.num_res() > 0 && !matches!(op.code, OpCode::FunRV);
                if plain && !needed[op.result().get()] {
                    continue;
                }
            }
            self.for_jac_op(&op, &mut s, rows, &mut frame)?;
        }
        Ok(s)
    }

    fn for_jac_op<S: SetVector>(
        &self,
        op: &OpView<'_>,
        s: &mut S,
        rows: ArrayRows,
        frame: &mut SparseFrame,
    ) -> Result<()> {
        use OpCode::*;

        let code = op.code;
        match code {
            Inv => {}
            Ldp | Ldv => {
                let z = op.result().get();
                let array = op.idx(0);
                s.clear(z);
                match constant_element(self, code, op.args) {
                    Some(e) => {
                        s.union_with(z, rows.element(e));
                        s.union_with(z, rows.any(array));
                    }
                    None => s.union_with(z, rows.all(array)),
                }
            }
            Stpp | Stpv | Stvp | Stvv => {
                let array = op.idx(0);
                let value = matches!(code, Stpv | Stvv).then(|| op.idx(2));
                match constant_element(self, code, op.args) {
                    Some(e) => {
                        s.clear(rows.element(e));
                        if let Some(v) = value {
                            s.union_with(rows.element(e), v);
                        }
                    }
                    None => {
                        if let Some(v) = value {
                            s.union_with(rows.any(array), v);
                        }
                    }
                }
                if let Some(v) = value {
                    s.union_with(rows.all(array), v);
                }
            }
            AFun => {
                if !frame.open {
                    frame.open(op.args);
                } else {
                    frame.open = false;
                    let plugin = self.plugin(op)?;
                    let is_var = frame.is_var();
                    let call = frame.call_info(&is_var);
                    for r in frame.results.iter().flatten() {
                        s.clear(*r);
                    }
                    for (i, j) in plugin.for_jac_sparsity(&call) {
                        if let (Some(Some(z)), Some(Some(x))) = (frame.results.get(i), frame.args.get(j)) {
                            s.union_with(*z, *x);
                        }
                    }
                }
            }
            FunAP | FunAV | FunRP | FunRV => {
                let res = op.res_start.get();
                frame.collect(code, op.args, res);
            }
            _ => {
                if op.num_res() > 0 {
                    let z = op.result().get();
                    s.clear(z);
                    for_each_jac_var(code, op.args, |v| s.union_with(z, v as usize));
                }
            }
        }
        Ok(())
    }

    /// Reverse Jacobian sparsity.
    ///
    /// `seed` has one set per dependent (`seed.end()` rows of a range
    /// selection). Returns one set per independent: the rows that may
    /// depend on it.
    pub fn rev_jac_sparsity<S: SetVector>(&self, seed: &S) -> Result<S> {
        check_shape(seed, self.num_dependent(), None)?;
        let work = self.rev_jac_sets(seed)?;
        let mut out = S::new(self.num_independent(), seed.end());
        for j in 0..self.num_independent() {
            out.union_from(j, &work, j + 1);
        }
        Ok(out)
    }

    pub(crate) fn rev_jac_sets<S: SetVector>(&self, seed: &S) -> Result<S> {
        log::trace!("reverse jacobian sparsity, {} rows", seed.end());
        let rows = ArrayRows::new(self);
        let mut r = S::new(self.num_var() + ArrayRows::count(self), seed.end());
        for (i, d) in self.dependents.iter().enumerate() {
            r.union_from(d.get(), seed, i);
        }
        let mut frame = SparseFrame::default();
        for op in self.iter().rev() {
            self.rev_jac_op(&op, &mut r, rows, &mut frame)?;
        }
        Ok(r)
    }

    fn rev_jac_op<S: SetVector>(
        &self,
        op: &OpView<'_>,
        r: &mut S,
        rows: ArrayRows,
        frame: &mut SparseFrame,
    ) -> Result<()> {
        use OpCode::*;

        let code = op.code;
        match code {
            Inv => {}
            Ldp | Ldv => {
                let z = op.result().get();
                let array = op.idx(0);
                match constant_element(self, code, op.args) {
                    Some(e) => r.union_with(rows.element(e), z),
                    None => r.union_with(rows.any(array), z),
                }
                r.union_with(rows.all(array), z);
            }
            Stpp | Stpv | Stvp | Stvv => {
                let array = op.idx(0);
                let value = matches!(code, Stpv | Stvv).then(|| op.idx(2));
                match constant_element(self, code, op.args) {
                    Some(e) => {
                        if let Some(v) = value {
                            r.union_with(v, rows.element(e));
                            r.union_with(v, rows.any(array));
                        }
                        r.clear(rows.element(e));
                    }
                    None => {
                        if let Some(v) = value {
                            r.union_with(v, rows.all(array));
                        }
                    }
                }
            }
            AFun => {
                if !frame.open {
                    frame.open(op.args);
                } else {
                    frame.open = false;
                    frame.reverse_collected();
                    let plugin = self.plugin(op)?;
                    let is_var = frame.is_var();
                    let call = frame.call_info(&is_var);
                    for (i, j) in plugin.rev_jac_sparsity(&call) {
                        if let (Some(Some(z)), Some(Some(x))) = (frame.results.get(i), frame.args.get(j)) {
                            r.union_with(*x, *z);
                        }
                    }
                }
            }
            FunAP | FunAV | FunRP | FunRV => {
                let res = op.res_start.get();
                frame.collect(code, op.args, res);
            }
            _ => {
                if op.num_res() > 0 {
                    let z = op.result().get();
                    if !r.is_empty(z) {
                        for_each_jac_var(code, op.args, |v| r.union_with(v as usize, z));
                    }
                }
            }
        }
        Ok(())
    }

    /// Plug-in named by an `AFun` marker.
    pub(crate) fn plugin(&self, op: &OpView<'_>) -> Result<Arc<dyn AtomicFunction<F>>> {
        let id = AtomicId(op.arg(0));
        self.registry
            .atomic(id)
            .cloned()
            .ok_or(AdError::UnknownAtomic(id.0))
    }
}
