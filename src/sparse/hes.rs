//! Hessian sparsity, forward and reverse.
//!
//! Both directions start from the forward Jacobian sets `J(v)`. The forward
//! version marks, for every op that can reach a selected dependent, the
//! independent pairs its second derivative couples. The reverse version
//! carries, for every variable, the seed columns `H(v)` such that the
//! second partial of the target with respect to `v` and that column may be
//! nonzero.

use crate::error::{check_len, Result};
use crate::float::Float;
use crate::opcode::{self, HesClass, OpCode};
use crate::tape::{for_each_jac_var, OpView, Tape};

use super::pattern::HessianPattern;
use super::{check_shape, constant_element, ArrayRows, PackSet, SetVector, SparseFrame};

/// Variable operands of a nonlinear op, `(x, y)` in tape order.
fn var_operands(op: &OpView<'_>) -> (Option<usize>, Option<usize>) {
    if opcode::is_unary(op.code) {
        return (Some(op.idx(0)), None);
    }
    match opcode::binary_operands(op.code) {
        Some((true, true)) => (Some(op.idx(0)), Some(op.idx(1))),
        Some((true, false)) => (Some(op.idx(0)), None),
        Some((false, true)) => (Some(op.idx(1)), None),
        _ => (None, None),
    }
}

/// `h[a] ∪= J(b)` for every `a ∈ J(a_row)`.
fn mark_pairs<S: SetVector>(h: &mut S, jac: &S, a_row: usize, b_row: usize) {
    jac.for_each(a_row, |a| h.union_from(a, jac, b_row));
}

impl<F: Float> Tape<F> {
    /// Which variables (and array rows) can reach a selected dependent.
    pub(crate) fn needed_vars(&self, select_range: &[bool]) -> Result<Vec<bool>> {
        check_len("range selection", self.num_dependent(), select_range.len())?;
        let mut seed = PackSet::new(self.num_dependent(), 1);
        for (i, &sel) in select_range.iter().enumerate() {
            if sel {
                seed.add_element(i, 0);
            }
        }
        let r = self.rev_jac_sets(&seed)?;
        Ok((0..r.n_set()).map(|v| !r.is_empty(v)).collect())
    }

    /// Forward Hessian sparsity of `Σ_{i selected} y_i`, restricted to the
    /// selected independents. Returns the lower triangle.
    pub fn for_hes_sparsity<S: SetVector>(
        &self,
        select_domain: &[bool],
        select_range: &[bool],
    ) -> Result<HessianPattern> {
        let n = self.num_independent();
        check_len("domain selection", n, select_domain.len())?;
        let needed = self.needed_vars(select_range)?;

        let mut seed = S::new(n, n);
        for (j, &sel) in select_domain.iter().enumerate() {
            if sel {
                seed.add_element(j, j);
            }
        }
        let jac = self.for_jac_sets_masked(&seed, Some(&needed))?;

        log::trace!("forward hessian sparsity over {n} independents");
        let mut h = S::new(n, n);
        let mut frame = SparseFrame::default();
        for op in self.iter() {
            let code = op.code;
            if opcode::is_call_bracket(code) {
                if code != OpCode::AFun {
                    frame.collect(code, op.args, op.res_start.get());
                } else if !frame.open {
                    frame.open(op.args);
                } else {
                    frame.open = false;
                    let plugin = self.plugin(&op)?;
                    let is_var = frame.is_var();
                    let select_y: Vec<bool> = frame
                        .results
                        .iter()
                        .map(|r| r.is_some_and(|v| needed[v]))
                        .collect();
                    let call = frame.call_info(&is_var);
                    for (j, l) in plugin.for_hes_sparsity(&call, &select_y) {
                        if let (Some(Some(xj)), Some(Some(xl))) = (frame.args.get(j), frame.args.get(l)) {
                            mark_pairs(&mut h, &jac, *xj, *xl);
                            mark_pairs(&mut h, &jac, *xl, *xj);
                        }
                    }
                }
                continue;
            }
            if op.num_res() == 0 || !needed[op.result().get()] {
                continue;
            }
            let (x, y) = var_operands(&op);
            match (opcode::hes_class(code), x, y) {
                (HesClass::Nonlinear, Some(x), _) => mark_pairs(&mut h, &jac, x, x),
                (HesClass::Mul, Some(x), Some(y)) => {
                    mark_pairs(&mut h, &jac, x, y);
                    mark_pairs(&mut h, &jac, y, x);
                }
                (HesClass::Div, Some(x), Some(y)) => {
                    mark_pairs(&mut h, &jac, x, y);
                    mark_pairs(&mut h, &jac, y, x);
                    mark_pairs(&mut h, &jac, y, y);
                }
                (HesClass::Pow, Some(x), Some(y)) => {
                    for a in [x, y] {
                        for b in [x, y] {
                            mark_pairs(&mut h, &jac, a, b);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(HessianPattern::from_sets(&h))
    }

    /// Reverse Hessian sparsity.
    ///
    /// `seed` has one set per independent (`q = seed.end()` columns), as for
    /// [`Tape::for_jac_sparsity`]. Returns one set per independent `j`: the
    /// columns `l` for which the second partial of `Σ_{i selected} y_i` with
    /// respect to `x_j` and seed direction `l` may be nonzero. With the
    /// identity seed this is the full Hessian pattern, row by row.
    pub fn rev_hes_sparsity<S: SetVector>(&self, seed: &S, select_range: &[bool]) -> Result<S> {
        check_shape(seed, self.num_independent(), None)?;
        let needed = self.needed_vars(select_range)?;
        let jac = self.for_jac_sets(seed)?;
        let rows = ArrayRows::new(self);

        log::trace!("reverse hessian sparsity, {} columns", seed.end());
        let mut h = S::new(self.num_var() + ArrayRows::count(self), seed.end());
        let mut frame = SparseFrame::default();
        for op in self.iter().rev() {
            self.rev_hes_op(&op, &mut h, &jac, &needed, rows, &mut frame)?;
        }

        let mut out = S::new(self.num_independent(), seed.end());
        for j in 0..self.num_independent() {
            out.union_from(j, &h, j + 1);
        }
        Ok(out)
    }

    fn rev_hes_op<S: SetVector>(
        &self,
        op: &OpView<'_>,
        h: &mut S,
        jac: &S,
        needed: &[bool],
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
                    Some(e) => h.union_with(rows.element(e), z),
                    None => h.union_with(rows.any(array), z),
                }
                h.union_with(rows.all(array), z);
            }
            Stpp | Stpv | Stvp | Stvv => {
                let array = op.idx(0);
                let value = matches!(code, Stpv | Stvv).then(|| op.idx(2));
                match constant_element(self, code, op.args) {
                    Some(e) => {
                        if let Some(v) = value {
                            h.union_with(v, rows.element(e));
                            h.union_with(v, rows.any(array));
                        }
                        h.clear(rows.element(e));
                    }
                    None => {
                        if let Some(v) = value {
                            h.union_with(v, rows.all(array));
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
                            h.union_with(*x, *z);
                        }
                    }
                    let select_y: Vec<bool> = frame
                        .results
                        .iter()
                        .map(|r| r.is_some_and(|v| needed[v]))
                        .collect();
                    for (j, l) in plugin.for_hes_sparsity(&call, &select_y) {
                        if let (Some(Some(xj)), Some(Some(xl))) = (frame.args.get(j), frame.args.get(l)) {
                            h.union_from(*xj, jac, *xl);
                            h.union_from(*xl, jac, *xj);
                        }
                    }
                }
            }
            FunAP | FunAV | FunRP | FunRV => {
                frame.collect(code, op.args, op.res_start.get());
            }
            _ => {
                if op.num_res() == 0 {
                    return Ok(());
                }
                let z = op.result().get();
                if h.is_empty(z) && !needed[z] {
                    return Ok(());
                }
                for_each_jac_var(code, op.args, |v| h.union_with(v as usize, z));
                if !needed[z] {
                    return Ok(());
                }
                let (x, y) = var_operands(op);
                match (opcode::hes_class(code), x, y) {
                    (HesClass::Nonlinear, Some(x), _) => h.union_from(x, jac, x),
                    (HesClass::Mul, Some(x), Some(y)) => {
                        h.union_from(x, jac, y);
                        h.union_from(y, jac, x);
                    }
                    (HesClass::Div, Some(x), Some(y)) => {
                        h.union_from(x, jac, y);
                        h.union_from(y, jac, x);
                        h.union_from(y, jac, y);
                    }
                    (HesClass::Pow, Some(x), Some(y)) => {
                        for a in [x, y] {
                            h.union_from(a, jac, x);
                            h.union_from(a, jac, y);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
