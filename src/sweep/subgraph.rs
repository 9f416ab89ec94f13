//! Reverse sweeps restricted to the ops one dependent reads.
//!
//! The subgraph of a dependent is the list of ops, in tape order, with a
//! result that dependent can depend on. Call brackets are kept whole.
//! Sweeping only those ops gives the same partials as a full reverse sweep
//! weighted on that dependent alone.

use std::sync::Arc;

use crate::error::{check_len, AdError, Result};
use crate::eval::Evaluator;
use crate::float::Float;
use crate::index::OpIndex;
use crate::opcode::{self, OpCode};
use crate::sparse::{identity, PackSet, SetVector};
use crate::sweep::Partials;
use crate::tape::{for_each_var_arg, RandomAccess, Tape};

impl<F: Float> Tape<F> {
    /// Ops a reverse sweep from dependent `dep` has to visit, in tape order.
    pub fn subgraph(&self, dep: usize) -> Result<Vec<OpIndex>> {
        self.check_dependent(dep)?;
        let mut select = vec![false; self.num_dependent()];
        select[dep] = true;
        let needed = self.needed_vars(&select)?;
        Ok(self.collect_subgraph(dep, |v| needed[v]))
    }

    /// Subgraphs of every dependent from one reverse sparsity pass.
    pub(crate) fn subgraphs(&self) -> Result<Vec<Vec<OpIndex>>> {
        let m = self.num_dependent();
        let reach: PackSet = self.rev_jac_sets(&identity::<PackSet>(m))?;
        Ok((0..m)
            .map(|i| self.collect_subgraph(i, |v| reach.is_element(v, i)))
            .collect())
    }

    fn check_dependent(&self, dep: usize) -> Result<()> {
        let count = self.num_dependent();
        if dep < count {
            Ok(())
        } else {
            Err(AdError::DependentIndex { index: dep, count })
        }
    }

    fn collect_subgraph(&self, dep: usize, needed: impl Fn(usize) -> bool) -> Vec<OpIndex> {
        let mut ops = Vec::new();
        // start of the open bracket in `ops`, and whether a result is needed
        let mut bracket: Option<(usize, bool)> = None;
        for op in self.iter() {
            let code = op.code;
            if code == OpCode::AFun {
                match bracket.take() {
                    None => {
                        bracket = Some((ops.len(), false));
                        ops.push(op.index);
                    }
                    Some((_, true)) => ops.push(op.index),
                    Some((start, false)) => ops.truncate(start),
                }
                continue;
            }
            if opcode::is_call_bracket(code) {
                if let Some((_, used)) = bracket.as_mut() {
                    *used |= code == OpCode::FunRV && needed(op.result().get());
                }
                ops.push(op.index);
                continue;
            }
            if code == OpCode::Inv {
                continue;
            }
            let first = op.res_start.get();
            if (first..first + op.num_res()).any(&needed) {
                ops.push(op.index);
            }
        }
        log::trace!("subgraph of dependent {dep}: {} of {} ops", ops.len(), self.num_op());
        ops
    }
}

impl<F: Float> Evaluator<F> {
    /// Reverse sweep of order `q` for dependent `dep` alone, visiting only
    /// its subgraph.
    ///
    /// Returns the partials of `y_dep^(q-1)` with respect to every
    /// independent coefficient, laid out `[j * q + k]` as
    /// [`reverse`](Evaluator::reverse) does. Independents with
    /// `select_domain[j]` false get zeros.
    pub fn subgraph_reverse(&mut self, q: usize, dep: usize, select_domain: &[bool]) -> Result<Vec<F>> {
        self.check_reverse_ready(q)?;
        let tape = Arc::clone(&self.tape);
        let n = tape.num_independent();
        check_len("domain selection", n, select_domain.len())?;
        let ops = tape.subgraph(dep)?;
        let table = tape.random_access();
        let mut pd = Partials::new(tape.num_var(), q);
        self.subgraph_sweep(&tape, &table, &ops, dep, &mut pd)?;

        let mut out = vec![F::zero(); n * q];
        for (j, &sel) in select_domain.iter().enumerate() {
            if sel {
                out[j * q..(j + 1) * q].copy_from_slice(pd.row(j + 1));
            }
        }
        Ok(out)
    }

    /// Seed `dep` at the top order of `pd` and sweep its subgraph. `pd` must
    /// be zero wherever the sweep writes; [`clear_subgraph`] restores that.
    pub(crate) fn subgraph_sweep(
        &mut self,
        tape: &Tape<F>,
        table: &RandomAccess,
        ops: &[OpIndex],
        dep: usize,
        pd: &mut Partials<F>,
    ) -> Result<()> {
        let d = pd.num_order() - 1;
        pd.add(tape.dependents[dep].get(), d, F::one());
        self.reverse_ops(tape, ops.iter().rev().map(|&i| tape.op(table, i)), pd, d)
    }
}

/// Zero every partial a sweep over `ops` from `dep` can have written.
pub(crate) fn clear_subgraph<F: Float>(
    tape: &Tape<F>,
    table: &RandomAccess,
    ops: &[OpIndex],
    dep: usize,
    pd: &mut Partials<F>,
) {
    pd.clear(tape.dependents[dep].get());
    for j in 1..=tape.num_independent() {
        pd.clear(j);
    }
    for &i in ops {
        let op = tape.op(table, i);
        let first = op.res_start.get();
        for v in first..first + op.num_res() {
            pd.clear(v);
        }
        for_each_var_arg(op.code, op.args, |v| pd.clear(v as usize));
    }
}

#[cfg(test)]
mod tests {
    use crate::tape::{BinaryOp, Recorder};
    use crate::{AdError, Evaluator, OpCode, Tape};
    use approx::assert_relative_eq;

    /// y0 = sin(x0) * x1, y1 = exp(x2), y2 = x1 + x2
    fn three_rows() -> Tape<f64> {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(3);
        let s = rec.unary(OpCode::Sin, x[0]);
        let y0 = rec.binary(BinaryOp::Mul, s.into(), x[1].into());
        let y1 = rec.unary(OpCode::Exp, x[2]);
        let y2 = rec.binary(BinaryOp::Add, x[1].into(), x[2].into());
        rec.finalize(&[y0, y1, y2])
    }

    #[test]
    fn subgraph_holds_only_what_the_dependent_reads() {
        let tape = three_rows();
        let codes: Vec<OpCode> = tape.subgraph(0).unwrap().iter().map(|&i| tape.op_codes()[i.get()]).collect();
        assert_eq!(codes, vec![OpCode::Sin, OpCode::MulVV]);
        assert_eq!(tape.subgraph(1).unwrap().len(), 1);
        assert!(matches!(tape.subgraph(3), Err(AdError::DependentIndex { index: 3, count: 3 })));
    }

    #[test]
    fn subgraph_reverse_matches_a_row_of_the_jacobian() {
        let x = [0.4, -1.5, 0.3];
        let mut ev = Evaluator::from_tape(three_rows());
        let jac = ev.jacobian(&x).unwrap();
        ev.forward_zero(&x).unwrap();
        for i in 0..3 {
            let row = ev.subgraph_reverse(1, i, &[true; 3]).unwrap();
            for j in 0..3 {
                assert_relative_eq!(row[j], jac[i * 3 + j], epsilon = 1e-14);
            }
        }
        let row = ev.subgraph_reverse(1, 0, &[false, true, true]).unwrap();
        assert_eq!(row[0], 0.0);
        assert_relative_eq!(row[1], 0.4_f64.sin());
    }

    #[test]
    fn subgraph_reverse_needs_forward_orders() {
        let mut ev = Evaluator::from_tape(three_rows());
        assert!(matches!(
            ev.subgraph_reverse(1, 0, &[true; 3]),
            Err(AdError::ReverseNotReady { .. })
        ));
        ev.forward_zero(&[0.0; 3]).unwrap();
        assert!(matches!(ev.subgraph_reverse(1, 0, &[true; 2]), Err(AdError::Length { .. })));
    }
}
