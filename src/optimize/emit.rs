//! Re-recording the surviving ops into a fresh tape.

use rustc_hash::FxHashMap;

use crate::error::internal_error;
use crate::float::Float;
use crate::index::{OpIndex, Operand, ParIndex, VarIndex, VecAdId};
use crate::opcode::{CompareOp, OpCode, FLAG_LEFT, FLAG_RIGHT, PRI_POS_VAR, PRI_VALUE_VAR};
use crate::tape::{for_each_arg, ArgKind, DynOp, OpView, Recorder, Tape};

use super::csum::{Fusion, SumTerms};
use super::needed::Liveness;
use super::skip::SkipPlan;

#[derive(Clone, Copy, Debug)]
enum Step {
    /// A surviving op of the input tape.
    Op(usize),
    /// The skip at this position of the plan list.
    Skip(usize),
}

/// Output order: surviving ops in input order, each skip right after the
/// op it waits for (or after the enclosing call bracket).
fn plan<F: Float>(tape: &Tape<F>, live: &Liveness, fusion: &Fusion<F>, skips: &[SkipPlan]) -> Vec<Step> {
    let mut by_anchor: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for (s, skip) in skips.iter().enumerate() {
        by_anchor.entry(skip.after).or_default().push(s);
    }
    let mut steps = Vec::with_capacity(tape.num_op());
    let mut waiting = Vec::new();
    let mut in_call = false;
    for (i, &code) in tape.op_codes().iter().enumerate() {
        if code == OpCode::AFun {
            in_call = !in_call;
        }
        if live.keep[i] && !fusion.absorbed[i] {
            steps.push(Step::Op(i));
        }
        if let Some(s) = by_anchor.get(&i) {
            waiting.extend_from_slice(s);
        }
        if !in_call && i >= tape.num_independent() && code != OpCode::End {
            steps.extend(waiting.drain(..).map(Step::Skip));
        }
    }
    steps
}

struct Rebuild<'a, F: Float> {
    tape: &'a Tape<F>,
    rep: &'a [u32],
    rec: Recorder<F>,
    vars: Vec<Option<VarIndex>>,
    pars: Vec<Option<ParIndex>>,
    constants: FxHashMap<u64, ParIndex>,
    /// Input op being emitted, for error messages.
    position: usize,
}

impl<F: Float> Rebuild<'_, F> {
    fn var(&self, old: u32) -> VarIndex {
        let v = self.rep[old as usize] as usize;
        match self.vars[v] {
            Some(new) => new,
            None => internal_error(
                self.tape.op_codes()[self.position],
                self.position,
                &format!("argument v{v} was not emitted before its reader"),
            ),
        }
    }

    fn constant(&mut self, value: F) -> ParIndex {
        let rec = &mut self.rec;
        *self
            .constants
            .entry(value.key_bits())
            .or_insert_with(|| rec.append_constant(value))
    }

    fn par(&mut self, old: u32) -> ParIndex {
        let p = old as usize;
        if p == ParIndex::PHANTOM.get() {
            return ParIndex::PHANTOM;
        }
        if !self.tape.is_dynamic[p] {
            return self.constant(self.tape.params[p]);
        }
        match self.pars[p] {
            Some(new) => new,
            None => internal_error(
                self.tape.op_codes()[self.position],
                self.position,
                &format!("dynamic parameter p{p} missing from the recipe"),
            ),
        }
    }

    fn operand(&mut self, is_var: bool, raw: u32) -> Operand {
        if is_var {
            Operand::Var(self.var(raw))
        } else {
            Operand::Par(self.par(raw))
        }
    }

    /// Dynamic parameters in recipe order, then array initial values.
    fn parameters(&mut self) {
        let tape = self.tape;
        for step in tape.dynamic_recipe() {
            let p = match step.op {
                DynOp::Independent => self.rec.new_dynamic(tape.parameter(step.result)),
                op => {
                    let args: Vec<ParIndex> = step.args[..op.arity()].iter().map(|a| self.par(a.0)).collect();
                    self.rec.dynamic_op(op, &args)
                }
            };
            self.pars[step.result.get()] = Some(p);
        }
        for info in &tape.vec_ad {
            let range = info.offset as usize..(info.offset + info.len) as usize;
            let init: Vec<ParIndex> = tape.vec_ad_init[range].iter().map(|p| self.par(p.0)).collect();
            self.rec.new_vec_ad(&init);
        }
    }

    fn cum_sum(&mut self, terms: &SumTerms<F>) -> VarIndex {
        let init = self.constant(terms.init);
        let add: Vec<VarIndex> = terms.add.iter().map(|&v| self.var(v)).collect();
        let sub: Vec<VarIndex> = terms.sub.iter().map(|&v| self.var(v)).collect();
        let dyn_add: Vec<ParIndex> = terms.dyn_add.iter().map(|&p| self.par(p)).collect();
        let dyn_sub: Vec<ParIndex> = terms.dyn_sub.iter().map(|&p| self.par(p)).collect();
        self.rec.cum_sum(init, &add, &sub, &dyn_add, &dyn_sub)
    }

    fn op(&mut self, op: &OpView<'_>, fusion: &Fusion<F>) -> VarIndex {
        self.position = op.index.get();
        if let Some(terms) = fusion.roots.get(&op.index.get()) {
            return self.cum_sum(terms);
        }
        match op.code {
            OpCode::Ldp | OpCode::Ldv => {
                let index = self.operand(op.code == OpCode::Ldv, op.arg(1));
                self.rec.load(VecAdId(op.arg(0)), index)
            }
            OpCode::Pri => {
                let flags = op.arg(0);
                let pos = self.operand(flags & PRI_POS_VAR != 0, op.arg(1));
                let value = self.operand(flags & PRI_VALUE_VAR != 0, op.arg(3));
                let tape = self.tape;
                self.rec.print(pos, tape.text(op.arg(2)), value, tape.text(op.arg(4)));
                VarIndex::SENTINEL
            }
            code => {
                let mut args = op.args.to_vec();
                for_each_arg(code, op.args, |j, kind| match kind {
                    ArgKind::Var => args[j] = self.var(op.args[j]).0,
                    ArgKind::Par => args[j] = self.par(op.args[j]).0,
                    ArgKind::Imm => {}
                });
                self.rec.append(code, &args)
            }
        }
    }

    fn skip(&mut self, cexp: &OpView<'_>, skip: &SkipPlan, new_index: &[usize]) {
        self.position = skip.cexp;
        let Some(cop) = CompareOp::decode(cexp.arg(0)) else {
            internal_error(OpCode::CExp, skip.cexp, "invalid comparison code");
        };
        let flags = cexp.arg(1);
        let left = self.operand(flags & FLAG_LEFT != 0, cexp.arg(2));
        let right = self.operand(flags & FLAG_RIGHT != 0, cexp.arg(3));
        let here = self.rec.num_op();
        let targets = |ops: &[usize]| -> Vec<OpIndex> {
            ops.iter()
                .map(|&i| new_index[i])
                .filter(|&t| t != usize::MAX && t > here)
                .map(OpIndex::from_usize)
                .collect()
        };
        let if_true = targets(&skip.if_true);
        let if_false = targets(&skip.if_false);
        self.rec.cond_skip(cop, left, right, &if_true, &if_false);
    }
}

/// Build the optimized tape.
pub(super) fn rebuild<F: Float>(
    tape: &Tape<F>,
    rep: &[u32],
    live: &Liveness,
    fusion: &Fusion<F>,
    skips: &[SkipPlan],
) -> Tape<F> {
    let steps = plan(tape, live, fusion, skips);
    let mut new_index = vec![usize::MAX; tape.num_op()];
    for (pos, step) in steps.iter().enumerate() {
        if let Step::Op(i) = *step {
            new_index[i] = pos;
        }
    }

    let mut out = Rebuild {
        tape,
        rep,
        rec: Recorder::with_registry(tape.registry().clone()),
        vars: vec![None; tape.num_var()],
        pars: vec![None; tape.num_par()],
        constants: FxHashMap::default(),
        position: 0,
    };
    let x = out.rec.independent(tape.num_independent());
    for (j, v) in x.into_iter().enumerate() {
        out.vars[j + 1] = Some(v);
    }
    out.parameters();

    let table = tape.random_access();
    for step in &steps {
        match *step {
            Step::Op(i) => {
                let op = tape.op(&table, OpIndex::from_usize(i));
                if matches!(op.code, OpCode::Begin | OpCode::Inv | OpCode::End) {
                    continue;
                }
                let z = out.op(&op, fusion);
                if op.num_res() > 0 {
                    out.vars[op.result().get()] = Some(z);
                }
            }
            Step::Skip(s) => {
                let cexp = tape.op(&table, OpIndex::from_usize(skips[s].cexp));
                out.skip(&cexp, &skips[s], &new_index);
            }
        }
    }

    out.position = tape.num_op() - 1;
    let dependents: Vec<VarIndex> = tape.dependents().iter().map(|d| out.var(d.0)).collect();
    out.rec.finalize(&dependents)
}
