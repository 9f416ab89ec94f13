//! Cumulative-sum fusion.
//!
//! An addition, subtraction or negation whose result is read exactly once,
//! by another such op, is folded into its reader. Every op left at the top
//! of a folded tree becomes one `CSum` over the leaves of the tree: constant
//! leaves are added into the sum's initial value, dynamic parameter leaves
//! and variable leaves keep their sign.

use rustc_hash::FxHashMap;

use crate::float::Float;
use crate::index::OpIndex;
use crate::opcode::OpCode;
use crate::tape::{for_each_var_arg, CSumLayout, OpView, Tape};

use super::needed::Liveness;

/// Leaves of one fused sum. Variables are representatives in the input
/// tape's numbering, parameters are input pool indices.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct SumTerms<F> {
    pub init: F,
    pub add: Vec<u32>,
    pub sub: Vec<u32>,
    pub dyn_add: Vec<u32>,
    pub dyn_sub: Vec<u32>,
}

pub(super) struct Fusion<F> {
    /// Ops folded into their reader, by input op index.
    pub absorbed: Vec<bool>,
    /// Terms of every op that is re-emitted as a `CSum`.
    pub roots: FxHashMap<usize, SumTerms<F>>,
}

impl<F: Float> Fusion<F> {
    pub fn none(num_op: usize) -> Self {
        Fusion {
            absorbed: vec![false; num_op],
            roots: FxHashMap::default(),
        }
    }
}

fn is_sum(code: OpCode) -> bool {
    use OpCode::*;
    matches!(code, AddPV | AddVV | SubPV | SubVP | SubVV | Neg | CSum)
}

#[derive(Clone, Copy)]
enum Leaf {
    Var(u32),
    Par(u32),
}

/// Operands of a sum op with their sign (`true` = subtracted).
fn signed_operands(op: &OpView<'_>, mut f: impl FnMut(Leaf, bool)) {
    use OpCode::*;
    let a = op.args;
    match op.code {
        AddPV => {
            f(Leaf::Par(a[0]), false);
            f(Leaf::Var(a[1]), false);
        }
        AddVV => {
            f(Leaf::Var(a[0]), false);
            f(Leaf::Var(a[1]), false);
        }
        SubPV => {
            f(Leaf::Par(a[0]), false);
            f(Leaf::Var(a[1]), true);
        }
        SubVP => {
            f(Leaf::Var(a[0]), false);
            f(Leaf::Par(a[1]), true);
        }
        SubVV => {
            f(Leaf::Var(a[0]), false);
            f(Leaf::Var(a[1]), true);
        }
        Neg => f(Leaf::Var(a[0]), true),
        CSum => {
            let layout = CSumLayout::of(a);
            f(Leaf::Par(a[0]), false);
            a[layout.add.0..layout.add.1].iter().for_each(|&v| f(Leaf::Var(v), false));
            a[layout.sub.0..layout.sub.1].iter().for_each(|&v| f(Leaf::Var(v), true));
            a[layout.dyn_add.0..layout.dyn_add.1].iter().for_each(|&p| f(Leaf::Par(p), false));
            a[layout.dyn_sub.0..layout.dyn_sub.1].iter().for_each(|&p| f(Leaf::Par(p), true));
        }
        _ => {}
    }
}

pub(super) fn fuse<F: Float>(tape: &Tape<F>, rep: &[u32], live: &Liveness) -> Fusion<F> {
    let num_var = tape.num_var();
    let mut uses = vec![0u32; num_var];
    let mut reader = vec![usize::MAX; num_var];
    let mut producer = vec![usize::MAX; num_var];
    let mut codes = vec![OpCode::End; tape.num_op()];
    for d in tape.dependents() {
        uses[rep[d.get()] as usize] += 1;
    }
    for op in tape.iter() {
        let i = op.index.get();
        codes[i] = op.code;
        if op.num_res() > 0 {
            producer[op.result().get()] = i;
        }
        if live.keep[i] {
            for_each_var_arg(op.code, op.args, |a| {
                let v = rep[a as usize] as usize;
                uses[v] += 1;
                reader[v] = i;
            });
        }
    }

    let mut fusion = Fusion::none(tape.num_op());
    for op in tape.iter() {
        let i = op.index.get();
        if !live.keep[i] || !is_sum(op.code) {
            continue;
        }
        let z = op.result().get();
        let r = reader[z];
        fusion.absorbed[i] = uses[z] == 1 && r != usize::MAX && is_sum(codes[r]);
    }

    let table = tape.random_access();
    for op in tape.iter() {
        let i = op.index.get();
        if !live.keep[i] || fusion.absorbed[i] || !is_sum(op.code) {
            continue;
        }
        let mut folds = false;
        signed_operands(&op, |leaf, _| {
            if let Leaf::Var(v) = leaf {
                let p = producer[rep[v as usize] as usize];
                folds |= p != usize::MAX && fusion.absorbed[p];
            }
        });
        if !folds {
            continue;
        }

        let mut terms = SumTerms {
            init: F::zero(),
            add: Vec::new(),
            sub: Vec::new(),
            dyn_add: Vec::new(),
            dyn_sub: Vec::new(),
        };
        let mut stack = vec![(i, false)];
        while let Some((j, negate)) = stack.pop() {
            let node = tape.op(&table, OpIndex::from_usize(j));
            signed_operands(&node, |leaf, minus| {
                let minus = minus != negate;
                match leaf {
                    Leaf::Var(v) => {
                        let v = rep[v as usize];
                        let p = producer[v as usize];
                        if p != usize::MAX && fusion.absorbed[p] {
                            stack.push((p, minus));
                        } else if minus {
                            terms.sub.push(v);
                        } else {
                            terms.add.push(v);
                        }
                    }
                    Leaf::Par(p) if tape.is_dynamic[p as usize] => {
                        if minus {
                            terms.dyn_sub.push(p);
                        } else {
                            terms.dyn_add.push(p);
                        }
                    }
                    Leaf::Par(p) => {
                        let value = tape.params[p as usize];
                        if minus {
                            terms.init = terms.init - value;
                        } else {
                            terms.init = terms.init + value;
                        }
                    }
                }
            });
        }
        fusion.roots.insert(i, terms);
    }
    fusion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::needed::liveness;
    use crate::optimize::value::value_numbers;
    use crate::optimize::OptimizeOptions;
    use crate::tape::{BinaryOp, Recorder};

    #[test]
    fn shared_partial_sums_stay_separate() {
        // a = x0 + x1 is read twice, so it is a leaf of both sums
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(3);
        let a = rec.binary(BinaryOp::Add, x[0].into(), x[1].into());
        let b = rec.binary(BinaryOp::Sub, a.into(), x[2].into());
        let c = rec.binary(BinaryOp::Add, a.into(), x[2].into());
        let tape = rec.finalize(&[b, c]);

        let (rep, _) = value_numbers(&tape);
        let live = liveness(&tape, &rep, &OptimizeOptions::default());
        let fusion: Fusion<f64> = fuse(&tape, &rep, &live);
        assert!(fusion.absorbed.iter().all(|&a| !a));
        assert!(fusion.roots.is_empty());
    }

    #[test]
    fn constants_fold_into_the_initial_value() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let two = rec.append_constant(2.0);
        let five = rec.append_constant(5.0);
        let a = rec.binary(BinaryOp::Sub, two.into(), x[0].into());
        let b = rec.binary(BinaryOp::Sub, a.into(), five.into());
        let c = rec.binary(BinaryOp::Add, b.into(), x[1].into());
        let tape = rec.finalize(&[c]);

        let (rep, _) = value_numbers(&tape);
        let live = liveness(&tape, &rep, &OptimizeOptions::default());
        let fusion: Fusion<f64> = fuse(&tape, &rep, &live);
        let root = tape
            .iter()
            .find(|op| op.num_res() > 0 && op.result() == c)
            .unwrap()
            .index
            .get();
        let terms = &fusion.roots[&root];
        assert_eq!(terms.init, -3.0);
        assert_eq!(terms.add, vec![x[1].0]);
        assert_eq!(terms.sub, vec![x[0].0]);
    }
}
