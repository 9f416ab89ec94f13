//! Conditional-skip candidates.

use rustc_hash::FxHashMap;

use crate::float::Float;
use crate::opcode::{self, OpCode, FLAG_LEFT, FLAG_RIGHT};
use crate::tape::Tape;

use super::needed::{Connection, Liveness};

/// One `CSkip` to insert: op indices are those of the input tape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct SkipPlan {
    /// The conditional expression whose comparison decides the skip.
    pub cexp: usize,
    /// Last op producing a comparison operand; the skip goes right after it.
    pub after: usize,
    /// Ops to skip when the comparison holds.
    pub if_true: Vec<usize>,
    /// Ops to skip when it does not.
    pub if_false: Vec<usize>,
}

impl SkipPlan {
    fn new(cexp: usize) -> Self {
        SkipPlan {
            cexp,
            after: usize::MAX,
            if_true: Vec::new(),
            if_false: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.if_true.len() + self.if_false.len()
    }
}

/// Ops that only compute a value and can be left out of a sweep.
fn skippable(code: OpCode) -> bool {
    opcode::num_res(code) > 0
        && (opcode::is_unary(code)
            || opcode::binary_operands(code).is_some()
            || matches!(code, OpCode::Par | OpCode::Dis | OpCode::CExp | OpCode::CSum))
}

/// Skips for every surviving `CExp` that has ops reached only through one of
/// its branches, in `CExp` order.
pub(super) fn candidates<F: Float>(
    tape: &Tape<F>,
    rep: &[u32],
    live: &Liveness,
    absorbed: &[bool],
) -> Vec<SkipPlan> {
    let mut producer = vec![0usize; tape.num_var()];
    let mut plans: FxHashMap<usize, SkipPlan> = FxHashMap::default();
    let mut order = Vec::new();

    for op in tape.iter() {
        let i = op.index.get();
        let n_res = op.num_res();
        for v in op.res_start.get()..op.res_start.get() + n_res {
            producer[v] = i;
        }
        if !live.keep[i] || absorbed[i] {
            continue;
        }
        if op.code == OpCode::CExp {
            // independents are declared together, so nothing goes between them
            let mut after = tape.num_independent();
            let flags = op.arg(1);
            for (j, bit) in [(2, FLAG_LEFT), (3, FLAG_RIGHT)] {
                if flags & bit != 0 {
                    after = after.max(producer[rep[op.idx(j)] as usize]);
                }
            }
            order.push(i);
            plans.entry(i).or_insert_with(|| SkipPlan::new(i)).after = after;
        }
        if !skippable(op.code) {
            continue;
        }
        if let Connection::Branch { cexp, holds } = live.connection[op.result().get()] {
            // the CExp itself comes later
            let plan = plans.entry(cexp).or_insert_with(|| SkipPlan::new(cexp));
            if holds {
                plan.if_false.push(i);
            } else {
                plan.if_true.push(i);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|c| plans.remove(&c))
        .filter_map(|mut plan| {
            let after = plan.after;
            plan.if_true.retain(|&t| t > after);
            plan.if_false.retain(|&t| t > after);
            (plan.len() > 0).then_some(plan)
        })
        .collect()
}
