//! Value numbering.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::float::Float;
use crate::opcode::{self, OpCode};
use crate::tape::{for_each_arg, ArgKind, Tape};

/// Identity of one argument slot after substitution. Constants are compared
/// by bit pattern, dynamic parameters by pool index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Slot {
    Var(u32),
    Dynamic(u32),
    Constant(u64),
    Imm(u32),
}

/// Ops whose result is a pure function of their arguments. Loads depend on
/// array state and plug-in results on the whole call, so they never merge.
fn numbered(code: OpCode) -> bool {
    opcode::num_res(code) > 0
        && !matches!(
            code,
            OpCode::Begin | OpCode::Inv | OpCode::Ldp | OpCode::Ldv | OpCode::FunRV
        )
}

/// Representative of every variable and the number of merged ops.
///
/// `rep[v]` is the first variable computed by an op with the same code and
/// the same substituted arguments as the op computing `v`; variables with no
/// earlier twin represent themselves. Only primary results are redirected,
/// auxiliary results are never read by other ops.
pub(super) fn value_numbers<F: Float>(tape: &Tape<F>) -> (Vec<u32>, usize) {
    let mut rep: Vec<u32> = (0..tape.num_var() as u32).collect();
    // Keys hold every slot, so a hash collision never merges two ops.
    let mut table: FxHashMap<(OpCode, Vec<Slot>), u32> = FxHashMap::default();
    let mut merged = 0;

    for op in tape.iter() {
        if !numbered(op.code) {
            continue;
        }
        let mut key = Vec::with_capacity(op.args.len());
        for_each_arg(op.code, op.args, |j, kind| {
            let raw = op.args[j];
            key.push(match kind {
                ArgKind::Var => Slot::Var(rep[raw as usize]),
                ArgKind::Par if tape.is_dynamic[raw as usize] => Slot::Dynamic(raw),
                ArgKind::Par => Slot::Constant(tape.params[raw as usize].key_bits()),
                ArgKind::Imm => Slot::Imm(raw),
            });
        });
        if opcode::is_commutative(op.code) && key[1] < key[0] {
            key.swap(0, 1);
        }

        let z = op.result().0;
        match table.entry((op.code, key)) {
            Entry::Occupied(e) => {
                rep[z as usize] = *e.get();
                merged += 1;
            }
            Entry::Vacant(e) => {
                e.insert(z);
            }
        }
    }
    (rep, merged)
}
