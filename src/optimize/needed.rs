//! Liveness and branch connections, computed in one reverse pass.

use crate::float::Float;
use crate::opcode::{self, OpCode, FLAG_FALSE, FLAG_LEFT, FLAG_RIGHT, FLAG_TRUE};
use crate::tape::{for_each_var_arg, OpView, Tape};

use super::OptimizeOptions;

/// How a variable is reached from the dependents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Connection {
    /// Not read by any surviving op.
    Unused,
    /// Read unconditionally.
    Always,
    /// Only read through one branch of the `CExp` at op `cexp`: the branch
    /// taken when the comparison `holds` (or when it does not).
    Branch { cexp: usize, holds: bool },
}

impl Connection {
    fn merge(self, other: Connection) -> Connection {
        match (self, other) {
            (Connection::Unused, c) | (c, Connection::Unused) => c,
            (a, b) if a == b => a,
            _ => Connection::Always,
        }
    }
}

pub(super) struct Liveness {
    /// Surviving ops, by op index of the input tape.
    pub keep: Vec<bool>,
    /// Variables read by a surviving op or listed as dependents.
    pub needed: Vec<bool>,
    pub connection: Vec<Connection>,
}

impl Liveness {
    fn read(&mut self, v: usize, via: Connection) {
        self.needed[v] = true;
        self.connection[v] = self.connection[v].merge(via);
    }

    /// A plug-in call survives as a whole when any of its results is read.
    fn call(&mut self, bracket: &[OpView<'_>], rep: &[u32]) {
        let used = bracket
            .iter()
            .any(|op| op.code == OpCode::FunRV && self.needed[op.result().get()]);
        if !used {
            return;
        }
        for op in bracket {
            self.keep[op.index.get()] = true;
            if op.code == OpCode::FunAV {
                self.read(rep[op.idx(0)] as usize, Connection::Always);
            }
        }
    }
}

/// Mark surviving ops, walking from the dependents backwards.
///
/// Arguments are read through `rep`, so an op merged into an earlier twin
/// never survives and its twin inherits its readers. Existing `CSkip` ops
/// are dropped; skips are derived afresh from the connections.
pub(super) fn liveness<F: Float>(tape: &Tape<F>, rep: &[u32], options: &OptimizeOptions) -> Liveness {
    use OpCode::*;

    let mut live = Liveness {
        keep: vec![false; tape.num_op()],
        needed: vec![false; tape.num_var()],
        connection: vec![Connection::Unused; tape.num_var()],
    };
    for d in tape.dependents() {
        live.read(rep[d.get()] as usize, Connection::Always);
    }
    let mut array_loaded = vec![false; tape.num_vec_ad()];
    let mut bracket: Vec<OpView<'_>> = Vec::new();
    let mut in_call = false;

    for op in tape.iter().rev() {
        let i = op.index.get();
        match op.code {
            Begin | End | Inv => live.keep[i] = true,
            CSkip => {}
            AFun if !in_call => {
                in_call = true;
                bracket.clear();
                bracket.push(op);
            }
            AFun => {
                in_call = false;
                bracket.push(op);
                live.call(&bracket, rep);
            }
            FunAP | FunAV | FunRP | FunRV => bracket.push(op),
            Ldp | Ldv => {
                if live.needed[op.result().get()] {
                    live.keep[i] = true;
                    array_loaded[op.idx(0)] = true;
                    if op.code == Ldv {
                        live.read(rep[op.idx(1)] as usize, Connection::Always);
                    }
                }
            }
            Stpp | Stpv | Stvp | Stvv => {
                if array_loaded[op.idx(0)] {
                    live.keep[i] = true;
                    for_each_var_arg(op.code, op.args, |a| live.read(rep[a as usize] as usize, Connection::Always));
                }
            }
            Pri => {
                if options.print_ops {
                    live.keep[i] = true;
                    for_each_var_arg(op.code, op.args, |a| live.read(rep[a as usize] as usize, Connection::Always));
                }
            }
            code if opcode::is_compare(code) => {
                if options.compare_ops {
                    live.keep[i] = true;
                    for_each_var_arg(code, op.args, |a| live.read(rep[a as usize] as usize, Connection::Always));
                }
            }
            CExp => {
                let z = op.result().get();
                if !live.needed[z] || rep[z] as usize != z {
                    continue;
                }
                live.keep[i] = true;
                let flags = op.arg(1);
                for (j, bit, via) in [
                    (2, FLAG_LEFT, Connection::Always),
                    (3, FLAG_RIGHT, Connection::Always),
                    (4, FLAG_TRUE, Connection::Branch { cexp: i, holds: true }),
                    (5, FLAG_FALSE, Connection::Branch { cexp: i, holds: false }),
                ] {
                    if flags & bit != 0 {
                        live.read(rep[op.idx(j)] as usize, via);
                    }
                }
            }
            code => {
                let z = op.result().get();
                if !live.needed[z] || rep[z] as usize != z {
                    continue;
                }
                live.keep[i] = true;
                let via = live.connection[z];
                for_each_var_arg(code, op.args, |a| live.read(rep[a as usize] as usize, via));
            }
        }
    }
    live
}
