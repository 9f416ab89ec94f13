//! Argument conventions per op code.
//!
//! An argument slot holds a variable index, a parameter index or an
//! immediate, depending on the op code (and, for `CExp`, `CSkip` and `Pri`,
//! on a flag word stored in the op's own arguments). Every engine that needs
//! to know which slots are variables goes through this module.

use crate::opcode::{self, OpCode, FLAG_FALSE, FLAG_LEFT, FLAG_RIGHT, FLAG_TRUE, PRI_POS_VAR, PRI_VALUE_VAR};

/// Kind of value stored in an argument slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Var,
    Par,
    Imm,
}

/// Slot layout of a `CSum` argument list.
///
/// `args[1..=4]` hold end positions (relative to the op's first argument) of
/// the added variables, subtracted variables, added dynamic parameters and
/// subtracted dynamic parameters; the last slot holds the total count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CSumLayout {
    pub add: (usize, usize),
    pub sub: (usize, usize),
    pub dyn_add: (usize, usize),
    pub dyn_sub: (usize, usize),
}

impl CSumLayout {
    pub const FIRST: usize = 5;

    #[inline]
    pub fn of(args: &[u32]) -> Self {
        let e0 = args[1] as usize;
        let e1 = args[2] as usize;
        let e2 = args[3] as usize;
        let e3 = args[4] as usize;
        CSumLayout {
            add: (Self::FIRST, e0),
            sub: (e0, e1),
            dyn_add: (e1, e2),
            dyn_sub: (e2, e3),
        }
    }
}

/// Slot layout of a `CSkip` argument list: `[cop, flags, left, right,
/// n_true, n_false, ops_if_true.., ops_if_false.., total]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CSkipLayout {
    pub if_true: (usize, usize),
    pub if_false: (usize, usize),
}

impl CSkipLayout {
    pub const FIRST: usize = 6;

    #[inline]
    pub fn of(args: &[u32]) -> Self {
        let n_true = args[4] as usize;
        let n_false = args[5] as usize;
        CSkipLayout {
            if_true: (Self::FIRST, Self::FIRST + n_true),
            if_false: (Self::FIRST + n_true, Self::FIRST + n_true + n_false),
        }
    }
}

#[inline]
fn flagged(flags: u32, bit: u32) -> ArgKind {
    if flags & bit != 0 {
        ArgKind::Var
    } else {
        ArgKind::Par
    }
}

/// Call `f(slot, kind)` for every argument slot of one op.
pub fn for_each_arg(code: OpCode, args: &[u32], mut f: impl FnMut(usize, ArgKind)) {
    use ArgKind::{Imm, Var};
    use OpCode::*;

    if opcode::is_unary(code) {
        f(0, Var);
        return;
    }
    if let Some((left, right)) = opcode::binary_operands(code) {
        f(0, if left { Var } else { ArgKind::Par });
        f(1, if right { Var } else { ArgKind::Par });
        return;
    }
    match code {
        End | Inv | FunRV => {}
        Begin | Par | FunAP | FunRP => f(0, ArgKind::Par),
        FunAV => f(0, Var),
        Dis => {
            f(0, Imm);
            f(1, Var);
        }
        Ldp | Ldv => {
            f(0, Imm);
            f(1, if code == Ldv { Var } else { ArgKind::Par });
            f(2, Imm);
        }
        Stpp | Stpv | Stvp | Stvv => {
            f(0, Imm);
            f(1, if matches!(code, Stvp | Stvv) { Var } else { ArgKind::Par });
            f(2, if matches!(code, Stpv | Stvv) { Var } else { ArgKind::Par });
        }
        AFun => (0..4).for_each(|j| f(j, Imm)),
        Pri => {
            let flags = args[0];
            f(0, Imm);
            f(1, flagged(flags, PRI_POS_VAR));
            f(2, Imm);
            f(3, flagged(flags, PRI_VALUE_VAR));
            f(4, Imm);
        }
        CExp => {
            let flags = args[1];
            f(0, Imm);
            f(1, Imm);
            f(2, flagged(flags, FLAG_LEFT));
            f(3, flagged(flags, FLAG_RIGHT));
            f(4, flagged(flags, FLAG_TRUE));
            f(5, flagged(flags, FLAG_FALSE));
        }
        CSkip => {
            let flags = args[1];
            f(0, Imm);
            f(1, Imm);
            f(2, flagged(flags, FLAG_LEFT));
            f(3, flagged(flags, FLAG_RIGHT));
            for j in 4..args.len() {
                f(j, Imm);
            }
        }
        CSum => {
            let layout = CSumLayout::of(args);
            f(0, ArgKind::Par);
            for j in 1..CSumLayout::FIRST {
                f(j, Imm);
            }
            for j in layout.add.0..layout.sub.1 {
                f(j, Var);
            }
            for j in layout.dyn_add.0..layout.dyn_sub.1 {
                f(j, ArgKind::Par);
            }
            f(args.len() - 1, Imm);
        }
        _ => unreachable!("{code} handled above"),
    }
}

/// Call `f(v)` for every variable argument of one op.
#[inline]
pub fn for_each_var_arg(code: OpCode, args: &[u32], mut f: impl FnMut(u32)) {
    for_each_arg(code, args, |j, kind| {
        if kind == ArgKind::Var {
            f(args[j]);
        }
    });
}

/// Call `f(v)` for every variable the op's results depend on through a
/// possibly nonzero partial derivative.
///
/// Excludes comparison operands of `CExp`, array indices and every argument
/// of zero-derivative ops. Array loads/stores and plug-in brackets carry no
/// direct dependencies here; the sparsity sweeps handle them separately.
pub fn for_each_jac_var(code: OpCode, args: &[u32], mut f: impl FnMut(u32)) {
    use OpCode::*;

    if opcode::is_unary(code) {
        if code != Sign {
            f(args[0]);
        }
        return;
    }
    if opcode::is_compare(code) {
        return;
    }
    if let Some((left, right)) = opcode::binary_operands(code) {
        if left {
            f(args[0]);
        }
        if right {
            f(args[1]);
        }
        return;
    }
    match code {
        CExp => {
            let flags = args[1];
            if flags & FLAG_TRUE != 0 {
                f(args[4]);
            }
            if flags & FLAG_FALSE != 0 {
                f(args[5]);
            }
        }
        CSum => {
            let layout = CSumLayout::of(args);
            for &v in &args[layout.add.0..layout.sub.1] {
                f(v);
            }
        }
        _ => {}
    }
}

/// Total argument count of an op whose arguments start at `args[0]`.
///
/// For variable-arity codes the count is read from the op's own layout
/// (front of the slice), not the trailing slot.
#[inline]
pub(crate) fn arg_count_forward(code: OpCode, args: &[u32]) -> usize {
    match opcode::num_arg(code) {
        Some(n) => n,
        None => match code {
            OpCode::CSkip => CSkipLayout::FIRST + args[4] as usize + args[5] as usize + 1,
            _ => args[4] as usize + 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(code: OpCode, args: &[u32]) -> Vec<ArgKind> {
        let mut out = Vec::new();
        for_each_arg(code, args, |_, k| out.push(k));
        out
    }

    #[test]
    fn binary_kinds_follow_code() {
        assert_eq!(kinds(OpCode::SubVP, &[3, 1]), vec![ArgKind::Var, ArgKind::Par]);
        assert_eq!(kinds(OpCode::LtPV, &[1, 3]), vec![ArgKind::Par, ArgKind::Var]);
    }

    #[test]
    fn parameter_ops_read_parameters() {
        assert_eq!(kinds(OpCode::Par, &[4]), vec![ArgKind::Par]);
        assert_eq!(kinds(OpCode::FunAP, &[2]), vec![ArgKind::Par]);
        assert_eq!(kinds(OpCode::FunRP, &[2]), vec![ArgKind::Par]);
        assert_eq!(kinds(OpCode::FunAV, &[5]), vec![ArgKind::Var]);
    }

    #[test]
    fn cexp_kinds_follow_flags() {
        let args = [0, FLAG_LEFT | FLAG_FALSE, 2, 1, 1, 3];
        assert_eq!(
            kinds(OpCode::CExp, &args),
            vec![
                ArgKind::Imm,
                ArgKind::Imm,
                ArgKind::Var,
                ArgKind::Par,
                ArgKind::Par,
                ArgKind::Var
            ]
        );
        let mut deps = Vec::new();
        for_each_jac_var(OpCode::CExp, &args, |v| deps.push(v));
        assert_eq!(deps, vec![3]);
    }

    #[test]
    fn csum_layout_and_count() {
        // init p1, adds v2 v3, sub v4, dynamic add p2, no dynamic sub
        let args = [1, 7, 8, 9, 9, 2, 3, 4, 2, 10];
        let layout = CSumLayout::of(&args);
        assert_eq!(layout.add, (5, 7));
        assert_eq!(layout.sub, (7, 8));
        assert_eq!(arg_count_forward(OpCode::CSum, &args), 10);
        let mut vars = Vec::new();
        for_each_var_arg(OpCode::CSum, &args, |v| vars.push(v));
        assert_eq!(vars, vec![2, 3, 4]);
    }
}
