//! Operator codes for the tape.
//!
//! Each [`OpCode`] names one elementary operation together with the kind of
//! each operand (`V` variable, `P` parameter). Fixed-arity codes have a
//! static argument and result count ([`num_arg`], [`num_res`]); `CSkip` and
//! `CSum` carry their own argument count in a trailing argument.

use std::fmt;

use crate::float::Float;

/// Elementary operation codes.
///
/// Fits in a `u8`. Operators with more than one result place their auxiliary
/// results first and the primary result last.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpCode {
    // ── Structural ──
    /// Start of tape; its result is the sentinel variable 0.
    Begin,
    /// End of tape.
    End,
    /// Independent variable.
    Inv,
    /// Variable equal to a parameter.
    Par,

    // ── Unary, one result ──
    Abs,
    Neg,
    Sign,
    Exp,
    Expm1,
    Log,
    Log1p,
    Sqrt,

    // ── Unary, auxiliary result first ──
    Sin,
    Cos,
    Sinh,
    Cosh,
    Tan,
    Tanh,
    Asin,
    Acos,
    Asinh,
    Acosh,
    Atan,
    Atanh,

    // ── Binary ──
    AddPV,
    AddVV,
    SubPV,
    SubVP,
    SubVV,
    MulPV,
    MulVV,
    DivPV,
    DivVP,
    DivVV,
    ZmulPV,
    ZmulVP,
    ZmulVV,
    /// `log(x)`, `y * log(x)`, `exp(y * log(x))`.
    PowPV,
    /// Single result; recurrence `x z' = y z x'`.
    PowVP,
    /// Same three results as `PowPV`.
    PowVV,

    // ── Comparisons (no result) ──
    EqPV,
    EqVV,
    NePV,
    NeVV,
    LtPV,
    LtVP,
    LtVV,
    LePV,
    LeVP,
    LeVV,

    // ── Conditionals and sums ──
    /// Conditional expression.
    CExp,
    /// Conditional skip (variable arity).
    CSkip,
    /// Cumulative sum (variable arity).
    CSum,

    /// Discrete (piecewise constant) function call.
    Dis,

    // ── Dynamically indexed arrays ──
    Ldp,
    Ldv,
    Stpp,
    Stpv,
    Stvp,
    Stvv,

    // ── Plug-in call bracket ──
    AFun,
    FunAP,
    FunAV,
    FunRP,
    FunRV,

    /// Forward-mode print.
    Pri,
}

/// Every op code, in declaration order.
pub const ALL_OPS: [OpCode; 66] = {
    use OpCode::*;
    [
        Begin, End, Inv, Par, Abs, Neg, Sign, Exp, Expm1, Log, Log1p, Sqrt, Sin, Cos, Sinh, Cosh,
        Tan, Tanh, Asin, Acos, Asinh, Acosh, Atan, Atanh, AddPV, AddVV, SubPV, SubVP, SubVV, MulPV,
        MulVV, DivPV, DivVP, DivVV, ZmulPV, ZmulVP, ZmulVV, PowPV, PowVP, PowVV, EqPV, EqVV, NePV,
        NeVV, LtPV, LtVP, LtVV, LePV, LeVP, LeVV, CExp, CSkip, CSum, Dis, Ldp, Ldv, Stpp, Stpv,
        Stvp, Stvv, AFun, FunAP, FunAV, FunRP, FunRV, Pri,
    ]
};

/// Number of arguments for a fixed-arity op code, `None` for `CSkip`/`CSum`.
#[inline]
pub fn num_arg(op: OpCode) -> Option<usize> {
    use OpCode::*;
    let n = match op {
        CSkip | CSum => return None,
        End | Inv | FunRV => 0,
        Begin | Par | FunAP | FunAV | FunRP => 1,
        Abs | Neg | Sign | Exp | Expm1 | Log | Log1p | Sqrt => 1,
        Sin | Cos | Sinh | Cosh | Tan | Tanh | Asin | Acos | Asinh | Acosh | Atan | Atanh => 1,
        AddPV | AddVV | SubPV | SubVP | SubVV | MulPV | MulVV | DivPV | DivVP | DivVV | ZmulPV
        | ZmulVP | ZmulVV | PowPV | PowVP | PowVV => 2,
        EqPV | EqVV | NePV | NeVV | LtPV | LtVP | LtVV | LePV | LeVP | LeVV => 2,
        Dis => 2,
        Ldp | Ldv | Stpp | Stpv | Stvp | Stvv => 3,
        AFun => 4,
        Pri => 5,
        CExp => 6,
    };
    Some(n)
}

/// Number of result variables. A pure function of the code.
#[inline]
pub fn num_res(op: OpCode) -> usize {
    use OpCode::*;
    match op {
        End | CSkip | AFun | FunAP | FunAV | FunRP | Pri => 0,
        EqPV | EqVV | NePV | NeVV | LtPV | LtVP | LtVV | LePV | LeVP | LeVV => 0,
        Stpp | Stpv | Stvp | Stvv => 0,
        Sin | Cos | Sinh | Cosh | Tan | Tanh | Asin | Acos | Asinh | Acosh | Atan | Atanh => 2,
        PowPV | PowVV => 3,
        _ => 1,
    }
}

/// True for codes whose argument count is stored on the tape.
#[inline]
pub fn is_variable_arity(op: OpCode) -> bool {
    matches!(op, OpCode::CSkip | OpCode::CSum)
}

/// True for `VV` binary codes whose operands may be swapped.
#[inline]
pub fn is_commutative(op: OpCode) -> bool {
    matches!(op, OpCode::AddVV | OpCode::MulVV)
}

/// True for the comparison codes (no result, order-0 bookkeeping only).
#[inline]
pub fn is_compare(op: OpCode) -> bool {
    use OpCode::*;
    matches!(
        op,
        EqPV | EqVV | NePV | NeVV | LtPV | LtVP | LtVV | LePV | LeVP | LeVV
    )
}

/// True for the codes that make up a plug-in call bracket.
#[inline]
pub fn is_call_bracket(op: OpCode) -> bool {
    matches!(
        op,
        OpCode::AFun | OpCode::FunAP | OpCode::FunAV | OpCode::FunRP | OpCode::FunRV
    )
}

/// True for unary operators with one variable argument in `arg[0]`.
#[inline]
pub fn is_unary(op: OpCode) -> bool {
    use OpCode::*;
    matches!(
        op,
        Abs | Neg
            | Sign
            | Exp
            | Expm1
            | Log
            | Log1p
            | Sqrt
            | Sin
            | Cos
            | Sinh
            | Cosh
            | Tan
            | Tanh
            | Asin
            | Acos
            | Asinh
            | Acosh
            | Atan
            | Atanh
    )
}

/// Which of the two binary operands are variables: `(left, right)`.
#[inline]
pub fn binary_operands(op: OpCode) -> Option<(bool, bool)> {
    use OpCode::*;
    let kinds = match op {
        AddPV | SubPV | MulPV | DivPV | ZmulPV | PowPV => (false, true),
        SubVP | DivVP | ZmulVP | PowVP => (true, false),
        AddVV | SubVV | MulVV | DivVV | ZmulVV | PowVV => (true, true),
        EqPV | NePV | LtPV | LePV => (false, true),
        LtVP | LeVP => (true, false),
        EqVV | NeVV | LtVV | LeVV => (true, true),
        _ => return None,
    };
    Some(kinds)
}

/// How an operator contributes to Hessian sparsity.
///
/// Jacobian sparsity only needs to know which arguments are variables; the
/// Hessian sweeps also need to know how those arguments interact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HesClass {
    /// Zero derivative: the result set is cleared.
    Zero,
    /// Result is linear (or piecewise linear) in its variable arguments.
    Linear,
    /// Nonlinear in its single variable argument.
    Nonlinear,
    /// Bilinear in two variables: only cross terms `x_i * y_j`.
    Mul,
    /// `x / y`: cross terms plus the square of the denominator set.
    Div,
    /// `pow(x, y)`: every pair in the union of both sets.
    Pow,
    /// Handled by a dedicated rule in each sweep (arrays, calls, sums).
    Special,
}

/// Hessian class of an op code.
pub fn hes_class(op: OpCode) -> HesClass {
    use OpCode::*;
    match op {
        Sign | Dis | Par | Begin | Inv => HesClass::Zero,
        Abs | Neg | AddPV | AddVV | SubPV | SubVP | SubVV | MulPV | DivVP | ZmulPV | ZmulVP => {
            HesClass::Linear
        }
        Exp | Expm1 | Log | Log1p | Sqrt | Sin | Cos | Sinh | Cosh | Tan | Tanh | Asin | Acos
        | Asinh | Acosh | Atan | Atanh | DivPV | PowPV | PowVP => HesClass::Nonlinear,
        MulVV | ZmulVV => HesClass::Mul,
        DivVV => HesClass::Div,
        PowVV => HesClass::Pow,
        _ => HesClass::Special,
    }
}

/// Comparison operator used by `CExp` and `CSkip`.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl CompareOp {
    /// Evaluate `left <cop> right`.
    #[inline]
    pub fn apply<F: Float>(self, left: F, right: F) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ge => left >= right,
            CompareOp::Gt => left > right,
            CompareOp::Ne => left != right,
        }
    }

    #[inline]
    pub(crate) fn encode(self) -> u32 {
        self as u32
    }

    #[inline]
    pub(crate) fn decode(raw: u32) -> Option<CompareOp> {
        Some(match raw {
            0 => CompareOp::Lt,
            1 => CompareOp::Le,
            2 => CompareOp::Eq,
            3 => CompareOp::Ge,
            4 => CompareOp::Gt,
            5 => CompareOp::Ne,
            _ => return None,
        })
    }
}

/// `CExp`/`CSkip` flag bit: `left` is a variable.
pub const FLAG_LEFT: u32 = 1;
/// `CExp`/`CSkip` flag bit: `right` is a variable.
pub const FLAG_RIGHT: u32 = 2;
/// `CExp` flag bit: `if_true` is a variable.
pub const FLAG_TRUE: u32 = 4;
/// `CExp` flag bit: `if_false` is a variable.
pub const FLAG_FALSE: u32 = 8;

/// `Pri` flag bit: `pos` is a variable.
pub const PRI_POS_VAR: u32 = 1;
/// `Pri` flag bit: `value` is a variable.
pub const PRI_VALUE_VAR: u32 = 2;

impl OpCode {
    /// Short mnemonic used by the tape listing.
    pub fn name(self) -> &'static str {
        use OpCode::*;
        match self {
            Begin => "Begin",
            End => "End",
            Inv => "Inv",
            Par => "Par",
            Abs => "Abs",
            Neg => "Neg",
            Sign => "Sign",
            Exp => "Exp",
            Expm1 => "Expm1",
            Log => "Log",
            Log1p => "Log1p",
            Sqrt => "Sqrt",
            Sin => "Sin",
            Cos => "Cos",
            Sinh => "Sinh",
            Cosh => "Cosh",
            Tan => "Tan",
            Tanh => "Tanh",
            Asin => "Asin",
            Acos => "Acos",
            Asinh => "Asinh",
            Acosh => "Acosh",
            Atan => "Atan",
            Atanh => "Atanh",
            AddPV => "Addpv",
            AddVV => "Addvv",
            SubPV => "Subpv",
            SubVP => "Subvp",
            SubVV => "Subvv",
            MulPV => "Mulpv",
            MulVV => "Mulvv",
            DivPV => "Divpv",
            DivVP => "Divvp",
            DivVV => "Divvv",
            ZmulPV => "Zmulpv",
            ZmulVP => "Zmulvp",
            ZmulVV => "Zmulvv",
            PowPV => "Powpv",
            PowVP => "Powvp",
            PowVV => "Powvv",
            EqPV => "Eqpv",
            EqVV => "Eqvv",
            NePV => "Nepv",
            NeVV => "Nevv",
            LtPV => "Ltpv",
            LtVP => "Ltvp",
            LtVV => "Ltvv",
            LePV => "Lepv",
            LeVP => "Levp",
            LeVV => "Levv",
            CExp => "CExp",
            CSkip => "CSkip",
            CSum => "CSum",
            Dis => "Dis",
            Ldp => "Ldp",
            Ldv => "Ldv",
            Stpp => "Stpp",
            Stpv => "Stpv",
            Stvp => "Stvp",
            Stvv => "Stvv",
            AFun => "AFun",
            FunAP => "FunAP",
            FunAV => "FunAV",
            FunRP => "FunRP",
            FunRV => "FunRV",
            Pri => "Pri",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluate the relation a comparison op code asserts, `left <op> right`.
///
/// `Lt`/`Le` with a `VP` suffix compare variable-left; all others follow
/// the operand order of the code.
#[inline]
pub fn compare_holds<F: Float>(op: OpCode, left: F, right: F) -> bool {
    use OpCode::*;
    match op {
        EqPV | EqVV => left == right,
        NePV | NeVV => left != right,
        LtPV | LtVP | LtVV => left < right,
        LePV | LeVP | LeVV => left <= right,
        _ => unreachable!("{op} is not a comparison"),
    }
}
