//! Dynamic parameters: parameters recomputed from a short recipe when the
//! caller supplies new values, without re-recording the tape.

use crate::float::Float;
use crate::index::ParIndex;

/// One step of the dynamic-parameter recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynOp {
    /// Independent dynamic parameter, set by the caller.
    Independent,
    Neg,
    Abs,
    Exp,
    Log,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Add,
    Sub,
    Mul,
    Zmul,
    Div,
    Pow,
}

impl DynOp {
    /// Number of parameter arguments (0, 1 or 2).
    pub fn arity(self) -> usize {
        use DynOp::*;
        match self {
            Independent => 0,
            Neg | Abs | Exp | Log | Sqrt | Sin | Cos | Tan => 1,
            Add | Sub | Mul | Zmul | Div | Pow => 2,
        }
    }

    pub(crate) fn eval<F: Float>(self, a: F, b: F) -> F {
        use DynOp::*;
        match self {
            Independent => a,
            Neg => -a,
            Abs => a.abs(),
            Exp => a.exp(),
            Log => a.ln(),
            Sqrt => a.sqrt(),
            Sin => a.sin(),
            Cos => a.cos(),
            Tan => a.tan(),
            Add => a + b,
            Sub => a - b,
            Mul => a * b,
            Zmul => a.azmul(b),
            Div => a / b,
            Pow => a.powf(b),
        }
    }
}

/// A recipe step: `result = op(args[0], args[1])`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynStep {
    pub result: ParIndex,
    pub op: DynOp,
    pub args: [ParIndex; 2],
}

/// Recompute dynamic parameter values in `par` from new independent values.
///
/// `values` are assigned to the independent dynamic parameters in the order
/// they were declared; every derived step is re-evaluated in recording order.
pub(crate) fn replay<F: Float>(steps: &[DynStep], values: &[F], par: &mut [F]) {
    let mut next = values.iter();
    for step in steps {
        let value = match step.op {
            DynOp::Independent => match next.next() {
                Some(&v) => v,
                None => par[step.result.get()],
            },
            op => op.eval(par[step.args[0].get()], par[step.args[1].get()]),
        };
        par[step.result.get()] = value;
    }
}
