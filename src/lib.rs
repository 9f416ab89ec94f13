pub mod checkpoint;
pub mod driver;
pub mod error;
pub mod eval;
pub mod extension;
pub mod float;
pub mod index;
pub(crate) mod op;
pub mod opcode;
pub mod optimize;
pub mod sparse;
pub mod sweep;
pub mod tape;

#[cfg(feature = "parallel")]
mod parallel;
#[cfg(feature = "serde")]
mod serde_support;

pub use checkpoint::Checkpoint;
pub use error::{AdError, Result};
pub use eval::Evaluator;
pub use extension::{AtomicFunction, CallInfo, DiscreteFn, Registry};
pub use float::Float;
pub use index::{ArgIndex, AtomicId, DiscreteId, OpIndex, Operand, ParIndex, VarIndex, VecAdId};
pub use opcode::{CompareOp, OpCode};
pub use optimize::{OptimizeOptions, OptimizeStats};
pub use sparse::{
    color_columns, color_hessian, color_rows, identity, Coloring, HessianPattern, JacobianPattern, ListSet, PackSet,
    SetVector, SparsityEncoding,
};
pub use sweep::TaylorStore;
pub use tape::{BinaryOp, DynOp, Recorder, Tape, VecAdInfo};

/// Tape over `f64`.
pub type Tape64 = Tape<f64>;
/// Tape over `f32`.
pub type Tape32 = Tape<f32>;
