//! Tape: the recorded operation sequence.
//!
//! A [`Recorder`] appends operations one at a time; [`Recorder::finalize`]
//! consumes it and produces an immutable [`Tape`]. The tape is the only input
//! of every replay engine (forward, reverse, sparsity, optimizer) and is
//! `Send + Sync`, so one tape can be shared by many
//! [`Evaluator`](crate::Evaluator)s.
//!
//! Storage is three flat arrays: op codes, arguments and parameters. Each op
//! owns a contiguous slice of the argument array and allocates the next
//! `num_res(op)` variable indices. Positions are recovered by walking the
//! tape with [`Tape::iter`], or all at once with [`Tape::random_access`].

use std::sync::Arc;

use crate::extension::Registry;
use crate::float::Float;
use crate::index::{OpIndex, ParIndex, VarIndex, VecAdId};
use crate::opcode::OpCode;

pub(crate) mod args;
mod display;
mod dynamic;
mod iter;
mod recorder;

pub use self::args::{for_each_arg, for_each_jac_var, for_each_var_arg, ArgKind, CSkipLayout, CSumLayout};
pub use self::dynamic::{DynOp, DynStep};
pub use self::iter::{Iter, OpView, RandomAccess};
pub use self::recorder::{BinaryOp, Recorder};

pub(crate) use self::dynamic::replay as replay_dynamic;

/// Location and length of one dynamically indexed array.
///
/// All arrays share one element space; `offset` is the array's first element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VecAdInfo {
    pub offset: u32,
    pub len: u32,
}

/// A finalized, immutable operation sequence.
pub struct Tape<F: Float> {
    pub(crate) ops: Vec<OpCode>,
    pub(crate) args: Vec<u32>,
    pub(crate) params: Vec<F>,
    pub(crate) is_dynamic: Vec<bool>,
    pub(crate) dynamic: Vec<DynStep>,
    pub(crate) num_var: usize,
    pub(crate) num_ind: usize,
    pub(crate) dependents: Vec<VarIndex>,
    pub(crate) vec_ad: Vec<VecAdInfo>,
    /// Initial parameter of every array element, in element-space order.
    pub(crate) vec_ad_init: Vec<ParIndex>,
    pub(crate) num_load: usize,
    pub(crate) texts: Vec<String>,
    pub(crate) registry: Registry<F>,
}

impl<F: Float> Tape<F> {
    /// Number of operations, including `Begin`, the independents and `End`.
    #[inline]
    pub fn num_op(&self) -> usize {
        self.ops.len()
    }

    /// Number of variables, including the sentinel.
    #[inline]
    pub fn num_var(&self) -> usize {
        self.num_var
    }

    /// Length of the argument array.
    #[inline]
    pub fn num_arg(&self) -> usize {
        self.args.len()
    }

    /// Size of the parameter pool (constants and dynamic parameters).
    #[inline]
    pub fn num_par(&self) -> usize {
        self.params.len()
    }

    /// Number of independent dynamic parameters.
    pub fn num_dynamic(&self) -> usize {
        self.dynamic
            .iter()
            .filter(|s| s.op == DynOp::Independent)
            .count()
    }

    #[inline]
    pub fn num_independent(&self) -> usize {
        self.num_ind
    }

    #[inline]
    pub fn num_dependent(&self) -> usize {
        self.dependents.len()
    }

    /// Number of array load ops (each gets a binding slot during sweeps).
    #[inline]
    pub fn num_load(&self) -> usize {
        self.num_load
    }

    /// Total number of array elements over all arrays.
    #[inline]
    pub fn num_vec_ad_elements(&self) -> usize {
        self.vec_ad_init.len()
    }

    #[inline]
    pub fn num_vec_ad(&self) -> usize {
        self.vec_ad.len()
    }

    /// Variable index of independent `j` (0-based).
    #[inline]
    pub fn independent(&self, j: usize) -> VarIndex {
        VarIndex::from_usize(j + 1)
    }

    #[inline]
    pub fn dependents(&self) -> &[VarIndex] {
        &self.dependents
    }

    /// Op codes in tape order.
    #[inline]
    pub fn op_codes(&self) -> &[OpCode] {
        &self.ops
    }

    /// Recorded value of a parameter.
    #[inline]
    pub fn parameter(&self, p: ParIndex) -> F {
        self.params[p.get()]
    }

    #[inline]
    pub fn is_dynamic(&self, p: ParIndex) -> bool {
        self.is_dynamic[p.get()]
    }

    /// Recipe that recomputes dynamic parameters.
    #[inline]
    pub fn dynamic_recipe(&self) -> &[DynStep] {
        &self.dynamic
    }

    #[inline]
    pub fn vec_ad(&self, id: VecAdId) -> VecAdInfo {
        self.vec_ad[id.get()]
    }

    #[inline]
    pub fn registry(&self) -> &Registry<F> {
        &self.registry
    }

    /// Text attached to forward-print ops.
    #[inline]
    pub fn text(&self, id: u32) -> &str {
        &self.texts[id as usize]
    }

    /// Iterate over operations in tape order; `.rev()` walks backwards.
    #[inline]
    pub fn iter(&self) -> Iter<'_, F> {
        Iter::new(self)
    }

    /// Build the op → argument / result position table.
    pub fn random_access(&self) -> RandomAccess {
        RandomAccess::build(self)
    }

    /// View of one operation through a random-access table.
    pub fn op(&self, table: &RandomAccess, op: OpIndex) -> OpView<'_> {
        table.view(self, op)
    }

    /// Wrap the tape in an `Arc` for sharing between evaluators.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl<F: Float> Clone for Tape<F> {
    fn clone(&self) -> Self {
        Tape {
            ops: self.ops.clone(),
            args: self.args.clone(),
            params: self.params.clone(),
            is_dynamic: self.is_dynamic.clone(),
            dynamic: self.dynamic.clone(),
            num_var: self.num_var,
            num_ind: self.num_ind,
            dependents: self.dependents.clone(),
            vec_ad: self.vec_ad.clone(),
            vec_ad_init: self.vec_ad_init.clone(),
            num_load: self.num_load,
            texts: self.texts.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<F: Float> std::fmt::Debug for Tape<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tape")
            .field("num_op", &self.num_op())
            .field("num_var", &self.num_var)
            .field("num_arg", &self.num_arg())
            .field("num_par", &self.num_par())
            .field("num_independent", &self.num_ind)
            .field("num_dependent", &self.num_dependent())
            .finish()
    }
}
