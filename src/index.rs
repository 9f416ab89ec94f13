//! Index newtypes for the separate index spaces of a tape.
//!
//! Variables, parameters, argument slots and operators are all addressed by
//! `u32` positions. Keeping them in distinct types stops one space from being
//! used where another is expected.

use std::fmt;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Position as a `usize` for slice indexing.
            #[inline]
            pub fn get(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub(crate) fn from_usize(i: usize) -> Self {
                debug_assert!(i <= u32::MAX as usize);
                $name(i as u32)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(i: $name) -> usize {
                i.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

index_type!(
    /// Index of a variable (a slot with Taylor coefficients).
    VarIndex,
    "v"
);
index_type!(
    /// Index into the parameter pool.
    ParIndex,
    "p"
);
index_type!(
    /// Position in the flat argument array.
    ArgIndex,
    "a"
);
index_type!(
    /// Position of an operator in the operator sequence.
    OpIndex,
    "op"
);
index_type!(
    /// Registry id of a plug-in (atomic) function.
    AtomicId,
    "atomic"
);
index_type!(
    /// Registry id of a discrete (piecewise-constant) function.
    DiscreteId,
    "dis"
);
index_type!(
    /// Identifier of a dynamically indexed array.
    VecAdId,
    "vec"
);

impl VarIndex {
    /// The phantom variable produced by `Begin`. Never an operand.
    pub const SENTINEL: VarIndex = VarIndex(0);
}

impl ParIndex {
    /// The NaN placeholder parameter referenced by `Begin`.
    pub const PHANTOM: ParIndex = ParIndex(0);
}

/// One operand of a binary operation: a variable or a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Var(VarIndex),
    Par(ParIndex),
}

impl Operand {
    #[inline]
    pub fn is_var(self) -> bool {
        matches!(self, Operand::Var(_))
    }

    /// Raw argument value stored on the tape.
    #[inline]
    pub fn raw(self) -> u32 {
        match self {
            Operand::Var(v) => v.0,
            Operand::Par(p) => p.0,
        }
    }
}

impl From<VarIndex> for Operand {
    fn from(v: VarIndex) -> Self {
        Operand::Var(v)
    }
}

impl From<ParIndex> for Operand {
    fn from(p: ParIndex) -> Self {
        Operand::Par(p)
    }
}
