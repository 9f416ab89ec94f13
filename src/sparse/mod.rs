//! Sparsity propagation.
//!
//! The sweeps here replay a tape over sets instead of numbers: each variable
//! carries the set of seed indices it may depend on (Jacobian), or each
//! independent carries the set of independents it may interact with
//! nonlinearly (Hessian). Results are over-approximations: a reported entry
//! may be numerically zero, an unreported one never is.
//!
//! Two set encodings implement [`SetVector`]: [`PackSet`] (one bit per
//! element, best when sets are dense) and [`ListSet`] (sorted linked lists
//! in a shared pool, best when sets are small relative to their universe).
//! Conditional-skip marks are ignored: a pattern must hold for every input.

mod coloring;
mod hes;
mod jac;
mod list;
mod pack;
mod pattern;

pub use self::coloring::{color_columns, color_hessian, color_rows, Coloring};
pub use self::list::ListSet;
pub use self::pack::PackSet;
pub use self::pattern::{HessianPattern, JacobianPattern};

use crate::float::Float;
use crate::index::VecAdId;
use crate::opcode::OpCode;
use crate::tape::Tape;

/// A vector of sets over the elements `0..end`.
pub trait SetVector: Clone {
    /// `n_set` empty sets with universe `0..end`.
    fn new(n_set: usize, end: usize) -> Self;

    fn n_set(&self) -> usize;

    fn end(&self) -> usize;

    fn clear(&mut self, i: usize);

    fn add_element(&mut self, i: usize, element: usize);

    fn is_element(&self, i: usize, element: usize) -> bool;

    fn is_empty(&self, i: usize) -> bool;

    /// `set[dst] = set[src]`
    fn assign(&mut self, dst: usize, src: usize);

    /// `set[dst] ∪= set[src]`
    fn union_with(&mut self, dst: usize, src: usize);

    /// `set[dst] ∪= other.set[src]`; both vectors share `end`.
    fn union_from(&mut self, dst: usize, other: &Self, src: usize);

    /// Call `f` on every element of set `i` in increasing order.
    fn for_each(&self, i: usize, f: impl FnMut(usize));

    /// Elements of set `i` in increasing order.
    fn elements(&self, i: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.for_each(i, |e| out.push(e));
        out
    }

    /// Total number of elements over all sets.
    fn nnz(&self) -> usize {
        (0..self.n_set()).map(|i| self.elements(i).len()).sum()
    }
}

/// Set encoding used by the convenience entry points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SparsityEncoding {
    /// Bit vectors.
    Pack,
    /// Linked sets.
    List,
    /// Bit vectors for small problems, linked sets above
    /// [`SparsityEncoding::AUTO_LIST_THRESHOLD`] seed indices.
    #[default]
    Auto,
}

impl SparsityEncoding {
    pub const AUTO_LIST_THRESHOLD: usize = 256;

    /// Resolve `Auto` for a universe of `end` elements.
    pub fn resolve(self, end: usize) -> SparsityEncoding {
        match self {
            SparsityEncoding::Auto if end > Self::AUTO_LIST_THRESHOLD => SparsityEncoding::List,
            SparsityEncoding::Auto => SparsityEncoding::Pack,
            other => other,
        }
    }
}

/// Extra set rows holding array contents, placed after the variable rows.
///
/// Per element: what a constant-index store put there. Per array: `any`
/// (what a variable-index store may have put in any element) and `all`
/// (everything ever stored). Reverse sweeps reuse the same rows for the
/// dual quantities (see [`jac`]).
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArrayRows {
    base: usize,
    num_elem: usize,
}

impl ArrayRows {
    pub fn new<F: Float>(tape: &Tape<F>) -> Self {
        ArrayRows {
            base: tape.num_var(),
            num_elem: tape.num_vec_ad_elements(),
        }
    }

    /// Number of rows needed for `tape`.
    pub fn count<F: Float>(tape: &Tape<F>) -> usize {
        tape.num_vec_ad_elements() + 2 * tape.num_vec_ad()
    }

    #[inline]
    pub fn element(self, e: usize) -> usize {
        self.base + e
    }

    #[inline]
    pub fn any(self, array: usize) -> usize {
        self.base + self.num_elem + 2 * array
    }

    #[inline]
    pub fn all(self, array: usize) -> usize {
        self.base + self.num_elem + 2 * array + 1
    }
}

/// Element addressed by a load/store whose index is a known constant.
///
/// Variable indices, dynamic-parameter indices and constants outside the
/// array give `None`; callers then fall back to the whole-array sets.
pub(crate) fn constant_element<F: Float>(tape: &Tape<F>, code: OpCode, args: &[u32]) -> Option<usize> {
    use OpCode::*;
    if !matches!(code, Ldp | Stpp | Stpv) {
        return None;
    }
    let p = crate::index::ParIndex(args[1]);
    if tape.is_dynamic(p) {
        return None;
    }
    let info = tape.vec_ad(VecAdId(args[0]));
    let i = tape.parameter(p).to_i64()?;
    if i >= 0 && (i as u64) < u64::from(info.len) {
        Some(info.offset as usize + i as usize)
    } else {
        None
    }
}

/// Argument and result variables of one plug-in call, collected while a
/// sparsity sweep passes over its bracket.
#[derive(Clone, Debug, Default)]
pub(crate) struct SparseFrame {
    pub header: [u32; 4],
    pub open: bool,
    pub args: Vec<Option<usize>>,
    pub results: Vec<Option<usize>>,
}

impl SparseFrame {
    pub fn open(&mut self, header: &[u32]) {
        self.header.copy_from_slice(&header[..4]);
        self.open = true;
        self.args.clear();
        self.results.clear();
    }

    pub fn is_var(&self) -> Vec<bool> {
        self.args.iter().map(Option::is_some).collect()
    }

    pub fn call_info<'a>(&self, is_var: &'a [bool]) -> crate::extension::CallInfo<'a> {
        crate::extension::CallInfo {
            call_id: self.header[1],
            n: self.header[2] as usize,
            m: self.header[3] as usize,
            x_is_var: is_var,
        }
    }

    /// Collect one bracket op; `Some(())` marks the op as handled.
    pub fn collect(&mut self, code: OpCode, args: &[u32], res: usize) -> Option<()> {
        match code {
            OpCode::FunAP => self.args.push(None),
            OpCode::FunAV => self.args.push(Some(args[0] as usize)),
            OpCode::FunRP => self.results.push(None),
            OpCode::FunRV => self.results.push(Some(res)),
            _ => return None,
        }
        Some(())
    }

    pub fn reverse_collected(&mut self) {
        self.args.reverse();
        self.results.reverse();
    }
}

/// Check the shape of a caller-supplied pattern.
pub(crate) fn check_shape<S: SetVector>(s: &S, n_set: usize, end: Option<usize>) -> crate::Result<()> {
    let end_ok = end.map_or(true, |e| e == s.end());
    if s.n_set() != n_set || !end_ok {
        return Err(crate::AdError::PatternShape {
            expected_sets: n_set,
            expected_end: end.unwrap_or(s.end()),
            got_sets: s.n_set(),
            got_end: s.end(),
        });
    }
    Ok(())
}

/// Identity seed: set `j` holds `{j}`.
pub fn identity<S: SetVector>(n: usize) -> S {
    let mut s = S::new(n, n);
    for j in 0..n {
        s.add_element(j, j);
    }
    s
}
