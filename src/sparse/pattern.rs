//! Coordinate-format sparsity patterns and the convenience entry points
//! that produce them.

use crate::error::{check_len, Result};
use crate::float::Float;
use crate::tape::Tape;

use super::{identity, ListSet, PackSet, SetVector, SparsityEncoding};

/// Jacobian pattern: rows are dependents, columns are independents.
///
/// Entries are sorted row-major without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JacobianPattern {
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl JacobianPattern {
    pub fn new(nrows: usize, ncols: usize, entries: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut e: Vec<(usize, usize)> = entries.into_iter().collect();
        e.sort_unstable();
        e.dedup();
        debug_assert!(e.iter().all(|&(i, j)| i < nrows && j < ncols));
        let (rows, cols) = e.into_iter().unzip();
        JacobianPattern {
            nrows,
            ncols,
            rows,
            cols,
        }
    }

    /// Pattern whose row `i` is set `i` of `s`.
    pub fn from_row_sets<S: SetVector>(s: &S) -> Self {
        let mut entries = Vec::new();
        for i in 0..s.n_set() {
            s.for_each(i, |j| entries.push((i, j)));
        }
        Self::new(s.n_set(), s.end(), entries)
    }

    /// Pattern whose column `j` is set `j` of `s`.
    pub fn from_col_sets<S: SetVector>(s: &S) -> Self {
        let mut entries = Vec::new();
        for j in 0..s.n_set() {
            s.for_each(j, |i| entries.push((i, j)));
        }
        Self::new(s.end(), s.n_set(), entries)
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.iter().any(|e| e == (i, j))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }
}

/// Lower triangle (`row >= col`) of a symmetric Hessian pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HessianPattern {
    n: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl HessianPattern {
    /// Entries in either triangle; each is stored once, in the lower one.
    pub fn new(n: usize, entries: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut e: Vec<(usize, usize)> = entries
            .into_iter()
            .map(|(i, j)| if i >= j { (i, j) } else { (j, i) })
            .collect();
        e.sort_unstable();
        e.dedup();
        debug_assert!(e.iter().all(|&(i, _)| i < n));
        let (rows, cols) = e.into_iter().unzip();
        HessianPattern { n, rows, cols }
    }

    /// Pattern whose row `i` is set `i` of `s`.
    pub fn from_sets<S: SetVector>(s: &S) -> Self {
        let mut entries = Vec::new();
        for i in 0..s.n_set() {
            s.for_each(i, |j| entries.push((i, j)));
        }
        Self::new(s.n_set(), entries)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Symmetric lookup.
    pub fn contains(&self, i: usize, j: usize) -> bool {
        let key = if i >= j { (i, j) } else { (j, i) };
        self.iter().any(|e| e == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }
}

impl<F: Float> Tape<F> {
    /// Full Jacobian pattern, propagating forward when there are no more
    /// independents than dependents and in reverse otherwise.
    pub fn jacobian_pattern(&self, encoding: SparsityEncoding) -> Result<JacobianPattern> {
        let (n, m) = (self.num_independent(), self.num_dependent());
        let forward = n <= m;
        let end = if forward { n } else { m };
        match encoding.resolve(end) {
            SparsityEncoding::List => self.jacobian_pattern_with::<ListSet>(forward),
            _ => self.jacobian_pattern_with::<PackSet>(forward),
        }
    }

    fn jacobian_pattern_with<S: SetVector>(&self, forward: bool) -> Result<JacobianPattern> {
        if forward {
            let s: S = self.for_jac_sparsity(&identity::<S>(self.num_independent()))?;
            Ok(JacobianPattern::from_row_sets(&s))
        } else {
            let s: S = self.rev_jac_sparsity(&identity::<S>(self.num_dependent()))?;
            Ok(JacobianPattern::from_col_sets(&s))
        }
    }

    /// Hessian pattern of `Σ_{i selected} y_i` over all independents.
    pub fn hessian_pattern(&self, select_range: &[bool], encoding: SparsityEncoding) -> Result<HessianPattern> {
        check_len("range selection", self.num_dependent(), select_range.len())?;
        let n = self.num_independent();
        match encoding.resolve(n) {
            SparsityEncoding::List => {
                let h: ListSet = self.rev_hes_sparsity(&identity::<ListSet>(n), select_range)?;
                Ok(HessianPattern::from_sets(&h))
            }
            _ => {
                let h: PackSet = self.rev_hes_sparsity(&identity::<PackSet>(n), select_range)?;
                Ok(HessianPattern::from_sets(&h))
            }
        }
    }
}
