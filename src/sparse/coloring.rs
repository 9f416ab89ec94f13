//! Greedy graph coloring for compressed derivative evaluation.
//!
//! Columns (or rows) sharing a color are structurally orthogonal: no row
//! (column) has a nonzero in two of them, so one sweep per color recovers
//! every entry.

use super::pattern::{HessianPattern, JacobianPattern};

/// Color of every column (or row), colors numbered `0..num_colors`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coloring {
    pub colors: Vec<usize>,
    pub num_colors: usize,
}

impl Coloring {
    /// Members of each color class.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.num_colors];
        for (j, &c) in self.colors.iter().enumerate() {
            groups[c].push(j);
        }
        groups
    }
}

/// Color the `n_item` items so that no two items in one `lines` entry share
/// a color. `members[j]` lists the lines item `j` lies on.
fn greedy(n_item: usize, members: &[Vec<usize>], lines: &[Vec<usize>]) -> Coloring {
    let mut colors = vec![usize::MAX; n_item];
    let mut forbidden: Vec<usize> = Vec::new();
    let mut num_colors = 0;
    for j in 0..n_item {
        if members[j].is_empty() {
            // structurally zero item: any color works
            colors[j] = 0;
            num_colors = num_colors.max(1);
            continue;
        }
        forbidden.clear();
        forbidden.resize(num_colors + 1, usize::MAX);
        for &line in &members[j] {
            for &k in &lines[line] {
                if colors[k] != usize::MAX {
                    forbidden[colors[k]] = j;
                }
            }
        }
        let c = (0..=num_colors).find(|&c| forbidden[c] != j).unwrap_or(num_colors);
        colors[j] = c;
        num_colors = num_colors.max(c + 1);
    }
    Coloring { colors, num_colors }
}

/// Column coloring for forward-mode compression.
pub fn color_columns(p: &JacobianPattern) -> Coloring {
    let mut members = vec![Vec::new(); p.ncols()];
    let mut lines = vec![Vec::new(); p.nrows()];
    for (i, j) in p.iter() {
        members[j].push(i);
        lines[i].push(j);
    }
    greedy(p.ncols(), &members, &lines)
}

/// Row coloring for reverse-mode compression.
pub fn color_rows(p: &JacobianPattern) -> Coloring {
    let mut members = vec![Vec::new(); p.nrows()];
    let mut lines = vec![Vec::new(); p.ncols()];
    for (i, j) in p.iter() {
        members[i].push(j);
        lines[j].push(i);
    }
    greedy(p.nrows(), &members, &lines)
}

/// Distance-2 coloring of the symmetric pattern: two columns share a color
/// only if no row has a nonzero in both.
pub fn color_hessian(p: &HessianPattern) -> Coloring {
    let n = p.dim();
    let mut lines = vec![Vec::new(); n];
    for (i, j) in p.iter() {
        lines[i].push(j);
        if i != j {
            lines[j].push(i);
        }
    }
    // columns and rows coincide
    greedy(n, &lines, &lines)
}
