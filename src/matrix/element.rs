//! A single nonzero, or a pattern instance standing in for a whole run.
//!
//! Coordinates are 1-based and live in the coordinate space of whatever
//! iteration order the owning partition is currently transformed into. A
//! pattern element's `(row, col)` anchors the first nonzero of its run; the
//! descriptor plus the anchor determine every covered coordinate.

use crate::encoding::PatternDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub enum Element<V> {
    Plain {
        row: u64,
        col: u64,
        val: V,
    },
    Pattern {
        row: u64,
        col: u64,
        desc: PatternDescriptor,
        vals: Vec<V>,
    },
}

impl<V> Element<V> {
    pub fn row(&self) -> u64 {
        match self {
            Element::Plain { row, .. } | Element::Pattern { row, .. } => *row,
        }
    }

    pub fn col(&self) -> u64 {
        match self {
            Element::Plain { col, .. } | Element::Pattern { col, .. } => *col,
        }
    }

    pub fn set_coords(&mut self, new_row: u64, new_col: u64) {
        match self {
            Element::Plain { row, col, .. } | Element::Pattern { row, col, .. } => {
                *row = new_row;
                *col = new_col;
            }
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Element::Pattern { .. })
    }

    pub fn desc(&self) -> Option<&PatternDescriptor> {
        match self {
            Element::Pattern { desc, .. } => Some(desc),
            Element::Plain { .. } => None,
        }
    }

    /// Number of nonzeros this element accounts for.
    pub fn nnz(&self) -> usize {
        match self {
            Element::Plain { .. } => 1,
            Element::Pattern { vals, .. } => vals.len(),
        }
    }
}
