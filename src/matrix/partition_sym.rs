//! Symmetric-matrix wrapper: the strictly-lower triangle as a normal
//! partition, plus the owned main-diagonal values.
//!
//! Only the lower triangle is analyzed and encoded; the diagonal rides
//! along as a dense prefix of the final CSX image.

use num_traits::Zero;

use crate::error::CsxError;
use crate::matrix::partition::SparsePartition;

#[derive(Debug, Clone)]
pub struct SparsePartitionSym<V> {
    lower: SparsePartition<V>,
    diagonal: Vec<V>,
}

impl<V: Copy + Zero> SparsePartitionSym<V> {
    /// Ingests the lower-triangle coordinate triples of a symmetric matrix,
    /// global rows in `(row_start, row_start + nr_rows]`. Diagonal entries
    /// go to the dense diagonal vector; entries above the diagonal are
    /// rejected. Absent diagonal entries are zero.
    pub fn from_coords(
        nr_rows: u64,
        nr_cols: u64,
        row_start: u64,
        triples: &[(u64, u64, V)],
    ) -> Result<Self, CsxError> {
        let mut diagonal = vec![V::zero(); nr_rows as usize];
        let mut lower_triples = Vec::new();
        for &(r, c, v) in triples {
            if c > r {
                return Err(CsxError::InvalidInput(format!(
                    "element ({}, {}) above the diagonal of a symmetric matrix",
                    r, c
                )));
            }
            if c == r {
                if r <= row_start || r > row_start + nr_rows {
                    return Err(CsxError::InvalidInput(format!(
                        "diagonal row {} outside partition rows ({}, {}]",
                        r,
                        row_start,
                        row_start + nr_rows
                    )));
                }
                diagonal[(r - row_start - 1) as usize] = v;
            } else {
                lower_triples.push((r, c, v));
            }
        }
        let lower = SparsePartition::from_coords(nr_rows, nr_cols, row_start, &lower_triples)?;
        Ok(Self { lower, diagonal })
    }

    pub fn lower(&self) -> &SparsePartition<V> {
        &self.lower
    }

    pub fn lower_mut(&mut self) -> &mut SparsePartition<V> {
        &mut self.lower
    }

    pub fn diagonal(&self) -> &[V] {
        &self.diagonal
    }

    pub fn diagonal_size(&self) -> u64 {
        self.diagonal.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_diagonal_from_lower_triangle() {
        let sym = SparsePartitionSym::from_coords(
            3,
            3,
            0,
            &[(1, 1, 5.0f64), (2, 1, 1.0), (3, 3, 7.0), (3, 2, 2.0)],
        )
        .unwrap();
        assert_eq!(sym.diagonal(), &[5.0, 0.0, 7.0]);
        assert_eq!(sym.lower().nr_nzeros(), 2);
    }

    #[test]
    fn rejects_upper_triangle_entries() {
        assert!(matches!(
            SparsePartitionSym::from_coords(3, 3, 0, &[(1, 2, 1.0f64)]),
            Err(CsxError::InvalidInput(_))
        ));
    }
}
