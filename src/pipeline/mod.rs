//! The encoding pipeline: statistics, the per-order encoder, the planning
//! loop, and the partition-level fan-out.
//!
//! Parallelism lives exclusively at the partition level: the matrix is cut
//! row-wise into non-overlapping partitions and one planner plus one
//! assembler runs per partition with no shared mutable state. Within a
//! partition the produced bytes are a deterministic function of the input
//! and the configuration.

pub mod encoder;
pub mod planner;
pub mod stats;

use rayon::prelude::*;

use crate::config::EncoderConfig;
use crate::csx::assembler::CsxAssembler;
use crate::csx::matrix::CsxMatrix;
use crate::error::CsxError;
use crate::matrix::partition::SparsePartition;
use crate::pipeline::planner::Planner;

/// Plans, encodes and assembles a single partition.
pub fn encode_partition<V>(
    spm: &mut SparsePartition<V>,
    config: &EncoderConfig,
) -> Result<CsxMatrix<V>, CsxError>
where
    V: Copy,
{
    Planner::new(spm, config).encode_all();
    CsxAssembler::new(spm, config.full_column_indices).make_csx()
}

/// Cuts a whole matrix row-wise into `nr_partitions` contiguous partitions
/// balanced by nonzero count, then runs one encoder per partition in
/// parallel. Results come back in partition-index order.
pub fn encode_matrix<V>(
    nr_rows: u64,
    nr_cols: u64,
    triples: &[(u64, u64, V)],
    nr_partitions: usize,
    config: &EncoderConfig,
) -> Result<Vec<CsxMatrix<V>>, CsxError>
where
    V: Copy + Send + Sync,
{
    let ranges = split_rows(nr_rows, triples, nr_partitions.max(1));

    let mut partitions = Vec::with_capacity(ranges.len());
    for (idx, &(row_start, rows)) in ranges.iter().enumerate() {
        let part_triples: Vec<_> = triples
            .iter()
            .copied()
            .filter(|&(r, _, _)| r > row_start && r <= row_start + rows)
            .collect();
        let spm = SparsePartition::from_coords(rows, nr_cols, row_start, &part_triples)
            .map_err(|e| e.in_partition(idx))?;
        partitions.push(spm);
    }

    partitions
        .par_iter_mut()
        .enumerate()
        .map(|(idx, spm)| {
            encode_partition(spm, config).map_err(|e| e.in_partition(idx))
        })
        .collect()
}

/// Greedy row split: contiguous `(row_start, nr_rows)` ranges whose nonzero
/// counts approach `nnz / nr_partitions` each.
fn split_rows<V>(
    nr_rows: u64,
    triples: &[(u64, u64, V)],
    nr_partitions: usize,
) -> Vec<(u64, u64)> {
    let nr_partitions = (nr_partitions as u64).min(nr_rows.max(1));
    let mut row_nnz = vec![0u64; nr_rows as usize];
    for t in triples {
        let r = t.0;
        if r >= 1 && r <= nr_rows {
            row_nnz[(r - 1) as usize] += 1;
        }
    }
    let target = (triples.len() as u64 + nr_partitions - 1) / nr_partitions;

    let mut ranges = Vec::with_capacity(nr_partitions as usize);
    let mut start = 0u64;
    let mut acc = 0u64;
    for row in 0..nr_rows {
        acc += row_nnz[row as usize];
        let closed = ranges.len() as u64;
        if closed + 1 >= nr_partitions {
            break;
        }
        // Close early if every later row is needed to keep the remaining
        // partitions non-empty.
        let must_close = nr_rows - (row + 1) == nr_partitions - closed - 1;
        if acc >= target || must_close {
            ranges.push((start, row + 1 - start));
            start = row + 1;
            acc = 0;
        }
    }
    ranges.push((start, nr_rows - start));
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_covers_all_rows_without_overlap() {
        let triples: Vec<(u64, u64, f64)> = (1..=20u64)
            .flat_map(|r| (1..=3u64).map(move |c| (r, c, 1.0)))
            .collect();
        for parts in [1usize, 2, 3, 7, 20, 50] {
            let ranges = split_rows(20, &triples, parts);
            assert_eq!(ranges.len(), parts.min(20));
            let mut next = 0u64;
            for &(start, rows) in &ranges {
                assert_eq!(start, next);
                assert!(rows >= 1);
                next = start + rows;
            }
            assert_eq!(next, 20);
        }
    }

    #[test]
    fn split_balances_by_nonzeros() {
        // All the weight in the first two rows.
        let mut triples: Vec<(u64, u64, f64)> = Vec::new();
        for r in 1..=2u64 {
            for c in 1..=50u64 {
                triples.push((r, c, 1.0));
            }
        }
        triples.push((10, 1, 1.0));
        let ranges = split_rows(10, &triples, 2);
        assert_eq!(ranges.len(), 2);
        // The first partition should not swallow both heavy rows plus the
        // tail; it closes once it holds roughly half the nonzeros.
        assert!(ranges[0].1 <= 2);
    }
}
