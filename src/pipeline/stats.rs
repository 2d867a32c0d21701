//! Per-encoding frequency and coverage statistics.
//!
//! Given a partition already transformed into a candidate order, this module
//! measures how many nonzeros each delta value (or, for block orders, each
//! block other-dimension) would cover if encoded, and how many pattern
//! units that would cost. The planner scores candidates from these tables.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::kernels::delta;
use crate::matrix::partition::SparsePartition;

/// Coverage of one delta value (or block other-dimension).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsEntry {
    /// Nonzeros covered by qualifying runs.
    pub nnz: u64,
    /// Number of pattern units those runs would produce.
    pub npatterns: u64,
}

/// Delta value (or block other-dimension) to coverage.
pub type Stats = BTreeMap<u64, StatsEntry>;

/// Scans the partition, which must already be transformed into the order
/// under consideration, and accumulates coverage per delta value.
///
/// Within each virtual row, consecutive plain elements' columns form one
/// sequence; a pattern-bearing element (from an earlier encoding round) or
/// the row end flushes it through the delta-RLE.
pub fn generate_stats<V: Copy>(spm: &SparsePartition<V>, min_limit: u64) -> Stats {
    let mut stats = Stats::new();
    let block_align = spm.order().block_alignment();
    let mut xs: Vec<u64> = Vec::new();

    for i in 0..spm.transformed_row_count() {
        for e in spm.row(i) {
            if !e.is_pattern() {
                xs.push(e.col());
                continue;
            }
            update_stats(&mut xs, &mut stats, min_limit, block_align);
        }
        update_stats(&mut xs, &mut stats, min_limit, block_align);
    }
    stats
}

fn update_stats(
    xs: &mut Vec<u64>,
    stats: &mut Stats,
    min_limit: u64,
    block_align: Option<u64>,
) {
    if xs.is_empty() {
        return;
    }
    if let Some(align) = block_align {
        update_stats_block(xs, stats, align);
        return;
    }
    for run in delta::delta_rle(xs) {
        if run.freq >= min_limit {
            let entry = stats.entry(run.val).or_default();
            entry.nnz += run.freq;
            entry.npatterns += 1;
        }
    }
    xs.clear();
}

/// Block-order statistics: only unit-delta runs are block candidates. A run
/// starting at `unit_start` is trimmed by a prefix of `(unit_start - 2) mod
/// align` to land on a block boundary, and implicitly by a suffix to a
/// multiple of the alignment; whatever yields at least two full blocks gets
/// credited.
fn update_stats_block(xs: &mut Vec<u64>, stats: &mut Stats, align: u64) {
    let mut unit_start = 0u64;
    for run in delta::delta_rle(xs) {
        unit_start += run.val;
        if run.val == 1 {
            // The run joins the element just before its first delta, hence
            // one extra; unit_start is 1-based.
            let mut nr_elem = run.freq + 1;
            let skip_front = if unit_start == 1 {
                0
            } else {
                (unit_start - 2) % align
            };
            nr_elem = nr_elem.saturating_sub(skip_front);
            let other_dim = nr_elem / align;
            if other_dim >= 2 {
                let entry = stats.entry(other_dim).or_default();
                entry.nnz += other_dim * align;
                entry.npatterns += 1;
            }
        }
        unit_start += run.val * (run.freq - 1);
    }
    xs.clear();
}

/// Erases entries whose coverage fraction falls below `min_perc` and
/// returns the surviving delta values.
pub fn filter_stats(stats: &mut Stats, total_nnz: u64, min_perc: f64) -> BTreeSet<u64> {
    stats.retain(|_, entry| entry.nnz as f64 / total_nnz as f64 >= min_perc);
    stats.keys().copied().collect()
}

/// Coverage minus amortized header cost; higher is better.
pub fn score(stats: &Stats) -> u64 {
    stats.values().map(|entry| entry.nnz - entry.npatterns).sum()
}
