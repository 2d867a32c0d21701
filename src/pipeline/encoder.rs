//! The per-order encoder: rewrites a partition, replacing qualifying runs of
//! plain elements with pattern instances for one iteration order.
//!
//! Encoding is a two-phase rebuild: each virtual row's plain elements are
//! gathered into a pending column/value pair of buffers, flushed through the
//! delta-RLE whenever an already-patterned element interrupts or the row
//! ends. Block encoding may rewind the rebuilt row by one element when a
//! block run absorbs its predecessor.

use std::collections::BTreeSet;

use crate::config::EncoderConfig;
use crate::encoding::{IterationOrder, PatternDescriptor};
use crate::kernels::delta;
use crate::matrix::element::Element;
use crate::matrix::partition::{PartitionBuilder, SparsePartition};

/// Rewrites `spm` in place, encoding runs of `order` whose delta (or block
/// other-dimension) appears in `deltas_to_encode`. The partition is returned
/// to `Horizontal` order afterwards.
pub fn encode<V: Copy>(
    spm: &mut SparsePartition<V>,
    order: IterationOrder,
    deltas_to_encode: &BTreeSet<u64>,
    config: &EncoderConfig,
) {
    spm.transform(order);
    let mut bld = PartitionBuilder::new();
    let mut newrow: Vec<Element<V>> = Vec::new();
    for i in 0..spm.transformed_row_count() {
        encode_row(spm.row(i), order, deltas_to_encode, config, &mut newrow);
        for e in newrow.drain(..) {
            bld.push(e);
        }
        bld.new_row();
    }
    spm.replace(bld);
    spm.transform(IterationOrder::Horizontal);
}

/// Expands every pattern element of `order` back into plain elements,
/// undoing a previous [`encode`] round. Patterns of other orders pass
/// through untouched.
pub fn decode<V: Copy>(spm: &mut SparsePartition<V>, order: IterationOrder) {
    if order == IterationOrder::None {
        return;
    }
    spm.transform(order);
    let mut bld = PartitionBuilder::new();
    for i in 0..spm.transformed_row_count() {
        for e in spm.row(i) {
            match e {
                Element::Pattern { row, col, desc, vals } if desc.kind == order => {
                    for (step, &val) in vals.iter().enumerate() {
                        bld.push(Element::Plain {
                            row: *row,
                            col: *col + desc.delta * step as u64,
                            val,
                        });
                    }
                }
                other => bld.push(other.clone()),
            }
        }
        bld.new_row();
    }
    spm.replace(bld);
    spm.transform(IterationOrder::Horizontal);
}

/// Sweeps one virtual row: plain elements accumulate into the pending
/// buffers, existing patterns flush them and pass through unchanged.
fn encode_row<V: Copy>(
    row: &[Element<V>],
    order: IterationOrder,
    deltas_to_encode: &BTreeSet<u64>,
    config: &EncoderConfig,
    newrow: &mut Vec<Element<V>>,
) {
    let mut xs: Vec<u64> = Vec::new();
    let mut vs: Vec<V> = Vec::new();
    for e in row {
        match e {
            Element::Plain { col, val, .. } => {
                xs.push(*col);
                vs.push(*val);
            }
            pattern => {
                if !xs.is_empty() {
                    do_encode(&mut xs, &mut vs, pattern.row(), order, deltas_to_encode, config, newrow);
                }
                newrow.push(pattern.clone());
            }
        }
    }
    if !xs.is_empty() {
        let row_idx = row.last().map(Element::row).unwrap_or(0);
        do_encode(&mut xs, &mut vs, row_idx, order, deltas_to_encode, config, newrow);
    }
}

/// Replaces one pending run of plain elements with pattern instances where
/// the delta-RLE says it pays off.
fn do_encode<V: Copy>(
    xs: &mut Vec<u64>,
    vs: &mut Vec<V>,
    row: u64,
    order: IterationOrder,
    deltas_to_encode: &BTreeSet<u64>,
    config: &EncoderConfig,
    newrow: &mut Vec<Element<V>>,
) {
    if let Some(align) = order.block_alignment() {
        do_encode_block(xs, vs, row, order, align, deltas_to_encode, config, newrow);
        return;
    }

    let runs = delta::delta_rle(xs);
    let mut col = 0u64;
    let mut vi = 0usize;
    for run in runs {
        let mut freq = run.freq;
        if deltas_to_encode.contains(&run.val) {
            while freq >= config.min_limit {
                let chunk = config.max_limit.min(freq);
                col += run.val;
                let vals = vs[vi..vi + chunk as usize].to_vec();
                vi += chunk as usize;
                newrow.push(Element::Pattern {
                    row,
                    col,
                    desc: PatternDescriptor {
                        kind: order,
                        delta: run.val,
                        size: chunk as usize,
                    },
                    vals,
                });
                col += run.val * (chunk - 1);
                freq -= chunk;
            }
        }
        for _ in 0..freq {
            col += run.val;
            newrow.push(Element::Plain { row, col, val: vs[vi] });
            vi += 1;
        }
    }
    debug_assert_eq!(vi, vs.len());
    xs.clear();
    vs.clear();
}

/// Block-order variant: only unit-delta runs qualify, trimmed onto block
/// boundaries front and back. A run that begins one column after pending
/// output absorbs that previous element into the block.
fn do_encode_block<V: Copy>(
    xs: &mut Vec<u64>,
    vs: &mut Vec<V>,
    row: u64,
    order: IterationOrder,
    align: u64,
    deltas_to_encode: &BTreeSet<u64>,
    config: &EncoderConfig,
    newrow: &mut Vec<Element<V>>,
) {
    let runs = delta::delta_rle(xs);
    let aligned_max = (config.max_limit / (2 * align)) * (2 * align);
    let mut col = 0u64;
    let mut vi = 0usize;
    for run in runs {
        col += run.val;

        let (skip_front, mut nr_elem) = if col == 1 {
            (0, run.freq)
        } else {
            let rem = (col - 2) % align;
            let skip = if rem != 0 { align - rem } else { 0 };
            (skip, run.freq + 1)
        };
        nr_elem = nr_elem.saturating_sub(skip_front);
        let mut skip_back = nr_elem % align;
        nr_elem -= skip_back;

        if run.val == 1
            && aligned_max != 0
            && nr_elem >= 2 * align
            && deltas_to_encode.contains(&(nr_elem / align))
        {
            let rle_start = if col != 1 {
                // Absorb the element that opened this contiguous stretch.
                let absorbed = newrow.pop();
                debug_assert!(matches!(absorbed, Some(Element::Plain { .. })));
                vi -= 1;
                col - 1
            } else {
                col
            };

            for i in 0..skip_front {
                newrow.push(Element::Plain { row, col: rle_start + i, val: vs[vi] });
                vi += 1;
            }

            let mut nr_blocks = nr_elem / aligned_max;
            let nr_elem_block = aligned_max.min(nr_elem);
            if nr_blocks == 0 {
                nr_blocks = 1;
            } else {
                skip_back += nr_elem - nr_elem_block * nr_blocks;
            }

            for i in 0..nr_blocks {
                let anchor = rle_start + skip_front + i * nr_elem_block;
                let vals = vs[vi..vi + nr_elem_block as usize].to_vec();
                vi += nr_elem_block as usize;
                newrow.push(Element::Pattern {
                    row,
                    col: anchor,
                    desc: PatternDescriptor {
                        kind: order,
                        delta: 1,
                        size: nr_elem_block as usize,
                    },
                    vals,
                });
            }

            let tail_start = rle_start + skip_front + nr_elem_block * nr_blocks;
            for i in 0..skip_back {
                newrow.push(Element::Plain { row, col: tail_start + i, val: vs[vi] });
                vi += 1;
            }
        } else {
            for i in 0..run.freq {
                newrow.push(Element::Plain { row, col: col + i * run.val, val: vs[vi] });
                vi += 1;
            }
        }

        col += run.val * (run.freq - 1);
    }
    debug_assert_eq!(vi, vs.len());
    xs.clear();
    vs.clear();
}
