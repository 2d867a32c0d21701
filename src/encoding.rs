//! Iteration orders, pattern descriptors and the pattern-id algebra.
//!
//! An `IterationOrder` names one of the geometric sweeps the analyzer can
//! re-lay a partition into. The coordinate maps here are total and
//! invertible given the order and the partition's row count, so a partition
//! can be transformed between any two orders without loss. In its own
//! transformed space every pattern is a run along the virtual column axis,
//! which is what makes the delta-RLE analysis uniform across orders.
//!
//! A `PatternDescriptor` is the tagged replacement for a polymorphic pattern
//! hierarchy: `{kind, delta, size}` plus pure functions computing covered
//! coordinates, the last covered column and the row span.

use serde::{Deserialize, Serialize};

use crate::error::CsxError;

/// Bit position of the type index inside a pattern id. Each order owns the
/// disjoint range `[type_index << SHIFT, (type_index + 1) << SHIFT)`, so ids
/// stay injective for any delta below [`PID_DELTA_MAX`] and the largest id
/// (`BlockCol(8)`) still fits the signed 32-bit id map.
pub const PID_KIND_SHIFT: u64 = 26;

/// Exclusive upper bound on the delta a pattern id can carry. The planner
/// filters larger deltas out before any pattern is built.
pub const PID_DELTA_MAX: u64 = 1 << PID_KIND_SHIFT;

/// Base of the id range reserved for delta-list units. These sit inside the
/// horizontal (type 0) range, so horizontal pattern ids (raw deltas) stay
/// below this.
pub const PID_DELTA_BASE: u64 = 9_000;

/// Largest supported block alignment for `BlockRow`/`BlockCol`.
pub const BLOCK_ALIGN_MAX: u8 = 8;

//==================================================================================
// Iteration orders
//==================================================================================

/// One geometric sweep order over a partition's nonzeros.
///
/// The derived `Ord` follows declaration order; the planner relies on it for
/// deterministic tie-breaking between equally-scored candidates.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum IterationOrder {
    None,
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
    BlockRow(u8),
    BlockCol(u8),
}

/// Orders that are never considered by the planner.
pub const ALWAYS_IGNORED: [IterationOrder; 3] = [
    IterationOrder::None,
    IterationOrder::BlockRow(1),
    IterationOrder::BlockCol(1),
];

/// All candidate orders, in the planner's deterministic evaluation order.
pub fn candidates() -> Vec<IterationOrder> {
    let mut out = vec![
        IterationOrder::Horizontal,
        IterationOrder::Vertical,
        IterationOrder::Diagonal,
        IterationOrder::AntiDiagonal,
    ];
    for k in 2..=BLOCK_ALIGN_MAX {
        out.push(IterationOrder::BlockRow(k));
    }
    for k in 2..=BLOCK_ALIGN_MAX {
        out.push(IterationOrder::BlockCol(k));
    }
    out
}

impl IterationOrder {
    /// Index of this order inside the pattern-id space. `None` carries no
    /// patterns and has no index.
    pub fn type_index(self) -> Option<u64> {
        match self {
            IterationOrder::None => None,
            IterationOrder::Horizontal => Some(0),
            IterationOrder::Vertical => Some(1),
            IterationOrder::Diagonal => Some(2),
            IterationOrder::AntiDiagonal => Some(3),
            IterationOrder::BlockRow(k) => Some(3 + k as u64),
            IterationOrder::BlockCol(k) => Some(11 + k as u64),
        }
    }

    /// Block alignment for block orders, `None` for linear orders.
    pub fn block_alignment(self) -> Option<u64> {
        match self {
            IterationOrder::BlockRow(k) | IterationOrder::BlockCol(k) => Some(k as u64),
            _ => None,
        }
    }

    /// Number of virtual rows a partition of the given shape presents when
    /// iterated in this order.
    pub fn transformed_rows(self, nr_rows: u64, nr_cols: u64) -> u64 {
        match self {
            IterationOrder::None | IterationOrder::Horizontal => nr_rows,
            IterationOrder::Vertical => nr_cols,
            IterationOrder::Diagonal | IterationOrder::AntiDiagonal => {
                nr_rows + nr_cols - 1
            }
            IterationOrder::BlockRow(k) => (nr_rows + k as u64 - 1) / k as u64,
            IterationOrder::BlockCol(k) => (nr_cols + k as u64 - 1) / k as u64,
        }
    }

    /// Maps a 1-based `(row, col)` coordinate into this order's virtual
    /// `(row, col)` space. Successive elements of a run in this order differ
    /// by their delta along the virtual column axis.
    pub fn to_transformed(self, nr_rows: u64, r: u64, c: u64) -> (u64, u64) {
        match self {
            IterationOrder::None | IterationOrder::Horizontal => (r, c),
            IterationOrder::Vertical => (c, r),
            IterationOrder::Diagonal => (nr_rows + c - r, r.min(c)),
            IterationOrder::AntiDiagonal => (r + c - 1, r),
            IterationOrder::BlockRow(k) => {
                let k = k as u64;
                ((r - 1) / k + 1, (c - 1) * k + (r - 1) % k + 1)
            }
            IterationOrder::BlockCol(k) => {
                let k = k as u64;
                ((c - 1) / k + 1, (r - 1) * k + (c - 1) % k + 1)
            }
        }
    }

    /// Inverse of [`to_transformed`](Self::to_transformed).
    pub fn from_transformed(self, nr_rows: u64, r: u64, c: u64) -> (u64, u64) {
        match self {
            IterationOrder::None | IterationOrder::Horizontal => (r, c),
            IterationOrder::Vertical => (c, r),
            IterationOrder::Diagonal => {
                if r >= nr_rows {
                    // On or above the main diagonal: col leads.
                    (c, c + (r - nr_rows))
                } else {
                    (c + (nr_rows - r), c)
                }
            }
            IterationOrder::AntiDiagonal => (c, r + 1 - c),
            IterationOrder::BlockRow(k) => {
                let k = k as u64;
                ((r - 1) * k + (c - 1) % k + 1, (c - 1) / k + 1)
            }
            IterationOrder::BlockCol(k) => {
                let k = k as u64;
                ((c - 1) / k + 1, (r - 1) * k + (c - 1) % k + 1)
            }
        }
    }
}

//==================================================================================
// Pattern descriptors
//==================================================================================

/// Pattern id assigned to a delta-list unit with the given delta width.
pub fn delta_pattern_id(delta_bytes: usize) -> u64 {
    PID_DELTA_BASE + delta_bytes as u64
}

/// Recovers the delta width from a delta-list pattern id, if it is one.
pub fn delta_bytes_of(pattern_id: u64) -> Option<usize> {
    if pattern_id > PID_DELTA_BASE && pattern_id <= PID_DELTA_BASE + 8 {
        Some((pattern_id - PID_DELTA_BASE) as usize)
    } else {
        None
    }
}

/// An immutable description of a geometric run: the order it belongs to, the
/// per-step stride along the run's axis, and the number of nonzeros covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternDescriptor {
    pub kind: IterationOrder,
    pub delta: u64,
    pub size: usize,
}

impl PatternDescriptor {
    /// Integer id encoding `(kind, delta)` injectively.
    ///
    /// The type index occupies the bits at [`PID_KIND_SHIFT`] and above, the
    /// delta the bits below, so every order owns a disjoint range no matter
    /// how large the delta grows (the planner keeps deltas under
    /// [`PID_DELTA_MAX`]). Horizontal is type 0 and uses the delta directly;
    /// its ids stay below `PID_DELTA_BASE` so they cannot collide with the
    /// delta-list unit ids sharing that range. Block orders key on their
    /// alignment; the unit's size byte recovers the other dimension.
    pub fn pattern_id(&self) -> u64 {
        let idx = self.kind.type_index().unwrap_or(0);
        match self.kind {
            IterationOrder::Horizontal => self.delta,
            IterationOrder::Vertical
            | IterationOrder::Diagonal
            | IterationOrder::AntiDiagonal => {
                debug_assert!(self.delta < PID_DELTA_MAX);
                (idx << PID_KIND_SHIFT) | self.delta
            }
            IterationOrder::BlockRow(k) | IterationOrder::BlockCol(k) => {
                (idx << PID_KIND_SHIFT) | k as u64
            }
            IterationOrder::None => 0,
        }
    }

    /// Inverse of [`pattern_id`](Self::pattern_id), given the unit size.
    pub fn from_pattern_id(pattern_id: u64, size: usize) -> Result<Self, CsxError> {
        if pattern_id < PID_DELTA_BASE {
            return Ok(Self {
                kind: IterationOrder::Horizontal,
                delta: pattern_id,
                size,
            });
        }
        if pattern_id < PID_DELTA_MAX {
            return Err(CsxError::FormatError(format!(
                "pattern id {} is reserved for delta-list units, not a geometric run",
                pattern_id
            )));
        }
        let idx = pattern_id >> PID_KIND_SHIFT;
        let rem = pattern_id & (PID_DELTA_MAX - 1);
        let (kind, delta) = match idx {
            1 => (IterationOrder::Vertical, rem),
            2 => (IterationOrder::Diagonal, rem),
            3 => (IterationOrder::AntiDiagonal, rem),
            4..=11 => (IterationOrder::BlockRow((idx - 3) as u8), 1),
            12..=19 => (IterationOrder::BlockCol((idx - 11) as u8), 1),
            _ => {
                return Err(CsxError::FormatError(format!(
                    "unknown pattern id {}",
                    pattern_id
                )))
            }
        };
        Ok(Self { kind, delta, size })
    }

    /// Maximum vertical reach of the run below its anchor row.
    pub fn span(&self) -> u64 {
        match self.kind {
            IterationOrder::Vertical
            | IterationOrder::Diagonal
            | IterationOrder::AntiDiagonal => (self.size as u64 - 1) * self.delta,
            IterationOrder::BlockRow(k) => k as u64 - 1,
            IterationOrder::BlockCol(k) => self.size as u64 / k as u64 - 1,
            _ => 0,
        }
    }

    /// The column the next unit's jump is measured from, given the anchor
    /// column of this run.
    pub fn last_col(&self, anchor_col: u64) -> u64 {
        match self.kind {
            IterationOrder::Horizontal => {
                anchor_col + self.delta * (self.size as u64 - 1)
            }
            IterationOrder::Vertical
            | IterationOrder::Diagonal
            | IterationOrder::AntiDiagonal => anchor_col,
            IterationOrder::BlockRow(k) => {
                anchor_col + self.size as u64 / k as u64 - 1
            }
            IterationOrder::BlockCol(k) => anchor_col + k as u64 - 1,
            IterationOrder::None => anchor_col,
        }
    }

    /// Coordinates of the `i`-th nonzero covered by this run, anchored at
    /// `(anchor_row, anchor_col)` in original 1-based coordinates.
    ///
    /// The run steps along the virtual column axis of its own order, so
    /// covered coordinates are obtained by mapping the anchor into that
    /// space, stepping, and mapping back.
    pub fn element_coords(
        &self,
        nr_rows: u64,
        anchor_row: u64,
        anchor_col: u64,
        i: usize,
    ) -> (u64, u64) {
        let (tr, tc) = self.kind.to_transformed(nr_rows, anchor_row, anchor_col);
        self.kind
            .from_transformed(nr_rows, tr, tc + self.delta * i as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_orders() -> Vec<IterationOrder> {
        let mut v = candidates();
        v.push(IterationOrder::BlockRow(1));
        v.push(IterationOrder::BlockCol(1));
        v
    }

    #[test]
    fn transform_roundtrips_every_coordinate() {
        let (nr_rows, nr_cols) = (7u64, 5u64);
        for order in all_orders() {
            for r in 1..=nr_rows {
                for c in 1..=nr_cols {
                    let (tr, tc) = order.to_transformed(nr_rows, r, c);
                    assert!(tr >= 1 && tr <= order.transformed_rows(nr_rows, nr_cols));
                    let (br, bc) = order.from_transformed(nr_rows, tr, tc);
                    assert_eq!((br, bc), (r, c), "{:?} at ({}, {})", order, r, c);
                }
            }
        }
    }

    #[test]
    fn transform_is_injective() {
        let (nr_rows, nr_cols) = (6u64, 6u64);
        for order in all_orders() {
            let mut seen = std::collections::HashSet::new();
            for r in 1..=nr_rows {
                for c in 1..=nr_cols {
                    assert!(
                        seen.insert(order.to_transformed(nr_rows, r, c)),
                        "{:?} collides at ({}, {})",
                        order,
                        r,
                        c
                    );
                }
            }
        }
    }

    #[test]
    fn diagonal_runs_step_by_one() {
        let nr_rows = 8;
        let (r0, c0) = IterationOrder::Diagonal.to_transformed(nr_rows, 3, 5);
        let (r1, c1) = IterationOrder::Diagonal.to_transformed(nr_rows, 4, 6);
        assert_eq!(r0, r1);
        assert_eq!(c1, c0 + 1);
    }

    #[test]
    fn block_row_runs_are_contiguous_inside_a_block() {
        let order = IterationOrder::BlockRow(2);
        // A 2x3 block anchored at (1, 1) occupies virtual columns 1..=6.
        let mut cols: Vec<u64> = Vec::new();
        for c in 1..=3 {
            for r in 1..=2 {
                cols.push(order.to_transformed(4, r, c).1);
            }
        }
        cols.sort_unstable();
        assert_eq!(cols, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn pattern_ids_are_injective_across_kinds() {
        // Deltas straddling the old per-type range boundaries: ids must stay
        // distinct across kinds even when the delta dwarfs them.
        let deltas = [
            1u64,
            2,
            6,
            9_999,
            10_000,
            10_001,
            39_999,
            40_001,
            123_456,
            PID_DELTA_MAX - 1,
        ];
        let mut seen = std::collections::HashMap::new();
        for order in candidates() {
            for &delta in &deltas {
                let delta = match order {
                    IterationOrder::BlockRow(_) | IterationOrder::BlockCol(_) => 1,
                    // Horizontal deltas are capped below the delta-list unit
                    // range by the planner.
                    IterationOrder::Horizontal if delta >= PID_DELTA_BASE => continue,
                    _ => delta,
                };
                let desc = PatternDescriptor { kind: order, delta, size: 4 };
                let pid = desc.pattern_id();
                if let Some(prev) = seen.insert(pid, (desc.kind, desc.delta)) {
                    assert_eq!(
                        prev,
                        (desc.kind, desc.delta),
                        "pattern id {} collides across kinds",
                        pid
                    );
                }
            }
        }
    }

    #[test]
    fn large_deltas_do_not_collide_into_other_kinds() {
        // With range-sized deltas, a Vertical run must never decode as a
        // Diagonal (or block) run.
        let vertical = PatternDescriptor {
            kind: IterationOrder::Vertical,
            delta: 10_001,
            size: 4,
        };
        let diagonal = PatternDescriptor {
            kind: IterationOrder::Diagonal,
            delta: 1,
            size: 4,
        };
        assert_ne!(vertical.pattern_id(), diagonal.pattern_id());

        for delta in [10_000u64, 40_001, 123_456, PID_DELTA_MAX - 1] {
            for kind in [
                IterationOrder::Vertical,
                IterationOrder::Diagonal,
                IterationOrder::AntiDiagonal,
            ] {
                let desc = PatternDescriptor { kind, delta, size: 4 };
                let back =
                    PatternDescriptor::from_pattern_id(desc.pattern_id(), desc.size).unwrap();
                assert_eq!(back, desc);
            }
        }
    }

    #[test]
    fn pattern_id_roundtrips_through_from_pattern_id() {
        let descs = [
            PatternDescriptor { kind: IterationOrder::Horizontal, delta: 2, size: 5 },
            PatternDescriptor { kind: IterationOrder::Vertical, delta: 3, size: 4 },
            PatternDescriptor { kind: IterationOrder::Diagonal, delta: 1, size: 9 },
            PatternDescriptor { kind: IterationOrder::AntiDiagonal, delta: 2, size: 6 },
            PatternDescriptor { kind: IterationOrder::BlockRow(2), delta: 1, size: 8 },
            PatternDescriptor { kind: IterationOrder::BlockCol(7), delta: 1, size: 14 },
        ];
        for d in descs {
            let back = PatternDescriptor::from_pattern_id(d.pattern_id(), d.size).unwrap();
            assert_eq!(back, d);
        }
    }

    #[test]
    fn delta_unit_ids_do_not_decode_as_patterns() {
        let pid = delta_pattern_id(4);
        assert_eq!(delta_bytes_of(pid), Some(4));
        assert!(PatternDescriptor::from_pattern_id(pid, 3).is_err());
    }

    #[test]
    fn spans_follow_the_geometry() {
        let v = PatternDescriptor { kind: IterationOrder::Vertical, delta: 2, size: 4 };
        assert_eq!(v.span(), 6);
        let d = PatternDescriptor { kind: IterationOrder::Diagonal, delta: 1, size: 5 };
        assert_eq!(d.span(), 4);
        let br = PatternDescriptor { kind: IterationOrder::BlockRow(3), delta: 1, size: 12 };
        assert_eq!(br.span(), 2);
        let bc = PatternDescriptor { kind: IterationOrder::BlockCol(3), delta: 1, size: 12 };
        assert_eq!(bc.span(), 3);
        let h = PatternDescriptor { kind: IterationOrder::Horizontal, delta: 4, size: 10 };
        assert_eq!(h.span(), 0);
    }

    #[test]
    fn last_col_per_kind() {
        let h = PatternDescriptor { kind: IterationOrder::Horizontal, delta: 2, size: 5 };
        assert_eq!(h.last_col(3), 11);
        let v = PatternDescriptor { kind: IterationOrder::Vertical, delta: 1, size: 4 };
        assert_eq!(v.last_col(9), 9);
        let br = PatternDescriptor { kind: IterationOrder::BlockRow(2), delta: 1, size: 6 };
        assert_eq!(br.last_col(4), 6); // 3 columns wide
        let bc = PatternDescriptor { kind: IterationOrder::BlockCol(4), delta: 1, size: 8 };
        assert_eq!(bc.last_col(4), 7); // alignment-wide
    }

    #[test]
    fn element_coords_walk_the_run() {
        let d = PatternDescriptor { kind: IterationOrder::Diagonal, delta: 1, size: 3 };
        let pts: Vec<_> = (0..3).map(|i| d.element_coords(5, 2, 3, i)).collect();
        assert_eq!(pts, vec![(2, 3), (3, 4), (4, 5)]);

        let a = PatternDescriptor { kind: IterationOrder::AntiDiagonal, delta: 1, size: 3 };
        let pts: Vec<_> = (0..3).map(|i| a.element_coords(5, 1, 4, i)).collect();
        assert_eq!(pts, vec![(1, 4), (2, 3), (3, 2)]);

        let b = PatternDescriptor { kind: IterationOrder::BlockRow(2), delta: 1, size: 4 };
        let pts: Vec<_> = (0..4).map(|i| b.element_coords(4, 1, 1, i)).collect();
        assert_eq!(pts, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }
}
