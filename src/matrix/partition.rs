//! An owned, mutable row-range of a sparse matrix.
//!
//! A `SparsePartition` is the unit of work for one encoder instance: a
//! contiguous range of global rows, stored locally 1-based, whose elements
//! can be re-laid into any [`IterationOrder`] and back without loss. The
//! encoder replaces element ranges through [`PartitionBuilder`]; nothing
//! else mutates the element storage.

use crate::encoding::IterationOrder;
use crate::error::CsxError;
use crate::matrix::element::Element;

#[derive(Debug, Clone)]
pub struct SparsePartition<V> {
    nr_rows: u64,
    nr_cols: u64,
    nr_nzeros: u64,
    row_start: u64,
    order: IterationOrder,
    elems: Vec<Element<V>>,
    rowptr: Vec<usize>,
}

impl<V: Copy> SparsePartition<V> {
    /// Ingests coordinate triples `(row, col, value)` with global 1-based
    /// rows in `(row_start, row_start + nr_rows]` and columns in
    /// `[1, nr_cols]`, sorted into `Horizontal` order.
    ///
    /// Rejects out-of-range and duplicate coordinates.
    pub fn from_coords(
        nr_rows: u64,
        nr_cols: u64,
        row_start: u64,
        triples: &[(u64, u64, V)],
    ) -> Result<Self, CsxError> {
        let mut elems = Vec::with_capacity(triples.len());
        for &(r, c, v) in triples {
            if r <= row_start || r > row_start + nr_rows {
                return Err(CsxError::InvalidInput(format!(
                    "row {} outside partition rows ({}, {}]",
                    r,
                    row_start,
                    row_start + nr_rows
                )));
            }
            if c == 0 || c > nr_cols {
                return Err(CsxError::InvalidInput(format!(
                    "column {} outside [1, {}]",
                    c, nr_cols
                )));
            }
            elems.push(Element::Plain {
                row: r - row_start,
                col: c,
                val: v,
            });
        }
        elems.sort_unstable_by_key(|e| (e.row(), e.col()));
        for pair in elems.windows(2) {
            if pair[0].row() == pair[1].row() && pair[0].col() == pair[1].col() {
                return Err(CsxError::InvalidInput(format!(
                    "duplicate coordinate ({}, {})",
                    pair[0].row() + row_start,
                    pair[0].col()
                )));
            }
        }

        let nr_nzeros = elems.len() as u64;
        let mut spm = Self {
            nr_rows,
            nr_cols,
            nr_nzeros,
            row_start,
            order: IterationOrder::Horizontal,
            elems,
            rowptr: Vec::new(),
        };
        spm.rebuild_rowptr();
        Ok(spm)
    }

    pub fn nr_rows(&self) -> u64 {
        self.nr_rows
    }

    pub fn nr_cols(&self) -> u64 {
        self.nr_cols
    }

    pub fn nr_nzeros(&self) -> u64 {
        self.nr_nzeros
    }

    pub fn row_start(&self) -> u64 {
        self.row_start
    }

    pub fn order(&self) -> IterationOrder {
        self.order
    }

    pub fn elements(&self) -> &[Element<V>] {
        &self.elems
    }

    /// Number of virtual rows in the current iteration order.
    pub fn transformed_row_count(&self) -> usize {
        self.rowptr.len() - 1
    }

    /// Elements of the `i`-th virtual row (0-based) in the current order.
    pub fn row(&self, i: usize) -> &[Element<V>] {
        &self.elems[self.rowptr[i]..self.rowptr[i + 1]]
    }

    /// Re-sorts the partition into `new_order`, re-keying every element's
    /// coordinates through the original `(row, col)` space. Lossless and
    /// invertible; pattern anchors travel like plain coordinates.
    pub fn transform(&mut self, new_order: IterationOrder) {
        if new_order == self.order {
            return;
        }
        let nr_rows = self.nr_rows;
        let old = self.order;
        for e in &mut self.elems {
            let (r, c) = old.from_transformed(nr_rows, e.row(), e.col());
            let (tr, tc) = new_order.to_transformed(nr_rows, r, c);
            e.set_coords(tr, tc);
        }
        self.elems.sort_unstable_by_key(|e| (e.row(), e.col()));
        self.order = new_order;
        self.rebuild_rowptr();
    }

    /// Replaces the element storage with a builder's output. The builder
    /// must have produced one row per virtual row of the current order and
    /// conserved the nonzero count.
    pub fn replace(&mut self, builder: PartitionBuilder<V>) {
        let (elems, rowptr) = builder.into_parts();
        debug_assert_eq!(rowptr.len(), self.rowptr.len());
        debug_assert_eq!(
            elems.iter().map(Element::nnz).sum::<usize>() as u64,
            self.nr_nzeros
        );
        self.elems = elems;
        self.rowptr = rowptr;
    }

    fn rebuild_rowptr(&mut self) {
        let rows = self
            .order
            .transformed_rows(self.nr_rows, self.nr_cols) as usize;
        let mut rowptr = Vec::with_capacity(rows + 1);
        rowptr.push(0);
        let mut idx = 0usize;
        for row in 1..=rows as u64 {
            while idx < self.elems.len() && self.elems[idx].row() == row {
                idx += 1;
            }
            rowptr.push(idx);
        }
        self.rowptr = rowptr;
    }
}

/// Row-by-row replacement buffer for a partition's element storage.
///
/// Push the elements of each virtual row in order, closing each row with
/// [`new_row`](Self::new_row), then hand the builder to
/// [`SparsePartition::replace`].
#[derive(Debug)]
pub struct PartitionBuilder<V> {
    elems: Vec<Element<V>>,
    rowptr: Vec<usize>,
}

impl<V> PartitionBuilder<V> {
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            rowptr: vec![0],
        }
    }

    pub fn push(&mut self, elem: Element<V>) {
        self.elems.push(elem);
    }

    pub fn new_row(&mut self) {
        self.rowptr.push(self.elems.len());
    }

    fn into_parts(self) -> (Vec<Element<V>>, Vec<usize>) {
        (self.elems, self.rowptr)
    }
}

impl<V> Default for PartitionBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}
