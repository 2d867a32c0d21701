//! The CSX assembler: walks a final partition in row order and emits the
//! control stream, the values array and the per-row metadata.
//!
//! Ctl rules:
//! 1. Each unit leaves the column cursor at the last column it covered on
//!    the current row.
//! 2. A unit's size is the number of nonzeros it consumes from the values
//!    array.

use std::collections::BTreeMap;

use crate::csx::ctl::{CtlBuilder, CTL_PATTERNS_MAX, CTL_SIZE_MAX};
use crate::csx::matrix::{CsxMatrix, CsxSymMatrix, RowInfo, ID_MAP_SIZE};
use crate::encoding::{self, IterationOrder, PatternDescriptor};
use crate::error::CsxError;
use crate::kernels::{delta, fixed};
use crate::matrix::element::Element;
use crate::matrix::partition::SparsePartition;
use crate::matrix::partition_sym::SparsePartitionSym;

/// Bookkeeping for one distinct pattern id.
#[derive(Debug, Clone, Copy)]
struct PatInfo {
    flag: u8,
    npatterns: u64,
    nnz: u64,
}

pub struct CsxAssembler<'a, V> {
    spm: &'a SparsePartition<V>,
    full_column_indices: bool,
    patterns: BTreeMap<u64, PatInfo>,
    flag_avail: u8,
    row_jumps: bool,
    ctl: CtlBuilder,
    values: Vec<V>,
    rows_info: Vec<RowInfo>,
    last_col: u64,
    new_row: bool,
    empty_rows: u64,
    span: u64,
}

impl<'a, V: Copy> CsxAssembler<'a, V> {
    pub fn new(spm: &'a SparsePartition<V>, full_column_indices: bool) -> Self {
        Self {
            spm,
            full_column_indices,
            patterns: BTreeMap::new(),
            flag_avail: 0,
            row_jumps: false,
            ctl: CtlBuilder::new(6 * spm.nr_nzeros() as usize),
            values: Vec::with_capacity(spm.nr_nzeros() as usize),
            rows_info: Vec::with_capacity(spm.nr_rows() as usize),
            last_col: 0,
            new_row: false,
            empty_rows: 0,
            span: 0,
        }
    }

    /// Transforms the partition into its final CSX form. The partition must
    /// be in horizontal order.
    pub fn make_csx(mut self) -> Result<CsxMatrix<V>, CsxError> {
        if self.spm.order() != IterationOrder::Horizontal {
            return Err(CsxError::InvalidInput(format!(
                "assembly requires horizontal order, partition is {:?}",
                self.spm.order()
            )));
        }
        self.walk_rows(false)?;
        self.finish()
    }

    fn walk_rows(&mut self, symmetric: bool) -> Result<(), CsxError> {
        for i in 0..self.spm.transformed_row_count() {
            let row = self.spm.row(i);
            if row.is_empty() {
                if !self.new_row {
                    // The very first row is not marked; the decoder assumes
                    // it.
                    self.new_row = true;
                    self.rows_info.push(RowInfo::default());
                } else {
                    self.empty_rows += 1;
                    let prev = self.rows_info[i - 1];
                    self.rows_info.push(RowInfo {
                        ctl_offset: prev.ctl_offset,
                        value_offset: prev.value_offset,
                        span: 0,
                    });
                }
                continue;
            }

            let info = RowInfo {
                ctl_offset: self.ctl.len() as u64,
                value_offset: self.values.len() as u64,
                span: 0,
            };
            if symmetric {
                self.do_sym_row(row)?;
            } else {
                self.do_row(row)?;
            }
            self.rows_info.push(RowInfo { span: self.span, ..info });
            self.new_row = true;
        }
        Ok(())
    }

    fn finish(self) -> Result<CsxMatrix<V>, CsxError> {
        debug_assert_eq!(self.values.len() as u64, self.spm.nr_nzeros());
        // Slots are indexed by flag; every slot past the last assigned flag
        // keeps the -1 terminator.
        let mut id_map = [-1i32; ID_MAP_SIZE];
        for (&pattern_id, info) in &self.patterns {
            log::debug!(
                "pattern {} -> flag {}: {} units, {} nonzeros",
                pattern_id,
                info.flag,
                info.npatterns,
                info.nnz,
            );
            id_map[info.flag as usize] = pattern_id as i32;
        }
        Ok(CsxMatrix {
            nnz: self.spm.nr_nzeros(),
            nrows: self.spm.nr_rows(),
            ncols: self.spm.nr_cols(),
            row_start: self.spm.row_start(),
            row_jumps: self.row_jumps,
            ctl: self.ctl.finalize(),
            values: self.values,
            rows_info: self.rows_info,
            id_map,
        })
    }

    /// Emits one row: plain elements batch into delta-list units, pattern
    /// elements flush the batch and become single units.
    fn do_row(&mut self, row: &[Element<V>]) -> Result<(), CsxError> {
        self.span = 0;
        self.last_col = 1;
        self.do_row_units(row)
    }

    fn do_row_units(&mut self, row: &[Element<V>]) -> Result<(), CsxError> {
        let mut cols: Vec<u64> = Vec::new();
        for e in row {
            match e {
                Element::Pattern { col, desc, vals, .. } => {
                    self.update_row_span(desc);
                    self.prepare_pat(&mut cols)?;
                    self.add_pattern(*col, desc)?;
                    self.values.extend_from_slice(vals);
                }
                Element::Plain { col, val, .. } => {
                    if cols.len() == CTL_SIZE_MAX {
                        self.add_cols(&mut cols)?;
                    }
                    cols.push(*col);
                    self.values.push(*val);
                }
            }
        }
        if !cols.is_empty() {
            self.add_cols(&mut cols)?;
        }
        Ok(())
    }

    /// Symmetric variant: units never straddle the partition's diagonal
    /// block boundary, so the columns up to `row_start` flush separately.
    /// The column cursor carries across the split.
    fn do_sym_row(&mut self, row: &[Element<V>]) -> Result<(), CsxError> {
        let boundary = self.spm.row_start();
        let split = row
            .iter()
            .position(|e| e.col() > boundary)
            .unwrap_or(row.len());
        self.span = 0;
        self.last_col = 1;
        self.do_row_units(&row[..split])?;
        self.do_row_units(&row[split..])
    }

    fn prepare_pat(&mut self, cols: &mut Vec<u64>) -> Result<(), CsxError> {
        if !cols.is_empty() {
            self.add_cols(cols)?;
        }
        Ok(())
    }

    fn update_row_span(&mut self, desc: &PatternDescriptor) {
        self.span = self.span.max(desc.span());
    }

    /// New-row bookkeeping for the first unit of a row: the new-row marker,
    /// and the row jump (`empty_rows + 1`) when empty rows were crossed.
    fn update_new_row(&mut self) -> (bool, u64) {
        if !self.new_row {
            return (false, 0);
        }
        self.new_row = false;
        let mut row_jump = 0;
        if self.empty_rows != 0 {
            row_jump = self.empty_rows + 1;
            self.empty_rows = 0;
            self.row_jumps = true;
        }
        (true, row_jump)
    }

    /// Emits one delta-list unit covering `cols`.
    fn add_cols(&mut self, cols: &mut Vec<u64>) -> Result<(), CsxError> {
        let cols_size = cols.len();
        let col_start = cols[0];
        let last_col = cols[cols_size - 1];
        delta::delta_encode_in_place(cols, self.last_col);
        self.last_col = last_col;

        let max = cols[1..].iter().copied().max().unwrap_or(0);
        let delta_bytes = fixed::fit_width(max);
        let pattern_id = encoding::delta_pattern_id(delta_bytes);

        let (new_row, row_jump) = self.update_new_row();
        let ucol = if self.full_column_indices {
            col_start - 1
        } else {
            cols[0]
        };
        let flag = self.get_flag(pattern_id, cols_size as u64)?;
        self.ctl.append_ctl_head(
            new_row,
            row_jump,
            flag,
            cols_size,
            ucol,
            std::mem::size_of::<u64>(),
            self.full_column_indices,
        )?;
        for &delta in &cols[1..] {
            self.ctl.append_fixed(delta, delta_bytes);
        }
        cols.clear();
        Ok(())
    }

    /// Emits one pattern unit.
    fn add_pattern(&mut self, col: u64, desc: &PatternDescriptor) -> Result<(), CsxError> {
        let pattern_id = desc.pattern_id();
        let (new_row, row_jump) = self.update_new_row();
        let ucol = if self.full_column_indices {
            col - 1
        } else {
            col - self.last_col
        };
        let flag = self.get_flag(pattern_id, desc.size as u64)?;
        self.ctl.append_ctl_head(
            new_row,
            row_jump,
            flag,
            desc.size,
            ucol,
            std::mem::size_of::<u64>(),
            self.full_column_indices,
        )?;
        self.last_col = desc.last_col(col);
        Ok(())
    }

    /// Returns the flag for `pattern_id`, assigning the next free one on
    /// first sight.
    fn get_flag(&mut self, pattern_id: u64, nnz: u64) -> Result<u8, CsxError> {
        if let Some(info) = self.patterns.get_mut(&pattern_id) {
            info.npatterns += 1;
            info.nnz += nnz;
            return Ok(info.flag);
        }
        if self.flag_avail as usize >= CTL_PATTERNS_MAX {
            return Err(CsxError::LimitExceeded(format!(
                "more than {} distinct patterns",
                CTL_PATTERNS_MAX
            )));
        }
        let flag = self.flag_avail;
        self.flag_avail += 1;
        self.patterns.insert(pattern_id, PatInfo { flag, npatterns: 1, nnz });
        Ok(flag)
    }
}

/// Assembles a symmetric partition: the dense diagonal plus the lower
/// triangle in CSX form.
pub fn make_csx_sym<V: Copy + num_traits::Zero>(
    spm_sym: &SparsePartitionSym<V>,
    full_column_indices: bool,
) -> Result<CsxSymMatrix<V>, CsxError> {
    let spm = spm_sym.lower();
    if spm.order() != IterationOrder::Horizontal {
        return Err(CsxError::InvalidInput(format!(
            "assembly requires horizontal order, partition is {:?}",
            spm.order()
        )));
    }
    let mut assembler = CsxAssembler::new(spm, full_column_indices);
    assembler.walk_rows(true)?;
    Ok(CsxSymMatrix {
        dvalues: spm_sym.diagonal().to_vec(),
        lower: assembler.finish()?,
    })
}
