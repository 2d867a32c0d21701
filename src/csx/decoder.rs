//! Reference decoder: one forward sweep over a CSX control stream.
//!
//! This is the element-level inverse of the assembler, used to validate
//! round trips and by callers that need the nonzeros back in coordinate
//! form. It is not an SpMV kernel; execution engines fuse the same walk
//! into their compute loop.

use std::io::Cursor;

use crate::csx::ctl::{CTL_FLAG_MASK, CTL_NR, CTL_RJMP};
use crate::csx::matrix::CsxMatrix;
use crate::encoding::{delta_bytes_of, PatternDescriptor};
use crate::error::CsxError;
use crate::kernels::{fixed, leb128};

/// One decoded unit header, plus the absolute columns it covers (all
/// columns for delta-list units, the anchor for pattern units).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// 1-based partition-local row the unit is anchored in.
    pub row: u64,
    pub flag: u8,
    pub size: usize,
    pub new_row: bool,
    pub row_jump: u64,
    pub pattern_id: u64,
    /// Absolute covered columns for delta-list units; the anchor column
    /// alone for pattern units.
    pub cols: Vec<u64>,
    /// Fixed delta width for delta-list units.
    pub delta_bytes: Option<usize>,
}

struct CtlWalker<'a> {
    ctl: &'a [u8],
    pos: usize,
    row: u64,
    last_col: u64,
    full_column_indices: bool,
}

impl<'a> CtlWalker<'a> {
    fn new(ctl: &'a [u8], full_column_indices: bool) -> Self {
        Self {
            ctl,
            pos: 0,
            row: 1,
            last_col: 1,
            full_column_indices,
        }
    }

    fn read_varint(&mut self) -> Result<u64, CsxError> {
        let mut cursor = Cursor::new(self.ctl);
        cursor.set_position(self.pos as u64);
        let val = leb128::decode_one::<u64>(&mut cursor)?;
        self.pos = cursor.position() as usize;
        Ok(val)
    }

    fn next_unit(&mut self, id_map: &[i32]) -> Result<Unit, CsxError> {
        if self.pos + 2 > self.ctl.len() {
            return Err(CsxError::EncodingOverflow(
                "unit header past the stream end".to_string(),
            ));
        }
        let flags = self.ctl[self.pos];
        let size = self.ctl[self.pos + 1] as usize;
        self.pos += 2;
        if size == 0 {
            return Err(CsxError::FormatError("zero-sized unit".to_string()));
        }

        let new_row = flags & CTL_NR != 0;
        let row_jump = if flags & CTL_RJMP != 0 {
            self.read_varint()?
        } else {
            0
        };
        if new_row {
            self.row += if row_jump != 0 { row_jump } else { 1 };
            self.last_col = 1;
        }

        let start_col = if self.full_column_indices {
            let ucol = fixed::read_aligned(self.ctl, &mut self.pos, 8)?;
            ucol + 1
        } else {
            self.last_col + self.read_varint()?
        };

        let flag = flags & CTL_FLAG_MASK;
        let mapped = id_map
            .get(flag as usize)
            .copied()
            .ok_or_else(|| CsxError::FormatError(format!("flag {} out of range", flag)))?;
        if mapped < 0 {
            return Err(CsxError::FormatError(format!(
                "flag {} has no pattern mapping",
                flag
            )));
        }
        let pattern_id = mapped as u64;

        let (cols, delta_bytes) = if let Some(width) = delta_bytes_of(pattern_id) {
            let mut cols = Vec::with_capacity(size);
            cols.push(start_col);
            let mut col = start_col;
            for _ in 1..size {
                col += fixed::read_aligned(self.ctl, &mut self.pos, width)?;
                cols.push(col);
            }
            self.last_col = col;
            (cols, Some(width))
        } else {
            let desc = PatternDescriptor::from_pattern_id(pattern_id, size)?;
            self.last_col = desc.last_col(start_col);
            (vec![start_col], None)
        };

        Ok(Unit {
            row: self.row,
            flag,
            size,
            new_row,
            row_jump,
            pattern_id,
            cols,
            delta_bytes,
        })
    }
}

/// Parses every unit header of the control stream, without touching values.
pub fn scan_units<V>(
    csx: &CsxMatrix<V>,
    full_column_indices: bool,
) -> Result<Vec<Unit>, CsxError> {
    let mut walker = CtlWalker::new(&csx.ctl, full_column_indices);
    let mut units = Vec::new();
    let mut consumed = 0u64;
    while consumed < csx.nnz {
        let unit = walker.next_unit(&csx.id_map)?;
        if unit.row > csx.nrows {
            return Err(CsxError::FormatError(format!(
                "unit anchored past row {} of {}",
                unit.row, csx.nrows
            )));
        }
        consumed += unit.size as u64;
        units.push(unit);
    }
    if consumed != csx.nnz {
        return Err(CsxError::FormatError(format!(
            "units cover {} nonzeros, expected {}",
            consumed, csx.nnz
        )));
    }
    Ok(units)
}

/// Reconstructs every nonzero as `(row, col, value)` with 1-based
/// partition-local rows, in control-stream emission order.
pub fn decode_elements<V: Copy>(
    csx: &CsxMatrix<V>,
    full_column_indices: bool,
) -> Result<Vec<(u64, u64, V)>, CsxError> {
    if csx.values.len() as u64 != csx.nnz {
        return Err(CsxError::FormatError(format!(
            "values array holds {} entries, expected {}",
            csx.values.len(),
            csx.nnz
        )));
    }
    let units = scan_units(csx, full_column_indices)?;
    let mut out = Vec::with_capacity(csx.nnz as usize);
    let mut values_idx = 0usize;
    for unit in &units {
        if unit.delta_bytes.is_some() {
            for &col in &unit.cols {
                out.push((unit.row, col, csx.values[values_idx]));
                values_idx += 1;
            }
        } else {
            let desc = PatternDescriptor::from_pattern_id(unit.pattern_id, unit.size)?;
            for i in 0..unit.size {
                let (r, c) = desc.element_coords(csx.nrows, unit.row, unit.cols[0], i);
                out.push((r, c, csx.values[values_idx]));
                values_idx += 1;
            }
        }
    }
    Ok(out)
}
