//! The append-only control-stream builder.
//!
//! A unit starts with two bytes, flags and size. The flags byte carries the
//! 6-bit pattern flag plus the new-row and row-jump markers; the optional
//! row-jump varint and the unit's leading column reference follow. Delta
//! bodies are appended as aligned fixed-width integers so the runtime can
//! decode the stream with natural-alignment loads in one forward sweep.

use crate::error::CsxError;
use crate::kernels::{fixed, leb128};

/// New-row marker, bit 6 of the flags byte.
pub const CTL_NR: u8 = 1 << 6;
/// Row-jump marker, bit 7 of the flags byte.
pub const CTL_RJMP: u8 = 1 << 7;
/// Mask of the pattern flag inside the flags byte.
pub const CTL_FLAG_MASK: u8 = CTL_NR - 1;
/// Largest number of nonzeros one unit may cover.
pub const CTL_SIZE_MAX: usize = 255;
/// Largest number of distinct patterns a partition may map to flags; one
/// slot of the id map is reserved for the terminator.
pub const CTL_PATTERNS_MAX: usize = 63;

pub struct CtlBuilder {
    buf: Vec<u8>,
}

impl CtlBuilder {
    /// `capacity_hint` is a greedy first allocation; six bytes per nonzero
    /// covers typical streams without reallocating.
    pub fn new(capacity_hint: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity_hint),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends one unit header: the flags/size byte pair, the row-jump
    /// varint when crossing empty rows, and the leading column reference
    /// (varint by default, fixed-width absolute under full column indices).
    #[allow(clippy::too_many_arguments)]
    pub fn append_ctl_head(
        &mut self,
        new_row: bool,
        row_jump: u64,
        flag: u8,
        size: usize,
        ucol: u64,
        index_width: usize,
        full_indices: bool,
    ) -> Result<(), CsxError> {
        if size == 0 || size > CTL_SIZE_MAX {
            return Err(CsxError::FormatError(format!(
                "unit size {} outside 1..={}",
                size, CTL_SIZE_MAX
            )));
        }
        if flag & !CTL_FLAG_MASK != 0 {
            return Err(CsxError::FormatError(format!(
                "pattern flag {} does not fit six bits",
                flag
            )));
        }
        let mut flags = flag;
        if new_row {
            flags |= CTL_NR;
        }
        if row_jump != 0 {
            flags |= CTL_RJMP;
        }
        self.buf.push(flags);
        self.buf.push(size as u8);
        if row_jump != 0 {
            leb128::encode_one(row_jump, &mut self.buf);
        }
        if full_indices {
            fixed::append_aligned(&mut self.buf, ucol, index_width);
        } else {
            leb128::encode_one(ucol, &mut self.buf);
        }
        Ok(())
    }

    /// Appends one body integer at the given width, aligned.
    pub fn append_fixed(&mut self, val: u64, width: usize) {
        fixed::append_aligned(&mut self.buf, val, width);
    }

    pub fn finalize(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_head_is_two_bytes_plus_a_varint() {
        let mut bld = CtlBuilder::new(16);
        bld.append_ctl_head(false, 0, 3, 10, 5, 8, false).unwrap();
        assert_eq!(bld.finalize(), vec![3, 10, 5]);
    }

    #[test]
    fn new_row_and_row_jump_set_their_bits() {
        let mut bld = CtlBuilder::new(16);
        bld.append_ctl_head(true, 3, 0, 1, 0, 8, false).unwrap();
        let bytes = bld.finalize();
        assert_eq!(bytes[0], CTL_NR | CTL_RJMP);
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes[2], 3); // row jump varint
        assert_eq!(bytes[3], 0); // column varint
    }

    #[test]
    fn full_indices_write_a_fixed_width_column() {
        let mut bld = CtlBuilder::new(16);
        bld.append_ctl_head(false, 0, 1, 2, 300, 8, true).unwrap();
        let bytes = bld.finalize();
        // 2 header bytes, then padding to the 8-byte boundary, then 300 LE.
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..2], &[1, 2]);
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 300);
    }

    #[test]
    fn body_deltas_align_to_their_width() {
        let mut bld = CtlBuilder::new(16);
        bld.append_ctl_head(false, 0, 0, 3, 1, 8, false).unwrap();
        assert_eq!(bld.len(), 3);
        bld.append_fixed(700, 2);
        bld.append_fixed(900, 2);
        let bytes = bld.finalize();
        assert_eq!(bytes.len(), 8); // one pad byte before the first u16
        assert_eq!(u16::from_le_bytes(bytes[4..6].try_into().unwrap()), 700);
        assert_eq!(u16::from_le_bytes(bytes[6..8].try_into().unwrap()), 900);
    }

    #[test]
    fn oversized_units_and_flags_are_rejected() {
        let mut bld = CtlBuilder::new(16);
        assert!(bld.append_ctl_head(false, 0, 0, 256, 0, 8, false).is_err());
        assert!(bld.append_ctl_head(false, 0, 64, 1, 0, 8, false).is_err());
        assert!(bld.append_ctl_head(false, 0, 0, 0, 0, 8, false).is_err());
    }
}
