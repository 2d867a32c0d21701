//! The assembled CSX matrix image and its binary serialization.
//!
//! Per partition: the scalar header, the control stream, the values array,
//! the per-row metadata, and the flag-to-pattern-id map. The writer is
//! deterministic; the reader validates every declared length against the
//! buffer before allocating, and never panics on malformed input.

use bytemuck::Pod;

use crate::csx::ctl::CTL_PATTERNS_MAX;
use crate::error::CsxError;

/// Slots in the id map: one per assignable flag plus the `-1` terminator.
pub const ID_MAP_SIZE: usize = CTL_PATTERNS_MAX + 1;

/// Per-row metadata: where the row starts in the control stream and the
/// values array, and how far below itself any pattern anchored in it
/// reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowInfo {
    pub ctl_offset: u64,
    pub value_offset: u64,
    pub span: u64,
}

/// One partition in CSX form.
#[derive(Debug, Clone, PartialEq)]
pub struct CsxMatrix<V> {
    pub nnz: u64,
    pub nrows: u64,
    pub ncols: u64,
    pub row_start: u64,
    pub row_jumps: bool,
    pub ctl: Vec<u8>,
    pub values: Vec<V>,
    pub rows_info: Vec<RowInfo>,
    pub id_map: [i32; ID_MAP_SIZE],
}

impl<V: Pod> CsxMatrix<V> {
    /// Serializes the matrix into the canonical little-endian image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let value_bytes: &[u8] = bytemuck::cast_slice(&self.values);
        let total = 8 * 4
            + 1
            + 8
            + self.ctl.len()
            + value_bytes.len()
            + self.rows_info.len() * 24
            + ID_MAP_SIZE * 4;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&self.nnz.to_le_bytes());
        out.extend_from_slice(&self.nrows.to_le_bytes());
        out.extend_from_slice(&self.ncols.to_le_bytes());
        out.extend_from_slice(&self.row_start.to_le_bytes());
        out.push(self.row_jumps as u8);
        out.extend_from_slice(&(self.ctl.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.ctl);
        out.extend_from_slice(value_bytes);
        for info in &self.rows_info {
            out.extend_from_slice(&info.ctl_offset.to_le_bytes());
            out.extend_from_slice(&info.value_offset.to_le_bytes());
            out.extend_from_slice(&info.span.to_le_bytes());
        }
        for id in &self.id_map {
            out.extend_from_slice(&id.to_le_bytes());
        }
        out
    }

    /// Deserializes a matrix image produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CsxError> {
        let mut pos = 0usize;
        let nnz = read_u64(bytes, &mut pos)?;
        let nrows = read_u64(bytes, &mut pos)?;
        let ncols = read_u64(bytes, &mut pos)?;
        let row_start = read_u64(bytes, &mut pos)?;
        let row_jumps = match read_u8(bytes, &mut pos)? {
            0 => false,
            1 => true,
            other => {
                return Err(CsxError::FormatError(format!(
                    "row_jumps byte must be 0 or 1, got {}",
                    other
                )))
            }
        };
        let ctl_size = read_u64(bytes, &mut pos)? as usize;

        let value_size = std::mem::size_of::<V>();
        let tail = ctl_size
            .checked_add((nnz as usize).checked_mul(value_size).ok_or_else(overflow)?)
            .and_then(|n| n.checked_add((nrows as usize).checked_mul(24)?))
            .and_then(|n| n.checked_add(ID_MAP_SIZE * 4))
            .ok_or_else(overflow)?;
        if bytes.len() != pos + tail {
            return Err(CsxError::FormatError(format!(
                "image length {} does not match declared sizes ({})",
                bytes.len(),
                pos + tail
            )));
        }

        let ctl = bytes[pos..pos + ctl_size].to_vec();
        pos += ctl_size;

        let mut values = Vec::with_capacity(nnz as usize);
        for _ in 0..nnz {
            values.push(bytemuck::pod_read_unaligned(&bytes[pos..pos + value_size]));
            pos += value_size;
        }

        let mut rows_info = Vec::with_capacity(nrows as usize);
        for _ in 0..nrows {
            rows_info.push(RowInfo {
                ctl_offset: read_u64(bytes, &mut pos)?,
                value_offset: read_u64(bytes, &mut pos)?,
                span: read_u64(bytes, &mut pos)?,
            });
        }

        let mut id_map = [0i32; ID_MAP_SIZE];
        for slot in id_map.iter_mut() {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[pos..pos + 4]);
            *slot = i32::from_le_bytes(raw);
            pos += 4;
        }

        Ok(Self {
            nnz,
            nrows,
            ncols,
            row_start,
            row_jumps,
            ctl,
            values,
            rows_info,
            id_map,
        })
    }
}

/// A symmetric matrix in CSX form: the dense main diagonal followed by the
/// lower triangle as a normal CSX image.
#[derive(Debug, Clone, PartialEq)]
pub struct CsxSymMatrix<V> {
    pub dvalues: Vec<V>,
    pub lower: CsxMatrix<V>,
}

impl<V: Pod> CsxSymMatrix<V> {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.dvalues.len() as u64).to_le_bytes());
        out.extend_from_slice(bytemuck::cast_slice(&self.dvalues));
        out.extend_from_slice(&self.lower.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CsxError> {
        let mut pos = 0usize;
        let diagonal_size = read_u64(bytes, &mut pos)? as usize;
        let value_size = std::mem::size_of::<V>();
        let dvalues_len = diagonal_size.checked_mul(value_size).ok_or_else(overflow)?;
        if bytes.len() < pos + dvalues_len {
            return Err(CsxError::FormatError(
                "diagonal values exceed the image".to_string(),
            ));
        }
        let mut dvalues = Vec::with_capacity(diagonal_size);
        for _ in 0..diagonal_size {
            dvalues.push(bytemuck::pod_read_unaligned(&bytes[pos..pos + value_size]));
            pos += value_size;
        }
        let lower = CsxMatrix::from_bytes(&bytes[pos..])?;
        Ok(Self { dvalues, lower })
    }
}

fn overflow() -> CsxError {
    CsxError::FormatError("declared sizes overflow".to_string())
}

fn read_u64(bytes: &[u8], pos: &mut usize) -> Result<u64, CsxError> {
    let end = *pos + 8;
    if end > bytes.len() {
        return Err(CsxError::FormatError("truncated image".to_string()));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[*pos..end]);
    *pos = end;
    Ok(u64::from_le_bytes(raw))
}

fn read_u8(bytes: &[u8], pos: &mut usize) -> Result<u8, CsxError> {
    let byte = *bytes
        .get(*pos)
        .ok_or_else(|| CsxError::FormatError("truncated image".to_string()))?;
    *pos += 1;
    Ok(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsxMatrix<f64> {
        let mut id_map = [-1i32; ID_MAP_SIZE];
        id_map[0] = 1;
        id_map[1] = 9001;
        CsxMatrix {
            nnz: 3,
            nrows: 2,
            ncols: 4,
            row_start: 0,
            row_jumps: false,
            ctl: vec![0, 3, 0, 2, 1],
            values: vec![1.0, 2.0, 3.0],
            rows_info: vec![
                RowInfo { ctl_offset: 0, value_offset: 0, span: 0 },
                RowInfo { ctl_offset: 5, value_offset: 3, span: 0 },
            ],
            id_map,
        }
    }

    #[test]
    fn image_roundtrips() {
        let m = sample();
        let bytes = m.to_bytes();
        let back = CsxMatrix::<f64>::from_bytes(&bytes).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn serialization_is_deterministic() {
        assert_eq!(sample().to_bytes(), sample().to_bytes());
    }

    #[test]
    fn truncated_images_are_rejected() {
        let bytes = sample().to_bytes();
        for cut in [0, 10, 33, bytes.len() - 1] {
            assert!(matches!(
                CsxMatrix::<f64>::from_bytes(&bytes[..cut]),
                Err(CsxError::FormatError(_))
            ));
        }
    }

    #[test]
    fn inflated_declared_sizes_are_rejected() {
        let mut bytes = sample().to_bytes();
        // Inflate nnz; the total no longer matches the buffer.
        bytes[0] = 200;
        assert!(matches!(
            CsxMatrix::<f64>::from_bytes(&bytes),
            Err(CsxError::FormatError(_))
        ));
    }

    #[test]
    fn bad_row_jumps_byte_is_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[32] = 7;
        assert!(matches!(
            CsxMatrix::<f64>::from_bytes(&bytes),
            Err(CsxError::FormatError(_))
        ));
    }

    #[test]
    fn symmetric_wrapper_roundtrips() {
        let sym = CsxSymMatrix { dvalues: vec![4.0, 0.0, 6.0], lower: sample() };
        let bytes = sym.to_bytes();
        let back = CsxSymMatrix::<f64>::from_bytes(&bytes).unwrap();
        assert_eq!(back, sym);
    }
}
