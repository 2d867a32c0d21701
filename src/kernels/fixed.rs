//! Fixed-width little-endian integer packing with natural alignment.
//!
//! Delta-list unit bodies pack their jumps at the smallest power-of-two byte
//! width that holds the largest jump. Writes align the output cursor up to a
//! multiple of that width (zero padding) so the runtime can use
//! natural-alignment loads; reads mirror the same rule.

use crate::error::CsxError;

/// Smallest width in bytes, one of {1, 2, 4, 8}, that holds `val`.
pub fn fit_width(val: u64) -> usize {
    if val <= u8::MAX as u64 {
        1
    } else if val <= u16::MAX as u64 {
        2
    } else if val <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

/// Appends `val` as `width` little-endian bytes, padding `buf` with zeros up
/// to a multiple of `width` first.
pub fn append_aligned(buf: &mut Vec<u8>, val: u64, width: usize) {
    let pad = (width - buf.len() % width) % width;
    buf.extend(std::iter::repeat(0u8).take(pad));
    buf.extend_from_slice(&val.to_le_bytes()[..width]);
}

/// Reads one `width`-byte little-endian integer at `*pos`, after advancing
/// `*pos` up to a multiple of `width`.
pub fn read_aligned(bytes: &[u8], pos: &mut usize, width: usize) -> Result<u64, CsxError> {
    let aligned = (*pos + width - 1) / width * width;
    let end = aligned + width;
    if end > bytes.len() {
        return Err(CsxError::EncodingOverflow(format!(
            "fixed-width read of {} bytes at offset {} past stream end {}",
            width,
            aligned,
            bytes.len()
        )));
    }
    let mut raw = [0u8; 8];
    raw[..width].copy_from_slice(&bytes[aligned..end]);
    *pos = end;
    Ok(u64::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_picks_the_smallest_power_of_two() {
        assert_eq!(fit_width(0), 1);
        assert_eq!(fit_width(255), 1);
        assert_eq!(fit_width(256), 2);
        assert_eq!(fit_width(65_535), 2);
        assert_eq!(fit_width(65_536), 4);
        assert_eq!(fit_width(u32::MAX as u64), 4);
        assert_eq!(fit_width(u32::MAX as u64 + 1), 8);
    }

    #[test]
    fn append_aligned_pads_to_the_write_width() {
        let mut buf = vec![0xAAu8]; // one byte already written
        append_aligned(&mut buf, 0x0102, 2);
        assert_eq!(buf, vec![0xAA, 0x00, 0x02, 0x01]);

        let mut buf = vec![0xAAu8, 0xBB, 0xCC];
        append_aligned(&mut buf, 7, 4);
        assert_eq!(buf, vec![0xAA, 0xBB, 0xCC, 0x00, 7, 0, 0, 0]);
    }

    #[test]
    fn aligned_writes_at_a_boundary_add_no_padding() {
        let mut buf = vec![1u8, 2];
        append_aligned(&mut buf, 0xFFFF, 2);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn read_aligned_mirrors_append_aligned() {
        for width in [1usize, 2, 4, 8] {
            let mut buf = vec![0x55u8]; // force misalignment for width > 1
            append_aligned(&mut buf, 1_000_000 % (1u64 << (8 * width.min(7))), width);
            let mut pos = 1usize;
            let val = read_aligned(&buf, &mut pos, width).unwrap();
            assert_eq!(val, 1_000_000 % (1u64 << (8 * width.min(7))));
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn read_past_end_is_an_overflow_error() {
        let buf = vec![0u8; 3];
        let mut pos = 0usize;
        assert!(matches!(
            read_aligned(&buf, &mut pos, 4),
            Err(CsxError::EncodingOverflow(_))
        ));
    }
}
