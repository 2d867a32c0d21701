//! Delta encoding and run-length encoding over integer sequences.
//!
//! The analyzer works on the first differences of sorted column sequences:
//! a geometric run shows up as a run of identical deltas. The first element
//! of a delta sequence keeps its absolute value, so the leading run doubles
//! as the distance from the sweep origin.

use num_traits::PrimInt;

/// One run of identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run<T> {
    pub val: T,
    pub freq: u64,
}

/// First differences of `xs`; the first element is kept as-is.
pub fn deltas<T: PrimInt>(xs: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(xs.len());
    let mut prev = T::zero();
    for &x in xs {
        out.push(x - prev);
        prev = x;
    }
    out
}

/// In-place delta encoding against an external predecessor `x0`.
///
/// After the call, `xs[0]` holds the jump from `x0` and every later slot the
/// jump from its original predecessor.
pub fn delta_encode_in_place<T: PrimInt>(xs: &mut [T], x0: T) {
    let mut prev = x0;
    for x in xs.iter_mut() {
        let tmp = *x;
        *x = *x - prev;
        prev = tmp;
    }
}

/// Run-length encoding of `input`.
pub fn rle<T: Copy + PartialEq>(input: &[T]) -> Vec<Run<T>> {
    let mut out = Vec::new();
    let Some(&first) = input.first() else {
        return out;
    };
    let mut run = Run { val: first, freq: 1 };
    for &curr in &input[1..] {
        if curr == run.val {
            run.freq += 1;
        } else {
            out.push(run);
            run = Run { val: curr, freq: 1 };
        }
    }
    out.push(run);
    out
}

/// Run-length encoding of the first differences of `xs`.
pub fn delta_rle<T: PrimInt>(xs: &[T]) -> Vec<Run<T>> {
    rle(&deltas(xs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_keep_the_first_element_absolute() {
        assert_eq!(deltas(&[3u64, 5, 7, 11]), vec![3, 2, 2, 4]);
        assert_eq!(deltas::<u64>(&[]), Vec::<u64>::new());
    }

    #[test]
    fn delta_encode_in_place_uses_external_origin() {
        let mut xs = vec![4u64, 6, 9];
        delta_encode_in_place(&mut xs, 1);
        assert_eq!(xs, vec![3, 2, 3]);
    }

    #[test]
    fn rle_collapses_runs() {
        let runs = rle(&[5u64, 5, 5, 8, 8, 2]);
        assert_eq!(
            runs,
            vec![
                Run { val: 5, freq: 3 },
                Run { val: 8, freq: 2 },
                Run { val: 2, freq: 1 },
            ]
        );
    }

    #[test]
    fn rle_of_empty_is_empty() {
        assert!(rle::<u64>(&[]).is_empty());
    }

    #[test]
    fn delta_rle_merges_origin_into_leading_run() {
        // cols 1..=5: the absolute first column equals the common delta, so
        // the whole sequence is one run.
        let runs = delta_rle(&[1u64, 2, 3, 4, 5]);
        assert_eq!(runs, vec![Run { val: 1, freq: 5 }]);

        // cols {1,3,5,9,10}: leading 1, two 2s, a 4, a 1.
        let runs = delta_rle(&[1u64, 3, 5, 9, 10]);
        assert_eq!(
            runs,
            vec![
                Run { val: 1, freq: 1 },
                Run { val: 2, freq: 2 },
                Run { val: 4, freq: 1 },
                Run { val: 1, freq: 1 },
            ]
        );
    }
}
