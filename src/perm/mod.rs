//! Row permutations.
//!
//! A permutation is stored as a pair of arrays: `forward[i]` is the new position of row `i`, and
//! `inverse[i]` is the row that ends up at position `i`. Permuting the rows of a matrix `src`
//! therefore produces `dst[i] = src[inverse[i]]`.
//!
//! Pivoted factorizations record their row interchanges as a *pivot sequence*, where entry `k`
//! is the row that was swapped with row `k` at step `k`. [`pivots_to_perm`] converts such a
//! sequence into an explicit permutation that can be applied to several operands at once.

use crate::{assert, mat::*};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

mod permown;
mod permref;

pub use permown::Perm;
pub use permref::PermRef;

/// Converts a pivot sequence into an explicit permutation, stored in `forward` and `inverse`.
///
/// The swaps `pivots[0] <-> 0`, `pivots[1] <-> 1`, ... are replayed in order on the identity.
///
/// # Panics
///
/// Panics if `forward` and `inverse` don't have the same length, if there are more pivots than
/// rows, or if a pivot is out of bounds.
///
/// # Example
///
/// ```
/// use gridla::perm::pivots_to_perm;
///
/// let mut forward = [0usize; 3];
/// let mut inverse = [0usize; 3];
/// let perm = pivots_to_perm(&[2, 2], &mut forward, &mut inverse);
///
/// // row 2 moves to the top, then the old row 0 (now in slot 2) is swapped with slot 1
/// assert_eq!(perm.arrays().1, &[2, 0, 1]);
/// assert_eq!(perm.arrays().0, &[1, 2, 0]);
/// ```
#[track_caller]
pub fn pivots_to_perm<'out>(
    pivots: &[usize],
    forward: &'out mut [usize],
    inverse: &'out mut [usize],
) -> PermRef<'out> {
    let n = forward.len();
    assert!(all(inverse.len() == n, pivots.len() <= n));

    for (i, p) in inverse.iter_mut().enumerate() {
        *p = i;
    }
    for (k, &piv) in pivots.iter().enumerate() {
        assert!(piv < n);
        inverse.swap(k, piv);
    }
    for (i, &p) in inverse.iter().enumerate() {
        forward[p] = i;
    }

    PermRef {
        forward,
        inverse,
    }
}

/// Computes a permutation of the rows of the source matrix using the given permutation, and
/// stores the result in the destination matrix.
///
/// # Panics
///
/// - Panics if the matrices do not have the same shape.
/// - Panics if the size of the permutation doesn't match the number of rows of the matrices.
#[inline]
#[track_caller]
pub fn permute_rows<E: Copy>(dst: MatMut<'_, E>, src: MatRef<'_, E>, perm: PermRef<'_>) {
    assert!(all(
        src.nrows() == dst.nrows(),
        src.ncols() == dst.ncols(),
        perm.len() == src.nrows(),
    ));

    let mut dst = dst;
    let inverse = perm.inverse;
    for j in 0..src.ncols() {
        for (i, &s) in inverse.iter().enumerate() {
            unsafe { dst.write_unchecked(i, j, src.read_unchecked(s, j)) };
        }
    }
}

/// Computes the size and alignment of required workspace for applying a row permutation to a
/// matrix in place.
pub fn permute_rows_in_place_req(nrows: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<u8>(nrows)
}

// follows every cycle of `inverse` that goes through one of `starts`. `slot` maps a moved row to
// its entry in `visited`.
fn follow_cycles<E: Copy>(
    matrix: MatMut<'_, E>,
    inverse: &[usize],
    starts: impl Iterator<Item = usize>,
    visited: &mut [u8],
    slot: impl Fn(usize) -> usize,
) {
    let mut matrix = matrix;
    for start in starts {
        if inverse[start] == start || visited[slot(start)] != 0 {
            continue;
        }

        let mut i = start;
        loop {
            visited[slot(i)] = 1;
            i = inverse[i];
            if i == start {
                break;
            }
        }

        for j in 0..matrix.ncols() {
            let tmp = matrix.read(start, j);
            let mut i = start;
            loop {
                let s = inverse[i];
                if s == start {
                    matrix.write(i, j, tmp);
                    break;
                }
                let v = matrix.read(s, j);
                matrix.write(i, j, v);
                i = s;
            }
        }
    }
}

/// Computes a permutation of the rows of the matrix using the given permutation, and
/// stores the result in the same matrix.
///
/// Each cycle of the permutation is followed with a single temporary value per column.
///
/// # Panics
///
/// - Panics if the size of the permutation doesn't match the number of rows of the matrix.
/// - Panics if the provided memory in `stack` is insufficient (see
///   [`permute_rows_in_place_req`]).
#[track_caller]
pub fn permute_rows_in_place<E: Copy>(matrix: MatMut<'_, E>, perm: PermRef<'_>, stack: PodStack<'_>) {
    let n = matrix.nrows();
    assert!(perm.len() == n);

    let (visited, _) = stack.make_with(n, |_| 0u8);
    follow_cycles(matrix, perm.inverse, 0..n, visited, |i| i);
}

/// Writes the sorted, deduplicated set of slots a pivot sequence touches into `touched`, and
/// returns its length. `touched` must hold at least `2 * pivots.len()` entries.
pub(crate) fn touched_slots(pivots: &[usize], touched: &mut [usize]) -> usize {
    let len = 2 * pivots.len();
    let touched = &mut touched[..len];
    for (k, &p) in pivots.iter().enumerate() {
        touched[2 * k] = k;
        touched[2 * k + 1] = p;
    }
    touched.sort_unstable();

    let mut count = 0;
    for i in 0..len {
        if count == 0 || touched[i] != touched[count - 1] {
            touched[count] = touched[i];
            count += 1;
        }
    }
    count
}

/// Same as [`pivots_to_perm`], for `forward` and `inverse` that already hold the identity.
///
/// Only the `touched` slots (see [`touched_slots`]) are written, so the cost is proportional to
/// the number of pivots instead of the length of the permutation. [`reset_touched`] restores the
/// identity afterwards.
pub(crate) fn pivots_to_perm_from_identity<'out>(
    pivots: &[usize],
    touched: &[usize],
    forward: &'out mut [usize],
    inverse: &'out mut [usize],
) -> PermRef<'out> {
    let n = forward.len();
    assert!(all(inverse.len() == n, pivots.len() <= n));

    for (k, &piv) in pivots.iter().enumerate() {
        assert!(piv < n);
        inverse.swap(k, piv);
    }
    for &i in touched {
        forward[inverse[i]] = i;
    }

    PermRef {
        forward,
        inverse,
    }
}

/// Restores the identity on the `touched` slots of `forward` and `inverse`.
pub(crate) fn reset_touched(touched: &[usize], forward: &mut [usize], inverse: &mut [usize]) {
    for &i in touched {
        forward[i] = i;
        inverse[i] = i;
    }
}

/// Computes the size and alignment of required workspace for [`permute_touched_rows_in_place`].
pub(crate) fn permute_touched_rows_in_place_req(
    ntouched: usize,
) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<u8>(ntouched)
}

/// Same as [`permute_rows_in_place`], for a permutation that only moves the sorted `touched`
/// rows. Rows outside of `touched` are not visited.
#[track_caller]
pub(crate) fn permute_touched_rows_in_place<E: Copy>(
    matrix: MatMut<'_, E>,
    perm: PermRef<'_>,
    touched: &[usize],
    stack: PodStack<'_>,
) {
    assert!(perm.len() == matrix.nrows());

    let (visited, _) = stack.make_with(touched.len(), |_| 0u8);
    follow_cycles(
        matrix,
        perm.inverse,
        touched.iter().copied(),
        visited,
        |i| touched.partition_point(|&t| t < i),
    );
}

/// Permutes the entries of `values` in place, so that the new `values[i]` is the old
/// `values[inverse[i]]`.
///
/// # Panics
///
/// Same as [`permute_rows_in_place`].
#[track_caller]
pub fn permute_in_place<T: Copy>(values: &mut [T], perm: PermRef<'_>, stack: PodStack<'_>) {
    let n = values.len();
    permute_rows_in_place(from_column_major_slice_mut(values, n, 1), perm, stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat, Mat};
    use dyn_stack::GlobalPodBuffer;
    use rand::prelude::*;

    macro_rules! make_stack {
        ($req: expr) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    #[test]
    fn pivots_to_perm_matches_sequential_swaps() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in [1, 2, 5, 13] {
            for npiv in [0, 1, n / 2, n] {
                let pivots: Vec<usize> = (0..npiv).map(|k| rng.gen_range(k..n)).collect();

                let mut rows: Vec<usize> = (0..n).collect();
                for (k, &p) in pivots.iter().enumerate() {
                    rows.swap(k, p);
                }

                let mut fwd = vec![0; n];
                let mut inv = vec![0; n];
                let perm = pivots_to_perm(&pivots, &mut fwd, &mut inv);
                let (fwd, inv) = perm.arrays();
                assert!(inv == &*rows);
                PermRef::new_checked(fwd, inv);
            }
        }
    }

    #[test]
    fn in_place_matches_out_of_place() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = 9;
        let mut forward: Vec<usize> = (0..n).collect();
        forward.shuffle(&mut rng);
        let perm = Perm::from_forward(forward.into_boxed_slice());

        let src = Mat::from_fn(n, 3, |i, j| (10 * i + j) as f64);
        let mut expected = Mat::<f64>::zeros(n, 3);
        permute_rows(expected.as_mut(), src.as_ref(), perm.as_ref());
        for i in 0..n {
            assert!(expected.read(perm.as_ref().arrays().0[i], 0) == src.read(i, 0));
        }

        let mut actual = src.clone();
        permute_rows_in_place(
            actual.as_mut(),
            perm.as_ref(),
            make_stack!(permute_rows_in_place_req(n)),
        );
        assert!(actual == expected);

        // strided, reversed view
        let mut actual = src.clone();
        let mut expected_rev = src.clone();
        permute_rows(
            expected_rev.as_mut().reverse_rows_mut(),
            src.as_ref().reverse_rows(),
            perm.as_ref(),
        );
        permute_rows_in_place(
            actual.as_mut().reverse_rows_mut(),
            perm.as_ref(),
            make_stack!(permute_rows_in_place_req(n)),
        );
        assert!(actual == expected_rev);
    }

    #[test]
    fn round_trip_is_exact() {
        let mut fwd = [0usize; 4];
        let mut inv = [0usize; 4];
        let perm = pivots_to_perm(&[3, 2, 3], &mut fwd, &mut inv);

        let x = mat![[1.5, -2.0], [0.25, 3.0], [7.0, 8.0], [-1.0, 1e-300f64]];
        let mut y = Mat::<f64>::zeros(4, 2);
        let mut z = Mat::<f64>::zeros(4, 2);
        permute_rows(y.as_mut(), x.as_ref(), perm);
        permute_rows(z.as_mut(), y.as_ref(), perm.inverse());
        assert!(z == x);
    }

    #[test]
    fn permute_index_vector() {
        let mut fwd = [0usize; 3];
        let mut inv = [0usize; 3];
        let perm = pivots_to_perm(&[1], &mut fwd, &mut inv);
        let mut values = [10usize, 11, 12];
        let mut mem = GlobalPodBuffer::new(permute_rows_in_place_req(3).unwrap());
        permute_in_place(&mut values, perm, PodStack::new(&mut mem));
        assert!(values == [11, 10, 12]);
    }

    #[test]
    fn touched_slots_are_sorted_and_unique() {
        let mut touched = [0usize; 8];
        let len = touched_slots(&[5, 1, 5, 3], &mut touched);
        assert!(&touched[..len] == &[0, 1, 2, 3, 5]);
        assert!(touched_slots(&[], &mut touched) == 0);
    }

    #[test]
    fn identity_based_conversion_matches_full_conversion() {
        let mut rng = StdRng::seed_from_u64(2);
        let n = 40;
        let mut fwd_id: Vec<usize> = (0..n).collect();
        let mut inv_id: Vec<usize> = (0..n).collect();
        let mut touched = vec![0usize; 2 * n];

        for npiv in [0, 1, 4, 17] {
            let pivots: Vec<usize> = (0..npiv).map(|k| rng.gen_range(k..n)).collect();

            let mut fwd = vec![0; n];
            let mut inv = vec![0; n];
            let expected = pivots_to_perm(&pivots, &mut fwd, &mut inv);

            let len = touched_slots(&pivots, &mut touched);
            let touched = &touched[..len];
            let actual = pivots_to_perm_from_identity(&pivots, touched, &mut fwd_id, &mut inv_id);
            assert!(actual.arrays() == expected.arrays());

            let src = Mat::from_fn(n, 2, |i, j| (3 * i + j) as f64);
            let mut by_cycles = src.clone();
            permute_rows_in_place(
                by_cycles.as_mut(),
                expected,
                make_stack!(permute_rows_in_place_req(n)),
            );
            let mut by_touched = src.clone();
            permute_touched_rows_in_place(
                by_touched.as_mut(),
                actual,
                touched,
                make_stack!(permute_touched_rows_in_place_req(touched.len())),
            );
            assert!(by_touched == by_cycles);

            reset_touched(touched, &mut fwd_id, &mut inv_id);
            assert!(fwd_id.iter().enumerate().all(|(i, &f)| f == i));
            assert!(inv_id.iter().enumerate().all(|(i, &v)| v == i));
        }
    }

    #[test]
    fn identity() {
        let p = Perm::identity(4);
        let (fwd, inv) = p.as_ref().arrays();
        assert!(all(fwd == &[0, 1, 2, 3], inv == &[0, 1, 2, 3]));
        let q = p.clone().inverse();
        assert!(q == p);
    }
}
