//! The LU decomposition of a matrix $A$ is such that:
//! $$PA = LU,$$
//! where $P$ is a permutation matrix, $L$ is a unit lower triangular matrix, and $U$ is an upper
//! triangular matrix. Without pivoting, $P$ is the identity.
//!
//! Both variants are computed with the same right-looking blocked algorithm: the current panel
//! of `blocksize` columns is factored with an unblocked kernel, the row interchanges it chose are
//! applied to the rest of the matrix, the matching block row of $U$ is obtained with a triangular
//! solve, and the trailing matrix receives a rank-`blocksize` update.
//!
//! The full pivoting variant in [`full_pivoting`] is unblocked: every step searches the whole
//! trailing matrix for its pivot, and interchanges both rows and columns.
//!
//! A zero pivot is not reported as an error: the factorization runs to completion and the
//! non-finite values it produces propagate through the factors.

use crate::{
    linalg::{matmul::matmul, triangular_solve::solve_unit_lower_triangular_in_place},
    mat::from_column_major_slice_mut,
    perm::{
        permute_touched_rows_in_place, permute_touched_rows_in_place_req,
        pivots_to_perm_from_identity, reset_touched, touched_slots,
    },
    ComplexField, Error, MatMut, Parallelism, Result,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

pub mod full_pivoting;
pub mod no_pivoting;
pub mod partial_pivoting;

/// LU factorization tuning parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LuParams {
    /// Number of columns factored by the unblocked kernel before the trailing matrix is updated.
    /// Must be positive.
    pub blocksize: usize,
}

impl Default for LuParams {
    #[inline]
    fn default() -> Self {
        Self { blocksize: 128 }
    }
}

impl LuParams {
    pub(crate) fn check(self, op: &'static str) -> Result<()> {
        if self.blocksize == 0 {
            return Err(Error::InvalidParameter {
                op,
                reason: "block size must be positive",
            });
        }
        Ok(())
    }
}

/// Factors `panel` in place with the unblocked algorithm.
///
/// When `pivots` is provided, the row with the largest [`ComplexField::score`] on or below the
/// diagonal is swapped into the pivot position at each step (the first such row on ties), and
/// its index is recorded in `pivots[k]`. Returns the number of actual row swaps.
pub(crate) fn lu_panel_in_place<E: ComplexField>(
    panel: MatMut<'_, E>,
    pivots: Option<&mut [usize]>,
) -> usize {
    let mut panel = panel;
    let mut pivots = pivots;
    let m = panel.nrows();
    let n = panel.ncols();
    let size = Ord::min(m, n);

    let mut n_transpositions = 0;
    for k in 0..size {
        if let Some(pivots) = pivots.as_deref_mut() {
            let mut imax = k;
            let mut max = panel.read(k, k).score();
            for i in k + 1..m {
                let score = panel.read(i, k).score();
                if score > max {
                    max = score;
                    imax = i;
                }
            }

            pivots[k] = imax;
            if imax != k {
                n_transpositions += 1;
                panel.swap_rows(k, imax);
            }
        }

        let inv = panel.read(k, k).inv();
        for i in k + 1..m {
            let v = panel.read(i, k);
            panel.write(i, k, v * inv);
        }

        for j in k + 1..n {
            let u = panel.read(k, j);
            for i in k + 1..m {
                let l = panel.read(i, k);
                let v = panel.read(i, j);
                panel.write(i, j, v - l * u);
            }
        }
    }

    n_transpositions
}

pub(crate) fn lu_blocked_req(
    m: usize,
    n: usize,
    blocksize: usize,
    pivoting: bool,
) -> Result<StackReq, SizeOverflow> {
    if !pivoting {
        return Ok(StackReq::empty());
    }
    let bs = Ord::min(blocksize, Ord::min(m, n));
    StackReq::try_all_of([
        StackReq::try_new::<usize>(m)?,
        StackReq::try_new::<usize>(m)?,
        StackReq::try_new::<usize>(bs)?,
        StackReq::try_new::<usize>(2 * bs)?,
        permute_touched_rows_in_place_req(2 * bs)?,
    ])
}

/// Blocked right-looking LU, shared by both variants. When `preimage` is provided, partial
/// pivoting is enabled and `preimage` is permuted along with the rows of the matrix.
///
/// The permutation arrays are allocated once and kept equal to the identity between blocks, so
/// each block only touches the rows its pivots name.
pub(crate) fn lu_blocked_in_place<E: ComplexField>(
    matrix: MatMut<'_, E>,
    preimage: Option<&mut [usize]>,
    blocksize: usize,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> usize {
    let mut matrix = matrix;
    let mut preimage = preimage;

    let m = matrix.nrows();
    let n = matrix.ncols();
    let size = Ord::min(m, n);

    let (mut identity, mut stack) = match preimage {
        Some(_) => {
            let (forward, stack) = stack.make_with(m, |i| i);
            let (inverse, stack) = stack.make_with(m, |i| i);
            (Some((forward, inverse)), stack)
        }
        None => (None, stack),
    };

    let mut n_transpositions = 0;
    let mut k = 0;
    while k < size {
        let nb = Ord::min(blocksize, size - k);

        match (preimage.as_deref_mut(), identity.as_mut()) {
            (Some(preimage), Some((forward, inverse))) => {
                let (pivots, stack) = stack.rb_mut().make_with(nb, |_| 0usize);
                n_transpositions += lu_panel_in_place(
                    matrix.rb_mut().submatrix_mut(k, k, m - k, nb),
                    Some(&mut *pivots),
                );

                let (touched, mut stack) = stack.make_with(2 * nb, |_| 0usize);
                let len = touched_slots(pivots, touched);
                let touched = &touched[..len];
                let perm = pivots_to_perm_from_identity(
                    pivots,
                    touched,
                    &mut forward[..m - k],
                    &mut inverse[..m - k],
                );

                let (left, right) = matrix.rb_mut().subrows_mut(k, m - k).split_at_col_mut(k);
                let right = right.subcols_mut(nb, n - k - nb);
                permute_touched_rows_in_place(left, perm, touched, stack.rb_mut());
                permute_touched_rows_in_place(right, perm, touched, stack.rb_mut());
                permute_touched_rows_in_place(
                    from_column_major_slice_mut(&mut preimage[k..], m - k, 1),
                    perm,
                    touched,
                    stack.rb_mut(),
                );
                reset_touched(touched, forward, inverse);
            }
            _ => {
                lu_panel_in_place(matrix.rb_mut().submatrix_mut(k, k, m - k, nb), None);
            }
        }

        let (a11, mut a12, a21, a22) = matrix
            .rb_mut()
            .submatrix_mut(k, k, m - k, n - k)
            .split_at_mut(nb, nb);
        solve_unit_lower_triangular_in_place(a11.rb(), a12.rb_mut(), parallelism);
        matmul(
            a22,
            a21.rb(),
            a12.rb(),
            Some(E::one()),
            -E::one(),
            parallelism,
        );

        k += nb;
    }

    n_transpositions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat};

    #[test]
    fn panel_picks_first_largest() {
        let mut a = mat![[1.0, 0.0], [-3.0, 1.0], [3.0, 2.0f64]];
        let mut pivots = [0usize; 2];
        let n = lu_panel_in_place(a.as_mut(), Some(&mut pivots));
        assert!(pivots[0] == 1);
        assert!(a.read(0, 0) == -3.0);
        assert!(n >= 1);
    }

    #[test]
    fn panel_without_pivoting_keeps_rows() {
        let mut a = mat![[2.0, 1.0], [4.0, 3.0f64]];
        let n = lu_panel_in_place(a.as_mut(), None);
        assert!(n == 0);
        assert!(all(a.read(0, 0) == 2.0, a.read(1, 0) == 2.0, a.read(1, 1) == 1.0));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        assert!(LuParams { blocksize: 0 }.check("test").is_err());
        assert!(LuParams::default().check("test").is_ok());
    }
}
