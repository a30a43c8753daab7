//! Multi-shift triangular solves with `[Mc, Mr]` operands.
//!
//! The block loop is the one of [`crate::linalg::multishift`]. The diagonal block of the
//! triangular matrix is replicated as `[Star, Star]` and the matching rows of the right-hand side
//! are spread as `[Star, Vr]`, so that every rank solves its own columns with their own shifts.
//! The remaining rows are then updated locally against the off-diagonal block, redistributed as
//! `[Mc, Star]` for `U` and as `[Star, Mc]` for `U^T` and `U^H`.

use super::{
    grid::check_same_grid,
    matrix::{DistMatMut, DistMatRef},
    redist::redistribute_on,
    Dist,
};
use crate::{
    linalg::{
        matmul::matmul_with_conj,
        multishift::{solve_unblocked, MultiShiftParams, Orientation},
        scale,
    },
    ComplexField, Conj, Error, Mat, Parallelism, Result,
};
use reborrow::*;

/// Overwrites the `[Mc, Mr]` matrix `rhs` with the solution of
/// `op(upper - shifts[j] I) X[:, j] = alpha rhs[:, j]` for every column `j`. Collective over the
/// grid.
///
/// `upper` is a `[Mc, Mr]` matrix read as upper triangular, `shifts` a column vector with one
/// entry per column of `rhs`, in any distribution. The result is the one of
/// [`crate::linalg::multishift::multishift_solve_upper_in_place`].
///
/// # Errors
///
/// - [`Error::GridMismatch`] if the operands live on different grids.
/// - [`Error::InvalidDistribution`] if `upper` or `rhs` is not distributed as `[Mc, Mr]`.
/// - [`Error::DimensionMismatch`] if `upper` is not square, if its dimension differs from the
/// number of rows of `rhs`, or if `shifts` is not a column vector with one entry per column of
/// `rhs`.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
/// - [`Error::Communication`] if a collective failed.
pub fn multishift_solve_upper_in_place<E: ComplexField>(
    orientation: Orientation,
    alpha: E,
    upper: DistMatRef<'_, E>,
    shifts: DistMatRef<'_, E>,
    rhs: DistMatMut<'_, E>,
    params: MultiShiftParams,
) -> Result<()> {
    const OP: &str = "dist::multishift_solve_upper";
    let mut rhs = rhs;
    let grid = rhs.grid();
    check_same_grid(OP, grid, upper.grid())?;
    check_same_grid(OP, grid, shifts.grid())?;
    for dists in [
        (upper.col_dist(), upper.row_dist()),
        (rhs.col_dist(), rhs.row_dist()),
    ] {
        if dists != (Dist::Mc, Dist::Mr) {
            return Err(Error::InvalidDistribution {
                op: OP,
                reason: "operands must be distributed as [Mc, Mr]",
            });
        }
    }
    let m = rhs.nrows();
    let n = rhs.ncols();
    if (upper.nrows(), upper.ncols()) != (m, m) {
        return Err(Error::DimensionMismatch {
            op: OP,
            expected: (m, m),
            found: (upper.nrows(), upper.ncols()),
        });
    }
    if (shifts.nrows(), shifts.ncols()) != (n, 1) {
        return Err(Error::DimensionMismatch {
            op: OP,
            expected: (n, 1),
            found: (shifts.nrows(), shifts.ncols()),
        });
    }
    if params.blocksize == 0 {
        return Err(Error::InvalidParameter {
            op: OP,
            reason: "block size must be positive",
        });
    }

    scale(alpha, rhs.local_mut());

    let all_shifts = redistribute_on(grid, shifts, Dist::Star, Dist::Star, 0, 0)?;
    let row_align = rhs.row_align();
    let bs = params.blocksize;
    let block_count = m.div_ceil(bs);
    log::debug!(
        "multishift solve: {m}×{m} triangular matrix, {n} right-hand sides, {block_count} blocks",
    );

    for b in 0..block_count {
        let k = match orientation {
            Orientation::Normal => (block_count - 1 - b) * bs,
            _ => b * bs,
        };
        let nb = Ord::min(bs, m - k);

        let u11_view = upper.submatrix(k, k, nb, nb);
        let u11 = redistribute_on(grid, u11_view, Dist::Star, Dist::Star, 0, 0)?;
        let x1_view = rhs.rb().submatrix(k, 0, nb, n);
        let mut x1 = redistribute_on(grid, x1_view, Dist::Star, Dist::Vr, 0, row_align)?;
        let local_shifts = {
            let x1 = x1.as_ref();
            Mat::from_fn(x1.local().ncols(), 1, |lj, _| {
                all_shifts.local().read(x1.global_col(lj), 0)
            })
        };
        solve_unblocked(orientation, u11.local(), local_shifts.as_ref(), x1.local_mut());
        let x1 = redistribute_on(grid, x1.as_ref(), Dist::Star, Dist::Mr, 0, row_align)?;
        rhs.rb_mut().submatrix_mut(k, 0, nb, n).copy_from(x1.as_ref())?;

        match orientation {
            Orientation::Normal => {
                if k == 0 {
                    continue;
                }
                let mut x0 = rhs.rb_mut().submatrix_mut(0, 0, k, n);
                let u01 = redistribute_on(
                    grid,
                    upper.submatrix(0, k, k, nb),
                    Dist::Mc,
                    Dist::Star,
                    x0.col_align(),
                    0,
                )?;
                matmul_with_conj(
                    x0.local_mut(),
                    u01.local(),
                    Conj::No,
                    x1.local(),
                    Conj::No,
                    Some(E::one()),
                    -E::one(),
                    Parallelism::None,
                );
            }
            Orientation::Transpose | Orientation::Adjoint => {
                let rest = m - k - nb;
                if rest == 0 {
                    continue;
                }
                let mut x2 = rhs.rb_mut().submatrix_mut(k + nb, 0, rest, n);
                // rows of `u12^T` follow the rows of `x2`
                let u12 = redistribute_on(
                    grid,
                    upper.submatrix(k, k + nb, nb, rest),
                    Dist::Star,
                    Dist::Mc,
                    0,
                    x2.col_align(),
                )?;
                matmul_with_conj(
                    x2.local_mut(),
                    u12.local().transpose(),
                    orientation.conj(),
                    x1.local(),
                    Conj::No,
                    Some(E::one()),
                    -E::one(),
                    Parallelism::None,
                );
            }
        }
    }

    Ok(())
}
