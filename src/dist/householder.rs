//! Packed Householder reflectors applied to distributed matrices.
//!
//! Same blocked scheme as [`crate::linalg::householder::apply_packed_reflectors`]. For each
//! block, the reflector panel is spread over all ranks as `[Star, Vr]`, which makes the
//! triangular factor a sum of local rank-k updates, replicated everywhere after one reduction.
//! The projection of the target matrix onto the panel is a local product with a `[Star, Mc]` copy
//! of the panel, reduced over the column communicator.

use super::{
    grid::check_same_grid,
    matrix::{DistMat, DistMatMut, DistMatRef},
    redist::redistribute_on,
    Dist,
};
use crate::{
    linalg::{
        householder::{
            block_starts, check_reflector_args, fix_diagonal, triangle_of, Direction,
            ReflectorParams,
        },
        matmul::{matmul, matmul_with_conj, triangular::rank_k_update},
        triangular_solve::{solve_lower_triangular_in_place, solve_upper_triangular_in_place},
    },
    ComplexField, Conj, Error, Mat, Parallelism, Result,
};
use reborrow::*;

/// Applies the packed sequence of Householder reflectors stored in the rows of `h`, starting on
/// the diagonal `offset`, to `a` from the left. Collective over the grid.
///
/// The reflectors and the meaning of `conj` and `direction` are the same as in
/// [`crate::linalg::householder::apply_packed_reflectors`].
///
/// `h` and `a` must be distributed as `[Mc, Mr]`. `t` must be distributed as `[Md, Star]`, aligned
/// with the diagonal `offset` of `h`, see [`DistMatRef::diagonal_align`].
///
/// # Errors
///
/// - [`Error::GridMismatch`] if the operands live on different grids.
/// - [`Error::InvalidDistribution`] if an operand has the wrong distribution, or if `t` is not
/// aligned with the diagonal of `h`.
/// - [`Error::DimensionMismatch`] if `h.ncols() != a.nrows()`, or if `t` is not a column vector
/// with one entry per reflector.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
/// - [`Error::Communication`] if a collective failed.
pub fn apply_packed_reflectors<E: ComplexField>(
    conj: Conj,
    direction: Direction,
    offset: isize,
    h: DistMatRef<'_, E>,
    t: DistMatRef<'_, E>,
    a: DistMatMut<'_, E>,
    params: ReflectorParams,
) -> Result<()> {
    const OP: &str = "dist::apply_packed_reflectors";
    let mut a = a;
    let grid = a.grid();
    check_same_grid(OP, grid, h.grid())?;
    check_same_grid(OP, grid, t.grid())?;
    for (dists, name) in [
        ((h.col_dist(), h.row_dist()), "h must be distributed as [Mc, Mr]"),
        ((a.col_dist(), a.row_dist()), "a must be distributed as [Mc, Mr]"),
    ] {
        if dists != (Dist::Mc, Dist::Mr) {
            return Err(Error::InvalidDistribution { op: OP, reason: name });
        }
    }
    if (t.col_dist(), t.row_dist()) != (Dist::Md, Dist::Star) {
        return Err(Error::InvalidDistribution {
            op: OP,
            reason: "t must be distributed as [Md, Star]",
        });
    }
    let diag_len = check_reflector_args(
        OP,
        (h.nrows(), h.ncols()),
        offset,
        (t.nrows(), t.ncols()),
        a.nrows(),
        params,
    )?;
    if t.col_align() != h.diagonal_align(offset)? {
        return Err(Error::InvalidDistribution {
            op: OP,
            reason: "t is not aligned with the diagonal of h",
        });
    }

    let n_h = h.ncols();
    let n_a = a.ncols();
    let i_off = (-offset).max(0) as usize;
    let j_off = offset.max(0) as usize;
    let side = triangle_of(direction);

    for k in block_starts(diag_len, params.blocksize, direction) {
        let nb = Ord::min(params.blocksize, diag_len - k);
        let ki = k + i_off;
        let kj = k + j_off;
        let width = n_h - kj;
        log::debug!(
            "distributed reflectors {}..{} of {} ({:?})",
            k,
            k + nb,
            diag_len,
            direction,
        );

        let h_pan = h.submatrix(ki, kj, nb, width);
        let mut v = redistribute_on(grid, h_pan, Dist::Star, Dist::Vr, 0, 0)?;
        conj_unit_upper_in_place(&mut v);

        let mut s = Mat::<E>::zeros(nb, nb);
        rank_k_update(s.as_mut(), side, v.local(), None, E::one(), Parallelism::None);
        grid.world().sum_in_place(s.as_slice_mut())?;

        let t1 = redistribute_on(grid, t.submatrix(k, 0, nb, 1), Dist::Star, Dist::Star, 0, 0)?;
        fix_diagonal(conj, t1.local(), s.as_mut());

        let a_bot = a.rb_mut().submatrix_mut(kj, 0, width, n_a);
        let (col_align, row_align) = (a_bot.col_align(), a_bot.row_align());
        let v_mc = redistribute_on(grid, v.as_ref(), Dist::Star, Dist::Mc, 0, col_align)?;

        let mut z = DistMat::<E>::new_aligned(grid, nb, n_a, Dist::Star, Dist::Mr, 0, row_align)?;
        let a_bot = a_bot.into_const();
        matmul(
            z.local_mut(),
            v_mc.local(),
            a_bot.local(),
            None,
            E::one(),
            Parallelism::None,
        );
        z.as_mut().sum_over(grid.col_comm())?;

        let mut z_vr = redistribute_on(grid, z.as_ref(), Dist::Star, Dist::Vr, 0, row_align)?;
        match direction {
            Direction::Forward => {
                solve_lower_triangular_in_place(s.as_ref(), z_vr.local_mut(), Parallelism::None)
            }
            Direction::Backward => {
                solve_upper_triangular_in_place(s.as_ref(), z_vr.local_mut(), Parallelism::None)
            }
        }
        let z = redistribute_on(grid, z_vr.as_ref(), Dist::Star, Dist::Mr, 0, row_align)?;

        let mut a_bot = a.rb_mut().submatrix_mut(kj, 0, width, n_a);
        matmul_with_conj(
            a_bot.local_mut(),
            v_mc.local().transpose(),
            Conj::Yes,
            z.local(),
            Conj::No,
            Some(E::one()),
            -E::one(),
            Parallelism::None,
        );
    }

    Ok(())
}

/// Replaces the `[Star, Vr]` panel `v` with its conjugate, made unit upper trapezoidal.
fn conj_unit_upper_in_place<E: ComplexField>(v: &mut DistMat<'_, E>) {
    let cols: Vec<usize> = (0..v.local().ncols())
        .map(|lj| v.as_ref().global_col(lj))
        .collect();
    let mut local = v.local_mut();
    for (lj, &j) in cols.iter().enumerate() {
        for i in 0..local.nrows() {
            let value = if i == j {
                E::one()
            } else if i < j {
                local.read(i, lj).conj()
            } else {
                E::zero()
            };
            local.write(i, lj, value);
        }
    }
}
