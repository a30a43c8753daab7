//! Diagonal scaling and solves on distributed matrices.

use super::{
    grid::check_same_grid,
    matrix::{DistMat, DistMatMut, DistMatRef},
    redist::redistribute_on,
    Dist,
};
use crate::{
    linalg::diagonal::{check_diagonal, diagonal_scale_local, diagonal_solve_local, ApplySide},
    ComplexField, Conj, Error, Result,
};

// copy of `d` whose local rows line up with the local rows (or columns) of `a`
fn aligned_diagonal<'g, E: ComplexField>(
    op: &'static str,
    side: ApplySide,
    d: DistMatRef<'_, E>,
    a: &DistMatMut<'g, E>,
) -> Result<DistMat<'g, E>> {
    let grid = a.grid();
    check_same_grid(op, grid, d.grid())?;
    check_diagonal(op, side, (d.nrows(), d.ncols()), (a.nrows(), a.ncols()))?;
    let (dist, align) = match side {
        ApplySide::Left => (a.col_dist(), a.col_align()),
        ApplySide::Right => (a.row_dist(), a.row_align()),
    };
    redistribute_on(grid, d, dist, Dist::Star, align, 0)
}

/// Overwrites `a` with `op(D)^{-1} × a` or `a × op(D)^{-1}`, where `D = diag(d)`. Collective over
/// the grid.
///
/// `d` may have any distribution. See [`crate::linalg::diagonal::diagonal_solve_in_place`].
///
/// # Errors
///
/// - [`Error::GridMismatch`] if `d` and `a` live on different grids.
/// - [`Error::DimensionMismatch`] if `d` does not match the side of `a` it is applied on.
/// - [`Error::SingularMatrix`] if `check_singular` is set and an entry of `d` is zero. `a` is not
/// modified on any rank in that case.
/// - [`Error::Communication`] if a collective failed.
pub fn diagonal_solve_in_place<E: ComplexField>(
    side: ApplySide,
    conj: Conj,
    d: DistMatRef<'_, E>,
    a: DistMatMut<'_, E>,
    check_singular: bool,
) -> Result<()> {
    const OP: &str = "dist::diagonal_solve";
    let mut a = a;
    let d = aligned_diagonal(OP, side, d, &a)?;

    if check_singular {
        let local = d.local();
        let has_zero = (0..local.nrows()).any(|i| local.read(i, 0) == E::zero());
        if a.grid().world().all_gather(has_zero)?.into_iter().any(|z| z) {
            return Err(Error::SingularMatrix);
        }
    }

    diagonal_solve_local(side, conj, d.local(), a.local_mut(), false);
    Ok(())
}

/// Overwrites `a` with `op(D) × a` or `a × op(D)`, where `D = diag(d)`. Collective over the grid.
///
/// # Errors
///
/// - [`Error::GridMismatch`] if `d` and `a` live on different grids.
/// - [`Error::DimensionMismatch`] if `d` does not match the side of `a` it is applied on.
/// - [`Error::Communication`] if a collective failed.
pub fn diagonal_scale_in_place<E: ComplexField>(
    side: ApplySide,
    conj: Conj,
    d: DistMatRef<'_, E>,
    a: DistMatMut<'_, E>,
) -> Result<()> {
    let mut a = a;
    let d = aligned_diagonal("dist::diagonal_scale", side, d, &a)?;
    diagonal_scale_local(side, conj, d.local(), a.local_mut());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert, c64,
        dist::{spawn_world, Grid},
        Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use std::sync::Arc;

    #[test]
    fn solve_matches_local() {
        let a = Mat::from_fn(6, 5, |i, j| c64::new(i as f64 + 1.0, j as f64 - 2.0));
        for side in [ApplySide::Left, ApplySide::Right] {
            let n = match side {
                ApplySide::Left => 6,
                ApplySide::Right => 5,
            };
            let d = Mat::from_fn(n, 1, |i, _| c64::new(1.0 + i as f64, 0.5));
            let mut expected = a.clone();
            crate::linalg::diagonal::diagonal_solve_in_place(
                side,
                Conj::Yes,
                d.as_ref(),
                expected.as_mut(),
                true,
            )
            .unwrap();

            let results = spawn_world(6, |transport| {
                let grid = Grid::new(Arc::new(transport), 2).unwrap();
                let dd = DistMat::from_mat(&grid, d.as_ref(), Dist::Vc, Dist::Star).unwrap();
                let mut da = DistMat::from_mat(&grid, a.as_ref(), Dist::Mc, Dist::Mr).unwrap();
                diagonal_solve_in_place(side, Conj::Yes, dd.as_ref(), da.as_mut(), true).unwrap();
                da.to_mat().unwrap()
            });
            for got in results {
                for j in 0..5 {
                    for i in 0..6 {
                        assert_approx_eq!(got.read(i, j).re, expected.read(i, j).re, 1e-14);
                        assert_approx_eq!(got.read(i, j).im, expected.read(i, j).im, 1e-14);
                    }
                }
            }
        }
    }

    #[test]
    fn scale_matches_local() {
        let a = Mat::from_fn(4, 7, |i, j| (i * 7 + j) as f64);
        let d = Mat::from_fn(7, 1, |i, _| 2.0 - i as f64);
        let mut expected = a.clone();
        crate::linalg::diagonal::diagonal_scale_in_place(
            ApplySide::Right,
            Conj::No,
            d.as_ref(),
            expected.as_mut(),
        )
        .unwrap();
        let results = spawn_world(4, |transport| {
            let grid = Grid::new(Arc::new(transport), 2).unwrap();
            let dd = DistMat::from_mat(&grid, d.as_ref(), Dist::Star, Dist::Star).unwrap();
            let mut da = DistMat::from_mat(&grid, a.as_ref(), Dist::Vc, Dist::Star).unwrap();
            diagonal_scale_in_place(ApplySide::Right, Conj::No, dd.as_ref(), da.as_mut())
                .unwrap();
            da.to_mat().unwrap()
        });
        for got in results {
            assert!(got == expected);
        }
    }

    #[test]
    fn singular_on_one_rank_fails_everywhere() {
        let a = Mat::from_fn(5, 3, |i, j| (i + j) as f64 + 1.0);
        let d = Mat::from_fn(5, 1, |i, _| if i == 3 { 0.0 } else { 1.0 });
        let results = spawn_world(3, |transport| {
            let grid = Grid::new(Arc::new(transport), 3).unwrap();
            let dd = DistMat::from_mat(&grid, d.as_ref(), Dist::Mc, Dist::Star).unwrap();
            let mut da = DistMat::from_mat(&grid, a.as_ref(), Dist::Mc, Dist::Mr).unwrap();
            let result =
                diagonal_solve_in_place(ApplySide::Left, Conj::No, dd.as_ref(), da.as_mut(), true);
            (result, da.to_mat().unwrap())
        });
        for (result, got) in results {
            assert!(result == Err(Error::SingularMatrix));
            assert!(got == a);
        }
    }

    #[test]
    fn dimension_mismatch() {
        let grid = Grid::single();
        let d = DistMat::<f64>::new(&grid, 3, 1, Dist::Star, Dist::Star).unwrap();
        let mut a = DistMat::<f64>::new(&grid, 4, 3, Dist::Mc, Dist::Mr).unwrap();
        assert!(matches!(
            diagonal_solve_in_place(ApplySide::Left, Conj::No, d.as_ref(), a.as_mut(), false),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(diagonal_scale_in_place(ApplySide::Right, Conj::No, d.as_ref(), a.as_mut()).is_ok());
    }
}
