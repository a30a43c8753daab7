//! Triangular solves with a `[Mc, Mr]` triangular matrix and `[Mc, Mr]` right-hand sides.
//!
//! The solve proceeds by blocks of rows. The diagonal block of the triangular matrix is
//! replicated as `[Star, Star]`, the matching rows of the right-hand side are spread as
//! `[Star, Vr]` so that every rank solves a disjoint set of columns, and the remaining rows are
//! updated locally with the off-diagonal block redistributed as `[Mc, Star]`.

use super::{
    grid::check_same_grid,
    matrix::{DistMatMut, DistMatRef},
    redist::redistribute_on,
    Dist,
};
use crate::{
    linalg::{
        matmul::matmul_with_conj,
        triangular_solve::{
            solve_lower_triangular_in_place_with_conj as local_solve_lower_triangular_in_place_with_conj,
            solve_unit_lower_triangular_in_place_with_conj as local_solve_unit_lower_triangular_in_place_with_conj,
            solve_unit_upper_triangular_in_place_with_conj as local_solve_unit_upper_triangular_in_place_with_conj,
            solve_upper_triangular_in_place_with_conj as local_solve_upper_triangular_in_place_with_conj,
        },
    },
    ComplexField, Conj, Error, Parallelism, Result,
};
use reborrow::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Triangle {
    Lower,
    Upper,
}

fn solve_in_place<E: ComplexField>(
    op: &'static str,
    triangle: Triangle,
    unit: bool,
    tri: DistMatRef<'_, E>,
    conj: Conj,
    rhs: DistMatMut<'_, E>,
    blocksize: usize,
) -> Result<()> {
    let mut rhs = rhs;
    let grid = rhs.grid();
    check_same_grid(op, grid, tri.grid())?;
    for dists in [
        (tri.col_dist(), tri.row_dist()),
        (rhs.col_dist(), rhs.row_dist()),
    ] {
        if dists != (Dist::Mc, Dist::Mr) {
            return Err(Error::InvalidDistribution {
                op,
                reason: "operands must be distributed as [Mc, Mr]",
            });
        }
    }
    let n = tri.nrows();
    if tri.ncols() != n {
        return Err(Error::DimensionMismatch {
            op,
            expected: (n, n),
            found: (tri.nrows(), tri.ncols()),
        });
    }
    if rhs.nrows() != n {
        return Err(Error::DimensionMismatch {
            op,
            expected: (n, rhs.ncols()),
            found: (rhs.nrows(), rhs.ncols()),
        });
    }
    if blocksize == 0 {
        return Err(Error::InvalidParameter {
            op,
            reason: "block size must be positive",
        });
    }

    let ncols = rhs.ncols();
    let row_align = rhs.row_align();
    let block_count = n.div_ceil(blocksize);
    for b in 0..block_count {
        let k = match triangle {
            Triangle::Lower => b * blocksize,
            Triangle::Upper => (block_count - 1 - b) * blocksize,
        };
        let nb = Ord::min(blocksize, n - k);

        let t11 = redistribute_on(
            grid,
            tri.submatrix(k, k, nb, nb),
            Dist::Star,
            Dist::Star,
            0,
            0,
        )?;
        let x1_view = rhs.rb().submatrix(k, 0, nb, ncols);
        let mut x1 = redistribute_on(grid, x1_view, Dist::Star, Dist::Vr, 0, row_align)?;
        let (t11, x1_local) = (t11.local(), x1.local_mut());
        match (triangle, unit) {
            (Triangle::Lower, true) => {
                local_solve_unit_lower_triangular_in_place_with_conj(t11, conj, x1_local, Parallelism::None)
            }
            (Triangle::Lower, false) => {
                local_solve_lower_triangular_in_place_with_conj(t11, conj, x1_local, Parallelism::None)
            }
            (Triangle::Upper, true) => {
                local_solve_unit_upper_triangular_in_place_with_conj(t11, conj, x1_local, Parallelism::None)
            }
            (Triangle::Upper, false) => {
                local_solve_upper_triangular_in_place_with_conj(t11, conj, x1_local, Parallelism::None)
            }
        }
        let x1 = redistribute_on(grid, x1.as_ref(), Dist::Star, Dist::Mr, 0, row_align)?;
        rhs.rb_mut()
            .submatrix_mut(k, 0, nb, ncols)
            .copy_from(x1.as_ref())?;

        let (start, len, off) = match triangle {
            Triangle::Lower => (k + nb, n - k - nb, tri.submatrix(k + nb, k, n - k - nb, nb)),
            Triangle::Upper => (0, k, tri.submatrix(0, k, k, nb)),
        };
        if len == 0 {
            continue;
        }
        let mut rest = rhs.rb_mut().submatrix_mut(start, 0, len, ncols);
        let off = redistribute_on(grid, off, Dist::Mc, Dist::Star, rest.col_align(), 0)?;
        matmul_with_conj(
            rest.local_mut(),
            off.local(),
            conj,
            x1.local(),
            Conj::No,
            Some(E::one()),
            -E::one(),
            Parallelism::None,
        );
    }
    Ok(())
}

/// Overwrites `rhs` with `conj(tri)^{-1} rhs`, where `tri` is read as lower triangular.
/// Collective over the grid.
///
/// # Errors
///
/// - [`Error::GridMismatch`] if the operands live on different grids.
/// - [`Error::InvalidDistribution`] if an operand is not distributed as `[Mc, Mr]`.
/// - [`Error::DimensionMismatch`] if `tri` is not square or does not match the rows of `rhs`.
/// - [`Error::InvalidParameter`] if `blocksize` is zero.
/// - [`Error::Communication`] if a collective failed.
pub fn solve_lower_triangular_in_place_with_conj<E: ComplexField>(
    tri: DistMatRef<'_, E>,
    conj: Conj,
    rhs: DistMatMut<'_, E>,
    blocksize: usize,
) -> Result<()> {
    solve_in_place("dist::solve_lower", Triangle::Lower, false, tri, conj, rhs, blocksize)
}

/// Same as [`solve_lower_triangular_in_place_with_conj`], with an implicit unit diagonal.
pub fn solve_unit_lower_triangular_in_place_with_conj<E: ComplexField>(
    tri: DistMatRef<'_, E>,
    conj: Conj,
    rhs: DistMatMut<'_, E>,
    blocksize: usize,
) -> Result<()> {
    solve_in_place("dist::solve_unit_lower", Triangle::Lower, true, tri, conj, rhs, blocksize)
}

/// Same as [`solve_lower_triangular_in_place_with_conj`], with `tri` read as upper triangular.
pub fn solve_upper_triangular_in_place_with_conj<E: ComplexField>(
    tri: DistMatRef<'_, E>,
    conj: Conj,
    rhs: DistMatMut<'_, E>,
    blocksize: usize,
) -> Result<()> {
    solve_in_place("dist::solve_upper", Triangle::Upper, false, tri, conj, rhs, blocksize)
}

/// Same as [`solve_upper_triangular_in_place_with_conj`], with an implicit unit diagonal.
pub fn solve_unit_upper_triangular_in_place_with_conj<E: ComplexField>(
    tri: DistMatRef<'_, E>,
    conj: Conj,
    rhs: DistMatMut<'_, E>,
    blocksize: usize,
) -> Result<()> {
    solve_in_place("dist::solve_unit_upper", Triangle::Upper, true, tri, conj, rhs, blocksize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert, c64,
        dist::{spawn_world, DistMat, Grid},
        linalg::triangular_solve,
        Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use rand::random;
    use std::sync::Arc;

    fn rand_c64() -> c64 {
        c64::new(random::<f64>() - 0.5, random::<f64>() - 0.5)
    }

    #[test]
    fn matches_local_solves() {
        let n = 11;
        let k = 5;
        let tri = Mat::from_fn(n, n, |i, j| {
            if i == j {
                c64::new(3.0 + i as f64, 1.0)
            } else {
                rand_c64()
            }
        });
        let b = Mat::from_fn(n, k, |_, _| rand_c64());

        for (triangle, unit) in [
            (Triangle::Lower, false),
            (Triangle::Lower, true),
            (Triangle::Upper, false),
            (Triangle::Upper, true),
        ] {
            for conj in [Conj::No, Conj::Yes] {
                let mut expected = b.clone();
                let (t, x) = (tri.as_ref(), expected.as_mut());
                match (triangle, unit) {
                    (Triangle::Lower, false) => {
                        triangular_solve::solve_lower_triangular_in_place_with_conj(
                            t,
                            conj,
                            x,
                            Parallelism::None,
                        )
                    }
                    (Triangle::Lower, true) => {
                        triangular_solve::solve_unit_lower_triangular_in_place_with_conj(
                            t,
                            conj,
                            x,
                            Parallelism::None,
                        )
                    }
                    (Triangle::Upper, false) => {
                        triangular_solve::solve_upper_triangular_in_place_with_conj(
                            t,
                            conj,
                            x,
                            Parallelism::None,
                        )
                    }
                    (Triangle::Upper, true) => {
                        triangular_solve::solve_unit_upper_triangular_in_place_with_conj(
                            t,
                            conj,
                            x,
                            Parallelism::None,
                        )
                    }
                }

                for (size, height) in [(4, 2), (3, 1)] {
                    for blocksize in [1, 4, 32] {
                        let results = spawn_world(size, |transport| {
                            let grid = Grid::new(Arc::new(transport), height).unwrap();
                            let dt =
                                DistMat::from_mat(&grid, tri.as_ref(), Dist::Mc, Dist::Mr).unwrap();
                            let mut dx =
                                DistMat::from_mat(&grid, b.as_ref(), Dist::Mc, Dist::Mr).unwrap();
                            solve_in_place(
                                "test",
                                triangle,
                                unit,
                                dt.as_ref(),
                                conj,
                                dx.as_mut(),
                                blocksize,
                            )
                            .unwrap();
                            dx.to_mat().unwrap()
                        });
                        for got in results {
                            for j in 0..k {
                                for i in 0..n {
                                    assert_approx_eq!(
                                        got.read(i, j).re,
                                        expected.read(i, j).re,
                                        1e-10
                                    );
                                    assert_approx_eq!(
                                        got.read(i, j).im,
                                        expected.read(i, j).im,
                                        1e-10
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn invalid_arguments() {
        let grid = Grid::single();
        let t = DistMat::<f64>::new(&grid, 3, 3, Dist::Mc, Dist::Mr).unwrap();
        let mut x = DistMat::<f64>::new(&grid, 4, 2, Dist::Mc, Dist::Mr).unwrap();
        assert!(matches!(
            solve_upper_triangular_in_place_with_conj(t.as_ref(), Conj::No, x.as_mut(), 4),
            Err(Error::DimensionMismatch { .. })
        ));

        let mut x = DistMat::<f64>::new(&grid, 3, 2, Dist::Vc, Dist::Star).unwrap();
        assert!(matches!(
            solve_lower_triangular_in_place_with_conj(t.as_ref(), Conj::No, x.as_mut(), 4),
            Err(Error::InvalidDistribution { .. })
        ));

        let mut x = DistMat::<f64>::new(&grid, 3, 2, Dist::Mc, Dist::Mr).unwrap();
        assert!(matches!(
            solve_unit_lower_triangular_in_place_with_conj(t.as_ref(), Conj::No, x.as_mut(), 0),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
