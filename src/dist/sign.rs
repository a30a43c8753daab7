//! The matrix sign function of a `[Mc, Mr]` matrix.
//!
//! Runs the same scaled Newton iteration as [`crate::linalg::sign`], with the inverse of every
//! iterate obtained from [`super::lu::lu_in_place`] and [`super::lu::invert`], and the scaling
//! factors and stopping criterion computed with the norms of [`super::reductions`].

use super::{
    grid::Grid,
    lu,
    matrix::{DistMat, DistMatMut, DistMatRef},
    redist::redistribute_on,
    reductions::{norm_frobenius, norm_one},
    Dist,
};
use crate::{
    linalg::{
        lu::LuParams,
        sign::{SignParams, SignScaling},
    },
    ComplexField, Error, RealField, Result,
};
use reborrow::*;

// sum of `ln |u_ii|` over the diagonal of the factors, over the world
fn log_abs_det<E: ComplexField>(lu: DistMatRef<'_, E>) -> Result<E::Real> {
    let local = lu.local();
    let mut kappa = E::Real::zero();
    for lj in 0..local.ncols() {
        let j = lu.global_col(lj);
        if let Some(li) = lu.local_row(j) {
            kappa += local.read(li, lj).abs().ln();
        }
    }
    let mut sum = [kappa];
    lu.grid().world().sum_in_place(&mut sum)?;
    Ok(sum[0])
}

// x_new = 1/(2 mu) inv(x) + mu/2 x, with `x_new` aligned as `x`
fn newton_step<'g, E: ComplexField>(
    grid: &'g Grid,
    x: DistMatRef<'_, E>,
    scaling: SignScaling,
    lu_params: LuParams,
) -> Result<DistMat<'g, E>> {
    let n = x.nrows();
    let (col_align, row_align) = (x.col_align(), x.row_align());

    let mut lu = redistribute_on(grid, x, Dist::Mc, Dist::Mr, col_align, row_align)?;
    let mut preimage = DistMat::<usize>::new(grid, n, 1, Dist::Vc, Dist::Star)?;
    lu::lu_in_place(lu.as_mut(), preimage.as_mut(), lu_params)?;

    let mut mu = E::Real::one();
    if scaling == SignScaling::Determinant {
        let kappa = log_abs_det(lu.as_ref())? / E::Real::from_f64(n as f64);
        mu = (-kappa).exp();
    }

    let mut x_new =
        DistMat::<E>::new_aligned(grid, n, n, Dist::Mc, Dist::Mr, col_align, row_align)?;
    lu::invert(x_new.as_mut(), lu.as_ref(), preimage.as_ref(), lu_params)?;

    if scaling == SignScaling::Frobenius {
        mu = (norm_frobenius(x_new.as_ref())? / norm_frobenius(x)?).sqrt();
    }

    let half = E::Real::from_f64(0.5);
    let half_mu = mu * half;
    let half_mu_inv = (mu + mu).inv();
    let x_local = x.local();
    let mut local = x_new.local_mut();
    for j in 0..local.ncols() {
        for i in 0..local.nrows() {
            let v = local.read(i, j).scale_real(half_mu_inv)
                + x_local.read(i, j).scale_real(half_mu);
            local.write(i, j, v);
        }
    }
    Ok(x_new)
}

/// Overwrites the square `[Mc, Mr]` matrix `a` with its matrix sign function, and returns the
/// number of Newton iterations that were performed. Collective over the grid.
///
/// The iteration and its stopping criterion are those of
/// [`crate::linalg::sign::sign_in_place`]. `lu_params` tunes the factorization and the solves
/// that invert every iterate.
///
/// # Errors
///
/// - [`Error::InvalidDistribution`] if `a` is not distributed as `[Mc, Mr]`.
/// - [`Error::DimensionMismatch`] if `a` is not square.
/// - [`Error::InvalidParameter`] if `lu_params.blocksize` is zero.
/// - [`Error::Communication`] if a collective failed.
pub fn sign_in_place<E: ComplexField>(
    a: DistMatMut<'_, E>,
    params: SignParams<E::Real>,
    lu_params: LuParams,
) -> Result<usize> {
    const OP: &str = "dist::sign";
    let mut a = a;
    let grid = a.grid();
    if (a.col_dist(), a.row_dist()) != (Dist::Mc, Dist::Mr) {
        return Err(Error::InvalidDistribution {
            op: OP,
            reason: "matrix must be distributed as [Mc, Mr]",
        });
    }
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::DimensionMismatch {
            op: OP,
            expected: (n, n),
            found: (a.nrows(), a.ncols()),
        });
    }
    lu_params.check(OP)?;

    let tolerance = if params.tolerance == E::Real::zero() {
        E::Real::from_f64(n as f64) * E::Real::epsilon()
    } else {
        params.tolerance
    };

    let mut iterations = 0;
    while iterations < params.max_iterations {
        let x_new = newton_step(grid, a.rb(), params.scaling, lu_params)?;

        {
            let new_local = x_new.local();
            let mut local = a.local_mut();
            for j in 0..local.ncols() {
                for i in 0..local.nrows() {
                    let v = local.read(i, j) - new_local.read(i, j);
                    local.write(i, j, v);
                }
            }
        }
        let one_diff = norm_one(a.rb())?;
        let one_new = norm_one(x_new.as_ref())?;
        a.local_mut().copy_from(x_new.local());
        iterations += 1;

        let ratio = one_diff / one_new;
        if params.progress && grid.rank() == 0 {
            log::info!(
                "after {iterations} Newton iterations: one_diff={:e}, one_new={:e}, one_diff/one_new={:e}, tol={:e}",
                one_diff.to_f64(),
                one_new.to_f64(),
                ratio.to_f64(),
                tolerance.to_f64(),
            );
        }
        if ratio <= one_new.powf(params.power) * tolerance {
            break;
        }
    }

    Ok(iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert, c64,
        dist::{spawn_world, Grid},
        linalg::sign,
        Mat, Parallelism,
    };
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::{GlobalPodBuffer, PodStack};
    use rand::random;
    use std::sync::Arc;

    #[test]
    fn matches_local_sign() {
        let n = 10;
        let a = Mat::from_fn(n, n, |i, j| {
            if i == j {
                let magnitude = 1.0 + random::<f64>();
                if i % 3 == 0 {
                    c64::new(-magnitude, random())
                } else {
                    c64::new(magnitude, random())
                }
            } else {
                c64::new(0.2 * (random::<f64>() - 0.5), 0.2 * (random::<f64>() - 0.5))
            }
        });

        for scaling in [SignScaling::None, SignScaling::Determinant, SignScaling::Frobenius] {
            let params = SignParams {
                scaling,
                ..Default::default()
            };
            let mut expected = a.clone();
            let mut mem = GlobalPodBuffer::new(sign::sign_in_place_req::<c64>(n).unwrap());
            sign::sign_in_place(
                expected.as_mut(),
                params,
                Parallelism::None,
                PodStack::new(&mut mem),
            )
            .unwrap();

            for (size, height) in [(4, 2), (3, 1)] {
                let results = spawn_world(size, |transport| {
                    let grid = Grid::new(Arc::new(transport), height).unwrap();
                    let mut da = DistMat::from_mat(&grid, a.as_ref(), Dist::Mc, Dist::Mr).unwrap();
                    let iterations =
                        sign_in_place(da.as_mut(), params, LuParams { blocksize: 3 }).unwrap();
                    (iterations, da.to_mat().unwrap())
                });
                for (iterations, s) in results {
                    assert!(all(iterations > 0, iterations < params.max_iterations));
                    for j in 0..n {
                        for i in 0..n {
                            assert_approx_eq!(s.read(i, j).re, expected.read(i, j).re, 1e-8);
                            assert_approx_eq!(s.read(i, j).im, expected.read(i, j).im, 1e-8);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn diagonal_on_single_rank() {
        let grid = Grid::single();
        let a = crate::mat![[2.0, 0.0], [0.0, -3.0f64]];
        let mut da = DistMat::from_mat(&grid, a.as_ref(), Dist::Mc, Dist::Mr).unwrap();
        sign_in_place(da.as_mut(), Default::default(), Default::default()).unwrap();
        let s = da.to_mat().unwrap();
        assert_approx_eq!(s.read(0, 0), 1.0, 1e-12);
        assert_approx_eq!(s.read(1, 1), -1.0, 1e-12);
        assert_approx_eq!(s.read(0, 1), 0.0, 1e-12);
    }

    #[test]
    fn invalid_arguments() {
        let grid = Grid::single();
        let mut a = DistMat::<f64>::new(&grid, 2, 3, Dist::Mc, Dist::Mr).unwrap();
        assert!(matches!(
            sign_in_place(a.as_mut(), Default::default(), Default::default()),
            Err(Error::DimensionMismatch { .. })
        ));
        let mut a = DistMat::<f64>::new(&grid, 2, 2, Dist::Star, Dist::Star).unwrap();
        assert!(matches!(
            sign_in_place(a.as_mut(), Default::default(), Default::default()),
            Err(Error::InvalidDistribution { .. })
        ));
    }
}
