//! The matrix sign function.
//!
//! For a matrix $A$ without eigenvalues on the imaginary axis, $\text{sign}(A)$ is the matrix
//! function that maps every eigenvalue in the open right half plane to $1$ and every eigenvalue in
//! the open left half plane to $-1$. It is computed with the scaled Newton iteration
//! $$X_{k+1} = \frac{1}{2\mu_k} X_k^{-1} + \frac{\mu_k}{2} X_k,$$
//! where the inverse is obtained from an LU decomposition with partial pivoting.

use crate::{
    linalg::{
        lu::{
            partial_pivoting::{compute, inverse},
            LuParams,
        },
        matmul::matmul,
        reductions::{norm_frobenius, norm_one},
        temp_mat_req, temp_mat_uninit,
    },
    ComplexField, Error, MatMut, MatRef, Parallelism, RealField, Result,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Scaling strategy of the Newton iteration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignScaling {
    /// $\mu_k = 1$.
    None,
    /// $\mu_k = |\det X_k|^{-1/n}$.
    Determinant,
    /// $\mu_k = \sqrt{\|X_k^{-1}\|_F / \|X_k\|_F}$.
    Frobenius,
}

/// Matrix sign iteration parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SignParams<R> {
    /// Maximum number of Newton steps.
    pub max_iterations: usize,
    /// Relative tolerance of the stopping criterion. Zero selects `n × epsilon`.
    pub tolerance: R,
    /// The iteration stops once
    /// `‖X_k - X_{k+1}‖₁ / ‖X_{k+1}‖₁ <= ‖X_{k+1}‖₁^power × tolerance`.
    pub power: R,
    /// Scaling strategy.
    pub scaling: SignScaling,
    /// Log the convergence history at the `info` level.
    pub progress: bool,
}

impl<R: RealField> Default for SignParams<R> {
    #[inline]
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: R::zero(),
            power: R::one(),
            scaling: SignScaling::Frobenius,
            progress: false,
        }
    }
}

/// Computes the size and alignment of required workspace for computing the matrix sign function
/// of an `n × n` matrix.
pub fn sign_in_place_req<E: ComplexField>(n: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        temp_mat_req::<E>(n, n)?,
        temp_mat_req::<E>(n, n)?,
        StackReq::try_new::<usize>(n)?,
        StackReq::try_new::<usize>(n)?,
        compute::lu_in_place_req::<E>(n, n, LuParams::default())?,
    ])
}

/// Computes the size and alignment of required workspace for [`sign_decomposition_in_place`].
pub fn sign_decomposition_in_place_req<E: ComplexField>(
    n: usize,
) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([temp_mat_req::<E>(n, n)?, sign_in_place_req::<E>(n)?])
}

/// Performs one Newton step: `x_new = 1/(2 mu) inv(x) + mu/2 x`.
fn newton_step<E: ComplexField>(
    x: MatRef<'_, E>,
    x_new: MatMut<'_, E>,
    scaling: SignScaling,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<()> {
    let mut x_new = x_new;
    let n = x.nrows();

    let (mut lu, stack) = temp_mat_uninit::<E>(n, n, stack);
    let (perm, stack) = stack.make_with(n, |_| 0usize);
    let (perm_inv, stack) = stack.make_with(n, |_| 0usize);

    lu.copy_from(x);
    let (_, row_perm) = compute::lu_in_place(
        lu.rb_mut(),
        perm,
        perm_inv,
        LuParams::default(),
        parallelism,
        stack,
    )?;

    let mut mu = E::Real::one();
    if scaling == SignScaling::Determinant {
        let mut kappa = E::Real::zero();
        for i in 0..n {
            kappa += lu.read(i, i).abs().ln();
        }
        kappa = kappa / E::Real::from_f64(n as f64);
        mu = (-kappa).exp();
    }

    inverse::invert(x_new.rb_mut(), lu.rb(), row_perm, parallelism);

    if scaling == SignScaling::Frobenius {
        mu = (norm_frobenius(x_new.rb()) / norm_frobenius(x)).sqrt();
    }

    let half = E::Real::from_f64(0.5);
    let half_mu = mu * half;
    let half_mu_inv = (mu + mu).inv();
    for j in 0..n {
        for i in 0..n {
            let v = x_new
                .read(i, j)
                .scale_real(half_mu_inv)
                + x.read(i, j).scale_real(half_mu);
            x_new.write(i, j, v);
        }
    }
    Ok(())
}

/// Overwrites the square matrix `a` with its matrix sign function, and returns the number of
/// Newton iterations that were performed.
///
/// The iteration stops when the stopping criterion of [`SignParams`] is met or after
/// `params.max_iterations` steps, whichever comes first.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `a` is not square.
///
/// # Panics
///
/// - Panics if the provided memory in `stack` is insufficient (see [`sign_in_place_req`]).
pub fn sign_in_place<E: ComplexField>(
    a: MatMut<'_, E>,
    params: SignParams<E::Real>,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<usize> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::DimensionMismatch {
            op: "sign",
            expected: (n, n),
            found: (a.nrows(), a.ncols()),
        });
    }

    let mut a = a;
    let mut stack = stack;
    let tolerance = if params.tolerance == E::Real::zero() {
        E::Real::from_f64(n as f64) * E::Real::epsilon()
    } else {
        params.tolerance
    };

    let mut iterations = 0;
    while iterations < params.max_iterations {
        let (mut x_new, stack) = temp_mat_uninit::<E>(n, n, stack.rb_mut());
        newton_step(a.rb(), x_new.rb_mut(), params.scaling, parallelism, stack)?;

        for j in 0..n {
            for i in 0..n {
                let v = a.read(i, j) - x_new.read(i, j);
                a.write(i, j, v);
            }
        }
        let one_diff = norm_one(a.rb());
        let one_new = norm_one(x_new.rb());
        a.copy_from(x_new.rb());
        iterations += 1;

        let ratio = one_diff / one_new;
        if params.progress {
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

/// Overwrites the square matrix `a` with $S = \text{sign}(A)$ and `n` with $N = S A$, so that
/// $A = S N$. Returns the number of Newton iterations that were performed.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `a` is not square, or if `n` does not have the shape of `a`.
///
/// # Panics
///
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`sign_decomposition_in_place_req`]).
pub fn sign_decomposition_in_place<E: ComplexField>(
    a: MatMut<'_, E>,
    n: MatMut<'_, E>,
    params: SignParams<E::Real>,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<usize> {
    let dim = a.nrows();
    if a.ncols() != dim {
        return Err(Error::DimensionMismatch {
            op: "sign_decomposition",
            expected: (dim, dim),
            found: (a.nrows(), a.ncols()),
        });
    }
    if (n.nrows(), n.ncols()) != (dim, dim) {
        return Err(Error::DimensionMismatch {
            op: "sign_decomposition",
            expected: (dim, dim),
            found: (n.nrows(), n.ncols()),
        });
    }

    let mut a = a;
    let (mut a_copy, stack) = temp_mat_uninit::<E>(dim, dim, stack);
    a_copy.copy_from(a.rb());
    let iterations = sign_in_place(a.rb_mut(), params, parallelism, stack)?;
    matmul(n, a.rb(), a_copy.rb(), None, E::one(), parallelism);
    Ok(iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, c64, mat, Mat};
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::GlobalPodBuffer;
    use rand::random;

    fn sign<E: ComplexField>(a: &mut Mat<E>, params: SignParams<E::Real>) -> usize {
        let n = a.nrows();
        let mut mem = GlobalPodBuffer::new(sign_in_place_req::<E>(n).unwrap());
        sign_in_place(a.as_mut(), params, Parallelism::None, PodStack::new(&mut mem)).unwrap()
    }

    #[test]
    fn test_sign_of_diagonal() {
        for scaling in [SignScaling::None, SignScaling::Determinant, SignScaling::Frobenius] {
            let mut a = mat![[2.0, 0.0], [0.0, -3.0f64]];
            let params = SignParams {
                scaling,
                ..Default::default()
            };
            let iterations = sign(&mut a, params);
            assert!(all(iterations > 0, iterations < 100));
            assert_approx_eq!(a.read(0, 0), 1.0, 1e-12);
            assert_approx_eq!(a.read(1, 1), -1.0, 1e-12);
            assert_approx_eq!(a.read(0, 1), 0.0, 1e-12);
            assert_approx_eq!(a.read(1, 0), 0.0, 1e-12);
        }
    }

    #[test]
    fn test_sign_squares_to_identity_and_commutes() {
        let n = 12;
        for scaling in [SignScaling::None, SignScaling::Determinant, SignScaling::Frobenius] {
            let a = Mat::from_fn(n, n, |i, j| {
                if i == j {
                    let magnitude = 1.0 + random::<f64>();
                    if i % 2 == 0 {
                        c64::new(magnitude, random())
                    } else {
                        c64::new(-magnitude, random())
                    }
                } else if i < j {
                    c64::new(random::<f64>() - 0.5, random::<f64>() - 0.5)
                } else {
                    c64::new(0.0, 0.0)
                }
            });
            let mut s = a.clone();
            sign(
                &mut s,
                SignParams {
                    scaling,
                    ..Default::default()
                },
            );

            let mut s2 = Mat::<c64>::zeros(n, n);
            let mut sa = Mat::<c64>::zeros(n, n);
            let mut as_ = Mat::<c64>::zeros(n, n);
            let one = c64::new(1.0, 0.0);
            matmul(s2.as_mut(), s.as_ref(), s.as_ref(), None, one, Parallelism::None);
            matmul(sa.as_mut(), s.as_ref(), a.as_ref(), None, one, Parallelism::None);
            matmul(as_.as_mut(), a.as_ref(), s.as_ref(), None, one, Parallelism::None);

            for j in 0..n {
                for i in 0..n {
                    let target = if i == j { 1.0 } else { 0.0 };
                    assert_approx_eq!(s2.read(i, j).re, target, 1e-8);
                    assert_approx_eq!(s2.read(i, j).im, 0.0, 1e-8);
                    assert_approx_eq!(sa.read(i, j).re, as_.read(i, j).re, 1e-8);
                    assert_approx_eq!(sa.read(i, j).im, as_.read(i, j).im, 1e-8);
                }
            }
        }
    }

    #[test]
    fn test_max_iterations() {
        let mut a = mat![[2.0, 0.0], [0.0, -3.0f64]];
        let params = SignParams {
            max_iterations: 1,
            ..Default::default()
        };
        assert!(sign(&mut a, params) == 1);

        let mut b = mat![[2.0, 0.0], [0.0, -3.0f64]];
        let params = SignParams {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(sign(&mut b, params) == 0);
        assert!(b == mat![[2.0, 0.0], [0.0, -3.0f64]]);
    }

    #[test]
    fn test_sign_decomposition() {
        let a = mat![[3.0, 1.0], [0.0, -2.0f64]];
        let mut s = a.clone();
        let mut n = Mat::<f64>::zeros(2, 2);
        let mut mem = GlobalPodBuffer::new(sign_decomposition_in_place_req::<f64>(2).unwrap());
        sign_decomposition_in_place(
            s.as_mut(),
            n.as_mut(),
            Default::default(),
            Parallelism::None,
            PodStack::new(&mut mem),
        )
        .unwrap();

        let mut sn = Mat::<f64>::zeros(2, 2);
        matmul(sn.as_mut(), s.as_ref(), n.as_ref(), None, 1.0, Parallelism::None);
        for j in 0..2 {
            for i in 0..2 {
                assert_approx_eq!(sn.read(i, j), a.read(i, j), 1e-10);
            }
        }
    }

    #[test]
    fn test_not_square() {
        let mut a = Mat::<f64>::zeros(2, 3);
        let err = sign_in_place(
            a.as_mut(),
            Default::default(),
            Parallelism::None,
            PodStack::new(&mut []),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
