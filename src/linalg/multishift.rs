//! Triangular solves with a different diagonal shift for every right-hand side.
//!
//! Column `j` of the solution satisfies `op(U - shifts[j] I) x_j = alpha b_j`. This is the
//! inner kernel of inverse iteration and of triangular eigenvector computations, where each
//! column is associated with its own eigenvalue.

use crate::{
    linalg::{matmul::matmul_with_conj, scale},
    ComplexField, Conj, Error, MatMut, MatRef, Parallelism, Result,
};
use reborrow::*;

/// Operation applied to the triangular matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// `U`.
    Normal,
    /// `U^T`.
    Transpose,
    /// `U^H`.
    Adjoint,
}

impl Orientation {
    #[inline]
    pub(crate) fn conj(self) -> Conj {
        match self {
            Orientation::Adjoint => Conj::Yes,
            _ => Conj::No,
        }
    }
}

/// Multi-shift solve tuning parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MultiShiftParams {
    /// Number of rows of the triangular matrix handled by the unblocked kernel at once. Must be
    /// positive.
    pub blocksize: usize,
}

impl Default for MultiShiftParams {
    #[inline]
    fn default() -> Self {
        Self { blocksize: 64 }
    }
}

// the shifted diagonal is formed on the fly, `upper` is never modified
pub(crate) fn solve_unblocked<E: ComplexField>(
    orientation: Orientation,
    upper: MatRef<'_, E>,
    shifts: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
) {
    let mut rhs = rhs;
    let n = upper.nrows();
    let conj = orientation.conj();

    for j in 0..rhs.ncols() {
        let shift = shifts.read(j, 0);
        match orientation {
            Orientation::Normal => {
                for i in (0..n).rev() {
                    let x = rhs.read(i, j) / (upper.read(i, i) - shift);
                    rhs.write(i, j, x);
                    for r in 0..i {
                        let v = rhs.read(r, j);
                        rhs.write(r, j, v - upper.read(r, i) * x);
                    }
                }
            }
            Orientation::Transpose | Orientation::Adjoint => {
                for i in 0..n {
                    let x = rhs.read(i, j) / conj.apply(upper.read(i, i) - shift);
                    rhs.write(i, j, x);
                    for r in i + 1..n {
                        let v = rhs.read(r, j);
                        rhs.write(r, j, v - conj.apply(upper.read(i, r)) * x);
                    }
                }
            }
        }
    }
}

/// Overwrites `rhs` with the solution of `op(upper - shifts[j] I) X[:, j] = alpha rhs[:, j]` for
/// every column `j`.
///
/// `upper` is interpreted as an upper triangular matrix (diagonal included), its strictly lower
/// triangular part is not accessed.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `upper` is not square, if its dimension differs from the
/// number of rows of `rhs`, or if `shifts` is not a column vector with one entry per column of
/// `rhs`.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
pub fn multishift_solve_upper_in_place<E: ComplexField>(
    orientation: Orientation,
    alpha: E,
    upper: MatRef<'_, E>,
    shifts: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    params: MultiShiftParams,
    parallelism: Parallelism,
) -> Result<()> {
    const OP: &str = "multishift_solve_upper";
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

    let mut rhs = rhs;
    scale(alpha, rhs.rb_mut());

    let bs = params.blocksize;
    let block_count = m.div_ceil(bs);
    for b in 0..block_count {
        let k = match orientation {
            Orientation::Normal => (block_count - 1 - b) * bs,
            _ => b * bs,
        };
        let nb = Ord::min(bs, m - k);
        let u11 = upper.submatrix(k, k, nb, nb);

        match orientation {
            Orientation::Normal => {
                let u01 = upper.submatrix(0, k, k, nb);
                let (x0, x1) = rhs.rb_mut().subrows_mut(0, k + nb).split_at_row_mut(k);
                let mut x1 = x1;
                solve_unblocked(orientation, u11, shifts, x1.rb_mut());
                matmul_with_conj(
                    x0,
                    u01,
                    Conj::No,
                    x1.rb(),
                    Conj::No,
                    Some(E::one()),
                    -E::one(),
                    parallelism,
                );
            }
            Orientation::Transpose | Orientation::Adjoint => {
                let u12 = upper.submatrix(k, k + nb, nb, m - k - nb);
                let (x1, x2) = rhs.rb_mut().subrows_mut(k, m - k).split_at_row_mut(nb);
                let mut x1 = x1;
                solve_unblocked(orientation, u11, shifts, x1.rb_mut());
                matmul_with_conj(
                    x2,
                    u12.transpose(),
                    orientation.conj(),
                    x1.rb(),
                    Conj::No,
                    Some(E::one()),
                    -E::one(),
                    parallelism,
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert, c64,
        linalg::triangular_solve::{
            solve_lower_triangular_in_place_with_conj, solve_upper_triangular_in_place,
        },
        Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use rand::random;

    fn rand_c64() -> c64 {
        c64::new(random(), random())
    }

    #[test]
    fn test_matches_per_column_solves() {
        let m = 13;
        let n = 4;
        let upper = Mat::from_fn(m, m, |i, j| {
            if i == j {
                c64::new(4.0 + i as f64, 1.0)
            } else {
                rand_c64()
            }
        });
        let shifts = Mat::from_fn(n, 1, |_, _| rand_c64());
        let b = Mat::from_fn(m, n, |_, _| rand_c64());
        let alpha = c64::new(0.5, 2.0);

        for orientation in [Orientation::Normal, Orientation::Transpose, Orientation::Adjoint] {
            for blocksize in [1, 4, 64] {
                let mut x = b.clone();
                multishift_solve_upper_in_place(
                    orientation,
                    alpha,
                    upper.as_ref(),
                    shifts.as_ref(),
                    x.as_mut(),
                    MultiShiftParams { blocksize },
                    Parallelism::None,
                )
                .unwrap();

                for j in 0..n {
                    let shifted = Mat::from_fn(m, m, |r, c| {
                        if r == c {
                            upper.read(r, c) - shifts.read(j, 0)
                        } else {
                            upper.read(r, c)
                        }
                    });
                    let mut expected = Mat::from_fn(m, 1, |i, _| alpha * b.read(i, j));
                    match orientation {
                        Orientation::Normal => solve_upper_triangular_in_place(
                            shifted.as_ref(),
                            expected.as_mut(),
                            Parallelism::None,
                        ),
                        _ => solve_lower_triangular_in_place_with_conj(
                            shifted.as_ref().transpose(),
                            orientation.conj(),
                            expected.as_mut(),
                            Parallelism::None,
                        ),
                    }
                    for i in 0..m {
                        assert_approx_eq!(x.read(i, j).re, expected.read(i, 0).re, 1e-10);
                        assert_approx_eq!(x.read(i, j).im, expected.read(i, 0).im, 1e-10);
                    }
                }
            }
        }
    }

    #[test]
    fn test_upper_is_not_modified() {
        let upper = Mat::from_fn(5, 5, |i, j| if i <= j { 1.0 + (i + j) as f64 } else { 0.0 });
        let copy = upper.clone();
        let shifts = Mat::from_fn(2, 1, |i, _| i as f64 * 0.25);
        let mut x = Mat::from_fn(5, 2, |_, _| random::<f64>());
        multishift_solve_upper_in_place(
            Orientation::Normal,
            1.0,
            upper.as_ref(),
            shifts.as_ref(),
            x.as_mut(),
            MultiShiftParams { blocksize: 2 },
            Parallelism::None,
        )
        .unwrap();
        assert!(upper == copy);
    }

    #[test]
    fn test_invalid_shift_count() {
        let upper = Mat::<f64>::identity(3, 3);
        let shifts = Mat::<f64>::zeros(2, 1);
        let mut x = Mat::<f64>::zeros(3, 3);
        let err = multishift_solve_upper_in_place(
            Orientation::Normal,
            1.0,
            upper.as_ref(),
            shifts.as_ref(),
            x.as_mut(),
            MultiShiftParams::default(),
            Parallelism::None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
