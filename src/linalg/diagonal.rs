//! Scaling the rows or columns of a matrix by the entries of a diagonal matrix.

use crate::{ComplexField, Conj, Error, MatMut, MatRef, Result};

/// Side of the matrix a diagonal operator is applied on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplySide {
    /// `D × A`, row `i` is scaled by `d[i]`.
    Left,
    /// `A × D`, column `j` is scaled by `d[j]`.
    Right,
}

pub(crate) fn check_diagonal(
    op: &'static str,
    side: ApplySide,
    d: (usize, usize),
    a: (usize, usize),
) -> Result<()> {
    let n = match side {
        ApplySide::Left => a.0,
        ApplySide::Right => a.1,
    };
    if d != (n, 1) {
        return Err(Error::DimensionMismatch {
            op,
            expected: (n, 1),
            found: d,
        });
    }
    Ok(())
}

/// Scales `a` by `op(d)^{-1}` without any argument checking. Returns `false` and leaves `a`
/// untouched if `check_singular` is set and an entry of `d` is zero.
pub(crate) fn diagonal_solve_local<E: ComplexField>(
    side: ApplySide,
    conj: Conj,
    d: MatRef<'_, E>,
    a: MatMut<'_, E>,
    check_singular: bool,
) -> bool {
    if check_singular && (0..d.nrows()).any(|i| d.read(i, 0) == E::zero()) {
        return false;
    }

    let mut a = a;
    match side {
        ApplySide::Left => {
            for i in 0..a.nrows() {
                let inv = conj.apply(d.read(i, 0)).inv();
                for j in 0..a.ncols() {
                    let v = a.read(i, j);
                    a.write(i, j, v * inv);
                }
            }
        }
        ApplySide::Right => {
            for j in 0..a.ncols() {
                let inv = conj.apply(d.read(j, 0)).inv();
                for i in 0..a.nrows() {
                    let v = a.read(i, j);
                    a.write(i, j, v * inv);
                }
            }
        }
    }
    true
}

pub(crate) fn diagonal_scale_local<E: ComplexField>(
    side: ApplySide,
    conj: Conj,
    d: MatRef<'_, E>,
    a: MatMut<'_, E>,
) {
    let mut a = a;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let delta = match side {
                ApplySide::Left => d.read(i, 0),
                ApplySide::Right => d.read(j, 0),
            };
            let v = a.read(i, j);
            a.write(i, j, conj.apply(delta) * v);
        }
    }
}

/// Overwrites `a` with `op(D)^{-1} × a` (for [`ApplySide::Left`]) or `a × op(D)^{-1}` (for
/// [`ApplySide::Right`]), where `D = diag(d)` and `op` conjugates when `conj` is [`Conj::Yes`].
///
/// A zero entry of `d` produces non-finite values, unless `check_singular` is set.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `d` is not a column vector whose length matches the side of
/// `a` it is applied on.
/// - [`Error::SingularMatrix`] if `check_singular` is set and an entry of `d` is zero. `a` is not
/// modified in that case.
pub fn diagonal_solve_in_place<E: ComplexField>(
    side: ApplySide,
    conj: Conj,
    d: MatRef<'_, E>,
    a: MatMut<'_, E>,
    check_singular: bool,
) -> Result<()> {
    check_diagonal(
        "diagonal_solve",
        side,
        (d.nrows(), d.ncols()),
        (a.nrows(), a.ncols()),
    )?;
    if diagonal_solve_local(side, conj, d, a, check_singular) {
        Ok(())
    } else {
        Err(Error::SingularMatrix)
    }
}

/// Overwrites `a` with `op(D) × a` (for [`ApplySide::Left`]) or `a × op(D)` (for
/// [`ApplySide::Right`]), where `D = diag(d)`.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `d` is not a column vector whose length matches the side of
/// `a` it is applied on.
pub fn diagonal_scale_in_place<E: ComplexField>(
    side: ApplySide,
    conj: Conj,
    d: MatRef<'_, E>,
    a: MatMut<'_, E>,
) -> Result<()> {
    check_diagonal(
        "diagonal_scale",
        side,
        (d.nrows(), d.ncols()),
        (a.nrows(), a.ncols()),
    )?;
    diagonal_scale_local(side, conj, d, a);
    Ok(())
}

/// Overwrites the square matrix `a` with `D^{-1} × a × D^{-1}`, where `D = diag(d)` is real.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `a` is not square or `d` does not match its dimension.
pub fn symmetric_diagonal_solve_in_place<E: ComplexField>(
    d: MatRef<'_, E::Real>,
    a: MatMut<'_, E>,
) -> Result<()> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::DimensionMismatch {
            op: "symmetric_diagonal_solve",
            expected: (n, n),
            found: (a.nrows(), a.ncols()),
        });
    }
    check_diagonal(
        "symmetric_diagonal_solve",
        ApplySide::Left,
        (d.nrows(), d.ncols()),
        (n, n),
    )?;

    let mut a = a;
    for j in 0..n {
        for i in 0..n {
            let delta = d.read(i, 0) * d.read(j, 0);
            let v = a.read(i, j);
            a.write(i, j, v.scale_real(delta.inv()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, c64, mat, Mat};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_diagonal_solve_left_right() {
        let d = mat![[2.0], [4.0f64]];
        let mut a = mat![[2.0, 4.0], [8.0, 16.0f64]];
        diagonal_solve_in_place(ApplySide::Left, Conj::No, d.as_ref(), a.as_mut(), true).unwrap();
        assert!(a == mat![[1.0, 2.0], [2.0, 4.0f64]]);

        diagonal_solve_in_place(ApplySide::Right, Conj::No, d.as_ref(), a.as_mut(), false)
            .unwrap();
        assert!(a == mat![[0.5, 0.5], [1.0, 1.0f64]]);
    }

    #[test]
    fn test_diagonal_solve_conj() {
        let d = Mat::from_fn(1, 1, |_, _| c64::new(0.0, 1.0));
        let mut a = Mat::from_fn(1, 2, |_, _| c64::new(1.0, 0.0));
        diagonal_solve_in_place(ApplySide::Left, Conj::Yes, d.as_ref(), a.as_mut(), false)
            .unwrap();
        // 1 / conj(i) = i
        assert_approx_eq!(a.read(0, 1).re, 0.0);
        assert_approx_eq!(a.read(0, 1).im, 1.0);
    }

    #[test]
    fn test_singular_is_reported_before_mutation() {
        let d = mat![[2.0], [0.0f64]];
        let mut a = mat![[2.0, 4.0], [8.0, 16.0f64]];
        let orig = a.clone();
        let err = diagonal_solve_in_place(ApplySide::Left, Conj::No, d.as_ref(), a.as_mut(), true)
            .unwrap_err();
        assert!(err == Error::SingularMatrix);
        assert!(a == orig);

        diagonal_solve_in_place(ApplySide::Left, Conj::No, d.as_ref(), a.as_mut(), false)
            .unwrap();
        assert!(!a.read(1, 0).is_finite());
    }

    #[test]
    fn test_dimension_mismatch() {
        let d = mat![[2.0], [1.0], [3.0f64]];
        let mut a = Mat::<f64>::zeros(2, 3);
        let err = diagonal_solve_in_place(ApplySide::Left, Conj::No, d.as_ref(), a.as_mut(), true)
            .unwrap_err();
        assert!(
            err == Error::DimensionMismatch {
                op: "diagonal_solve",
                expected: (2, 1),
                found: (3, 1),
            }
        );
        assert!(
            diagonal_solve_in_place(ApplySide::Right, Conj::No, d.as_ref(), a.as_mut(), true)
                .is_ok()
        );
    }

    #[test]
    fn test_scale_then_solve() {
        let d = Mat::from_fn(3, 1, |i, _| c64::new(1.0 + i as f64, -0.5));
        let orig = Mat::from_fn(3, 4, |i, j| c64::new(i as f64, j as f64));
        for side in [ApplySide::Left, ApplySide::Right] {
            let d = match side {
                ApplySide::Left => d.clone(),
                ApplySide::Right => Mat::from_fn(4, 1, |i, _| c64::new(2.0, i as f64)),
            };
            let mut a = orig.clone();
            diagonal_scale_in_place(side, Conj::Yes, d.as_ref(), a.as_mut()).unwrap();
            diagonal_solve_in_place(side, Conj::Yes, d.as_ref(), a.as_mut(), true).unwrap();
            for j in 0..4 {
                for i in 0..3 {
                    assert_approx_eq!(a.read(i, j).re, orig.read(i, j).re);
                    assert_approx_eq!(a.read(i, j).im, orig.read(i, j).im);
                }
            }
        }
    }

    #[test]
    fn test_symmetric_diagonal_solve() {
        let d = mat![[2.0], [4.0f64]];
        let mut a = Mat::from_fn(2, 2, |_, _| c64::new(8.0, 16.0));
        symmetric_diagonal_solve_in_place(d.as_ref(), a.as_mut()).unwrap();
        assert!(a.read(0, 0) == c64::new(2.0, 4.0));
        assert!(a.read(0, 1) == c64::new(1.0, 2.0));
        assert!(a.read(1, 1) == c64::new(0.5, 1.0));
    }
}
