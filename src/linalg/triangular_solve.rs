//! Triangular solve module.
//!
//! All solves act on the left: `rhs := Op(tri)^{-1} rhs`. A solve on the right, `X T = B`, is
//! obtained by passing transposed views, `T^T X^T = B^T`.

use crate::{
    assert, utils::thread::join_raw, utils::thread::parallelism_degree, ComplexField, Conj,
    MatMut, MatRef, Parallelism,
};

#[derive(Copy, Clone, PartialEq, Eq)]
enum Diag {
    Unit,
    Generic,
}

fn solve_lower_serial<E: ComplexField>(
    tril: MatRef<'_, E>,
    conj_lhs: Conj,
    diag: Diag,
    rhs: MatMut<'_, E>,
) {
    let mut rhs = rhs;
    let n = tril.nrows();
    for j in 0..rhs.ncols() {
        for p in 0..n {
            let mut x = unsafe { rhs.read_unchecked(p, j) };
            if diag == Diag::Generic {
                x = x / conj_lhs.apply(unsafe { tril.read_unchecked(p, p) });
                unsafe { rhs.write_unchecked(p, j, x) };
            }
            for i in p + 1..n {
                let l = conj_lhs.apply(unsafe { tril.read_unchecked(i, p) });
                unsafe {
                    let b = rhs.read_unchecked(i, j);
                    rhs.write_unchecked(i, j, b - l * x);
                }
            }
        }
    }
}

fn solve_upper_serial<E: ComplexField>(
    triu: MatRef<'_, E>,
    conj_lhs: Conj,
    diag: Diag,
    rhs: MatMut<'_, E>,
) {
    let mut rhs = rhs;
    let n = triu.nrows();
    for j in 0..rhs.ncols() {
        for p in (0..n).rev() {
            let mut x = unsafe { rhs.read_unchecked(p, j) };
            if diag == Diag::Generic {
                x = x / conj_lhs.apply(unsafe { triu.read_unchecked(p, p) });
                unsafe { rhs.write_unchecked(p, j, x) };
            }
            for i in 0..p {
                let u = conj_lhs.apply(unsafe { triu.read_unchecked(i, p) });
                unsafe {
                    let b = rhs.read_unchecked(i, j);
                    rhs.write_unchecked(i, j, b - u * x);
                }
            }
        }
    }
}

fn solve_impl<E: ComplexField>(
    tri: MatRef<'_, E>,
    conj_lhs: Conj,
    diag: Diag,
    lower: bool,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    let k = rhs.ncols();
    let n = tri.nrows();
    if k >= 2 && parallelism_degree(parallelism) > 1 && n * n * k >= 64 * 64 * 32 {
        let (left, right) = rhs.split_at_col_mut(k / 2);
        join_raw(
            |par| solve_impl(tri, conj_lhs, diag, lower, left, par),
            |par| solve_impl(tri, conj_lhs, diag, lower, right, par),
            parallelism,
        );
    } else if lower {
        solve_lower_serial(tri, conj_lhs, diag, rhs);
    } else {
        solve_upper_serial(tri, conj_lhs, diag, rhs);
    }
}

#[track_caller]
fn check_dims<E>(tri: MatRef<'_, E>, rhs: &MatMut<'_, E>) {
    assert!(all(tri.nrows() == tri.ncols(), rhs.nrows() == tri.ncols()));
}

/// Computes the solution of `Op_lhs(triangular_lower)×X = rhs`, and stores the result in
/// `rhs`.
///
/// `triangular_lower` is interpreted as a lower triangular matrix (diagonal included).
/// Its strictly upper triangular part is not accessed.
///
/// `Op_lhs` is the identity if `conj_lhs` is `Conj::No`, and the conjugation operation if it is
/// `Conj::Yes`.
///
/// # Panics
///
///  - Panics if `triangular_lower` is not a square matrix.
///  - Panics if `rhs.nrows() != triangular_lower.ncols()`
#[track_caller]
#[inline]
pub fn solve_lower_triangular_in_place_with_conj<E: ComplexField>(
    triangular_lower: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    check_dims(triangular_lower, &rhs);
    solve_impl(triangular_lower, conj_lhs, Diag::Generic, true, rhs, parallelism);
}

/// Computes the solution of `triangular_lower×X = rhs`, and stores the result in `rhs`.
///
/// See [`solve_lower_triangular_in_place_with_conj`].
#[track_caller]
#[inline]
pub fn solve_lower_triangular_in_place<E: ComplexField>(
    triangular_lower: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    solve_lower_triangular_in_place_with_conj(triangular_lower, Conj::No, rhs, parallelism)
}

/// Computes the solution of `Op_lhs(triangular_lower)×X = rhs`, and stores the result in
/// `rhs`.
///
/// `triangular_lower` is interpreted as a unit lower triangular matrix (diagonal included).
/// Its diagonal and strictly upper triangular part are not accessed.
///
/// # Example
///
/// ```
/// use gridla::{linalg::triangular_solve::solve_unit_lower_triangular_in_place, mat, Parallelism};
///
/// let l = mat![[1.0, 0.0], [0.5, 1.0]];
/// let mut x = mat![[2.0], [3.0]];
/// solve_unit_lower_triangular_in_place(l.as_ref(), x.as_mut(), Parallelism::None);
/// assert_eq!(x.read(1, 0), 2.0);
/// ```
///
/// # Panics
///
///  - Panics if `triangular_lower` is not a square matrix.
///  - Panics if `rhs.nrows() != triangular_lower.ncols()`
#[track_caller]
#[inline]
pub fn solve_unit_lower_triangular_in_place_with_conj<E: ComplexField>(
    triangular_lower: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    check_dims(triangular_lower, &rhs);
    solve_impl(triangular_lower, conj_lhs, Diag::Unit, true, rhs, parallelism);
}

/// Computes the solution of `triangular_lower×X = rhs`, with an implicit unit diagonal.
#[track_caller]
#[inline]
pub fn solve_unit_lower_triangular_in_place<E: ComplexField>(
    triangular_lower: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    solve_unit_lower_triangular_in_place_with_conj(triangular_lower, Conj::No, rhs, parallelism)
}

/// Computes the solution of `Op_lhs(triangular_upper)×X = rhs`, and stores the result in
/// `rhs`.
///
/// `triangular_upper` is interpreted as an upper triangular matrix (diagonal included).
/// Its strictly lower triangular part is not accessed.
///
/// # Panics
///
///  - Panics if `triangular_upper` is not a square matrix.
///  - Panics if `rhs.nrows() != triangular_upper.ncols()`
#[track_caller]
#[inline]
pub fn solve_upper_triangular_in_place_with_conj<E: ComplexField>(
    triangular_upper: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    check_dims(triangular_upper, &rhs);
    solve_impl(triangular_upper, conj_lhs, Diag::Generic, false, rhs, parallelism);
}

/// Computes the solution of `triangular_upper×X = rhs`, and stores the result in `rhs`.
#[track_caller]
#[inline]
pub fn solve_upper_triangular_in_place<E: ComplexField>(
    triangular_upper: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    solve_upper_triangular_in_place_with_conj(triangular_upper, Conj::No, rhs, parallelism)
}

/// Computes the solution of `Op_lhs(triangular_upper)×X = rhs`, with an implicit unit diagonal.
#[track_caller]
#[inline]
pub fn solve_unit_upper_triangular_in_place_with_conj<E: ComplexField>(
    triangular_upper: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    check_dims(triangular_upper, &rhs);
    solve_impl(triangular_upper, conj_lhs, Diag::Unit, false, rhs, parallelism);
}

/// Computes the solution of `triangular_upper×X = rhs`, with an implicit unit diagonal.
#[track_caller]
#[inline]
pub fn solve_unit_upper_triangular_in_place<E: ComplexField>(
    triangular_upper: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    solve_unit_upper_triangular_in_place_with_conj(triangular_upper, Conj::No, rhs, parallelism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, c64, linalg::matmul::matmul_with_conj, Mat};
    use assert_approx_eq::assert_approx_eq;
    use rand::random;

    fn random_tri(n: usize, lower: bool) -> Mat<c64> {
        Mat::from_fn(n, n, |i, j| {
            if i == j {
                c64::new(2.0 + random::<f64>(), random())
            } else if (i > j) == lower {
                c64::new(random(), random())
            } else {
                // garbage in the unused triangle
                c64::new(1e3, -1e3)
            }
        })
    }

    fn check(lower: bool, unit: bool, conj: Conj) {
        let n = 9;
        let k = 4;
        let tri = random_tri(n, lower);
        let b = Mat::from_fn(n, k, |_, _| c64::new(random(), random()));

        let mut x = b.clone();
        match (lower, unit) {
            (true, true) => solve_unit_lower_triangular_in_place_with_conj(
                tri.as_ref(),
                conj,
                x.as_mut(),
                Parallelism::None,
            ),
            (true, false) => solve_lower_triangular_in_place_with_conj(
                tri.as_ref(),
                conj,
                x.as_mut(),
                Parallelism::None,
            ),
            (false, true) => solve_unit_upper_triangular_in_place_with_conj(
                tri.as_ref(),
                conj,
                x.as_mut(),
                Parallelism::None,
            ),
            (false, false) => solve_upper_triangular_in_place_with_conj(
                tri.as_ref(),
                conj,
                x.as_mut(),
                Parallelism::None,
            ),
        }

        let clean = Mat::from_fn(n, n, |i, j| {
            if i == j {
                if unit {
                    c64::new(1.0, 0.0)
                } else {
                    tri.read(i, j)
                }
            } else if (i > j) == lower {
                tri.read(i, j)
            } else {
                c64::new(0.0, 0.0)
            }
        });

        let mut prod = Mat::<c64>::zeros(n, k);
        matmul_with_conj(
            prod.as_mut(),
            clean.as_ref(),
            conj,
            x.as_ref(),
            Conj::No,
            None,
            c64::new(1.0, 0.0),
            Parallelism::None,
        );
        for j in 0..k {
            for i in 0..n {
                assert_approx_eq!(prod.read(i, j).re, b.read(i, j).re);
                assert_approx_eq!(prod.read(i, j).im, b.read(i, j).im);
            }
        }
    }

    #[test]
    fn test_all_variants() {
        for lower in [true, false] {
            for unit in [true, false] {
                for conj in [Conj::No, Conj::Yes] {
                    check(lower, unit, conj);
                }
            }
        }
    }

    #[test]
    fn test_right_side_via_transpose() {
        // X U = B  <=>  U^T X^T = B^T
        let u = crate::mat![[2.0, 1.0], [0.0, 4.0f64]];
        let b = crate::mat![[2.0, 5.0]];
        let mut x = b.clone();
        solve_lower_triangular_in_place(
            u.as_ref().transpose(),
            x.as_mut().transpose_mut(),
            Parallelism::None,
        );
        assert_approx_eq!(x.read(0, 0), 1.0);
        assert_approx_eq!(x.read(0, 1), 1.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_matches_serial() {
        let n = 70;
        let l = Mat::from_fn(n, n, |i, j| if i == j { 4.0 } else { random::<f64>() });
        let b = Mat::from_fn(n, 40, |_, _| random::<f64>());
        let mut x0 = b.clone();
        let mut x1 = b.clone();
        solve_lower_triangular_in_place(l.as_ref(), x0.as_mut(), Parallelism::None);
        solve_lower_triangular_in_place(l.as_ref(), x1.as_mut(), Parallelism::Rayon(4));
        assert!(x0 == x1);
    }
}
