//! Matrix multiplication.
//!
//! The kernels accumulate every entry of the product in a fixed order over the inner dimension,
//! so the result does not depend on how the work is split between threads.

use crate::{
    assert,
    mat::{MatMut, MatRef},
    utils::thread::{join_raw, parallelism_degree},
    ComplexField, Conj, Parallelism,
};

pub mod triangular;

const PAR_THRESHOLD: usize = 48 * 48 * 48;

fn matmul_serial<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatRef<'_, E>,
    conj_rhs: Conj,
    alpha: Option<E>,
    beta: E,
) {
    let mut acc = acc;
    let m = acc.nrows();
    let n = acc.ncols();
    let k = lhs.ncols();

    for j in 0..n {
        for i in 0..m {
            let mut sum = E::zero();
            for p in 0..k {
                let l = conj_lhs.apply(unsafe { lhs.read_unchecked(i, p) });
                let r = conj_rhs.apply(unsafe { rhs.read_unchecked(p, j) });
                sum += l * r;
            }
            let prev = match alpha {
                Some(alpha) => alpha * unsafe { acc.read_unchecked(i, j) },
                None => E::zero(),
            };
            unsafe { acc.write_unchecked(i, j, prev + beta * sum) };
        }
    }
}

fn matmul_impl<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatRef<'_, E>,
    conj_rhs: Conj,
    alpha: Option<E>,
    beta: E,
    parallelism: Parallelism,
) {
    let n = acc.ncols();
    let work = acc.nrows().saturating_mul(n).saturating_mul(lhs.ncols());

    if n >= 2 && parallelism_degree(parallelism) > 1 && work >= PAR_THRESHOLD {
        let (acc_left, acc_right) = acc.split_at_col_mut(n / 2);
        let (rhs_left, rhs_right) = rhs.split_at_col(n / 2);
        join_raw(
            |parallelism| {
                matmul_impl(
                    acc_left,
                    lhs,
                    conj_lhs,
                    rhs_left,
                    conj_rhs,
                    alpha,
                    beta,
                    parallelism,
                )
            },
            |parallelism| {
                matmul_impl(
                    acc_right,
                    lhs,
                    conj_lhs,
                    rhs_right,
                    conj_rhs,
                    alpha,
                    beta,
                    parallelism,
                )
            },
            parallelism,
        );
    } else {
        matmul_serial(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta);
    }
}

/// Computes the matrix product `[alpha * acc] + beta * lhs * rhs` (while optionally conjugating
/// either or both of the input matrices) and stores the result in `acc`.
///
/// Performs the operation:
/// - `acc = beta * Op_lhs(lhs) * Op_rhs(rhs)` if `alpha` is `None` (in this case, the preexisting
/// values in `acc` are not read),
/// - `acc = alpha * acc + beta * Op_lhs(lhs) * Op_rhs(rhs)` if `alpha` is `Some(_)`,
///
/// `Op_lhs` is the identity if `conj_lhs` is `Conj::No`, and the conjugation operation if it is
/// `Conj::Yes`.
/// `Op_rhs` is the identity if `conj_rhs` is `Conj::No`, and the conjugation operation if it is
/// `Conj::Yes`.
///
/// # Panics
///
/// Panics if the matrix dimensions are not compatible for matrix multiplication.
/// i.e.
///  - `acc.nrows() == lhs.nrows()`
///  - `acc.ncols() == rhs.ncols()`
///  - `lhs.ncols() == rhs.nrows()`
///
/// # Example
///
/// ```
/// use gridla::{linalg::matmul::matmul_with_conj, mat, Conj, Mat, Parallelism};
///
/// let lhs = mat![[0.0, 2.0], [1.0, 3.0]];
/// let rhs = mat![[4.0, 6.0], [5.0, 7.0]];
///
/// let mut acc = Mat::<f64>::zeros(2, 2);
/// matmul_with_conj(
///     acc.as_mut(),
///     lhs.as_ref(),
///     Conj::No,
///     rhs.as_ref(),
///     Conj::No,
///     None,
///     2.5,
///     Parallelism::None,
/// );
///
/// assert_eq!(acc.read(0, 0), 2.5 * (0.0 * 4.0 + 2.0 * 5.0));
/// assert_eq!(acc.read(1, 1), 2.5 * (1.0 * 6.0 + 3.0 * 7.0));
/// ```
#[track_caller]
#[inline]
pub fn matmul_with_conj<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatRef<'_, E>,
    conj_rhs: Conj,
    alpha: Option<E>,
    beta: E,
    parallelism: Parallelism,
) {
    assert!(all(
        acc.nrows() == lhs.nrows(),
        acc.ncols() == rhs.ncols(),
        lhs.ncols() == rhs.nrows(),
    ));
    matmul_impl(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta, parallelism);
}

/// Computes the matrix product `[alpha * acc] + beta * lhs * rhs` and stores the result in
/// `acc`.
///
/// See [`matmul_with_conj`].
#[track_caller]
#[inline]
pub fn matmul<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    rhs: MatRef<'_, E>,
    alpha: Option<E>,
    beta: E,
    parallelism: Parallelism,
) {
    matmul_with_conj(acc, lhs, Conj::No, rhs, Conj::No, alpha, beta, parallelism)
}
