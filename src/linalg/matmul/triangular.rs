//! Products that only touch one triangular half of the destination.

use crate::{
    assert,
    mat::{MatMut, MatRef},
    utils::thread::{join_raw, parallelism_degree},
    ComplexField, Parallelism, Side,
};

fn rank_k_update_impl<E: ComplexField>(
    acc: MatMut<'_, E>,
    col_start: usize,
    side: Side,
    lhs: MatRef<'_, E>,
    alpha: Option<E>,
    beta: E,
    parallelism: Parallelism,
) {
    let mut acc = acc;
    let n = acc.nrows();
    let ncols = acc.ncols();

    if ncols >= 2 && parallelism_degree(parallelism) > 1 && n * ncols * lhs.ncols() >= 32 * 32 * 32
    {
        let mid = ncols / 2;
        let (left, right) = acc.split_at_col_mut(mid);
        join_raw(
            |parallelism| rank_k_update_impl(left, col_start, side, lhs, alpha, beta, parallelism),
            |parallelism| {
                rank_k_update_impl(right, col_start + mid, side, lhs, alpha, beta, parallelism)
            },
            parallelism,
        );
        return;
    }

    let k = lhs.ncols();
    for jj in 0..ncols {
        let j = col_start + jj;
        let rows = match side {
            Side::Lower => j..n,
            Side::Upper => 0..j + 1,
        };
        for i in rows {
            let mut sum = E::zero();
            for p in 0..k {
                sum += unsafe { lhs.read_unchecked(i, p) * lhs.read_unchecked(j, p).conj() };
            }
            let prev = match alpha {
                Some(alpha) => alpha * unsafe { acc.read_unchecked(i, jj) },
                None => E::zero(),
            };
            unsafe { acc.write_unchecked(i, jj, prev + beta * sum) };
        }
    }
}

/// Computes the Hermitian rank-k update `[alpha * acc] + beta * lhs * lhs^H` on the lower or
/// upper triangle of `acc`, including the diagonal. The other triangle is neither read nor
/// written.
///
/// # Panics
///
/// Panics if `acc` is not square, or if `lhs.nrows() != acc.nrows()`.
#[track_caller]
pub fn rank_k_update<E: ComplexField>(
    acc: MatMut<'_, E>,
    side: Side,
    lhs: MatRef<'_, E>,
    alpha: Option<E>,
    beta: E,
    parallelism: Parallelism,
) {
    assert!(all(acc.nrows() == acc.ncols(), lhs.nrows() == acc.nrows()));
    rank_k_update_impl(acc, 0, side, lhs, alpha, beta, parallelism);
}
