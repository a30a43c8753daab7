use crate::{
    assert,
    linalg::triangular_solve::{
        solve_unit_lower_triangular_in_place, solve_upper_triangular_in_place,
    },
    perm::PermRef,
    ComplexField, MatMut, MatRef, Parallelism,
};
use reborrow::*;

/// Computes the inverse of a matrix, given its partial pivoting LU decomposition, and stores the
/// result in `dst`.
///
/// The inverse is obtained by solving $LU X = P$ column by column.
///
/// # Panics
///
/// - Panics if `lu_factors` is not a square matrix.
/// - Panics if the row permutation doesn't have the same dimension as the matrix.
/// - Panics if the destination shape doesn't match the shape of the matrix.
#[track_caller]
pub fn invert<E: ComplexField>(
    dst: MatMut<'_, E>,
    lu_factors: MatRef<'_, E>,
    row_perm: PermRef<'_>,
    parallelism: Parallelism,
) {
    let n = lu_factors.nrows();
    assert!(all(
        lu_factors.ncols() == n,
        dst.nrows() == n,
        dst.ncols() == n,
        row_perm.len() == n,
    ));

    let mut dst = dst;
    dst.fill_zero();
    let (_, perm_inv) = row_perm.arrays();
    for (i, &p) in perm_inv.iter().enumerate() {
        dst.write(i, p, E::one());
    }

    solve_unit_lower_triangular_in_place(lu_factors, dst.rb_mut(), parallelism);
    solve_upper_triangular_in_place(lu_factors, dst.rb_mut(), parallelism);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{
            lu::{partial_pivoting::compute, LuParams},
            matmul::matmul,
        },
        Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::{GlobalPodBuffer, PodStack};
    use rand::random;

    #[test]
    fn test_inverse() {
        for n in [1, 2, 9, 31] {
            let a = Mat::from_fn(n, n, |_, _| random::<f64>());
            let mut lu = a.clone();
            let mut perm = vec![0usize; n];
            let mut perm_inv = vec![0usize; n];
            let params = LuParams { blocksize: 4 };
            let mut mem =
                GlobalPodBuffer::new(compute::lu_in_place_req::<f64>(n, n, params).unwrap());
            let (_, row_perm) = compute::lu_in_place(
                lu.as_mut(),
                &mut perm,
                &mut perm_inv,
                params,
                Parallelism::None,
                PodStack::new(&mut mem),
            )
            .unwrap();

            let mut inv = Mat::<f64>::zeros(n, n);
            invert(inv.as_mut(), lu.as_ref(), row_perm, Parallelism::None);

            let mut prod = Mat::<f64>::zeros(n, n);
            matmul(prod.as_mut(), a.as_ref(), inv.as_ref(), None, 1.0, Parallelism::None);
            for j in 0..n {
                for i in 0..n {
                    let target = if i == j { 1.0 } else { 0.0 };
                    assert_approx_eq!(prod.read(i, j), target, 1e-7);
                }
            }
        }
    }
}
