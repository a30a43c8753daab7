use crate::{
    assert,
    linalg::{matmul::matmul, temp_mat_req, temp_mat_uninit},
    perm::{permute_rows, PermRef},
    ComplexField, MatMut, MatRef, Parallelism,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for reconstructing a matrix out of place,
/// given its partial pivoting LU decomposition.
pub fn reconstruct_req<E: ComplexField>(
    nrows: usize,
    ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    let size = Ord::min(nrows, ncols);
    StackReq::try_all_of([
        temp_mat_req::<E>(nrows, size)?,
        temp_mat_req::<E>(size, ncols)?,
        temp_mat_req::<E>(nrows, ncols)?,
    ])
}

/// Computes the reconstructed matrix, given its partial pivoting LU decomposition,
/// and stores the result in `dst`.
///
/// # Panics
///
/// - Panics if the row permutation doesn't have the same dimension as the number of rows of the
/// matrix.
/// - Panics if the destination shape doesn't match the shape of the matrix.
/// - Panics if the provided memory in `stack` is insufficient (see [`reconstruct_req`]).
#[track_caller]
pub fn reconstruct<E: ComplexField>(
    dst: MatMut<'_, E>,
    lu_factors: MatRef<'_, E>,
    row_perm: PermRef<'_>,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) {
    assert!((dst.nrows(), dst.ncols()) == (lu_factors.nrows(), lu_factors.ncols()));
    assert!(row_perm.len() == lu_factors.nrows());

    let m = lu_factors.nrows();
    let n = lu_factors.ncols();
    let size = Ord::min(m, n);

    let (mut l, stack) = temp_mat_uninit::<E>(m, size, stack);
    let (mut u, stack) = temp_mat_uninit::<E>(size, n, stack);
    let (mut lu, _) = temp_mat_uninit::<E>(m, n, stack);

    for j in 0..size {
        for i in 0..m {
            let v = if i == j {
                E::one()
            } else if i > j {
                lu_factors.read(i, j)
            } else {
                E::zero()
            };
            l.write(i, j, v);
        }
    }
    for j in 0..n {
        for i in 0..size {
            let v = if i <= j {
                lu_factors.read(i, j)
            } else {
                E::zero()
            };
            u.write(i, j, v);
        }
    }

    matmul(lu.rb_mut(), l.rb(), u.rb(), None, E::one(), parallelism);
    permute_rows(dst, lu.rb(), row_perm.inverse());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat, perm::Perm, Mat};

    #[test]
    fn reconstruct_applies_inverse_permutation() {
        // L = [1 0; 0.5 1], U = [4 3; 0 -0.5], rows swapped
        let lu = mat![[4.0, 3.0], [0.5, -0.5f64]];
        let perm = Perm::from_forward(vec![1, 0].into_boxed_slice());
        let mut dst = Mat::<f64>::zeros(2, 2);
        reconstruct(
            dst.as_mut(),
            lu.as_ref(),
            perm.as_ref(),
            Parallelism::None,
            PodStack::new(&mut dyn_stack::GlobalPodBuffer::new(
                reconstruct_req::<f64>(2, 2).unwrap(),
            )),
        );
        assert!(dst == mat![[2.0, 1.0], [4.0, 3.0f64]]);
    }

    #[test]
    fn reconstruct_wide_factors() {
        let lu = mat![[2.0, 1.0, 3.0], [0.5, 1.0, 1.0f64]];
        let perm = Perm::identity(2);
        let mut dst = Mat::<f64>::zeros(2, 3);
        reconstruct(
            dst.as_mut(),
            lu.as_ref(),
            perm.as_ref(),
            Parallelism::None,
            PodStack::new(&mut dyn_stack::GlobalPodBuffer::new(
                reconstruct_req::<f64>(2, 3).unwrap(),
            )),
        );
        assert!(dst == mat![[2.0, 1.0, 3.0], [1.0, 1.5, 2.5f64]]);
    }
}
