use crate::{
    assert,
    linalg::{matmul::matmul, temp_mat_req, temp_mat_uninit},
    perm::PermRef,
    ComplexField, MatMut, MatRef, Parallelism,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for reconstructing a matrix out of place,
/// given its full pivoting LU decomposition.
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

/// Computes the reconstructed matrix, given its full pivoting LU decomposition,
/// and stores the result in `dst`.
///
/// # Panics
///
/// - Panics if the row permutation doesn't have the same dimension as the number of rows of the
///   matrix.
/// - Panics if the column permutation doesn't have the same dimension as the number of columns of
///   the matrix.
/// - Panics if the destination shape doesn't match the shape of the matrix.
/// - Panics if the provided memory in `stack` is insufficient (see [`reconstruct_req`]).
#[track_caller]
pub fn reconstruct<E: ComplexField>(
    dst: MatMut<'_, E>,
    lu_factors: MatRef<'_, E>,
    row_perm: PermRef<'_>,
    col_perm: PermRef<'_>,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) {
    assert!((dst.nrows(), dst.ncols()) == (lu_factors.nrows(), lu_factors.ncols()));
    assert!((row_perm.len(), col_perm.len()) == (lu_factors.nrows(), lu_factors.ncols()));

    let mut dst = dst;
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

    // row `i` (resp. column `j`) of the original matrix sits at `row_fwd[i]` (resp. `col_fwd[j]`)
    let row_fwd = row_perm.arrays().0;
    let col_fwd = col_perm.arrays().0;
    for j in 0..n {
        for i in 0..m {
            dst.write(i, j, lu.read(row_fwd[i], col_fwd[j]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat, perm::Perm, Mat};

    macro_rules! make_stack {
        ($req: expr) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    #[test]
    fn undoes_row_and_column_permutations() {
        // L = I, U = [[1, 2], [0, 3]], rows and columns both swapped
        let lu = mat![[1.0, 2.0], [0.0, 3.0f64]];
        let swap = Perm::from_forward(vec![1, 0].into_boxed_slice());
        let mut dst = Mat::<f64>::zeros(2, 2);
        reconstruct(
            dst.as_mut(),
            lu.as_ref(),
            swap.as_ref(),
            swap.as_ref(),
            Parallelism::None,
            make_stack!(reconstruct_req::<f64>(2, 2)),
        );
        assert!(dst == mat![[3.0, 0.0], [2.0, 1.0f64]]);
    }
}
