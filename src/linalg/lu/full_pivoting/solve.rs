use crate::{
    assert,
    linalg::{
        temp_mat_req, temp_mat_uninit,
        triangular_solve::{
            solve_unit_lower_triangular_in_place_with_conj,
            solve_upper_triangular_in_place_with_conj,
        },
    },
    perm::{permute_rows, PermRef},
    ComplexField, Conj, MatMut, MatRef, Parallelism,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for solving a linear system defined by a
/// matrix, given its full pivoting LU decomposition.
pub fn solve_in_place_req<E: ComplexField>(
    lu_dim: usize,
    rhs_ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    temp_mat_req::<E>(lu_dim, rhs_ncols)
}

/// Given the LU factors of a matrix $A$ and a matrix $B$ stored in `rhs`, this function computes
/// the solution of the linear system:
/// $$\text{Op}_A(A)X = B.$$
///
/// $\text{Op}_A$ is either the identity or the conjugation depending on the value of `conj_lhs`.
///
/// The solution of the linear system is stored in `rhs`.
///
/// # Panics
///
/// - Panics if `lu_factors` is not a square matrix.
/// - Panics if the row or column permutation doesn't have the same dimension as the matrix.
/// - Panics if `rhs` doesn't have the same number of rows as the dimension of `lu_factors`.
/// - Panics if the provided memory in `stack` is insufficient (see [`solve_in_place_req`]).
#[track_caller]
pub fn solve_in_place<E: ComplexField>(
    lu_factors: MatRef<'_, E>,
    row_perm: PermRef<'_>,
    col_perm: PermRef<'_>,
    conj_lhs: Conj,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) {
    let n = lu_factors.nrows();
    assert!(all(
        lu_factors.ncols() == n,
        rhs.nrows() == n,
        row_perm.len() == n,
        col_perm.len() == n,
    ));

    let mut rhs = rhs;
    let (mut temp, _) = temp_mat_uninit::<E>(rhs.nrows(), rhs.ncols(), stack);

    permute_rows(temp.rb_mut(), rhs.rb(), row_perm);
    solve_unit_lower_triangular_in_place_with_conj(
        lu_factors,
        conj_lhs,
        temp.rb_mut(),
        parallelism,
    );
    solve_upper_triangular_in_place_with_conj(lu_factors, conj_lhs, temp.rb_mut(), parallelism);
    permute_rows(rhs.rb_mut(), temp.rb(), col_perm.inverse());
}
