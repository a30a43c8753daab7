use crate::{
    linalg::lu::{lu_blocked_in_place, lu_blocked_req, LuParams},
    ComplexField, MatMut, Parallelism, Result,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};

/// Computes the size and alignment of required workspace for performing an LU
/// decomposition without pivoting.
pub fn lu_in_place_req<E: ComplexField>(
    m: usize,
    n: usize,
    params: LuParams,
) -> Result<StackReq, SizeOverflow> {
    lu_blocked_req(m, n, Ord::max(params.blocksize, 1), false)
}

/// Computes the LU decomposition of the given matrix without pivoting, replacing the matrix
/// with its factors in place.
///
/// $L$ is stored in the strictly lower triangular half of `matrix`, with an implicit unit
/// diagonal, and $U$ is stored in the upper triangular half of `matrix`.
///
/// # Errors
///
/// - [`crate::Error::InvalidParameter`] if `params.blocksize` is zero. The matrix is not modified
///   in that case.
pub fn lu_in_place<E: ComplexField>(
    matrix: MatMut<'_, E>,
    params: LuParams,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<()> {
    params.check("lu_no_pivot_in_place")?;
    lu_blocked_in_place(matrix, None, params.blocksize, parallelism, stack);
    Ok(())
}
