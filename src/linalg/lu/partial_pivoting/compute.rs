use crate::{
    linalg::lu::{lu_blocked_in_place, lu_blocked_req, LuParams},
    perm::PermRef,
    ComplexField, Error, MatMut, Parallelism, Result,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};

/// Information about the resulting LU factorization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartialPivLuInfo {
    /// Number of transpositions that were performed, can be used to compute the determinant of
    /// $P$.
    pub transposition_count: usize,
}

/// Computes the size and alignment of required workspace for performing an LU
/// decomposition with partial pivoting.
pub fn lu_in_place_req<E: ComplexField>(
    m: usize,
    n: usize,
    params: LuParams,
) -> Result<StackReq, SizeOverflow> {
    lu_blocked_req(m, n, Ord::max(params.blocksize, 1), true)
}

/// Computes the LU decomposition of the given matrix with partial pivoting, replacing the matrix
/// with its factors in place.
///
/// The decomposition is such that:
/// $$PA = LU,$$
/// where $P$ is a permutation matrix, $L$ is a unit lower triangular matrix, and $U$ is an upper
/// triangular matrix.
///
/// $L$ is stored in the strictly lower triangular half of `matrix`, with an implicit unit
/// diagonal, $U$ is stored in the upper triangular half of `matrix`, and the permutation
/// representing $P$ is stored in `perm` and `perm_inv`.
///
/// After the function returns, `perm_inv[i]` is the row of the original matrix that is now row
/// `i` of the factors, i.e. the result is the same as computing the non-pivoted LU decomposition
/// of the matrix `matrix[perm_inv, :]`. `perm[j]` is the position that original row `j` was
/// moved to.
///
/// # Output
///
/// - The number of transpositions that constitute the permutation,
/// - a structure representing the permutation $P$, with `perm` as its forward array and
///   `perm_inv` as its inverse.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if the length of the permutation slices is not equal to the
///   number of rows of the matrix.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
///
/// No argument is modified when an error is returned.
///
/// # Panics
///
/// - Panics if the provided memory in `stack` is insufficient (see [`lu_in_place_req`]).
pub fn lu_in_place<'out, E: ComplexField>(
    matrix: MatMut<'_, E>,
    perm: &'out mut [usize],
    perm_inv: &'out mut [usize],
    params: LuParams,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<(PartialPivLuInfo, PermRef<'out>)> {
    const OP: &str = "lu_in_place";

    let m = matrix.nrows();
    let n = matrix.ncols();
    for len in [perm.len(), perm_inv.len()] {
        if len != m {
            return Err(Error::DimensionMismatch {
                op: OP,
                expected: (m, 1),
                found: (len, 1),
            });
        }
    }
    params.check(OP)?;

    if matrix.row_stride().unsigned_abs() != 1 && matrix.col_stride().unsigned_abs() != 1 {
        crate::__perf_warn!(
            "LU with partial pivoting prefers column-major or row-major matrix. Found matrix with generic strides."
        );
    }

    for (i, p) in perm_inv.iter_mut().enumerate() {
        *p = i;
    }

    let n_transpositions = lu_blocked_in_place(
        matrix,
        Some(&mut *perm_inv),
        params.blocksize,
        parallelism,
        stack,
    );

    for (i, &p) in perm_inv.iter().enumerate() {
        perm[p] = i;
    }
    log::debug!("partial pivoting LU of a {m}×{n} matrix: {n_transpositions} transpositions");

    Ok((
        PartialPivLuInfo {
            transposition_count: n_transpositions,
        },
        unsafe { PermRef::new_unchecked(perm, perm_inv) },
    ))
}
