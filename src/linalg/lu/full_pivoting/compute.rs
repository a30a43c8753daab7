use crate::{
    linalg::matmul::matmul,
    perm::{pivots_to_perm, PermRef},
    ComplexField, Error, MatMut, MatRef, Parallelism, Result,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Information about the resulting LU factorization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FullPivLuInfo {
    /// Number of transpositions that were performed, can be used to compute the determinant of
    /// $PQ$.
    pub transposition_count: usize,
}

/// Entry of largest [`ComplexField::score`] in `a`, as `(score, row, col)`. Ties go to the first
/// entry in column-major order. Returns `None` if `a` is empty.
pub(crate) fn best_pivot<E: ComplexField>(a: MatRef<'_, E>) -> Option<(E::Real, usize, usize)> {
    let mut best: Option<(E::Real, usize, usize)> = None;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let score = a.read(i, j).score();
            match best {
                Some((max, _, _)) if !(score > max) => {}
                _ => best = Some((score, i, j)),
            }
        }
    }
    best
}

/// Eliminates the first column of `a`, whose top left entry is the pivot: the column below the
/// pivot is divided by it, and the trailing matrix receives the rank one update.
pub(crate) fn eliminate<E: ComplexField>(a: MatMut<'_, E>, parallelism: Parallelism) {
    let (pivot, row, mut col, a22) = a.split_at_mut(1, 1);
    let inv = pivot.read(0, 0).inv();
    for i in 0..col.nrows() {
        let v = col.read(i, 0);
        col.write(i, 0, v * inv);
    }
    matmul(
        a22,
        col.rb(),
        row.rb(),
        Some(E::one()),
        -E::one(),
        parallelism,
    );
}

/// Computes the size and alignment of required workspace for performing an LU
/// decomposition with full pivoting.
pub fn lu_in_place_req<E: ComplexField>(m: usize, n: usize) -> Result<StackReq, SizeOverflow> {
    let size = Ord::min(m, n);
    StackReq::try_all_of([
        StackReq::try_new::<usize>(size)?,
        StackReq::try_new::<usize>(size)?,
    ])
}

/// Computes the LU decomposition of the given matrix with full pivoting, replacing the matrix
/// with its factors in place.
///
/// The decomposition is such that:
/// $$PAQ = LU,$$
/// where $P$ and $Q$ are permutation matrices, $L$ is a unit lower triangular matrix, and $U$ is
/// an upper triangular matrix.
///
/// - $L$ is stored in the strictly lower triangular half of `matrix`, with an implicit unit
///   diagonal,
/// - $U$ is stored in the upper triangular half of `matrix`,
/// - the permutation representing $P$ is stored in `row_perm` and `row_perm_inv`,
/// - the permutation representing $Q$ is stored in `col_perm` and `col_perm_inv`.
///
/// At step `k`, the entry of largest score in the trailing matrix is moved to position `(k, k)`,
/// the first one in column-major order on ties. After the function returns, `row_perm_inv[i]`
/// (resp. `col_perm_inv[j]`) is the row (resp. column) of the original matrix that is now row `i`
/// (resp. column `j`) of the factors, i.e. the result is the same as computing the non-pivoted LU
/// decomposition of `matrix[row_perm_inv, col_perm_inv]`.
///
/// # Output
///
/// - The number of transpositions that constitute both permutations,
/// - a structure representing the permutation $P$,
/// - a structure representing the permutation $Q$.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if the length of the row (resp. column) permutation slices is
///   not equal to the number of rows (resp. columns) of the matrix.
///
/// No argument is modified when an error is returned.
///
/// # Panics
///
/// - Panics if the provided memory in `stack` is insufficient (see [`lu_in_place_req`]).
pub fn lu_in_place<'out, E: ComplexField>(
    matrix: MatMut<'_, E>,
    row_perm: &'out mut [usize],
    row_perm_inv: &'out mut [usize],
    col_perm: &'out mut [usize],
    col_perm_inv: &'out mut [usize],
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<(FullPivLuInfo, PermRef<'out>, PermRef<'out>)> {
    const OP: &str = "full_piv_lu_in_place";

    let mut matrix = matrix;
    let m = matrix.nrows();
    let n = matrix.ncols();
    for (len, expected) in [
        (row_perm.len(), m),
        (row_perm_inv.len(), m),
        (col_perm.len(), n),
        (col_perm_inv.len(), n),
    ] {
        if len != expected {
            return Err(Error::DimensionMismatch {
                op: OP,
                expected: (expected, 1),
                found: (len, 1),
            });
        }
    }

    let size = Ord::min(m, n);
    let (row_pivots, stack) = stack.make_with(size, |_| 0usize);
    let (col_pivots, _) = stack.make_with(size, |_| 0usize);

    let mut n_transpositions = 0;
    for k in 0..size {
        let (i, j) = match best_pivot(matrix.rb().submatrix(k, k, m - k, n - k)) {
            Some((_, i, j)) => (i + k, j + k),
            None => (k, k),
        };

        row_pivots[k] = i;
        col_pivots[k] = j;
        if i != k {
            n_transpositions += 1;
            matrix.swap_rows(k, i);
        }
        if j != k {
            n_transpositions += 1;
            matrix.swap_cols(k, j);
        }

        eliminate(matrix.rb_mut().submatrix_mut(k, k, m - k, n - k), parallelism);
    }

    let row = pivots_to_perm(row_pivots, row_perm, row_perm_inv);
    let col = pivots_to_perm(col_pivots, col_perm, col_perm_inv);
    log::debug!(
        "full pivoting LU of a {m}×{n} matrix: {n_transpositions} transpositions",
    );

    Ok((
        FullPivLuInfo {
            transposition_count: n_transpositions,
        },
        row,
        col,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert, c64,
        linalg::{lu::full_pivoting::reconstruct, reductions::norm_frobenius},
        mat, Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use rand::random;

    macro_rules! make_stack {
        ($req: expr) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    struct Factors<E> {
        lu: Mat<E>,
        row_fwd: Vec<usize>,
        row_inv: Vec<usize>,
        col_fwd: Vec<usize>,
        col_inv: Vec<usize>,
        info: FullPivLuInfo,
    }

    fn factor<E: ComplexField>(a: &Mat<E>, parallelism: Parallelism) -> Factors<E> {
        let (m, n) = (a.nrows(), a.ncols());
        let mut lu = a.clone();
        let mut row_fwd = vec![0usize; m];
        let mut row_inv = vec![0usize; m];
        let mut col_fwd = vec![0usize; n];
        let mut col_inv = vec![0usize; n];
        let (info, _, _) = lu_in_place(
            lu.as_mut(),
            &mut row_fwd,
            &mut row_inv,
            &mut col_fwd,
            &mut col_inv,
            parallelism,
            make_stack!(lu_in_place_req::<E>(m, n)),
        )
        .unwrap();
        Factors {
            lu,
            row_fwd,
            row_inv,
            col_fwd,
            col_inv,
            info,
        }
    }

    fn reconstruct_matrix<E: ComplexField>(f: &Factors<E>) -> Mat<E> {
        let (m, n) = (f.lu.nrows(), f.lu.ncols());
        let mut dst = Mat::zeros(m, n);
        reconstruct::reconstruct(
            dst.as_mut(),
            f.lu.as_ref(),
            PermRef::new_checked(&f.row_fwd, &f.row_inv),
            PermRef::new_checked(&f.col_fwd, &f.col_inv),
            Parallelism::None,
            make_stack!(reconstruct::reconstruct_req::<E>(m, n)),
        );
        dst
    }

    #[test]
    fn compute_lu() {
        for (m, n) in [(1, 1), (4, 4), (7, 3), (3, 7), (30, 30), (41, 17)] {
            let a = Mat::from_fn(m, n, |_, _| c64::new(random::<f64>(), random::<f64>()));
            for parallelism in [Parallelism::None, Parallelism::Rayon(4)] {
                let f = factor(&a, parallelism);
                let rec = reconstruct_matrix(&f);
                for j in 0..n {
                    for i in 0..m {
                        assert_approx_eq!(rec.read(i, j).re, a.read(i, j).re, 1e-10);
                        assert_approx_eq!(rec.read(i, j).im, a.read(i, j).im, 1e-10);
                    }
                }
            }
        }
    }

    #[test]
    fn permuted_matrix_equals_product_of_factors() {
        let n = 12;
        let a = Mat::from_fn(n, n, |_, _| random::<f64>() - 0.5);
        let f = factor(&a, Parallelism::None);

        // P A Q, from the inverse arrays
        let paq = Mat::from_fn(n, n, |i, j| a.read(f.row_inv[i], f.col_inv[j]));
        let l = Mat::from_fn(n, n, |i, j| match i.cmp(&j) {
            core::cmp::Ordering::Greater => f.lu.read(i, j),
            core::cmp::Ordering::Equal => 1.0,
            core::cmp::Ordering::Less => 0.0,
        });
        let u = Mat::from_fn(n, n, |i, j| if i <= j { f.lu.read(i, j) } else { 0.0 });
        let mut diff = paq.clone();
        matmul(
            diff.as_mut(),
            l.as_ref(),
            u.as_ref(),
            Some(1.0),
            -1.0,
            Parallelism::None,
        );
        let residual = norm_frobenius(diff.as_ref()) / norm_frobenius(a.as_ref());
        assert!(residual <= 10.0 * n as f64 * f64::EPSILON);

        // every multiplier is bounded by one
        for j in 0..n {
            for i in j + 1..n {
                assert!(f.lu.read(i, j).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn picks_largest_entry_of_trailing_matrix() {
        let a = mat![[1.0, 2.0, 0.5], [-9.0, 3.0, 9.0], [4.0, 1.0, 0.0f64]];
        let f = factor(&a, Parallelism::None);

        // -9 and 9 tie, the first one in column-major order wins
        assert!(all(f.row_inv[0] == 1, f.col_inv[0] == 0));
        assert!(f.lu.read(0, 0) == -9.0);
        assert!(f.info.transposition_count >= 1);
    }

    #[test]
    fn rank_deficient() {
        let a = mat![[1.0, 2.0], [2.0, 4.0f64]];
        let f = factor(&a, Parallelism::None);
        assert!(f.lu.read(1, 1) == 0.0);
        let rec = reconstruct_matrix(&f);
        assert!(rec == a);
    }

    #[test]
    fn wrong_permutation_length() {
        let mut a = Mat::<f64>::identity(3, 2);
        let mut r = [0usize; 3];
        let mut ri = [0usize; 3];
        let mut c = [0usize; 3];
        let mut ci = [0usize; 2];
        let result = lu_in_place(
            a.as_mut(),
            &mut r,
            &mut ri,
            &mut c,
            &mut ci,
            Parallelism::None,
            make_stack!(lu_in_place_req::<f64>(3, 2)),
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
        assert!(a == Mat::identity(3, 2));
    }
}
