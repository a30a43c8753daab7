//! LU factorization of matrices distributed as `[Mc, Mr]`.
//!
//! The block loop is the one of [`crate::linalg::lu`]. At every step the panel is split into its
//! diagonal block, replicated on every rank as `[Star, Star]`, and the block below it,
//! redistributed as `[Mc, Star]` so that each grid column holds full panel rows. The panel is then
//! factored redundantly by every grid column, pivot searches and row swaps being resolved within
//! the column communicator. The block row of $U$ is solved as `[Star, Vr]`, and the trailing
//! update is a purely local product of `[Mc, Star]` and `[Star, Mr]` operands.
//!
//! Every entry goes through the same floating point operations, in the same order, as in the
//! local factorization.
//!
//! The full pivoting variant searches the trailing matrix of every step with a single world
//! gather of per-rank candidates, and interchanges rows and columns with point-to-point style
//! exchanges that only move the two affected indices.
//!
//! The factors are consumed by [`solve_in_place`] and [`invert`], which apply the row
//! permutation with [`permute_rows`] and then run the distributed triangular solves.

use super::{
    grid::{check_same_grid, Grid},
    matrix::{DistMatMut, DistMatRef, Element},
    perm::{permute_moved, permute_rows, swap, Along},
    redist::redistribute_on,
    triangular_solve::{
        solve_unit_lower_triangular_in_place_with_conj, solve_upper_triangular_in_place_with_conj,
    },
    Dist,
};
use crate::{
    linalg::{
        lu::{
            full_pivoting::{compute::best_pivot, FullPivLuInfo},
            partial_pivoting::PartialPivLuInfo,
            LuParams,
        },
        matmul::matmul,
        triangular_solve::solve_unit_lower_triangular_in_place,
    },
    perm::{pivots_to_perm_from_identity, reset_touched, touched_slots, PermRef},
    ComplexField, Conj, Error, MatMut, Parallelism, Result,
};
use reborrow::*;

fn check_matrix<E: Element>(op: &'static str, a: DistMatRef<'_, E>) -> Result<()> {
    if (a.col_dist(), a.row_dist()) != (Dist::Mc, Dist::Mr) {
        return Err(Error::InvalidDistribution {
            op,
            reason: "matrix must be distributed as [Mc, Mr]",
        });
    }
    Ok(())
}

// `preimage` must be a `[Vc, Star]` column vector of length `len` on the grid of `a`
fn check_preimage<E: Element>(
    op: &'static str,
    a: DistMatRef<'_, E>,
    preimage: DistMatRef<'_, usize>,
    len: usize,
) -> Result<()> {
    check_same_grid(op, a.grid(), preimage.grid())?;
    if (preimage.col_dist(), preimage.row_dist()) != (Dist::Vc, Dist::Star) {
        return Err(Error::InvalidDistribution {
            op,
            reason: "preimage must be distributed as [Vc, Star]",
        });
    }
    if (preimage.nrows(), preimage.ncols()) != (len, 1) {
        return Err(Error::DimensionMismatch {
            op,
            expected: (len, 1),
            found: (preimage.nrows(), preimage.ncols()),
        });
    }
    Ok(())
}

fn init_preimage(preimage: DistMatMut<'_, usize>) {
    let mut preimage = preimage;
    let rows: Vec<usize> = (0..preimage.rb().local().nrows())
        .map(|li| preimage.rb().global_row(li))
        .collect();
    let mut local = preimage.local_mut();
    for (li, &i) in rows.iter().enumerate() {
        local.write(li, 0, i);
    }
}

/// Factors the panel made of the replicated diagonal block `a11` and the `[Mc, Star]` block
/// `a21` below it. Returns the number of row swaps.
fn panel_in_place<E: ComplexField>(
    grid: &Grid,
    a11: MatMut<'_, E>,
    a21: DistMatMut<'_, E>,
    pivots: Option<&mut [usize]>,
) -> Result<usize> {
    let mut a11 = a11;
    let mut a21 = a21;
    let mut pivots = pivots;
    let nb = a11.ncols();
    let comm = grid.col_comm();

    let a21_rows: Vec<usize> = (0..a21.rb().local().nrows())
        .map(|li| a21.rb().global_row(li))
        .collect();
    let a21_layout = a21.layout();

    let mut n_transpositions = 0;
    for c in 0..nb {
        if let Some(pivots) = pivots.as_deref_mut() {
            let mut best = a11.read(c, c).score();
            let mut best_row = c;
            for r in c + 1..nb {
                let score = a11.read(r, c).score();
                if score > best {
                    best = score;
                    best_row = r;
                }
            }
            {
                let local = a21.rb().local();
                for (li, &g) in a21_rows.iter().enumerate() {
                    let score = local.read(li, c).score();
                    if score > best {
                        best = score;
                        best_row = nb + g;
                    }
                }
            }

            let candidates = comm.all_gather((best, best_row))?;
            let (mut best, mut piv) = candidates[0];
            for &(score, row) in &candidates[1..] {
                if score > best || (score == best && row < piv) {
                    best = score;
                    piv = row;
                }
            }
            log::trace!("panel column {c}: pivot row {piv}");

            pivots[c] = piv;
            if piv != c {
                n_transpositions += 1;
                if piv < nb {
                    a11.swap_rows(c, piv);
                } else {
                    let g = piv - nb;
                    let root = a21_layout.rows.owner(grid, g).0.unwrap_or(0);
                    let held = a21_rows.binary_search(&g).ok();
                    let row = held.map(|li| {
                        let local = a21.rb().local();
                        (0..nb).map(|j| local.read(li, j)).collect::<Vec<E>>()
                    });
                    let row = comm.broadcast(row, root)?;
                    if row.len() != nb {
                        return Err(Error::Communication {
                            reason: "pivot row has the wrong length",
                        });
                    }
                    for (j, &value) in row.iter().enumerate() {
                        let old = a11.read(c, j);
                        a11.write(c, j, value);
                        if let Some(li) = held {
                            a21.local_mut().write(li, j, old);
                        }
                    }
                }
            }
        }

        let inv = a11.read(c, c).inv();
        let mut local = a21.local_mut();
        let local_m = local.nrows();
        for r in c + 1..nb {
            let v = a11.read(r, c);
            a11.write(r, c, v * inv);
        }
        for li in 0..local_m {
            let v = local.read(li, c);
            local.write(li, c, v * inv);
        }

        for j in c + 1..nb {
            let u = a11.read(c, j);
            for r in c + 1..nb {
                let l = a11.read(r, c);
                let v = a11.read(r, j);
                a11.write(r, j, v - l * u);
            }
            for li in 0..local_m {
                let l = local.read(li, c);
                let v = local.read(li, j);
                local.write(li, j, v - l * u);
            }
        }
    }

    Ok(n_transpositions)
}

fn lu_blocked_in_place<E: ComplexField>(
    a: DistMatMut<'_, E>,
    preimage: Option<DistMatMut<'_, usize>>,
    blocksize: usize,
) -> Result<usize> {
    let mut a = a;
    let mut preimage = preimage;
    let grid = a.grid();
    let m = a.nrows();
    let n = a.ncols();
    let size = Ord::min(m, n);

    // kept equal to the identity between blocks
    let (mut forward, mut inverse): (Vec<usize>, Vec<usize>) = match preimage {
        Some(_) => ((0..m).collect(), (0..m).collect()),
        None => (Vec::new(), Vec::new()),
    };

    let mut n_transpositions = 0;
    let mut k = 0;
    while k < size {
        let nb = Ord::min(blocksize, size - k);
        log::debug!(
            "distributed LU on a {}×{} grid: columns {}..{} of {}",
            grid.height(),
            grid.width(),
            k,
            k + nb,
            size,
        );

        let a11_view = a.rb().submatrix(k, k, nb, nb);
        let mut a11 = redistribute_on(grid, a11_view, Dist::Star, Dist::Star, 0, 0)?;
        let a21_view = a.rb().submatrix(k + nb, k, m - k - nb, nb);
        let col_align = a21_view.col_align();
        let mut a21 = redistribute_on(grid, a21_view, Dist::Mc, Dist::Star, col_align, 0)?;

        let mut pivots = vec![0usize; nb];
        let pivoting = preimage.is_some();
        n_transpositions += panel_in_place(
            grid,
            a11.local_mut(),
            a21.as_mut(),
            pivoting.then_some(&mut pivots[..]),
        )?;

        a.rb_mut()
            .submatrix_mut(k, k, nb, nb)
            .copy_from(a11.as_ref())?;
        a.rb_mut()
            .submatrix_mut(k + nb, k, m - k - nb, nb)
            .copy_from(a21.as_ref())?;

        if let Some(preimage) = preimage.as_mut() {
            let mut touched = vec![0usize; 2 * nb];
            let len = touched_slots(&pivots, &mut touched);
            touched.truncate(len);
            let perm = pivots_to_perm_from_identity(
                &pivots,
                &touched,
                &mut forward[..m - k],
                &mut inverse[..m - k],
            );
            let (_, source) = perm.arrays();
            let moved: Vec<usize> = touched.iter().copied().filter(|&d| source[d] != d).collect();
            let source = |d: usize| source[d];

            permute_moved(
                a.rb_mut().submatrix_mut(k, 0, m - k, k),
                Along::Rows,
                &moved,
                source,
            )?;
            permute_moved(
                a.rb_mut().submatrix_mut(k, k + nb, m - k, n - k - nb),
                Along::Rows,
                &moved,
                source,
            )?;
            permute_moved(
                preimage.rb_mut().submatrix_mut(k, 0, m - k, 1),
                Along::Rows,
                &moved,
                source,
            )?;
            reset_touched(&touched, &mut forward, &mut inverse);
        }

        let a12_view = a.rb().submatrix(k, k + nb, nb, n - k - nb);
        let row_align = a12_view.row_align();
        let mut a12 = redistribute_on(grid, a12_view, Dist::Star, Dist::Vr, 0, row_align)?;
        solve_unit_lower_triangular_in_place(a11.local(), a12.local_mut(), Parallelism::None);
        let a12 = redistribute_on(grid, a12.as_ref(), Dist::Star, Dist::Mr, 0, row_align)?;

        let mut a22 = a
            .rb_mut()
            .submatrix_mut(k + nb, k + nb, m - k - nb, n - k - nb);
        matmul(
            a22.local_mut(),
            a21.local(),
            a12.local(),
            Some(E::one()),
            -E::one(),
            Parallelism::None,
        );
        a.rb_mut()
            .submatrix_mut(k, k + nb, nb, n - k - nb)
            .copy_from(a12.as_ref())?;

        k += nb;
    }

    Ok(n_transpositions)
}

/// Computes the LU decomposition without pivoting of the `[Mc, Mr]` matrix `a`, replacing it with
/// its factors in place. Collective over the grid.
///
/// The factors are the same as those of
/// [`crate::linalg::lu::no_pivoting::lu_in_place`] applied to the gathered matrix.
///
/// # Errors
///
/// - [`Error::InvalidDistribution`] if `a` is not distributed as `[Mc, Mr]`.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
/// - [`Error::Communication`] if a collective failed.
pub fn lu_no_pivot_in_place<E: ComplexField>(a: DistMatMut<'_, E>, params: LuParams) -> Result<()> {
    const OP: &str = "dist::lu_no_pivot_in_place";
    check_matrix(OP, a.rb())?;
    params.check(OP)?;
    lu_blocked_in_place(a, None, params.blocksize)?;
    Ok(())
}

/// Computes the LU decomposition with partial pivoting of the `[Mc, Mr]` matrix `a`, replacing it
/// with its factors in place. Collective over the grid.
///
/// `preimage` must be a `[Vc, Star]` column vector with one entry per row of `a`. On return,
/// `preimage[i]` is the row of the original matrix that is now row `i` of the factors, as
/// `perm_inv` in [`crate::linalg::lu::partial_pivoting::lu_in_place`].
///
/// # Errors
///
/// - [`Error::InvalidDistribution`] if `a` is not distributed as `[Mc, Mr]` or `preimage` is
/// not distributed as `[Vc, Star]`.
/// - [`Error::GridMismatch`] if `a` and `preimage` live on different grids.
/// - [`Error::DimensionMismatch`] if `preimage` does not have one entry per row of `a`.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
/// - [`Error::Communication`] if a collective failed.
pub fn lu_in_place<E: ComplexField>(
    a: DistMatMut<'_, E>,
    preimage: DistMatMut<'_, usize>,
    params: LuParams,
) -> Result<PartialPivLuInfo> {
    const OP: &str = "dist::lu_in_place";
    let mut preimage = preimage;
    check_matrix(OP, a.rb())?;
    check_preimage(OP, a.rb(), preimage.rb(), a.nrows())?;
    params.check(OP)?;

    init_preimage(preimage.rb_mut());
    let n_transpositions = lu_blocked_in_place(a, Some(preimage), params.blocksize)?;
    Ok(PartialPivLuInfo {
        transposition_count: n_transpositions,
    })
}

// position of the entry of largest score of `a`, the first one in column-major order on ties
fn global_pivot<E: ComplexField>(a: DistMatRef<'_, E>) -> Result<(usize, usize)> {
    let candidate = best_pivot(a.local())
        .map(|(score, li, lj)| (score, a.global_row(li), a.global_col(lj)));
    let candidates = a.grid().world().all_gather(candidate)?;

    let mut best: Option<(E::Real, usize, usize)> = None;
    for (score, i, j) in candidates.into_iter().flatten() {
        match best {
            Some((max, bi, bj)) if !(score > max || (score == max && (j, i) < (bj, bi))) => {}
            _ => best = Some((score, i, j)),
        }
    }
    best.map(|(_, i, j)| (i, j)).ok_or(Error::Communication {
        reason: "no rank proposed a pivot",
    })
}

// divides the column below the pivot `a[0, 0]` by it, and applies the rank one update to the
// trailing matrix
fn eliminate<E: ComplexField>(a: DistMatMut<'_, E>) -> Result<()> {
    let mut a = a;
    let grid = a.grid();
    let m = a.nrows();
    let n = a.ncols();

    let pivot = redistribute_on(grid, a.rb().submatrix(0, 0, 1, 1), Dist::Star, Dist::Star, 0, 0)?;
    let inv = pivot.local().read(0, 0).inv();

    let col_view = a.rb().submatrix(1, 0, m - 1, 1);
    let col_align = col_view.col_align();
    let mut col = redistribute_on(grid, col_view, Dist::Mc, Dist::Star, col_align, 0)?;
    {
        let mut local = col.local_mut();
        for li in 0..local.nrows() {
            let v = local.read(li, 0);
            local.write(li, 0, v * inv);
        }
    }
    a.rb_mut()
        .submatrix_mut(1, 0, m - 1, 1)
        .copy_from(col.as_ref())?;

    let row_view = a.rb().submatrix(0, 1, 1, n - 1);
    let row_align = row_view.row_align();
    let row = redistribute_on(grid, row_view, Dist::Star, Dist::Mr, 0, row_align)?;

    let mut a22 = a.rb_mut().submatrix_mut(1, 1, m - 1, n - 1);
    matmul(
        a22.local_mut(),
        col.local(),
        row.local(),
        Some(E::one()),
        -E::one(),
        Parallelism::None,
    );
    Ok(())
}

/// Computes the LU decomposition with full pivoting of the `[Mc, Mr]` matrix `a`, replacing it
/// with its factors in place. Collective over the grid.
///
/// `row_preimage` and `col_preimage` must be `[Vc, Star]` column vectors with one entry per row
/// and per column of `a` respectively. On return, `row_preimage[i]` (resp. `col_preimage[j]`) is
/// the row (resp. column) of the original matrix that is now row `i` (resp. column `j`) of the
/// factors, as `row_perm_inv` and `col_perm_inv` in
/// [`crate::linalg::lu::full_pivoting::lu_in_place`]. The factors are the same as the local ones.
///
/// # Errors
///
/// - [`Error::InvalidDistribution`] if `a` is not distributed as `[Mc, Mr]` or a preimage is
/// not distributed as `[Vc, Star]`.
/// - [`Error::GridMismatch`] if the operands live on different grids.
/// - [`Error::DimensionMismatch`] if a preimage does not have the expected length.
/// - [`Error::Communication`] if a collective failed.
pub fn lu_full_piv_in_place<E: ComplexField>(
    a: DistMatMut<'_, E>,
    row_preimage: DistMatMut<'_, usize>,
    col_preimage: DistMatMut<'_, usize>,
) -> Result<FullPivLuInfo> {
    const OP: &str = "dist::lu_full_piv_in_place";
    let mut a = a;
    let mut row_preimage = row_preimage;
    let mut col_preimage = col_preimage;
    check_matrix(OP, a.rb())?;
    check_preimage(OP, a.rb(), row_preimage.rb(), a.nrows())?;
    check_preimage(OP, a.rb(), col_preimage.rb(), a.ncols())?;

    init_preimage(row_preimage.rb_mut());
    init_preimage(col_preimage.rb_mut());

    let m = a.nrows();
    let n = a.ncols();
    let size = Ord::min(m, n);
    let mut n_transpositions = 0;
    for k in 0..size {
        let (i, j) = global_pivot(a.rb().submatrix(k, k, m - k, n - k))?;
        let (i, j) = (i + k, j + k);
        log::trace!("full pivoting step {k}: pivot ({i}, {j})");

        if i != k {
            n_transpositions += 1;
            swap(a.rb_mut(), Along::Rows, k, i)?;
            swap(row_preimage.rb_mut(), Along::Rows, k, i)?;
        }
        if j != k {
            n_transpositions += 1;
            swap(a.rb_mut(), Along::Cols, k, j)?;
            swap(col_preimage.rb_mut(), Along::Rows, k, j)?;
        }

        eliminate(a.rb_mut().submatrix_mut(k, k, m - k, n - k))?;
    }

    Ok(FullPivLuInfo {
        transposition_count: n_transpositions,
    })
}

// gathers a preimage vector on every rank, as the `(forward, inverse)` arrays of a permutation
fn gather_permutation(
    op: &'static str,
    preimage: DistMatRef<'_, usize>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let gathered = preimage.to_mat()?;
    let n = gathered.nrows();
    let inverse: Vec<usize> = (0..n).map(|i| gathered.read(i, 0)).collect();
    let mut forward = vec![usize::MAX; n];
    for (i, &src) in inverse.iter().enumerate() {
        if src >= n || forward[src] != usize::MAX {
            return Err(Error::InvalidParameter {
                op,
                reason: "preimage is not a permutation",
            });
        }
        forward[src] = i;
    }
    Ok((forward, inverse))
}

fn check_factors<E: ComplexField>(
    op: &'static str,
    lu: DistMatRef<'_, E>,
    preimage: DistMatRef<'_, usize>,
    other: DistMatRef<'_, E>,
    params: LuParams,
) -> Result<()> {
    check_matrix(op, lu)?;
    check_matrix(op, other)?;
    check_same_grid(op, lu.grid(), other.grid())?;
    let n = lu.nrows();
    if lu.ncols() != n {
        return Err(Error::DimensionMismatch {
            op,
            expected: (n, n),
            found: (lu.nrows(), lu.ncols()),
        });
    }
    if other.nrows() != n {
        return Err(Error::DimensionMismatch {
            op,
            expected: (n, other.ncols()),
            found: (other.nrows(), other.ncols()),
        });
    }
    check_preimage(op, lu, preimage, n)?;
    params.check(op)
}

/// Given the partial pivoting LU factors of a square matrix $A$, as computed by [`lu_in_place`],
/// overwrites the `[Mc, Mr]` matrix `rhs` with the solution of $\text{Op}_A(A) X = B$, where
/// $\text{Op}_A$ is either the identity or the conjugation depending on `conj_lhs`. Collective
/// over the grid.
///
/// `params.blocksize` is the block size of the triangular solves.
///
/// # Errors
///
/// - [`Error::InvalidDistribution`] if `lu` or `rhs` is not distributed as `[Mc, Mr]`, or
/// `preimage` is not distributed as `[Vc, Star]`.
/// - [`Error::GridMismatch`] if the operands live on different grids.
/// - [`Error::DimensionMismatch`] if `lu` is not square, or does not match `rhs` or `preimage`.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero or `preimage` is not a
/// permutation.
/// - [`Error::Communication`] if a collective failed.
///
/// `rhs` is not modified when an error is reported before the solve starts.
pub fn solve_in_place<E: ComplexField>(
    lu: DistMatRef<'_, E>,
    preimage: DistMatRef<'_, usize>,
    conj_lhs: Conj,
    rhs: DistMatMut<'_, E>,
    params: LuParams,
) -> Result<()> {
    const OP: &str = "dist::lu_solve_in_place";
    let mut rhs = rhs;
    check_factors(OP, lu, preimage, rhs.rb(), params)?;
    let (forward, inverse) = gather_permutation(OP, preimage)?;

    permute_rows(rhs.rb_mut(), PermRef::new_checked(&forward, &inverse))?;
    solve_unit_lower_triangular_in_place_with_conj(lu, conj_lhs, rhs.rb_mut(), params.blocksize)?;
    solve_upper_triangular_in_place_with_conj(lu, conj_lhs, rhs, params.blocksize)
}

/// Given the partial pivoting LU factors of a square matrix $A$, as computed by [`lu_in_place`],
/// overwrites the `[Mc, Mr]` matrix `dst` with $A^{-1}$. Collective over the grid.
///
/// # Errors
///
/// Same as [`solve_in_place`], `dst` taking the place of `rhs`.
pub fn invert<E: ComplexField>(
    dst: DistMatMut<'_, E>,
    lu: DistMatRef<'_, E>,
    preimage: DistMatRef<'_, usize>,
    params: LuParams,
) -> Result<()> {
    const OP: &str = "dist::lu_invert";
    let mut dst = dst;
    check_factors(OP, lu, preimage, dst.rb(), params)?;
    if dst.ncols() != lu.ncols() {
        return Err(Error::DimensionMismatch {
            op: OP,
            expected: (lu.nrows(), lu.ncols()),
            found: (dst.nrows(), dst.ncols()),
        });
    }
    let (_, inverse) = gather_permutation(OP, preimage)?;

    // the permutation matrix P, with P[i, inverse[i]] = 1
    let rows: Vec<usize> = (0..dst.rb().local().nrows())
        .map(|li| dst.rb().global_row(li))
        .collect();
    let cols: Vec<usize> = (0..dst.rb().local().ncols())
        .map(|lj| dst.rb().global_col(lj))
        .collect();
    let mut local = dst.local_mut();
    for (lj, &j) in cols.iter().enumerate() {
        for (li, &i) in rows.iter().enumerate() {
            let v = if inverse[i] == j { E::one() } else { E::zero() };
            local.write(li, lj, v);
        }
    }

    solve_unit_lower_triangular_in_place_with_conj(lu, Conj::No, dst.rb_mut(), params.blocksize)?;
    solve_upper_triangular_in_place_with_conj(lu, Conj::No, dst, params.blocksize)
}
