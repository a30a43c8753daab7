//! Changing the distribution of a matrix.
//!
//! Every redistribution is a single all-to-all exchange over the world. For each entry a
//! receiving rank needs, the sender is the receiver itself when it already holds the entry, and
//! otherwise the holder of the entry that agrees with the receiver on every grid dimension the
//! source distribution leaves unconstrained. Senders pack entries in the column-major order of
//! their source storage and receivers unpack them in the column-major order of their destination
//! storage, which visits the entries of each sender in the same order.

use super::{
    grid::{check_same_grid, Grid},
    matrix::{DistMat, DistMatMut, DistMatRef, Element, Layout},
    Dist,
};
use crate::{Error, Result};
use reborrow::*;

pub(crate) fn dimension_range(owner: Option<usize>, len: usize) -> core::ops::Range<usize> {
    match owner {
        Some(x) => x..x + 1,
        None => 0..len,
    }
}

/// World rank that sends the entry `(i, j)` of `src` to the process at `(row, col)`.
#[inline]
pub(crate) fn sender_of(
    grid: &Grid,
    src: &Layout,
    i: usize,
    j: usize,
    row: usize,
    col: usize,
) -> usize {
    let (r, c) = src.owner(grid, i, j);
    grid.rank_of(r.unwrap_or(row), c.unwrap_or(col))
}

impl<'a, E: Element> DistMatMut<'a, E> {
    /// Copies the entries of `src` into `self`, converting from the distribution of `src` to the
    /// distribution of `self`. Collective over the grid.
    ///
    /// # Errors
    ///
    /// - [`Error::GridMismatch`] if `src` and `self` live on different grids.
    /// - [`Error::DimensionMismatch`] if `src` and `self` have different shapes.
    /// - [`Error::Communication`] if the exchange delivered fewer values than expected.
    pub fn copy_from(&mut self, src: DistMatRef<'_, E>) -> Result<()> {
        const OP: &str = "copy_from";
        check_same_grid(OP, self.grid(), src.grid())?;
        if (src.nrows(), src.ncols()) != (self.nrows(), self.ncols()) {
            return Err(Error::DimensionMismatch {
                op: OP,
                expected: (self.nrows(), self.ncols()),
                found: (src.nrows(), src.ncols()),
            });
        }

        let grid = self.grid();
        let dst_layout = self.layout();
        let src_layout = src.layout();
        log::debug!(
            "redistributing {}×{} matrix from [{:?}, {:?}] to [{:?}, {:?}]",
            self.nrows(),
            self.ncols(),
            src.col_dist(),
            src.row_dist(),
            self.col_dist(),
            self.row_dist(),
        );

        if dst_layout.same_placement(&src_layout) {
            self.local_mut().copy_from(src.local());
            return Ok(());
        }

        let (me_r, me_c) = (grid.row(), grid.col());
        let me = grid.rank();
        let mut send: Vec<Vec<E>> = (0..grid.size()).map(|_| Vec::new()).collect();

        let src_rows: Vec<usize> = src_layout.rows.indices(grid, me_r, me_c).collect();
        let src_cols: Vec<usize> = src_layout.cols.indices(grid, me_r, me_c).collect();
        let src_local = src.local();
        for (lj, &j) in src_cols.iter().enumerate() {
            for (li, &i) in src_rows.iter().enumerate() {
                let value = src_local.read(li, lj);
                let (dst_r, dst_c) = dst_layout.owner(grid, i, j);
                for qc in dimension_range(dst_c, grid.width()) {
                    for qr in dimension_range(dst_r, grid.height()) {
                        if sender_of(grid, &src_layout, i, j, qr, qc) == me {
                            send[grid.rank_of(qr, qc)].push(value);
                        }
                    }
                }
            }
        }

        let recv = grid.world().all_to_all(send)?;
        let mut recv: Vec<_> = recv.into_iter().map(Vec::into_iter).collect();

        let dst_rows: Vec<usize> = dst_layout.rows.indices(grid, me_r, me_c).collect();
        let dst_cols: Vec<usize> = dst_layout.cols.indices(grid, me_r, me_c).collect();
        let mut local = self.local_mut();
        for (lj, &j) in dst_cols.iter().enumerate() {
            for (li, &i) in dst_rows.iter().enumerate() {
                let sender = sender_of(grid, &src_layout, i, j, me_r, me_c);
                let value = recv[sender].next().ok_or(Error::Communication {
                    reason: "redistribution received too few values",
                })?;
                local.write(li, lj, value);
            }
        }

        if recv.iter_mut().any(|buf| buf.next().is_some()) {
            return Err(Error::Communication {
                reason: "redistribution received too many values",
            });
        }
        Ok(())
    }
}

impl<'g, E: Element> DistMat<'g, E> {
    /// Copies the entries of `src` into `self`. See [`DistMatMut::copy_from`].
    pub fn copy_from(&mut self, src: DistMatRef<'_, E>) -> Result<()> {
        self.as_mut().copy_from(src)
    }
}

/// Returns a copy of `src` distributed as `[col_dist, row_dist]` with the given alignments.
/// Collective over the grid.
///
/// # Errors
///
/// - [`Error::InvalidDistribution`] if the target distribution is invalid.
/// - [`Error::Communication`] if the exchange failed.
pub fn redistribute<'g, E: Element>(
    src: DistMatRef<'g, E>,
    col_dist: Dist,
    row_dist: Dist,
    col_align: usize,
    row_align: usize,
) -> Result<DistMat<'g, E>> {
    redistribute_on(src.grid(), src, col_dist, row_dist, col_align, row_align)
}

/// Same as [`redistribute`], but the result borrows `grid` instead of the grid reference of
/// `src`, so that it can outlive the borrow `src` was taken from.
pub(crate) fn redistribute_on<'g, E: Element>(
    grid: &'g Grid,
    src: DistMatRef<'_, E>,
    col_dist: Dist,
    row_dist: Dist,
    col_align: usize,
    row_align: usize,
) -> Result<DistMat<'g, E>> {
    let mut dst = DistMat::new_aligned(
        grid,
        src.nrows(),
        src.ncols(),
        col_dist,
        row_dist,
        col_align,
        row_align,
    )?;
    dst.as_mut().copy_from(src)?;
    Ok(dst)
}
