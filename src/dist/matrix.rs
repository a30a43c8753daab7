use super::{comm::Comm, grid::Grid};
use crate::{assert, ComplexField, Error, Mat, MatMut, MatRef, Result};
use reborrow::*;

/// Distribution of one axis of a matrix over the process grid.
///
/// For a matrix distributed as `[col_dist, row_dist]`, `col_dist` describes how the entries of a
/// column (the row indices) are spread, and `row_dist` how the entries of a row (the column
/// indices) are spread. Each variant lists the processes holding global index `i` of an axis
/// with alignment `a`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dist {
    /// The grid row `(a + i) % height`, replicated over grid columns.
    Mc,
    /// The grid column `(a + i) % width`, replicated over grid rows.
    Mr,
    /// The single process on the diagonal of the grid at `(r0 + i) % height, (c0 + i) % width`,
    /// where `a = r0 + c0 * height`.
    Md,
    /// The process of column-major rank `(a + i) % size`.
    Vc,
    /// The process of row-major rank `(a + i) % size`.
    Vr,
    /// Every process.
    Star,
}

impl Dist {
    #[inline]
    pub(crate) fn uses_grid_rows(self) -> bool {
        matches!(self, Dist::Mc | Dist::Md | Dist::Vc | Dist::Vr)
    }

    #[inline]
    pub(crate) fn uses_grid_cols(self) -> bool {
        matches!(self, Dist::Mr | Dist::Md | Dist::Vc | Dist::Vr)
    }
}

/// Types that can be stored in a distributed matrix and sent between ranks.
pub trait Element: Copy + Default + Send + Sync + 'static {}
impl<T: Copy + Default + Send + Sync + 'static> Element for T {}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// One distributed axis: its length, distribution and alignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Axis {
    pub len: usize,
    pub dist: Dist,
    pub align: usize,
}

impl Axis {
    /// Number of distinct alignments.
    pub fn modulus(dist: Dist, grid: &Grid) -> usize {
        match dist {
            Dist::Mc => grid.height(),
            Dist::Mr => grid.width(),
            Dist::Md | Dist::Vc | Dist::Vr => grid.size(),
            Dist::Star => 1,
        }
    }

    /// Distance between two consecutive global indices held by the same process.
    pub fn stride(self, grid: &Grid) -> usize {
        let h = grid.height();
        let w = grid.width();
        match self.dist {
            Dist::Mc => h,
            Dist::Mr => w,
            Dist::Md => h / gcd(h, w) * w,
            Dist::Vc | Dist::Vr => h * w,
            Dist::Star => 1,
        }
    }

    /// First global index held by the process at `(row, col)`, if it holds any index of an
    /// infinitely long axis.
    pub fn shift(self, grid: &Grid, row: usize, col: usize) -> Option<usize> {
        let h = grid.height();
        let w = grid.width();
        let p = h * w;
        match self.dist {
            Dist::Mc => Some((row + h - self.align) % h),
            Dist::Mr => Some((col + w - self.align) % w),
            Dist::Vc => Some((row + col * h + p - self.align) % p),
            Dist::Vr => Some((col + row * w + p - self.align) % p),
            Dist::Star => Some(0),
            Dist::Md => {
                let r0 = self.align % h;
                let c0 = self.align / h;
                (0..self.stride(grid)).find(|k| (r0 + k) % h == row && (c0 + k) % w == col)
            }
        }
    }

    /// Grid row and grid column that hold global index `i`. `None` means the index is replicated
    /// along that grid dimension.
    pub fn owner(self, grid: &Grid, i: usize) -> (Option<usize>, Option<usize>) {
        let h = grid.height();
        let w = grid.width();
        let p = h * w;
        match self.dist {
            Dist::Mc => (Some((self.align + i) % h), None),
            Dist::Mr => (None, Some((self.align + i) % w)),
            Dist::Vc => {
                let v = (self.align + i) % p;
                (Some(v % h), Some(v / h))
            }
            Dist::Vr => {
                let v = (self.align + i) % p;
                (Some(v / w), Some(v % w))
            }
            Dist::Md => {
                let r0 = self.align % h;
                let c0 = self.align / h;
                (Some((r0 + i) % h), Some((c0 + i) % w))
            }
            Dist::Star => (None, None),
        }
    }

    /// Number of indices below `i` held by the process at `(row, col)`.
    pub fn count_below(self, grid: &Grid, row: usize, col: usize, i: usize) -> usize {
        match self.shift(grid, row, col) {
            Some(s) if i > s => (i - s - 1) / self.stride(grid) + 1,
            _ => 0,
        }
    }

    /// Number of indices held by the process at `(row, col)`.
    pub fn local_len(self, grid: &Grid, row: usize, col: usize) -> usize {
        self.count_below(grid, row, col, self.len)
    }

    /// Global indices held by the process at `(row, col)`, in increasing order.
    pub fn indices(self, grid: &Grid, row: usize, col: usize) -> impl Iterator<Item = usize> {
        let stride = self.stride(grid);
        let len = self.len;
        let start = self.shift(grid, row, col).unwrap_or(len);
        (start..len).step_by(stride)
    }

    /// Axis of the window `[start, start + len)`.
    pub fn sub(self, grid: &Grid, start: usize, len: usize) -> Axis {
        let h = grid.height();
        let w = grid.width();
        let align = match self.dist {
            Dist::Mc => (self.align + start) % h,
            Dist::Mr => (self.align + start) % w,
            Dist::Vc | Dist::Vr => (self.align + start) % (h * w),
            Dist::Md => {
                let r0 = (self.align % h + start) % h;
                let c0 = (self.align / h + start) % w;
                r0 + c0 * h
            }
            Dist::Star => 0,
        };
        Axis {
            len,
            dist: self.dist,
            align,
        }
    }
}

/// Global shape, distribution and alignment of a distributed matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    /// Row indices, distributed by `col_dist`.
    pub rows: Axis,
    /// Column indices, distributed by `row_dist`.
    pub cols: Axis,
}

impl Layout {
    pub fn new(
        op: &'static str,
        grid: &Grid,
        nrows: usize,
        ncols: usize,
        col_dist: Dist,
        row_dist: Dist,
        col_align: usize,
        row_align: usize,
    ) -> Result<Self> {
        if (col_dist.uses_grid_rows() && row_dist.uses_grid_rows())
            || (col_dist.uses_grid_cols() && row_dist.uses_grid_cols())
        {
            return Err(Error::InvalidDistribution {
                op,
                reason: "both axes are distributed over the same grid dimension",
            });
        }
        if col_align >= Axis::modulus(col_dist, grid) || row_align >= Axis::modulus(row_dist, grid)
        {
            return Err(Error::InvalidDistribution {
                op,
                reason: "alignment is out of range",
            });
        }
        Ok(Self {
            rows: Axis {
                len: nrows,
                dist: col_dist,
                align: col_align,
            },
            cols: Axis {
                len: ncols,
                dist: row_dist,
                align: row_align,
            },
        })
    }

    /// Grid row and grid column holding the entry `(i, j)`.
    #[inline]
    pub fn owner(&self, grid: &Grid, i: usize, j: usize) -> (Option<usize>, Option<usize>) {
        let (r0, c0) = self.rows.owner(grid, i);
        let (r1, c1) = self.cols.owner(grid, j);
        (r0.or(r1), c0.or(c1))
    }

    #[inline]
    pub fn same_placement(&self, other: &Layout) -> bool {
        self.rows.dist == other.rows.dist
            && self.cols.dist == other.cols.dist
            && self.rows.align == other.rows.align
            && self.cols.align == other.cols.align
    }
}

/// Distributed matrix owning the entries held by the calling rank.
///
/// The local entries are stored in a column-major [`Mat`], local row `li` holding the global row
/// `shift + li * stride` of the column distribution, and likewise for columns.
#[derive(Clone)]
pub struct DistMat<'g, E> {
    grid: &'g Grid,
    layout: Layout,
    local: Mat<E>,
}

/// Immutable view over a distributed matrix.
pub struct DistMatRef<'a, E> {
    grid: &'a Grid,
    layout: Layout,
    local: MatRef<'a, E>,
}

/// Mutable view over a distributed matrix.
pub struct DistMatMut<'a, E> {
    grid: &'a Grid,
    layout: Layout,
    local: MatMut<'a, E>,
}

impl<E> Clone for DistMatRef<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for DistMatRef<'_, E> {}

impl<'short, E> Reborrow<'short> for DistMatRef<'_, E> {
    type Target = DistMatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'short, E> ReborrowMut<'short> for DistMatRef<'_, E> {
    type Target = DistMatRef<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        *self
    }
}

impl<'short, E> Reborrow<'short> for DistMatMut<'_, E> {
    type Target = DistMatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        DistMatRef {
            grid: self.grid,
            layout: self.layout,
            local: self.local.rb(),
        }
    }
}

impl<'short, E> ReborrowMut<'short> for DistMatMut<'_, E> {
    type Target = DistMatMut<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        DistMatMut {
            grid: self.grid,
            layout: self.layout,
            local: self.local.rb_mut(),
        }
    }
}

impl<'a, E> IntoConst for DistMatMut<'a, E> {
    type Target = DistMatRef<'a, E>;

    #[inline]
    fn into_const(self) -> Self::Target {
        DistMatRef {
            grid: self.grid,
            layout: self.layout,
            local: self.local.into_const(),
        }
    }
}

impl<'g, E: Element> DistMat<'g, E> {
    /// Creates a `nrows × ncols` matrix distributed as `[col_dist, row_dist]` with zero
    /// alignments, filled with `E::default()`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDistribution`] if both distributions use the same grid dimension.
    pub fn new(
        grid: &'g Grid,
        nrows: usize,
        ncols: usize,
        col_dist: Dist,
        row_dist: Dist,
    ) -> Result<Self> {
        Self::new_aligned(grid, nrows, ncols, col_dist, row_dist, 0, 0)
    }

    /// Creates a `nrows × ncols` matrix distributed as `[col_dist, row_dist]` with the given
    /// alignments, filled with `E::default()`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDistribution`] if both distributions use the same grid dimension, or if
    /// an alignment is out of range for its distribution.
    pub fn new_aligned(
        grid: &'g Grid,
        nrows: usize,
        ncols: usize,
        col_dist: Dist,
        row_dist: Dist,
        col_align: usize,
        row_align: usize,
    ) -> Result<Self> {
        let layout = Layout::new(
            "DistMat::new",
            grid,
            nrows,
            ncols,
            col_dist,
            row_dist,
            col_align,
            row_align,
        )?;
        let local_nrows = layout.rows.local_len(grid, grid.row(), grid.col());
        let local_ncols = layout.cols.local_len(grid, grid.row(), grid.col());
        Ok(Self {
            grid,
            layout,
            local: Mat::from_fn(local_nrows, local_ncols, |_, _| E::default()),
        })
    }

    /// Creates a matrix distributed as `[col_dist, row_dist]` with zero alignments, whose entry
    /// `(i, j)` is `f(i, j)`. `f` is only called on the entries held by the calling rank.
    pub fn from_fn(
        grid: &'g Grid,
        nrows: usize,
        ncols: usize,
        col_dist: Dist,
        row_dist: Dist,
        f: impl FnMut(usize, usize) -> E,
    ) -> Result<Self> {
        let mut f = f;
        let mut this = Self::new(grid, nrows, ncols, col_dist, row_dist)?;
        let rows: Vec<usize> = this.layout.rows.indices(grid, grid.row(), grid.col()).collect();
        let cols: Vec<usize> = this.layout.cols.indices(grid, grid.row(), grid.col()).collect();
        for (lj, &j) in cols.iter().enumerate() {
            for (li, &i) in rows.iter().enumerate() {
                this.local.write(li, lj, f(i, j));
            }
        }
        Ok(this)
    }

    /// Distributes the replicated matrix `mat` as `[col_dist, row_dist]`, without communication.
    pub fn from_mat(
        grid: &'g Grid,
        mat: MatRef<'_, E>,
        col_dist: Dist,
        row_dist: Dist,
    ) -> Result<Self> {
        Self::from_fn(grid, mat.nrows(), mat.ncols(), col_dist, row_dist, |i, j| {
            mat.read(i, j)
        })
    }

    /// Gathers the whole matrix on every rank. Collective over the grid.
    pub fn to_mat(&self) -> Result<Mat<E>> {
        self.as_ref().to_mat()
    }

    #[inline]
    pub fn as_ref(&self) -> DistMatRef<'_, E> {
        DistMatRef {
            grid: self.grid,
            layout: self.layout,
            local: self.local.as_ref(),
        }
    }

    #[inline]
    pub fn as_mut(&mut self) -> DistMatMut<'_, E> {
        DistMatMut {
            grid: self.grid,
            layout: self.layout,
            local: self.local.as_mut(),
        }
    }

    #[inline]
    pub fn grid(&self) -> &'g Grid {
        self.grid
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.layout.rows.len
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.layout.cols.len
    }

    #[inline]
    pub fn col_dist(&self) -> Dist {
        self.layout.rows.dist
    }

    #[inline]
    pub fn row_dist(&self) -> Dist {
        self.layout.cols.dist
    }

    #[inline]
    pub fn col_align(&self) -> usize {
        self.layout.rows.align
    }

    #[inline]
    pub fn row_align(&self) -> usize {
        self.layout.cols.align
    }

    /// Entries held by the calling rank.
    #[inline]
    pub fn local(&self) -> MatRef<'_, E> {
        self.local.as_ref()
    }

    /// Entries held by the calling rank.
    #[inline]
    pub fn local_mut(&mut self) -> MatMut<'_, E> {
        self.local.as_mut()
    }

    /// Consumes the matrix and returns the entries held by the calling rank.
    #[inline]
    pub fn into_local(self) -> Mat<E> {
        self.local
    }
}

impl<'a, E: Element> DistMatRef<'a, E> {
    #[inline]
    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.layout.rows.len
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.layout.cols.len
    }

    #[inline]
    pub fn col_dist(&self) -> Dist {
        self.layout.rows.dist
    }

    #[inline]
    pub fn row_dist(&self) -> Dist {
        self.layout.cols.dist
    }

    #[inline]
    pub fn col_align(&self) -> usize {
        self.layout.rows.align
    }

    #[inline]
    pub fn row_align(&self) -> usize {
        self.layout.cols.align
    }

    /// Entries held by the calling rank.
    #[inline]
    pub fn local(self) -> MatRef<'a, E> {
        self.local
    }

    /// Global row index of the local row `local_row`.
    #[track_caller]
    pub fn global_row(&self, local_row: usize) -> usize {
        assert!(local_row < self.local.nrows());
        let axis = self.layout.rows;
        axis.shift(self.grid, self.grid.row(), self.grid.col())
            .unwrap_or(0)
            + local_row * axis.stride(self.grid)
    }

    /// Global column index of the local column `local_col`.
    #[track_caller]
    pub fn global_col(&self, local_col: usize) -> usize {
        assert!(local_col < self.local.ncols());
        let axis = self.layout.cols;
        axis.shift(self.grid, self.grid.row(), self.grid.col())
            .unwrap_or(0)
            + local_col * axis.stride(self.grid)
    }

    /// Local index of the global row `row`, if the calling rank holds it.
    pub fn local_row(&self, row: usize) -> Option<usize> {
        local_index(self.grid, self.layout.rows, row)
    }

    /// Local index of the global column `col`, if the calling rank holds it.
    pub fn local_col(&self, col: usize) -> Option<usize> {
        local_index(self.grid, self.layout.cols, col)
    }

    /// Alignment of a `[Md, Star]` vector holding one value per entry of the diagonal `offset`
    /// of `self`, which must be distributed as `[Mc, Mr]`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDistribution`] if `self` is not distributed as `[Mc, Mr]`.
    pub fn diagonal_align(&self, offset: isize) -> Result<usize> {
        if (self.col_dist(), self.row_dist()) != (Dist::Mc, Dist::Mr) {
            return Err(Error::InvalidDistribution {
                op: "diagonal_align",
                reason: "matrix must be distributed as [Mc, Mr]",
            });
        }
        let h = self.grid.height();
        let w = self.grid.width();
        let i_off = (-offset).max(0) as usize;
        let j_off = offset.max(0) as usize;
        let r0 = (self.col_align() + i_off) % h;
        let c0 = (self.row_align() + j_off) % w;
        Ok(r0 + c0 * h)
    }

    /// Returns a view over the submatrix starting at `(row_start, col_start)` with dimensions
    /// `(nrows, ncols)`.
    ///
    /// # Panics
    ///
    /// Panics if the submatrix does not fit in `self`.
    #[track_caller]
    pub fn submatrix(self, row_start: usize, col_start: usize, nrows: usize, ncols: usize) -> Self {
        let (layout, (li, lj, lm, ln)) =
            sub_layout(self.grid, self.layout, row_start, col_start, nrows, ncols);
        DistMatRef {
            grid: self.grid,
            layout,
            local: self.local.submatrix(li, lj, lm, ln),
        }
    }

    /// Gathers the whole matrix on every rank. Collective over the grid.
    pub fn to_mat(self) -> Result<Mat<E>> {
        Ok(super::redistribute(self, Dist::Star, Dist::Star, 0, 0)?.into_local())
    }
}

impl<'a, E: Element> DistMatMut<'a, E> {
    #[inline]
    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.layout.rows.len
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.layout.cols.len
    }

    #[inline]
    pub fn col_dist(&self) -> Dist {
        self.layout.rows.dist
    }

    #[inline]
    pub fn row_dist(&self) -> Dist {
        self.layout.cols.dist
    }

    #[inline]
    pub fn col_align(&self) -> usize {
        self.layout.rows.align
    }

    #[inline]
    pub fn row_align(&self) -> usize {
        self.layout.cols.align
    }

    /// Entries held by the calling rank.
    #[inline]
    pub fn local_mut(&mut self) -> MatMut<'_, E> {
        self.local.rb_mut()
    }

    /// Consumes the view and returns the entries held by the calling rank.
    #[inline]
    pub fn into_local(self) -> MatMut<'a, E> {
        self.local
    }

    /// Returns a mutable view over the submatrix starting at `(row_start, col_start)` with
    /// dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    ///
    /// Panics if the submatrix does not fit in `self`.
    #[track_caller]
    pub fn submatrix_mut(
        self,
        row_start: usize,
        col_start: usize,
        nrows: usize,
        ncols: usize,
    ) -> Self {
        let (layout, (li, lj, lm, ln)) =
            sub_layout(self.grid, self.layout, row_start, col_start, nrows, ncols);
        DistMatMut {
            grid: self.grid,
            layout,
            local: self.local.submatrix_mut(li, lj, lm, ln),
        }
    }

    /// Replaces every local entry with its sum over the ranks of `comm`. Collective over the
    /// world.
    ///
    /// Every rank of `comm` must hold the same number of local entries.
    pub fn sum_over(&mut self, comm: &Comm) -> Result<()>
    where
        E: ComplexField,
    {
        let m = self.local.nrows();
        let n = self.local.ncols();
        let mut buf = Vec::with_capacity(m * n);
        for j in 0..n {
            for i in 0..m {
                buf.push(self.local.read(i, j));
            }
        }
        comm.sum_in_place(&mut buf)?;
        for j in 0..n {
            for i in 0..m {
                self.local.write(i, j, buf[i + j * m]);
            }
        }
        Ok(())
    }
}

fn local_index(grid: &Grid, axis: Axis, i: usize) -> Option<usize> {
    if i >= axis.len {
        return None;
    }
    let s = axis.shift(grid, grid.row(), grid.col())?;
    let stride = axis.stride(grid);
    if i >= s && (i - s) % stride == 0 {
        Some((i - s) / stride)
    } else {
        None
    }
}

#[track_caller]
fn sub_layout(
    grid: &Grid,
    layout: Layout,
    row_start: usize,
    col_start: usize,
    nrows: usize,
    ncols: usize,
) -> (Layout, (usize, usize, usize, usize)) {
    assert!(all(
        row_start <= layout.rows.len,
        col_start <= layout.cols.len,
    ));
    assert!(all(
        nrows <= layout.rows.len - row_start,
        ncols <= layout.cols.len - col_start,
    ));
    let (r, c) = (grid.row(), grid.col());
    let li = layout.rows.count_below(grid, r, c, row_start);
    let lj = layout.cols.count_below(grid, r, c, col_start);
    let lm = layout.rows.count_below(grid, r, c, row_start + nrows) - li;
    let ln = layout.cols.count_below(grid, r, c, col_start + ncols) - lj;
    (
        Layout {
            rows: layout.rows.sub(grid, row_start, nrows),
            cols: layout.cols.sub(grid, col_start, ncols),
        },
        (li, lj, lm, ln),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, dist::spawn_world};
    use std::sync::Arc;

    const ALL: [Dist; 6] = [Dist::Mc, Dist::Mr, Dist::Md, Dist::Vc, Dist::Vr, Dist::Star];

    #[test]
    fn every_index_has_the_owners_it_claims() {
        let results = spawn_world(6, |transport| {
            let grid = Grid::new(Arc::new(transport), 2).unwrap();
            let mut ok = true;
            for dist in ALL {
                for align in 0..Axis::modulus(dist, &grid) {
                    let axis = Axis {
                        len: 17,
                        dist,
                        align,
                    };
                    for i in 0..17 {
                        let (r, c) = axis.owner(&grid, i);
                        let mine = r.map_or(true, |r| r == grid.row())
                            && c.map_or(true, |c| c == grid.col());
                        let listed = axis.indices(&grid, grid.row(), grid.col()).any(|k| k == i);
                        ok &= mine == listed;
                    }
                }
            }
            ok
        });
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn invalid_pairs_are_rejected() {
        let grid = Grid::single();
        for col_dist in ALL {
            for row_dist in ALL {
                let valid = !((col_dist.uses_grid_rows() && row_dist.uses_grid_rows())
                    || (col_dist.uses_grid_cols() && row_dist.uses_grid_cols()));
                let result = DistMat::<f64>::new(&grid, 3, 3, col_dist, row_dist);
                assert!(result.is_ok() == valid);
            }
        }
        assert!(DistMat::<f64>::new_aligned(&grid, 3, 3, Dist::Mc, Dist::Mr, 1, 0).is_err());
    }

    #[test]
    fn submatrix_windows_local_storage() {
        let results = spawn_world(4, |transport| {
            let grid = Grid::new(Arc::new(transport), 2).unwrap();
            let a = DistMat::from_fn(&grid, 7, 5, Dist::Mc, Dist::Mr, |i, j| (i * 10 + j) as f64)
                .unwrap();
            let sub = a.as_ref().submatrix(3, 2, 4, 2);
            let mut ok = true;
            for lj in 0..sub.local().ncols() {
                for li in 0..sub.local().nrows() {
                    let i = sub.global_row(li);
                    let j = sub.global_col(lj);
                    ok &= sub.local().read(li, lj) == ((i + 3) * 10 + j + 2) as f64;
                    ok &= sub.local_row(i) == Some(li);
                    ok &= sub.local_col(j) == Some(lj);
                }
            }
            ok
        });
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn diagonal_vector_follows_the_diagonal() {
        let results = spawn_world(6, |transport| {
            let grid = Grid::new(Arc::new(transport), 3).unwrap();
            let a = DistMat::<f64>::new(&grid, 8, 8, Dist::Mc, Dist::Mr).unwrap();
            let mut ok = true;
            for offset in [-2isize, 0, 3] {
                let align = a.as_ref().diagonal_align(offset).unwrap();
                let d = Axis {
                    len: 5,
                    dist: Dist::Md,
                    align,
                };
                let i_off = (-offset).max(0) as usize;
                let j_off = offset.max(0) as usize;
                for k in 0..5 {
                    let (r, c) = d.owner(&grid, k);
                    let (mr, mc) = a.layout.owner(&grid, k + i_off, k + j_off);
                    ok &= (r, c) == (mr, mc);
                }
            }
            ok
        });
        assert!(results.iter().all(|&ok| ok));
    }
}
