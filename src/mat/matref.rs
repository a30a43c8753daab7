use super::*;
use crate::{assert, debug_assert};

/// Immutable view over a matrix, similar to an immutable reference to a 2D strided [prim@slice].
pub struct MatRef<'a, E> {
    ptr: NonNull<E>,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
    __marker: PhantomData<&'a E>,
}

unsafe impl<E: Sync> Send for MatRef<'_, E> {}
unsafe impl<E: Sync> Sync for MatRef<'_, E> {}

impl<E> Clone for MatRef<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for MatRef<'_, E> {}

impl<'short, E> Reborrow<'short> for MatRef<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'short, E> ReborrowMut<'short> for MatRef<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        *self
    }
}

impl<E> IntoConst for MatRef<'_, E> {
    type Target = Self;

    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}

impl<'a, E> MatRef<'a, E> {
    #[inline]
    pub(crate) unsafe fn __from_raw_parts(
        ptr: *const E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            ptr: NonNull::new_unchecked(ptr as *mut E),
            nrows,
            ncols,
            row_stride,
            col_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a pointer to the matrix data.
    #[inline(always)]
    pub fn as_ptr(self) -> *const E {
        self.ptr.as_ptr()
    }

    /// Returns the number of rows of the matrix.
    #[inline(always)]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline(always)]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of elements between two consecutive rows.
    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.row_stride
    }

    /// Returns the number of elements between two consecutive columns.
    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.col_stride
    }

    /// Returns raw pointers to the element at the given indices, without bound checks.
    #[inline(always)]
    pub fn ptr_at(self, row: usize, col: usize) -> *const E {
        self.as_ptr()
            .wrapping_offset(offset(self.row_stride, self.col_stride, row, col))
    }

    /// Reads the value of the element at the given indices, with bound checks.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E
    where
        E: Copy,
    {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.read_unchecked(row, col) }
    }

    /// Reads the value of the element at the given indices.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub unsafe fn read_unchecked(&self, row: usize, col: usize) -> E
    where
        E: Copy,
    {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        *self.ptr_at(row, col)
    }

    /// Returns a view over a submatrix of `self`, starting at position `(row_start, col_start)`
    /// with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row_start <= self.nrows()`.
    /// * `col_start <= self.ncols()`.
    /// * `nrows <= self.nrows() - row_start`.
    /// * `ncols <= self.ncols() - col_start`.
    #[track_caller]
    #[inline(always)]
    pub fn submatrix(self, row_start: usize, col_start: usize, nrows: usize, ncols: usize) -> Self {
        assert!(all(row_start <= self.nrows(), col_start <= self.ncols()));
        assert!(all(
            nrows <= self.nrows() - row_start,
            ncols <= self.ncols() - col_start,
        ));
        unsafe {
            Self::__from_raw_parts(
                self.ptr_at(row_start, col_start),
                nrows,
                ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a view over the rows `[row_start, row_start + nrows)`.
    #[track_caller]
    #[inline(always)]
    pub fn subrows(self, row_start: usize, nrows: usize) -> Self {
        let ncols = self.ncols();
        self.submatrix(row_start, 0, nrows, ncols)
    }

    /// Returns a view over the columns `[col_start, col_start + ncols)`.
    #[track_caller]
    #[inline(always)]
    pub fn subcols(self, col_start: usize, ncols: usize) -> Self {
        let nrows = self.nrows();
        self.submatrix(0, col_start, nrows, ncols)
    }

    /// Splits the matrix horizontally and vertically at the given indices into four corners and
    /// returns an array of each submatrix, in the following order:
    /// * top left.
    /// * top right.
    /// * bottom left.
    /// * bottom right.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row <= self.nrows()`.
    /// * `col <= self.ncols()`.
    #[track_caller]
    #[inline(always)]
    pub fn split_at(self, row: usize, col: usize) -> (Self, Self, Self, Self) {
        assert!(all(row <= self.nrows(), col <= self.ncols()));
        let m = self.nrows();
        let n = self.ncols();
        (
            self.submatrix(0, 0, row, col),
            self.submatrix(0, col, row, n - col),
            self.submatrix(row, 0, m - row, col),
            self.submatrix(row, col, m - row, n - col),
        )
    }

    /// Splits the matrix horizontally at the given row into two parts and returns an array of
    /// each submatrix, in the following order:
    /// * top.
    /// * bottom.
    #[track_caller]
    #[inline(always)]
    pub fn split_at_row(self, row: usize) -> (Self, Self) {
        let n = self.ncols();
        (self.submatrix(0, 0, row, n), self.submatrix(row, 0, self.nrows() - row, n))
    }

    /// Splits the matrix vertically at the given column into two parts and returns an array of
    /// each submatrix, in the following order:
    /// * left.
    /// * right.
    #[track_caller]
    #[inline(always)]
    pub fn split_at_col(self, col: usize) -> (Self, Self) {
        let m = self.nrows();
        (self.submatrix(0, 0, m, col), self.submatrix(0, col, m, self.ncols() - col))
    }

    /// Returns a view over the column at the given index, as an `nrows × 1` matrix.
    #[track_caller]
    #[inline(always)]
    pub fn col(self, j: usize) -> Self {
        assert!(j < self.ncols());
        let m = self.nrows();
        self.submatrix(0, j, m, 1)
    }

    /// Returns a view over the row at the given index, as a `1 × ncols` matrix.
    #[track_caller]
    #[inline(always)]
    pub fn row(self, i: usize) -> Self {
        assert!(i < self.nrows());
        let n = self.ncols();
        self.submatrix(i, 0, 1, n)
    }

    /// Returns the transpose of `self`.
    #[inline(always)]
    #[must_use]
    pub fn transpose(self) -> Self {
        unsafe {
            Self::__from_raw_parts(
                self.as_ptr(),
                self.ncols,
                self.nrows,
                self.col_stride,
                self.row_stride,
            )
        }
    }

    /// Returns a view over `self` with its rows in reverse order.
    #[inline(always)]
    #[must_use]
    pub fn reverse_rows(self) -> Self {
        let ptr = if self.nrows == 0 {
            self.as_ptr()
        } else {
            self.ptr_at(self.nrows - 1, 0)
        };
        unsafe {
            Self::__from_raw_parts(
                ptr,
                self.nrows,
                self.ncols,
                self.row_stride.wrapping_neg(),
                self.col_stride,
            )
        }
    }

    /// Returns `true` if consecutive rows are adjacent in memory.
    #[inline(always)]
    pub fn is_col_major(&self) -> bool {
        self.row_stride == 1
    }

    /// Returns an owning [`Mat`] of the data.
    #[inline]
    pub fn to_owned(&self) -> Mat<E>
    where
        E: Copy,
    {
        let this = *self;
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| unsafe {
            this.read_unchecked(i, j)
        })
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for MatRef<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct DebugRow<'a, T: Copy + core::fmt::Debug>(MatRef<'a, T>);

        impl<'a, T: Copy + core::fmt::Debug> core::fmt::Debug for DebugRow<'a, T> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut j = 0;
                f.debug_list()
                    .entries(core::iter::from_fn(|| {
                        let ret = if j < self.0.ncols() {
                            Some(self.0.read(0, j))
                        } else {
                            None
                        };
                        j += 1;
                        ret
                    }))
                    .finish()
            }
        }

        let mut i = 0;
        f.debug_list()
            .entries(core::iter::from_fn(|| {
                let ret = if i < self.nrows() {
                    Some(DebugRow(self.row(i)))
                } else {
                    None
                };
                i += 1;
                ret
            }))
            .finish()
    }
}
