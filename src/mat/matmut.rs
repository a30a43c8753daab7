use super::*;
use crate::{assert, debug_assert};

/// Mutable view over a matrix, similar to a mutable reference to a 2D strided [prim@slice].
pub struct MatMut<'a, E> {
    ptr: NonNull<E>,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
    __marker: PhantomData<&'a mut E>,
}

unsafe impl<E: Send> Send for MatMut<'_, E> {}
unsafe impl<E: Sync> Sync for MatMut<'_, E> {}

impl<'short, E> Reborrow<'short> for MatMut<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        unsafe {
            MatRef::__from_raw_parts(
                self.ptr.as_ptr(),
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }
}

impl<'short, E> ReborrowMut<'short> for MatMut<'_, E> {
    type Target = MatMut<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        unsafe {
            MatMut::__from_raw_parts(
                self.ptr.as_ptr(),
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }
}

impl<'a, E> IntoConst for MatMut<'a, E> {
    type Target = MatRef<'a, E>;

    #[inline]
    fn into_const(self) -> Self::Target {
        unsafe {
            MatRef::__from_raw_parts(
                self.ptr.as_ptr(),
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }
}

impl<'a, E> MatMut<'a, E> {
    #[inline]
    pub(crate) unsafe fn __from_raw_parts(
        ptr: *mut E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            ptr: NonNull::new_unchecked(ptr),
            nrows,
            ncols,
            row_stride,
            col_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a mutable pointer to the matrix data.
    #[inline(always)]
    pub fn as_ptr_mut(self) -> *mut E {
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
    pub fn ptr_at_mut(self, row: usize, col: usize) -> *mut E {
        self.ptr
            .as_ptr()
            .wrapping_offset(offset(self.row_stride, self.col_stride, row, col))
    }

    /// Reads the value of the element at the given indices, with bound checks.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E
    where
        E: Copy,
    {
        self.rb().read(row, col)
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
        self.rb().read_unchecked(row, col)
    }

    /// Writes the value to the element at the given indices, with bound checks.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn write(&mut self, row: usize, col: usize, value: E) {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.write_unchecked(row, col, value) };
    }

    /// Writes the value to the element at the given indices.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub unsafe fn write_unchecked(&mut self, row: usize, col: usize, value: E) {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        self.rb_mut().ptr_at_mut(row, col).write(value);
    }

    /// Copies the values from `other` into `self`.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `self.nrows() == other.nrows()`.
    /// * `self.ncols() == other.ncols()`.
    #[track_caller]
    pub fn copy_from(&mut self, other: MatRef<'_, E>)
    where
        E: Copy,
    {
        assert!(all(self.nrows() == other.nrows(), self.ncols() == other.ncols()));
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { self.write_unchecked(i, j, other.read_unchecked(i, j)) };
            }
        }
    }

    /// Fills the elements of `self` with copies of `constant`.
    pub fn fill(&mut self, constant: E)
    where
        E: Copy,
    {
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { self.write_unchecked(i, j, constant) };
            }
        }
    }

    /// Fills the elements of `self` with zeros.
    pub fn fill_zero(&mut self)
    where
        E: crate::ComplexField,
    {
        self.fill(E::zero())
    }

    /// Swaps the rows `a` and `b`.
    #[track_caller]
    pub fn swap_rows(&mut self, a: usize, b: usize)
    where
        E: Copy,
    {
        assert!(all(a < self.nrows(), b < self.nrows()));
        if a == b {
            return;
        }
        for j in 0..self.ncols() {
            unsafe {
                let x = self.read_unchecked(a, j);
                let y = self.read_unchecked(b, j);
                self.write_unchecked(a, j, y);
                self.write_unchecked(b, j, x);
            }
        }
    }

    /// Swaps the columns `a` and `b`.
    #[track_caller]
    pub fn swap_cols(&mut self, a: usize, b: usize)
    where
        E: Copy,
    {
        self.rb_mut().transpose_mut().swap_rows(a, b)
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
    pub fn submatrix_mut(
        self,
        row_start: usize,
        col_start: usize,
        nrows: usize,
        ncols: usize,
    ) -> Self {
        unsafe { self.into_const().submatrix(row_start, col_start, nrows, ncols).const_cast() }
    }

    /// Returns a view over the rows `[row_start, row_start + nrows)`.
    #[track_caller]
    #[inline(always)]
    pub fn subrows_mut(self, row_start: usize, nrows: usize) -> Self {
        let ncols = self.ncols();
        self.submatrix_mut(row_start, 0, nrows, ncols)
    }

    /// Returns a view over the columns `[col_start, col_start + ncols)`.
    #[track_caller]
    #[inline(always)]
    pub fn subcols_mut(self, col_start: usize, ncols: usize) -> Self {
        let nrows = self.nrows();
        self.submatrix_mut(0, col_start, nrows, ncols)
    }

    /// Splits the matrix horizontally and vertically at the given indices into four corners and
    /// returns an array of each submatrix, in the following order:
    /// * top left.
    /// * top right.
    /// * bottom left.
    /// * bottom right.
    #[track_caller]
    #[inline(always)]
    pub fn split_at_mut(self, row: usize, col: usize) -> (Self, Self, Self, Self) {
        let (tl, tr, bl, br) = self.into_const().split_at(row, col);
        unsafe { (tl.const_cast(), tr.const_cast(), bl.const_cast(), br.const_cast()) }
    }

    /// Splits the matrix horizontally at the given row into the top and bottom parts.
    #[track_caller]
    #[inline(always)]
    pub fn split_at_row_mut(self, row: usize) -> (Self, Self) {
        let (top, bot) = self.into_const().split_at_row(row);
        unsafe { (top.const_cast(), bot.const_cast()) }
    }

    /// Splits the matrix vertically at the given column into the left and right parts.
    #[track_caller]
    #[inline(always)]
    pub fn split_at_col_mut(self, col: usize) -> (Self, Self) {
        let (left, right) = self.into_const().split_at_col(col);
        unsafe { (left.const_cast(), right.const_cast()) }
    }

    /// Returns a view over the column at the given index, as an `nrows × 1` matrix.
    #[track_caller]
    #[inline(always)]
    pub fn col_mut(self, j: usize) -> Self {
        unsafe { self.into_const().col(j).const_cast() }
    }

    /// Returns a view over the row at the given index, as a `1 × ncols` matrix.
    #[track_caller]
    #[inline(always)]
    pub fn row_mut(self, i: usize) -> Self {
        unsafe { self.into_const().row(i).const_cast() }
    }

    /// Returns the transpose of `self`.
    #[inline(always)]
    #[must_use]
    pub fn transpose_mut(self) -> Self {
        unsafe { self.into_const().transpose().const_cast() }
    }

    /// Returns a view over `self` with its rows in reverse order.
    #[inline(always)]
    #[must_use]
    pub fn reverse_rows_mut(self) -> Self {
        unsafe { self.into_const().reverse_rows().const_cast() }
    }
}

impl<'a, E> MatRef<'a, E> {
    /// # Safety
    /// No other view may alias the data for the lifetime `'a`.
    #[inline(always)]
    pub(crate) unsafe fn const_cast(self) -> MatMut<'a, E> {
        MatMut::__from_raw_parts(
            self.as_ptr() as *mut E,
            self.nrows(),
            self.ncols(),
            self.row_stride(),
            self.col_stride(),
        )
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for MatMut<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.rb().fmt(f)
    }
}
