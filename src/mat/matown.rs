use super::*;
use crate::{assert, ComplexField};

/// Heap allocated matrix, similar to a 2D [`Vec`].
///
/// # Note
///
/// The memory layout of `Mat` is column-major and contiguous: it has a row stride of `1` and a
/// column stride equal to the number of rows.
#[derive(Clone)]
pub struct Mat<E> {
    data: Vec<E>,
    nrows: usize,
    ncols: usize,
}

impl<E> Default for Mat<E> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Mat<E> {
    /// Returns an empty matrix of dimension `0×0`.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            nrows: 0,
            ncols: 0,
        }
    }

    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with the provided function.
    ///
    /// The function is called in column-major order.
    ///
    /// # Panics
    /// The function panics if the total capacity in bytes exceeds `isize::MAX`.
    #[inline]
    pub fn from_fn(nrows: usize, ncols: usize, f: impl FnMut(usize, usize) -> E) -> Self {
        let mut f = f;
        let len = nrows.checked_mul(ncols).unwrap_or(usize::MAX);
        let mut data = Vec::with_capacity(len);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Creates a matrix from column-major storage.
    ///
    /// # Panics
    /// The function panics if `data.len() != nrows * ncols`.
    #[track_caller]
    #[inline]
    pub fn from_column_major(data: Vec<E>, nrows: usize, ncols: usize) -> Self {
        assert!(nrows.checked_mul(ncols) == Some(data.len()));
        Self { data, nrows, ncols }
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

    /// Returns the column-major storage of the matrix.
    #[inline(always)]
    pub fn as_slice(&self) -> &[E] {
        &self.data
    }

    /// Returns the column-major storage of the matrix.
    #[inline(always)]
    pub fn as_slice_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    /// Returns the column at index `j` as a slice.
    #[track_caller]
    #[inline(always)]
    pub fn col_as_slice(&self, j: usize) -> &[E] {
        assert!(j < self.ncols());
        &self.data[j * self.nrows..(j + 1) * self.nrows]
    }

    /// Returns a view over the matrix.
    #[inline(always)]
    pub fn as_ref(&self) -> MatRef<'_, E> {
        unsafe {
            from_raw_parts(
                self.data.as_ptr(),
                self.nrows,
                self.ncols,
                1,
                self.nrows as isize,
            )
        }
    }

    /// Returns a mutable view over the matrix.
    #[inline(always)]
    pub fn as_mut(&mut self) -> MatMut<'_, E> {
        let nrows = self.nrows;
        let ncols = self.ncols;
        unsafe {
            from_raw_parts_mut(
                self.data.as_mut_ptr(),
                nrows,
                ncols,
                1,
                nrows as isize,
            )
        }
    }

    /// Reads the value of the element at the given indices, with bound checks.
    #[track_caller]
    #[inline(always)]
    pub fn read(&self, row: usize, col: usize) -> E
    where
        E: Copy,
    {
        self.as_ref().read(row, col)
    }

    /// Writes the value to the element at the given indices, with bound checks.
    #[track_caller]
    #[inline(always)]
    pub fn write(&mut self, row: usize, col: usize, value: E) {
        self.as_mut().write(row, col, value)
    }

    /// Returns the transpose of `self`, as an owned matrix.
    #[inline]
    pub fn transpose(&self) -> Self
    where
        E: Copy,
    {
        self.as_ref().transpose().to_owned()
    }
}

impl<E: ComplexField> Mat<E> {
    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with zeros.
    #[inline]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::from_fn(nrows, ncols, |_, _| E::zero())
    }

    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with zeros, except the main
    /// diagonal which is filled with ones.
    #[inline]
    pub fn identity(nrows: usize, ncols: usize) -> Self {
        Self::from_fn(nrows, ncols, |i, j| if i == j { E::one() } else { E::zero() })
    }

    /// Returns the conjugate transpose of `self`, as an owned matrix.
    #[inline]
    pub fn adjoint(&self) -> Self {
        let this = self.as_ref();
        Self::from_fn(self.ncols, self.nrows, |i, j| this.read(j, i).conj())
    }
}

impl<E> core::ops::Index<(usize, usize)> for Mat<E> {
    type Output = E;

    #[track_caller]
    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &E {
        assert!(all(row < self.nrows(), col < self.ncols()));
        &self.data[row + col * self.nrows]
    }
}

impl<E> core::ops::IndexMut<(usize, usize)> for Mat<E> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut E {
        assert!(all(row < self.nrows(), col < self.ncols()));
        let nrows = self.nrows;
        &mut self.data[row + col * nrows]
    }
}

impl<E: PartialEq> PartialEq for Mat<E> {
    fn eq(&self, other: &Self) -> bool {
        self.nrows == other.nrows && self.ncols == other.ncols && self.data == other.data
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for Mat<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_ref().fmt(f)
    }
}
