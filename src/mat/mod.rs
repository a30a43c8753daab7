//! Dense matrices and strided matrix views.
//!
//! [`Mat`] owns column-major storage. [`MatRef`] and [`MatMut`] are views described by a pointer,
//! a shape and a pair of strides, which may be negative or zero. Views never outlive the matrix
//! they borrow from.

use crate::{assert, debug_assert};
use core::{marker::PhantomData, ptr::NonNull};
use reborrow::*;

mod matmut;
mod matown;
mod matref;

pub use matmut::MatMut;
pub use matown::Mat;
pub use matref::MatRef;

#[inline(always)]
fn offset(row_stride: isize, col_stride: isize, i: usize, j: usize) -> isize {
    (i as isize).wrapping_mul(row_stride) + (j as isize).wrapping_mul(col_stride)
}

/// Creates a `MatRef` from pointers to the matrix data, dimensions, and strides.
///
/// # Safety
/// The behavior is undefined if any of the following conditions are violated:
/// * For each matrix unit, the entire memory region addressed by the matrix must be contained
/// within a single allocation, accessible in its entirety by the corresponding pointer.
/// * For each matrix unit, the corresponding pointer must be properly aligned,
/// even for a zero-sized matrix.
/// * The values accessible by the matrix must be initialized at some point before they are read.
/// * No mutable aliasing is allowed for the lifetime `'a`.
#[inline(always)]
pub unsafe fn from_raw_parts<'a, E>(
    ptr: *const E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
) -> MatRef<'a, E> {
    MatRef::__from_raw_parts(ptr, nrows, ncols, row_stride, col_stride)
}

/// Creates a `MatMut` from pointers to the matrix data, dimensions, and strides.
///
/// # Safety
/// Same as [`from_raw_parts`], and additionally no aliasing of any kind is allowed for the
/// lifetime `'a`.
#[inline(always)]
pub unsafe fn from_raw_parts_mut<'a, E>(
    ptr: *mut E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
) -> MatMut<'a, E> {
    MatMut::__from_raw_parts(ptr, nrows, ncols, row_stride, col_stride)
}

/// Creates a `MatRef` from slice views over the matrix data, and the matrix dimensions.
/// The data is interpreted in a column-major format, so that the first chunk of `nrows`
/// values from the slices goes in the first column of the matrix, the second chunk of `nrows`
/// values goes in the second column, and so on.
///
/// # Panics
/// The function panics if any of the following conditions are violated:
/// * `nrows * ncols == slice.len()`
#[track_caller]
#[inline(always)]
pub fn from_column_major_slice<E>(slice: &[E], nrows: usize, ncols: usize) -> MatRef<'_, E> {
    assert!(nrows.checked_mul(ncols) == Some(slice.len()));
    unsafe { from_raw_parts(slice.as_ptr(), nrows, ncols, 1, nrows as isize) }
}

/// Creates a `MatMut` from slice views over the matrix data, and the matrix dimensions.
/// The data is interpreted in a column-major format.
///
/// # Panics
/// The function panics if any of the following conditions are violated:
/// * `nrows * ncols == slice.len()`
#[track_caller]
#[inline(always)]
pub fn from_column_major_slice_mut<E>(
    slice: &mut [E],
    nrows: usize,
    ncols: usize,
) -> MatMut<'_, E> {
    assert!(nrows.checked_mul(ncols) == Some(slice.len()));
    unsafe { from_raw_parts_mut(slice.as_mut_ptr(), nrows, ncols, 1, nrows as isize) }
}
