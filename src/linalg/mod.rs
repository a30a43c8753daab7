//! Linear algebra module.
//!
//! Contains the dense primitives (matrix multiplication, triangular solves, norms), the blocked
//! factorizations built on top of them, and the packed Householder reflector kernel.
//!
//! # Memory allocation
//! Most algorithms defer memory allocation to the user. Algorithms that need temporary space for
//! intermediate computations take a [`stack: PodStack`](dyn_stack::PodStack) parameter, and
//! come with a corresponding function with a similar name ending in `_req` that returns the
//! memory requirements of the algorithm. For example: [`lu::partial_pivoting::lu_in_place`] and
//! [`lu::partial_pivoting::lu_in_place_req`].
//!
//! The memory stack may be reused in user-code to avoid repeated allocations, and it is also
//! possible to compute the sum ([`dyn_stack::StackReq::all_of`]) or union
//! ([`dyn_stack::StackReq::any_of`]) of multiple requirements, in order to optimally combine them
//! into a single allocation. The simplest way to allocate the memory is through
//! [`dyn_stack::GlobalPodBuffer::new`].

use crate::{
    mat::{self, MatMut},
    ComplexField,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};

pub mod diagonal;
pub mod householder;
pub mod lu;
pub mod matmul;
pub mod multishift;
pub mod reductions;
pub mod sign;
pub mod triangular_solve;

/// Returns the stack requirements for creating a temporary matrix with the given dimensions.
#[inline]
pub fn temp_mat_req<E: ComplexField>(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<E>(nrows.checked_mul(ncols).ok_or(SizeOverflow)?)
}

/// Creates a temporary matrix of untouched values, from the given memory stack.
///
/// # Panics
/// Panics if the stack is too small to hold the matrix.
#[track_caller]
pub fn temp_mat_uninit<E: ComplexField>(
    nrows: usize,
    ncols: usize,
    stack: PodStack<'_>,
) -> (MatMut<'_, E>, PodStack<'_>) {
    let (alloc, stack) = stack.make_raw::<E>(nrows * ncols);
    (mat::from_column_major_slice_mut(alloc, nrows, ncols), stack)
}

/// Creates a temporary matrix of zero values, from the given memory stack.
///
/// # Panics
/// Panics if the stack is too small to hold the matrix.
#[track_caller]
pub fn temp_mat_zeroed<E: ComplexField>(
    nrows: usize,
    ncols: usize,
    stack: PodStack<'_>,
) -> (MatMut<'_, E>, PodStack<'_>) {
    let (mut mat, stack) = temp_mat_uninit::<E>(nrows, ncols, stack);
    mat.fill_zero();
    (mat, stack)
}

/// Multiplies every element of `matrix` by `alpha`.
pub fn scale<E: ComplexField>(alpha: E, matrix: MatMut<'_, E>) {
    let mut matrix = matrix;
    for j in 0..matrix.ncols() {
        for i in 0..matrix.nrows() {
            unsafe {
                let v = matrix.read_unchecked(i, j);
                matrix.write_unchecked(i, j, alpha * v);
            }
        }
    }
}
