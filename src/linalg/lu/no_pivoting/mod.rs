//! The LU decomposition without pivoting is such that:
//! $$A = LU,$$
//! where $L$ is a unit lower triangular matrix, and $U$ is an upper triangular matrix.
//!
//! It is only numerically stable for matrices that do not need row interchanges, such as
//! diagonally dominant matrices.

/// Computing the decomposition.
pub mod compute;

pub use compute::{lu_in_place, lu_in_place_req};
