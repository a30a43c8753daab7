//! `gridla` provides blocked dense factorizations and reflector kernels that run either on a
//! single process or on matrices distributed over a two-dimensional grid of processes.
//!
//! The local layer follows the usual view-based design: [`Mat`] owns its storage, while
//! [`MatRef`] and [`MatMut`] are strided views whose lifetimes are tied to the matrix they were
//! taken from. Routines that need scratch memory take a [`dyn_stack::PodStack`] and come with a
//! matching `*_req` function that reports how much memory they need.
//!
//! The distributed layer lives in [`dist`]. A [`dist::Grid`] arranges the ranks of a
//! [`dist::Transport`] into a `height × width` grid, and a [`dist::DistMat`] stores the entries
//! of a global matrix that a rank owns under a given pair of [`dist::Dist`] tags.
//!
//! # Example
//! ```
//! use dyn_stack::{GlobalPodBuffer, PodStack};
//! use gridla::linalg::lu::partial_pivoting;
//! use gridla::{mat, Parallelism};
//!
//! let mut a = mat![[2.0, 1.0], [4.0, 3.0f64]];
//! let mut perm = [0usize; 2];
//! let mut perm_inv = [0usize; 2];
//! let params = Default::default();
//!
//! let mut mem = GlobalPodBuffer::new(
//!     partial_pivoting::lu_in_place_req::<f64>(2, 2, params).unwrap(),
//! );
//! let (info, p) = partial_pivoting::lu_in_place(
//!     a.as_mut(),
//!     &mut perm,
//!     &mut perm_inv,
//!     params,
//!     Parallelism::None,
//!     PodStack::new(&mut mem),
//! )
//! .unwrap();
//!
//! assert_eq!(info.transposition_count, 1);
//! assert_eq!(p.arrays().0, &[1, 0]);
//! assert_eq!(a.read(0, 0), 4.0);
//! assert_eq!(a.read(1, 0), 0.5);
//! assert_eq!(a.read(1, 1), -0.5);
//! ```

#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(non_snake_case)]

use equator::{assert, debug_assert};

pub mod dist;
pub mod error;
pub mod field;
pub mod linalg;
pub mod mat;
pub mod perm;
pub mod utils;

pub use dyn_stack;
pub use reborrow;

pub use error::{Error, Result};
pub use field::{c32, c64, ComplexField, RealField};
pub use mat::{Mat, MatMut, MatRef};

/// Specifies whether the triangular lower or upper part of a matrix should be accessed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Lower half should be accessed.
    Lower,
    /// Upper half should be accessed.
    Upper,
}

/// Whether a matrix should be implicitly conjugated when read or not.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Conj {
    /// Do conjugate.
    Yes,
    /// Do not conjugate.
    No,
}

impl Conj {
    /// Combine `self` and `other` to create a new conjugation object.
    #[inline]
    pub fn compose(self, other: Conj) -> Conj {
        if self == other {
            Conj::No
        } else {
            Conj::Yes
        }
    }

    /// Applies the conjugation to `value`.
    #[inline(always)]
    pub fn apply<E: ComplexField>(self, value: E) -> E {
        match self {
            Conj::Yes => value.conj(),
            Conj::No => value,
        }
    }
}

/// Parallelism strategy that can be passed to most of the routines in the library.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Parallelism {
    /// No parallelism.
    ///
    /// The code is executed sequentially on the same thread that calls a function
    /// and passes this argument.
    None,
    /// Rayon parallelism. Only avaialble with the `rayon` feature.
    ///
    /// The code is possibly executed in parallel on the current thread, as well as the currently
    /// active rayon thread pool.
    ///
    /// The contained value represents a hint about the number of threads an implementation should
    /// use, but there is no way to guarantee how many or which threads will be used.
    ///
    /// A value of `0` treated as equivalent to `rayon::current_num_threads()`.
    #[cfg(feature = "rayon")]
    Rayon(usize),
}

#[doc(hidden)]
#[macro_export]
macro_rules! __mat_rows {
    ($($row:expr),+) => {
        [$($row),+]
    };
}

/// Creates a [`Mat`] containing the arguments, given row by row.
///
/// ```
/// use gridla::mat;
///
/// let matrix = mat![
///     [1.0, 5.0, 9.0],
///     [2.0, 6.0, 10.0],
///     [3.0, 7.0, 11.0],
///     [4.0, 8.0, 12.0f64],
/// ];
///
/// assert_eq!(matrix.read(0, 0), 1.0);
/// assert_eq!(matrix.read(1, 0), 2.0);
/// assert_eq!(matrix.read(3, 2), 12.0);
/// ```
#[macro_export]
macro_rules! mat {
    () => {
        {
            compile_error!("number of columns in the matrix is ambiguous");
        }
    };

    ($([$($v:expr),* $(,)?] ),+ $(,)?) => {
        {
            let rows = $crate::__mat_rows!($([$($v),*]),+);
            let nrows = rows.len();
            let ncols = rows[0].len();
            $crate::mat::Mat::from_fn(nrows, ncols, |i, j| rows[i][j])
        }
    };
}

/// Emits a performance warning once per call site.
#[macro_export]
#[doc(hidden)]
macro_rules! __perf_warn {
    ($($arg:tt)*) => {{
        static WARNED: ::core::sync::atomic::AtomicBool = ::core::sync::atomic::AtomicBool::new(false);
        if !WARNED.swap(true, ::core::sync::atomic::Ordering::Relaxed) {
            ::log::warn!(target: "gridla_perf", $($arg)*);
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, debug_assert};

    #[test]
    fn conj_compose() {
        assert!(Conj::Yes.compose(Conj::Yes) == Conj::No);
        assert!(Conj::No.compose(Conj::Yes) == Conj::Yes);
        assert!(Conj::No.compose(Conj::No) == Conj::No);
    }

    #[test]
    fn conj_apply() {
        let z = c64::new(1.0, 2.0);
        assert!(Conj::Yes.apply(z) == c64::new(1.0, -2.0));
        assert!(Conj::No.apply(z) == z);
        assert!(Conj::Yes.apply(3.0f64) == 3.0);
    }

    #[test]
    fn mat_macro_is_row_major() {
        let m = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0f64]];
        assert!(all(m.nrows() == 2, m.ncols() == 3));
        assert!(m.read(0, 2) == 3.0);
        assert!(m.read(1, 0) == 4.0);
    }

    #[test]
    fn debug_assert_is_reexported() {
        debug_assert!(1 + 1 == 2);
    }
}
