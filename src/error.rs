//! Error type returned by the fallible entry points of the library.
//!
//! Contract violations (mismatched shapes, invalid parameters, distributed operands living on
//! different grids) are detected before any operand is mutated and reported as an [`Error`].
//! Numerical singularity in the factorizations is not an error: zero pivots propagate
//! non-finite values through the factors.

use thiserror::Error;

/// Errors reported by the library.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Two operands have incompatible shapes.
    #[error("{op}: dimension mismatch (expected {expected:?}, found {found:?})")]
    DimensionMismatch {
        /// Name of the operation that detected the mismatch.
        op: &'static str,
        /// Expected `(nrows, ncols)`.
        expected: (usize, usize),
        /// Actual `(nrows, ncols)`.
        found: (usize, usize),
    },

    /// A parameter is outside of its valid range.
    #[error("{op}: invalid parameter ({reason})")]
    InvalidParameter {
        /// Name of the operation that rejected the parameter.
        op: &'static str,
        /// Description of the violated requirement.
        reason: &'static str,
    },

    /// Distributed operands were created on different grids.
    #[error("{op}: operands are distributed over different grids")]
    GridMismatch {
        /// Name of the operation that detected the mismatch.
        op: &'static str,
    },

    /// A distributed operand has a distribution or alignment the operation does not accept.
    #[error("{op}: invalid distribution ({reason})")]
    InvalidDistribution {
        /// Name of the operation that rejected the operand.
        op: &'static str,
        /// Description of the violated requirement.
        reason: &'static str,
    },

    /// A collective operation received data it did not expect.
    #[error("communication failure ({reason})")]
    Communication {
        /// Description of the failure.
        reason: &'static str,
    },

    /// A diagonal solve was asked to check for singularity and found a zero entry.
    #[error("singular matrix")]
    SingularMatrix,
}

/// Result type used throughout the library.
pub type Result<T, E = Error> = core::result::Result<T, E>;
