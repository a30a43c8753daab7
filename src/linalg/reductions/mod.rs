//! Matrix norms.

use crate::{mat::MatRef, ComplexField, RealField};

mod norm_l1;
mod norm_l2;
mod norm_max;

pub use norm_l1::norm_one;
pub use norm_l2::norm_frobenius;
pub use norm_max::norm_max;
