//! Scalar types the library operates on.
//!
//! Every algorithm is written once against [`ComplexField`] and works for `f32`, `f64`, [`c32`]
//! and [`c64`]. [`RealField`] is the subset of fields that are their own real part and that
//! come with an ordering.

use core::fmt::Debug;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};
use num_complex::Complex;

/// 32-bit complex floating point type.
#[allow(non_camel_case_types)]
pub type c32 = Complex<f32>;
/// 64-bit complex floating point type.
#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

/// Trait for scalar types that form a field, real or complex.
pub trait ComplexField:
    Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + bytemuck::Pod
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Real part type.
    type Real: RealField;

    /// Returns the additive identity.
    fn zero() -> Self;
    /// Returns the multiplicative identity.
    fn one() -> Self;

    /// Converts a real value to `Self`.
    fn from_real(value: Self::Real) -> Self;
    /// Converts an `f64` to `Self`, rounding if necessary.
    fn from_f64(value: f64) -> Self;

    /// Returns the real part.
    fn real(self) -> Self::Real;
    /// Returns the imaginary part.
    fn imag(self) -> Self::Real;
    /// Returns the complex conjugate.
    fn conj(self) -> Self;
    /// Returns the multiplicative inverse. The inverse of zero is non-finite.
    fn inv(self) -> Self;
    /// Multiplies `self` by a real value.
    fn scale_real(self, factor: Self::Real) -> Self;

    /// Returns the modulus.
    fn abs(self) -> Self::Real;
    /// Returns the squared modulus.
    fn abs2(self) -> Self::Real;
    /// Returns a magnitude that is cheap to compute and monotonic in the modulus for real
    /// values. Used to rank pivot candidates.
    fn score(self) -> Self::Real;

    /// Returns `true` if both the real and imaginary parts are finite.
    fn is_finite(self) -> bool;
}

/// Trait for real scalar types.
pub trait RealField: ComplexField<Real = Self> + PartialOrd {
    /// Machine epsilon.
    fn epsilon() -> Self;
    /// Smallest positive normal value.
    fn min_positive() -> Self;

    /// Square root.
    fn sqrt(self) -> Self;
    /// Natural logarithm.
    fn ln(self) -> Self;
    /// Exponential function.
    fn exp(self) -> Self;
    /// `self` raised to the power `exponent`.
    fn powf(self, exponent: Self) -> Self;
    /// Larger of two values, ignoring NaNs.
    fn max(self, other: Self) -> Self;

    /// Converts to `f64`.
    fn to_f64(self) -> f64;
}

macro_rules! impl_real {
    ($ty: ty) => {
        impl ComplexField for $ty {
            type Real = $ty;

            #[inline(always)]
            fn zero() -> Self {
                0.0
            }
            #[inline(always)]
            fn one() -> Self {
                1.0
            }
            #[inline(always)]
            fn from_real(value: Self) -> Self {
                value
            }
            #[inline(always)]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
            #[inline(always)]
            fn real(self) -> Self {
                self
            }
            #[inline(always)]
            fn imag(self) -> Self {
                0.0
            }
            #[inline(always)]
            fn conj(self) -> Self {
                self
            }
            #[inline(always)]
            fn inv(self) -> Self {
                1.0 / self
            }
            #[inline(always)]
            fn scale_real(self, factor: Self) -> Self {
                self * factor
            }
            #[inline(always)]
            fn abs(self) -> Self {
                <$ty>::abs(self)
            }
            #[inline(always)]
            fn abs2(self) -> Self {
                self * self
            }
            #[inline(always)]
            fn score(self) -> Self {
                <$ty>::abs(self)
            }
            #[inline(always)]
            fn is_finite(self) -> bool {
                <$ty>::is_finite(self)
            }
        }

        impl RealField for $ty {
            #[inline(always)]
            fn epsilon() -> Self {
                <$ty>::EPSILON
            }
            #[inline(always)]
            fn min_positive() -> Self {
                <$ty>::MIN_POSITIVE
            }
            #[inline(always)]
            fn sqrt(self) -> Self {
                <$ty>::sqrt(self)
            }
            #[inline(always)]
            fn ln(self) -> Self {
                <$ty>::ln(self)
            }
            #[inline(always)]
            fn exp(self) -> Self {
                <$ty>::exp(self)
            }
            #[inline(always)]
            fn powf(self, exponent: Self) -> Self {
                <$ty>::powf(self, exponent)
            }
            #[inline(always)]
            fn max(self, other: Self) -> Self {
                <$ty>::max(self, other)
            }
            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

macro_rules! impl_complex {
    ($real: ty) => {
        impl ComplexField for Complex<$real> {
            type Real = $real;

            #[inline(always)]
            fn zero() -> Self {
                Complex::new(0.0, 0.0)
            }
            #[inline(always)]
            fn one() -> Self {
                Complex::new(1.0, 0.0)
            }
            #[inline(always)]
            fn from_real(value: $real) -> Self {
                Complex::new(value, 0.0)
            }
            #[inline(always)]
            fn from_f64(value: f64) -> Self {
                Complex::new(value as $real, 0.0)
            }
            #[inline(always)]
            fn real(self) -> $real {
                self.re
            }
            #[inline(always)]
            fn imag(self) -> $real {
                self.im
            }
            #[inline(always)]
            fn conj(self) -> Self {
                Complex::new(self.re, -self.im)
            }
            #[inline(always)]
            fn inv(self) -> Self {
                Complex::new(1.0, 0.0) / self
            }
            #[inline(always)]
            fn scale_real(self, factor: $real) -> Self {
                Complex::new(self.re * factor, self.im * factor)
            }
            #[inline(always)]
            fn abs(self) -> $real {
                <$real>::hypot(self.re, self.im)
            }
            #[inline(always)]
            fn abs2(self) -> $real {
                self.re * self.re + self.im * self.im
            }
            #[inline(always)]
            fn score(self) -> $real {
                self.re * self.re + self.im * self.im
            }
            #[inline(always)]
            fn is_finite(self) -> bool {
                self.re.is_finite() && self.im.is_finite()
            }
        }
    };
}

impl_real!(f32);
impl_real!(f64);
impl_complex!(f32);
impl_complex!(f64);

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn real_ops() {
        assert_eq!(ComplexField::inv(4.0f64), 0.25);
        assert_eq!(ComplexField::abs(-3.0f64), 3.0);
        assert_eq!(ComplexField::score(-3.0f32), 3.0);
        assert!(!ComplexField::inv(0.0f64).is_finite());
        assert_approx_eq!(RealField::sqrt(2.0f64), core::f64::consts::SQRT_2);
    }

    #[test]
    fn complex_ops() {
        let z = c64::new(3.0, 4.0);
        assert_approx_eq!(z.abs(), 5.0);
        assert_approx_eq!(z.abs2(), 25.0);
        assert_eq!(ComplexField::conj(z), c64::new(3.0, -4.0));

        let w = ComplexField::inv(z) * z;
        assert_approx_eq!(w.re, 1.0);
        assert_approx_eq!(w.im, 0.0);

        assert_eq!(z.scale_real(2.0), c64::new(6.0, 8.0));
        assert!(!ComplexField::is_finite(ComplexField::inv(c64::zero())));
    }
}
