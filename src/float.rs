use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive, ToPrimitive};

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Bundles the numeric and utility traits every sweep engine needs. Only
/// primitive float types implement this.
pub trait Float:
    NumFloat
    + FloatConst
    + FromPrimitive
    + ToPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + 'static
{
    /// Absolute-zero multiply: `0 * y == 0` even when `y` is infinite or NaN.
    #[inline]
    fn azmul(self, y: Self) -> Self {
        if self == Self::zero() {
            Self::zero()
        } else {
            self * y
        }
    }

    /// Sign with `sign(0) == 0`, unlike `num_traits::Float::signum`.
    #[inline]
    fn sign(self) -> Self {
        if self > Self::zero() {
            Self::one()
        } else if self < Self::zero() {
            -Self::one()
        } else {
            Self::zero()
        }
    }

    /// Lossless conversion of a small count into the float type.
    #[inline]
    fn from_count(k: usize) -> Self {
        Self::from_usize(k).unwrap_or_else(Self::nan)
    }

    /// Bit pattern used to identify constants during value numbering.
    fn key_bits(self) -> u64;
}

impl Float for f32 {
    #[inline]
    fn key_bits(self) -> u64 {
        u64::from(self.to_bits())
    }
}

impl Float for f64 {
    #[inline]
    fn key_bits(self) -> u64 {
        self.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::Float;

    #[test]
    fn azmul_absorbs_nan() {
        assert_eq!(0.0_f64.azmul(f64::NAN), 0.0);
        assert!(1.0_f64.azmul(f64::NAN).is_nan());
        assert_eq!(2.0_f64.azmul(3.0), 6.0);
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(0.0_f64.sign(), 0.0);
        assert_eq!((-2.5_f32).sign(), -1.0);
    }

    #[test]
    fn key_bits_distinguish_signed_zero() {
        assert_ne!(0.0_f64.key_bits(), (-0.0_f64).key_bits());
    }
}
