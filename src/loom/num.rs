use std::{
    fmt::Debug,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

use bytemuck::Pod;
use half::f16;

use super::{dual::Id, space::Field};

/// Identity tag of the real numbers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Real;

impl Id for Real {
    const NAME: &'static str = "Real";
}

pub type RealField = Field<Real>;

pub trait Zero {
    fn zero() -> Self;
}

impl Zero for f16 {
    fn zero() -> Self {
        Self::ZERO
    }
}

impl Zero for f32 {
    fn zero() -> Self {
        0.0
    }
}

impl Zero for f64 {
    fn zero() -> Self {
        0.0
    }
}

pub trait One {
    fn one() -> Self;
}

impl One for f16 {
    fn one() -> Self {
        Self::ONE
    }
}

impl One for f32 {
    fn one() -> Self {
        1.0
    }
}

impl One for f64 {
    fn one() -> Self {
        1.0
    }
}

/// A component type of tensors. Each scalar belongs to exactly one field, and a tensor can
/// only be built over a concept of that same field.
pub trait Scalar:
    Sized
    + Pod
    + Zero
    + One
    + Debug
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
    + sealed::Sealed
{
    type Field;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Scalar for f16 {
    type Field = RealField;

    #[inline]
    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
}

impl Scalar for f32 {
    type Field = RealField;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    type Field = RealField;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

mod sealed {
    use half::f16;

    pub trait Sealed {}

    impl Sealed for f16 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

#[cfg(test)]
mod tests {
    use half::f16;

    use super::{One, Scalar, Zero};

    #[test]
    fn test_round_trip_f64() {
        assert_eq!(f16::from_f64(0.5).to_f64(), 0.5);
        assert_eq!(<f32 as Scalar>::from_f64(2.0), 2.0f32);
        assert_eq!(f16::zero() + f16::one(), f16::ONE);
    }
}
