use std::fmt;

use super::{ExprError, Expression};
use crate::loom::{
    array::MemoryRange,
    index::{AbstractIndex, DimIndex, IndexMap},
};

/// An expression multiplied (`OP = '*'`) or divided (`OP = '/'`) by a scalar.
pub struct ScalarMultiplication<E: Expression, const OP: char> {
    inner: E,
    scalar: E::Scalar,
}

impl<E: Expression, const OP: char> ScalarMultiplication<E, OP> {
    const VALID: () = assert!(OP == '*' || OP == '/', "scalar operator must be '*' or '/'");

    pub fn new(inner: E, scalar: E::Scalar) -> Self {
        let () = Self::VALID;
        Self { inner, scalar }
    }

    #[inline]
    pub fn scalar(&self) -> E::Scalar {
        self.scalar
    }
}

impl<E: Expression + fmt::Debug, const OP: char> fmt::Debug for ScalarMultiplication<E, OP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarMultiplication")
            .field("op", &OP)
            .field("inner", &self.inner)
            .field("scalar", &self.scalar)
            .finish()
    }
}

impl<E: Expression, const OP: char> Expression for ScalarMultiplication<E, OP> {
    type Scalar = E::Scalar;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        self.inner.free_indices()
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        self.inner.used_indices()
    }

    #[inline]
    fn component(&self, index: &[usize]) -> Self::Scalar {
        match OP {
            '*' => self.inner.component(index) * self.scalar,
            _ => self.inner.component(index) / self.scalar,
        }
    }

    #[inline]
    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool {
        self.inner.overlaps_memory_range(range)
    }

    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError> {
        Ok(Self {
            inner: self.inner.reindexed(map)?,
            scalar: self.scalar,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use half::f16;

    use crate::{basic::Vector, expr::Expression};

    #[test]
    fn test_scale() -> Result<(), Box<dyn Error>> {
        let v = Vector::<3>::from_components([1.0, 2.0, 4.0])?;
        assert_eq!((2.0 * v.idx('i')?).component(&[2]), 8.0);
        assert_eq!((v.idx('i')? / 4.0).component(&[1]), 0.5);
        assert_eq!((-v.idx('i')?).eval()?.components(), vec![-1.0, -2.0, -4.0]);

        let h = Vector::<2, f16>::from_components([f16::ONE, f16::from_f32(3.0)])?;
        let scaled = h.idx('i')? * f16::from_f32(0.5);
        assert_eq!(scaled.component(&[1]), f16::from_f32(1.5));
        Ok(())
    }
}
