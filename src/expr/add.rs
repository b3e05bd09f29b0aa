use std::fmt;

use super::{ExprError, Expression, check_reuse, match_free};
use crate::loom::{
    array::MemoryRange,
    index::{AbstractIndex, DimIndex, IndexMap, MAX_RANK},
    typle::{concat, unique_in},
};

/// Element-wise sum (`OP = '+'`) or difference (`OP = '-'`) of two expressions with the same
/// free indices, in any order. The result takes the index order of the left operand.
pub struct Addition<L, R, const OP: char> {
    left: L,
    right: R,
    /// Position in the left free indices of each free index of the right operand.
    permutation: Vec<usize>,
    used: Vec<AbstractIndex>,
}

impl<L, R, const OP: char> Addition<L, R, OP>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    const VALID: () = assert!(OP == '+' || OP == '-', "addition operator must be '+' or '-'");

    pub fn new(left: L, right: R) -> Result<Self, ExprError> {
        let () = Self::VALID;
        check_reuse(&left, &right)?;
        let permutation = match_free(left.free_indices(), right.free_indices())?;
        let used = unique_in(concat(left.used_indices(), right.used_indices()));
        Ok(Self {
            left,
            right,
            permutation,
            used,
        })
    }

    #[inline]
    pub fn left(&self) -> &L {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &R {
        &self.right
    }
}

impl<L: fmt::Debug, R: fmt::Debug, const OP: char> fmt::Debug for Addition<L, R, OP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addition")
            .field("op", &OP)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}

impl<L, R, const OP: char> Expression for Addition<L, R, OP>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    type Scalar = L::Scalar;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        self.left.free_indices()
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        &self.used
    }

    fn component(&self, index: &[usize]) -> Self::Scalar {
        let mut buffer = [0; MAX_RANK];
        for (k, &position) in self.permutation.iter().enumerate() {
            buffer[k] = index[position];
        }
        let left = self.left.component(index);
        let right = self.right.component(&buffer[..self.permutation.len()]);
        match OP {
            '+' => left + right,
            _ => left - right,
        }
    }

    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool {
        self.left.overlaps_memory_range(range) || self.right.overlaps_memory_range(range)
    }

    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError> {
        let left = self.left.reindexed(map)?;
        let right = self.right.reindexed(map)?;
        Self::new(left, right)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::{
        basic::{Tensor2, Vector},
        expr::{ExprError, Expression},
    };

    #[test]
    fn test_symmetric_part() -> Result<(), Box<dyn Error>> {
        let t = Tensor2::<3, 3>::from_fn(|index| index.value() as f64);
        let mut s = Tensor2::<3, 3>::zeros();
        s.idx_mut(('i', 'j'))?
            .assign((t.idx(('i', 'j'))? + t.idx(('j', 'i'))?) / 2.0)?;
        for i in 0..3 {
            for j in 0..3 {
                let (a, b) = (s.as_slice()[3 * i + j], s.as_slice()[3 * j + i]);
                assert_eq!(a, b);
                assert_eq!(a, (3 * i + j + 3 * j + i) as f64 / 2.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_difference() -> Result<(), Box<dyn Error>> {
        let u = Vector::<2>::from_components([3.0, 5.0])?;
        let v = Vector::<2>::from_components([1.0, 1.0])?;
        let diff = u.idx('i')?.try_sub(v.idx('i')?)?;
        assert!(diff.used_indices().is_empty());
        assert_eq!(diff.eval()?.components(), vec![2.0, 4.0]);

        let err = u.idx('i')?.try_add(v.idx('j')?).unwrap_err();
        assert!(matches!(err, ExprError::FreeIndexMismatch { .. }));
        Ok(())
    }
}
