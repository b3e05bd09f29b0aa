use std::fmt;

use itertools::Itertools;

use super::{ExprError, Expression, check_rank, check_reuse, symbols};
use crate::loom::{
    array::MemoryRange,
    index::{AbstractIndex, DimIndex, IndexMap, MAX_RANK, MultiIndex},
    num::Zero,
    typle::unique_in,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Outer product of two expressions, contracted over every index free in both.
///
/// A contracted index must range over dual factors on the two sides. The free indices of the
/// result are those of the left operand followed by those of the right, contracted ones
/// removed.
pub struct Multiplication<L, R> {
    left: L,
    right: R,
    free: Vec<DimIndex>,
    used: Vec<AbstractIndex>,
    /// For each free index of the result, the operand and position it reads from.
    slots: Vec<(Side, usize)>,
    /// Positions in the left and right free indices of each contracted index.
    summed: Vec<(usize, usize)>,
    counter: MultiIndex,
}

impl<L, R> Multiplication<L, R>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    pub fn new(left: L, right: R) -> Result<Self, ExprError> {
        check_reuse(&left, &right)?;

        let right_symbols = symbols(right.free_indices());
        let mut free = vec![];
        let mut slots = vec![];
        let mut summed = vec![];
        for (p, index) in left.free_indices().iter().enumerate() {
            match right_symbols.position(index.index) {
                Some(q) => {
                    let other = &right.free_indices()[q];
                    if !index.factor.is_dual_of(&other.factor) {
                        return Err(ExprError::NotDual {
                            index: index.index,
                            left: index.factor.clone(),
                            right: other.factor.clone(),
                        });
                    }
                    summed.push((p, q));
                }
                None => {
                    free.push(index.clone());
                    slots.push((Side::Left, p));
                }
            }
        }
        for (q, index) in right.free_indices().iter().enumerate() {
            if summed.iter().all(|&(_, other)| other != q) {
                free.push(index.clone());
                slots.push((Side::Right, q));
            }
        }
        check_rank(free.len())?;

        let contracted = summed.iter().map(|&(p, _)| left.free_indices()[p].index);
        let used = unique_in(
            left.used_indices()
                .iter()
                .chain(right.used_indices())
                .copied()
                .chain(contracted),
        );
        let dims = summed
            .iter()
            .map(|&(p, _)| left.free_indices()[p].dim)
            .collect_vec();
        let counter = MultiIndex::new(&dims)?;

        Ok(Self {
            left,
            right,
            free,
            used,
            slots,
            summed,
            counter,
        })
    }

    /// The indices contracted at this node.
    pub fn contracted(&self) -> impl Iterator<Item = AbstractIndex> + '_ {
        self.summed
            .iter()
            .map(|&(p, _)| self.left.free_indices()[p].index)
    }
}

impl<L: fmt::Debug, R: fmt::Debug> fmt::Debug for Multiplication<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplication")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("free", &self.free)
            .finish()
    }
}

impl<L, R> Expression for Multiplication<L, R>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    type Scalar = L::Scalar;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        &self.free
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        &self.used
    }

    fn component(&self, index: &[usize]) -> Self::Scalar {
        let mut left = [0; MAX_RANK];
        let mut right = [0; MAX_RANK];
        for (&(side, position), &value) in self.slots.iter().zip(index) {
            match side {
                Side::Left => left[position] = value,
                Side::Right => right[position] = value,
            }
        }
        let (left_rank, right_rank) = (self.left.rank(), self.right.rank());
        if self.summed.is_empty() {
            return self.left.component(&left[..left_rank])
                * self.right.component(&right[..right_rank]);
        }

        let mut counter = self.counter;
        let mut sum = Self::Scalar::zero();
        while !counter.is_at_end() {
            for (&(p, q), &value) in self.summed.iter().zip(counter.values()) {
                left[p] = value;
                right[q] = value;
            }
            sum += self.left.component(&left[..left_rank])
                * self.right.component(&right[..right_rank]);
            counter.increment();
        }
        sum
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
        basic::{Covector, Operator, Vector},
        expr::{ExprError, Expression, tests::random_components},
        loom::index::AbstractIndex,
    };

    #[test]
    fn test_matrix_product() -> Result<(), Box<dyn Error>> {
        let mut rng = fastrand::Rng::with_seed(7);
        let a = Operator::<2, 3>::from_components(random_components(&mut rng, 6))?;
        let b = Operator::<3, 4>::from_components(random_components(&mut rng, 12))?;

        let product = a.idx(('i', 'j'))? * b.idx(('j', 'k'))?;
        assert_eq!(product.rank(), 2);
        assert_eq!(product.used_indices(), &[AbstractIndex::new('j')]);
        let c = product.eval()?;
        for (i, k) in itertools::iproduct!(0..2, 0..4) {
            let expected: f64 = (0..3)
                .map(|j| a.as_slice()[3 * i + j] * b.as_slice()[4 * j + k])
                .sum();
            assert!((c.component(&[i, k]) - expected).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_free_order() -> Result<(), Box<dyn Error>> {
        let v = Vector::<2>::from_components([1.0, 2.0])?;
        let d = Covector::<3>::from_components([1.0, 10.0, 100.0])?;
        let outer = d.idx('j')? * v.idx('i')?;
        let free = outer.free_symbols();
        assert_eq!(&free[..], &[AbstractIndex::new('j'), AbstractIndex::new('i')]);
        assert_eq!(outer.component(&[2, 1]), 200.0);
        Ok(())
    }

    #[test]
    fn test_reuse() -> Result<(), Box<dyn Error>> {
        let v = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
        let d = Covector::<3>::from_components([1.0, 1.0, 1.0])?;
        let w = Vector::<3>::from_components([0.0, 1.0, 0.0])?;

        // 'i' is summed on the left and free on the right
        let err = (v.idx('i')? * d.idx('i')?).try_mul(w.idx('i')?).unwrap_err();
        assert!(matches!(err, ExprError::IndexReuse { .. }));

        let value = (v.idx('i')? * d.idx('i')?) * (w.idx('j')? * d.idx('j')?);
        assert_eq!(value.value()?, 6.0);
        Ok(())
    }
}
