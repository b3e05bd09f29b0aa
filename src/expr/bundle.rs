use std::fmt;

use itertools::Itertools;

use super::{
    ExprError, Expression, check_distinct, check_fresh, check_rank, find_free, rename_free,
};
use crate::loom::{
    array::MemoryRange,
    concept::{ConceptualStructure, IsTensorProductOfBasedVectorSpaces},
    index::{AbstractIndex, DimIndex, IndexList, IndexMap, MAX_RANK, flatten, unflatten},
    product::tensor_product_of_based_vector_spaces,
};

/// Fuses several free indices into one index over the tensor product of their factors.
///
/// The fused index comes last; the remaining free indices keep their order. Its components
/// are laid out row-major, the first bundled index running slowest.
pub struct Bundle<E> {
    inner: E,
    free: Vec<DimIndex>,
    /// Positions in the inner free indices of the remaining indices.
    outer: Vec<usize>,
    /// Positions in the inner free indices of the bundled indices.
    bundled: Vec<usize>,
    dims: Vec<usize>,
}

impl<E: Expression> Bundle<E> {
    pub fn new(inner: E, indices: IndexList, into: AbstractIndex) -> Result<Self, ExprError> {
        if indices.is_empty() {
            return Err(ExprError::NoIndices(into));
        }
        check_distinct(&indices)?;
        let bundled = indices
            .iter()
            .map(|&index| find_free(inner.free_indices(), index))
            .collect::<Result<Vec<_>, _>>()?;
        check_fresh(&inner, into, &indices)?;

        let factors = bundled
            .iter()
            .map(|&p| inner.free_indices()[p].factor.clone())
            .collect_vec();
        let dims = bundled
            .iter()
            .map(|&p| inner.free_indices()[p].dim)
            .collect_vec();
        let factor = tensor_product_of_based_vector_spaces(&factors)?;

        let outer = (0..inner.rank())
            .filter(|p| !bundled.contains(p))
            .collect_vec();
        let mut free = outer
            .iter()
            .map(|&p| inner.free_indices()[p].clone())
            .collect_vec();
        free.push(DimIndex::new(into, factor, dims.iter().product()));

        Ok(Self {
            inner,
            free,
            outer,
            bundled,
            dims,
        })
    }
}

impl<E: fmt::Debug> fmt::Debug for Bundle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("inner", &self.inner)
            .field("free", &self.free)
            .finish()
    }
}

impl<E: Expression> Expression for Bundle<E> {
    type Scalar = E::Scalar;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        &self.free
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        self.inner.used_indices()
    }

    fn component(&self, index: &[usize]) -> Self::Scalar {
        let mut buffer = [0; MAX_RANK];
        for (&p, &value) in self.outer.iter().zip(index) {
            buffer[p] = value;
        }
        let mut values = [0; MAX_RANK];
        let values = &mut values[..self.dims.len()];
        unflatten(index[self.outer.len()], &self.dims, values);
        for (&p, &value) in self.bundled.iter().zip(values.iter()) {
            buffer[p] = value;
        }
        self.inner.component(&buffer[..self.inner.rank()])
    }

    #[inline]
    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool {
        self.inner.overlaps_memory_range(range)
    }

    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError> {
        Ok(Self {
            free: rename_free(&self.free, map)?,
            inner: self.inner.reindexed(map)?,
            ..self
        })
    }
}

/// Splits a free index over a tensor product into one index per factor.
///
/// The new indices come last, in factor order; the remaining free indices keep their order.
pub struct Split<E> {
    inner: E,
    free: Vec<DimIndex>,
    /// Position in the inner free indices of the split index.
    position: usize,
    dims: Vec<usize>,
}

impl<E: Expression> Split<E> {
    pub fn new(inner: E, index: AbstractIndex, into: IndexList) -> Result<Self, ExprError> {
        let position = find_free(inner.free_indices(), index)?;
        let factor = &inner.free_indices()[position].factor;
        if !IsTensorProductOfBasedVectorSpaces::has_unique(factor) {
            return Err(ExprError::Structure {
                index,
                factor: factor.clone(),
                expected: IsTensorProductOfBasedVectorSpaces::NAME,
            });
        }
        let factors = IsTensorProductOfBasedVectorSpaces::unique_of(factor)?.factor_typle()?;
        if factors.len() != into.len() {
            return Err(ExprError::Degree {
                index,
                factor: factor.clone(),
                count: into.len(),
            });
        }
        check_distinct(&into)?;
        for &new in into.iter() {
            check_fresh(&inner, new, &[index])?;
        }
        check_rank(inner.rank() - 1 + into.len())?;

        let dims = factors
            .iter()
            .map(|factor| factor.dimension())
            .collect::<Result<Vec<_>, _>>()?;
        let mut free = inner.free_indices().to_vec();
        free.remove(position);
        free.extend(
            itertools::izip!(into.iter(), factors.iter(), &dims)
                .map(|(&new, factor, &dim)| DimIndex::new(new, factor.clone(), dim)),
        );

        Ok(Self {
            inner,
            free,
            position,
            dims,
        })
    }
}

impl<E: fmt::Debug> fmt::Debug for Split<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Split")
            .field("inner", &self.inner)
            .field("free", &self.free)
            .finish()
    }
}

impl<E: Expression> Expression for Split<E> {
    type Scalar = E::Scalar;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        &self.free
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        self.inner.used_indices()
    }

    fn component(&self, index: &[usize]) -> Self::Scalar {
        let rank = self.inner.rank();
        let (kept, split) = index.split_at(rank - 1);
        let mut buffer = [0; MAX_RANK];
        for (slot, &value) in (0..rank)
            .filter(|&p| p != self.position)
            .zip(kept)
        {
            buffer[slot] = value;
        }
        buffer[self.position] = flatten(split, &self.dims);
        self.inner.component(&buffer[..rank])
    }

    #[inline]
    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool {
        self.inner.overlaps_memory_range(range)
    }

    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError> {
        Ok(Self {
            free: rename_free(&self.free, map)?,
            inner: self.inner.reindexed(map)?,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::iproduct;

    use crate::{
        basic::{Operator, Space, Tensor2, Vector},
        expr::{ExprError, Expression, tests::random_components},
        loom::{
            concept::ConceptType, index::AbstractIndex, product::TensorProductOfBasedVectorSpaces,
        },
    };

    #[test]
    fn test_bundle_split() -> Result<(), Box<dyn Error>> {
        type Product = TensorProductOfBasedVectorSpaces<(Space<2>, Space<3>)>;

        let mut rng = fastrand::Rng::with_seed(3);
        let t = Tensor2::<2, 3>::from_components(random_components(&mut rng, 6))?;

        let bundled = t.idx(('i', 'j'))?.bundle(('i', 'j'), 'k')?;
        assert_eq!(bundled.rank(), 1);
        let k = &bundled.free_indices()[0];
        assert_eq!(k.dim, 6);
        assert_eq!(k.factor, Product::concept());
        for n in 0..6 {
            assert_eq!(bundled.component(&[n]), t.as_slice()[n]);
        }

        let split = bundled.split('k', ('a', 'b'))?;
        for (a, b) in iproduct!(0..2, 0..3) {
            assert_eq!(split.component(&[a, b]), t.as_slice()[3 * a + b]);
        }
        Ok(())
    }

    #[test]
    fn test_bundle_order() -> Result<(), Box<dyn Error>> {
        let t = Tensor2::<2, 3>::from_fn(|index| index.value() as f64);
        let v = Vector::<4>::from_components([1.0, 2.0, 3.0, 4.0])?;

        // bundle (j, i) of t(i, j) v(l): free indices become (l, k)
        let e = (t.idx(('i', 'j'))? * v.idx('l')?).bundle(('j', 'i'), 'k')?;
        let symbols = e.free_symbols();
        assert_eq!(&symbols[..], &[AbstractIndex::new('l'), AbstractIndex::new('k')]);
        // k = 2 * j + i
        assert_eq!(e.component(&[3, 2 * 2 + 1]), 4.0 * 5.0);
        Ok(())
    }

    #[test]
    fn test_bundle_errors() -> Result<(), Box<dyn Error>> {
        let t = Operator::<2, 2>::zeros();
        let err = t.idx(('i', 'j'))?.bundle(('i', 'x'), 'k').unwrap_err();
        assert!(matches!(err, ExprError::NotFree { .. }));

        let err = t.idx(('i', 'j'))?.bundle('i', 'j').unwrap_err();
        assert!(matches!(err, ExprError::IndexReuse { .. }));

        // splitting an index that is not over a tensor product
        let err = t.idx(('i', 'j'))?.split('i', ('a', 'b')).unwrap_err();
        assert!(matches!(err, ExprError::Structure { .. }));

        let bundled = t.idx(('i', 'j'))?.bundle(('i', 'j'), 'k')?;
        let err = bundled.split('k', ('a', 'b', 'c')).unwrap_err();
        assert!(matches!(err, ExprError::Degree { count: 3, .. }));
        Ok(())
    }
}
