use std::fmt;

use itertools::Itertools;

use super::{ExprError, Expression, rename_free};
use crate::loom::{
    array::{Array, MemberArray, MemoryRange},
    index::{AbstractIndex, DimIndex, IndexMap, MultiIndex, flatten},
    num::Scalar,
};

/// The components of an expression, materialized into owned storage.
///
/// Evaluating the right-hand side first is how an assignment that reads its own target is
/// made safe.
#[derive(Clone)]
pub struct Evaluated<T> {
    array: MemberArray<T>,
    free: Vec<DimIndex>,
    dims: Vec<usize>,
}

impl<T: Scalar> Evaluated<T> {
    pub fn new<E: Expression<Scalar = T>>(expr: &E) -> Result<Self, ExprError> {
        let free = expr.free_indices().to_vec();
        let dims = free.iter().map(|index| index.dim).collect_vec();
        let mut counter = MultiIndex::new(&dims)?;
        log::debug!(
            "evaluate ({}) into {} components",
            free.iter().map(|index| index.index).format(", "),
            counter.len()
        );

        let mut array = MemberArray::filled(T::zero(), counter.len());
        while !counter.is_at_end() {
            array.as_mut_slice()[counter.flat()] = expr.component(counter.values());
            counter.increment();
        }
        Ok(Self { array, free, dims })
    }

    /// All components in row-major order of the free indices.
    #[inline]
    pub fn components(&self) -> Vec<T> {
        self.array.as_slice().to_vec()
    }

    #[inline]
    pub fn array(&self) -> &MemberArray<T> {
        &self.array
    }
}

impl<T: fmt::Debug> fmt::Debug for Evaluated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluated")
            .field("free", &self.free)
            .field("array", &self.array)
            .finish()
    }
}

impl<T: Scalar> Expression for Evaluated<T> {
    type Scalar = T;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        &self.free
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        &[]
    }

    #[inline]
    fn component(&self, index: &[usize]) -> T {
        self.array.get(flatten(index, &self.dims))
    }

    #[inline]
    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool {
        self.array.memory_range().overlaps(range)
    }

    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError> {
        Ok(Self {
            free: rename_free(&self.free, map)?,
            ..self
        })
    }
}
