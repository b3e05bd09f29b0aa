use std::fmt;

use derive_more::Display;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    ExprError, Expression, check_distinct, check_fresh, check_rank, find_free, rename_free,
};
use crate::loom::{
    array::MemoryRange,
    concept::{Concept, ConceptualStructure, IsPowerOfBasedVectorSpace},
    index::{AbstractIndex, DimIndex, IndexList, IndexMap, MAX_RANK},
    num::{Scalar, Zero},
    power::{
        PowerKind, exterior_power_of_based_vector_space, next_permutation, orbit_size,
        symmetric_power_of_based_vector_space,
    },
};

/// How a symmetric or exterior power sits inside the tensor power of its factor.
///
/// With [`LinearEmbedding::Natural`] a basis element of the power maps to the sum (signed sum
/// for exterior powers) of the tensor basis elements in its orbit. With
/// [`LinearEmbedding::Orthonormal`] that sum is divided by the square root of the orbit size,
/// so the embedding is an isometry and its adjoint is a left inverse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinearEmbedding {
    #[default]
    Natural,
    Orthonormal,
}

impl LinearEmbedding {
    /// Coefficient of one tensor basis element in the image of a power basis element.
    #[inline]
    fn coefficient(self, sign: i32, orbit: usize) -> f64 {
        match self {
            Self::Natural => sign as f64,
            Self::Orthonormal => sign as f64 / (orbit as f64).sqrt(),
        }
    }
}

/// Replaces a free index over a symmetric or exterior power with one index per tensor factor.
pub struct Embed<E> {
    inner: E,
    free: Vec<DimIndex>,
    /// Position in the inner free indices of the embedded index.
    position: usize,
    kind: PowerKind,
    degree: usize,
    embedding: LinearEmbedding,
}

impl<E: Expression> Embed<E> {
    pub fn new(
        inner: E,
        index: AbstractIndex,
        into: IndexList,
        embedding: LinearEmbedding,
    ) -> Result<Self, ExprError> {
        let position = find_free(inner.free_indices(), index)?;
        let factor = &inner.free_indices()[position].factor;
        let power = match IsPowerOfBasedVectorSpace::has_unique(factor) {
            true => IsPowerOfBasedVectorSpace::unique_of(factor)?,
            false => {
                return Err(ExprError::Structure {
                    index,
                    factor: factor.clone(),
                    expected: IsPowerOfBasedVectorSpace::NAME,
                });
            }
        };
        let kind = PowerKind::of(power.structure()).ok_or_else(|| ExprError::Structure {
            index,
            factor: factor.clone(),
            expected: IsPowerOfBasedVectorSpace::NAME,
        })?;
        let degree = power.degree()?;
        if degree != into.len() {
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
        check_rank(inner.rank() - 1 + degree)?;

        let base = power.factor()?;
        let dim = base.dimension()?;
        let mut free = inner.free_indices().to_vec();
        free.remove(position);
        free.extend(into.iter().map(|&new| DimIndex::new(new, base.clone(), dim)));

        Ok(Self {
            inner,
            free,
            position,
            kind,
            degree,
            embedding,
        })
    }
}

impl<E: fmt::Debug> fmt::Debug for Embed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embed")
            .field("inner", &self.inner)
            .field("free", &self.free)
            .field("kind", &self.kind)
            .field("embedding", &self.embedding)
            .finish()
    }
}

impl<E: Expression> Expression for Embed<E> {
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
        let (kept, tuple) = index.split_at(rank - 1);

        let mut sorted = [0; MAX_RANK];
        let sorted = &mut sorted[..self.degree];
        sorted.copy_from_slice(tuple);
        let sign = self.kind.canonicalize(sorted);
        if sign == 0 {
            return Self::Scalar::zero();
        }

        let mut buffer = [0; MAX_RANK];
        for (slot, &value) in (0..rank).filter(|&p| p != self.position).zip(kept) {
            buffer[slot] = value;
        }
        buffer[self.position] = self.kind.rank(sorted);
        let coefficient = self.embedding.coefficient(sign, orbit_size(sorted));
        self.inner.component(&buffer[..rank]) * Self::Scalar::from_f64(coefficient)
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

/// Merges free indices over one based vector space into a single index over their
/// symmetric or exterior power: the adjoint of [`Embed`].
pub struct Coembed<E> {
    inner: E,
    free: Vec<DimIndex>,
    /// Positions in the inner free indices of the merged indices, in tuple order.
    merged: Vec<usize>,
    /// Positions in the inner free indices of the remaining indices.
    outer: Vec<usize>,
    kind: PowerKind,
    embedding: LinearEmbedding,
}

impl<E: Expression> Coembed<E> {
    pub fn new(
        inner: E,
        indices: IndexList,
        into: AbstractIndex,
        kind: PowerKind,
        embedding: LinearEmbedding,
    ) -> Result<Self, ExprError> {
        if indices.is_empty() {
            return Err(ExprError::NoIndices(into));
        }
        check_distinct(&indices)?;
        let merged = indices
            .iter()
            .map(|&index| find_free(inner.free_indices(), index))
            .collect::<Result<Vec<_>, _>>()?;
        check_fresh(&inner, into, &indices)?;

        let base: &Concept = &inner.free_indices()[merged[0]].factor;
        for &p in &merged[1..] {
            let other = &inner.free_indices()[p];
            if other.factor != *base {
                return Err(ExprError::FactorMismatch {
                    index: other.index,
                    expected: base.clone(),
                    found: other.factor.clone(),
                });
            }
        }
        let degree = merged.len();
        let power = match kind {
            PowerKind::Symmetric => symmetric_power_of_based_vector_space(base, degree)?,
            PowerKind::Exterior => exterior_power_of_based_vector_space(base, degree)?,
        };
        let dim = power.dimension()?;

        let outer: Vec<usize> = (0..inner.rank()).filter(|p| !merged.contains(p)).collect();
        let mut free: Vec<DimIndex> = outer
            .iter()
            .map(|&p| inner.free_indices()[p].clone())
            .collect();
        free.push(DimIndex::new(into, power, dim));

        Ok(Self {
            inner,
            free,
            merged,
            outer,
            kind,
            embedding,
        })
    }
}

impl<E: fmt::Debug> fmt::Debug for Coembed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coembed")
            .field("inner", &self.inner)
            .field("free", &self.free)
            .field("kind", &self.kind)
            .field("embedding", &self.embedding)
            .finish()
    }
}

impl<E: Expression> Expression for Coembed<E> {
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

        let degree = self.merged.len();
        let mut tuple = [0; MAX_RANK];
        let tuple = &mut tuple[..degree];
        self.kind.unrank(index[self.outer.len()], tuple);
        let coefficient = self.embedding.coefficient(1, orbit_size(tuple));

        // visit each distinct permutation of the canonical tuple once
        let mut sum = Self::Scalar::zero();
        let mut sorted = [0; MAX_RANK];
        loop {
            let sorted = &mut sorted[..degree];
            sorted.copy_from_slice(tuple);
            let sign = self.kind.canonicalize(sorted);
            for (&p, &value) in self.merged.iter().zip(tuple.iter()) {
                buffer[p] = value;
            }
            let value = self.inner.component(&buffer[..self.inner.rank()]);
            match sign {
                1 => sum += value,
                _ => sum -= value,
            }
            if !next_permutation(tuple) {
                break;
            }
        }
        sum * Self::Scalar::from_f64(coefficient)
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
