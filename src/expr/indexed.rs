use std::{fmt, marker::PhantomData};

use derive_more::Display;
use itertools::Itertools;

use super::{
    Expr, ExprError, Expression, check_distinct, check_rank, match_free, rename_free,
    rename_list, rename_used,
};
use crate::loom::{
    array::{Array, ArrayMut, MemoryRange},
    concept::Concept,
    index::{AbstractIndex, DimIndex, IndexList, IndexMap, MAX_RANK, MultiIndex, flatten},
    num::Scalar,
    typle::{occurring, overused},
};

/// Dimensions of the factors, one per written index.
fn factor_dims(written: &IndexList, factors: &[Concept]) -> Result<Vec<usize>, ExprError> {
    if written.len() != factors.len() {
        return Err(ExprError::Arity {
            expected: factors.len(),
            found: written.len(),
        });
    }
    check_rank(written.len())?;
    let dims = factors
        .iter()
        .map(Concept::dimension)
        .collect::<Result<_, _>>()?;
    Ok(dims)
}

/// A value indexed with abstract indices: the leaf of every expression.
///
/// An index written twice is summed over (a trace); its two factors must be dual.
pub struct IndexedObject<'a, T, A> {
    array: &'a A,
    written: IndexList,
    dims: Vec<usize>,
    free: Vec<DimIndex>,
    /// Position in `written` of each free index.
    free_slots: Vec<usize>,
    used: Vec<AbstractIndex>,
    /// Pairs of positions in `written` that are summed together.
    summed: Vec<(usize, usize)>,
    trace: MultiIndex,
    phantom: PhantomData<T>,
}

impl<'a, T: Scalar, A: Array<T>> IndexedObject<'a, T, A> {
    pub fn new(array: &'a A, written: IndexList, factors: &[Concept]) -> Result<Self, ExprError> {
        let dims = factor_dims(&written, factors)?;
        if let Some(&(index, count)) = overused(&written).first() {
            return Err(ExprError::Overused { index, count });
        }

        let used = occurring(&written, 2);
        let mut free = vec![];
        let mut free_slots = vec![];
        let mut summed = vec![];
        for (slot, &index) in written.iter().enumerate() {
            if !used.contains(&index) {
                free.push(DimIndex::new(index, factors[slot].clone(), dims[slot]));
                free_slots.push(slot);
                continue;
            }
            // pair the second occurrence with the first
            let Some(first) = written[..slot].iter().position(|&other| other == index) else {
                continue;
            };
            if !factors[first].is_dual_of(&factors[slot]) {
                return Err(ExprError::NotDual {
                    index,
                    left: factors[first].clone(),
                    right: factors[slot].clone(),
                });
            }
            summed.push((first, slot));
        }
        let summed_dims = summed.iter().map(|&(p, _)| dims[p]).collect_vec();
        let trace = MultiIndex::new(&summed_dims)?;

        Ok(Self {
            array,
            written,
            dims,
            free,
            free_slots,
            used,
            summed,
            trace,
            phantom: PhantomData,
        })
    }

    /// The indices as written, including repeated ones.
    #[inline]
    pub fn written(&self) -> &IndexList {
        &self.written
    }
}

impl<T, A> fmt::Debug for IndexedObject<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedObject")
            .field("written", &self.written)
            .field("free", &self.free)
            .field("used", &self.used)
            .finish()
    }
}

impl<T: Scalar, A: Array<T>> Expression for IndexedObject<'_, T, A> {
    type Scalar = T;

    #[inline]
    fn free_indices(&self) -> &[DimIndex] {
        &self.free
    }

    #[inline]
    fn used_indices(&self) -> &[AbstractIndex] {
        &self.used
    }

    fn component(&self, index: &[usize]) -> T {
        let rank = self.dims.len();
        let mut slots = [0; MAX_RANK];
        for (&slot, &value) in self.free_slots.iter().zip(index) {
            slots[slot] = value;
        }
        if self.summed.is_empty() {
            return self.array.get(flatten(&slots[..rank], &self.dims));
        }

        let mut trace = self.trace;
        let mut sum = T::zero();
        while !trace.is_at_end() {
            for (&(p, q), &value) in self.summed.iter().zip(trace.values()) {
                slots[p] = value;
                slots[q] = value;
            }
            sum += self.array.get(flatten(&slots[..rank], &self.dims));
            trace.increment();
        }
        sum
    }

    #[inline]
    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool {
        self.array.memory_range().overlaps(range)
    }

    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError> {
        Ok(Self {
            written: rename_list(&self.written, map)?,
            free: rename_free(&self.free, map)?,
            used: rename_used(&self.used, map)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Update {
    #[display("=")]
    Assign,
    #[display("+=")]
    Add,
    #[display("-=")]
    Sub,
}

/// A value indexed as the target of an assignment.
///
/// Before writing, the right-hand side is checked for reading the target's memory; opt out
/// with [`IndexedObjectMut::no_alias`].
pub struct IndexedObjectMut<'a, T, A> {
    array: &'a mut A,
    free: Vec<DimIndex>,
    dims: Vec<usize>,
    no_alias: bool,
    phantom: PhantomData<T>,
}

impl<'a, T: Scalar, A: ArrayMut<T>> IndexedObjectMut<'a, T, A> {
    pub fn new(
        array: &'a mut A,
        written: IndexList,
        factors: &[Concept],
    ) -> Result<Self, ExprError> {
        let dims = factor_dims(&written, factors)?;
        check_distinct(&written)?;
        let free = itertools::izip!(written.iter(), factors, &dims)
            .map(|(&index, factor, &dim)| DimIndex::new(index, factor.clone(), dim))
            .collect();
        Ok(Self {
            array,
            free,
            dims,
            no_alias: false,
            phantom: PhantomData,
        })
    }

    /// Skips the aliasing check. The caller guarantees the right-hand side does not read the
    /// target's memory.
    #[inline]
    pub fn no_alias(mut self) -> Self {
        self.no_alias = true;
        self
    }

    #[inline]
    pub fn free_indices(&self) -> &[DimIndex] {
        &self.free
    }

    /// Overwrites the target with `rhs`, whose free indices may come in any order.
    pub fn assign<E>(self, rhs: Expr<E>) -> Result<(), ExprError>
    where
        E: Expression<Scalar = T>,
    {
        self.update(rhs.into_inner(), Update::Assign)
    }

    pub fn add_assign<E>(self, rhs: Expr<E>) -> Result<(), ExprError>
    where
        E: Expression<Scalar = T>,
    {
        self.update(rhs.into_inner(), Update::Add)
    }

    pub fn sub_assign<E>(self, rhs: Expr<E>) -> Result<(), ExprError>
    where
        E: Expression<Scalar = T>,
    {
        self.update(rhs.into_inner(), Update::Sub)
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip_all, fields(update = %update)))]
    fn update<E>(self, rhs: E, update: Update) -> Result<(), ExprError>
    where
        E: Expression<Scalar = T>,
    {
        // position in the target of each free index of `rhs`
        let permutation = match_free(&self.free, rhs.free_indices())?;

        let range = self.array.memory_range();
        if self.no_alias {
            log::warn!("aliasing check skipped on assignment to {range}");
        } else if rhs.overlaps_memory_range(&range) {
            log::warn!("aliased assignment to {range} rejected");
            return Err(ExprError::Aliased(range));
        }
        log::debug!(
            "({}) {update} ({})",
            self.free.iter().format(", "),
            rhs.free_indices().iter().format(", ")
        );

        let mut counter = MultiIndex::new(&self.dims)?;
        let mut buffer = [0; MAX_RANK];
        let rank = permutation.len();
        while !counter.is_at_end() {
            let values = counter.values();
            for (k, &position) in permutation.iter().enumerate() {
                buffer[k] = values[position];
            }
            let value = rhs.component(&buffer[..rank]);
            let flat = counter.flat();
            let value = match update {
                Update::Assign => value,
                Update::Add => self.array.get(flat) + value,
                Update::Sub => self.array.get(flat) - value,
            };
            self.array.put(flat, value);
            counter.increment();
        }
        Ok(())
    }
}

impl<T, A> fmt::Debug for IndexedObjectMut<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedObjectMut")
            .field("free", &self.free)
            .field("no_alias", &self.no_alias)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::{
        basic::{Operator, Vector},
        expr::{ExprError, Expression},
        loom::{
            array::PreallocatedArray,
            index::{AbstractIndex, CheckPointer},
            tensor::ImplementationOf,
        },
    };

    #[test]
    fn test_trace() -> Result<(), Box<dyn Error>> {
        let t = Operator::<3, 3>::from_fn(|index| index.value() as f64);
        let trace = t.idx(('i', 'i'))?;
        assert_eq!(trace.rank(), 0);
        assert_eq!(trace.used_indices(), &[AbstractIndex::new('i')]);
        assert_eq!(trace.value()?, 0.0 + 4.0 + 8.0);
        Ok(())
    }

    #[test]
    fn test_written_indices() -> Result<(), Box<dyn Error>> {
        let t = Operator::<3, 3>::zeros();
        assert!(matches!(t.idx('i'), Err(ExprError::Arity { expected: 2, found: 1 })));

        // the two factors of a non-square operator are not dual
        let r = Operator::<2, 3>::zeros();
        assert!(matches!(r.idx(('i', 'i')), Err(ExprError::NotDual { .. })));

        let mut u = Operator::<3, 3>::zeros();
        assert!(matches!(u.idx_mut(('i', 'i')), Err(ExprError::Repeated { .. })));
        Ok(())
    }

    #[test]
    fn test_update() -> Result<(), Box<dyn Error>> {
        let v = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
        let mut w = Vector::<3>::filled(1.0);
        w.idx_mut('i')?.add_assign(v.idx('i')?)?;
        assert_eq!(w.as_slice(), &[2.0, 3.0, 4.0]);
        w.idx_mut('j')?.sub_assign(v.idx('j')? * 2.0)?;
        assert_eq!(w.as_slice(), &[0.0, -1.0, -2.0]);

        let err = w.idx_mut('i')?.assign(v.idx('j')?).unwrap_err();
        assert!(matches!(err, ExprError::FreeIndexMismatch { .. }));
        Ok(())
    }

    #[test]
    fn test_no_alias() -> Result<(), Box<dyn Error>> {
        type V = crate::basic::Space<3>;
        let mut data = [1.0, 2.0, 3.0];
        let ptr = data.as_mut_ptr();
        let mut a = unsafe {
            ImplementationOf::<V, f64, PreallocatedArray<'_, f64>>::from_raw_parts(ptr, CheckPointer::True)?
        };
        let b = unsafe {
            ImplementationOf::<V, f64, PreallocatedArray<'_, f64>>::from_raw_parts(ptr, CheckPointer::True)?
        };

        // element-wise doubling reads each component before writing it
        let err = a.idx_mut('i')?.assign(b.idx('i')? * 2.0).unwrap_err();
        assert!(matches!(err, ExprError::Aliased(_)));
        a.idx_mut('i')?.no_alias().assign(b.idx('i')? * 2.0)?;
        drop((a, b));
        assert_eq!(data, [2.0, 4.0, 6.0]);
        Ok(())
    }
}
