use std::{fmt, marker::PhantomData, sync::Arc};

use thiserror::Error;

use super::{
    array::{
        Array, ArrayError, ArrayMut, ComponentGenerator, ConstPreallocatedArray, MemberArray,
        PreallocatedArray, ProceduralArray,
    },
    concept::{Concept, ConceptError, ConceptualStructure, IsTensorProductOfBasedVectorSpaces},
    index::{CheckPointer, ComponentIndex, IndexList},
    num::Scalar,
    power::PowerType,
    space::{BasedVectorSpaceType, VectorSpaceType},
};
use crate::expr::{Expr, ExprError, IndexedObject, IndexedObjectMut};

#[derive(Debug, Clone, Error)]
pub enum TensorError {
    #[error("tensor creation error: concept of dimension {expected} cannot hold {actual} components")]
    Count { expected: usize, actual: usize },
    #[error("{tuple:?} does not index a degree {degree} power of a space of dimension {dim}")]
    PowerTuple {
        tuple: Vec<usize>,
        degree: usize,
        dim: usize,
    },
    #[error(transparent)]
    Array(#[from] ArrayError),
    #[error(transparent)]
    Concept(#[from] ConceptError),
}

/// A value of the based vector space `C` with components of type `T`, stored in `A`.
///
/// The scalar must belong to the field of `C`; anything else does not build.
pub struct ImplementationOf<C, T, A = MemberArray<T>> {
    array: A,
    phantom: PhantomData<(C, T)>,
}

/// A tensor owning its components.
pub type Tensor<C, T> = ImplementationOf<C, T, MemberArray<T>>;

impl<C, T, A: Clone> Clone for ImplementationOf<C, T, A> {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
            phantom: PhantomData,
        }
    }
}

impl<C, T, A: PartialEq> PartialEq for ImplementationOf<C, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array
    }
}

impl<C, T, A: fmt::Debug> fmt::Debug for ImplementationOf<C, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationOf")
            .field("concept", &std::any::type_name::<C>())
            .field("array", &self.array)
            .finish()
    }
}

impl<C, T, A> ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
{
    #[inline]
    fn from_array(array: A) -> Self {
        Self {
            array,
            phantom: PhantomData,
        }
    }

    #[inline]
    pub fn array(&self) -> &A {
        &self.array
    }

    #[inline]
    pub fn into_array(self) -> A {
        self.array
    }

    #[inline]
    pub fn concept(&self) -> Concept {
        C::concept()
    }

    /// The factors written indices range over: the factors of a tensor product, or the
    /// concept itself.
    pub fn factors(&self) -> Result<Arc<[Concept]>, ConceptError> {
        let concept = C::concept();
        match IsTensorProductOfBasedVectorSpaces::has_unique(&concept) {
            true => IsTensorProductOfBasedVectorSpaces::unique_of(&concept)?.factor_typle(),
            false => Ok([concept].into()),
        }
    }
}

impl<C, T, A> ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    A: Array<T>,
{
    #[inline]
    pub fn component(&self, index: ComponentIndex) -> T {
        self.array.component(index)
    }

    /// All components in storage order.
    pub fn components(&self) -> Vec<T> {
        (0..self.array.count()).map(|k| self.array.get(k)).collect()
    }

    /// Indexes the value with abstract indices, one per factor. A repeated index is a trace.
    ///
    /// ```
    /// # use tenh::prelude::*;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let t = Operator::<2, 2>::from_components([1.0, 2.0, 3.0, 4.0])?;
    /// assert_eq!(t.idx(('i', 'i'))?.value()?, 5.0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn idx(
        &self,
        indices: impl Into<IndexList>,
    ) -> Result<Expr<IndexedObject<'_, T, A>>, ExprError> {
        let factors = self.factors()?;
        let object = IndexedObject::new(&self.array, indices.into(), &factors)?;
        Ok(Expr::new(object))
    }
}

impl<C, T, A> ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    A: ArrayMut<T>,
{
    #[inline]
    pub fn set_component(&mut self, index: ComponentIndex, value: T) {
        self.array.set(index, value);
    }

    /// Indexes the value as the target of an assignment. Indices may not repeat.
    pub fn idx_mut(
        &mut self,
        indices: impl Into<IndexList>,
    ) -> Result<IndexedObjectMut<'_, T, A>, ExprError> {
        let factors = self.factors()?;
        IndexedObjectMut::new(&mut self.array, indices.into(), &factors)
    }
}

impl<C, T> Tensor<C, T>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
{
    #[inline]
    pub fn zeros() -> Self {
        Self::filled(T::zero())
    }

    #[inline]
    pub fn filled(value: T) -> Self {
        Self::from_array(MemberArray::filled(value, C::DIM))
    }

    /// Creates the tensor from its components in storage order.
    pub fn from_components(components: impl IntoIterator<Item = T>) -> Result<Self, TensorError> {
        let components: Vec<T> = components.into_iter().collect();
        if components.len() != C::DIM {
            return Err(TensorError::Count {
                expected: C::DIM,
                actual: components.len(),
            });
        }
        Ok(Self::from_array(components.into()))
    }

    pub fn from_fn(mut f: impl FnMut(ComponentIndex) -> T) -> Self {
        let array = MemberArray::from_fn(C::DIM, |k| f(ComponentIndex::at(k, C::DIM)));
        Self::from_array(array)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.array.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.array.as_mut_slice()
    }
}

impl<'a, C, T> ImplementationOf<C, T, PreallocatedArray<'a, T>>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
{
    /// Views `slice` as a tensor. The slice must hold exactly the dimension of `C`.
    pub fn from_slice(slice: &'a mut [T]) -> Result<Self, TensorError> {
        let array = PreallocatedArray::from_slice(slice, C::DIM)?;
        Ok(Self::from_array(array))
    }

    /// Views the memory at `ptr` as a tensor.
    ///
    /// # Safety
    /// See [`PreallocatedArray::from_raw_parts`].
    pub unsafe fn from_raw_parts(ptr: *mut T, check: CheckPointer) -> Result<Self, TensorError> {
        let array = unsafe { PreallocatedArray::from_raw_parts(ptr, C::DIM, check)? };
        Ok(Self::from_array(array))
    }
}

impl<'a, C, T> ImplementationOf<C, T, ConstPreallocatedArray<'a, T>>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
{
    /// Views `slice` as a read-only tensor. The slice must hold exactly the dimension of `C`.
    pub fn from_slice(slice: &'a [T]) -> Result<Self, TensorError> {
        let array = ConstPreallocatedArray::from_slice(slice, C::DIM)?;
        Ok(Self::from_array(array))
    }

    /// Views the memory at `ptr` as a read-only tensor.
    ///
    /// # Safety
    /// See [`ConstPreallocatedArray::from_raw_parts`].
    pub unsafe fn from_raw_parts(ptr: *const T, check: CheckPointer) -> Result<Self, TensorError> {
        let array = unsafe { ConstPreallocatedArray::from_raw_parts(ptr, C::DIM, check)? };
        Ok(Self::from_array(array))
    }
}

impl<C, T, G> ImplementationOf<C, T, ProceduralArray<T, G>>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    G: ComponentGenerator<T>,
{
    pub fn procedural(generator: G) -> Self {
        Self::from_array(ProceduralArray::new(C::DIM, generator))
    }
}

impl<C, T, G> Default for ImplementationOf<C, T, ProceduralArray<T, G>>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    G: ComponentGenerator<T> + Default,
{
    fn default() -> Self {
        Self::procedural(G::default())
    }
}

impl<P, T, A> ImplementationOf<P, T, A>
where
    P: PowerType,
    T: Scalar<Field = P::Field>,
    A: Array<T>,
{
    /// The component of a symmetric or exterior power at a tuple of factor indices, in any
    /// order. An exterior power takes the sign of the sorting permutation and vanishes on a
    /// repeated index.
    pub fn power_component(&self, tuple: &[usize]) -> Result<T, TensorError> {
        let dim = <P::Factor as VectorSpaceType>::DIM;
        if tuple.len() != P::DEGREE || tuple.iter().any(|&value| value >= dim) {
            return Err(TensorError::PowerTuple {
                tuple: tuple.to_vec(),
                degree: P::DEGREE,
                dim,
            });
        }
        let mut sorted = tuple.to_vec();
        let value = match P::KIND.canonicalize(&mut sorted) {
            0 => T::zero(),
            1 => self.array.get(P::KIND.rank(&sorted)),
            _ => -self.array.get(P::KIND.rank(&sorted)),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{ImplementationOf, Tensor, TensorError};
    use crate::loom::{
        array::{
            Array, ConstPreallocatedArray, KroneckerDelta, PreallocatedArray, ProceduralArray,
            Zeros,
        },
        concept::ConceptType,
        dual::{DualOfT, Id},
        index::{CheckPointer, CheckRange, ComponentIndex},
        num::RealField,
        power::{ExteriorPowerOfBasedVectorSpace, SymmetricPowerOfBasedVectorSpace},
        product::TensorProductOfBasedVectorSpaces,
        space::{BasedVectorSpace, OrthonormalBasis, VectorSpace},
    };

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct X;

    type V = BasedVectorSpace<VectorSpace<RealField, 3, X>, OrthonormalBasis<X>>;
    type Op = TensorProductOfBasedVectorSpaces<(V, DualOfT<V>)>;

    #[test]
    fn test_create() -> Result<(), Box<dyn Error>> {
        let v = Tensor::<V, f64>::from_components([1.0, 2.0, 3.0])?;
        assert_eq!(v.component(ComponentIndex::new(2, 3, CheckRange::True)?), 3.0);
        assert_eq!(v.factors()?.len(), 1);

        let err = Tensor::<V, f64>::from_components([1.0, 2.0]).unwrap_err();
        assert!(matches!(err, TensorError::Count { expected: 3, actual: 2 }));

        let t = Tensor::<Op, f32>::from_fn(|index| index.value() as f32);
        assert_eq!(t.as_slice().len(), 9);
        assert_eq!(&t.factors()?[..], &[V::concept(), <DualOfT<V>>::concept()][..]);

        let mut z = Tensor::<V, f32>::zeros();
        z.set_component(ComponentIndex::new(0, 3, CheckRange::True)?, 4.0);
        assert_eq!(z.components(), vec![4.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_preallocated() -> Result<(), Box<dyn Error>> {
        let mut data = [0.0f64; 3];
        {
            let mut v = ImplementationOf::<V, f64, PreallocatedArray<'_, f64>>::from_slice(&mut data)?;
            v.set_component(ComponentIndex::new(1, 3, CheckRange::True)?, 2.0);
        }
        assert_eq!(data, [0.0, 2.0, 0.0]);

        let mut short = [0.0f64; 2];
        let err = ImplementationOf::<V, f64, PreallocatedArray<'_, f64>>::from_slice(&mut short);
        assert!(matches!(err, Err(TensorError::Array(_))));

        let v = unsafe {
            ImplementationOf::<V, f64, ConstPreallocatedArray<'_, f64>>::from_raw_parts(
                data.as_ptr(),
                CheckPointer::True,
            )?
        };
        assert_eq!(v.components(), vec![0.0, 2.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_procedural() {
        let identity = ImplementationOf::<Op, f64, ProceduralArray<f64, KroneckerDelta<3>>>::default();
        assert_eq!(identity.array().allocation_size_in_bytes(), 0);
        assert_eq!(identity.components(), vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

        let zeros = ImplementationOf::<V, f32, ProceduralArray<f32, Zeros>>::procedural(Zeros);
        assert_eq!(zeros.components(), vec![0.0; 3]);
    }

    #[test]
    fn test_power_component() -> Result<(), Box<dyn Error>> {
        let s = Tensor::<SymmetricPowerOfBasedVectorSpace<2, V>, f64>::from_fn(|index| index.value() as f64);
        assert_eq!(s.power_component(&[0, 1])?, 1.0);
        assert_eq!(s.power_component(&[1, 0])?, 1.0);
        assert_eq!(s.power_component(&[2, 2])?, 5.0);

        let e = Tensor::<ExteriorPowerOfBasedVectorSpace<2, V>, f64>::from_components([1.0, 2.0, 3.0])?;
        assert_eq!(e.power_component(&[0, 1])?, 1.0);
        assert_eq!(e.power_component(&[1, 0])?, -1.0);
        assert_eq!(e.power_component(&[2, 1])?, -3.0);
        assert_eq!(e.power_component(&[1, 1])?, 0.0);

        let err = e.power_component(&[0, 3]).unwrap_err();
        assert!(matches!(err, TensorError::PowerTuple { degree: 2, dim: 3, .. }));
        assert!(e.power_component(&[0]).is_err());
        Ok(())
    }
}
