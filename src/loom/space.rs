//! Fields, vector spaces, bases and based vector spaces.

use std::marker::PhantomData;

use super::{
    concept::{Concept, ConceptType, PropertyId, PropertyValue, Structure},
    dual::{DualOf, Tag, TagType},
};

macro_rules! impl_marker {
    ($name:ident<$($param:ident),+>) => {
        $crate::loom::space::impl_marker!([$($param),+] $name<$($param),+>);
    };
    ([$($generics:tt)*] $ty:ty) => {
        impl<$($generics)*> ::std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(::std::any::type_name::<Self>())
            }
        }

        impl<$($generics)*> Default for $ty {
            fn default() -> Self {
                Self(::std::marker::PhantomData)
            }
        }

        impl<$($generics)*> Clone for $ty {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<$($generics)*> Copy for $ty {}
    };
}

pub(crate) use impl_marker;

/// A field of scalars. Fields are self-dual.
pub struct Field<I>(PhantomData<I>);

impl_marker!(Field<I>);

pub trait FieldType: ConceptType {}

impl<I: TagType> DualOf for Field<I> {
    type Dual = Self;
}

impl<I: TagType> ConceptType for Field<I> {
    fn build_concept() -> Concept {
        field(I::tag())
    }
}

impl<I: TagType> FieldType for Field<I> {}

/// A vector space of dimension `N` over the field `F`, distinguished by the tag `I`.
pub struct VectorSpace<F, const N: usize, I>(PhantomData<(F, I)>);

impl_marker!([F, const N: usize, I] VectorSpace<F, N, I>);

pub trait VectorSpaceType: ConceptType {
    type Field: FieldType;
    const DIM: usize;
}

impl<F: FieldType, const N: usize, I: TagType> DualOf for VectorSpace<F, N, I> {
    type Dual = VectorSpace<F, N, I::Dual>;
}

impl<F: FieldType, const N: usize, I: TagType> ConceptType for VectorSpace<F, N, I> {
    fn build_concept() -> Concept {
        vector_space(F::concept(), N, PropertyValue::Tag(I::tag()))
    }
}

impl<F: FieldType, const N: usize, I: TagType> VectorSpaceType for VectorSpace<F, N, I> {
    type Field = F;
    const DIM: usize = N;
}

/// A basis, distinguished by the tag `I`.
pub struct Basis<I>(PhantomData<I>);

impl_marker!(Basis<I>);

pub trait BasisType: ConceptType {}

impl<I: TagType> DualOf for Basis<I> {
    type Dual = Basis<I::Dual>;
}

impl<I: TagType> ConceptType for Basis<I> {
    fn build_concept() -> Concept {
        basis(PropertyValue::Tag(I::tag()))
    }
}

impl<I: TagType> BasisType for Basis<I> {}

/// An orthonormal basis. Specializes [`Basis`] with the same tag.
pub struct OrthonormalBasis<I>(PhantomData<I>);

impl_marker!(OrthonormalBasis<I>);

impl<I: TagType> DualOf for OrthonormalBasis<I> {
    type Dual = OrthonormalBasis<I::Dual>;
}

impl<I: TagType> ConceptType for OrthonormalBasis<I> {
    fn build_concept() -> Concept {
        orthonormal_basis(PropertyValue::Tag(I::tag()))
    }
}

impl<I: TagType> BasisType for OrthonormalBasis<I> {}

/// A vector space `V` with a chosen basis `B`.
pub struct BasedVectorSpace<V, B>(PhantomData<(V, B)>);

impl_marker!(BasedVectorSpace<V, B>);

/// A vector space whose elements have components: anything a tensor can be built on.
pub trait BasedVectorSpaceType: VectorSpaceType {}

impl<V: DualOf, B: DualOf> DualOf for BasedVectorSpace<V, B> {
    type Dual = BasedVectorSpace<V::Dual, B::Dual>;
}

impl<V, B> ConceptType for BasedVectorSpace<V, B>
where
    V: VectorSpaceType,
    B: BasisType,
{
    fn build_concept() -> Concept {
        based_vector_space(V::concept(), B::concept())
    }
}

impl<V, B> VectorSpaceType for BasedVectorSpace<V, B>
where
    V: VectorSpaceType,
    B: BasisType,
{
    type Field = V::Field;
    const DIM: usize = V::DIM;
}

impl<V, B> BasedVectorSpaceType for BasedVectorSpace<V, B>
where
    V: VectorSpaceType,
    B: BasisType,
{
}

pub fn field(tag: Tag) -> Concept {
    Concept::new(
        Structure::Field,
        [],
        [(PropertyId::Id, PropertyValue::Tag(tag))],
    )
}

pub fn vector_space(field: Concept, dimension: usize, id: PropertyValue) -> Concept {
    Concept::new(
        Structure::VectorSpace,
        [],
        [
            (PropertyId::Field, PropertyValue::Concept(field)),
            (PropertyId::Dimension, PropertyValue::Count(dimension)),
            (PropertyId::Id, id),
        ],
    )
}

pub fn basis(id: PropertyValue) -> Concept {
    Concept::new(Structure::Basis, [], [(PropertyId::Id, id)])
}

pub fn orthonormal_basis(id: PropertyValue) -> Concept {
    Concept::new(Structure::OrthonormalBasis, [basis(id)], [])
}

pub fn based_vector_space(vector_space: Concept, basis: Concept) -> Concept {
    Concept::new(
        Structure::BasedVectorSpace,
        [vector_space],
        [(PropertyId::Basis, PropertyValue::Concept(basis))],
    )
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{BasedVectorSpace, Basis, OrthonormalBasis, VectorSpace, VectorSpaceType};
    use crate::loom::{
        concept::{ConceptType, Structure},
        dual::{Dual, DualOfT, Generic, Id, SelfDualGeneric, assert_double_dual, assert_same},
        num::RealField,
    };

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct Euclidean;

    type V3 = VectorSpace<RealField, 3, Euclidean>;
    type E3 = BasedVectorSpace<V3, OrthonormalBasis<Euclidean>>;

    #[test]
    fn test_double_dual() {
        assert_double_dual::<RealField>();
        assert_double_dual::<V3>();
        assert_double_dual::<Basis<Generic>>();
        assert_double_dual::<OrthonormalBasis<Euclidean>>();
        assert_double_dual::<E3>();
        assert_double_dual::<BasedVectorSpace<VectorSpace<RealField, 2, SelfDualGeneric>, Basis<Generic>>>();
    }

    #[test]
    fn test_dual_distributes() {
        assert_same::<DualOfT<RealField>, RealField>();
        assert_same::<DualOfT<V3>, VectorSpace<RealField, 3, Dual<Euclidean>>>();
        assert_same::<
            DualOfT<E3>,
            BasedVectorSpace<VectorSpace<RealField, 3, Dual<Euclidean>>, OrthonormalBasis<Dual<Euclidean>>>,
        >();
        assert_same::<DualOfT<VectorSpace<RealField, 2, SelfDualGeneric>>, VectorSpace<RealField, 2, SelfDualGeneric>>();
    }

    #[test]
    fn test_descriptor_dual() -> Result<(), Box<dyn Error>> {
        let concept = E3::concept();
        let dual = <DualOfT<E3>>::concept();
        assert_eq!(concept.dual(), dual);
        assert_eq!(dual.dual(), concept);
        assert!(concept.is_dual_of(&dual));
        assert_ne!(concept, dual);
        assert_eq!(dual.dimension()?, 3);

        let self_dual = VectorSpace::<RealField, 2, SelfDualGeneric>::concept();
        assert!(self_dual.is_dual_of(&self_dual));
        Ok(())
    }

    #[test]
    fn test_distinct_ids() {
        #[derive(Debug, Clone, Copy, Id)]
        #[id(crate = "crate")]
        struct Other;

        assert_eq!(<VectorSpace<RealField, 3, Other>>::DIM, V3::DIM);
        assert_ne!(<VectorSpace<RealField, 3, Other>>::concept(), V3::concept());
        assert_eq!(V3::concept().structure(), Structure::VectorSpace);
    }

    #[test]
    fn test_marker_impls() {
        use crate::loom::power::SymmetricPowerOfBasedVectorSpace;

        let space = V3::default();
        let copy = space;
        assert!(format!("{copy:?}").contains("VectorSpace"));
        assert_eq!(format!("{space:?}"), format!("{copy:?}"));
        assert!(format!("{:?}", E3::default().clone()).contains("BasedVectorSpace"));
        assert!(format!("{:?}", SymmetricPowerOfBasedVectorSpace::<2, E3>::default()).contains("SymmetricPower"));
        // memoized through the default `concept` body
        assert_eq!(V3::concept(), V3::concept());
    }
}
