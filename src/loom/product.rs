//! Tensor products and direct sums.
//!
//! A [`TensorProductOfBasedVectorSpaces`] is both a [`TensorProduct`] of its factors and a
//! based vector space whose dimension is the product of the factor dimensions. Likewise a
//! [`DirectSumOfBasedVectorSpaces`] is a [`DirectSum`] and a based vector space of summed
//! dimension. Both structures appear as parents of the descriptor, so the unique-structure
//! queries find either interpretation.

use std::{marker::PhantomData, sync::Arc};

use itertools::Itertools;

use super::{
    concept::{
        Concept, ConceptError, ConceptType, ConceptualStructure, IsVectorSpace, PropertyId,
        PropertyValue, Structure,
    },
    dual::DualOf,
    space::{
        BasedVectorSpaceType, VectorSpaceType, based_vector_space, basis, impl_marker,
        vector_space,
    },
    typle::{BasedTyple, Typle},
};

/// The tensor product of the concepts in `Factors`.
pub struct TensorProduct<Factors>(PhantomData<Factors>);

impl_marker!(TensorProduct<Factors>);

impl<Factors: DualOf> DualOf for TensorProduct<Factors> {
    type Dual = TensorProduct<Factors::Dual>;
}

impl<Factors: Typle> ConceptType for TensorProduct<Factors> {
    fn build_concept() -> Concept {
        tensor_product(Factors::concepts())
    }
}

/// The tensor product of the based vector spaces in `Factors`, itself a based vector space.
pub struct TensorProductOfBasedVectorSpaces<Factors>(PhantomData<Factors>);

impl_marker!(TensorProductOfBasedVectorSpaces<Factors>);

impl<Factors: DualOf> DualOf for TensorProductOfBasedVectorSpaces<Factors> {
    type Dual = TensorProductOfBasedVectorSpaces<Factors::Dual>;
}

impl<Factors: BasedTyple> ConceptType for TensorProductOfBasedVectorSpaces<Factors> {
    fn build_concept() -> Concept {
        tensor_product_of_based_vector_spaces(&Factors::concepts())
            .expect("factors of a typed tensor product must be based vector spaces")
    }
}

impl<Factors: BasedTyple> VectorSpaceType for TensorProductOfBasedVectorSpaces<Factors> {
    type Field = Factors::Field;
    const DIM: usize = Factors::DIM_PRODUCT;
}

impl<Factors: BasedTyple> BasedVectorSpaceType for TensorProductOfBasedVectorSpaces<Factors> {}

/// The direct sum of the concepts in `Summands`.
pub struct DirectSum<Summands>(PhantomData<Summands>);

impl_marker!(DirectSum<Summands>);

impl<Summands: DualOf> DualOf for DirectSum<Summands> {
    type Dual = DirectSum<Summands::Dual>;
}

impl<Summands: Typle> ConceptType for DirectSum<Summands> {
    fn build_concept() -> Concept {
        direct_sum(Summands::concepts())
    }
}

/// The direct sum of the based vector spaces in `Summands`, itself a based vector space.
pub struct DirectSumOfBasedVectorSpaces<Summands>(PhantomData<Summands>);

impl_marker!(DirectSumOfBasedVectorSpaces<Summands>);

impl<Summands: DualOf> DualOf for DirectSumOfBasedVectorSpaces<Summands> {
    type Dual = DirectSumOfBasedVectorSpaces<Summands::Dual>;
}

impl<Summands: BasedTyple> ConceptType for DirectSumOfBasedVectorSpaces<Summands> {
    fn build_concept() -> Concept {
        direct_sum_of_based_vector_spaces(&Summands::concepts())
            .expect("summands of a typed direct sum must be based vector spaces")
    }
}

impl<Summands: BasedTyple> VectorSpaceType for DirectSumOfBasedVectorSpaces<Summands> {
    type Field = Summands::Field;
    const DIM: usize = Summands::DIM_SUM;
}

impl<Summands: BasedTyple> BasedVectorSpaceType for DirectSumOfBasedVectorSpaces<Summands> {}

pub fn tensor_product(factors: impl IntoIterator<Item = Concept>) -> Concept {
    let factors: Arc<[Concept]> = factors.into_iter().collect();
    Concept::new(
        Structure::TensorProduct,
        [],
        [(PropertyId::FactorTyple, PropertyValue::Typle(factors))],
    )
}

pub fn direct_sum(summands: impl IntoIterator<Item = Concept>) -> Concept {
    let summands: Arc<[Concept]> = summands.into_iter().collect();
    Concept::new(
        Structure::DirectSum,
        [],
        [(PropertyId::SummandTyple, PropertyValue::Typle(summands))],
    )
}

/// The common field of a non-empty list of based vector spaces.
pub(crate) fn common_field(
    structure: Structure,
    spaces: &[Concept],
) -> Result<Concept, ConceptError> {
    let (first, rest) = spaces
        .split_first()
        .ok_or(ConceptError::EmptyTyple(structure))?;
    let field = first.field()?;
    for space in rest {
        let other = space.field()?;
        if other != field {
            return Err(ConceptError::FieldMismatch(field, other));
        }
    }
    Ok(field)
}

/// Underlying vector spaces and bases of a list of based vector spaces.
fn split_spaces(spaces: &[Concept]) -> Result<(Vec<Concept>, Vec<Concept>), ConceptError> {
    let vector_spaces = spaces
        .iter()
        .map(IsVectorSpace::unique_of)
        .collect::<Result<Vec<_>, _>>()?;
    let bases = spaces
        .iter()
        .map(Concept::basis)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((vector_spaces, bases))
}

/// Descriptor of the tensor product of based vector spaces `factors`.
pub fn tensor_product_of_based_vector_spaces(factors: &[Concept]) -> Result<Concept, ConceptError> {
    let structure = Structure::TensorProductOfBasedVectorSpaces;
    let field = common_field(structure, factors)?;
    let dimension = factors
        .iter()
        .map(Concept::dimension)
        .fold_ok(1, |acc, dim| acc * dim)?;
    let (vector_spaces, bases) = split_spaces(factors)?;

    let id = PropertyValue::Concept(tensor_product(vector_spaces));
    let space = based_vector_space(
        vector_space(field, dimension, id),
        basis(PropertyValue::Concept(tensor_product(bases))),
    );
    Ok(Concept::new(
        structure,
        [tensor_product(factors.iter().cloned()), space],
        [],
    ))
}

/// Descriptor of the direct sum of based vector spaces `summands`.
pub fn direct_sum_of_based_vector_spaces(summands: &[Concept]) -> Result<Concept, ConceptError> {
    let structure = Structure::DirectSumOfBasedVectorSpaces;
    let field = common_field(structure, summands)?;
    let dimension = summands
        .iter()
        .map(Concept::dimension)
        .fold_ok(0, |acc, dim| acc + dim)?;
    let (vector_spaces, bases) = split_spaces(summands)?;

    let id = PropertyValue::Concept(direct_sum(vector_spaces));
    let space = based_vector_space(
        vector_space(field, dimension, id),
        basis(PropertyValue::Concept(direct_sum(bases))),
    );
    Ok(Concept::new(
        structure,
        [direct_sum(summands.iter().cloned()), space],
        [],
    ))
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{
        DirectSum, DirectSumOfBasedVectorSpaces, TensorProduct, TensorProductOfBasedVectorSpaces,
        tensor_product_of_based_vector_spaces,
    };
    use crate::loom::{
        concept::{
            ConceptError, ConceptType, ConceptualStructure, IsBasedVectorSpace, IsDirectSum,
            IsTensorProduct, IsTensorProductOfBasedVectorSpaces, IsVectorSpace, Structure,
        },
        dual::{Dual, DualOfT, Id, assert_double_dual, assert_same},
        num::RealField,
        space::{BasedVectorSpace, Field, OrthonormalBasis, VectorSpace, VectorSpaceType},
    };

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct X;

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct Y;

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct Complex;

    type A = BasedVectorSpace<VectorSpace<RealField, 2, X>, OrthonormalBasis<X>>;
    type B = BasedVectorSpace<VectorSpace<RealField, 3, Y>, OrthonormalBasis<Y>>;
    type AB = TensorProductOfBasedVectorSpaces<(A, B)>;

    #[test]
    fn test_double_dual() {
        assert_double_dual::<TensorProduct<(X, Y)>>();
        assert_double_dual::<AB>();
        assert_double_dual::<DirectSum<(A, B)>>();
        assert_double_dual::<DirectSumOfBasedVectorSpaces<(A, B, A)>>();
    }

    #[test]
    fn test_dual_distributes() {
        assert_same::<DualOfT<AB>, TensorProductOfBasedVectorSpaces<(DualOfT<A>, DualOfT<B>)>>();
        assert_same::<
            DualOfT<DirectSumOfBasedVectorSpaces<(A, B)>>,
            DirectSumOfBasedVectorSpaces<(DualOfT<A>, DualOfT<B>)>,
        >();
        assert_same::<DualOfT<TensorProduct<(X, Dual<Y>)>>, TensorProduct<(Dual<X>, Y)>>();
    }

    #[test]
    fn test_tensor_product_descriptor() -> Result<(), Box<dyn Error>> {
        assert_eq!(AB::DIM, 6);

        let concept = AB::concept();
        assert_eq!(concept.dimension()?, 6);
        assert_eq!(concept.field()?, RealField::concept());
        assert_eq!(&concept.factor_typle()?[..], &[A::concept(), B::concept()][..]);

        assert!(IsTensorProduct::has_unique(&concept));
        assert!(IsBasedVectorSpace::has_unique(&concept));
        assert!(IsVectorSpace::has_unique(&concept));
        assert_eq!(IsTensorProductOfBasedVectorSpaces::unique_of(&concept)?, concept);
        assert!(!IsDirectSum::has_unique(&concept));

        // synthesized and typed descriptors agree, including their duals
        let synthesized = tensor_product_of_based_vector_spaces(&[A::concept(), B::concept()])?;
        assert_eq!(synthesized, concept);
        assert_eq!(concept.dual(), <DualOfT<AB>>::concept());
        Ok(())
    }

    #[test]
    fn test_direct_sum_descriptor() -> Result<(), Box<dyn Error>> {
        type S = DirectSumOfBasedVectorSpaces<(A, B, A)>;
        assert_eq!(S::DIM, 7);

        let concept = S::concept();
        assert_eq!(concept.dimension()?, 7);
        assert_eq!(concept.summand_typle()?.len(), 3);
        assert_eq!(concept.structure(), Structure::DirectSumOfBasedVectorSpaces);
        assert_eq!(concept.dual(), <DualOfT<S>>::concept());
        Ok(())
    }

    #[test]
    fn test_field_mismatch() {
        type C = BasedVectorSpace<VectorSpace<Field<Complex>, 2, X>, OrthonormalBasis<X>>;
        let err = tensor_product_of_based_vector_spaces(&[A::concept(), C::concept()]).unwrap_err();
        assert!(matches!(err, ConceptError::FieldMismatch(..)));

        let err = tensor_product_of_based_vector_spaces(&[]).unwrap_err();
        assert!(matches!(err, ConceptError::EmptyTyple(_)));
    }
}
