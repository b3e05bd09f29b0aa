//! Symmetric and exterior powers.
//!
//! The based versions store only the non-redundant components of a power of a based vector
//! space `V` of dimension `n`: a symmetric power of degree `K` is indexed by non-decreasing
//! `K`-tuples and has dimension `C(n + K - 1, K)`, an exterior power by strictly increasing
//! `K`-tuples with dimension `C(n, K)`. Tuples are ranked in colexicographic order.

use std::marker::PhantomData;

use derive_more::Display;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

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
};

/// `C(n, k)`, zero when `k > n`.
pub const fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = if k > n - k { n - k } else { k };
    let mut result = 1;
    let mut i = 0;
    while i < k {
        result = result * (n - i) / (i + 1);
        i += 1;
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PowerKind {
    Symmetric,
    Exterior,
}

impl PowerKind {
    /// The kind of power a descriptor structure denotes, if any.
    pub fn of(structure: Structure) -> Option<Self> {
        match structure {
            Structure::SymmetricPower | Structure::SymmetricPowerOfBasedVectorSpace => {
                Some(Self::Symmetric)
            }
            Structure::ExteriorPower | Structure::ExteriorPowerOfBasedVectorSpace => {
                Some(Self::Exterior)
            }
            _ => None,
        }
    }

    /// Dimension of the degree `degree` power of a space of dimension `dim`.
    pub const fn dimension(self, dim: usize, degree: usize) -> usize {
        match self {
            Self::Symmetric if degree == 0 => 1,
            Self::Symmetric => binomial(dim + degree - 1, degree),
            Self::Exterior => binomial(dim, degree),
        }
    }

    /// Colex rank of a canonical tuple: non-decreasing for symmetric powers, strictly
    /// increasing for exterior powers.
    pub fn rank(self, tuple: &[usize]) -> usize {
        tuple
            .iter()
            .enumerate()
            .map(|(i, &a)| match self {
                Self::Symmetric => binomial(a + i, i + 1),
                Self::Exterior => binomial(a, i + 1),
            })
            .sum()
    }

    /// Writes the canonical tuple of rank `rank` into `tuple`, whose length is the degree.
    pub fn unrank(self, mut rank: usize, tuple: &mut [usize]) {
        for i in (0..tuple.len()).rev() {
            let k = i + 1;
            // largest b with C(b, k) <= rank; b >= i since C(i, k) = 0
            let mut b = i;
            while binomial(b + 1, k) <= rank {
                b += 1;
            }
            rank -= binomial(b, k);
            tuple[i] = match self {
                Self::Symmetric => b - i,
                Self::Exterior => b,
            };
        }
    }

    /// Sorts `tuple` in place into canonical order and returns the sign of the sorting
    /// permutation for exterior powers. Returns `0` for an exterior tuple with a repeated
    /// entry, and always `1` for symmetric powers.
    pub fn canonicalize(self, tuple: &mut [usize]) -> i32 {
        let mut sign = 1;
        // insertion sort counts transpositions
        for i in 1..tuple.len() {
            let mut j = i;
            while j > 0 && tuple[j - 1] > tuple[j] {
                tuple.swap(j - 1, j);
                sign = -sign;
                j -= 1;
            }
        }
        match self {
            Self::Symmetric => 1,
            Self::Exterior if tuple.windows(2).any(|pair| pair[0] == pair[1]) => 0,
            Self::Exterior => sign,
        }
    }
}

/// Number of distinct permutations of a sorted tuple: `K!` over the factorials of the
/// multiplicities.
pub fn orbit_size(sorted: &[usize]) -> usize {
    let mut size = 1;
    let mut run = 0;
    for (i, value) in sorted.iter().enumerate() {
        run = match i {
            0 => 1,
            _ if sorted[i - 1] == *value => run + 1,
            _ => 1,
        };
        // multiply by i + 1, divide by the run length: stays integral
        size = size * (i + 1) / run;
    }
    size
}

/// Steps `tuple` to its next permutation in lexicographic order. Returns `false` (leaving
/// the tuple sorted ascending) once the last permutation has been passed.
pub fn next_permutation(tuple: &mut [usize]) -> bool {
    let Some(i) = (1..tuple.len()).rev().find(|&i| tuple[i - 1] < tuple[i]) else {
        tuple.reverse();
        return false;
    };
    let pivot = i - 1;
    let Some(j) = (i..tuple.len()).rev().find(|&j| tuple[j] > tuple[pivot]) else {
        return false;
    };
    tuple.swap(pivot, j);
    tuple[i..].reverse();
    true
}

macro_rules! impl_power {
    ($power:ident, $based:ident, $kind:expr, $structure:ident, $based_structure:ident, $synth:ident, $based_synth:ident) => {
        pub struct $power<const K: usize, V>(PhantomData<V>);

        impl_marker!([const K: usize, V] $power<K, V>);

        impl<const K: usize, V: DualOf> DualOf for $power<K, V> {
            type Dual = $power<K, V::Dual>;
        }

        impl<const K: usize, V: ConceptType> ConceptType for $power<K, V> {
            fn build_concept() -> Concept {
                $synth(V::concept(), K)
            }
        }

        pub struct $based<const K: usize, V>(PhantomData<V>);

        impl_marker!([const K: usize, V] $based<K, V>);

        impl<const K: usize, V: DualOf> DualOf for $based<K, V> {
            type Dual = $based<K, V::Dual>;
        }

        impl<const K: usize, V: BasedVectorSpaceType> ConceptType for $based<K, V> {
            fn build_concept() -> Concept {
                $based_synth(&V::concept(), K)
                    .expect("factor of a typed power must be a based vector space")
            }
        }

        impl<const K: usize, V: BasedVectorSpaceType> VectorSpaceType for $based<K, V> {
            type Field = V::Field;
            const DIM: usize = $kind.dimension(V::DIM, K);
        }

        impl<const K: usize, V: BasedVectorSpaceType> BasedVectorSpaceType for $based<K, V> {}

        impl<const K: usize, V: BasedVectorSpaceType> PowerType for $based<K, V> {
            type Factor = V;
            const KIND: PowerKind = $kind;
            const DEGREE: usize = K;
        }

        pub fn $synth(factor: Concept, degree: usize) -> Concept {
            Concept::new(
                Structure::$structure,
                [],
                [
                    (PropertyId::Factor, PropertyValue::Concept(factor)),
                    (PropertyId::Degree, PropertyValue::Count(degree)),
                ],
            )
        }

        pub fn $based_synth(factor: &Concept, degree: usize) -> Result<Concept, ConceptError> {
            let field = factor.field()?;
            let dimension = $kind.dimension(factor.dimension()?, degree);
            let space = IsVectorSpace::unique_of(factor)?;
            let factor_basis = factor.basis()?;

            let id = PropertyValue::Concept($synth(space, degree));
            let space = based_vector_space(
                vector_space(field, dimension, id),
                basis(PropertyValue::Concept($synth(factor_basis, degree))),
            );
            Ok(Concept::new(
                Structure::$based_structure,
                [$synth(factor.clone(), degree), space],
                [],
            ))
        }
    };
}

/// A symmetric or exterior power of a based vector space.
pub trait PowerType: BasedVectorSpaceType {
    type Factor: BasedVectorSpaceType;
    const KIND: PowerKind;
    const DEGREE: usize;
}

impl_power!(
    SymmetricPower,
    SymmetricPowerOfBasedVectorSpace,
    PowerKind::Symmetric,
    SymmetricPower,
    SymmetricPowerOfBasedVectorSpace,
    symmetric_power,
    symmetric_power_of_based_vector_space
);

impl_power!(
    ExteriorPower,
    ExteriorPowerOfBasedVectorSpace,
    PowerKind::Exterior,
    ExteriorPower,
    ExteriorPowerOfBasedVectorSpace,
    exterior_power,
    exterior_power_of_based_vector_space
);
