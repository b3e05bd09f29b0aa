//! Type tuples and ordered-set primitives.
//!
//! A [`Typle`] is a tuple of concept types, e.g. the factors of a tensor product. The free
//! functions operate on the runtime side: ordered lists whose elements are compared by
//! value, as used by the index bookkeeping of expressions.

use std::hash::Hash;

use itertools::Itertools;
use rustc_hash::FxHashMap as HashMap;

use super::{
    concept::{Concept, ConceptType},
    dual::DualOf,
    space::{BasedVectorSpaceType, FieldType},
};

/// A tuple of concept types.
pub trait Typle: DualOf + 'static {
    const LEN: usize;

    /// Descriptors of the elements, in order.
    fn concepts() -> Vec<Concept>;
}

/// A tuple of based vector spaces over one common field.
pub trait BasedTyple: Typle {
    type Field: FieldType;

    /// Product of the element dimensions.
    const DIM_PRODUCT: usize;
    /// Sum of the element dimensions.
    const DIM_SUM: usize;
}

macro_rules! impl_typle {
    ($head:ident $(, $tail:ident)*) => {
        impl<$head: DualOf $(, $tail: DualOf)*> DualOf for ($head, $($tail,)*) {
            type Dual = ($head::Dual, $($tail::Dual,)*);
        }

        impl<$head $(, $tail)*> Typle for ($head, $($tail,)*)
        where
            $head: ConceptType,
            $($tail: ConceptType,)*
        {
            const LEN: usize = [stringify!($head) $(, stringify!($tail))*].len();

            fn concepts() -> Vec<Concept> {
                vec![$head::concept() $(, $tail::concept())*]
            }
        }

        impl<$head $(, $tail)*> BasedTyple for ($head, $($tail,)*)
        where
            $head: BasedVectorSpaceType,
            $($tail: BasedVectorSpaceType<Field = $head::Field>,)*
        {
            type Field = $head::Field;

            const DIM_PRODUCT: usize = $head::DIM $(* $tail::DIM)*;
            const DIM_SUM: usize = $head::DIM $(+ $tail::DIM)*;
        }
    };
}

impl_typle!(T0);
impl_typle!(T0, T1);
impl_typle!(T0, T1, T2);
impl_typle!(T0, T1, T2, T3);
impl_typle!(T0, T1, T2, T3, T4);
impl_typle!(T0, T1, T2, T3, T4, T5);

/// Removes duplicates, keeping the first occurrence of each element.
pub fn unique_in<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    items.into_iter().unique().collect()
}

/// Elements occurring exactly `count` times, in order of first occurrence.
pub fn occurring<T: Eq + Hash + Clone>(items: &[T], count: usize) -> Vec<T> {
    let mut counts: HashMap<&T, usize> = HashMap::default();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    items
        .iter()
        .unique()
        .filter(|item| counts[item] == count)
        .cloned()
        .collect()
}

/// Elements occurring more than twice, in order of first occurrence, with their counts.
pub fn overused<T: Eq + Hash + Clone>(items: &[T]) -> Vec<(T, usize)> {
    let counts = items.iter().counts();
    items
        .iter()
        .unique()
        .filter(|item| counts[item] > 2)
        .map(|item| (item.clone(), counts[item]))
        .collect()
}

/// The elements of `x` that also occur in `y`.
pub fn intersection<T: PartialEq + Clone>(x: &[T], y: &[T]) -> Vec<T> {
    x.iter().filter(|item| y.contains(item)).cloned().collect()
}

/// Equality as sets: order and multiplicity are ignored.
pub fn set_eq<T: PartialEq>(x: &[T], y: &[T]) -> bool {
    x.iter().all(|item| y.contains(item)) && y.iter().all(|item| x.contains(item))
}

/// Concatenation of two lists.
pub fn concat<T: Clone>(x: &[T], y: &[T]) -> Vec<T> {
    x.iter().chain(y.iter()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::{BasedTyple, Typle, concat, intersection, occurring, overused, set_eq, unique_in};
    use crate::loom::{
        concept::ConceptType,
        dual::{Dual, DualOfT, Id, assert_same},
        num::RealField,
        space::{BasedVectorSpace, OrthonormalBasis, VectorSpace},
    };

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct X;

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate")]
    struct Y;

    type A = BasedVectorSpace<VectorSpace<RealField, 2, X>, OrthonormalBasis<X>>;
    type B = BasedVectorSpace<VectorSpace<RealField, 3, Y>, OrthonormalBasis<Y>>;

    #[test]
    fn test_typle_constants() {
        assert_eq!(<(A,)>::LEN, 1);
        assert_eq!(<(A, B, A)>::LEN, 3);
        assert_eq!(<(A, B, A) as BasedTyple>::DIM_PRODUCT, 12);
        assert_eq!(<(A, B, A) as BasedTyple>::DIM_SUM, 7);
        assert_eq!(<(A, B)>::concepts(), vec![A::concept(), B::concept()]);
    }

    #[test]
    fn test_typle_dual() {
        assert_same::<DualOfT<(X, Dual<Y>)>, (Dual<X>, Y)>();
    }

    #[test]
    fn test_set_operations() {
        let x = [1, 2, 3, 2, 4];
        let y = [5, 4, 6];
        assert_eq!(unique_in(x), vec![1, 2, 3, 4]);
        assert_eq!(occurring(&x, 1), vec![1, 3, 4]);
        assert_eq!(occurring(&x, 2), vec![2]);
        assert!(overused(&x).is_empty());
        assert_eq!(overused(&[7, 7, 7, 1]), vec![(7, 3)]);
        assert_eq!(intersection(&x, &y), vec![4]);
        assert!(set_eq(&[1, 2, 3], &[3, 1, 2]));
        assert!(!set_eq(&[1, 2], &[1, 2, 3]));
        assert_eq!(concat(&[1], &[2, 3]), vec![1, 2, 3]);
    }
}
