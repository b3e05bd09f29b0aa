//! Index-notation expressions.
//!
//! Indexing a tensor value with abstract indices yields a leaf expression; the arithmetic
//! operators combine expressions into a tree. Every node works out its free indices (those
//! of the result, in component order) and its used indices (those already summed below it)
//! when it is built, and rejects mismatched or reused indices right there. Evaluating a
//! component afterwards only walks the tree with fixed-size buffers.
//!
//! ```
//! use tenh::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let a = Operator::<2, 2>::from_components([1.0, 2.0, 3.0, 4.0])?;
//! let v = Vector::<2>::from_components([1.0, 1.0])?;
//!
//! // w(i) = a(i, j) v(j)
//! let mut w = Vector::<2>::zeros();
//! w.idx_mut('i')?.assign(a.idx(('i', 'j'))? * v.idx('j')?)?;
//! assert_eq!(w.as_slice(), &[3.0, 7.0]);
//! # Ok(())
//! # }
//! ```

use std::ops::{Add, Div, Mul, Neg, Sub};

use derive_more::{Deref, DerefMut};
use half::f16;
use thiserror::Error;

use crate::loom::{
    array::MemoryRange,
    concept::{Concept, ConceptError},
    index::{AbstractIndex, DimIndex, IndexError, IndexList, IndexMap, MAX_RANK},
    num::{One, Scalar},
    power::PowerKind,
    typle::{intersection, set_eq},
};

mod add;
mod bundle;
mod embed;
mod eval;
mod indexed;
mod mul;
mod scale;

pub use add::Addition;
pub use bundle::{Bundle, Split};
pub use embed::{Coembed, Embed, LinearEmbedding};
pub use eval::Evaluated;
pub use indexed::{IndexedObject, IndexedObjectMut};
pub use mul::Multiplication;
pub use scale::ScalarMultiplication;

#[derive(Debug, Clone, Error)]
pub enum ExprError {
    #[error(transparent)]
    Concept(#[from] ConceptError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("{found} indices written on a value with {expected} factors")]
    Arity { expected: usize, found: usize },
    #[error("index {index} is summed over {left} and {right}, which are not dual")]
    NotDual {
        index: AbstractIndex,
        left: Concept,
        right: Concept,
    },
    #[error("index {index} occurs {count} times")]
    Overused { index: AbstractIndex, count: usize },
    #[error("index {index} repeats in {list}")]
    Repeated { index: AbstractIndex, list: IndexList },
    #[error("free indices {found} do not match {expected}")]
    FreeIndexMismatch { expected: IndexList, found: IndexList },
    #[error("index {index} ranges over {found}, expected {expected}")]
    FactorMismatch {
        index: AbstractIndex,
        expected: Concept,
        found: Concept,
    },
    #[error("index {index} is already in use by a subexpression; rename it with `reindex`")]
    IndexReuse { index: AbstractIndex },
    #[error("index {index} is not free in {free}")]
    NotFree { index: AbstractIndex, free: IndexList },
    #[error("expression with free indices {0} is not a scalar")]
    NotScalar(IndexList),
    #[error("index {index} over {factor} cannot be replaced by {count} indices")]
    Degree {
        index: AbstractIndex,
        factor: Concept,
        count: usize,
    },
    #[error("index {index} ranges over {factor}, which is not a {expected}")]
    Structure {
        index: AbstractIndex,
        factor: Concept,
        expected: &'static str,
    },
    #[error("no indices given to merge into {0}")]
    NoIndices(AbstractIndex),
    #[error("aliased tensor assignment: the right-hand side reads from {0}")]
    Aliased(MemoryRange),
    #[error("renaming index {0} overflows the symbol space")]
    SymbolOverflow(AbstractIndex),
}

/// A node of an index-notation expression.
pub trait Expression {
    type Scalar: Scalar;

    /// Indices of the result, in the order `component` expects their values.
    fn free_indices(&self) -> &[DimIndex];

    /// Indices summed somewhere below this node. They may not appear anywhere else in the
    /// tree.
    fn used_indices(&self) -> &[AbstractIndex];

    /// The component at `index`, one value per free index.
    fn component(&self, index: &[usize]) -> Self::Scalar;

    /// Returns `true` if evaluating the node reads memory in `range`.
    fn overlaps_memory_range(&self, range: &MemoryRange) -> bool;

    /// The same tree with every index renamed through `map`.
    fn reindexed(self, map: &IndexMap) -> Result<Self, ExprError>
    where
        Self: Sized;

    #[inline]
    fn rank(&self) -> usize {
        self.free_indices().len()
    }

    fn free_symbols(&self) -> IndexList {
        symbols(self.free_indices())
    }
}

/// An expression, carrying the arithmetic operators.
#[derive(Debug, Clone, Deref, DerefMut)]
pub struct Expr<E>(E);

impl<E> Expr<E> {
    #[inline]
    pub fn new(node: E) -> Self {
        Self(node)
    }

    #[inline]
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<E: Expression> Expr<E> {
    /// Sum of two expressions with the same free indices, in any order.
    pub fn try_add<R>(self, rhs: Expr<R>) -> Result<Expr<Addition<E, R, '+'>>, ExprError>
    where
        R: Expression<Scalar = E::Scalar>,
    {
        Addition::new(self.0, rhs.0).map(Expr)
    }

    /// Difference of two expressions with the same free indices, in any order.
    pub fn try_sub<R>(self, rhs: Expr<R>) -> Result<Expr<Addition<E, R, '-'>>, ExprError>
    where
        R: Expression<Scalar = E::Scalar>,
    {
        Addition::new(self.0, rhs.0).map(Expr)
    }

    /// Product of two expressions, summed over the indices free in both.
    pub fn try_mul<R>(self, rhs: Expr<R>) -> Result<Expr<Multiplication<E, R>>, ExprError>
    where
        R: Expression<Scalar = E::Scalar>,
    {
        Multiplication::new(self.0, rhs.0).map(Expr)
    }

    #[inline]
    pub fn scale(self, scalar: E::Scalar) -> Expr<ScalarMultiplication<E, '*'>> {
        Expr(ScalarMultiplication::new(self.0, scalar))
    }

    #[inline]
    pub fn divide(self, scalar: E::Scalar) -> Expr<ScalarMultiplication<E, '/'>> {
        Expr(ScalarMultiplication::new(self.0, scalar))
    }

    /// Renames the indices in `domain` to those in `codomain`. Every other index is moved past
    /// the codomain, so the renamed expression can be combined with one using the codomain.
    ///
    /// ```
    /// # use tenh::prelude::*;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let t = Operator::<2, 2>::from_components([1.0, 2.0, 3.0, 4.0])?;
    /// let v = Vector::<2>::from_components([1.0, 2.0])?;
    /// // `i` is summed in the trace but free in `v`
    /// assert!(t.idx(('i', 'i'))?.try_mul(v.idx('i')?).is_err());
    ///
    /// let trace = t.idx(('i', 'i'))?.reindex('i', 'j')?;
    /// assert_eq!((trace * v.idx('i')?).eval()?.components(), vec![5.0, 10.0]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn reindex(
        self,
        domain: impl Into<IndexList>,
        codomain: impl Into<IndexList>,
    ) -> Result<Self, ExprError> {
        let map = IndexMap::new(domain, codomain)?;
        self.0.reindexed(&map).map(Expr)
    }

    /// Materializes every component into owned storage.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub fn eval(&self) -> Result<Expr<Evaluated<E::Scalar>>, ExprError> {
        Evaluated::new(&self.0).map(Expr)
    }

    /// The value of an expression without free indices.
    pub fn value(&self) -> Result<E::Scalar, ExprError> {
        match self.rank() {
            0 => Ok(self.0.component(&[])),
            _ => Err(ExprError::NotScalar(self.free_symbols())),
        }
    }

    /// Merges the free `indices` into the single index `into`, ranging over their tensor
    /// product. The new index comes last.
    pub fn bundle(
        self,
        indices: impl Into<IndexList>,
        into: impl Into<AbstractIndex>,
    ) -> Result<Expr<Bundle<E>>, ExprError> {
        Bundle::new(self.0, indices.into(), into.into()).map(Expr)
    }

    /// Splits the free `index`, ranging over a tensor product, into one index per factor.
    /// The new indices come last.
    pub fn split(
        self,
        index: impl Into<AbstractIndex>,
        into: impl Into<IndexList>,
    ) -> Result<Expr<Split<E>>, ExprError> {
        Split::new(self.0, index.into(), into.into()).map(Expr)
    }

    /// Embeds the free `index`, ranging over a symmetric or exterior power, into its ambient
    /// tensor power. The new indices come last.
    pub fn embed(
        self,
        index: impl Into<AbstractIndex>,
        into: impl Into<IndexList>,
        embedding: LinearEmbedding,
    ) -> Result<Expr<Embed<E>>, ExprError> {
        Embed::new(self.0, index.into(), into.into(), embedding).map(Expr)
    }

    /// The adjoint of [`Expr::embed`]: projects the free `indices` onto a single index over
    /// their symmetric or exterior power. The new index comes last.
    pub fn coembed(
        self,
        indices: impl Into<IndexList>,
        into: impl Into<AbstractIndex>,
        kind: PowerKind,
        embedding: LinearEmbedding,
    ) -> Result<Expr<Coembed<E>>, ExprError> {
        Coembed::new(self.0, indices.into(), into.into(), kind, embedding).map(Expr)
    }
}

impl<L, R> Add<Expr<R>> for Expr<L>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    type Output = Expr<Addition<L, R, '+'>>;

    fn add(self, rhs: Expr<R>) -> Self::Output {
        self.try_add(rhs).expect("free indices must match")
    }
}

impl<L, R> Sub<Expr<R>> for Expr<L>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    type Output = Expr<Addition<L, R, '-'>>;

    fn sub(self, rhs: Expr<R>) -> Self::Output {
        self.try_sub(rhs).expect("free indices must match")
    }
}

impl<L, R> Mul<Expr<R>> for Expr<L>
where
    L: Expression,
    R: Expression<Scalar = L::Scalar>,
{
    type Output = Expr<Multiplication<L, R>>;

    fn mul(self, rhs: Expr<R>) -> Self::Output {
        self.try_mul(rhs)
            .expect("summed indices must be dual and not reused")
    }
}

impl<E: Expression> Neg for Expr<E> {
    type Output = Expr<ScalarMultiplication<E, '*'>>;

    fn neg(self) -> Self::Output {
        self.scale(-E::Scalar::one())
    }
}

macro_rules! impl_scalar_ops {
    ($t:ty) => {
        impl<E: Expression<Scalar = $t>> Mul<$t> for Expr<E> {
            type Output = Expr<ScalarMultiplication<E, '*'>>;

            #[inline]
            fn mul(self, rhs: $t) -> Self::Output {
                self.scale(rhs)
            }
        }

        impl<E: Expression<Scalar = $t>> Mul<Expr<E>> for $t {
            type Output = Expr<ScalarMultiplication<E, '*'>>;

            #[inline]
            fn mul(self, rhs: Expr<E>) -> Self::Output {
                rhs.scale(self)
            }
        }

        impl<E: Expression<Scalar = $t>> Div<$t> for Expr<E> {
            type Output = Expr<ScalarMultiplication<E, '/'>>;

            #[inline]
            fn div(self, rhs: $t) -> Self::Output {
                self.divide(rhs)
            }
        }
    };
}

impl_scalar_ops!(f16);
impl_scalar_ops!(f32);
impl_scalar_ops!(f64);

/// The symbols of a list of dimensioned indices.
pub(crate) fn symbols(indices: &[DimIndex]) -> IndexList {
    indices.iter().map(|index| index.index).collect()
}

pub(crate) fn check_rank(rank: usize) -> Result<(), ExprError> {
    match rank > MAX_RANK {
        true => Err(IndexError::RankTooLarge(rank).into()),
        false => Ok(()),
    }
}

/// Fails if `list` repeats an index.
pub(crate) fn check_distinct(list: &IndexList) -> Result<(), ExprError> {
    match list.first_repeated() {
        Some(index) => Err(ExprError::Repeated {
            index,
            list: list.clone(),
        }),
        None => Ok(()),
    }
}

/// Fails if an index summed in one operand is free in the other. An index may be summed in
/// both operands, each sum being independent.
pub(crate) fn check_reuse(
    left: &impl Expression,
    right: &impl Expression,
) -> Result<(), ExprError> {
    let (left_free, right_free) = (left.free_symbols(), right.free_symbols());
    let reused = intersection(left.used_indices(), &right_free[..])
        .into_iter()
        .chain(intersection(right.used_indices(), &left_free[..]))
        .next();
    match reused {
        Some(index) => Err(ExprError::IndexReuse { index }),
        None => Ok(()),
    }
}

/// Fails if `index` is already free or used in `expr`, ignoring the indices in `released`.
pub(crate) fn check_fresh(
    expr: &impl Expression,
    index: AbstractIndex,
    released: &[AbstractIndex],
) -> Result<(), ExprError> {
    let free = expr.free_symbols();
    let taken = (free.contains(&index) && !released.contains(&index))
        || expr.used_indices().contains(&index);
    match taken {
        true => Err(ExprError::IndexReuse { index }),
        false => Ok(()),
    }
}

/// Position of the free `index` in `free`.
pub(crate) fn find_free(free: &[DimIndex], index: AbstractIndex) -> Result<usize, ExprError> {
    free.iter()
        .position(|other| other.index == index)
        .ok_or_else(|| ExprError::NotFree {
            index,
            free: symbols(free),
        })
}

/// Matches `found` against `expected` as sets, with equal factors per index. Returns for each
/// index of `found` its position in `expected`.
pub(crate) fn match_free(
    expected: &[DimIndex],
    found: &[DimIndex],
) -> Result<Vec<usize>, ExprError> {
    let mismatch = || ExprError::FreeIndexMismatch {
        expected: symbols(expected),
        found: symbols(found),
    };
    if expected.len() != found.len() || !set_eq(&symbols(expected)[..], &symbols(found)[..]) {
        return Err(mismatch());
    }
    found
        .iter()
        .map(|index| {
            let position = expected
                .iter()
                .position(|other| other.index == index.index)
                .ok_or_else(mismatch)?;
            let other = &expected[position];
            match other.factor == index.factor {
                true => Ok(position),
                false => Err(ExprError::FactorMismatch {
                    index: index.index,
                    expected: other.factor.clone(),
                    found: index.factor.clone(),
                }),
            }
        })
        .collect()
}

pub(crate) fn rename(index: AbstractIndex, map: &IndexMap) -> Result<AbstractIndex, ExprError> {
    map.apply(index).ok_or(ExprError::SymbolOverflow(index))
}

pub(crate) fn rename_free(free: &[DimIndex], map: &IndexMap) -> Result<Vec<DimIndex>, ExprError> {
    free.iter()
        .map(|index| Ok(index.renamed(rename(index.index, map)?)))
        .collect()
}

pub(crate) fn rename_used(
    used: &[AbstractIndex],
    map: &IndexMap,
) -> Result<Vec<AbstractIndex>, ExprError> {
    used.iter().map(|&index| rename(index, map)).collect()
}

pub(crate) fn rename_list(list: &IndexList, map: &IndexMap) -> Result<IndexList, ExprError> {
    list.iter().map(|&index| rename(index, map)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::error::Error;

    use crate::{
        basic::{Covector, Operator, Space, Tensor2, Vector},
        expr::{ExprError, Expression},
        loom::{
            array::{ConstPreallocatedArray, PreallocatedArray},
            index::{AbstractIndex, CheckPointer, IndexError},
            product::TensorProductOfBasedVectorSpaces,
            tensor::ImplementationOf,
        },
    };

    type Square = TensorProductOfBasedVectorSpaces<(Space<3>, Space<3>)>;

    /// Random components in `[-1, 1)`.
    pub(crate) fn random_components(rng: &mut fastrand::Rng, count: usize) -> Vec<f64> {
        (0..count).map(|_| rng.f64() * 2.0 - 1.0).collect()
    }

    #[test]
    fn test_inner_product() -> Result<(), Box<dyn Error>> {
        let v = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
        let d = Covector::<3>::from_components([3.0, 2.0, 1.0])?;
        assert_eq!((v.idx('i')? * d.idx('i')?).value()?, 10.0);

        let mut rng = fastrand::Rng::with_seed(42);
        let x = random_components(&mut rng, 5);
        let y = random_components(&mut rng, 5);
        let expected: f64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();
        let v = Vector::<5>::from_components(x)?;
        let d = Covector::<5>::from_components(y)?;
        let value = (v.idx('i')? * d.idx('i')?).value()?;
        assert!((value - expected).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_contraction_needs_dual() -> Result<(), Box<dyn Error>> {
        let v = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
        let w = Vector::<3>::from_components([3.0, 2.0, 1.0])?;
        let err = v.idx('i')?.try_mul(w.idx('i')?).unwrap_err();
        assert!(matches!(err, ExprError::NotDual { .. }));

        // without a shared index it is an outer product
        let outer = v.idx('i')? * w.idx('j')?;
        assert_eq!(outer.rank(), 2);
        assert_eq!(outer.component(&[1, 2]), 2.0);
        Ok(())
    }

    #[test]
    fn test_transpose() -> Result<(), Box<dyn Error>> {
        let t = Tensor2::<3, 3>::from_fn(|index| index.value() as f64);
        let mut u = Tensor2::<3, 3>::zeros();
        u.idx_mut(('i', 'j'))?.assign(t.idx(('j', 'i'))?)?;
        for (r, c) in itertools::iproduct!(0..3, 0..3) {
            assert_eq!(u.as_slice()[r * 3 + c], t.as_slice()[c * 3 + r]);
        }
        Ok(())
    }

    #[test]
    fn test_aliased_transpose() -> Result<(), Box<dyn Error>> {
        let mut data: Vec<f64> = (0..9).map(|k| k as f64).collect();
        let ptr = data.as_mut_ptr();

        // two views of one buffer
        let t = unsafe {
            ImplementationOf::<Square, f64, ConstPreallocatedArray<'_, f64>>::from_raw_parts(
                ptr,
                CheckPointer::True,
            )?
        };
        let mut u = unsafe {
            ImplementationOf::<Square, f64, PreallocatedArray<'_, f64>>::from_raw_parts(
                ptr,
                CheckPointer::True,
            )?
        };

        let err = u.idx_mut(('i', 'j'))?.assign(t.idx(('j', 'i'))?).unwrap_err();
        assert!(matches!(err, ExprError::Aliased(_)));

        let transposed = t.idx(('j', 'i'))?.eval()?;
        u.idx_mut(('i', 'j'))?.assign(transposed)?;
        drop((t, u));
        assert_eq!(data, [0.0, 3.0, 6.0, 1.0, 4.0, 7.0, 2.0, 5.0, 8.0]);
        Ok(())
    }

    #[test]
    fn test_summed_in_both_operands() -> Result<(), Box<dyn Error>> {
        let a = Operator::<2, 2>::from_components([1.0, 2.0, 3.0, 4.0])?;
        let b = Operator::<2, 2>::from_components([0.0, 1.0, 1.0, 0.0])?;
        let v = Vector::<2>::from_components([1.0, 1.0])?;
        let u = Vector::<2>::from_components([2.0, 3.0])?;

        // a(i, j) v(j) + b(i, j) u(j): `j` is summed on each side independently
        let sum = (a.idx(('i', 'j'))? * v.idx('j')?).try_add(b.idx(('i', 'j'))? * u.idx('j')?)?;
        assert_eq!(sum.eval()?.components(), vec![6.0, 9.0]);

        let mut w = Vector::<2>::zeros();
        w.idx_mut('i')?
            .assign(a.idx(('i', 'j'))? * v.idx('j')? - b.idx(('i', 'j'))? * u.idx('j')?)?;
        assert_eq!(w.as_slice(), &[0.0, 5.0]);

        let x = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
        let d = Covector::<3>::from_components([3.0, 2.0, 1.0])?;
        let e = Covector::<3>::from_components([1.0, 0.0, 2.0])?;
        let product = (x.idx('i')? * d.idx('i')?).try_mul(x.idx('i')? * e.idx('i')?)?;
        assert_eq!(product.value()?, 10.0 * 7.0);

        // an index summed on one side still may not be free on the other
        let err = (x.idx('i')? * d.idx('i')?).try_mul(x.idx('i')?).unwrap_err();
        assert!(matches!(err, ExprError::IndexReuse { .. }));
        let scaled = x.idx('i')?.try_add(x.idx('j')? * d.idx('j')? * x.idx('i')?)?;
        assert_eq!(scaled.eval()?.components(), vec![11.0, 22.0, 33.0]);
        Ok(())
    }

    #[test]
    fn test_value_needs_scalar() -> Result<(), Box<dyn Error>> {
        let v = Vector::<2>::from_components([1.0, 2.0])?;
        assert!(matches!(v.idx('i')?.value(), Err(ExprError::NotScalar(_))));
        Ok(())
    }

    #[test]
    fn test_reindex() -> Result<(), Box<dyn Error>> {
        let t = Operator::<2, 2>::from_components([1.0, 2.0, 3.0, 4.0])?;
        let (i, j) = (AbstractIndex::new('i'), AbstractIndex::new('j'));

        let e = t.idx((i, j))?.reindex((i, j), (j, i))?;
        assert_eq!(&e.free_symbols()[..], &[j, i]);

        // the trace index is renamed too, away from the codomain
        let e = t.idx((i, i))?.reindex(j, AbstractIndex::new('k'))?;
        assert_eq!(e.used_indices().len(), 1);
        assert_ne!(e.used_indices()[0], i);
        assert_eq!(e.value()?, 5.0);

        let err = t
            .idx((i, j))?
            .reindex(i, AbstractIndex::from_symbol(u32::MAX))
            .unwrap_err();
        assert!(matches!(err, ExprError::SymbolOverflow(_)));

        let err = t.idx((i, j))?.reindex((i, j), i).unwrap_err();
        assert!(matches!(err, ExprError::Index(IndexError::MapLength { .. })));
        Ok(())
    }
}
