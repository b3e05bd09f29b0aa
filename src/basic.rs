//! Ready-made spaces and tensor aliases for the common case: real Euclidean spaces with
//! their standard orthonormal basis.
//!
//! ```
//! use tenh::prelude::*;
//!
//! let a = Operator::<2, 3>::from_fn(|index| index.value() as f64);
//! let x = Vector::<3>::filled(1.0);
//! assert_eq!((&a * &x).as_slice(), &[3.0, 12.0]);
//! assert_eq!(a.transpose().as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
//! ```

use std::ops::{Add, Mul, Neg, Sub};

use half::f16;

use crate::{
    expr::ExprError,
    loom::{
        array::{Array, KroneckerDelta, ProceduralArray},
        dual::{DualOf, DualOfT, Id},
        index::{AbstractIndex, IndexList},
        num::{RealField, Scalar},
        product::TensorProductOfBasedVectorSpaces,
        space::{BasedVectorSpace, BasedVectorSpaceType, OrthonormalBasis, VectorSpace},
        tensor::{ImplementationOf, Tensor},
    },
};

/// Tag of the real Euclidean spaces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Id)]
#[id(crate = "crate")]
pub struct Euclidean;

/// Tag of the standard basis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Id)]
#[id(crate = "crate")]
pub struct Standard;

pub type Space<const N: usize, S = Euclidean, B = Standard> =
    BasedVectorSpace<VectorSpace<RealField, N, S>, OrthonormalBasis<B>>;

pub type Vector<const N: usize, T = f64, S = Euclidean, B = Standard> = Tensor<Space<N, S, B>, T>;

pub type Covector<const N: usize, T = f64, S = Euclidean, B = Standard> =
    Tensor<DualOfT<Space<N, S, B>>, T>;

/// A linear map from `Space<N>` to `Space<M>`, stored row-major as `M` rows of `N`.
pub type Operator<const M: usize, const N: usize, T = f64, S = Euclidean, B = Standard> =
    Tensor<TensorProductOfBasedVectorSpaces<(Space<M, S, B>, DualOfT<Space<N, S, B>>)>, T>;

/// A tensor on `Space<M> ⊗ Space<N>`. Unlike an [`Operator`], both factors are the same
/// variance, so it can be added to its own transpose.
pub type Tensor2<const M: usize, const N: usize, T = f64, S = Euclidean, B = Standard> =
    Tensor<TensorProductOfBasedVectorSpaces<(Space<M, S, B>, Space<N, S, B>)>, T>;

/// The identity operator on `Space<N>`, computed on demand.
pub type Identity<const N: usize, T = f64> = ImplementationOf<
    TensorProductOfBasedVectorSpaces<(Space<N>, DualOfT<Space<N>>)>,
    T,
    ProceduralArray<T, KroneckerDelta<N>>,
>;

/// The identity operator on `Space<N>`. It occupies no memory.
#[inline]
pub fn identity<const N: usize, T: Scalar<Field = RealField>>() -> Identity<N, T> {
    Identity::<N, T>::procedural(KroneckerDelta)
}

type Product<V, W> = TensorProductOfBasedVectorSpaces<(V, W)>;

impl<V, W, T, A> ImplementationOf<Product<V, W>, T, A>
where
    V: BasedVectorSpaceType,
    W: BasedVectorSpaceType<Field = V::Field>,
    T: Scalar<Field = V::Field>,
    A: Array<T>,
{
    /// Applies the map to a vector of the dual of its second factor.
    pub fn apply<X, B>(&self, x: &ImplementationOf<X, T, B>) -> Tensor<V, T>
    where
        X: BasedVectorSpaceType<Field = V::Field> + DualOf<Dual = W>,
        B: Array<T>,
    {
        let a = self.array();
        Tensor::from_fn(|index| {
            let row = index.value() * W::DIM;
            (0..W::DIM).fold(T::zero(), |sum, j| sum + a.get(row + j) * x.array().get(j))
        })
    }

    /// The composite map `self ∘ other`.
    pub fn compose<X, Y, B>(
        &self,
        other: &ImplementationOf<Product<X, Y>, T, B>,
    ) -> Tensor<Product<V, Y>, T>
    where
        X: BasedVectorSpaceType<Field = V::Field> + DualOf<Dual = W>,
        Y: BasedVectorSpaceType<Field = V::Field>,
        B: Array<T>,
    {
        let (a, b) = (self.array(), other.array());
        Tensor::from_fn(|index| {
            let (i, k) = (index.value() / Y::DIM, index.value() % Y::DIM);
            (0..W::DIM).fold(T::zero(), |sum, j| {
                sum + a.get(i * W::DIM + j) * b.get(j * Y::DIM + k)
            })
        })
    }

    /// The same components with the two factors swapped.
    pub fn transpose(&self) -> Tensor<Product<W, V>, T> {
        let a = self.array();
        Tensor::from_fn(|index| {
            let (j, i) = (index.value() / V::DIM, index.value() % V::DIM);
            a.get(i * W::DIM + j)
        })
    }

    /// Sum of the diagonal. Only defined when the second factor is the dual of the first.
    pub fn trace(&self) -> T
    where
        W: DualOf<Dual = V>,
    {
        let a = self.array();
        (0..V::DIM).fold(T::zero(), |sum, i| sum + a.get(i * W::DIM + i))
    }
}

impl<C, T, A> ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    A: Array<T>,
{
    /// The natural pairing with a value of the dual space, contracting every factor.
    pub fn pair<D, B>(&self, other: &ImplementationOf<D, T, B>) -> Result<T, ExprError>
    where
        D: BasedVectorSpaceType<Field = C::Field> + DualOf<Dual = C>,
        B: Array<T>,
    {
        let count = self.factors()?.len();
        let indices: IndexList = (0..count as u32).map(AbstractIndex::from_symbol).collect();
        let product = self.idx(indices.clone())?.try_mul(other.idx(indices)?)?;
        product.value()
    }
}

impl<C, T, A, B> Add<&ImplementationOf<C, T, B>> for &ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    A: Array<T>,
    B: Array<T>,
{
    type Output = Tensor<C, T>;

    fn add(self, rhs: &ImplementationOf<C, T, B>) -> Self::Output {
        let (a, b) = (self.array(), rhs.array());
        Tensor::from_fn(|index| a.get(index.value()) + b.get(index.value()))
    }
}

impl<C, T, A, B> Sub<&ImplementationOf<C, T, B>> for &ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    A: Array<T>,
    B: Array<T>,
{
    type Output = Tensor<C, T>;

    fn sub(self, rhs: &ImplementationOf<C, T, B>) -> Self::Output {
        let (a, b) = (self.array(), rhs.array());
        Tensor::from_fn(|index| a.get(index.value()) - b.get(index.value()))
    }
}

impl<C, T, A> Neg for &ImplementationOf<C, T, A>
where
    C: BasedVectorSpaceType,
    T: Scalar<Field = C::Field>,
    A: Array<T>,
{
    type Output = Tensor<C, T>;

    fn neg(self) -> Self::Output {
        let a = self.array();
        Tensor::from_fn(|index| -a.get(index.value()))
    }
}

impl<V, W, X, T, A, B> Mul<&ImplementationOf<X, T, B>> for &ImplementationOf<Product<V, W>, T, A>
where
    V: BasedVectorSpaceType,
    W: BasedVectorSpaceType<Field = V::Field>,
    X: BasedVectorSpaceType<Field = V::Field> + DualOf<Dual = W>,
    T: Scalar<Field = V::Field>,
    A: Array<T>,
    B: Array<T>,
{
    type Output = Tensor<V, T>;

    #[inline]
    fn mul(self, rhs: &ImplementationOf<X, T, B>) -> Self::Output {
        self.apply(rhs)
    }
}

macro_rules! impl_scalar_mul {
    ($t:ty) => {
        impl<C, A> Mul<$t> for &ImplementationOf<C, $t, A>
        where
            C: BasedVectorSpaceType<Field = RealField>,
            A: Array<$t>,
        {
            type Output = Tensor<C, $t>;

            fn mul(self, rhs: $t) -> Self::Output {
                let a = self.array();
                Tensor::from_fn(|index| a.get(index.value()) * rhs)
            }
        }

        impl<C, A> Mul<&ImplementationOf<C, $t, A>> for $t
        where
            C: BasedVectorSpaceType<Field = RealField>,
            A: Array<$t>,
        {
            type Output = Tensor<C, $t>;

            #[inline]
            fn mul(self, rhs: &ImplementationOf<C, $t, A>) -> Self::Output {
                rhs * self
            }
        }
    };
}

impl_scalar_mul!(f16);
impl_scalar_mul!(f32);
impl_scalar_mul!(f64);

#[cfg(test)]
mod tests {
    use std::error::Error;

    use half::f16;

    use super::{Covector, Operator, Space, Tensor2, Vector, identity};
    use crate::loom::{
        array::Array, concept::ConceptType, dual::DualOfT, product::TensorProductOfBasedVectorSpaces,
    };

    #[test]
    fn test_operator() -> Result<(), Box<dyn Error>> {
        let a = Operator::<2, 3>::from_components([1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let b = Operator::<3, 2>::from_components([1.0, 0.0, 0.0, 1.0, 1.0, 1.0])?;
        let x = Vector::<3>::from_components([1.0, 0.0, -1.0])?;

        assert_eq!(a.apply(&x).as_slice(), &[-2.0, -2.0]);
        assert_eq!((&a * &x).as_slice(), &[-2.0, -2.0]);
        assert_eq!(a.compose(&b).as_slice(), &[4.0, 5.0, 10.0, 11.0]);
        assert_eq!(a.compose(&b).trace(), 15.0);
        assert_eq!(
            a.transpose().as_slice(),
            &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
        );
        Ok(())
    }

    #[test]
    fn test_identity() {
        let id = identity::<3, f64>();
        assert_eq!(id.array().allocation_size_in_bytes(), 0);
        assert_eq!(id.trace(), 3.0);

        let x = Vector::<3>::from_fn(|index| index.value() as f64 + 1.0);
        assert_eq!(id.apply(&x), x);
    }

    #[test]
    fn test_pair() -> Result<(), Box<dyn Error>> {
        let v = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
        let d = Covector::<3>::from_components([1.0, 1.0, -1.0])?;
        assert_eq!(v.pair(&d)?, 0.0);
        assert_eq!(d.pair(&v)?, 0.0);

        // pairing contracts each factor of a product
        let t = Tensor2::<2, 2>::from_components([1.0, 2.0, 3.0, 4.0])?;
        let s = crate::loom::tensor::Tensor::<
            TensorProductOfBasedVectorSpaces<(DualOfT<Space<2>>, DualOfT<Space<2>>)>,
            f64,
        >::filled(1.0);
        assert_eq!(t.pair(&s)?, 10.0);
        Ok(())
    }

    #[test]
    fn test_elementwise() -> Result<(), Box<dyn Error>> {
        let u = Vector::<2>::from_components([1.0, 2.0])?;
        let v = Vector::<2>::from_components([0.5, 0.5])?;
        assert_eq!((&u + &v).as_slice(), &[1.5, 2.5]);
        assert_eq!((&u - &v).as_slice(), &[0.5, 1.5]);
        assert_eq!((-&u).as_slice(), &[-1.0, -2.0]);
        assert_eq!((2.0 * &u).as_slice(), &[2.0, 4.0]);

        let h = Vector::<2, f16>::filled(f16::ONE);
        assert_eq!((&h * f16::from_f32(3.0)).as_slice(), &[f16::from_f32(3.0); 2]);
        Ok(())
    }

    #[test]
    fn test_dual_space() {
        assert_eq!(<DualOfT<Space<3>>>::concept(), Space::<3>::concept().dual());
        assert_ne!(<DualOfT<Space<3>>>::concept(), Space::<3>::concept());
    }
}
