//! Tensor algebra over typed vector spaces, written in index notation.
//!
//! Vector spaces, bases, tensor products, direct sums and symmetric/exterior powers are
//! declared as *types* ([`loom`]). Values of those types are indexed with abstract indices
//! and combined into expressions ([`expr`]) that are checked once, when they are built,
//! and evaluated component by component into plain nested loops.
//!
//! ```
//! use tenh::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (i, j) = (AbstractIndex::new('i'), AbstractIndex::new('j'));
//!
//! let v = Vector::<3>::from_components([1.0, 2.0, 3.0])?;
//! let d = Covector::<3>::from_components([3.0, 2.0, 1.0])?;
//! assert_eq!((v.idx(i)? * d.idx(i)?).value()?, 10.0);
//!
//! let t = Tensor2::<3, 3>::from_fn(|index| index.value() as f64);
//! let mut u = Tensor2::<3, 3>::zeros();
//! u.idx_mut((i, j))?.assign(t.idx((j, i))?)?;
//! assert_eq!(u.component(ComponentIndex::new(1, 9, CheckRange::True)?), 3.0);
//! # Ok(())
//! # }
//! ```

pub mod basic;
pub mod expr;
pub mod loom;
pub mod pretty;

pub mod prelude {
    pub use crate::{
        basic::{Covector, Euclidean, Operator, Space, Standard, Tensor2, Vector, identity},
        expr::{Expr, ExprError, Expression, LinearEmbedding},
        loom::{
            array::{
                Array, ArrayMut, ConstPreallocatedArray, MemberArray, PreallocatedArray,
                ProceduralArray,
            },
            concept::{Concept, ConceptType, ConceptualStructure},
            dual::{Dual, DualOf, Generic, Id, SelfDualGeneric},
            index::{AbstractIndex, CheckPointer, CheckRange, ComponentIndex, IndexList},
            num::{RealField, Scalar},
            power::{ExteriorPowerOfBasedVectorSpace, PowerKind, SymmetricPowerOfBasedVectorSpace},
            product::{DirectSumOfBasedVectorSpaces, TensorProductOfBasedVectorSpaces},
            space::{BasedVectorSpace, Basis, Field, OrthonormalBasis, VectorSpace},
            tensor::{ImplementationOf, Tensor},
        },
    };
}
