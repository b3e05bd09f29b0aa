//! The `loom` module provides the type-level half of the crate: the conceptual structures
//! that tensors live in, and the storage that holds their components.
//!
//! ## Key Components
//! 1. **Primitive Kernel**:
//!    - Type tuples (`Typle`) and set operations over ordered lists.
//!    - Scalar types (`f16`, `f32`, `f64`) and the field each belongs to.
//!
//! 2. **Concept Graph**:
//!    - Descriptors (`Concept`) mirroring every concept type, with parent lists and
//!      memoized ancestor traversal.
//!    - Inherited property lookup that must resolve to exactly one value.
//!    - Unique conceptual structure queries (`ConceptualStructure`).
//!
//! 3. **Concept Families**:
//!    - Fields, vector spaces, bases, based vector spaces.
//!    - Tensor products, direct sums, symmetric and exterior powers.
//!    - The dual functor (`DualOf`), an involution distributing over every family.
//!
//! 4. **Indices and Storage**:
//!    - Abstract indices, dimensioned indices, bounds-checked component indices.
//!    - Member, preallocated and procedural arrays behind one `Array` interface.
//!    - Tensor values (`ImplementationOf`) tying a concept, a scalar and an array together.
//!
//! ## Design Principles
//! - **Compile-time structure**: duals, dimensions and scalar fields are resolved by the type system.
//! - **Checked once**: index bookkeeping happens when an expression is built, never per component.
//! - **Zero residue**: evaluation runs on stack buffers with no allocation.

pub mod array;
pub mod concept;
pub mod dual;
pub mod index;
pub mod num;
pub mod power;
pub mod product;
pub mod space;
pub mod tensor;
pub mod typle;
