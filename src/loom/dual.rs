//! The dual functor.
//!
//! Every concept type names its formal dual through [`DualOf`]. Identity tags ([`Id`]) are
//! wrapped by [`Dual`] and unwrapped again, so that taking the dual twice always lands on
//! the original type. The concept families in [`space`](super::space),
//! [`product`](super::product) and [`power`](super::power) distribute the functor over
//! their parameters, so a dual never falls through to a bare wrapper of a structured type.

use std::{any::TypeId, borrow::Cow, fmt, hash::Hash, marker::PhantomData, sync::Arc};

pub use tenh_derive::Id;

/// A user-declared identity tag. Two concepts that differ only in their tag are distinct.
///
/// Derive it with `#[derive(Id)]`.
pub trait Id: 'static {
    const NAME: &'static str;
}

pub trait DualOf {
    type Dual;
}

pub type DualOfT<T> = <T as DualOf>::Dual;

/// The formal dual of an identity tag.
pub struct Dual<T>(PhantomData<T>);

impl<T> fmt::Debug for Dual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dual<{}>", std::any::type_name::<T>())
    }
}

impl<T> Default for Dual<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Clone for Dual<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Dual<T> {}

impl<I: Id> DualOf for I {
    type Dual = Dual<I>;
}

impl<I: Id> DualOf for Dual<I> {
    type Dual = I;
}

/// A generic tag whose dual is distinct from itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generic;

impl Id for Generic {
    const NAME: &'static str = "Generic";
}

/// A generic tag that is its own dual.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelfDualGeneric;

impl DualOf for SelfDualGeneric {
    type Dual = SelfDualGeneric;
}

/// Runtime identity of a tag type, together with its dual.
#[derive(Clone)]
pub struct Tag {
    id: TypeId,
    label: Arc<str>,
    dual: fn() -> Tag,
}

impl Tag {
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn dual(&self) -> Tag {
        (self.dual)()
    }

    #[inline]
    pub fn is_self_dual(&self) -> bool {
        self.dual().id == self.id
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.label).finish()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Implemented by every type usable as an identity tag.
pub trait TagType: DualOf + 'static {
    fn label() -> Cow<'static, str>;
    fn tag() -> Tag;
}

impl<I: Id> TagType for I {
    fn label() -> Cow<'static, str> {
        Cow::Borrowed(I::NAME)
    }

    fn tag() -> Tag {
        Tag {
            id: TypeId::of::<I>(),
            label: Self::label().into(),
            dual: <Dual<I> as TagType>::tag,
        }
    }
}

impl<I: Id> TagType for Dual<I> {
    fn label() -> Cow<'static, str> {
        Cow::Owned(format!("Dual<{}>", I::NAME))
    }

    fn tag() -> Tag {
        Tag {
            id: TypeId::of::<Self>(),
            label: Self::label().into(),
            dual: <I as TagType>::tag,
        }
    }
}

impl TagType for SelfDualGeneric {
    fn label() -> Cow<'static, str> {
        Cow::Borrowed("SelfDualGeneric")
    }

    fn tag() -> Tag {
        Tag {
            id: TypeId::of::<Self>(),
            label: Self::label().into(),
            dual: <Self as TagType>::tag,
        }
    }
}

/// Compile-time type equality. `assert_same::<A, B>()` only builds when `A` and `B` are the
/// same type.
pub trait SameAs<T: ?Sized> {}

impl<T: ?Sized> SameAs<T> for T {}

#[inline]
pub const fn assert_same<A: ?Sized + SameAs<B>, B: ?Sized>() {}

/// Builds only when taking the dual of `T` twice gives back `T`.
#[inline]
pub const fn assert_double_dual<T>()
where
    T: DualOf,
    T::Dual: DualOf,
    DualOfT<T::Dual>: SameAs<T>,
{
}

#[cfg(test)]
mod tests {
    use super::{
        Dual, DualOfT, Generic, SelfDualGeneric, TagType, assert_double_dual, assert_same,
    };
    use crate::loom::dual::Id;

    #[derive(Debug, Clone, Copy, Id)]
    #[id(crate = "crate", name = "Euclid")]
    struct Euclidean;

    #[test]
    fn test_double_dual_tags() {
        assert_double_dual::<Euclidean>();
        assert_double_dual::<Dual<Euclidean>>();
        assert_double_dual::<Generic>();
        assert_double_dual::<SelfDualGeneric>();

        assert_same::<DualOfT<Euclidean>, Dual<Euclidean>>();
        assert_same::<DualOfT<SelfDualGeneric>, SelfDualGeneric>();
    }

    #[test]
    fn test_tag_duality() {
        let tag = Euclidean::tag();
        assert_eq!(tag.label(), "Euclid");
        assert_eq!(tag.dual().label(), "Dual<Euclid>");
        assert_eq!(tag.dual().dual(), tag);
        assert_ne!(tag.dual(), tag);
        assert!(!Generic::tag().is_self_dual());
        assert!(SelfDualGeneric::tag().is_self_dual());
    }
}
