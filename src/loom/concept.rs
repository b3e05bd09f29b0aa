//! Concept descriptors, ancestor traversal and inherited properties.
//!
//! Every concept type (see [`ConceptType`]) has a runtime descriptor, [`Concept`], built once
//! per type and memoized. A descriptor lists its parents (the concepts it specializes) and
//! its own base properties. Properties are looked up across all ancestors and must resolve
//! to exactly one value.

use std::{
    any::TypeId,
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, LazyLock, OnceLock, RwLock},
};

use derive_more::Display;
use itertools::Itertools;
use rustc_hash::FxHashMap as HashMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    dual::{DualOf, Tag},
    typle::unique_in,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Structure {
    Field,
    VectorSpace,
    Basis,
    OrthonormalBasis,
    BasedVectorSpace,
    TensorProduct,
    TensorProductOfBasedVectorSpaces,
    DirectSum,
    DirectSumOfBasedVectorSpaces,
    SymmetricPower,
    SymmetricPowerOfBasedVectorSpace,
    ExteriorPower,
    ExteriorPowerOfBasedVectorSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyId {
    Id,
    Field,
    Dimension,
    Basis,
    FactorTyple,
    SummandTyple,
    Factor,
    Degree,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Count(usize),
    Tag(Tag),
    Concept(Concept),
    Typle(Arc<[Concept]>),
}

impl PropertyValue {
    /// Applies the dual functor to the value. Counts are unchanged.
    pub fn dual(&self) -> Self {
        match self {
            PropertyValue::Count(count) => PropertyValue::Count(*count),
            PropertyValue::Tag(tag) => PropertyValue::Tag(tag.dual()),
            PropertyValue::Concept(concept) => PropertyValue::Concept(concept.dual()),
            PropertyValue::Typle(typle) => {
                PropertyValue::Typle(typle.iter().map(Concept::dual).collect())
            }
        }
    }

    #[inline]
    pub fn as_count(&self) -> Option<usize> {
        match self {
            PropertyValue::Count(count) => Some(*count),
            _ => None,
        }
    }

    #[inline]
    pub fn as_concept(&self) -> Option<&Concept> {
        match self {
            PropertyValue::Concept(concept) => Some(concept),
            _ => None,
        }
    }

    #[inline]
    pub fn as_typle(&self) -> Option<&Arc<[Concept]>> {
        match self {
            PropertyValue::Typle(typle) => Some(typle),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Count(count) => write!(f, "{count}"),
            PropertyValue::Tag(tag) => write!(f, "{tag}"),
            PropertyValue::Concept(concept) => write!(f, "{concept}"),
            PropertyValue::Typle(typle) => write!(f, "({})", typle.iter().format(", ")),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ConceptError {
    #[error("property {property} is not defined on any ancestor of {concept}")]
    MissingProperty {
        concept: Concept,
        property: PropertyId,
    },
    #[error("property {property} is defined ambiguously ({count} values) among ancestors of {concept}")]
    AmbiguousProperty {
        concept: Concept,
        property: PropertyId,
        count: usize,
    },
    #[error("property {property} of {concept} is not a {expected}")]
    PropertyKind {
        concept: Concept,
        property: PropertyId,
        expected: &'static str,
    },
    #[error("{concept} has no {structure} structure")]
    MissingStructure {
        concept: Concept,
        structure: &'static str,
    },
    #[error("{concept} has {count} distinct {structure} structures")]
    AmbiguousStructure {
        concept: Concept,
        structure: &'static str,
        count: usize,
    },
    #[error("field {0} mismatches field {1}")]
    FieldMismatch(Concept, Concept),
    #[error("{0} needs at least one factor")]
    EmptyTyple(Structure),
}

struct ConceptInner {
    structure: Structure,
    parents: Arc<[Concept]>,
    properties: Vec<(PropertyId, PropertyValue)>,
    ancestors: OnceLock<Arc<[Concept]>>,
}

/// Runtime descriptor of a concept: a structure tag, the parents it specializes, and its own
/// base properties. Cheap to clone; compared structurally.
#[derive(Clone)]
pub struct Concept(Arc<ConceptInner>);

impl Concept {
    pub fn new(
        structure: Structure,
        parents: impl IntoIterator<Item = Concept>,
        properties: impl IntoIterator<Item = (PropertyId, PropertyValue)>,
    ) -> Self {
        Self(Arc::new(ConceptInner {
            structure,
            parents: parents.into_iter().collect(),
            properties: properties.into_iter().collect(),
            ancestors: OnceLock::new(),
        }))
    }

    #[inline]
    pub fn structure(&self) -> Structure {
        self.0.structure
    }

    #[inline]
    pub fn parents(&self) -> &[Concept] {
        &self.0.parents
    }

    #[inline]
    pub fn base_properties(&self) -> &[(PropertyId, PropertyValue)] {
        &self.0.properties
    }

    /// The property as defined on this concept alone, or `None` if it does not define it.
    pub fn base_property(&self, property: PropertyId) -> Option<&PropertyValue> {
        self.0
            .properties
            .iter()
            .find(|(id, _)| *id == property)
            .map(|(_, value)| value)
    }

    /// `self` followed by the depth-first, parent-before-sibling traversal of the parents.
    /// Duplicates are kept.
    pub fn ancestors(&self) -> Vec<Concept> {
        std::iter::once(self.clone())
            .chain(self.proper_ancestors().iter().cloned())
            .collect()
    }

    /// The traversal of [`Concept::ancestors`] without `self`. Memoized per descriptor.
    pub fn proper_ancestors(&self) -> Arc<[Concept]> {
        self.0
            .ancestors
            .get_or_init(|| {
                self.parents()
                    .iter()
                    .flat_map(|parent| parent.ancestors())
                    .collect()
            })
            .clone()
    }

    /// Ancestors with duplicates removed, first occurrence kept.
    pub fn unique_ancestors(&self) -> Vec<Concept> {
        unique_in(self.ancestors())
    }

    /// Values of the property across all ancestors, deduplicated.
    pub fn multi_property(&self, property: PropertyId) -> Vec<PropertyValue> {
        let values = self
            .ancestors()
            .iter()
            .filter_map(|ancestor| ancestor.base_property(property).cloned())
            .collect_vec();
        unique_in(values)
    }

    /// The unique value of the property across all ancestors.
    pub fn property(&self, property: PropertyId) -> Result<PropertyValue, ConceptError> {
        let mut values = self.multi_property(property);
        match values.len() {
            1 => Ok(values.remove(0)),
            0 => Err(ConceptError::MissingProperty {
                concept: self.clone(),
                property,
            }),
            count => Err(ConceptError::AmbiguousProperty {
                concept: self.clone(),
                property,
                count,
            }),
        }
    }

    fn property_kind_error(&self, property: PropertyId, expected: &'static str) -> ConceptError {
        ConceptError::PropertyKind {
            concept: self.clone(),
            property,
            expected,
        }
    }

    fn count_property(&self, property: PropertyId) -> Result<usize, ConceptError> {
        self.property(property)?
            .as_count()
            .ok_or_else(|| self.property_kind_error(property, "count"))
    }

    fn concept_property(&self, property: PropertyId) -> Result<Concept, ConceptError> {
        match self.property(property)? {
            PropertyValue::Concept(concept) => Ok(concept),
            _ => Err(self.property_kind_error(property, "concept")),
        }
    }

    fn typle_property(&self, property: PropertyId) -> Result<Arc<[Concept]>, ConceptError> {
        match self.property(property)? {
            PropertyValue::Typle(typle) => Ok(typle),
            _ => Err(self.property_kind_error(property, "typle")),
        }
    }

    #[inline]
    pub fn dimension(&self) -> Result<usize, ConceptError> {
        self.count_property(PropertyId::Dimension)
    }

    #[inline]
    pub fn degree(&self) -> Result<usize, ConceptError> {
        self.count_property(PropertyId::Degree)
    }

    #[inline]
    pub fn field(&self) -> Result<Concept, ConceptError> {
        self.concept_property(PropertyId::Field)
    }

    #[inline]
    pub fn basis(&self) -> Result<Concept, ConceptError> {
        self.concept_property(PropertyId::Basis)
    }

    #[inline]
    pub fn factor(&self) -> Result<Concept, ConceptError> {
        self.concept_property(PropertyId::Factor)
    }

    #[inline]
    pub fn factor_typle(&self) -> Result<Arc<[Concept]>, ConceptError> {
        self.typle_property(PropertyId::FactorTyple)
    }

    #[inline]
    pub fn summand_typle(&self) -> Result<Arc<[Concept]>, ConceptError> {
        self.typle_property(PropertyId::SummandTyple)
    }

    /// The formal dual. Fields are self-dual; every other structure dualizes its parents and
    /// properties, so taking the dual twice gives back an equal descriptor.
    pub fn dual(&self) -> Concept {
        match self.structure() {
            Structure::Field => self.clone(),
            structure => Concept::new(
                structure,
                self.parents().iter().map(Concept::dual),
                self.base_properties()
                    .iter()
                    .map(|(id, value)| (*id, value.dual())),
            ),
        }
    }

    /// Returns `true` if `other` is the dual of `self`, i.e. the two can be contracted.
    #[inline]
    pub fn is_dual_of(&self, other: &Concept) -> bool {
        self.dual() == *other
    }
}

impl PartialEq for Concept {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.structure == other.0.structure
                && self.0.properties == other.0.properties
                && self.0.parents == other.0.parents)
    }
}

impl Eq for Concept {}

impl Hash for Concept {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.structure.hash(state);
        self.0.parents.hash(state);
        self.0.properties.hash(state);
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parents = self.parents().iter().map(|parent| parent.to_string());
        let properties = self
            .base_properties()
            .iter()
            .map(|(_, value)| value.to_string());
        write!(
            f,
            "{}<{}>",
            self.structure(),
            parents.chain(properties).format(", ")
        )
    }
}

impl fmt::Debug for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Concept({self})")
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, Concept>>> = LazyLock::new(Default::default);

/// Returns the descriptor registered for type `C`, building and registering it on first use.
pub fn memoized<C: ?Sized + 'static>(build: impl FnOnce() -> Concept) -> Concept {
    let id = TypeId::of::<C>();
    if let Some(concept) = REGISTRY.read().expect("failed to lock").get(&id) {
        return concept.clone();
    }

    // building may register other concepts: the lock must not be held here
    let concept = build();
    log::trace!("register concept {concept}");
    REGISTRY
        .write()
        .expect("failed to lock")
        .entry(id)
        .or_insert(concept)
        .clone()
}

/// Implemented by every concept type.
pub trait ConceptType: DualOf + 'static {
    /// Builds the descriptor of this type. Use [`ConceptType::concept`] instead, which is memoized.
    fn build_concept() -> Concept;

    #[inline]
    fn concept() -> Concept {
        memoized::<Self>(Self::build_concept)
    }
}

/// A predicate over concepts that identifies one structural interpretation.
pub trait ConceptualStructure {
    const NAME: &'static str;

    fn is(concept: &Concept) -> bool;

    /// Returns `true` if exactly one unique ancestor of `concept` satisfies the predicate.
    fn has_unique(concept: &Concept) -> bool {
        concept
            .unique_ancestors()
            .iter()
            .filter(|ancestor| Self::is(ancestor))
            .count()
            == 1
    }

    /// The one ancestor of `concept` satisfying the predicate.
    fn unique_of(concept: &Concept) -> Result<Concept, ConceptError> {
        let mut matches = concept
            .unique_ancestors()
            .into_iter()
            .filter(|ancestor| Self::is(ancestor))
            .collect_vec();
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(ConceptError::MissingStructure {
                concept: concept.clone(),
                structure: Self::NAME,
            }),
            count => Err(ConceptError::AmbiguousStructure {
                concept: concept.clone(),
                structure: Self::NAME,
                count,
            }),
        }
    }
}

/// Defines a [`ConceptualStructure`] predicate matching one or more [`Structure`]s.
///
/// ```
/// use tenh::{define_conceptual_structure, loom::concept::ConceptualStructure};
///
/// define_conceptual_structure!(IsAnyPower => SymmetricPower | ExteriorPower);
/// assert_eq!(IsAnyPower::NAME, "IsAnyPower");
/// ```
#[macro_export]
macro_rules! define_conceptual_structure {
    ($(#[$meta:meta])* $name:ident => $($structure:ident)|+) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name;

        impl $crate::loom::concept::ConceptualStructure for $name {
            const NAME: &'static str = stringify!($name);

            #[inline]
            fn is(concept: &$crate::loom::concept::Concept) -> bool {
                matches!(
                    concept.structure(),
                    $($crate::loom::concept::Structure::$structure)|+
                )
            }
        }
    };
}

define_conceptual_structure!(IsField => Field);
define_conceptual_structure!(IsVectorSpace => VectorSpace);
define_conceptual_structure!(IsBasis => Basis);
define_conceptual_structure!(IsOrthonormalBasis => OrthonormalBasis);
define_conceptual_structure!(IsBasedVectorSpace => BasedVectorSpace);
define_conceptual_structure!(IsTensorProduct => TensorProduct);
define_conceptual_structure!(IsTensorProductOfBasedVectorSpaces => TensorProductOfBasedVectorSpaces);
define_conceptual_structure!(IsDirectSum => DirectSum);
define_conceptual_structure!(IsDirectSumOfBasedVectorSpaces => DirectSumOfBasedVectorSpaces);
define_conceptual_structure!(IsSymmetricPower => SymmetricPower);
define_conceptual_structure!(IsSymmetricPowerOfBasedVectorSpace => SymmetricPowerOfBasedVectorSpace);
define_conceptual_structure!(IsExteriorPower => ExteriorPower);
define_conceptual_structure!(IsExteriorPowerOfBasedVectorSpace => ExteriorPowerOfBasedVectorSpace);
define_conceptual_structure!(
    /// Symmetric or exterior power of a based vector space.
    IsPowerOfBasedVectorSpace => SymmetricPowerOfBasedVectorSpace | ExteriorPowerOfBasedVectorSpace
);
