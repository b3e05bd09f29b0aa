//! Abstract indices, component indices and the row-major multi-index counter.

use std::{fmt, sync::Arc};

use casey::snake;
use derive_more::{Deref, Display, From, Into};
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::concept::Concept;

/// Maximal number of free (or summed) indices of one expression node.
pub const MAX_RANK: usize = 16;

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("component index {value} out of range for {count} components")]
    OutOfRange { value: usize, count: usize },
    #[error("rank {0} exceeds the maximal rank {max}", max = MAX_RANK)]
    RankTooLarge(usize),
    #[error("index map domain {domain} and codomain {codomain} differ in length")]
    MapLength { domain: IndexList, codomain: IndexList },
    #[error("index {index} is repeated in {list}")]
    Repeated { index: AbstractIndex, list: IndexList },
}

/// Whether a range check is performed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CheckRange {
    #[default]
    True,
    False,
}

/// Whether a raw pointer is checked for null and alignment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CheckPointer {
    #[default]
    True,
    False,
}

/// A symbol used to write index expressions, e.g. the `i` of `v(i) * w(i)`.
///
/// Indices built from characters print as the character; synthetic indices produced by
/// reindexing print as `i_N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AbstractIndex(u32);

impl AbstractIndex {
    #[inline]
    pub const fn new(symbol: char) -> Self {
        Self(symbol as u32)
    }

    #[inline]
    pub const fn from_symbol(symbol: u32) -> Self {
        Self(symbol)
    }

    #[inline]
    pub const fn symbol(self) -> u32 {
        self.0
    }

    /// The index shifted by `offset`, or `None` if the symbol overflows.
    #[inline]
    pub const fn checked_offset(self, offset: u32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(symbol) => Some(Self(symbol)),
            None => None,
        }
    }
}

impl From<char> for AbstractIndex {
    #[inline]
    fn from(value: char) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for AbstractIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0) {
            Some(c) if c.is_ascii_alphanumeric() => write!(f, "{c}"),
            _ => write!(f, "i_{}", self.0),
        }
    }
}

/// An ordered list of abstract indices, as written on one indexed object.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deref, From, Into, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("({})", _0.iter().format(", "))]
pub struct IndexList(Arc<[AbstractIndex]>);

impl From<Vec<AbstractIndex>> for IndexList {
    #[inline]
    fn from(value: Vec<AbstractIndex>) -> Self {
        Self(value.into())
    }
}

impl From<&[AbstractIndex]> for IndexList {
    #[inline]
    fn from(value: &[AbstractIndex]) -> Self {
        Self(value.into())
    }
}

impl<const N: usize> From<[AbstractIndex; N]> for IndexList {
    #[inline]
    fn from(value: [AbstractIndex; N]) -> Self {
        Self(value.into())
    }
}

impl<const N: usize> From<[char; N]> for IndexList {
    #[inline]
    fn from(value: [char; N]) -> Self {
        value.into_iter().map(AbstractIndex::new).collect()
    }
}

impl From<&str> for IndexList {
    #[inline]
    fn from(value: &str) -> Self {
        value.chars().map(AbstractIndex::new).collect()
    }
}

impl FromIterator<AbstractIndex> for IndexList {
    fn from_iter<I: IntoIterator<Item = AbstractIndex>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<AbstractIndex> for IndexList {
    #[inline]
    fn from(value: AbstractIndex) -> Self {
        Self([value].into())
    }
}

impl From<char> for IndexList {
    #[inline]
    fn from(value: char) -> Self {
        Self([AbstractIndex::new(value)].into())
    }
}

macro_rules! impl_index_list_from {
    ($($t:ident),+) => {
        impl<$($t),+> From<($($t),+)> for IndexList
        where
            $($t: Into<AbstractIndex>),+
        {
            #[inline]
            fn from(($(snake!($t)),+): ($($t),+)) -> Self {
                Self([$(snake!($t).into()),+].into())
            }
        }
    };
}

impl_index_list_from!(T0, T1);
impl_index_list_from!(T0, T1, T2);
impl_index_list_from!(T0, T1, T2, T3);
impl_index_list_from!(T0, T1, T2, T3, T4);
impl_index_list_from!(T0, T1, T2, T3, T4, T5);
impl_index_list_from!(T0, T1, T2, T3, T4, T5, T6);
impl_index_list_from!(T0, T1, T2, T3, T4, T5, T6, T7);

impl IndexList {
    /// Position of the first occurrence of `index`.
    #[inline]
    pub fn position(&self, index: AbstractIndex) -> Option<usize> {
        self.iter().position(|&other| other == index)
    }

    /// The first index occurring more than once, if any.
    pub fn first_repeated(&self) -> Option<AbstractIndex> {
        self.iter().duplicates().next().copied()
    }

    /// The largest symbol in the list.
    #[inline]
    pub fn max_symbol(&self) -> Option<u32> {
        self.iter().map(|index| index.symbol()).max()
    }
}

/// An abstract index bound to the factor it ranges over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimIndex {
    pub index: AbstractIndex,
    pub factor: Concept,
    pub dim: usize,
}

impl DimIndex {
    #[inline]
    pub fn new(index: AbstractIndex, factor: Concept, dim: usize) -> Self {
        Self { index, factor, dim }
    }

    /// The same binding under another symbol.
    #[inline]
    pub fn renamed(&self, index: AbstractIndex) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }
}

impl fmt::Display for DimIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.dim)
    }
}

/// A flat index into an array of `count` components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentIndex {
    value: usize,
    count: usize,
}

impl ComponentIndex {
    /// Creates the index, failing if `value >= count` unless `check` is [`CheckRange::False`].
    #[inline]
    pub fn new(value: usize, count: usize, check: CheckRange) -> Result<Self, IndexError> {
        if check == CheckRange::True && value >= count {
            return Err(IndexError::OutOfRange { value, count });
        }
        Ok(Self { value, count })
    }

    /// An index known to be in range.
    #[inline]
    pub(crate) const fn at(value: usize, count: usize) -> Self {
        Self { value, count }
    }

    /// The first index of an array of `count` components.
    #[inline]
    pub const fn start(count: usize) -> Self {
        Self { value: 0, count }
    }

    #[inline]
    pub fn increment(&mut self) {
        self.value += 1;
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.value >= self.count
    }

    #[inline]
    pub const fn value(&self) -> usize {
        self.value
    }

    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }
}

impl fmt::Display for ComponentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.count)
    }
}

/// Row-major flat index of `values` in a box of extents `dims`.
#[inline]
pub fn flatten(values: &[usize], dims: &[usize]) -> usize {
    values
        .iter()
        .zip(dims)
        .fold(0, |flat, (&value, &dim)| flat * dim + value)
}

/// Inverse of [`flatten`]: writes the multi-index of `flat` into `values`.
#[inline]
pub fn unflatten(mut flat: usize, dims: &[usize], values: &mut [usize]) {
    for (value, &dim) in values.iter_mut().zip(dims).rev() {
        *value = flat % dim;
        flat /= dim;
    }
}

/// A row-major counter over the box of extents `dims`, the last index running fastest.
///
/// Rank zero yields one (empty) multi-index; any zero extent yields none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiIndex {
    dims: [usize; MAX_RANK],
    values: [usize; MAX_RANK],
    rank: usize,
    done: bool,
}

impl MultiIndex {
    pub fn new(dims: &[usize]) -> Result<Self, IndexError> {
        let rank = dims.len();
        if rank > MAX_RANK {
            return Err(IndexError::RankTooLarge(rank));
        }
        let mut extents = [0; MAX_RANK];
        extents[..rank].copy_from_slice(dims);
        Ok(Self {
            dims: extents,
            values: [0; MAX_RANK],
            rank,
            done: dims.contains(&0),
        })
    }

    /// Rewinds the counter to its first value.
    #[inline]
    pub fn reset(&mut self) {
        self.values = [0; MAX_RANK];
        self.done = self.dims[..self.rank].contains(&0);
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.rank]
    }

    #[inline]
    pub fn values(&self) -> &[usize] {
        &self.values[..self.rank]
    }

    /// Number of multi-indices in the box.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims().iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.done
    }

    /// Row-major flat index of the current value.
    #[inline]
    pub fn flat(&self) -> usize {
        flatten(self.values(), self.dims())
    }

    pub fn increment(&mut self) {
        for axis in (0..self.rank).rev() {
            self.values[axis] += 1;
            if self.values[axis] < self.dims[axis] {
                return;
            }
            self.values[axis] = 0;
        }
        self.done = true;
    }
}

/// A renaming of abstract indices: `domain[k]` maps to `codomain[k]`.
///
/// Indices outside the domain are offset by one past the largest codomain symbol so they
/// never collide with a renamed index. If the domain equals the codomain the map is the
/// identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    domain: IndexList,
    codomain: IndexList,
    offset: Option<u32>,
}

impl IndexMap {
    pub fn new(
        domain: impl Into<IndexList>,
        codomain: impl Into<IndexList>,
    ) -> Result<Self, IndexError> {
        let domain: IndexList = domain.into();
        let codomain: IndexList = codomain.into();
        if domain.len() != codomain.len() {
            return Err(IndexError::MapLength { domain, codomain });
        }
        for list in [&domain, &codomain] {
            if let Some(index) = list.first_repeated() {
                return Err(IndexError::Repeated {
                    index,
                    list: list.clone(),
                });
            }
        }
        let offset = codomain
            .max_symbol()
            .map_or(Some(0), |max| max.checked_add(1));
        Ok(Self {
            domain,
            codomain,
            offset,
        })
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.domain == self.codomain
    }

    #[inline]
    pub fn domain(&self) -> &IndexList {
        &self.domain
    }

    #[inline]
    pub fn codomain(&self) -> &IndexList {
        &self.codomain
    }

    /// The image of `index`, or `None` if offsetting it overflows the symbol space.
    pub fn apply(&self, index: AbstractIndex) -> Option<AbstractIndex> {
        if self.is_identity() {
            return Some(index);
        }
        match self.domain.position(index) {
            Some(position) => Some(self.codomain[position]),
            None => index.checked_offset(self.offset?),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{
        AbstractIndex, CheckRange, ComponentIndex, IndexError, IndexList, IndexMap, MAX_RANK,
        MultiIndex, flatten, unflatten,
    };

    #[test]
    fn test_component_index_range() -> Result<(), Box<dyn Error>> {
        let err = ComponentIndex::new(10, 5, CheckRange::True).unwrap_err();
        assert!(matches!(err, IndexError::OutOfRange { value: 10, count: 5 }));

        let index = ComponentIndex::new(10, 5, CheckRange::False)?;
        assert_eq!(index.value(), 10);
        assert!(index.is_at_end());

        let mut index = ComponentIndex::start(2);
        let mut visited = 0;
        while !index.is_at_end() {
            visited += 1;
            index.increment();
        }
        assert_eq!(visited, 2);
        Ok(())
    }

    #[test]
    fn test_index_list() {
        let i = AbstractIndex::new('i');
        let j = AbstractIndex::new('j');

        let list = IndexList::from(('i', 'j', 'i'));
        assert_eq!(&list[..], &[i, j, i]);
        assert_eq!(list.first_repeated(), Some(i));
        assert_eq!(list.to_string(), "(i, j, i)");
        assert_eq!(IndexList::from('i'), IndexList::from("i"));
        assert_eq!(IndexList::from(['i', 'j']), IndexList::from("ij"));
        assert_eq!(IndexList::from("ij").position(j), Some(1));
        assert_eq!(AbstractIndex::from_symbol(1000).to_string(), "i_1000");
    }

    #[test]
    fn test_multi_index() -> Result<(), Box<dyn Error>> {
        let mut index = MultiIndex::new(&[2, 3])?;
        let mut visited = vec![];
        while !index.is_at_end() {
            visited.push((index.values().to_vec(), index.flat()));
            index.increment();
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(visited[1], (vec![0, 1], 1));
        assert_eq!(visited[3], (vec![1, 0], 3));

        index.reset();
        assert!(!index.is_at_end());
        assert_eq!(index.values(), &[0, 0]);

        // rank zero iterates once, a zero extent never
        let mut scalar = MultiIndex::new(&[])?;
        assert!(!scalar.is_at_end());
        scalar.increment();
        assert!(scalar.is_at_end());
        assert!(MultiIndex::new(&[3, 0])?.is_at_end());

        assert!(MultiIndex::new(&[1; MAX_RANK + 1]).is_err());
        Ok(())
    }

    #[test]
    fn test_flatten() {
        let dims = [3, 4, 5];
        let mut values = [0; 3];
        for flat in 0..60 {
            unflatten(flat, &dims, &mut values);
            assert_eq!(flatten(&values, &dims), flat);
        }
        unflatten(23, &dims, &mut values);
        assert_eq!(values, [1, 0, 3]);
    }

    #[test]
    fn test_index_map() -> Result<(), Box<dyn Error>> {
        let map = IndexMap::new("ij", "jk")?;
        let [i, j, k, l] = ['i', 'j', 'k', 'l'].map(AbstractIndex::new);
        assert_eq!(map.apply(i), Some(j));
        assert_eq!(map.apply(j), Some(k));
        // unmapped symbols move past the codomain
        assert_eq!(map.apply(l), Some(AbstractIndex::from_symbol('l' as u32 + 'k' as u32 + 1)));

        let identity = IndexMap::new("ij", "ij")?;
        assert!(identity.is_identity());
        assert_eq!(identity.apply(l), Some(l));

        let overflow = IndexMap::new([AbstractIndex::new('a')], [AbstractIndex::from_symbol(u32::MAX)])?;
        assert_eq!(overflow.apply(l), None);

        assert!(matches!(IndexMap::new("ij", "k"), Err(IndexError::MapLength { .. })));
        assert!(matches!(IndexMap::new("ii", "jk"), Err(IndexError::Repeated { .. })));
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Box<dyn Error>> {
        let list = IndexList::from("ij");
        let json = serde_json::to_string(&list)?;
        assert_eq!(json, format!("[{},{}]", 'i' as u32, 'j' as u32));
        assert_eq!(serde_json::from_str::<IndexList>(&json)?, list);

        let index = ComponentIndex::new(3, 9, CheckRange::True)?;
        let json = serde_json::to_string(&index)?;
        assert_eq!(serde_json::from_str::<ComponentIndex>(&json)?, index);
        Ok(())
    }
}
