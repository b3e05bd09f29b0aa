//! Flat component storage behind tensor values.
//!
//! An [`Array`] hands out components by [`ComponentIndex`] and reports the memory it reads
//! from, which is what aliasing detection compares. There are three kinds of storage:
//! - [`MemberArray`] owns its components;
//! - [`PreallocatedArray`] and [`ConstPreallocatedArray`] view memory owned elsewhere;
//! - [`ProceduralArray`] computes each component from its index and has no memory at all.

use std::{fmt, marker::PhantomData, ptr};

use bytemuck::Pod;
use derive_more::Display;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    index::{CheckPointer, CheckRange, ComponentIndex, IndexError},
    num::{One, Zero},
};

#[derive(Debug, Clone, Error)]
pub enum ArrayError {
    #[error("array pointer is null")]
    NullPointer,
    #[error("array pointer {address:#x} is not aligned to {align} bytes")]
    Misaligned { address: usize, align: usize },
    #[error("array of {expected} components cannot be built on {actual} elements")]
    Length { expected: usize, actual: usize },
    #[error("copy of {count} components from offset {src_offset} (of {src_count}) to offset {dst_offset} (of {dst_count}) is out of range")]
    CopyRange {
        src_offset: usize,
        src_count: usize,
        dst_offset: usize,
        dst_count: usize,
        count: usize,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Qualifier {
    /// Components are computed on access; there is no storage.
    Procedural,
    /// Components live in memory that is only read.
    ConstMemory,
    /// Components live in memory that can be written.
    NonconstMemory,
}

/// A half-open byte range `[start, end)` of memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    start: usize,
    end: usize,
}

impl MemoryRange {
    /// The range covered by `count` values of `T` starting at `ptr`.
    #[inline]
    pub fn of<T>(ptr: *const T, count: usize) -> Self {
        if ptr.is_null() {
            return Self::default();
        }
        let start = ptr as usize;
        Self {
            start,
            end: start.saturating_add(count.saturating_mul(size_of::<T>())),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if the two ranges share at least one byte.
    #[inline]
    pub fn overlaps(&self, other: &MemoryRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// Read access to a flat array of components.
pub trait Array<T: Copy> {
    const QUALIFIER: Qualifier;

    fn count(&self) -> usize;

    /// The component at flat position `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    fn get(&self, index: usize) -> T;

    /// The component at `index`.
    ///
    /// # Panics
    /// Panics if the index is out of range, or, in `strict` mode, if it was built for an array
    /// of a different size.
    #[inline]
    fn component(&self, index: ComponentIndex) -> T {
        #[cfg(feature = "strict")]
        assert_eq!(
            index.count(),
            self.count(),
            "component index {index} addresses an array of {} components",
            self.count()
        );
        self.get(index.value())
    }

    /// Start of the backing memory; null for procedural arrays.
    fn pointer_to_allocation(&self) -> *const T;

    #[inline]
    fn allocation_size_in_bytes(&self) -> usize {
        self.memory_range().len()
    }

    #[inline]
    fn memory_range(&self) -> MemoryRange {
        MemoryRange::of(self.pointer_to_allocation(), self.count())
    }
}

/// Write access to a flat array of components.
pub trait ArrayMut<T: Copy>: Array<T> {
    /// Writes the component at flat position `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    fn put(&mut self, index: usize, value: T);

    #[inline]
    fn set(&mut self, index: ComponentIndex, value: T) {
        #[cfg(feature = "strict")]
        assert_eq!(
            index.count(),
            self.count(),
            "component index {index} addresses an array of {} components",
            self.count()
        );
        self.put(index.value(), value);
    }
}

/// Copies `count` components from `src[src_offset..]` to `dst[dst_offset..]`.
pub fn copy_components<T: Copy>(
    src: &impl Array<T>,
    dst: &mut impl ArrayMut<T>,
    src_offset: usize,
    dst_offset: usize,
    count: usize,
    check: CheckRange,
) -> Result<(), ArrayError> {
    let (src_count, dst_count) = (src.count(), dst.count());
    let out_of_range = |offset: usize, total: usize| {
        offset.checked_add(count).is_none_or(|end| end > total)
    };
    if check == CheckRange::True
        && (out_of_range(src_offset, src_count) || out_of_range(dst_offset, dst_count))
    {
        return Err(ArrayError::CopyRange {
            src_offset,
            src_count,
            dst_offset,
            dst_count,
            count,
        });
    }
    for k in 0..count {
        dst.put(dst_offset + k, src.get(src_offset + k));
    }
    Ok(())
}

/// An array owning its components.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemberArray<T>(Box<[T]>);

impl<T: Copy> MemberArray<T> {
    #[inline]
    pub fn filled(value: T, count: usize) -> Self {
        Self(vec![value; count].into())
    }

    #[inline]
    pub fn from_fn(count: usize, f: impl FnMut(usize) -> T) -> Self {
        Self((0..count).map(f).collect())
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.0
    }
}

impl<T: Pod> MemberArray<T> {
    /// The components as raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.0)
    }
}

impl<T> From<Vec<T>> for MemberArray<T> {
    #[inline]
    fn from(value: Vec<T>) -> Self {
        Self(value.into())
    }
}

impl<T: Copy> Array<T> for MemberArray<T> {
    const QUALIFIER: Qualifier = Qualifier::NonconstMemory;

    #[inline]
    fn count(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.0[index]
    }

    #[inline]
    fn pointer_to_allocation(&self) -> *const T {
        self.0.as_ptr()
    }
}

impl<T: Copy> ArrayMut<T> for MemberArray<T> {
    #[inline]
    fn put(&mut self, index: usize, value: T) {
        self.0[index] = value;
    }
}

/// Checks a raw array pointer before it is wrapped.
fn check_pointer<T>(ptr: *const T, check: CheckPointer) -> Result<(), ArrayError> {
    if check == CheckPointer::False {
        return Ok(());
    }
    if ptr.is_null() {
        return Err(ArrayError::NullPointer);
    }
    if !ptr.is_aligned() {
        return Err(ArrayError::Misaligned {
            address: ptr as usize,
            align: align_of::<T>(),
        });
    }
    Ok(())
}

fn check_length(expected: usize, actual: usize) -> Result<(), ArrayError> {
    match expected == actual {
        true => Ok(()),
        false => Err(ArrayError::Length { expected, actual }),
    }
}

/// A writable view of memory owned elsewhere.
///
/// Several views may cover the same memory when built with [`PreallocatedArray::from_raw_parts`];
/// assignments detect the overlap before writing.
pub struct PreallocatedArray<'a, T> {
    ptr: *mut T,
    count: usize,
    phantom: PhantomData<&'a mut [T]>,
}

impl<'a, T: Copy> PreallocatedArray<'a, T> {
    /// Views `slice`, which must hold exactly `count` components.
    pub fn from_slice(slice: &'a mut [T], count: usize) -> Result<Self, ArrayError> {
        check_length(count, slice.len())?;
        Ok(Self {
            ptr: slice.as_mut_ptr(),
            count,
            phantom: PhantomData,
        })
    }

    /// Views `count` components starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `count` values of `T` for `'a`, and nothing
    /// else may access that memory while the view is used, except other views built by this
    /// function.
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        count: usize,
        check: CheckPointer,
    ) -> Result<Self, ArrayError> {
        check_pointer(ptr, check)?;
        Ok(Self {
            ptr,
            count,
            phantom: PhantomData,
        })
    }
}

impl<T> fmt::Debug for PreallocatedArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreallocatedArray")
            .field("ptr", &self.ptr)
            .field("count", &self.count)
            .finish()
    }
}

impl<T: Copy> Array<T> for PreallocatedArray<'_, T> {
    const QUALIFIER: Qualifier = Qualifier::NonconstMemory;

    #[inline]
    fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        assert!(index < self.count, "index {index} out of range for {} components", self.count);
        // SAFETY: in range of the memory the view was built on
        unsafe { ptr::read(self.ptr.add(index)) }
    }

    #[inline]
    fn pointer_to_allocation(&self) -> *const T {
        self.ptr
    }
}

impl<T: Copy> ArrayMut<T> for PreallocatedArray<'_, T> {
    #[inline]
    fn put(&mut self, index: usize, value: T) {
        assert!(index < self.count, "index {index} out of range for {} components", self.count);
        // SAFETY: in range of the memory the view was built on
        unsafe { ptr::write(self.ptr.add(index), value) }
    }
}

/// A read-only view of memory owned elsewhere.
pub struct ConstPreallocatedArray<'a, T> {
    ptr: *const T,
    count: usize,
    phantom: PhantomData<&'a [T]>,
}

impl<'a, T: Copy> ConstPreallocatedArray<'a, T> {
    /// Views `slice`, which must hold exactly `count` components.
    pub fn from_slice(slice: &'a [T], count: usize) -> Result<Self, ArrayError> {
        check_length(count, slice.len())?;
        Ok(Self {
            ptr: slice.as_ptr(),
            count,
            phantom: PhantomData,
        })
    }

    /// Views `count` components starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `count` values of `T` for `'a`.
    pub unsafe fn from_raw_parts(
        ptr: *const T,
        count: usize,
        check: CheckPointer,
    ) -> Result<Self, ArrayError> {
        check_pointer(ptr, check)?;
        Ok(Self {
            ptr,
            count,
            phantom: PhantomData,
        })
    }
}

impl<T> fmt::Debug for ConstPreallocatedArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstPreallocatedArray")
            .field("ptr", &self.ptr)
            .field("count", &self.count)
            .finish()
    }
}

impl<T: Copy> Array<T> for ConstPreallocatedArray<'_, T> {
    const QUALIFIER: Qualifier = Qualifier::ConstMemory;

    #[inline]
    fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        assert!(index < self.count, "index {index} out of range for {} components", self.count);
        // SAFETY: in range of the memory the view was built on
        unsafe { ptr::read(self.ptr.add(index)) }
    }

    #[inline]
    fn pointer_to_allocation(&self) -> *const T {
        self.ptr
    }
}

/// Computes components from their index.
pub trait ComponentGenerator<T> {
    fn generate(&self, index: ComponentIndex) -> T;
}

impl<T, F: Fn(ComponentIndex) -> T> ComponentGenerator<T> for F {
    #[inline]
    fn generate(&self, index: ComponentIndex) -> T {
        self(index)
    }
}

/// Components of the `N × N` identity matrix, row-major.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KroneckerDelta<const N: usize>;

impl<T: Zero + One, const N: usize> ComponentGenerator<T> for KroneckerDelta<N> {
    #[inline]
    fn generate(&self, index: ComponentIndex) -> T {
        let value = index.value();
        match value / N == value % N {
            true => T::one(),
            false => T::zero(),
        }
    }
}

/// Components that are all zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zeros;

impl<T: Zero> ComponentGenerator<T> for Zeros {
    #[inline]
    fn generate(&self, _index: ComponentIndex) -> T {
        T::zero()
    }
}

/// An array without storage whose components are computed by `G`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProceduralArray<T, G> {
    count: usize,
    generator: G,
    phantom: PhantomData<T>,
}

impl<T, G: ComponentGenerator<T>> ProceduralArray<T, G> {
    #[inline]
    pub fn new(count: usize, generator: G) -> Self {
        Self {
            count,
            generator,
            phantom: PhantomData,
        }
    }

    #[inline]
    pub fn generator(&self) -> &G {
        &self.generator
    }
}

impl<T: Copy, G: ComponentGenerator<T>> Array<T> for ProceduralArray<T, G> {
    const QUALIFIER: Qualifier = Qualifier::Procedural;

    #[inline]
    fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        assert!(index < self.count, "index {index} out of range for {} components", self.count);
        self.generator
            .generate(ComponentIndex::at(index, self.count))
    }

    #[inline]
    fn pointer_to_allocation(&self) -> *const T {
        ptr::null()
    }
}
