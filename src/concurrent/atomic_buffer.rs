/*
 * Copyright 2020 UT OVERSEAS INC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::fmt::{Debug, Error, Formatter};
use std::marker::PhantomData;
use std::mem::size_of;

use crate::concurrent::atomics::CasResult;
use crate::concurrent::location::Location;
use crate::concurrent::ordering::Ordering;
use crate::concurrent::word::AtomicWord;
use crate::utils::bit_utils::{alloc_buffer_aligned, dealloc_buffer_aligned, is_aligned};
use crate::utils::errors::AtomicsError;
use crate::utils::types::Index;

// Buffer allocated on cache-aligned memory boundaries. This struct owns the memory it is pointing to
pub struct AlignedBuffer {
    ptr: *mut u8,
    len: Index,
}

impl AlignedBuffer {
    pub fn with_capacity(len: Index) -> AlignedBuffer {
        assert!(len > 0, "AlignedBuffer needs a positive length, got {}", len);
        AlignedBuffer {
            ptr: alloc_buffer_aligned(len),
            len,
        }
    }

    pub fn capacity(&self) -> Index {
        self.len
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        dealloc_buffer_aligned(self.ptr, self.len)
    }
}

// The memory is only reachable through AtomicBuffer, whose accessors are all atomic.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

// Wraps but does not own a region of shared memory
#[derive(Copy, Clone)]
pub struct AtomicBuffer<'a> {
    ptr: *mut u8,
    len: Index,
    _memory: PhantomData<&'a [u8]>,
}

unsafe impl<'a> Send for AtomicBuffer<'a> {}
unsafe impl<'a> Sync for AtomicBuffer<'a> {}

impl<'a> Debug for AtomicBuffer<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "AtomicBuffer {{ ptr: {:p}, len: {} }}", self.ptr, self.len)
    }
}

impl<'a> AtomicBuffer<'a> {
    pub fn from_aligned(aligned: &'a AlignedBuffer) -> AtomicBuffer<'a> {
        AtomicBuffer {
            ptr: aligned.ptr,
            len: aligned.len,
            _memory: PhantomData,
        }
    }

    /// Wraps a byte slice. Atomic accessors still require naturally aligned offsets relative to
    /// the absolute address, which `location` checks.
    pub fn wrap_slice(slice: &'a mut [u8]) -> AtomicBuffer<'a> {
        AtomicBuffer {
            ptr: slice.as_mut_ptr(),
            len: slice.len() as Index,
            _memory: PhantomData,
        }
    }

    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` bytes for `'a` (e.g. a shared memory
    /// mapping), and all concurrent accesses to that memory must be atomic.
    pub unsafe fn new(ptr: *mut u8, len: Index) -> AtomicBuffer<'a> {
        AtomicBuffer {
            ptr,
            len,
            _memory: PhantomData,
        }
    }

    // Create a view on the contents of the buffer
    pub fn view(&self, offset: Index, len: Index) -> Result<Self, AtomicsError> {
        self.check_bounds(offset, len)?;
        Ok(AtomicBuffer {
            ptr: unsafe { self.ptr.offset(offset) },
            len,
            _memory: PhantomData,
        })
    }

    pub const fn capacity(&self) -> Index {
        self.len
    }

    #[inline]
    pub fn buffer(&self) -> *mut u8 {
        self.ptr
    }

    #[inline]
    fn check_bounds(&self, offset: Index, len: Index) -> Result<(), AtomicsError> {
        if offset < 0 || len < 0 || offset.checked_add(len).map_or(true, |end| end > self.len) {
            return Err(AtomicsError::OutOfBounds {
                offset,
                len,
                capacity: self.len,
            });
        }
        Ok(())
    }

    /// Typed location at `offset`, checked for bounds and natural alignment.
    pub fn location<T: AtomicWord>(&self, offset: Index) -> Result<Location<'a, T>, AtomicsError> {
        self.check_range::<T>(offset, size_of::<T>() as Index)?;
        Ok(unsafe { Location::from_ptr(self.ptr.offset(offset) as *const T) })
    }

    #[inline]
    fn location_or_panic<T: AtomicWord>(&self, offset: Index) -> Location<'a, T> {
        match self.location(offset) {
            Ok(location) => location,
            Err(err) => panic!("{}", err),
        }
    }

    #[inline]
    pub fn load<T: AtomicWord>(&self, offset: Index, ordering: Ordering) -> T {
        self.location_or_panic::<T>(offset).load(ordering)
    }

    #[inline]
    pub fn store<T: AtomicWord>(&self, offset: Index, value: T, ordering: Ordering) {
        self.location_or_panic::<T>(offset).store(value, ordering)
    }

    #[inline]
    pub fn compare_and_swap<T: AtomicWord>(&self, offset: Index, expected: T, desired: T, ordering: Ordering) -> CasResult<T> {
        self.location_or_panic::<T>(offset)
            .compare_and_swap(expected, desired, ordering)
    }

    /**
     * Multi threaded increment.
     *
     * @param offset in the buffer of the word.
     * @param delta  for to be applied to the value.
     * @return the value before applying the delta.
     */
    #[inline]
    pub fn get_and_add<T: AtomicWord>(&self, offset: Index, delta: T, ordering: Ordering) -> T {
        self.location_or_panic::<T>(offset).fetch_add(delta, ordering)
    }

    #[inline]
    pub fn get_and_set<T: AtomicWord>(&self, offset: Index, value: T, ordering: Ordering) -> T {
        self.location_or_panic::<T>(offset).swap(value, ordering)
    }

    /// Stores `value` into every `T`-sized word of `[offset, offset + len)`, one atomic store each.
    /// The whole range is checked before the first store; a bad range panics with nothing written.
    pub fn set_memory<T: AtomicWord>(&self, offset: Index, len: Index, value: T, ordering: Ordering) {
        if let Err(err) = self.check_range::<T>(offset, len) {
            panic!("{}", err);
        }

        let width = size_of::<T>() as Index;
        for word in 0..len / width {
            self.store(offset + word * width, value, ordering);
        }
    }

    fn check_range<T: AtomicWord>(&self, offset: Index, len: Index) -> Result<(), AtomicsError> {
        self.check_bounds(offset, len)?;

        let width = size_of::<T>() as Index;
        let start = unsafe { self.ptr.offset(offset) };
        if !is_aligned(start as usize, width as usize) {
            return Err(AtomicsError::Misaligned {
                offset,
                alignment: width,
            });
        }
        Ok(())
    }
}
