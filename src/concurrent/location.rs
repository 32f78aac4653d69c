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

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::concurrent::atomics::CasResult;
use crate::concurrent::ordering::Ordering;
use crate::concurrent::word::AtomicWord;

/// A borrowed memory location. The memory stays owned by the caller; this only
/// remembers where it is for `'a`.
pub struct Location<'a, T: AtomicWord> {
    cell: &'a T::Atomic,
}

impl<'a, T: AtomicWord> Clone for Location<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: AtomicWord> Copy for Location<'a, T> {}

impl<'a, T: AtomicWord> Debug for Location<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Location({:p}, {:?})", self.as_ptr(), self.load(Ordering::Relaxed))
    }
}

impl<'a, T: AtomicWord> Location<'a, T> {
    /// Wraps caller-owned atomic storage. The borrow guarantees alignment and validity.
    #[inline]
    pub fn new(cell: &'a T::Atomic) -> Self {
        Self { cell }
    }

    /// # Safety
    /// `ptr` must be non-null, aligned to `size_of::<T>()` and valid for reads and writes for
    /// `'a`, and every concurrent access to it must go through atomic operations.
    #[inline]
    pub unsafe fn from_ptr(ptr: *const T) -> Self {
        Self {
            cell: T::atomic_ref(ptr),
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.cell as *const T::Atomic as *mut T
    }

    #[inline]
    pub fn load(&self, ordering: Ordering) -> T {
        T::atomic_load(self.cell, ordering.for_load())
    }

    #[inline]
    pub fn store(&self, value: T, ordering: Ordering) {
        T::atomic_store(self.cell, value, ordering.for_store())
    }

    /// Writes `desired` iff the current value equals `expected`. Always reports the value
    /// observed by the attempt.
    #[inline]
    pub fn compare_and_swap(&self, expected: T, desired: T, ordering: Ordering) -> CasResult<T> {
        match T::atomic_compare_exchange(
            self.cell,
            expected,
            desired,
            ordering.for_rmw(),
            ordering.for_cas_failure(),
        ) {
            Ok(observed) => CasResult {
                success: true,
                observed,
            },
            Err(observed) => CasResult {
                success: false,
                observed,
            },
        }
    }

    /// Wrapping add; returns the previous value.
    #[inline]
    pub fn fetch_add(&self, delta: T, ordering: Ordering) -> T {
        T::atomic_fetch_add(self.cell, delta, ordering.for_rmw())
    }

    /// Wrapping subtract; returns the previous value.
    #[inline]
    pub fn fetch_sub(&self, delta: T, ordering: Ordering) -> T {
        T::atomic_fetch_sub(self.cell, delta, ordering.for_rmw())
    }

    #[inline]
    pub fn swap(&self, value: T, ordering: Ordering) -> T {
        T::atomic_swap(self.cell, value, ordering.for_rmw())
    }

    #[inline]
    pub fn fetch_or(&self, bits: T, ordering: Ordering) -> T {
        T::atomic_fetch_or(self.cell, bits, ordering.for_rmw())
    }

    #[inline]
    pub fn fetch_and(&self, bits: T, ordering: Ordering) -> T {
        T::atomic_fetch_and(self.cell, bits, ordering.for_rmw())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, AtomicU64};

    use super::*;

    #[test]
    fn that_location_reads_caller_storage() {
        let cell = AtomicI32::new(7);
        let loc = Location::<i32>::new(&cell);

        assert_eq!(loc.load(Ordering::Acquire), 7);
        loc.store(-3, Ordering::Release);
        assert_eq!(cell.load(std::sync::atomic::Ordering::SeqCst), -3);
    }

    #[test]
    fn that_cas_reports_observed_value() {
        let cell = AtomicU64::new(5);
        let loc = Location::<u64>::new(&cell);

        let miss = loc.compare_and_swap(4, 9, Ordering::AcqRel);
        assert!(!miss.success);
        assert_eq!(miss.observed, 5);

        let hit = loc.compare_and_swap(5, 9, Ordering::AcqRel);
        assert!(hit.success);
        assert_eq!(hit.observed, 5);
        assert_eq!(loc.load(Ordering::Relaxed), 9);
    }

    #[test]
    fn that_arithmetic_wraps() {
        let cell = AtomicI32::new(i32::max_value());
        let loc = Location::<i32>::new(&cell);

        assert_eq!(loc.fetch_add(1, Ordering::SeqCst), i32::max_value());
        assert_eq!(loc.load(Ordering::SeqCst), i32::min_value());
        assert_eq!(loc.fetch_sub(1, Ordering::SeqCst), i32::min_value());
        assert_eq!(loc.load(Ordering::SeqCst), i32::max_value());
    }

    #[test]
    fn that_flag_bits_can_be_set_and_cleared() {
        let cell = AtomicU64::new(0);
        let loc = Location::<u64>::new(&cell);

        assert_eq!(loc.fetch_or(0b101, Ordering::Release), 0);
        assert_eq!(loc.fetch_and(!0b001, Ordering::Acquire), 0b101);
        assert_eq!(loc.swap(0, Ordering::AcqRel), 0b100);
    }

    #[test]
    fn that_from_ptr_aliases_the_same_word() {
        let word = AtomicU64::new(0);
        let ptr = &word as *const AtomicU64 as *mut u64;
        let loc = unsafe { Location::from_ptr(ptr) };

        loc.fetch_add(40, Ordering::Relaxed);
        loc.fetch_add(2, Ordering::Relaxed);
        assert_eq!(loc.as_ptr(), ptr);
        assert_eq!(word.load(std::sync::atomic::Ordering::SeqCst), 42);
    }
}
