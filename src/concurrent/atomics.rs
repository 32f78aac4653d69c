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

//! Atomic operations on raw memory locations.
//!
//! The memory is owned by the caller. Every function here shares one precondition:
//!
//! # Safety
//! `location` must be non-null, aligned to `size_of::<T>()` (natural alignment, which on some
//! 32-bit targets is stricter than `align_of::<T>()`) and valid for reads and writes for the
//! duration of the call. Every concurrent access to the location must be atomic. Alignment is
//! not checked; an unaligned location is undefined behaviour.
//!
//! The instruction sequences come from the compiler's atomic builtins for every backend; the
//! requested [`Ordering`] is strengthened where an operation cannot express it.

use std::sync::atomic::AtomicPtr;

use crate::concurrent::location::Location;
use crate::concurrent::ordering::Ordering;
use crate::concurrent::word::AtomicWord;

/// Outcome of a compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasResult<T> {
    pub success: bool,
    /// Value seen by the attempt; equals `expected` when `success` is true.
    pub observed: T,
}

impl<T> CasResult<T> {
    /// `Ok(previous)` on success, `Err(observed)` otherwise, like `compare_exchange`.
    pub fn into_result(self) -> Result<T, T> {
        if self.success {
            Ok(self.observed)
        } else {
            Err(self.observed)
        }
    }
}

#[inline]
pub unsafe fn load<T: AtomicWord>(location: *const T, ordering: Ordering) -> T {
    Location::from_ptr(location).load(ordering)
}

#[inline]
pub unsafe fn store<T: AtomicWord>(location: *mut T, value: T, ordering: Ordering) {
    Location::from_ptr(location).store(value, ordering)
}

#[inline]
pub unsafe fn compare_and_swap<T: AtomicWord>(
    location: *mut T,
    expected: T,
    desired: T,
    ordering: Ordering,
) -> CasResult<T> {
    Location::from_ptr(location).compare_and_swap(expected, desired, ordering)
}

#[inline]
pub unsafe fn fetch_add<T: AtomicWord>(location: *mut T, delta: T, ordering: Ordering) -> T {
    Location::from_ptr(location).fetch_add(delta, ordering)
}

#[inline]
pub unsafe fn fetch_sub<T: AtomicWord>(location: *mut T, delta: T, ordering: Ordering) -> T {
    Location::from_ptr(location).fetch_sub(delta, ordering)
}

#[inline]
pub unsafe fn swap<T: AtomicWord>(location: *mut T, value: T, ordering: Ordering) -> T {
    Location::from_ptr(location).swap(value, ordering)
}

#[inline]
pub unsafe fn fetch_or<T: AtomicWord>(location: *mut T, bits: T, ordering: Ordering) -> T {
    Location::from_ptr(location).fetch_or(bits, ordering)
}

#[inline]
pub unsafe fn fetch_and<T: AtomicWord>(location: *mut T, bits: T, ordering: Ordering) -> T {
    Location::from_ptr(location).fetch_and(bits, ordering)
}

#[inline(always)]
unsafe fn atomic_ptr<'a, P>(location: *const *mut P) -> &'a AtomicPtr<P> {
    &*(location as *const AtomicPtr<P>)
}

#[inline]
pub unsafe fn load_ptr<P>(location: *const *mut P, ordering: Ordering) -> *mut P {
    atomic_ptr(location).load(ordering.for_load())
}

#[inline]
pub unsafe fn store_ptr<P>(location: *mut *mut P, value: *mut P, ordering: Ordering) {
    atomic_ptr(location).store(value, ordering.for_store())
}

#[inline]
pub unsafe fn compare_and_swap_ptr<P>(
    location: *mut *mut P,
    expected: *mut P,
    desired: *mut P,
    ordering: Ordering,
) -> CasResult<*mut P> {
    match atomic_ptr(location).compare_exchange(expected, desired, ordering.for_rmw(), ordering.for_cas_failure()) {
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

#[inline]
pub unsafe fn swap_ptr<P>(location: *mut *mut P, value: *mut P, ordering: Ordering) -> *mut P {
    atomic_ptr(location).swap(value, ordering.for_rmw())
}

#[cfg(test)]
mod tests {
    use std::ptr;
    use std::sync::atomic::{AtomicI64, Ordering as CoreOrdering};

    use super::*;

    #[test]
    fn that_raw_ops_work_on_plain_words() {
        // Backed by an AtomicI64 so the word is 8-byte aligned on 32-bit targets too.
        let word = AtomicI64::new(10);
        let p = &word as *const AtomicI64 as *mut i64;

        unsafe {
            assert_eq!(fetch_add(p, 5, Ordering::SeqCst), 10);
            assert_eq!(fetch_sub(p, 20, Ordering::AcqRel), 15);
            assert_eq!(load(p, Ordering::Acquire), -5);
            assert_eq!(swap(p, 1, Ordering::Release), -5);
            store(p, 2, Ordering::Relaxed);
            assert_eq!(compare_and_swap(p, 2, 3, Ordering::SeqCst).into_result(), Ok(2));
            assert_eq!(compare_and_swap(p, 2, 4, Ordering::SeqCst).into_result(), Err(3));
            assert_eq!(fetch_or(p, 0b1000, Ordering::Relaxed), 3);
            assert_eq!(fetch_and(p, 0b1000, Ordering::Relaxed), 0b1011);
        }
        assert_eq!(word.load(CoreOrdering::SeqCst), 0b1000);
    }

    #[test]
    fn that_every_ordering_is_accepted() {
        let mut word: u32 = 0;
        let p = &mut word as *mut u32;

        for &o in Ordering::ALL.iter() {
            unsafe {
                store(p, 1, o);
                assert_eq!(load(p, o), 1);
                assert_eq!(fetch_add(p, 1, o), 1);
                assert_eq!(swap(p, 0, o), 2);
                assert!(compare_and_swap(p, 0, 0, o).success);
            }
        }
    }

    #[test]
    fn that_pointer_ops_swap_targets() {
        let mut a = 1u8;
        let mut b = 2u8;
        let pa = &mut a as *mut u8;
        let pb = &mut b as *mut u8;
        let mut slot: *mut u8 = ptr::null_mut();
        let s = &mut slot as *mut *mut u8;

        unsafe {
            assert!(load_ptr(s, Ordering::Acquire).is_null());
            store_ptr(s, pa, Ordering::Release);
            assert_eq!(load_ptr(s, Ordering::Acquire), pa);

            let miss = compare_and_swap_ptr(s, pb, pb, Ordering::SeqCst);
            assert!(!miss.success);
            assert_eq!(miss.observed, pa);

            let hit = compare_and_swap_ptr(s, pa, pb, Ordering::SeqCst);
            assert!(hit.success);

            assert_eq!(swap_ptr(s, ptr::null_mut(), Ordering::AcqRel), pb);
        }
        assert!(slot.is_null());
    }
}
