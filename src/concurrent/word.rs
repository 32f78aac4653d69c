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

use std::fmt::Debug;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use num_traits::{PrimInt, WrappingAdd, WrappingSub};

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("only 32 and 64-bit pointer widths are supported");

mod sealed {
    pub trait Sealed {}
}

/// Integer types the atomic primitives operate on: 32-bit, 64-bit and pointer-width.
///
/// Sealed; the set of widths is fixed by what every supported target implements natively.
pub trait AtomicWord: PrimInt + WrappingAdd + WrappingSub + Debug + Send + Sync + sealed::Sealed + 'static {
    /// The core atomic with the same size as `Self`.
    type Atomic: Send + Sync + Debug;

    const BITS: u32;

    /// # Safety
    /// `location` must be non-null, aligned to `size_of::<Self>()` and valid for reads and
    /// writes for `'a`. All concurrent accesses to it must be atomic.
    unsafe fn atomic_ref<'a>(location: *const Self) -> &'a Self::Atomic;

    fn new_atomic(value: Self) -> Self::Atomic;

    fn atomic_load(atomic: &Self::Atomic, ordering: Ordering) -> Self;

    fn atomic_store(atomic: &Self::Atomic, value: Self, ordering: Ordering);

    fn atomic_compare_exchange(
        atomic: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    fn atomic_fetch_add(atomic: &Self::Atomic, delta: Self, ordering: Ordering) -> Self;

    fn atomic_fetch_sub(atomic: &Self::Atomic, delta: Self, ordering: Ordering) -> Self;

    fn atomic_swap(atomic: &Self::Atomic, value: Self, ordering: Ordering) -> Self;

    fn atomic_fetch_or(atomic: &Self::Atomic, bits: Self, ordering: Ordering) -> Self;

    fn atomic_fetch_and(atomic: &Self::Atomic, bits: Self, ordering: Ordering) -> Self;
}

macro_rules! impl_atomic_word {
    ($($int:ty => $atomic:ty),* $(,)?) => {$(
        impl sealed::Sealed for $int {}

        impl AtomicWord for $int {
            type Atomic = $atomic;

            const BITS: u32 = (std::mem::size_of::<$int>() * 8) as u32;

            #[inline(always)]
            unsafe fn atomic_ref<'a>(location: *const Self) -> &'a Self::Atomic {
                &*(location as *const $atomic)
            }

            #[inline(always)]
            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            #[inline(always)]
            fn atomic_load(atomic: &Self::Atomic, ordering: Ordering) -> Self {
                atomic.load(ordering)
            }

            #[inline(always)]
            fn atomic_store(atomic: &Self::Atomic, value: Self, ordering: Ordering) {
                atomic.store(value, ordering)
            }

            #[inline(always)]
            fn atomic_compare_exchange(
                atomic: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                atomic.compare_exchange(current, new, success, failure)
            }

            #[inline(always)]
            fn atomic_fetch_add(atomic: &Self::Atomic, delta: Self, ordering: Ordering) -> Self {
                atomic.fetch_add(delta, ordering)
            }

            #[inline(always)]
            fn atomic_fetch_sub(atomic: &Self::Atomic, delta: Self, ordering: Ordering) -> Self {
                atomic.fetch_sub(delta, ordering)
            }

            #[inline(always)]
            fn atomic_swap(atomic: &Self::Atomic, value: Self, ordering: Ordering) -> Self {
                atomic.swap(value, ordering)
            }

            #[inline(always)]
            fn atomic_fetch_or(atomic: &Self::Atomic, bits: Self, ordering: Ordering) -> Self {
                atomic.fetch_or(bits, ordering)
            }

            #[inline(always)]
            fn atomic_fetch_and(atomic: &Self::Atomic, bits: Self, ordering: Ordering) -> Self {
                atomic.fetch_and(bits, ordering)
            }
        }
    )*};
}

impl_atomic_word! {
    i32 => AtomicI32,
    u32 => AtomicU32,
    i64 => AtomicI64,
    u64 => AtomicU64,
    isize => AtomicIsize,
    usize => AtomicUsize,
}
