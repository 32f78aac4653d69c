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

//! x86 and x86_64.
//!
//! Under TSO loads are not reordered with loads and stores are not reordered with stores, so the
//! read and write barriers only need to stop the compiler. Store-load ordering needs `mfence`.
//! Non-temporal stores are weakly ordered; callers using them need the full barrier.

use std::arch::asm;

use crate::arch::{Backend, BackendKind};

pub struct X86;

impl Backend for X86 {
    const KIND: BackendKind = BackendKind::X86;

    #[inline(always)]
    fn compiler_barrier() {
        // No `nomem`: the compiler must assume all memory is read and written here.
        unsafe { asm!("", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn read_barrier() {
        Self::compiler_barrier();
    }

    #[inline(always)]
    fn write_barrier() {
        Self::compiler_barrier();
    }

    #[inline(always)]
    #[cfg(any(target_arch = "x86_64", target_feature = "sse2"))]
    fn read_write_barrier() {
        unsafe { asm!("mfence", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    #[cfg(not(any(target_arch = "x86_64", target_feature = "sse2")))]
    fn read_write_barrier() {
        // Pre-SSE2 cores have no mfence; a locked RMW on the stack top is a full barrier.
        unsafe { asm!("lock or dword ptr [esp], 0") }
    }

    #[inline(always)]
    fn acq_rel_barrier() {
        Self::compiler_barrier();
    }

    #[inline(always)]
    fn spin_hint() {
        unsafe { asm!("pause", options(nomem, nostack, preserves_flags)) }
    }
}
