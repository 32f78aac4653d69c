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

//! PowerPC and PowerPC64. Inline asm on these targets needs `asm_experimental_arch`, so this
//! backend is only built on nightly toolchains.
//!
//! `lwsync` orders every pair of accesses except an earlier store against a later load, which
//! covers both acquire and release. Only the full barrier needs `sync`.

use std::arch::asm;

use crate::arch::{Backend, BackendKind};

pub struct PowerPc;

impl Backend for PowerPc {
    const KIND: BackendKind = BackendKind::PowerPc;

    #[inline(always)]
    fn compiler_barrier() {
        unsafe { asm!("", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn read_barrier() {
        unsafe { asm!("lwsync", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn write_barrier() {
        unsafe { asm!("lwsync", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn read_write_barrier() {
        unsafe { asm!("sync", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn acq_rel_barrier() {
        Self::read_barrier();
    }
}
