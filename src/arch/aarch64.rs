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

//! AArch64.
//!
//! `dmb ishld` orders earlier loads before later loads and stores, which is an acquire fence.
//! ARMv8 has no barrier that orders earlier loads and stores against later stores only, so the
//! write barrier is a full `dmb ish`.

use std::arch::asm;

use crate::arch::{Backend, BackendKind};

pub struct AArch64;

impl Backend for AArch64 {
    const KIND: BackendKind = BackendKind::AArch64;

    #[inline(always)]
    fn compiler_barrier() {
        unsafe { asm!("", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn read_barrier() {
        unsafe { asm!("dmb ishld", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn write_barrier() {
        unsafe { asm!("dmb ish", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn read_write_barrier() {
        unsafe { asm!("dmb ish", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn acq_rel_barrier() {
        Self::read_write_barrier();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn that_aarch64_reports_its_kind() {
        assert_eq!(AArch64::KIND, BackendKind::AArch64);
        assert!(AArch64::KIND.is_inline_asm());
    }

    #[test]
    fn that_all_barriers_can_be_issued() {
        AArch64::compiler_barrier();
        AArch64::read_barrier();
        AArch64::write_barrier();
        AArch64::acq_rel_barrier();
        AArch64::read_write_barrier();
        AArch64::spin_hint();
    }
}
