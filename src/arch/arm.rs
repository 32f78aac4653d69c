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

//! 32-bit ARM, ARMv7 and later.
//!
//! ARMv7 only offers `dmb ish` (all accesses) and `dmb ishst` (stores against stores). An
//! acquire or release fence also has to order loads, so every barrier is `dmb ish`.

use std::arch::asm;

use crate::arch::{Backend, BackendKind};

pub struct Arm;

impl Arm {
    #[inline(always)]
    fn dmb_ish() {
        unsafe { asm!("dmb ish", options(nostack, preserves_flags)) }
    }
}

impl Backend for Arm {
    const KIND: BackendKind = BackendKind::Arm;

    #[inline(always)]
    fn compiler_barrier() {
        unsafe { asm!("", options(nostack, preserves_flags)) }
    }

    #[inline(always)]
    fn read_barrier() {
        Self::dmb_ish();
    }

    #[inline(always)]
    fn write_barrier() {
        Self::dmb_ish();
    }

    #[inline(always)]
    fn read_write_barrier() {
        Self::dmb_ish();
    }

    #[inline(always)]
    fn acq_rel_barrier() {
        Self::dmb_ish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn that_arm_reports_its_kind() {
        assert_eq!(Arm::KIND, BackendKind::Arm);
        assert!(Arm::KIND.is_inline_asm());
    }

    #[test]
    fn that_all_barriers_can_be_issued() {
        Arm::compiler_barrier();
        Arm::read_barrier();
        Arm::write_barrier();
        Arm::acq_rel_barrier();
        Arm::read_write_barrier();
        Arm::spin_hint();
    }
}
