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

//! Memory barriers of the active backend.
//!
//! These never fail and never log.

use crate::arch::{Active, Backend};
use crate::concurrent::ordering::Ordering;

/// Compiler-only barrier. Emits no instruction.
#[inline(always)]
pub fn compiler_barrier() {
    Active::compiler_barrier()
}

/// Acquire fence: no load after this point is satisfied before a load preceding it.
#[inline(always)]
pub fn read_barrier() {
    Active::read_barrier()
}

/// Release fence: no store after this point becomes visible before a store preceding it.
#[inline(always)]
pub fn write_barrier() {
    Active::write_barrier()
}

/// Full fence: both of the above, plus earlier stores ordered before later loads.
#[inline(always)]
pub fn read_write_barrier() {
    Active::read_write_barrier()
}

/// Fence for an ordering mode. `Relaxed` still constrains the compiler.
#[inline(always)]
pub fn fence(ordering: Ordering) {
    fence_with::<Active>(ordering)
}

/// [`fence`] on an explicitly named backend.
#[inline(always)]
pub fn fence_with<B: Backend>(ordering: Ordering) {
    match ordering {
        Ordering::Relaxed => B::compiler_barrier(),
        Ordering::Acquire => B::read_barrier(),
        Ordering::Release => B::write_barrier(),
        Ordering::AcqRel => B::acq_rel_barrier(),
        Ordering::SeqCst => B::read_write_barrier(),
    }
}

/// Spin-loop hint. Not a fence.
#[inline(always)]
pub fn cpu_pause() {
    Active::spin_hint()
}
