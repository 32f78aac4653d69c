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

//! Compiler-builtin backend, used where no inline-asm backend is available or trusted.
//!
//! Every hardware fence builtin is bracketed by compiler fences, so even if a builtin is
//! lowered to no instruction the compiler still may not reorder accesses across it.

use std::sync::atomic::{compiler_fence, fence, Ordering};

use crate::arch::{Backend, BackendKind};

pub struct Builtin;

impl Backend for Builtin {
    const KIND: BackendKind = BackendKind::Builtin;

    #[inline(always)]
    fn compiler_barrier() {
        compiler_fence(Ordering::SeqCst);
    }

    #[inline(always)]
    fn read_barrier() {
        compiler_fence(Ordering::SeqCst);
        fence(Ordering::Acquire);
        compiler_fence(Ordering::SeqCst);
    }

    #[inline(always)]
    fn write_barrier() {
        compiler_fence(Ordering::SeqCst);
        fence(Ordering::Release);
        compiler_fence(Ordering::SeqCst);
    }

    #[inline(always)]
    fn read_write_barrier() {
        compiler_fence(Ordering::SeqCst);
        fence(Ordering::SeqCst);
        compiler_fence(Ordering::SeqCst);
    }

    #[inline(always)]
    fn acq_rel_barrier() {
        compiler_fence(Ordering::SeqCst);
        fence(Ordering::AcqRel);
        compiler_fence(Ordering::SeqCst);
    }
}
