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

//! Portable atomic operations and memory barriers.
//!
//! One architecture backend is chosen when the crate is built (see `build.rs` and
//! [`arch::selector`]); the fences in [`concurrent::fence`] and the atomics in
//! [`concurrent::atomics`] resolve to it statically.
//!
//! ```
//! use lowlevel_atomics::{fence, Location, Ordering};
//! use std::sync::atomic::AtomicU64;
//!
//! let word = AtomicU64::new(0);
//! let location = Location::<u64>::new(&word);
//!
//! location.store(42, Ordering::Release);
//! fence::read_barrier();
//! assert_eq!(location.load(Ordering::Acquire), 42);
//! ```

#![cfg_attr(atomics_asm_experimental, feature(asm_experimental_arch))]
#![allow(clippy::missing_safety_doc)]

#[doc(hidden)]
pub use log;

pub mod arch;
pub mod concurrent;
pub mod utils;

pub use crate::arch::{build_info, log_selection, Active, Backend, BackendKind, ACTIVE_BACKEND};
pub use crate::concurrent::atomic_buffer::{AlignedBuffer, AtomicBuffer};
pub use crate::concurrent::atomics::{self, CasResult};
pub use crate::concurrent::fence;
pub use crate::concurrent::location::Location;
pub use crate::concurrent::ordering::Ordering;
pub use crate::concurrent::word::AtomicWord;
pub use crate::utils::errors::AtomicsError;
