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

//! Architecture backends.
//!
//! Exactly one backend is active per build; `build.rs` picks it and passes the choice in as
//! `cfg(atomics_backend = "...")`. [`Active`] names that backend. Other backends that can be
//! compiled for the current target (the builtin one always, the native asm one when inline asm
//! is usable) stay available under their own names so they can be exercised side by side.

use std::str::FromStr;

use lazy_static::lazy_static;

use crate::utils::errors::AtomicsError;

pub mod selector;

pub mod builtin;

#[cfg(all(atomics_asm, any(target_arch = "x86", target_arch = "x86_64")))]
pub mod x86;

#[cfg(all(atomics_asm, target_arch = "aarch64"))]
pub mod aarch64;

#[cfg(all(atomics_asm, target_arch = "arm"))]
pub mod arm;

#[cfg(all(atomics_asm, any(target_arch = "powerpc", target_arch = "powerpc64")))]
pub mod powerpc;

pub use self::selector::BackendKind;

impl FromStr for BackendKind {
    type Err = AtomicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::from_name(s).ok_or_else(|| AtomicsError::UnknownBackend(s.to_string()))
    }
}

/// Fence construction for one architecture family.
///
/// All functions are associated (no `self`) so a backend is chosen by type, never by value.
pub trait Backend {
    const KIND: BackendKind;

    /// Stops the compiler from moving memory accesses across this point. Emits no instruction.
    fn compiler_barrier();

    /// Acquire fence: later loads are not satisfied before earlier loads.
    fn read_barrier();

    /// Release fence: later stores do not become visible before earlier stores.
    fn write_barrier();

    /// Full fence, including store-load ordering.
    fn read_write_barrier();

    /// Acquire-release fence.
    #[inline]
    fn acq_rel_barrier() {
        Self::read_barrier();
        Self::write_barrier();
    }

    #[inline]
    fn spin_hint() {
        core::hint::spin_loop();
    }
}

#[cfg(atomics_backend = "x86")]
pub use self::x86::X86 as Active;

#[cfg(atomics_backend = "aarch64")]
pub use self::aarch64::AArch64 as Active;

#[cfg(atomics_backend = "arm")]
pub use self::arm::Arm as Active;

#[cfg(atomics_backend = "powerpc")]
pub use self::powerpc::PowerPc as Active;

#[cfg(atomics_backend = "builtin")]
pub use self::builtin::Builtin as Active;

#[cfg(not(any(
    atomics_backend = "x86",
    atomics_backend = "aarch64",
    atomics_backend = "arm",
    atomics_backend = "powerpc",
    atomics_backend = "builtin"
)))]
compile_error!("no atomics backend selected: build.rs did not run or emitted no `atomics_backend` cfg");

pub const ACTIVE_BACKEND: BackendKind = <Active as Backend>::KIND;

/// What the build script decided, as recorded at compile time.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub backend: BackendKind,
    pub rustc_version: String,
    pub codegen: String,
    pub target_arch: String,
    pub substitutions: Vec<String>,
}

impl BuildInfo {
    fn from_build_env() -> Self {
        Self {
            backend: ACTIVE_BACKEND,
            rustc_version: env!("ATOMICS_RUSTC_VERSION").to_string(),
            codegen: env!("ATOMICS_CODEGEN").to_string(),
            target_arch: env!("ATOMICS_TARGET_ARCH").to_string(),
            substitutions: env!("ATOMICS_SUBSTITUTIONS")
                .split(';')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

lazy_static! {
    static ref BUILD_INFO: BuildInfo = BuildInfo::from_build_env();
}

pub fn build_info() -> &'static BuildInfo {
    &BUILD_INFO
}

/// Logs the backend selection. Intended to be called once at consumer start-up.
pub fn log_selection() {
    let info = build_info();
    log::info!(
        "atomics backend {} on {} (rustc {}, {} codegen)",
        info.backend,
        info.target_arch,
        info.rustc_version,
        info.codegen
    );
    for substitution in &info.substitutions {
        log::warn!("atomics backend substitution: {}", substitution);
    }
}
