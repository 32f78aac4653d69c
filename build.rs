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

use std::env;

use rustc_version::Channel;

#[allow(dead_code)]
#[path = "src/arch/selector.rs"]
mod selector;

use selector::{
    BackendKind, BackendRequest, Codegen, CompilerVersion, CpuFamily, ReleaseChannel, TargetInfo, Toolchain,
    INLINE_ASM_MIN_RUSTC,
};

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn target_info() -> TargetInfo {
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    TargetInfo {
        arch: CpuFamily::from_target_arch(&arch),
        triple: env::var("TARGET").unwrap_or_default(),
        pointer_width: env::var("CARGO_CFG_TARGET_POINTER_WIDTH")
            .ok()
            .and_then(|w| w.parse().ok())
            .unwrap_or(0),
        has_atomic: env_list("CARGO_CFG_TARGET_HAS_ATOMIC"),
        features: env_list("CARGO_CFG_TARGET_FEATURE"),
    }
}

fn toolchain() -> Toolchain {
    let meta = rustc_version::version_meta().unwrap_or_else(|err| panic!("unable to query rustc version: {}", err));

    let channel = match meta.channel {
        Channel::Stable => ReleaseChannel::Stable,
        Channel::Beta => ReleaseChannel::Beta,
        Channel::Nightly => ReleaseChannel::Nightly,
        Channel::Dev => ReleaseChannel::Dev,
    };

    // A profile-level `codegen-backend` is not passed to build scripts; only rustflags are seen.
    let rustflags = env::var("CARGO_ENCODED_RUSTFLAGS").unwrap_or_default();

    Toolchain {
        version: CompilerVersion::new(meta.semver.major, meta.semver.minor, meta.semver.patch),
        channel,
        codegen: Codegen::from_rustflags(rustflags.split('\x1f')),
    }
}

fn request() -> BackendRequest {
    let from_env = env::var("ATOMICS_BACKEND").unwrap_or_default();
    let parsed = BackendRequest::parse(&from_env).unwrap_or_else(|err| panic!("ATOMICS_BACKEND: {}", err));

    if parsed == BackendRequest::Auto && env::var_os("CARGO_FEATURE_FORCE_BUILTIN").is_some() {
        BackendRequest::Builtin
    } else {
        parsed
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/arch/selector.rs");
    println!("cargo:rerun-if-env-changed=ATOMICS_BACKEND");
    println!("cargo:rerun-if-env-changed=CARGO_ENCODED_RUSTFLAGS");

    let backends: Vec<String> = BackendKind::ALL
        .iter()
        .map(|kind| format!("\"{}\"", kind.cfg_value()))
        .collect();
    println!("cargo:rustc-check-cfg=cfg(atomics_backend, values({}))", backends.join(", "));
    println!("cargo:rustc-check-cfg=cfg(atomics_asm)");
    println!("cargo:rustc-check-cfg=cfg(atomics_asm_experimental)");

    let target = target_info();
    let toolchain = toolchain();

    let selection = match selector::select(&target, &toolchain, request()) {
        Ok(selection) => selection,
        Err(err) => panic!(
            "no atomics backend for target `{}` with rustc {}: {}",
            target.triple, toolchain.version, err
        ),
    };

    for substitution in &selection.substitutions {
        println!("cargo:warning=atomics backend substitution: {}", substitution);
    }

    // Inline asm is usable for the native arch even when the builtin backend was picked,
    // so the asm backends stay testable side by side.
    if toolchain.version >= INLINE_ASM_MIN_RUSTC && toolchain.codegen != Codegen::Cranelift {
        match target.arch {
            CpuFamily::X86 | CpuFamily::X86_64 | CpuFamily::AArch64 => println!("cargo:rustc-cfg=atomics_asm"),
            CpuFamily::Arm if selector::asm_backend_available(BackendKind::Arm, &target, &toolchain).is_ok() => {
                println!("cargo:rustc-cfg=atomics_asm")
            }
            _ => {}
        }
    }
    if selection.backend == BackendKind::PowerPc {
        println!("cargo:rustc-cfg=atomics_asm");
        println!("cargo:rustc-cfg=atomics_asm_experimental");
    }

    println!("cargo:rustc-cfg=atomics_backend=\"{}\"", selection.backend.cfg_value());
    println!("cargo:rustc-env=ATOMICS_BACKEND_NAME={}", selection.backend.cfg_value());
    println!("cargo:rustc-env=ATOMICS_RUSTC_VERSION={}", toolchain.version);
    println!("cargo:rustc-env=ATOMICS_CODEGEN={}", toolchain.codegen.name());
    println!("cargo:rustc-env=ATOMICS_TARGET_ARCH={}", target.arch);

    let substitutions: Vec<String> = selection.substitutions.iter().map(|s| s.to_string()).collect();
    println!("cargo:rustc-env=ATOMICS_SUBSTITUTIONS={}", substitutions.join(";"));
}
