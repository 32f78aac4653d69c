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

//! Build-time backend selection.
//!
//! This file is compiled twice: once into the library and once into `build.rs`
//! (via `#[path]`). It must therefore depend on nothing but `std` and `thiserror`.

use std::fmt;

/// Inline `asm!` is stable from this rustc release on.
pub const INLINE_ASM_MIN_RUSTC: CompilerVersion = CompilerVersion::new(1, 59, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    X86,
    AArch64,
    Arm,
    PowerPc,
    Builtin,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::X86,
        BackendKind::AArch64,
        BackendKind::Arm,
        BackendKind::PowerPc,
        BackendKind::Builtin,
    ];

    /// Value used in `cfg(atomics_backend = "...")` and in the `ATOMICS_BACKEND` variable.
    pub const fn cfg_value(self) -> &'static str {
        match self {
            BackendKind::X86 => "x86",
            BackendKind::AArch64 => "aarch64",
            BackendKind::Arm => "arm",
            BackendKind::PowerPc => "powerpc",
            BackendKind::Builtin => "builtin",
        }
    }

    pub fn from_name(name: &str) -> Option<BackendKind> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.cfg_value().eq_ignore_ascii_case(name))
    }

    pub const fn is_inline_asm(self) -> bool {
        !matches!(self, BackendKind::Builtin)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cfg_value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuFamily {
    X86,
    X86_64,
    Arm,
    AArch64,
    PowerPc,
    PowerPc64,
    Other(String),
}

impl CpuFamily {
    /// Maps a `CARGO_CFG_TARGET_ARCH` value.
    pub fn from_target_arch(arch: &str) -> CpuFamily {
        match arch {
            "x86" => CpuFamily::X86,
            "x86_64" => CpuFamily::X86_64,
            "arm" => CpuFamily::Arm,
            "aarch64" => CpuFamily::AArch64,
            "powerpc" => CpuFamily::PowerPc,
            "powerpc64" => CpuFamily::PowerPc64,
            other => CpuFamily::Other(other.to_string()),
        }
    }

    /// Inline-asm backend that serves this family, if any.
    pub fn asm_backend(&self) -> Option<BackendKind> {
        match self {
            CpuFamily::X86 | CpuFamily::X86_64 => Some(BackendKind::X86),
            CpuFamily::AArch64 => Some(BackendKind::AArch64),
            CpuFamily::Arm => Some(BackendKind::Arm),
            CpuFamily::PowerPc | CpuFamily::PowerPc64 => Some(BackendKind::PowerPc),
            CpuFamily::Other(_) => None,
        }
    }
}

impl fmt::Display for CpuFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuFamily::X86 => f.write_str("x86"),
            CpuFamily::X86_64 => f.write_str("x86_64"),
            CpuFamily::Arm => f.write_str("arm"),
            CpuFamily::AArch64 => f.write_str("aarch64"),
            CpuFamily::PowerPc => f.write_str("powerpc"),
            CpuFamily::PowerPc64 => f.write_str("powerpc64"),
            CpuFamily::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompilerVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl CompilerVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parses `major.minor.patch`, ignoring any pre-release or build suffix.
    pub fn parse(version: &str) -> Option<CompilerVersion> {
        let core = version.trim().split(|c| c == '-' || c == '+').next()?;
        let mut parts = core.split('.').map(|part| part.parse::<u64>().ok());
        let major = parts.next()??;
        let minor = parts.next().unwrap_or(Some(0))?;
        let patch = parts.next().unwrap_or(Some(0))?;
        Some(CompilerVersion::new(major, minor, patch))
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseChannel {
    Stable,
    Beta,
    Nightly,
    Dev,
}

impl ReleaseChannel {
    pub const fn allows_unstable_features(self) -> bool {
        matches!(self, ReleaseChannel::Nightly | ReleaseChannel::Dev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codegen {
    Llvm,
    Gcc,
    Cranelift,
}

impl Codegen {
    pub const fn name(self) -> &'static str {
        match self {
            Codegen::Llvm => "llvm",
            Codegen::Gcc => "gcc",
            Codegen::Cranelift => "cranelift",
        }
    }

    /// Detects `-Zcodegen-backend=...` among rustc flags. LLVM when absent.
    pub fn from_rustflags<'a, I>(flags: I) -> Codegen
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut codegen = Codegen::Llvm;
        let mut expect_z_value = false;

        for flag in flags {
            let option = if expect_z_value {
                expect_z_value = false;
                Some(flag)
            } else if flag == "-Z" {
                expect_z_value = true;
                None
            } else {
                flag.strip_prefix("-Z")
            };

            if let Some(value) = option.and_then(|opt| opt.strip_prefix("codegen-backend=")) {
                codegen = if value.contains("gcc") {
                    Codegen::Gcc
                } else if value.contains("cranelift") {
                    Codegen::Cranelift
                } else {
                    Codegen::Llvm
                };
            }
        }

        codegen
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub version: CompilerVersion,
    pub channel: ReleaseChannel,
    pub codegen: Codegen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub arch: CpuFamily,
    pub triple: String,
    pub pointer_width: u32,
    /// Values of `target_has_atomic`, e.g. `["8", "16", "32", "64", "ptr"]`.
    pub has_atomic: Vec<String>,
    pub features: Vec<String>,
}

impl TargetInfo {
    fn has_atomic(&self, width: &str) -> bool {
        self.has_atomic.iter().any(|w| w == width)
    }

    fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    // `dmb` exists from ARMv7 on; older cores only have the CP15 barrier.
    fn is_armv7_or_later(&self) -> bool {
        const V7_PREFIXES: [&str; 4] = ["armv7", "thumbv7", "armv8", "thumbv8"];
        self.has_feature("v7") || V7_PREFIXES.iter().any(|p| self.triple.starts_with(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRequest {
    Auto,
    Builtin,
    Asm(BackendKind),
}

impl BackendRequest {
    /// Parses the `ATOMICS_BACKEND` variable. Empty means `auto`.
    pub fn parse(value: &str) -> Result<BackendRequest, SelectError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            return Ok(BackendRequest::Auto);
        }
        match BackendKind::from_name(value) {
            Some(BackendKind::Builtin) => Ok(BackendRequest::Builtin),
            Some(kind) => Ok(BackendRequest::Asm(kind)),
            None => Err(SelectError::UnknownBackend(value.to_string())),
        }
    }
}

/// A toolchain/architecture combination whose builtin fences are not trusted.
#[derive(Debug, Clone, Copy)]
pub struct ToolchainExclusion {
    pub families: &'static [&'static str],
    pub codegen: Codegen,
    /// Applies to rustc releases strictly below this one; `None` means all releases.
    pub below: Option<CompilerVersion>,
    pub reason: &'static str,
}

impl ToolchainExclusion {
    pub fn matches(&self, target: &TargetInfo, toolchain: &Toolchain) -> bool {
        let family = target.arch.to_string();
        self.families.iter().any(|f| *f == family)
            && self.codegen == toolchain.codegen
            && self.below.map_or(true, |below| toolchain.version < below)
    }
}

pub const KNOWN_BAD_TOOLCHAINS: &[ToolchainExclusion] = &[ToolchainExclusion {
    families: &["x86", "x86_64"],
    codegen: Codegen::Gcc,
    below: None,
    reason: "builtin fences lower through GCC's __atomic_thread_fence family, \
             whose full fence has compiled to no instruction on x86-64",
}];

pub fn known_bad_exclusion(target: &TargetInfo, toolchain: &Toolchain) -> Option<&'static ToolchainExclusion> {
    KNOWN_BAD_TOOLCHAINS.iter().find(|e| e.matches(target, toolchain))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub requested: BackendKind,
    pub selected: BackendKind,
    pub reason: String,
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} replaced by {}: {}", self.requested, self.selected, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub backend: BackendKind,
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),
    #[error("known-bad toolchain: {0}")]
    KnownBadToolchain(String),
    #[error("backend `{0}` is unavailable: {1}")]
    BackendUnavailable(String, String),
    #[error("unknown backend `{0}`, expected one of auto, x86, aarch64, arm, powerpc, builtin")]
    UnknownBackend(String),
}

/// Checks whether the inline-asm backend `kind` can serve `target` with `toolchain`.
pub fn asm_backend_available(kind: BackendKind, target: &TargetInfo, toolchain: &Toolchain) -> Result<(), String> {
    if target.arch.asm_backend() != Some(kind) {
        return Err(format!("target architecture is {}", target.arch));
    }
    if toolchain.version < INLINE_ASM_MIN_RUSTC {
        return Err(format!(
            "rustc {} predates stable inline asm ({})",
            toolchain.version, INLINE_ASM_MIN_RUSTC
        ));
    }
    if toolchain.codegen == Codegen::Cranelift {
        return Err("inline asm is not verified under the cranelift codegen backend".to_string());
    }
    match kind {
        BackendKind::Arm if !target.is_armv7_or_later() => {
            Err(format!("`{}` has no dmb instruction (pre-ARMv7)", target.triple))
        }
        BackendKind::PowerPc if !toolchain.channel.allows_unstable_features() => {
            Err("powerpc inline asm requires a nightly toolchain".to_string())
        }
        _ => Ok(()),
    }
}

fn check_target(target: &TargetInfo) -> Result<(), SelectError> {
    if target.pointer_width != 32 && target.pointer_width != 64 {
        return Err(SelectError::UnsupportedTarget(format!(
            "{} with {}-bit pointers; only 32 and 64-bit pointer widths are supported",
            target.triple, target.pointer_width
        )));
    }

    let missing: Vec<&str> = ["32", "64", "ptr"]
        .iter()
        .copied()
        .filter(|w| !target.has_atomic(w))
        .collect();

    if !missing.is_empty() {
        return Err(SelectError::UnsupportedTarget(format!(
            "{} ({}) lacks native atomics for width(s) {}",
            target.triple,
            target.arch,
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Selects exactly one backend, or explains why none can be used.
pub fn select(target: &TargetInfo, toolchain: &Toolchain, request: BackendRequest) -> Result<Selection, SelectError> {
    check_target(target)?;

    let native = target
        .arch
        .asm_backend()
        .filter(|kind| asm_backend_available(*kind, target, toolchain).is_ok());

    match request {
        BackendRequest::Asm(kind) => {
            asm_backend_available(kind, target, toolchain)
                .map_err(|why| SelectError::BackendUnavailable(kind.to_string(), why))?;
            Ok(Selection {
                backend: kind,
                substitutions: Vec::new(),
            })
        }
        BackendRequest::Auto => match native {
            Some(kind) => Ok(Selection {
                backend: kind,
                substitutions: Vec::new(),
            }),
            None => builtin_or_substitute(target, toolchain, None),
        },
        BackendRequest::Builtin => builtin_or_substitute(target, toolchain, native),
    }
}

fn builtin_or_substitute(
    target: &TargetInfo,
    toolchain: &Toolchain,
    native: Option<BackendKind>,
) -> Result<Selection, SelectError> {
    let exclusion = match known_bad_exclusion(target, toolchain) {
        None => {
            return Ok(Selection {
                backend: BackendKind::Builtin,
                substitutions: Vec::new(),
            })
        }
        Some(exclusion) => exclusion,
    };

    match native {
        Some(kind) => Ok(Selection {
            backend: kind,
            substitutions: vec![Substitution {
                requested: BackendKind::Builtin,
                selected: kind,
                reason: exclusion.reason.to_string(),
            }],
        }),
        None => {
            let why = target
                .arch
                .asm_backend()
                .map(|kind| asm_backend_available(kind, target, toolchain).err().unwrap_or_default())
                .unwrap_or_else(|| "no inline-asm backend for this architecture".to_string());
            Err(SelectError::KnownBadToolchain(format!(
                "{} with rustc {} ({} codegen): {}; the explicit-barrier backend cannot be used either: {}",
                target.arch,
                toolchain.version,
                toolchain.codegen.name(),
                exclusion.reason,
                why
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use galvanic_assert::matchers::any_value;
    use galvanic_assert::{assert_that, has_structure, structure};

    use super::*;

    fn target(arch: &str, triple: &str) -> TargetInfo {
        TargetInfo {
            arch: CpuFamily::from_target_arch(arch),
            triple: triple.to_string(),
            pointer_width: if arch.ends_with("64") { 64 } else { 32 },
            has_atomic: vec!["8".into(), "16".into(), "32".into(), "64".into(), "ptr".into()],
            features: Vec::new(),
        }
    }

    fn stable(major: u64, minor: u64) -> Toolchain {
        Toolchain {
            version: CompilerVersion::new(major, minor, 0),
            channel: ReleaseChannel::Stable,
            codegen: Codegen::Llvm,
        }
    }

    #[test]
    fn that_asm_backend_wins_on_x86_64() {
        let sel = select(&target("x86_64", "x86_64-unknown-linux-gnu"), &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::X86);
        assert!(sel.substitutions.is_empty());
    }

    #[test]
    fn that_aarch64_gets_its_own_backend() {
        let sel = select(&target("aarch64", "aarch64-apple-darwin"), &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::AArch64);
    }

    #[test]
    fn that_old_rustc_falls_back_to_builtin() {
        let sel = select(&target("x86_64", "x86_64-unknown-linux-gnu"), &stable(1, 58), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);
    }

    #[test]
    fn that_unknown_arch_uses_builtin() {
        let sel = select(&target("riscv64", "riscv64gc-unknown-linux-gnu"), &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);
    }

    #[test]
    fn that_armv6_is_routed_to_builtin() {
        let sel = select(&target("arm", "arm-unknown-linux-gnueabihf"), &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);

        let sel = select(&target("arm", "armv7-unknown-linux-gnueabihf"), &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Arm);
    }

    #[test]
    fn that_arm_feature_v7_enables_asm() {
        let mut t = target("arm", "arm-unknown-linux-gnueabihf");
        t.features.push("v7".to_string());
        let sel = select(&t, &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Arm);
    }

    #[test]
    fn that_powerpc_asm_needs_nightly() {
        let mut t = target("powerpc64", "powerpc64le-unknown-linux-gnu");
        t.pointer_width = 64;

        let sel = select(&t, &stable(1, 70), BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);

        let mut nightly = stable(1, 70);
        nightly.channel = ReleaseChannel::Nightly;
        let sel = select(&t, &nightly, BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::PowerPc);
    }

    #[test]
    fn that_cranelift_disables_asm() {
        let mut toolchain = stable(1, 75);
        toolchain.codegen = Codegen::Cranelift;
        let sel = select(&target("aarch64", "aarch64-unknown-linux-gnu"), &toolchain, BackendRequest::Auto).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);
    }

    #[test]
    fn that_builtin_request_is_honoured_on_trusted_toolchain() {
        let sel = select(&target("x86_64", "x86_64-unknown-linux-gnu"), &stable(1, 70), BackendRequest::Builtin).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);
        assert!(sel.substitutions.is_empty());
    }

    #[test]
    fn that_known_bad_builtin_is_substituted() {
        let mut toolchain = stable(1, 75);
        toolchain.codegen = Codegen::Gcc;
        let sel = select(&target("x86_64", "x86_64-unknown-linux-gnu"), &toolchain, BackendRequest::Builtin).unwrap();

        assert_eq!(sel.backend, BackendKind::X86);
        assert_eq!(sel.substitutions.len(), 1);
        assert_eq!(sel.substitutions[0].requested, BackendKind::Builtin);
        assert_eq!(sel.substitutions[0].selected, BackendKind::X86);
    }

    #[test]
    fn that_known_bad_without_asm_fails_build() {
        let toolchain = Toolchain {
            version: CompilerVersion::new(1, 55, 0),
            channel: ReleaseChannel::Stable,
            codegen: Codegen::Gcc,
        };
        let err = select(&target("x86", "i686-unknown-linux-gnu"), &toolchain, BackendRequest::Auto).unwrap_err();
        assert_that!(&err, has_structure!(SelectError::KnownBadToolchain[any_value()]));
    }

    #[test]
    fn that_gcc_codegen_elsewhere_keeps_builtin() {
        let mut toolchain = stable(1, 75);
        toolchain.codegen = Codegen::Gcc;
        let sel = select(&target("riscv64", "riscv64gc-unknown-linux-gnu"), &toolchain, BackendRequest::Builtin).unwrap();
        assert_eq!(sel.backend, BackendKind::Builtin);
    }

    #[test]
    fn that_missing_64bit_atomics_is_unsupported() {
        let mut t = target("powerpc", "powerpc-unknown-linux-gnu");
        t.has_atomic = vec!["8".into(), "16".into(), "32".into(), "ptr".into()];
        let err = select(&t, &stable(1, 70), BackendRequest::Auto).unwrap_err();

        assert_that!(&err, has_structure!(SelectError::UnsupportedTarget[any_value()]));
        assert!(err.to_string().contains("64"));
    }

    #[test]
    fn that_16bit_pointers_are_unsupported() {
        let mut t = target("msp430", "msp430-none-elf");
        t.pointer_width = 16;
        let err = select(&t, &stable(1, 70), BackendRequest::Auto).unwrap_err();
        assert_that!(&err, has_structure!(SelectError::UnsupportedTarget[any_value()]));
    }

    #[test]
    fn that_mismatched_request_is_rejected() {
        let err = select(
            &target("x86_64", "x86_64-unknown-linux-gnu"),
            &stable(1, 70),
            BackendRequest::Asm(BackendKind::AArch64),
        )
        .unwrap_err();
        assert_that!(&err, has_structure!(SelectError::BackendUnavailable[any_value(), any_value()]));
    }

    #[test]
    fn test_request_parse() {
        assert_eq!(BackendRequest::parse("").unwrap(), BackendRequest::Auto);
        assert_eq!(BackendRequest::parse(" AUTO ").unwrap(), BackendRequest::Auto);
        assert_eq!(BackendRequest::parse("builtin").unwrap(), BackendRequest::Builtin);
        assert_eq!(
            BackendRequest::parse("x86").unwrap(),
            BackendRequest::Asm(BackendKind::X86)
        );
        assert_that!(
            &BackendRequest::parse("sparc").unwrap_err(),
            has_structure!(SelectError::UnknownBackend[any_value()])
        );
    }

    #[test]
    fn test_codegen_from_rustflags() {
        assert_eq!(Codegen::from_rustflags(vec!["-Copt-level=3"]), Codegen::Llvm);
        // Empty CARGO_ENCODED_RUSTFLAGS, as with a profile-level codegen-backend.
        assert_eq!(Codegen::from_rustflags("".split('\x1f')), Codegen::Llvm);
        assert_eq!(Codegen::from_rustflags(vec!["-Zcodegen-backend=cranelift"]), Codegen::Cranelift);
        assert_eq!(Codegen::from_rustflags(vec!["-Z", "codegen-backend=gcc"]), Codegen::Gcc);
        assert_eq!(
            Codegen::from_rustflags(vec!["-Zcodegen-backend=/opt/librustc_codegen_gcc.so"]),
            Codegen::Gcc
        );
    }

    #[test]
    fn test_compiler_version_parse() {
        assert_eq!(CompilerVersion::parse("1.75.0"), Some(CompilerVersion::new(1, 75, 0)));
        assert_eq!(CompilerVersion::parse("1.76.0-nightly"), Some(CompilerVersion::new(1, 76, 0)));
        assert_eq!(CompilerVersion::parse("1.59"), Some(CompilerVersion::new(1, 59, 0)));
        assert_eq!(CompilerVersion::parse("one.two"), None);
        assert!(CompilerVersion::new(1, 58, 1) < INLINE_ASM_MIN_RUSTC);
    }
}
