//! AMDGPU code generation: lowers portable IR to a native code object.
//!
//! The pipeline mirrors what the device toolchain does for offline
//! builds: the kernel IR is linked against a synthesized runtime
//! configuration module and the device math/interface bitcode libraries
//! (the latter two only as needed), lowered for the device ISA at full
//! optimization with PIC relocation, and turned into a shared object by
//! the system linker. The resulting binary is read back for the caller
//! to load into an executable.
//!
//! Tooling and library locations are configuration:
//!
//! * `HCRT_LLVM_BIN` — directory holding `llvm-link`, `llc`, `ld.lld`
//!   (bare names otherwise).
//! * `HCRT_OCML` / `HCRT_IRIF` — math and interface bitcode libraries
//!   (default `/opt/rocm/lib/{ocml,irif}.amdgcn.bc`).

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};

const DEFAULT_OCML: &str = "/opt/rocm/lib/ocml.amdgcn.bc";
const DEFAULT_IRIF: &str = "/opt/rocm/lib/irif.amdgcn.bc";

/// Floating-point behavior baked into the runtime configuration module.
#[derive(Debug, Clone, Copy)]
pub struct CodegenOptions {
    pub opt_level: u8,
    pub finite_only: bool,
    pub unsafe_math: bool,
    pub denormals_are_zero: bool,
    pub correctly_rounded_sqrt: bool,
}

impl Default for CodegenOptions {
    fn default() -> CodegenOptions {
        CodegenOptions {
            opt_level: 3,
            finite_only: false,
            unsafe_math: false,
            denormals_are_zero: false,
            correctly_rounded_sqrt: true,
        }
    }
}

/// Parses a `gfx…` ISA name into the integer version the device math
/// library keys its dispatch on: `major * 1000 + minor * 100 + stepping`,
/// with a hexadecimal stepping digit (`gfx906` → 9006, `gfx90a` → 9010).
pub fn isa_version(isa: &str) -> Result<u32> {
    let digits = isa
        .strip_prefix("gfx")
        .ok_or_else(|| Error::InvalidIsa(isa.to_string()))?;
    if digits.len() < 3 {
        return Err(Error::InvalidIsa(isa.to_string()));
    }
    let (major, rest) = digits.split_at(digits.len() - 2);
    let mut chars = rest.chars();
    let minor = chars.next().unwrap();
    let stepping = chars.next().unwrap();

    let major: u32 = major
        .parse()
        .map_err(|_| Error::InvalidIsa(isa.to_string()))?;
    let minor = minor
        .to_digit(10)
        .ok_or_else(|| Error::InvalidIsa(isa.to_string()))?;
    let stepping = stepping
        .to_digit(16)
        .ok_or_else(|| Error::InvalidIsa(isa.to_string()))?;

    Ok(major * 1000 + minor * 100 + stepping)
}

/// Synthesizes the runtime configuration module: a handful of
/// integer-returning helpers the math library queries to select code
/// paths at link time.
pub fn config_module(isa: &str, opts: &CodegenOptions) -> Result<String> {
    let version = isa_version(isa)?;
    let flag = |b: bool| if b { 1 } else { 0 };

    let mut text = String::new();
    text.push_str("target triple = \"amdgcn-amd-amdhsa\"\n\n");
    let helpers: [(&str, u32); 5] = [
        ("__oclc_finite_only_opt", flag(opts.finite_only)),
        ("__oclc_unsafe_math_opt", flag(opts.unsafe_math)),
        ("__oclc_daz_opt", flag(opts.denormals_are_zero)),
        (
            "__oclc_correctly_rounded_sqrt32",
            flag(opts.correctly_rounded_sqrt),
        ),
        ("__oclc_ISA_version", version),
    ];
    for (name, value) in helpers.iter() {
        text.push_str(&format!(
            "define linkonce_odr i32 @{}() {{\n  ret i32 {}\n}}\n\n",
            name, value
        ));
    }
    Ok(text)
}

fn tool(name: &str) -> PathBuf {
    match env::var_os("HCRT_LLVM_BIN") {
        Some(bin) => PathBuf::from(bin).join(name),
        None => PathBuf::from(name),
    }
}

fn library(var: &str, default: &str) -> PathBuf {
    env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn run(stage: &'static str, command: &mut Command) -> Result<()> {
    log::debug!("codegen {}: {:?}", stage, command);
    let output = command.output().map_err(|err| Error::Codegen {
        stage,
        detail: format!("failed to invoke {:?}: {}", command.get_program(), err),
    })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Codegen {
            stage,
            detail: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Lowers `ir` for the given device ISA and returns the native binary.
pub fn compile(ir: &str, isa: &str, opts: &CodegenOptions) -> Result<Vec<u8>> {
    if !isa.starts_with("gfx") {
        return Err(Error::InvalidIsa(isa.to_string()));
    }

    let dir = tempfile::Builder::new().prefix("hcrt-gcn").tempdir()?;
    let kernel_ll = dir.path().join("kernel.ll");
    let config_ll = dir.path().join("config.ll");
    let linked_bc = dir.path().join("linked.bc");
    let object = dir.path().join("kernel.o");
    let shared = dir.path().join("kernel.so");

    fs::write(&kernel_ll, ir)?;
    fs::write(&config_ll, config_module(isa, opts)?)?;

    run(
        "link",
        Command::new(tool("llvm-link"))
            .arg(&kernel_ll)
            .arg(&config_ll)
            .arg("--only-needed")
            .arg(library("HCRT_OCML", DEFAULT_OCML))
            .arg(library("HCRT_IRIF", DEFAULT_IRIF))
            .arg("-o")
            .arg(&linked_bc),
    )?;

    run(
        "lowering",
        Command::new(tool("llc"))
            .arg("-mtriple=amdgcn-amd-amdhsa")
            .arg(format!("-mcpu={}", isa))
            .arg(format!("-O{}", opts.opt_level))
            .arg("-relocation-model=pic")
            .arg("-filetype=obj")
            .arg(&linked_bc)
            .arg("-o")
            .arg(&object),
    )?;

    run(
        "linker",
        Command::new(tool("ld.lld"))
            .arg("-shared")
            .arg(&object)
            .arg("-o")
            .arg(&shared),
    )?;

    Ok(fs::read(&shared)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isa_versions() {
        assert_eq!(isa_version("gfx906").unwrap(), 9006);
        assert_eq!(isa_version("gfx90a").unwrap(), 9010);
        assert_eq!(isa_version("gfx1030").unwrap(), 10300);
        assert_eq!(isa_version("gfx700").unwrap(), 7000);
    }

    #[test]
    fn bad_isa_names_reject() {
        assert!(isa_version("sm_70").is_err());
        assert!(isa_version("gfx").is_err());
        assert!(isa_version("gfxzzz").is_err());
    }

    #[test]
    fn config_module_carries_the_options() {
        let mut opts = CodegenOptions::default();
        opts.finite_only = true;
        let text = config_module("gfx906", &opts).unwrap();

        assert!(text.contains("@__oclc_finite_only_opt()"));
        assert!(text.contains("@__oclc_ISA_version()"));
        assert!(text.contains("ret i32 9006"));
        assert!(text.contains("amdgcn-amd-amdhsa"));
    }

    #[test]
    fn compile_rejects_foreign_isa() {
        match compile("", "sm_70", &CodegenOptions::default()) {
            Err(Error::InvalidIsa(isa)) => assert_eq!(isa, "sm_70"),
            other => panic!("expected InvalidIsa, got {:?}", other.map(|b| b.len())),
        }
    }
}
