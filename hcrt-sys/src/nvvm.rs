//! Rust bindings for libNVVM.
//!
//! Transcribed from `nvvm.h`.

#![allow(non_camel_case_types, dead_code, non_upper_case_globals)]

use libc::{c_char, c_int, size_t};

pub type nvvmResult = c_int;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct _nvvmProgram {
    _unused: [u8; 0],
}

pub type nvvmProgram = *mut _nvvmProgram;

pub const NVVM_SUCCESS: nvvmResult = 0;
pub const NVVM_ERROR_OUT_OF_MEMORY: nvvmResult = 1;
pub const NVVM_ERROR_PROGRAM_CREATION_FAILURE: nvvmResult = 2;
pub const NVVM_ERROR_IR_VERSION_MISMATCH: nvvmResult = 3;
pub const NVVM_ERROR_INVALID_INPUT: nvvmResult = 4;
pub const NVVM_ERROR_INVALID_PROGRAM: nvvmResult = 5;
pub const NVVM_ERROR_INVALID_IR: nvvmResult = 6;
pub const NVVM_ERROR_INVALID_OPTION: nvvmResult = 7;
pub const NVVM_ERROR_NO_MODULE_IN_PROGRAM: nvvmResult = 8;
pub const NVVM_ERROR_COMPILATION: nvvmResult = 9;

#[cfg_attr(target_os = "linux", link(name = "nvvm"))]
extern "C" {
    pub fn nvvmGetErrorString(result: nvvmResult) -> *const c_char;
    pub fn nvvmVersion(major: *mut c_int, minor: *mut c_int) -> nvvmResult;
    pub fn nvvmIRVersion(
        major_ir: *mut c_int,
        minor_ir: *mut c_int,
        major_dbg: *mut c_int,
        minor_dbg: *mut c_int,
    ) -> nvvmResult;

    pub fn nvvmCreateProgram(prog: *mut nvvmProgram) -> nvvmResult;
    pub fn nvvmDestroyProgram(prog: *mut nvvmProgram) -> nvvmResult;
    pub fn nvvmAddModuleToProgram(
        prog: nvvmProgram,
        buffer: *const c_char,
        size: size_t,
        name: *const c_char,
    ) -> nvvmResult;
    pub fn nvvmCompileProgram(
        prog: nvvmProgram,
        num_options: c_int,
        options: *const *const c_char,
    ) -> nvvmResult;
    pub fn nvvmGetCompiledResultSize(prog: nvvmProgram, buffer_size_ret: *mut size_t)
        -> nvvmResult;
    pub fn nvvmGetCompiledResult(prog: nvvmProgram, buffer: *mut c_char) -> nvvmResult;
    pub fn nvvmGetProgramLogSize(prog: nvvmProgram, buffer_size_ret: *mut size_t) -> nvvmResult;
    pub fn nvvmGetProgramLog(prog: nvvmProgram, buffer: *mut c_char) -> nvvmResult;
}
