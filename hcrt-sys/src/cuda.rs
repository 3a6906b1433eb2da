//! Rust bindings for the CUDA driver ABI.
//!
//! Transcribed from `cuda.h`. Only the surface exercised by the runtime
//! is bound; entry points carry their versioned (`_v2`) export names where
//! the header would resolve them via macro.

#![allow(non_camel_case_types, dead_code, non_upper_case_globals)]

use libc::{c_char, c_int, c_uint, c_void, size_t};

pub type CUresult = c_int;
pub type CUdevice = c_int;
pub type CUdeviceptr = u64;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUctx_st {
    _unused: [u8; 0],
}
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUmod_st {
    _unused: [u8; 0],
}
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUfunc_st {
    _unused: [u8; 0],
}
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUstream_st {
    _unused: [u8; 0],
}
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUevent_st {
    _unused: [u8; 0],
}
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUtexref_st {
    _unused: [u8; 0],
}

pub type CUcontext = *mut CUctx_st;
pub type CUmodule = *mut CUmod_st;
pub type CUfunction = *mut CUfunc_st;
pub type CUstream = *mut CUstream_st;
pub type CUevent = *mut CUevent_st;
pub type CUtexref = *mut CUtexref_st;

pub const CUDA_SUCCESS: CUresult = 0;

// CUdevice_attribute (subset):
pub const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR: c_int = 75;
pub const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR: c_int = 76;

// CUjit_option:
pub const CU_JIT_MAX_REGISTERS: c_int = 0;
pub const CU_JIT_THREADS_PER_BLOCK: c_int = 1;
pub const CU_JIT_WALL_TIME: c_int = 2;
pub const CU_JIT_INFO_LOG_BUFFER: c_int = 3;
pub const CU_JIT_INFO_LOG_BUFFER_SIZE_BYTES: c_int = 4;
pub const CU_JIT_ERROR_LOG_BUFFER: c_int = 5;
pub const CU_JIT_ERROR_LOG_BUFFER_SIZE_BYTES: c_int = 6;
pub const CU_JIT_OPTIMIZATION_LEVEL: c_int = 7;
pub const CU_JIT_TARGET_FROM_CUCONTEXT: c_int = 8;
pub const CU_JIT_TARGET: c_int = 9;
pub const CU_JIT_FALLBACK_STRATEGY: c_int = 10;

// CUarray_format:
pub const CU_AD_FORMAT_UNSIGNED_INT8: c_int = 0x01;
pub const CU_AD_FORMAT_UNSIGNED_INT16: c_int = 0x02;
pub const CU_AD_FORMAT_UNSIGNED_INT32: c_int = 0x03;
pub const CU_AD_FORMAT_SIGNED_INT8: c_int = 0x08;
pub const CU_AD_FORMAT_SIGNED_INT16: c_int = 0x09;
pub const CU_AD_FORMAT_SIGNED_INT32: c_int = 0x0a;
pub const CU_AD_FORMAT_HALF: c_int = 0x10;
pub const CU_AD_FORMAT_FLOAT: c_int = 0x20;

// CUtexref flags - bitfield:
pub const CU_TRSF_READ_AS_INTEGER: c_uint = 0x01;

// CUmemAttach_flags:
pub const CU_MEM_ATTACH_GLOBAL: c_uint = 0x1;

#[cfg_attr(target_os = "linux", link(name = "cuda"))]
extern "C" {
    pub fn cuInit(flags: c_uint) -> CUresult;
    pub fn cuDriverGetVersion(driver_version: *mut c_int) -> CUresult;
    pub fn cuGetErrorName(error: CUresult, p_str: *mut *const c_char) -> CUresult;
    pub fn cuGetErrorString(error: CUresult, p_str: *mut *const c_char) -> CUresult;

    pub fn cuDeviceGet(device: *mut CUdevice, ordinal: c_int) -> CUresult;
    pub fn cuDeviceGetCount(count: *mut c_int) -> CUresult;
    pub fn cuDeviceGetName(name: *mut c_char, len: c_int, dev: CUdevice) -> CUresult;
    pub fn cuDeviceGetAttribute(pi: *mut c_int, attrib: c_int, dev: CUdevice) -> CUresult;

    pub fn cuDevicePrimaryCtxRetain(pctx: *mut CUcontext, dev: CUdevice) -> CUresult;
    pub fn cuDevicePrimaryCtxRelease(dev: CUdevice) -> CUresult;
    pub fn cuCtxSetCurrent(ctx: CUcontext) -> CUresult;
    pub fn cuCtxSynchronize() -> CUresult;

    #[link_name = "cuMemAlloc_v2"]
    pub fn cuMemAlloc(dptr: *mut CUdeviceptr, bytesize: size_t) -> CUresult;
    #[link_name = "cuMemFree_v2"]
    pub fn cuMemFree(dptr: CUdeviceptr) -> CUresult;
    #[link_name = "cuMemAllocHost_v2"]
    pub fn cuMemAllocHost(pp: *mut *mut c_void, bytesize: size_t) -> CUresult;
    pub fn cuMemFreeHost(p: *mut c_void) -> CUresult;
    pub fn cuMemAllocManaged(
        dptr: *mut CUdeviceptr,
        bytesize: size_t,
        flags: c_uint,
    ) -> CUresult;
    #[link_name = "cuMemHostGetDevicePointer_v2"]
    pub fn cuMemHostGetDevicePointer(
        pdptr: *mut CUdeviceptr,
        p: *mut c_void,
        flags: c_uint,
    ) -> CUresult;
    #[link_name = "cuMemcpyHtoD_v2"]
    pub fn cuMemcpyHtoD(
        dst_device: CUdeviceptr,
        src_host: *const c_void,
        byte_count: size_t,
    ) -> CUresult;
    #[link_name = "cuMemcpyDtoH_v2"]
    pub fn cuMemcpyDtoH(
        dst_host: *mut c_void,
        src_device: CUdeviceptr,
        byte_count: size_t,
    ) -> CUresult;
    #[link_name = "cuMemcpyDtoD_v2"]
    pub fn cuMemcpyDtoD(
        dst_device: CUdeviceptr,
        src_device: CUdeviceptr,
        byte_count: size_t,
    ) -> CUresult;

    pub fn cuModuleLoadDataEx(
        module: *mut CUmodule,
        image: *const c_void,
        num_options: c_uint,
        options: *mut c_int,
        option_values: *mut *mut c_void,
    ) -> CUresult;
    pub fn cuModuleUnload(hmod: CUmodule) -> CUresult;
    pub fn cuModuleGetFunction(
        hfunc: *mut CUfunction,
        hmod: CUmodule,
        name: *const c_char,
    ) -> CUresult;
    pub fn cuModuleGetTexRef(
        p_tex_ref: *mut CUtexref,
        hmod: CUmodule,
        name: *const c_char,
    ) -> CUresult;

    pub fn cuLaunchKernel(
        f: CUfunction,
        grid_dim_x: c_uint,
        grid_dim_y: c_uint,
        grid_dim_z: c_uint,
        block_dim_x: c_uint,
        block_dim_y: c_uint,
        block_dim_z: c_uint,
        shared_mem_bytes: c_uint,
        h_stream: CUstream,
        kernel_params: *mut *mut c_void,
        extra: *mut *mut c_void,
    ) -> CUresult;

    pub fn cuEventCreate(phevent: *mut CUevent, flags: c_uint) -> CUresult;
    pub fn cuEventRecord(hevent: CUevent, h_stream: CUstream) -> CUresult;
    pub fn cuEventSynchronize(hevent: CUevent) -> CUresult;
    pub fn cuEventElapsedTime(p_milliseconds: *mut f32, hstart: CUevent, hend: CUevent)
        -> CUresult;
    #[link_name = "cuEventDestroy_v2"]
    pub fn cuEventDestroy(hevent: CUevent) -> CUresult;

    pub fn cuTexRefSetFormat(
        h_tex_ref: CUtexref,
        fmt: c_int,
        num_packed_components: c_int,
    ) -> CUresult;
    pub fn cuTexRefSetFlags(h_tex_ref: CUtexref, flags: c_uint) -> CUresult;
    #[link_name = "cuTexRefSetAddress_v2"]
    pub fn cuTexRefSetAddress(
        byte_offset: *mut size_t,
        h_tex_ref: CUtexref,
        dptr: CUdeviceptr,
        bytes: size_t,
    ) -> CUresult;
}
