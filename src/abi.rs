//! The C ABI facade.
//!
//! Stateless forwarders from the flat ABI types to the runtime registry.
//! This is the single place the fatal error policy lives: any error that
//! reaches an ABI entry point is printed and the process exits non-zero,
//! because a failed device operation is not recoverable for the
//! generated host code calling in.

use std::ffi::CStr;
use std::io::Write;
use std::os::raw::{c_char, c_void};
use std::{io, process, slice};

use crate::args::{ArgType, KernelArgs};
use crate::device::DeviceId;
use crate::error::Result;
use crate::platform::LaunchParams;
use crate::registry::runtime;

fn fail(err: crate::error::Error) -> ! {
    log::error!("{}", err);
    eprintln!("hcrt: {}", err);
    process::exit(1);
}

fn check<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fail(err),
    }
}

unsafe fn cstr<'a>(ptr: *const c_char) -> &'a str {
    debug_assert!(!ptr.is_null());
    match CStr::from_ptr(ptr).to_str() {
        Ok(text) => text,
        Err(err) => fail(crate::error::Error::Codegen {
            stage: "abi string decoding",
            detail: err.to_string(),
        }),
    }
}

#[no_mangle]
pub extern "C" fn hcrt_alloc(dev: i32, size: i64) -> *mut c_void {
    check(runtime().alloc(DeviceId::new(dev), size))
}

#[no_mangle]
pub extern "C" fn hcrt_alloc_host(dev: i32, size: i64) -> *mut c_void {
    check(runtime().alloc_host(DeviceId::new(dev), size))
}

#[no_mangle]
pub extern "C" fn hcrt_alloc_unified(dev: i32, size: i64) -> *mut c_void {
    check(runtime().alloc_unified(DeviceId::new(dev), size))
}

#[no_mangle]
pub extern "C" fn hcrt_get_device_ptr(dev: i32, ptr: *mut c_void) -> *mut c_void {
    check(runtime().get_device_ptr(DeviceId::new(dev), ptr))
}

#[no_mangle]
pub extern "C" fn hcrt_release(dev: i32, ptr: *mut c_void) {
    check(runtime().release(DeviceId::new(dev), ptr))
}

#[no_mangle]
pub extern "C" fn hcrt_release_host(dev: i32, ptr: *mut c_void) {
    check(runtime().release_host(DeviceId::new(dev), ptr))
}

#[no_mangle]
pub extern "C" fn hcrt_copy(
    src_dev: i32,
    src: *const c_void,
    src_offset: i64,
    dst_dev: i32,
    dst: *mut c_void,
    dst_offset: i64,
    size: i64,
) {
    check(runtime().copy(
        DeviceId::new(src_dev),
        src,
        src_offset,
        DeviceId::new(dst_dev),
        dst,
        dst_offset,
        size,
    ))
}

/// Launches `kernel` from `file` on `dev`.
///
/// `grid` and `block` are arrays of three extents (work-items and
/// work-group sizes). `args`/`sizes` carry `num_args` argument pointers
/// and byte sizes; `types` is an optional array of interpretation tags
/// and may be null.
#[no_mangle]
pub unsafe extern "C" fn hcrt_launch_kernel(
    dev: i32,
    file: *const c_char,
    kernel: *const c_char,
    grid: *const u32,
    block: *const u32,
    args: *mut *mut c_void,
    sizes: *const u32,
    types: *const i32,
    num_args: u32,
) {
    let num_args = num_args as usize;
    let grid = slice::from_raw_parts(grid, 3);
    let block = slice::from_raw_parts(block, 3);

    let ptrs: Vec<*const c_void> = if num_args == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(args, num_args)
            .iter()
            .map(|&p| p as *const c_void)
            .collect()
    };
    let arg_sizes: Vec<usize> = if num_args == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(sizes, num_args)
            .iter()
            .map(|&s| s as usize)
            .collect()
    };
    let arg_types: Vec<ArgType> = if types.is_null() || num_args == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(types, num_args)
            .iter()
            .map(|&t| ArgType::from_i32(t))
            .collect()
    };

    let launch = LaunchParams {
        file: cstr(file),
        kernel: cstr(kernel),
        grid: [grid[0], grid[1], grid[2]],
        block: [block[0], block[1], block[2]],
        args: KernelArgs::new(&ptrs, &arg_sizes, &arg_types),
    };
    check(runtime().launch_kernel(DeviceId::new(dev), &launch))
}

#[no_mangle]
pub extern "C" fn hcrt_synchronize(dev: i32) {
    check(runtime().synchronize(DeviceId::new(dev)))
}

#[no_mangle]
pub unsafe extern "C" fn hcrt_load_kernel(dev: i32, file: *const c_char, kernel: *const c_char) {
    check(runtime().load_kernel(DeviceId::new(dev), cstr(file), cstr(kernel)))
}

#[no_mangle]
pub unsafe extern "C" fn hcrt_register_file(dev: i32, path: *const c_char, text: *const c_char) {
    runtime().register_file(DeviceId::new(dev), cstr(path), cstr(text));
}

/// Accumulated device time over all profiled launches, in microseconds.
#[no_mangle]
pub extern "C" fn hcrt_get_kernel_time() -> u64 {
    runtime().kernel_time()
}

#[no_mangle]
pub extern "C" fn hcrt_print_i16(value: i16) {
    eprint!("{}", value);
}

#[no_mangle]
pub extern "C" fn hcrt_print_i32(value: i32) {
    eprint!("{}", value);
}

#[no_mangle]
pub extern "C" fn hcrt_print_i64(value: i64) {
    eprint!("{}", value);
}

#[no_mangle]
pub extern "C" fn hcrt_print_f32(value: f32) {
    eprint!("{}", value);
}

#[no_mangle]
pub extern "C" fn hcrt_print_f64(value: f64) {
    eprint!("{}", value);
}

#[no_mangle]
pub unsafe extern "C" fn hcrt_print_string(text: *const c_char) {
    eprint!("{}", cstr(text));
}

#[no_mangle]
pub extern "C" fn hcrt_print_flush() {
    let _ = io::stderr().flush();
}
