//! Backend platform abstraction.
//!
//! A `Platform` owns the devices of one backend and exposes the uniform
//! capability set the dispatch core multiplexes over. Device indices
//! passed to these methods have already been validated against
//! `device_count` by the registry.

use std::os::raw::c_void;

use crate::args::KernelArgs;
use crate::error::Result;

mod host;

pub use self::host::HostPlatform;

#[cfg(feature = "cuda")]
mod cuda;
#[cfg(feature = "hsa")]
mod hsa;

#[cfg(feature = "cuda")]
pub use self::cuda::CudaPlatform;
#[cfg(feature = "hsa")]
pub use self::hsa::HsaPlatform;

/// Everything one kernel launch needs, gathered off the ABI call.
///
/// `grid` is the global work size in work-items per dimension; `block`
/// the work-group size. Backends that dispatch in blocks derive the
/// block count with ceiling division.
pub struct LaunchParams<'a> {
    pub file: &'a str,
    pub kernel: &'a str,
    pub grid: [u32; 3],
    pub block: [u32; 3],
    pub args: KernelArgs<'a>,
}

/// The capability set each backend implements.
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;

    fn device_count(&self) -> usize;

    /// Device-local allocation. `bytes` is non-zero (the registry short
    /// circuits zero-size requests).
    fn alloc(&self, dev: usize, bytes: usize) -> Result<*mut c_void>;

    /// Host-accessible allocation.
    fn alloc_host(&self, dev: usize, bytes: usize) -> Result<*mut c_void>;

    /// Unified (host+device visible) allocation.
    fn alloc_unified(&self, dev: usize, bytes: usize) -> Result<*mut c_void>;

    /// The device-visible address of a host-accessible pointer.
    fn get_device_ptr(&self, dev: usize, ptr: *mut c_void) -> Result<*mut c_void>;

    fn release(&self, dev: usize, ptr: *mut c_void) -> Result<()>;

    fn release_host(&self, dev: usize, ptr: *mut c_void) -> Result<()>;

    /// Copy between two buffers of this platform (possibly on different
    /// devices of the same backend). Offsets are in bytes.
    fn copy(
        &self,
        src_dev: usize,
        src: *const c_void,
        src_offset: usize,
        dst_dev: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()>;

    /// Copy host memory into a buffer of this platform.
    fn copy_from_host(
        &self,
        src: *const c_void,
        src_offset: usize,
        dst_dev: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()>;

    /// Copy a buffer of this platform out to host memory.
    fn copy_to_host(
        &self,
        src_dev: usize,
        src: *const c_void,
        src_offset: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()>;

    /// Compiles (or fetches from cache) and enqueues one kernel launch.
    /// Completion is asynchronous; `synchronize` drains the device.
    fn launch_kernel(&self, dev: usize, launch: &LaunchParams) -> Result<()>;

    /// Blocks until every launch previously issued on `dev` completed.
    fn synchronize(&self, dev: usize) -> Result<()>;

    /// Warms the program and kernel caches for (`file`, `kernel`).
    fn load_kernel(&self, dev: usize, file: &str, kernel: &str) -> Result<()>;

    /// Compiles `file` for `dev` and returns the backend-native binary
    /// without loading it.
    fn emit_binary(&self, dev: usize, file: &str) -> Result<Vec<u8>>;
}
