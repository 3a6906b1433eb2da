//! The host CPU platform.
//!
//! Host memory doubles as the staging endpoint for every cross-platform
//! copy, so allocations are cache-line aligned. Kernel launches are not
//! routed through the runtime on the host: host-side kernels are
//! compiled straight into the calling binary, and asking this platform
//! to launch or JIT one is a caller error.

use std::os::raw::c_void;
use std::{io, ptr};

use crate::error::{Error, Result};
use crate::platform::{LaunchParams, Platform};

const ALLOC_ALIGN: usize = 64;

#[derive(Debug, Default)]
pub struct HostPlatform;

impl HostPlatform {
    pub fn new() -> HostPlatform {
        HostPlatform
    }

    fn aligned_alloc(&self, bytes: usize) -> Result<*mut c_void> {
        let mut ptr = ptr::null_mut();
        let code = unsafe { libc::posix_memalign(&mut ptr, ALLOC_ALIGN, bytes) };
        if code != 0 {
            return Err(Error::Io(io::Error::from_raw_os_error(code)));
        }
        Ok(ptr)
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            platform: "host",
            operation,
        }
    }
}

impl Platform for HostPlatform {
    fn name(&self) -> &'static str {
        "host"
    }

    fn device_count(&self) -> usize {
        1
    }

    fn alloc(&self, _dev: usize, bytes: usize) -> Result<*mut c_void> {
        self.aligned_alloc(bytes)
    }

    fn alloc_host(&self, _dev: usize, bytes: usize) -> Result<*mut c_void> {
        self.aligned_alloc(bytes)
    }

    fn alloc_unified(&self, _dev: usize, bytes: usize) -> Result<*mut c_void> {
        self.aligned_alloc(bytes)
    }

    fn get_device_ptr(&self, _dev: usize, ptr: *mut c_void) -> Result<*mut c_void> {
        Ok(ptr)
    }

    fn release(&self, _dev: usize, ptr: *mut c_void) -> Result<()> {
        unsafe { libc::free(ptr) };
        Ok(())
    }

    fn release_host(&self, dev: usize, ptr: *mut c_void) -> Result<()> {
        self.release(dev, ptr)
    }

    fn copy(
        &self,
        _src_dev: usize,
        src: *const c_void,
        src_offset: usize,
        _dst_dev: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()> {
        // memmove semantics; a buffer may be copied onto itself at an
        // overlapping offset.
        unsafe {
            ptr::copy(
                (src as *const u8).add(src_offset),
                (dst as *mut u8).add(dst_offset),
                bytes,
            );
        }
        Ok(())
    }

    fn copy_from_host(
        &self,
        src: *const c_void,
        src_offset: usize,
        dst_dev: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()> {
        self.copy(0, src, src_offset, dst_dev, dst, dst_offset, bytes)
    }

    fn copy_to_host(
        &self,
        src_dev: usize,
        src: *const c_void,
        src_offset: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()> {
        self.copy(src_dev, src, src_offset, 0, dst, dst_offset, bytes)
    }

    fn launch_kernel(&self, _dev: usize, _launch: &LaunchParams) -> Result<()> {
        Err(self.unsupported("launch_kernel"))
    }

    fn synchronize(&self, _dev: usize) -> Result<()> {
        // Host operations complete before their call returns.
        Ok(())
    }

    fn load_kernel(&self, _dev: usize, _file: &str, _kernel: &str) -> Result<()> {
        Err(self.unsupported("load_kernel"))
    }

    fn emit_binary(&self, _dev: usize, _file: &str) -> Result<Vec<u8>> {
        Err(self.unsupported("emit_binary"))
    }
}
