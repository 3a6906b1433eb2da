//! The runtime registry: platform ownership and ABI-call dispatch.
//!
//! One `Runtime` exists per process. It owns the backend platforms in
//! tag order, decodes device ids, validates arguments and routes each
//! operation to the right platform. Cross-platform copies that do not
//! touch host memory are staged through a host bounce buffer.

use std::env;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::device::{DeviceId, PlatformTag};
use crate::error::{Error, Result};
use crate::platform::{HostPlatform, LaunchParams, Platform};
use crate::source;

/// Process-wide flags and counters shared with the platforms.
///
/// Platforms hold this handle instead of a reference back to the
/// `Runtime`, which keeps ownership a strict tree: the runtime owns the
/// platforms, the platforms share the globals.
#[derive(Debug)]
pub struct Globals {
    profiling: bool,
    kernel_time_us: AtomicU64,
}

impl Globals {
    fn from_env() -> Globals {
        let profiling = match env::var("HCRT_PROFILE") {
            Ok(value) => {
                let value = value.to_ascii_lowercase();
                value == "1" || value == "full" || value == "on"
            }
            Err(_) => false,
        };
        Globals {
            profiling,
            kernel_time_us: AtomicU64::new(0),
        }
    }

    /// Whether per-launch timing is collected.
    pub fn profiling(&self) -> bool {
        self.profiling
    }

    /// Adds one launch's device time to the process total.
    pub fn add_kernel_time(&self, micros: u64) {
        self.kernel_time_us.fetch_add(micros, Ordering::Relaxed);
    }

    /// Accumulated device time over all profiled launches, microseconds.
    pub fn kernel_time(&self) -> u64 {
        self.kernel_time_us.load(Ordering::Relaxed)
    }
}

pub struct Runtime {
    platforms: Vec<Option<Box<dyn Platform>>>,
    globals: Arc<Globals>,
}

lazy_static! {
    static ref RUNTIME: Runtime = Runtime::new();
}

/// The process-wide runtime, constructed on first use.
pub fn runtime() -> &'static Runtime {
    &RUNTIME
}

#[cfg(any(feature = "hsa", feature = "cuda"))]
fn init_platform(
    tag: PlatformTag,
    result: Result<Box<dyn Platform>>,
) -> Option<Box<dyn Platform>> {
    // A backend that was compiled in but cannot come up is fatal: the
    // generated host code depends on its devices existing.
    match result {
        Ok(platform) => Some(platform),
        Err(err) => {
            eprintln!("hcrt: failed to initialize {} platform: {}", tag.name(), err);
            std::process::exit(1);
        }
    }
}

impl Runtime {
    fn new() -> Runtime {
        let globals = Arc::new(Globals::from_env());
        let mut platforms: Vec<Option<Box<dyn Platform>>> =
            (0..PlatformTag::COUNT).map(|_| None).collect();

        platforms[PlatformTag::Host as usize] = Some(Box::new(HostPlatform::new()));
        #[cfg(feature = "cuda")]
        {
            platforms[PlatformTag::Cuda as usize] = init_platform(
                PlatformTag::Cuda,
                crate::platform::CudaPlatform::new(globals.clone())
                    .map(|p| Box::new(p) as Box<dyn Platform>),
            );
        }
        #[cfg(feature = "hsa")]
        {
            platforms[PlatformTag::Hsa as usize] = init_platform(
                PlatformTag::Hsa,
                crate::platform::HsaPlatform::new(globals.clone())
                    .map(|p| Box::new(p) as Box<dyn Platform>),
            );
        }

        Runtime { platforms, globals }
    }

    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    fn platform(&self, tag: PlatformTag) -> Result<&dyn Platform> {
        self.platforms[tag as usize]
            .as_deref()
            .ok_or(Error::PlatformNotRegistered(tag.name()))
    }

    /// Decodes `id` and validates the device index against the platform.
    fn resolve(&self, id: DeviceId) -> Result<(PlatformTag, &dyn Platform, usize)> {
        let (tag, index) = id.decode()?;
        let platform = self.platform(tag)?;
        if index >= platform.device_count() {
            return Err(Error::InvalidDeviceIndex {
                platform: platform.name(),
                index,
                count: platform.device_count(),
            });
        }
        Ok((tag, platform, index))
    }

    fn checked_size(bytes: i64) -> Result<usize> {
        if bytes < 0 {
            Err(Error::NegativeSize(bytes))
        } else {
            Ok(bytes as usize)
        }
    }

    pub fn alloc(&self, id: DeviceId, bytes: i64) -> Result<*mut c_void> {
        let bytes = Self::checked_size(bytes)?;
        if bytes == 0 {
            return Ok(std::ptr::null_mut());
        }
        let (_, platform, dev) = self.resolve(id)?;
        platform.alloc(dev, bytes)
    }

    pub fn alloc_host(&self, id: DeviceId, bytes: i64) -> Result<*mut c_void> {
        let bytes = Self::checked_size(bytes)?;
        if bytes == 0 {
            return Ok(std::ptr::null_mut());
        }
        let (_, platform, dev) = self.resolve(id)?;
        platform.alloc_host(dev, bytes)
    }

    pub fn alloc_unified(&self, id: DeviceId, bytes: i64) -> Result<*mut c_void> {
        let bytes = Self::checked_size(bytes)?;
        if bytes == 0 {
            return Ok(std::ptr::null_mut());
        }
        let (_, platform, dev) = self.resolve(id)?;
        platform.alloc_unified(dev, bytes)
    }

    pub fn get_device_ptr(&self, id: DeviceId, ptr: *mut c_void) -> Result<*mut c_void> {
        let (_, platform, dev) = self.resolve(id)?;
        platform.get_device_ptr(dev, ptr)
    }

    pub fn release(&self, id: DeviceId, ptr: *mut c_void) -> Result<()> {
        if ptr.is_null() {
            return Ok(());
        }
        let (_, platform, dev) = self.resolve(id)?;
        platform.release(dev, ptr)
    }

    pub fn release_host(&self, id: DeviceId, ptr: *mut c_void) -> Result<()> {
        if ptr.is_null() {
            return Ok(());
        }
        let (_, platform, dev) = self.resolve(id)?;
        platform.release_host(dev, ptr)
    }

    /// Copies `bytes` from (`src` + `src_offset`) on `src_id` to
    /// (`dst` + `dst_offset`) on `dst_id`.
    ///
    /// Same-platform copies delegate to the backend (device-side DMA
    /// where it has one). Copies with one host endpoint use the
    /// accelerator's host entry points. Copies between two distinct
    /// accelerator platforms stage through a host bounce buffer.
    pub fn copy(
        &self,
        src_id: DeviceId,
        src: *const c_void,
        src_offset: i64,
        dst_id: DeviceId,
        dst: *mut c_void,
        dst_offset: i64,
        bytes: i64,
    ) -> Result<()> {
        let bytes = Self::checked_size(bytes)?;
        let src_offset = Self::checked_size(src_offset)?;
        let dst_offset = Self::checked_size(dst_offset)?;
        if bytes == 0 {
            return Ok(());
        }

        let (src_tag, src_platform, src_dev) = self.resolve(src_id)?;
        let (dst_tag, dst_platform, dst_dev) = self.resolve(dst_id)?;

        if src_tag == dst_tag {
            return src_platform.copy(src_dev, src, src_offset, dst_dev, dst, dst_offset, bytes);
        }
        if src_tag == PlatformTag::Host {
            return dst_platform.copy_from_host(src, src_offset, dst_dev, dst, dst_offset, bytes);
        }
        if dst_tag == PlatformTag::Host {
            return src_platform.copy_to_host(src_dev, src, src_offset, dst, dst_offset, bytes);
        }

        let mut staging = vec![0u8; bytes];
        src_platform.copy_to_host(
            src_dev,
            src,
            src_offset,
            staging.as_mut_ptr() as *mut c_void,
            0,
            bytes,
        )?;
        dst_platform.copy_from_host(
            staging.as_ptr() as *const c_void,
            0,
            dst_dev,
            dst,
            dst_offset,
            bytes,
        )
    }

    pub fn launch_kernel(&self, id: DeviceId, launch: &LaunchParams) -> Result<()> {
        let (_, platform, dev) = self.resolve(id)?;
        platform.launch_kernel(dev, launch)
    }

    pub fn synchronize(&self, id: DeviceId) -> Result<()> {
        let (_, platform, dev) = self.resolve(id)?;
        platform.synchronize(dev)
    }

    pub fn load_kernel(&self, id: DeviceId, file: &str, kernel: &str) -> Result<()> {
        let (_, platform, dev) = self.resolve(id)?;
        platform.load_kernel(dev, file, kernel)
    }

    pub fn emit_binary(&self, id: DeviceId, file: &str) -> Result<Vec<u8>> {
        let (_, platform, dev) = self.resolve(id)?;
        platform.emit_binary(dev, file)
    }

    /// Registers in-memory program text. The device id is accepted for
    /// ABI symmetry; the registry is process-wide.
    pub fn register_file(&self, _id: DeviceId, path: &str, text: &str) {
        source::register_file(path, text);
    }

    /// Accumulated kernel time over all profiled launches, microseconds.
    pub fn kernel_time(&self) -> u64 {
        self.globals.kernel_time()
    }
}
