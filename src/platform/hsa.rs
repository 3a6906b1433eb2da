//! The HSA accelerator platform.
//!
//! One `HsaDevice` per agent: a single-producer queue at the agent's
//! maximum size, a completion signal whose value always equals the
//! number of in-flight launches, the tagged memory regions and the
//! two-level program/kernel cache. Launches build an AQL kernel
//! dispatch packet by hand and ring the doorbell; synchronization waits
//! for the completion signal to drain to zero.
//!
//! With profiling enabled each launch gets its own completion signal
//! which is handed to a per-device reaper thread over a bounded
//! channel. The reaper is the only decrementer of the device signal and
//! the launch path the only incrementer, so the signal value is exact
//! at all times.

use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use hcrt_sys::hsa as ffi;

use crate::args;
use crate::cache::ModuleCache;
use crate::codegen;
use crate::error::{ApiError, Error, Result};
use crate::grid;
use crate::platform::{LaunchParams, Platform};
use crate::registry::Globals;
use crate::source;

const REAPER_QUEUE_DEPTH: usize = 64;

#[inline]
fn check(function: &'static str, status: ffi::hsa_status_t) -> Result<()> {
    ApiError::check("HSA", function, status, ffi::status_name(status))
}

/// Resolved kernel symbol data, cached per (executable, name).
#[derive(Debug, Clone, Copy)]
struct KernelInfo {
    kernel_object: u64,
    kernarg_segment_size: u32,
    group_segment_size: u32,
    private_segment_size: u32,
}

/// Tagged global memory regions of one agent.
#[derive(Debug, Default, Clone, Copy)]
struct Regions {
    kernarg: Option<ffi::hsa_region_t>,
    fine_grained: Option<ffi::hsa_region_t>,
    coarse_grained: Option<ffi::hsa_region_t>,
}

struct ProfileRecord {
    signal: ffi::hsa_signal_t,
}

/// Per-device completion reaper. Dropping it closes the channel and
/// joins the thread, which drains outstanding records first.
struct Reaper {
    tx: Option<Sender<ProfileRecord>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Reaper {
    fn spawn(
        agent: ffi::hsa_agent_t,
        device_signal: ffi::hsa_signal_t,
        timestamp_freq: u64,
        globals: Arc<Globals>,
    ) -> Result<Reaper> {
        let (tx, rx) = bounded::<ProfileRecord>(REAPER_QUEUE_DEPTH);
        let thread = thread::Builder::new()
            .name("hcrt-hsa-reaper".to_string())
            .spawn(move || {
                for record in rx.iter() {
                    unsafe {
                        ffi::hsa_signal_wait_scacquire(
                            record.signal,
                            ffi::HSA_SIGNAL_CONDITION_LT,
                            1,
                            u64::MAX,
                            ffi::HSA_WAIT_STATE_BLOCKED,
                        );
                        let mut time = ffi::hsa_amd_profiling_dispatch_time_t::default();
                        let status = ffi::hsa_amd_profiling_get_dispatch_time(
                            agent,
                            record.signal,
                            &mut time,
                        );
                        if status == ffi::HSA_STATUS_SUCCESS && time.end >= time.start {
                            let micros = (time.end - time.start) as u128 * 1_000_000
                                / timestamp_freq as u128;
                            globals.add_kernel_time(micros as u64);
                        } else {
                            log::warn!(
                                "dispatch timestamps unavailable: {}",
                                ffi::status_name(status)
                            );
                        }
                        ffi::hsa_signal_subtract_screlease(device_signal, 1);
                        ffi::hsa_signal_destroy(record.signal);
                    }
                }
            })?;
        Ok(Reaper {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    fn submit(&self, record: ProfileRecord) {
        if let Some(ref tx) = self.tx {
            // Bounded send: launch bursts beyond the queue depth apply
            // backpressure to the launching thread.
            let _ = tx.send(record);
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct HsaDevice {
    agent: ffi::hsa_agent_t,
    name: String,
    isa: String,
    profile: u32,
    float_mode: u32,
    kernel_dispatch: bool,
    queue: *mut ffi::hsa_queue_t,
    queue_size: u32,
    signal: ffi::hsa_signal_t,
    regions: Regions,
    cache: ModuleCache<u64, KernelInfo>,
    // Kernarg blocks of launches not yet known to be complete; freed
    // once the device drains.
    kernargs: Mutex<Vec<usize>>,
    reaper: Option<Reaper>,
}

impl HsaDevice {
    fn free_retired_kernargs(&self) {
        let retired: Vec<usize> = self.kernargs.lock().unwrap().drain(..).collect();
        for address in retired {
            unsafe {
                ffi::hsa_memory_free(address as *mut c_void);
            }
        }
    }
}

unsafe impl Send for HsaDevice {}
unsafe impl Sync for HsaDevice {}

pub struct HsaPlatform {
    devices: Vec<HsaDevice>,
    globals: Arc<Globals>,
}

extern "C" fn gather_agents(agent: ffi::hsa_agent_t, data: *mut c_void) -> ffi::hsa_status_t {
    let agents = unsafe { &mut *(data as *mut Vec<ffi::hsa_agent_t>) };
    agents.push(agent);
    ffi::HSA_STATUS_SUCCESS
}

extern "C" fn gather_regions(region: ffi::hsa_region_t, data: *mut c_void) -> ffi::hsa_status_t {
    let regions = unsafe { &mut *(data as *mut Regions) };

    let mut segment: u32 = 0;
    let status = unsafe {
        ffi::hsa_region_get_info(
            region,
            ffi::HSA_REGION_INFO_SEGMENT,
            &mut segment as *mut u32 as *mut c_void,
        )
    };
    if status != ffi::HSA_STATUS_SUCCESS {
        return status;
    }
    if segment != ffi::HSA_REGION_SEGMENT_GLOBAL {
        return ffi::HSA_STATUS_SUCCESS;
    }

    let mut flags: u32 = 0;
    let status = unsafe {
        ffi::hsa_region_get_info(
            region,
            ffi::HSA_REGION_INFO_GLOBAL_FLAGS,
            &mut flags as *mut u32 as *mut c_void,
        )
    };
    if status != ffi::HSA_STATUS_SUCCESS {
        return status;
    }

    if flags & ffi::HSA_REGION_GLOBAL_FLAG_KERNARG != 0 {
        regions.kernarg.get_or_insert(region);
    }
    if flags & ffi::HSA_REGION_GLOBAL_FLAG_FINE_GRAINED != 0 {
        regions.fine_grained.get_or_insert(region);
    }
    if flags & ffi::HSA_REGION_GLOBAL_FLAG_COARSE_GRAINED != 0 {
        regions.coarse_grained.get_or_insert(region);
    }
    ffi::HSA_STATUS_SUCCESS
}

unsafe fn agent_info<T>(
    agent: ffi::hsa_agent_t,
    attribute: u32,
    function: &'static str,
) -> Result<T> {
    let mut value = MaybeUninit::<T>::uninit();
    let status =
        ffi::hsa_agent_get_info(agent, attribute, value.as_mut_ptr() as *mut c_void);
    check(function, status)?;
    Ok(value.assume_init())
}

fn fixed_string(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

/// Reads the agent's ISA and reduces the full target name
/// (`amdgcn-amd-amdhsa--gfx906`) to the `gfx…` component the code
/// generator needs.
unsafe fn agent_isa(agent: ffi::hsa_agent_t) -> Result<String> {
    let isa: ffi::hsa_isa_t = agent_info(agent, ffi::HSA_AGENT_INFO_ISA, "hsa_agent_get_info")?;

    let mut length: u32 = 0;
    check("hsa_isa_get_info_alt", {
        ffi::hsa_isa_get_info_alt(
            isa,
            ffi::HSA_ISA_INFO_NAME_LENGTH,
            &mut length as *mut u32 as *mut c_void,
        )
    })?;
    let mut buffer = vec![0u8; length as usize];
    check("hsa_isa_get_info_alt", {
        ffi::hsa_isa_get_info_alt(
            isa,
            ffi::HSA_ISA_INFO_NAME,
            buffer.as_mut_ptr() as *mut c_void,
        )
    })?;

    let full = fixed_string(&buffer);
    let short = full
        .rsplit('-')
        .find(|part| !part.is_empty())
        .unwrap_or("")
        .to_string();
    Ok(short)
}

impl HsaDevice {
    unsafe fn open(
        agent: ffi::hsa_agent_t,
        timestamp_freq: u64,
        globals: &Arc<Globals>,
    ) -> Result<HsaDevice> {
        let name: [u8; 64] = agent_info(agent, ffi::HSA_AGENT_INFO_NAME, "hsa_agent_get_info")?;
        let vendor: [u8; 64] =
            agent_info(agent, ffi::HSA_AGENT_INFO_VENDOR_NAME, "hsa_agent_get_info")?;
        let device_type: u32 =
            agent_info(agent, ffi::HSA_AGENT_INFO_DEVICE, "hsa_agent_get_info")?;
        let feature: u32 =
            agent_info(agent, ffi::HSA_AGENT_INFO_FEATURE, "hsa_agent_get_info")?;
        let profile: u32 =
            agent_info(agent, ffi::HSA_AGENT_INFO_PROFILE, "hsa_agent_get_info")?;
        let float_mode: u32 = agent_info(
            agent,
            ffi::HSA_AGENT_INFO_DEFAULT_FLOAT_ROUNDING_MODE,
            "hsa_agent_get_info",
        )?;
        let version_major: u16 =
            agent_info(agent, ffi::HSA_AGENT_INFO_VERSION_MAJOR, "hsa_agent_get_info")?;
        let version_minor: u16 =
            agent_info(agent, ffi::HSA_AGENT_INFO_VERSION_MINOR, "hsa_agent_get_info")?;

        let kernel_dispatch = feature & ffi::HSA_AGENT_FEATURE_KERNEL_DISPATCH != 0;
        let name = fixed_string(&name);
        let vendor = fixed_string(&vendor);
        let isa = if device_type == ffi::HSA_DEVICE_TYPE_GPU {
            agent_isa(agent)?
        } else {
            String::new()
        };

        log::info!(
            "hsa agent: {} ({}), type {}, profile {}, isa '{}', version {}.{}",
            name,
            vendor,
            device_type,
            profile,
            isa,
            version_major,
            version_minor
        );

        let mut queue = std::ptr::null_mut();
        let mut queue_size = 0;
        if kernel_dispatch {
            queue_size =
                agent_info::<u32>(agent, ffi::HSA_AGENT_INFO_QUEUE_MAX_SIZE, "hsa_agent_get_info")?;
            check(
                "hsa_queue_create",
                ffi::hsa_queue_create(
                    agent,
                    queue_size,
                    ffi::HSA_QUEUE_TYPE_SINGLE,
                    None,
                    std::ptr::null_mut(),
                    u32::MAX,
                    u32::MAX,
                    &mut queue,
                ),
            )?;
            if globals.profiling() {
                check(
                    "hsa_amd_profiling_set_profiler_enabled",
                    ffi::hsa_amd_profiling_set_profiler_enabled(queue, 1),
                )?;
            }
        }

        let mut signal = ffi::hsa_signal_t { handle: 0 };
        check(
            "hsa_signal_create",
            ffi::hsa_signal_create(0, 0, std::ptr::null(), &mut signal),
        )?;

        let mut regions = Regions::default();
        check(
            "hsa_agent_iterate_regions",
            ffi::hsa_agent_iterate_regions(
                agent,
                gather_regions,
                &mut regions as *mut Regions as *mut c_void,
            ),
        )?;

        let reaper = if globals.profiling() && kernel_dispatch {
            Some(Reaper::spawn(agent, signal, timestamp_freq, globals.clone())?)
        } else {
            None
        };

        Ok(HsaDevice {
            agent,
            name,
            isa,
            profile,
            float_mode,
            kernel_dispatch,
            queue,
            queue_size,
            signal,
            regions,
            cache: ModuleCache::new(),
            kernargs: Mutex::new(Vec::new()),
            reaper,
        })
    }

    fn region(&self, region: Option<ffi::hsa_region_t>, kind: &'static str) -> Result<ffi::hsa_region_t> {
        region.ok_or(Error::Unsupported {
            platform: "hsa",
            operation: kind,
        })
    }
}

impl HsaPlatform {
    pub fn new(globals: Arc<Globals>) -> Result<HsaPlatform> {
        unsafe {
            check("hsa_init", ffi::hsa_init())?;

            let mut timestamp_freq: u64 = 0;
            check(
                "hsa_system_get_info",
                ffi::hsa_system_get_info(
                    ffi::HSA_SYSTEM_INFO_TIMESTAMP_FREQUENCY,
                    &mut timestamp_freq as *mut u64 as *mut c_void,
                ),
            )?;
            log::info!("hsa system timestamp frequency: {} Hz", timestamp_freq);

            let mut agents: Vec<ffi::hsa_agent_t> = Vec::new();
            let status = ffi::hsa_iterate_agents(
                gather_agents,
                &mut agents as *mut Vec<ffi::hsa_agent_t> as *mut c_void,
            );
            if status != ffi::HSA_STATUS_INFO_BREAK {
                check("hsa_iterate_agents", status)?;
            }

            let mut devices = Vec::with_capacity(agents.len());
            for agent in agents {
                devices.push(HsaDevice::open(agent, timestamp_freq, &globals)?);
            }

            Ok(HsaPlatform { devices, globals })
        }
    }

    fn device(&self, dev: usize) -> &HsaDevice {
        &self.devices[dev]
    }

    /// Loads (or compiles) `file` for `device` and returns the frozen
    /// executable handle. Runs entirely outside the device cache lock.
    fn load_program(&self, device: &HsaDevice, file: &str) -> Result<u64> {
        let binary = self.program_binary(device, file)?;

        unsafe {
            let mut reader = ffi::hsa_code_object_reader_t { handle: 0 };
            check(
                "hsa_code_object_reader_create_from_memory",
                ffi::hsa_code_object_reader_create_from_memory(
                    binary.as_ptr() as *const c_void,
                    binary.len(),
                    &mut reader,
                ),
            )?;

            let mut executable = ffi::hsa_executable_t { handle: 0 };
            check(
                "hsa_executable_create_alt",
                ffi::hsa_executable_create_alt(
                    device.profile,
                    device.float_mode,
                    std::ptr::null(),
                    &mut executable,
                ),
            )?;
            check(
                "hsa_executable_load_agent_code_object",
                ffi::hsa_executable_load_agent_code_object(
                    executable,
                    device.agent,
                    reader,
                    std::ptr::null(),
                    std::ptr::null_mut(),
                ),
            )?;
            check(
                "hsa_executable_freeze",
                ffi::hsa_executable_freeze(executable, std::ptr::null()),
            )?;

            let mut invalid: u32 = 0;
            check(
                "hsa_executable_validate",
                ffi::hsa_executable_validate(executable, &mut invalid),
            )?;
            if invalid != 0 {
                log::warn!("executable for '{}' failed validation ({})", file, invalid);
            }

            check(
                "hsa_code_object_reader_destroy",
                ffi::hsa_code_object_reader_destroy(reader),
            )?;

            Ok(executable.handle)
        }
    }

    /// The native code object for `file`: loaded verbatim for `.gcn`,
    /// produced by the code generator for `.ll`.
    fn program_binary(&self, device: &HsaDevice, file: &str) -> Result<Vec<u8>> {
        match std::path::Path::new(file).extension().and_then(|e| e.to_str()) {
            Some("gcn") => source::load_file_bytes(file),
            Some("ll") => {
                let ir = source::load_file(file)?;
                log::debug!("jit-compiling '{}' for {}", file, device.isa);
                codegen::compile(&ir, &device.isa, &codegen::CodegenOptions::default())
            }
            _ => Err(Error::UnsupportedExtension(file.to_string())),
        }
    }

    /// Resolves the kernel descriptor symbol and reads the dispatch data.
    fn load_symbol(&self, device: &HsaDevice, executable: u64, name: &str) -> Result<KernelInfo> {
        let executable = ffi::hsa_executable_t { handle: executable };

        unsafe {
            let mut symbol = ffi::hsa_executable_symbol_t { handle: 0 };
            // Code objects export the kernel descriptor under `name.kd`;
            // older ones under the bare name.
            let descriptor = CString::new(format!("{}.kd", name))?;
            let mut status = ffi::hsa_executable_get_symbol_by_name(
                executable,
                descriptor.as_ptr(),
                &device.agent,
                &mut symbol,
            );
            if status != ffi::HSA_STATUS_SUCCESS {
                let bare = CString::new(name)?;
                status = ffi::hsa_executable_get_symbol_by_name(
                    executable,
                    bare.as_ptr(),
                    &device.agent,
                    &mut symbol,
                );
            }
            check("hsa_executable_get_symbol_by_name", status)?;

            let mut info = KernelInfo {
                kernel_object: 0,
                kernarg_segment_size: 0,
                group_segment_size: 0,
                private_segment_size: 0,
            };
            check(
                "hsa_executable_symbol_get_info",
                ffi::hsa_executable_symbol_get_info(
                    symbol,
                    ffi::HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_OBJECT,
                    &mut info.kernel_object as *mut u64 as *mut c_void,
                ),
            )?;
            check(
                "hsa_executable_symbol_get_info",
                ffi::hsa_executable_symbol_get_info(
                    symbol,
                    ffi::HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_KERNARG_SEGMENT_SIZE,
                    &mut info.kernarg_segment_size as *mut u32 as *mut c_void,
                ),
            )?;
            check(
                "hsa_executable_symbol_get_info",
                ffi::hsa_executable_symbol_get_info(
                    symbol,
                    ffi::HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_GROUP_SEGMENT_SIZE,
                    &mut info.group_segment_size as *mut u32 as *mut c_void,
                ),
            )?;
            check(
                "hsa_executable_symbol_get_info",
                ffi::hsa_executable_symbol_get_info(
                    symbol,
                    ffi::HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_PRIVATE_SEGMENT_SIZE,
                    &mut info.private_segment_size as *mut u32 as *mut c_void,
                ),
            )?;

            Ok(info)
        }
    }

    /// The two-level cache protocol: program by file, then kernel by
    /// (program, name). Compilation and symbol resolution run with the
    /// cache lock released; a racing duplicate executable is destroyed.
    fn kernel_info(&self, dev: usize, file: &str, name: &str) -> Result<KernelInfo> {
        let device = self.device(dev);

        let (executable, loser) = device
            .cache
            .program_or_load(file, || self.load_program(device, file))?;
        if let Some(duplicate) = loser {
            unsafe {
                ffi::hsa_executable_destroy(ffi::hsa_executable_t { handle: duplicate });
            }
        }

        device
            .cache
            .kernel_or_load(executable, name, || self.load_symbol(device, executable, name))
    }
}

impl Platform for HsaPlatform {
    fn name(&self) -> &'static str {
        "hsa"
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn alloc(&self, dev: usize, bytes: usize) -> Result<*mut c_void> {
        let device = self.device(dev);
        let region = device.region(device.regions.coarse_grained, "device-local allocation")?;
        let mut ptr = std::ptr::null_mut();
        check("hsa_memory_allocate", unsafe {
            ffi::hsa_memory_allocate(region, bytes, &mut ptr)
        })?;
        Ok(ptr)
    }

    fn alloc_host(&self, dev: usize, bytes: usize) -> Result<*mut c_void> {
        let device = self.device(dev);
        let region = device.region(device.regions.fine_grained, "host-accessible allocation")?;
        let mut ptr = std::ptr::null_mut();
        check("hsa_memory_allocate", unsafe {
            ffi::hsa_memory_allocate(region, bytes, &mut ptr)
        })?;
        Ok(ptr)
    }

    fn alloc_unified(&self, dev: usize, bytes: usize) -> Result<*mut c_void> {
        // Fine-grained global memory is coherently visible on both ends.
        self.alloc_host(dev, bytes)
    }

    fn get_device_ptr(&self, _dev: usize, ptr: *mut c_void) -> Result<*mut c_void> {
        Ok(ptr)
    }

    fn release(&self, _dev: usize, ptr: *mut c_void) -> Result<()> {
        check("hsa_memory_free", unsafe { ffi::hsa_memory_free(ptr) })
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
        check("hsa_memory_copy", unsafe {
            ffi::hsa_memory_copy(
                (dst as *mut u8).add(dst_offset) as *mut c_void,
                (src as *const u8).add(src_offset) as *const c_void,
                bytes,
            )
        })
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

    fn launch_kernel(&self, dev: usize, launch: &LaunchParams) -> Result<()> {
        let device = self.device(dev);
        if !device.kernel_dispatch {
            return Err(Error::Unsupported {
                platform: "hsa",
                operation: "launch_kernel",
            });
        }

        let info = self.kernel_info(dev, launch.file, launch.kernel)?;

        // Kernarg block, sized to what the kernel declares.
        let mut kernarg_address = std::ptr::null_mut();
        if info.kernarg_segment_size > 0 {
            let region = device.region(device.regions.kernarg, "kernarg allocation")?;
            check("hsa_memory_allocate", unsafe {
                ffi::hsa_memory_allocate(
                    region,
                    info.kernarg_segment_size as usize,
                    &mut kernarg_address,
                )
            })?;
        }
        let declared = info.kernarg_segment_size as usize;
        let packed = unsafe {
            if kernarg_address.is_null() {
                args::pack(&launch.args, &mut [])
            } else {
                args::pack(
                    &launch.args,
                    std::slice::from_raw_parts_mut(kernarg_address as *mut u8, declared),
                )
            }
        };
        if packed != declared {
            log::warn!(
                "kernel '{}' expects a {} byte argument segment, caller packed {}",
                launch.kernel,
                declared,
                packed
            );
        }

        // The launch thread is the sole incrementer of the device signal.
        unsafe { ffi::hsa_signal_add_screlease(device.signal, 1) };

        let completion = if self.globals.profiling() && device.reaper.is_some() {
            let mut signal = ffi::hsa_signal_t { handle: 0 };
            check("hsa_signal_create", unsafe {
                ffi::hsa_signal_create(1, 0, std::ptr::null(), &mut signal)
            })?;
            signal
        } else {
            device.signal
        };

        unsafe {
            let queue = device.queue;
            let queue_size = device.queue_size as u64;

            let index = ffi::hsa_queue_add_write_index_relaxed(queue, 1);
            while index.wrapping_sub(ffi::hsa_queue_load_read_index_scacquire(queue))
                >= queue_size
            {
                std::hint::spin_loop();
            }

            let slot = ((*queue).base_address as *mut ffi::hsa_kernel_dispatch_packet_t)
                .add((index & (queue_size - 1)) as usize);

            (*slot).setup = grid::dimensions(launch.grid)
                << ffi::HSA_KERNEL_DISPATCH_PACKET_SETUP_DIMENSIONS;
            (*slot).workgroup_size_x = launch.block[0].max(1) as u16;
            (*slot).workgroup_size_y = launch.block[1].max(1) as u16;
            (*slot).workgroup_size_z = launch.block[2].max(1) as u16;
            (*slot).reserved0 = 0;
            (*slot).grid_size_x = launch.grid[0].max(1);
            (*slot).grid_size_y = launch.grid[1].max(1);
            (*slot).grid_size_z = launch.grid[2].max(1);
            (*slot).private_segment_size = info.private_segment_size;
            (*slot).group_segment_size = info.group_segment_size;
            (*slot).kernel_object = info.kernel_object;
            (*slot).kernarg_address = kernarg_address;
            (*slot).reserved2 = 0;
            (*slot).completion_signal = completion;

            // Publish the packet: header store is the release point the
            // packet processor acquires on.
            let header = (ffi::HSA_PACKET_TYPE_KERNEL_DISPATCH << ffi::HSA_PACKET_HEADER_TYPE)
                | (ffi::HSA_FENCE_SCOPE_SYSTEM << ffi::HSA_PACKET_HEADER_SCACQUIRE_FENCE_SCOPE)
                | (ffi::HSA_FENCE_SCOPE_SYSTEM << ffi::HSA_PACKET_HEADER_SCRELEASE_FENCE_SCOPE);
            (*(slot as *const AtomicU16)).store(header as u16, Ordering::Release);

            ffi::hsa_signal_store_screlease((*queue).doorbell_signal, index as i64);
        }

        if !kernarg_address.is_null() {
            device.kernargs.lock().unwrap().push(kernarg_address as usize);
        }
        if let Some(ref reaper) = device.reaper {
            reaper.submit(ProfileRecord { signal: completion });
        }

        Ok(())
    }

    fn synchronize(&self, dev: usize) -> Result<()> {
        let device = self.device(dev);
        let value = unsafe {
            ffi::hsa_signal_wait_scacquire(
                device.signal,
                ffi::HSA_SIGNAL_CONDITION_EQ,
                0,
                u64::MAX,
                ffi::HSA_WAIT_STATE_BLOCKED,
            )
        };
        if value != 0 {
            log::warn!(
                "device '{}' completion signal drained with value {}",
                device.name,
                value
            );
        }
        device.free_retired_kernargs();
        Ok(())
    }

    fn load_kernel(&self, dev: usize, file: &str, kernel: &str) -> Result<()> {
        self.kernel_info(dev, file, kernel).map(|_| ())
    }

    fn emit_binary(&self, dev: usize, file: &str) -> Result<Vec<u8>> {
        let device = self.device(dev);
        self.program_binary(device, file)
    }
}

impl Drop for HsaPlatform {
    fn drop(&mut self) {
        // Reverse construction order: drain the reaper, destroy cached
        // executables, then the signal and queue, then the runtime.
        for device in self.devices.iter_mut().rev() {
            device.reaper.take();
            device.free_retired_kernargs();
            unsafe {
                for handle in device.cache.programs() {
                    ffi::hsa_executable_destroy(ffi::hsa_executable_t { handle });
                }
                ffi::hsa_signal_destroy(device.signal);
                if !device.queue.is_null() {
                    ffi::hsa_queue_destroy(device.queue);
                }
            }
        }
        self.devices.clear();
        unsafe {
            ffi::hsa_shut_down();
        }
    }
}
