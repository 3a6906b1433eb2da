//! The CUDA accelerator platform (driver API + libNVVM).
//!
//! One `CudaDevice` per ordinal, each holding its retained primary
//! context and its own two-level module/function cache. IR files are
//! compiled to PTX through libNVVM, PTX is handed to the driver's JIT
//! loader; both steps report the backend's own log on failure. Launch
//! geometry arrives as a global work size and is converted to a block
//! count with ceiling division so partial blocks still cover the tail
//! of the problem domain.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::sync::Arc;
use std::{env, ptr};

use hcrt_sys::cuda as cu;
use hcrt_sys::nvvm;

use crate::cache::ModuleCache;
use crate::error::{ApiError, Error, Result};
use crate::grid;
use crate::platform::{LaunchParams, Platform};
use crate::registry::Globals;
use crate::source;

const JIT_LOG_SIZE: usize = 8192;

fn error_name(code: cu::CUresult) -> String {
    let mut name: *const c_char = ptr::null();
    let status = unsafe { cu::cuGetErrorName(code, &mut name) };
    if status == cu::CUDA_SUCCESS && !name.is_null() {
        unsafe { CStr::from_ptr(name).to_string_lossy().into_owned() }
    } else {
        "CUDA_ERROR_UNKNOWN".to_string()
    }
}

#[inline]
fn check(function: &'static str, code: cu::CUresult) -> Result<()> {
    if code == cu::CUDA_SUCCESS {
        Ok(())
    } else {
        Err(ApiError::new("CUDA", function, code, error_name(code)).into())
    }
}

#[inline]
fn check_nvvm(function: &'static str, code: nvvm::nvvmResult) -> Result<()> {
    if code == nvvm::NVVM_SUCCESS {
        Ok(())
    } else {
        let name = unsafe {
            CStr::from_ptr(nvvm::nvvmGetErrorString(code))
                .to_string_lossy()
                .into_owned()
        };
        Err(ApiError::new("NVVM", function, code, name).into())
    }
}

struct CudaDevice {
    handle: cu::CUdevice,
    context: cu::CUcontext,
    name: String,
    capability: (c_int, c_int),
    cache: ModuleCache<usize, usize>,
}

unsafe impl Send for CudaDevice {}
unsafe impl Sync for CudaDevice {}

pub struct CudaPlatform {
    devices: Vec<CudaDevice>,
    globals: Arc<Globals>,
}

impl CudaPlatform {
    pub fn new(globals: Arc<Globals>) -> Result<CudaPlatform> {
        // The driver's on-disk JIT cache would mask recompiles and skew
        // first-launch timing.
        env::set_var("CUDA_CACHE_DISABLE", "1");

        unsafe {
            check("cuInit", cu::cuInit(0))?;

            let mut driver_version = 0;
            check("cuDriverGetVersion", cu::cuDriverGetVersion(&mut driver_version))?;
            let (mut nvvm_major, mut nvvm_minor) = (0, 0);
            check_nvvm("nvvmVersion", nvvm::nvvmVersion(&mut nvvm_major, &mut nvvm_minor))?;
            log::info!(
                "cuda driver version {}.{}, nvvm {}.{}",
                driver_version / 1000,
                (driver_version % 1000) / 10,
                nvvm_major,
                nvvm_minor
            );

            let mut count = 0;
            check("cuDeviceGetCount", cu::cuDeviceGetCount(&mut count))?;

            let mut devices = Vec::with_capacity(count as usize);
            for ordinal in 0..count {
                let mut handle = 0;
                check("cuDeviceGet", cu::cuDeviceGet(&mut handle, ordinal))?;

                let mut name = [0 as c_char; 256];
                check(
                    "cuDeviceGetName",
                    cu::cuDeviceGetName(name.as_mut_ptr(), name.len() as c_int, handle),
                )?;
                let name = CStr::from_ptr(name.as_ptr()).to_string_lossy().into_owned();

                let (mut major, mut minor) = (0, 0);
                check(
                    "cuDeviceGetAttribute",
                    cu::cuDeviceGetAttribute(
                        &mut major,
                        cu::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR,
                        handle,
                    ),
                )?;
                check(
                    "cuDeviceGetAttribute",
                    cu::cuDeviceGetAttribute(
                        &mut minor,
                        cu::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR,
                        handle,
                    ),
                )?;

                let mut context = ptr::null_mut();
                check(
                    "cuDevicePrimaryCtxRetain",
                    cu::cuDevicePrimaryCtxRetain(&mut context, handle),
                )?;

                log::info!(
                    "cuda device {}: {} (compute capability {}.{})",
                    ordinal,
                    name,
                    major,
                    minor
                );

                devices.push(CudaDevice {
                    handle,
                    context,
                    name,
                    capability: (major, minor),
                    cache: ModuleCache::new(),
                });
            }

            Ok(CudaPlatform { devices, globals })
        }
    }

    fn device(&self, dev: usize) -> &CudaDevice {
        &self.devices[dev]
    }

    /// Makes `dev`'s primary context current on the calling thread.
    fn activate(&self, dev: usize) -> Result<&CudaDevice> {
        let device = self.device(dev);
        check("cuCtxSetCurrent", unsafe {
            cu::cuCtxSetCurrent(device.context)
        })?;
        Ok(device)
    }

    /// Compiles NVVM IR to PTX, reporting the compiler log on failure.
    fn compile_nvvm(&self, device: &CudaDevice, ir: &str, file: &str) -> Result<String> {
        let arch = CString::new(format!(
            "-arch=compute_{}{}",
            device.capability.0, device.capability.1
        ))?;
        let ftz = CString::new("-ftz=1")?;
        let module_name = CString::new(file)?;

        unsafe {
            let mut program: nvvm::nvvmProgram = ptr::null_mut();
            check_nvvm("nvvmCreateProgram", nvvm::nvvmCreateProgram(&mut program))?;

            let result = (|| -> Result<String> {
                check_nvvm(
                    "nvvmAddModuleToProgram",
                    nvvm::nvvmAddModuleToProgram(
                        program,
                        ir.as_ptr() as *const c_char,
                        ir.len(),
                        module_name.as_ptr(),
                    ),
                )?;

                let options = [arch.as_ptr(), ftz.as_ptr()];
                let status =
                    nvvm::nvvmCompileProgram(program, options.len() as c_int, options.as_ptr());
                if status != nvvm::NVVM_SUCCESS {
                    let mut log_size = 0;
                    check_nvvm(
                        "nvvmGetProgramLogSize",
                        nvvm::nvvmGetProgramLogSize(program, &mut log_size),
                    )?;
                    let mut log = vec![0u8; log_size];
                    check_nvvm(
                        "nvvmGetProgramLog",
                        nvvm::nvvmGetProgramLog(program, log.as_mut_ptr() as *mut c_char),
                    )?;
                    let log = String::from_utf8_lossy(&log).trim_end_matches('\0').to_string();
                    return Err(Error::CompileLog(log));
                }

                let mut ptx_size = 0;
                check_nvvm(
                    "nvvmGetCompiledResultSize",
                    nvvm::nvvmGetCompiledResultSize(program, &mut ptx_size),
                )?;
                let mut ptx = vec![0u8; ptx_size];
                check_nvvm(
                    "nvvmGetCompiledResult",
                    nvvm::nvvmGetCompiledResult(program, ptx.as_mut_ptr() as *mut c_char),
                )?;
                while ptx.last() == Some(&0) {
                    ptx.pop();
                }
                Ok(String::from_utf8_lossy(&ptx).into_owned())
            })();

            nvvm::nvvmDestroyProgram(&mut program);
            result
        }
    }

    /// The PTX for `file`: compiled through libNVVM for `.nvvm`, loaded
    /// verbatim for `.ptx`.
    fn ptx_for(&self, device: &CudaDevice, file: &str) -> Result<String> {
        match std::path::Path::new(file).extension().and_then(|e| e.to_str()) {
            Some("ptx") => source::load_file(file),
            Some("nvvm") => {
                let ir = source::load_file(file)?;
                log::debug!(
                    "jit-compiling '{}' for compute capability {}.{}",
                    file,
                    device.capability.0,
                    device.capability.1
                );
                self.compile_nvvm(device, &ir, file)
            }
            _ => Err(Error::UnsupportedExtension(file.to_string())),
        }
    }

    /// Loads the PTX for `file` into a driver module with a JIT error
    /// buffer and an explicit target.
    fn load_module(&self, device: &CudaDevice, file: &str) -> Result<usize> {
        let ptx = self.ptx_for(device, file)?;
        let image = CString::new(ptx)?;

        let mut error_log = vec![0u8; JIT_LOG_SIZE];
        let target = (device.capability.0 * 10 + device.capability.1) as usize;
        let mut options = [
            cu::CU_JIT_ERROR_LOG_BUFFER,
            cu::CU_JIT_ERROR_LOG_BUFFER_SIZE_BYTES,
            cu::CU_JIT_TARGET,
        ];
        let mut option_values = [
            error_log.as_mut_ptr() as *mut c_void,
            JIT_LOG_SIZE as *mut c_void,
            target as *mut c_void,
        ];

        let mut module = ptr::null_mut();
        let status = unsafe {
            cu::cuModuleLoadDataEx(
                &mut module,
                image.as_ptr() as *const c_void,
                options.len() as u32,
                options.as_mut_ptr(),
                option_values.as_mut_ptr(),
            )
        };
        if status != cu::CUDA_SUCCESS {
            let log = String::from_utf8_lossy(&error_log)
                .trim_end_matches('\0')
                .to_string();
            return Err(Error::Codegen {
                stage: "ptx load",
                detail: format!("{} ({}): {}", error_name(status), status, log),
            });
        }
        Ok(module as usize)
    }

    /// Level one of the cache protocol: module by file, with disposal
    /// of a racing duplicate.
    fn module_for(&self, device: &CudaDevice, file: &str) -> Result<usize> {
        let (module, loser) = device
            .cache
            .program_or_load(file, || self.load_module(device, file))?;
        if let Some(duplicate) = loser {
            unsafe {
                cu::cuModuleUnload(duplicate as cu::CUmodule);
            }
        }
        Ok(module)
    }

    /// Two-level cache protocol; returns the resolved entry point.
    fn kernel_function(&self, dev: usize, file: &str, name: &str) -> Result<cu::CUfunction> {
        let device = self.device(dev);
        let module = self.module_for(device, file)?;

        let function = device.cache.kernel_or_load(module, name, || {
            let symbol = CString::new(name)?;
            let mut function = ptr::null_mut();
            check("cuModuleGetFunction", unsafe {
                cu::cuModuleGetFunction(&mut function, module as cu::CUmodule, symbol.as_ptr())
            })?;
            Ok(function as usize)
        })?;
        Ok(function as cu::CUfunction)
    }

    /// Binds a named texture reference of a loaded module to a device
    /// address range. Only needed by kernels declaring one.
    pub fn bind_texture(
        &self,
        dev: usize,
        file: &str,
        texture: &str,
        address: *mut c_void,
        bytes: usize,
        format: c_int,
        components: c_int,
    ) -> Result<()> {
        let device = self.activate(dev)?;
        let module = self.module_for(device, file)?;

        let symbol = CString::new(texture)?;
        let mut texref = ptr::null_mut();
        unsafe {
            check("cuModuleGetTexRef", {
                cu::cuModuleGetTexRef(&mut texref, module as cu::CUmodule, symbol.as_ptr())
            })?;
            check("cuTexRefSetFormat", cu::cuTexRefSetFormat(texref, format, components))?;
            check(
                "cuTexRefSetFlags",
                cu::cuTexRefSetFlags(texref, cu::CU_TRSF_READ_AS_INTEGER),
            )?;
            let mut byte_offset = 0;
            check(
                "cuTexRefSetAddress",
                cu::cuTexRefSetAddress(&mut byte_offset, texref, address as cu::CUdeviceptr, bytes),
            )?;
        }
        Ok(())
    }

    /// Launch wrapped in an event pair; returns the elapsed microseconds.
    unsafe fn timed_launch(
        &self,
        function: cu::CUfunction,
        blocks: [u32; 3],
        block: [u32; 3],
        params: &mut [*mut c_void],
    ) -> Result<u64> {
        let mut start = ptr::null_mut();
        let mut stop = ptr::null_mut();
        check("cuEventCreate", cu::cuEventCreate(&mut start, 0))?;
        check("cuEventCreate", cu::cuEventCreate(&mut stop, 0))?;

        check("cuEventRecord", cu::cuEventRecord(start, ptr::null_mut()))?;
        let status = cu::cuLaunchKernel(
            function,
            blocks[0],
            blocks[1],
            blocks[2],
            block[0].max(1),
            block[1].max(1),
            block[2].max(1),
            0,
            ptr::null_mut(),
            params.as_mut_ptr(),
            ptr::null_mut(),
        );
        check("cuLaunchKernel", status)?;
        check("cuEventRecord", cu::cuEventRecord(stop, ptr::null_mut()))?;
        check("cuEventSynchronize", cu::cuEventSynchronize(stop))?;

        let mut millis = 0f32;
        check(
            "cuEventElapsedTime",
            cu::cuEventElapsedTime(&mut millis, start, stop),
        )?;
        cu::cuEventDestroy(start);
        cu::cuEventDestroy(stop);
        Ok((millis * 1000.0) as u64)
    }
}

impl Platform for CudaPlatform {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn alloc(&self, dev: usize, bytes: usize) -> Result<*mut c_void> {
        self.activate(dev)?;
        let mut dptr: cu::CUdeviceptr = 0;
        check("cuMemAlloc", unsafe { cu::cuMemAlloc(&mut dptr, bytes) })?;
        Ok(dptr as *mut c_void)
    }

    fn alloc_host(&self, dev: usize, bytes: usize) -> Result<*mut c_void> {
        self.activate(dev)?;
        let mut ptr = ptr::null_mut();
        check("cuMemAllocHost", unsafe {
            cu::cuMemAllocHost(&mut ptr, bytes)
        })?;
        Ok(ptr)
    }

    fn alloc_unified(&self, dev: usize, bytes: usize) -> Result<*mut c_void> {
        self.activate(dev)?;
        let mut dptr: cu::CUdeviceptr = 0;
        check("cuMemAllocManaged", unsafe {
            cu::cuMemAllocManaged(&mut dptr, bytes, cu::CU_MEM_ATTACH_GLOBAL)
        })?;
        Ok(dptr as *mut c_void)
    }

    fn get_device_ptr(&self, dev: usize, ptr_in: *mut c_void) -> Result<*mut c_void> {
        self.activate(dev)?;
        let mut dptr: cu::CUdeviceptr = 0;
        check("cuMemHostGetDevicePointer", unsafe {
            cu::cuMemHostGetDevicePointer(&mut dptr, ptr_in, 0)
        })?;
        Ok(dptr as *mut c_void)
    }

    fn release(&self, dev: usize, ptr_in: *mut c_void) -> Result<()> {
        self.activate(dev)?;
        check("cuMemFree", unsafe {
            cu::cuMemFree(ptr_in as cu::CUdeviceptr)
        })
    }

    fn release_host(&self, dev: usize, ptr_in: *mut c_void) -> Result<()> {
        self.activate(dev)?;
        check("cuMemFreeHost", unsafe { cu::cuMemFreeHost(ptr_in) })
    }

    fn copy(
        &self,
        src_dev: usize,
        src: *const c_void,
        src_offset: usize,
        _dst_dev: usize,
        dst: *mut c_void,
        dst_offset: usize,
        bytes: usize,
    ) -> Result<()> {
        // Unified addressing: device pointers stay valid across the
        // backend's contexts, so one DtoD covers the intra-platform case.
        self.activate(src_dev)?;
        check("cuMemcpyDtoD", unsafe {
            cu::cuMemcpyDtoD(
                dst as cu::CUdeviceptr + dst_offset as u64,
                src as cu::CUdeviceptr + src_offset as u64,
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
        self.activate(dst_dev)?;
        check("cuMemcpyHtoD", unsafe {
            cu::cuMemcpyHtoD(
                dst as cu::CUdeviceptr + dst_offset as u64,
                (src as *const u8).add(src_offset) as *const c_void,
                bytes,
            )
        })
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
        self.activate(src_dev)?;
        check("cuMemcpyDtoH", unsafe {
            cu::cuMemcpyDtoH(
                (dst as *mut u8).add(dst_offset) as *mut c_void,
                src as cu::CUdeviceptr + src_offset as u64,
                bytes,
            )
        })
    }

    fn launch_kernel(&self, dev: usize, launch: &LaunchParams) -> Result<()> {
        self.activate(dev)?;
        let function = self.kernel_function(dev, launch.file, launch.kernel)?;

        let blocks = grid::blocks(launch.grid, launch.block);
        let mut params = launch.args.param_array();

        if self.globals.profiling() {
            let micros =
                unsafe { self.timed_launch(function, blocks, launch.block, &mut params)? };
            self.globals.add_kernel_time(micros);
            log::debug!("kernel '{}' ran for {} us", launch.kernel, micros);
        } else {
            check("cuLaunchKernel", unsafe {
                cu::cuLaunchKernel(
                    function,
                    blocks[0],
                    blocks[1],
                    blocks[2],
                    launch.block[0].max(1),
                    launch.block[1].max(1),
                    launch.block[2].max(1),
                    0,
                    ptr::null_mut(),
                    params.as_mut_ptr(),
                    ptr::null_mut(),
                )
            })?;
        }
        Ok(())
    }

    fn synchronize(&self, dev: usize) -> Result<()> {
        self.activate(dev)?;
        check("cuCtxSynchronize", unsafe { cu::cuCtxSynchronize() })
    }

    fn load_kernel(&self, dev: usize, file: &str, kernel: &str) -> Result<()> {
        self.activate(dev)?;
        self.kernel_function(dev, file, kernel).map(|_| ())
    }

    fn emit_binary(&self, dev: usize, file: &str) -> Result<Vec<u8>> {
        let device = self.activate(dev)?;
        self.ptx_for(device, file).map(String::into_bytes)
    }
}

impl Drop for CudaPlatform {
    fn drop(&mut self) {
        // Reverse device order: modules first, then the context.
        for device in self.devices.iter().rev() {
            unsafe {
                let _ = cu::cuCtxSetCurrent(device.context);
                for module in device.cache.programs() {
                    cu::cuModuleUnload(module as cu::CUmodule);
                }
                cu::cuDevicePrimaryCtxRelease(device.handle);
            }
            log::debug!("released cuda device '{}'", device.name);
        }
    }
}
