//! Memory and dispatch-core scenarios on the host platform.

use std::os::raw::c_void;
use std::slice;

use crate::device::{DeviceId, PlatformTag};
use crate::error::Error;
use crate::registry::runtime;

const HOST_DEV: DeviceId = DeviceId::encode(PlatformTag::Host, 0);

#[test]
fn float_vector_round_trip() {
    super::init_logging();
    let rt = runtime();
    let bytes = 1024 * std::mem::size_of::<f32>() as i64;

    let src = rt.alloc(HOST_DEV, bytes).unwrap();
    let dst = rt.alloc(HOST_DEV, bytes).unwrap();
    assert!(!src.is_null() && !dst.is_null());

    unsafe {
        let values = slice::from_raw_parts_mut(src as *mut f32, 1024);
        for (i, value) in values.iter_mut().enumerate() {
            *value = i as f32;
        }
    }

    rt.copy(HOST_DEV, src, 0, HOST_DEV, dst, 0, bytes).unwrap();
    rt.synchronize(HOST_DEV).unwrap();

    unsafe {
        let source = slice::from_raw_parts(src as *const u8, bytes as usize);
        let copied = slice::from_raw_parts(dst as *const u8, bytes as usize);
        assert_eq!(source, copied);
        assert_eq!(*(dst as *const f32).add(1023), 1023.0);
    }

    rt.release(HOST_DEV, src).unwrap();
    rt.release(HOST_DEV, dst).unwrap();
}

#[test]
fn copy_honors_offsets() {
    let rt = runtime();
    let buf = rt.alloc(HOST_DEV, 64).unwrap();

    unsafe {
        let bytes = slice::from_raw_parts_mut(buf as *mut u8, 64);
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
    }

    // Shift the first half onto the second.
    rt.copy(HOST_DEV, buf, 0, HOST_DEV, buf, 32, 32).unwrap();
    unsafe {
        let bytes = slice::from_raw_parts(buf as *const u8, 64);
        assert_eq!(bytes[32], 0);
        assert_eq!(bytes[63], 31);
    }

    rt.release(HOST_DEV, buf).unwrap();
}

#[test]
fn zero_size_alloc_is_null() {
    let rt = runtime();
    assert!(rt.alloc(HOST_DEV, 0).unwrap().is_null());
    assert!(rt.alloc_host(HOST_DEV, 0).unwrap().is_null());
    assert!(rt.alloc_unified(HOST_DEV, 0).unwrap().is_null());
    // Null release is accepted and ignored.
    rt.release(HOST_DEV, std::ptr::null_mut()).unwrap();
}

#[test]
fn negative_sizes_reject() {
    let rt = runtime();
    match rt.alloc(HOST_DEV, -1) {
        Err(Error::NegativeSize(-1)) => (),
        other => panic!("expected NegativeSize, got {:?}", other.map(|p| p as usize)),
    }
    let buf = rt.alloc(HOST_DEV, 16).unwrap();
    assert!(rt.copy(HOST_DEV, buf, 0, HOST_DEV, buf, 0, -8).is_err());
    rt.release(HOST_DEV, buf).unwrap();
}

#[test]
fn unknown_platform_tag_is_diagnosed() {
    let rt = runtime();
    let bogus = DeviceId::new(7);
    let err = rt.alloc(bogus, 64).unwrap_err();
    assert!(
        err.to_string().contains("unknown platform tag 7"),
        "diagnostic must name the tag: {}",
        err
    );
}

#[test]
fn unavailable_platform_and_bad_index_reject() {
    let rt = runtime();

    // Device index past the end of the host platform.
    let bad_index = DeviceId::encode(PlatformTag::Host, 4);
    assert!(matches!(
        rt.alloc(bad_index, 64),
        Err(Error::InvalidDeviceIndex { .. })
    ));

    // The opencl tag decodes but has no backend.
    let opencl = DeviceId::encode(PlatformTag::OpenCl, 0);
    assert!(matches!(
        rt.synchronize(opencl),
        Err(Error::PlatformNotRegistered("opencl"))
    ));
}

#[test]
fn host_kernel_launch_is_unsupported() {
    let rt = runtime();
    let args = crate::args::KernelArgs::empty();
    let launch = crate::platform::LaunchParams {
        file: "k.ll",
        kernel: "main",
        grid: [1024, 1, 1],
        block: [32, 1, 1],
        args,
    };
    assert!(matches!(
        rt.launch_kernel(HOST_DEV, &launch),
        Err(Error::Unsupported { .. })
    ));
}

#[test]
fn kernel_time_starts_at_zero() {
    let rt = runtime();
    // No profiled launches can have happened in the default build.
    assert_eq!(rt.kernel_time(), crate::abi::hcrt_get_kernel_time());
}

#[test]
fn registered_sources_flow_through_the_registry() {
    let rt = runtime();
    rt.register_file(HOST_DEV, "emitted.nvvm", "; module");
    assert_eq!(crate::source::load_file("emitted.nvvm").unwrap(), "; module");
}

#[test]
fn abi_pointer_forwarding() {
    let ptr = crate::abi::hcrt_alloc(HOST_DEV.raw(), 128) as *mut c_void;
    assert!(!ptr.is_null());
    let same = crate::abi::hcrt_get_device_ptr(HOST_DEV.raw(), ptr);
    assert_eq!(ptr, same);
    crate::abi::hcrt_release(HOST_DEV.raw(), ptr);
}
