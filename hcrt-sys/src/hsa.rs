//! Rust bindings for the HSA runtime ABI.
//!
//! Transcribed from `hsa.h` and `hsa_ext_amd.h` (HSA runtime 1.x). Only
//! the surface exercised by the runtime is bound. The layout of this
//! document mimics the original headers in order to ease maintenance.

#![allow(non_camel_case_types, dead_code, non_upper_case_globals)]

use libc::{c_char, c_int, c_void, size_t};

pub type hsa_status_t = c_int;
pub type hsa_signal_value_t = i64;

pub const HSA_STATUS_SUCCESS: hsa_status_t = 0x0;
pub const HSA_STATUS_INFO_BREAK: hsa_status_t = 0x1;
pub const HSA_STATUS_ERROR: hsa_status_t = 0x1000;
pub const HSA_STATUS_ERROR_INVALID_ARGUMENT: hsa_status_t = 0x1001;
pub const HSA_STATUS_ERROR_INVALID_QUEUE_CREATION: hsa_status_t = 0x1002;
pub const HSA_STATUS_ERROR_INVALID_ALLOCATION: hsa_status_t = 0x1003;
pub const HSA_STATUS_ERROR_INVALID_AGENT: hsa_status_t = 0x1004;
pub const HSA_STATUS_ERROR_INVALID_REGION: hsa_status_t = 0x1005;
pub const HSA_STATUS_ERROR_INVALID_SIGNAL: hsa_status_t = 0x1006;
pub const HSA_STATUS_ERROR_INVALID_QUEUE: hsa_status_t = 0x1007;
pub const HSA_STATUS_ERROR_OUT_OF_RESOURCES: hsa_status_t = 0x1008;
pub const HSA_STATUS_ERROR_INVALID_PACKET_FORMAT: hsa_status_t = 0x1009;
pub const HSA_STATUS_ERROR_RESOURCE_FREE: hsa_status_t = 0x100A;
pub const HSA_STATUS_ERROR_NOT_INITIALIZED: hsa_status_t = 0x100B;
pub const HSA_STATUS_ERROR_REFCOUNT_OVERFLOW: hsa_status_t = 0x100C;
pub const HSA_STATUS_ERROR_INCOMPATIBLE_ARGUMENTS: hsa_status_t = 0x100D;
pub const HSA_STATUS_ERROR_INVALID_INDEX: hsa_status_t = 0x100E;
pub const HSA_STATUS_ERROR_INVALID_ISA: hsa_status_t = 0x100F;
pub const HSA_STATUS_ERROR_INVALID_ISA_NAME: hsa_status_t = 0x1017;
pub const HSA_STATUS_ERROR_INVALID_CODE_OBJECT: hsa_status_t = 0x1010;
pub const HSA_STATUS_ERROR_INVALID_EXECUTABLE: hsa_status_t = 0x1011;
pub const HSA_STATUS_ERROR_FROZEN_EXECUTABLE: hsa_status_t = 0x1012;
pub const HSA_STATUS_ERROR_INVALID_SYMBOL_NAME: hsa_status_t = 0x1013;
pub const HSA_STATUS_ERROR_VARIABLE_ALREADY_DEFINED: hsa_status_t = 0x1014;
pub const HSA_STATUS_ERROR_VARIABLE_UNDEFINED: hsa_status_t = 0x1015;
pub const HSA_STATUS_ERROR_EXCEPTION: hsa_status_t = 0x1016;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_agent_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_signal_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_region_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_isa_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_executable_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_executable_symbol_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_code_object_reader_t {
    pub handle: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct hsa_loaded_code_object_t {
    pub handle: u64,
}

// hsa_system_info_t:
pub const HSA_SYSTEM_INFO_VERSION_MAJOR: u32 = 0;
pub const HSA_SYSTEM_INFO_VERSION_MINOR: u32 = 1;
pub const HSA_SYSTEM_INFO_TIMESTAMP: u32 = 2;
pub const HSA_SYSTEM_INFO_TIMESTAMP_FREQUENCY: u32 = 3;
pub const HSA_SYSTEM_INFO_SIGNAL_MAX_WAIT: u32 = 4;
pub const HSA_SYSTEM_INFO_ENDIANNESS: u32 = 5;
pub const HSA_SYSTEM_INFO_MACHINE_MODEL: u32 = 6;
pub const HSA_SYSTEM_INFO_EXTENSIONS: u32 = 7;

// hsa_agent_info_t:
pub const HSA_AGENT_INFO_NAME: u32 = 0;
pub const HSA_AGENT_INFO_VENDOR_NAME: u32 = 1;
pub const HSA_AGENT_INFO_FEATURE: u32 = 2;
pub const HSA_AGENT_INFO_MACHINE_MODEL: u32 = 3;
pub const HSA_AGENT_INFO_PROFILE: u32 = 4;
pub const HSA_AGENT_INFO_DEFAULT_FLOAT_ROUNDING_MODE: u32 = 5;
pub const HSA_AGENT_INFO_BASE_PROFILE_DEFAULT_FLOAT_ROUNDING_MODES: u32 = 6;
pub const HSA_AGENT_INFO_FAST_F16_OPERATION: u32 = 7;
pub const HSA_AGENT_INFO_WAVEFRONT_SIZE: u32 = 8;
pub const HSA_AGENT_INFO_WORKGROUP_MAX_DIM: u32 = 9;
pub const HSA_AGENT_INFO_WORKGROUP_MAX_SIZE: u32 = 10;
pub const HSA_AGENT_INFO_GRID_MAX_DIM: u32 = 11;
pub const HSA_AGENT_INFO_GRID_MAX_SIZE: u32 = 12;
pub const HSA_AGENT_INFO_FBARRIER_MAX_SIZE: u32 = 13;
pub const HSA_AGENT_INFO_QUEUES_MAX: u32 = 14;
pub const HSA_AGENT_INFO_QUEUE_MIN_SIZE: u32 = 15;
pub const HSA_AGENT_INFO_QUEUE_MAX_SIZE: u32 = 16;
pub const HSA_AGENT_INFO_QUEUE_TYPE: u32 = 17;
pub const HSA_AGENT_INFO_NODE: u32 = 18;
pub const HSA_AGENT_INFO_DEVICE: u32 = 19;
pub const HSA_AGENT_INFO_CACHE_SIZE: u32 = 20;
pub const HSA_AGENT_INFO_ISA: u32 = 21;
pub const HSA_AGENT_INFO_EXTENSIONS: u32 = 22;
pub const HSA_AGENT_INFO_VERSION_MAJOR: u32 = 23;
pub const HSA_AGENT_INFO_VERSION_MINOR: u32 = 24;

// hsa_device_type_t:
pub const HSA_DEVICE_TYPE_CPU: u32 = 0;
pub const HSA_DEVICE_TYPE_GPU: u32 = 1;
pub const HSA_DEVICE_TYPE_DSP: u32 = 2;

// hsa_agent_feature_t:
pub const HSA_AGENT_FEATURE_KERNEL_DISPATCH: u32 = 1;
pub const HSA_AGENT_FEATURE_AGENT_DISPATCH: u32 = 2;

// hsa_profile_t:
pub const HSA_PROFILE_BASE: u32 = 0;
pub const HSA_PROFILE_FULL: u32 = 1;

// hsa_default_float_rounding_mode_t:
pub const HSA_DEFAULT_FLOAT_ROUNDING_MODE_DEFAULT: u32 = 0;
pub const HSA_DEFAULT_FLOAT_ROUNDING_MODE_ZERO: u32 = 1;
pub const HSA_DEFAULT_FLOAT_ROUNDING_MODE_NEAR: u32 = 2;

// hsa_isa_info_t:
pub const HSA_ISA_INFO_NAME_LENGTH: u32 = 0;
pub const HSA_ISA_INFO_NAME: u32 = 1;

// hsa_region_segment_t:
pub const HSA_REGION_SEGMENT_GLOBAL: u32 = 0;
pub const HSA_REGION_SEGMENT_READONLY: u32 = 1;
pub const HSA_REGION_SEGMENT_PRIVATE: u32 = 2;
pub const HSA_REGION_SEGMENT_GROUP: u32 = 3;
pub const HSA_REGION_SEGMENT_KERNARG: u32 = 4;

// hsa_region_global_flag_t - bitfield:
pub const HSA_REGION_GLOBAL_FLAG_KERNARG: u32 = 1;
pub const HSA_REGION_GLOBAL_FLAG_FINE_GRAINED: u32 = 2;
pub const HSA_REGION_GLOBAL_FLAG_COARSE_GRAINED: u32 = 4;

// hsa_region_info_t:
pub const HSA_REGION_INFO_SEGMENT: u32 = 0;
pub const HSA_REGION_INFO_GLOBAL_FLAGS: u32 = 1;
pub const HSA_REGION_INFO_SIZE: u32 = 2;
pub const HSA_REGION_INFO_ALLOC_MAX_SIZE: u32 = 4;
pub const HSA_REGION_INFO_RUNTIME_ALLOC_ALLOWED: u32 = 5;
pub const HSA_REGION_INFO_RUNTIME_ALLOC_GRANULE: u32 = 6;
pub const HSA_REGION_INFO_RUNTIME_ALLOC_ALIGNMENT: u32 = 7;

// hsa_queue_type_t:
pub const HSA_QUEUE_TYPE_MULTI: u32 = 0;
pub const HSA_QUEUE_TYPE_SINGLE: u32 = 1;

#[repr(C)]
#[derive(Debug)]
pub struct hsa_queue_t {
    pub type_: u32,
    pub features: u32,
    pub base_address: *mut c_void,
    pub doorbell_signal: hsa_signal_t,
    pub size: u32,
    pub reserved1: u32,
    pub id: u64,
}

// hsa_packet_type_t:
pub const HSA_PACKET_TYPE_VENDOR_SPECIFIC: u32 = 0;
pub const HSA_PACKET_TYPE_INVALID: u32 = 1;
pub const HSA_PACKET_TYPE_KERNEL_DISPATCH: u32 = 2;
pub const HSA_PACKET_TYPE_BARRIER_AND: u32 = 3;
pub const HSA_PACKET_TYPE_AGENT_DISPATCH: u32 = 4;
pub const HSA_PACKET_TYPE_BARRIER_OR: u32 = 5;

// hsa_fence_scope_t:
pub const HSA_FENCE_SCOPE_NONE: u32 = 0;
pub const HSA_FENCE_SCOPE_AGENT: u32 = 1;
pub const HSA_FENCE_SCOPE_SYSTEM: u32 = 2;

// hsa_packet_header_t - bit offsets:
pub const HSA_PACKET_HEADER_TYPE: u32 = 0;
pub const HSA_PACKET_HEADER_BARRIER: u32 = 8;
pub const HSA_PACKET_HEADER_SCACQUIRE_FENCE_SCOPE: u32 = 9;
pub const HSA_PACKET_HEADER_SCRELEASE_FENCE_SCOPE: u32 = 11;

// hsa_kernel_dispatch_packet_setup_t - bit offsets:
pub const HSA_KERNEL_DISPATCH_PACKET_SETUP_DIMENSIONS: u16 = 0;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct hsa_kernel_dispatch_packet_t {
    pub header: u16,
    pub setup: u16,
    pub workgroup_size_x: u16,
    pub workgroup_size_y: u16,
    pub workgroup_size_z: u16,
    pub reserved0: u16,
    pub grid_size_x: u32,
    pub grid_size_y: u32,
    pub grid_size_z: u32,
    pub private_segment_size: u32,
    pub group_segment_size: u32,
    pub kernel_object: u64,
    pub kernarg_address: *mut c_void,
    pub reserved2: u64,
    pub completion_signal: hsa_signal_t,
}

// hsa_signal_condition_t:
pub const HSA_SIGNAL_CONDITION_EQ: u32 = 0;
pub const HSA_SIGNAL_CONDITION_NE: u32 = 1;
pub const HSA_SIGNAL_CONDITION_LT: u32 = 2;
pub const HSA_SIGNAL_CONDITION_GTE: u32 = 3;

// hsa_wait_state_t:
pub const HSA_WAIT_STATE_BLOCKED: u32 = 0;
pub const HSA_WAIT_STATE_ACTIVE: u32 = 1;

// hsa_executable_symbol_info_t (kernel attributes):
pub const HSA_EXECUTABLE_SYMBOL_INFO_TYPE: u32 = 0;
pub const HSA_EXECUTABLE_SYMBOL_INFO_NAME_LENGTH: u32 = 1;
pub const HSA_EXECUTABLE_SYMBOL_INFO_NAME: u32 = 2;
pub const HSA_EXECUTABLE_SYMBOL_INFO_AGENT: u32 = 20;
pub const HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_OBJECT: u32 = 22;
pub const HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_KERNARG_SEGMENT_SIZE: u32 = 23;
pub const HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_KERNARG_SEGMENT_ALIGNMENT: u32 = 24;
pub const HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_GROUP_SEGMENT_SIZE: u32 = 25;
pub const HSA_EXECUTABLE_SYMBOL_INFO_KERNEL_PRIVATE_SEGMENT_SIZE: u32 = 26;

// hsa_ext_amd.h:
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct hsa_amd_profiling_dispatch_time_t {
    pub start: u64,
    pub end: u64,
}

#[cfg_attr(target_os = "linux", link(name = "hsa-runtime64"))]
extern "C" {
    pub fn hsa_init() -> hsa_status_t;
    pub fn hsa_shut_down() -> hsa_status_t;
    pub fn hsa_status_string(
        status: hsa_status_t,
        status_string: *mut *const c_char,
    ) -> hsa_status_t;
    pub fn hsa_system_get_info(attribute: u32, value: *mut c_void) -> hsa_status_t;

    pub fn hsa_iterate_agents(
        callback: extern "C" fn(agent: hsa_agent_t, data: *mut c_void) -> hsa_status_t,
        data: *mut c_void,
    ) -> hsa_status_t;
    pub fn hsa_agent_get_info(
        agent: hsa_agent_t,
        attribute: u32,
        value: *mut c_void,
    ) -> hsa_status_t;
    pub fn hsa_agent_iterate_regions(
        agent: hsa_agent_t,
        callback: extern "C" fn(region: hsa_region_t, data: *mut c_void) -> hsa_status_t,
        data: *mut c_void,
    ) -> hsa_status_t;
    pub fn hsa_region_get_info(
        region: hsa_region_t,
        attribute: u32,
        value: *mut c_void,
    ) -> hsa_status_t;
    pub fn hsa_isa_get_info_alt(
        isa: hsa_isa_t,
        attribute: u32,
        value: *mut c_void,
    ) -> hsa_status_t;

    pub fn hsa_queue_create(
        agent: hsa_agent_t,
        size: u32,
        type_: u32,
        callback: Option<
            extern "C" fn(status: hsa_status_t, source: *mut hsa_queue_t, data: *mut c_void),
        >,
        data: *mut c_void,
        private_segment_size: u32,
        group_segment_size: u32,
        queue: *mut *mut hsa_queue_t,
    ) -> hsa_status_t;
    pub fn hsa_queue_destroy(queue: *mut hsa_queue_t) -> hsa_status_t;
    pub fn hsa_queue_load_read_index_scacquire(queue: *const hsa_queue_t) -> u64;
    pub fn hsa_queue_load_write_index_relaxed(queue: *const hsa_queue_t) -> u64;
    pub fn hsa_queue_add_write_index_relaxed(queue: *const hsa_queue_t, value: u64) -> u64;

    pub fn hsa_signal_create(
        initial_value: hsa_signal_value_t,
        num_consumers: u32,
        consumers: *const hsa_agent_t,
        signal: *mut hsa_signal_t,
    ) -> hsa_status_t;
    pub fn hsa_signal_destroy(signal: hsa_signal_t) -> hsa_status_t;
    pub fn hsa_signal_load_scacquire(signal: hsa_signal_t) -> hsa_signal_value_t;
    pub fn hsa_signal_store_screlease(signal: hsa_signal_t, value: hsa_signal_value_t);
    pub fn hsa_signal_add_screlease(signal: hsa_signal_t, value: hsa_signal_value_t);
    pub fn hsa_signal_subtract_screlease(signal: hsa_signal_t, value: hsa_signal_value_t);
    pub fn hsa_signal_wait_scacquire(
        signal: hsa_signal_t,
        condition: u32,
        compare_value: hsa_signal_value_t,
        timeout_hint: u64,
        wait_state_hint: u32,
    ) -> hsa_signal_value_t;

    pub fn hsa_memory_allocate(
        region: hsa_region_t,
        size: size_t,
        ptr: *mut *mut c_void,
    ) -> hsa_status_t;
    pub fn hsa_memory_free(ptr: *mut c_void) -> hsa_status_t;
    pub fn hsa_memory_copy(dst: *mut c_void, src: *const c_void, size: size_t) -> hsa_status_t;

    pub fn hsa_code_object_reader_create_from_memory(
        code_object: *const c_void,
        size: size_t,
        code_object_reader: *mut hsa_code_object_reader_t,
    ) -> hsa_status_t;
    pub fn hsa_code_object_reader_destroy(
        code_object_reader: hsa_code_object_reader_t,
    ) -> hsa_status_t;

    pub fn hsa_executable_create_alt(
        profile: u32,
        default_float_rounding_mode: u32,
        options: *const c_char,
        executable: *mut hsa_executable_t,
    ) -> hsa_status_t;
    pub fn hsa_executable_destroy(executable: hsa_executable_t) -> hsa_status_t;
    pub fn hsa_executable_load_agent_code_object(
        executable: hsa_executable_t,
        agent: hsa_agent_t,
        code_object_reader: hsa_code_object_reader_t,
        options: *const c_char,
        loaded_code_object: *mut hsa_loaded_code_object_t,
    ) -> hsa_status_t;
    pub fn hsa_executable_freeze(
        executable: hsa_executable_t,
        options: *const c_char,
    ) -> hsa_status_t;
    pub fn hsa_executable_validate(executable: hsa_executable_t, result: *mut u32)
        -> hsa_status_t;
    pub fn hsa_executable_get_symbol_by_name(
        executable: hsa_executable_t,
        symbol_name: *const c_char,
        agent: *const hsa_agent_t,
        symbol: *mut hsa_executable_symbol_t,
    ) -> hsa_status_t;
    pub fn hsa_executable_symbol_get_info(
        executable_symbol: hsa_executable_symbol_t,
        attribute: u32,
        value: *mut c_void,
    ) -> hsa_status_t;

    pub fn hsa_amd_profiling_set_profiler_enabled(
        queue: *mut hsa_queue_t,
        enable: c_int,
    ) -> hsa_status_t;
    pub fn hsa_amd_profiling_get_dispatch_time(
        agent: hsa_agent_t,
        signal: hsa_signal_t,
        time: *mut hsa_amd_profiling_dispatch_time_t,
    ) -> hsa_status_t;
}

/// Returns the symbolic name for an HSA status code.
pub fn status_name(status: hsa_status_t) -> &'static str {
    match status {
        HSA_STATUS_SUCCESS => "HSA_STATUS_SUCCESS",
        HSA_STATUS_INFO_BREAK => "HSA_STATUS_INFO_BREAK",
        HSA_STATUS_ERROR => "HSA_STATUS_ERROR",
        HSA_STATUS_ERROR_INVALID_ARGUMENT => "HSA_STATUS_ERROR_INVALID_ARGUMENT",
        HSA_STATUS_ERROR_INVALID_QUEUE_CREATION => "HSA_STATUS_ERROR_INVALID_QUEUE_CREATION",
        HSA_STATUS_ERROR_INVALID_ALLOCATION => "HSA_STATUS_ERROR_INVALID_ALLOCATION",
        HSA_STATUS_ERROR_INVALID_AGENT => "HSA_STATUS_ERROR_INVALID_AGENT",
        HSA_STATUS_ERROR_INVALID_REGION => "HSA_STATUS_ERROR_INVALID_REGION",
        HSA_STATUS_ERROR_INVALID_SIGNAL => "HSA_STATUS_ERROR_INVALID_SIGNAL",
        HSA_STATUS_ERROR_INVALID_QUEUE => "HSA_STATUS_ERROR_INVALID_QUEUE",
        HSA_STATUS_ERROR_OUT_OF_RESOURCES => "HSA_STATUS_ERROR_OUT_OF_RESOURCES",
        HSA_STATUS_ERROR_INVALID_PACKET_FORMAT => "HSA_STATUS_ERROR_INVALID_PACKET_FORMAT",
        HSA_STATUS_ERROR_RESOURCE_FREE => "HSA_STATUS_ERROR_RESOURCE_FREE",
        HSA_STATUS_ERROR_NOT_INITIALIZED => "HSA_STATUS_ERROR_NOT_INITIALIZED",
        HSA_STATUS_ERROR_REFCOUNT_OVERFLOW => "HSA_STATUS_ERROR_REFCOUNT_OVERFLOW",
        HSA_STATUS_ERROR_INCOMPATIBLE_ARGUMENTS => "HSA_STATUS_ERROR_INCOMPATIBLE_ARGUMENTS",
        HSA_STATUS_ERROR_INVALID_INDEX => "HSA_STATUS_ERROR_INVALID_INDEX",
        HSA_STATUS_ERROR_INVALID_ISA => "HSA_STATUS_ERROR_INVALID_ISA",
        HSA_STATUS_ERROR_INVALID_ISA_NAME => "HSA_STATUS_ERROR_INVALID_ISA_NAME",
        HSA_STATUS_ERROR_INVALID_CODE_OBJECT => "HSA_STATUS_ERROR_INVALID_CODE_OBJECT",
        HSA_STATUS_ERROR_INVALID_EXECUTABLE => "HSA_STATUS_ERROR_INVALID_EXECUTABLE",
        HSA_STATUS_ERROR_FROZEN_EXECUTABLE => "HSA_STATUS_ERROR_FROZEN_EXECUTABLE",
        HSA_STATUS_ERROR_INVALID_SYMBOL_NAME => "HSA_STATUS_ERROR_INVALID_SYMBOL_NAME",
        HSA_STATUS_ERROR_VARIABLE_ALREADY_DEFINED => "HSA_STATUS_ERROR_VARIABLE_ALREADY_DEFINED",
        HSA_STATUS_ERROR_VARIABLE_UNDEFINED => "HSA_STATUS_ERROR_VARIABLE_UNDEFINED",
        HSA_STATUS_ERROR_EXCEPTION => "HSA_STATUS_ERROR_EXCEPTION",
        _ => "HSA_STATUS_UNKNOWN",
    }
}
