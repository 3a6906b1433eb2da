//! Device runtime for heterogeneous compute.
//!
//! Compiler-emitted host code talks to this crate through a stable C ABI
//! (the `hcrt_*` symbols in [`abi`]) to allocate device memory, move
//! data, JIT-compile kernels from intermediate representation, launch
//! them with a grid/block geometry and synchronize. A single encoded
//! device id selects both the backend platform and the device within it.
//!
//! ## Backends
//!
//! * **host** — always available; CPU memory and staging for
//!   cross-platform copies.
//! * **cuda** (feature `cuda`) — the CUDA driver API with libNVVM as the
//!   IR compiler.
//! * **hsa** (feature `hsa`) — the HSA runtime with an LLVM AMDGPU
//!   lowering pipeline driven by [`codegen`].
//!
//! The accelerator features link their native driver libraries and are
//! opt-in; everything else builds and tests everywhere.
//!
//! ## Foundations
//!
//! Raw driver bindings live in the [`hcrt-sys`] crate.
//!
//! [`hcrt-sys`]: https://docs.rs/hcrt-sys

#![doc(html_root_url = "https://docs.rs/hcrt/0.1.0")]

pub mod abi;
pub mod args;
pub mod cache;
pub mod codegen;
mod device;
pub mod error;
pub mod grid;
mod platform;
mod registry;
mod source;
#[cfg(test)]
mod tests;

pub use crate::args::{ArgType, KernelArgs};
pub use crate::device::{DeviceId, PlatformTag};
pub use crate::error::{ApiError, Error, Result};
#[cfg(feature = "cuda")]
pub use crate::platform::CudaPlatform;
#[cfg(feature = "hsa")]
pub use crate::platform::HsaPlatform;
pub use crate::platform::{HostPlatform, LaunchParams, Platform};
pub use crate::registry::{runtime, Globals, Runtime};
pub use crate::source::{load_file, load_file_bytes, register_file, store_file};
