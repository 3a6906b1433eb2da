//! Raw FFI bindings for the backend drivers consumed by `hcrt`.
//!
//! Each backend lives in its own module behind a cargo feature:
//!
//! * `hsa` — the HSA runtime (`libhsa-runtime64`), including the AMD
//!   profiling extension.
//! * `cuda` — the CUDA driver API (`libcuda`) and libNVVM (`libnvvm`).
//!
//! Bindings are transcribed from the vendor headers and kept in header
//! order to ease maintenance. No functionality beyond type declarations,
//! constants and `extern "C"` blocks belongs here; safe wrappers live in
//! the `hcrt` crate.

#![allow(non_camel_case_types, non_snake_case)]

#[cfg(feature = "cuda")]
pub mod cuda;
#[cfg(feature = "hsa")]
pub mod hsa;
#[cfg(feature = "cuda")]
pub mod nvvm;
