//! Standard error and result types for the runtime.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// A backend driver call that returned a non-success status.
///
/// Carries the function that failed, the numeric status and the backend's
/// own name for it, so the diagnostic printed at the ABI boundary is
/// enough to identify the failure without a debugger.
#[derive(Debug, thiserror::Error)]
#[error("{backend} error executing {function}: {name} ({code})")]
pub struct ApiError {
    backend: &'static str,
    function: &'static str,
    code: i32,
    name: String,
}

impl ApiError {
    pub fn new<S: Into<String>>(
        backend: &'static str,
        function: &'static str,
        code: i32,
        name: S,
    ) -> ApiError {
        ApiError {
            backend,
            function,
            code,
            name: name.into(),
        }
    }

    /// Evaluates a backend status code, mapping non-zero to an `ApiError`.
    #[inline]
    pub fn check<S: Into<String>>(
        backend: &'static str,
        function: &'static str,
        code: i32,
        name: S,
    ) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(ApiError::new(backend, function, code, name).into())
        }
    }

    pub fn status(&self) -> i32 {
        self.code
    }
}

/// An enum covering every failure the runtime surfaces.
///
/// Backend (`Api`) and configuration errors are process-fatal at the ABI
/// boundary; everything below that boundary propagates them as ordinary
/// results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("unknown platform tag {0} in device id")]
    UnknownPlatformTag(i32),
    #[error("platform '{0}' is not registered in this build")]
    PlatformNotRegistered(&'static str),
    #[error("invalid device index {index} for platform '{platform}' ({count} device(s))")]
    InvalidDeviceIndex {
        platform: &'static str,
        index: usize,
        count: usize,
    },
    #[error("negative size {0} passed to a memory operation")]
    NegativeSize(i64),
    #[error("operation '{operation}' is not supported on platform '{platform}'")]
    Unsupported {
        platform: &'static str,
        operation: &'static str,
    },
    #[error("unsupported kernel file extension: '{0}'")]
    UnsupportedExtension(String),
    #[error("device ISA '{0}' is not usable by the code generator")]
    InvalidIsa(String),
    #[error("code generation failed during {stage}: {detail}")]
    Codegen {
        stage: &'static str,
        detail: String,
    },
    #[error("kernel compilation failed:\n{0}")]
    CompileLog(String),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    FfiNul(#[from] std::ffi::NulError),
}

impl Error {
    /// Returns the backend status code for `Api` variants.
    pub fn api_status(&self) -> Option<i32> {
        match *self {
            Error::Api(ref err) => Some(err.status()),
            _ => None,
        }
    }
}

impl From<Error> for String {
    fn from(err: Error) -> String {
        err.to_string()
    }
}
