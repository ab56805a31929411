use nvgpu_vm::Status;

use crate::device::CuContext;
use crate::ffi;

/// cuDNN bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum CudnnError {
    #[error("cuDNN not available (no loadable library among {names:?}; override with {env})",
        names = ffi::LIBRARY_CANDIDATES, env = ffi::LIBRARY_ENV)]
    NotAvailable,

    #[error("unsupported cuDNN data type code {0}")]
    UnsupportedDataType(i64),

    #[error("cuDNN error {code} in {call}: {msg}")]
    Native {
        call: &'static str,
        code: i32,
        msg: String,
    },

    #[error("CUDA context mismatch: module is bound to {expected:?} but {actual:?} is current")]
    WrongContext {
        expected: CuContext,
        actual: CuContext,
    },
}

impl From<CudnnError> for Status {
    fn from(err: CudnnError) -> Self {
        let message = err.to_string();
        match err {
            CudnnError::NotAvailable => Status::unavailable(message),
            CudnnError::UnsupportedDataType(_) => Status::invalid_argument(message),
            CudnnError::Native { .. } => Status::internal(message),
            CudnnError::WrongContext { .. } => Status::failed_precondition(message),
        }
    }
}
