//! Runtime-loaded cuDNN function pointers via dlopen.
//!
//! No build-time cuDNN dependency: the library is located at first use
//! and its symbols resolved into a plain function-pointer table. The
//! table is `Copy` and is what module states own; the `Library` handle
//! stays alive in the process-wide cache for the rest of the process.

use std::env;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::OnceLock;

use libloading::Library;

use crate::error::CudnnError;

// ---------------------------------------------------------------------------
// cuDNN status codes
// ---------------------------------------------------------------------------

pub type CudnnStatusT = c_int;
pub const CUDNN_STATUS_SUCCESS: CudnnStatusT = 0;

// ---------------------------------------------------------------------------
// Opaque handles
// ---------------------------------------------------------------------------

pub type CudnnHandleT = *mut c_void;
pub type CudnnBackendDescriptorT = *mut c_void;

// ---------------------------------------------------------------------------
// Backend descriptor constants (cudnn_backend.h, subset used here)
// ---------------------------------------------------------------------------

// cudnnBackendDescriptorType_t
pub const CUDNN_BACKEND_TENSOR_DESCRIPTOR: c_int = 26;

// cudnnBackendAttributeName_t, tensor attribute block
pub const CUDNN_ATTR_TENSOR_BYTE_ALIGNMENT: c_int = 100;
pub const CUDNN_ATTR_TENSOR_DATA_TYPE: c_int = 101;
pub const CUDNN_ATTR_TENSOR_DIMENSIONS: c_int = 102;
pub const CUDNN_ATTR_TENSOR_STRIDES: c_int = 103;
pub const CUDNN_ATTR_TENSOR_UNIQUE_ID: c_int = 104;

// cudnnBackendAttributeType_t
pub const CUDNN_TYPE_DATA_TYPE: c_int = 1;
pub const CUDNN_TYPE_INT64: c_int = 3;

// ---------------------------------------------------------------------------
// API function signatures
// ---------------------------------------------------------------------------

pub type FnCudnnCreate = unsafe extern "C" fn(*mut CudnnHandleT) -> CudnnStatusT;
pub type FnCudnnDestroy = unsafe extern "C" fn(CudnnHandleT) -> CudnnStatusT;
pub type FnCudnnGetErrorString = unsafe extern "C" fn(CudnnStatusT) -> *const c_char;
pub type FnCudnnBackendCreateDescriptor =
    unsafe extern "C" fn(c_int, *mut CudnnBackendDescriptorT) -> CudnnStatusT;
pub type FnCudnnBackendSetAttribute = unsafe extern "C" fn(
    CudnnBackendDescriptorT,
    c_int,      // attribute name
    c_int,      // attribute type
    i64,        // element count
    *const c_void,
) -> CudnnStatusT;
pub type FnCudnnBackendFinalize =
    unsafe extern "C" fn(CudnnBackendDescriptorT) -> CudnnStatusT;
pub type FnCudnnBackendDestroyDescriptor =
    unsafe extern "C" fn(CudnnBackendDescriptorT) -> CudnnStatusT;

// ---------------------------------------------------------------------------
// Resolved symbol table
// ---------------------------------------------------------------------------

/// Resolved cuDNN entry points.
///
/// Plain function pointers, so the table is `Copy`; a module state owns
/// its own copy and releases its native handle through it.
#[derive(Clone, Copy, Debug)]
pub struct CudnnSymbols {
    pub cudnn_create: FnCudnnCreate,
    pub cudnn_destroy: FnCudnnDestroy,
    pub cudnn_get_error_string: FnCudnnGetErrorString,
    pub backend_create_descriptor: FnCudnnBackendCreateDescriptor,
    pub backend_set_attribute: FnCudnnBackendSetAttribute,
    pub backend_finalize: FnCudnnBackendFinalize,
    pub backend_destroy_descriptor: FnCudnnBackendDestroyDescriptor,
}

impl CudnnSymbols {
    fn resolve(lib: &Library) -> Option<Self> {
        unsafe {
            Some(CudnnSymbols {
                cudnn_create: *lib.get::<FnCudnnCreate>(b"cudnnCreate\0").ok()?,
                cudnn_destroy: *lib.get::<FnCudnnDestroy>(b"cudnnDestroy\0").ok()?,
                cudnn_get_error_string: *lib
                    .get::<FnCudnnGetErrorString>(b"cudnnGetErrorString\0")
                    .ok()?,
                backend_create_descriptor: *lib
                    .get::<FnCudnnBackendCreateDescriptor>(b"cudnnBackendCreateDescriptor\0")
                    .ok()?,
                backend_set_attribute: *lib
                    .get::<FnCudnnBackendSetAttribute>(b"cudnnBackendSetAttribute\0")
                    .ok()?,
                backend_finalize: *lib
                    .get::<FnCudnnBackendFinalize>(b"cudnnBackendFinalize\0")
                    .ok()?,
                backend_destroy_descriptor: *lib
                    .get::<FnCudnnBackendDestroyDescriptor>(b"cudnnBackendDestroyDescriptor\0")
                    .ok()?,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Library loading
// ---------------------------------------------------------------------------

/// Environment variable overriding the cuDNN library path.
pub const LIBRARY_ENV: &str = "NVGPU_CUDNN_LIBRARY";

/// Sonames probed when no override is set, newest first.
pub const LIBRARY_CANDIDATES: &[&str] = &["libcudnn.so.9", "libcudnn.so.8", "libcudnn.so"];

struct LoadedCudnn {
    _lib: Library,
    syms: CudnnSymbols,
}

static CUDNN: OnceLock<Option<LoadedCudnn>> = OnceLock::new();

fn try_load() -> Option<LoadedCudnn> {
    let override_path = env::var(LIBRARY_ENV).ok().filter(|p| !p.trim().is_empty());
    let candidates: Vec<String> = match override_path {
        Some(path) => vec![path],
        None => LIBRARY_CANDIDATES.iter().map(|s| s.to_string()).collect(),
    };
    for name in candidates {
        let lib = match unsafe { Library::new(&name) } {
            Ok(lib) => lib,
            Err(_) => continue,
        };
        if let Some(syms) = CudnnSymbols::resolve(&lib) {
            tracing::debug!(library = %name, "resolved cuDNN symbols");
            return Some(LoadedCudnn { _lib: lib, syms });
        }
    }
    None
}

/// Get the process-wide resolved cuDNN symbol table.
/// Returns `None` if no cuDNN library can be located and resolved.
pub fn cudnn_symbols() -> Option<CudnnSymbols> {
    CUDNN.get_or_init(try_load).as_ref().map(|loaded| loaded.syms)
}

// ---------------------------------------------------------------------------
// Error checking helpers
// ---------------------------------------------------------------------------

/// Human-readable message for a cuDNN status, via the library itself.
pub fn error_string(syms: &CudnnSymbols, status: CudnnStatusT) -> String {
    let ptr = unsafe { (syms.cudnn_get_error_string)(status) };
    if ptr.is_null() {
        return "unknown cuDNN status".to_string();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Check a cuDNN API return code.
pub fn check(
    syms: &CudnnSymbols,
    status: CudnnStatusT,
    call: &'static str,
) -> Result<(), CudnnError> {
    if status == CUDNN_STATUS_SUCCESS {
        Ok(())
    } else {
        Err(CudnnError::Native {
            call,
            code: status,
            msg: error_string(syms, status),
        })
    }
}
