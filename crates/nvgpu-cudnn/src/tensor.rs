//! cuDNN tensor objects exposed to the VM as opaque references.

use std::any::Any;
use std::ffi::{c_int, c_void};
use std::ptr;

use smallvec::SmallVec;

use nvgpu_vm::{RefObject, TypeDescriptor};

use crate::dtype::DataType;
use crate::ffi::{self, CudnnBackendDescriptorT, CudnnSymbols};
use crate::Result;

/// VM type descriptor for all cuDNN tensor kinds.
pub static CUDNN_TENSOR_TYPE: TypeDescriptor = TypeDescriptor::new("cudnn.tensor");

/// A cuDNN tensor as seen by the VM.
///
/// Tagged union over the closed set of tensor kinds, so operations
/// receiving "some tensor" dispatch on the tag instead of assuming a
/// kind. Graph execution adds further variants; today only the graph
/// argument placeholder exists.
pub enum CudnnTensor {
    Arg(ArgTensor),
}

impl CudnnTensor {
    /// One-line human-readable description, dispatched per kind.
    pub fn describe(&self) -> String {
        match self {
            CudnnTensor::Arg(t) => t.describe(),
        }
    }

    /// Caller-supplied unique id of the underlying tensor.
    pub fn uid(&self) -> i64 {
        match self {
            CudnnTensor::Arg(t) => t.uid(),
        }
    }
}

impl RefObject for CudnnTensor {
    fn type_descriptor(&self) -> &'static TypeDescriptor {
        &CUDNN_TENSOR_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// RAII wrapper around one cuDNN backend descriptor.
///
/// Exactly one native destroy per successful create, on every exit path.
#[derive(Debug)]
struct BackendDescriptor {
    syms: CudnnSymbols,
    raw: CudnnBackendDescriptorT,
}

// Safety: the descriptor is configured only during construction; after
// finalize it is immutable and any native access goes through the VM
// dispatcher, which serializes calls per state.
unsafe impl Send for BackendDescriptor {}
unsafe impl Sync for BackendDescriptor {}

impl BackendDescriptor {
    fn create(syms: CudnnSymbols, descriptor_type: c_int) -> Result<Self> {
        let mut raw: CudnnBackendDescriptorT = ptr::null_mut();
        ffi::check(
            &syms,
            unsafe { (syms.backend_create_descriptor)(descriptor_type, &mut raw) },
            "cudnnBackendCreateDescriptor",
        )?;
        Ok(Self { syms, raw })
    }

    fn set_i64_array(&mut self, attribute: c_int, values: &[i64]) -> Result<()> {
        ffi::check(
            &self.syms,
            unsafe {
                (self.syms.backend_set_attribute)(
                    self.raw,
                    attribute,
                    ffi::CUDNN_TYPE_INT64,
                    values.len() as i64,
                    values.as_ptr() as *const c_void,
                )
            },
            "cudnnBackendSetAttribute",
        )
    }

    fn set_i64(&mut self, attribute: c_int, value: i64) -> Result<()> {
        self.set_i64_array(attribute, std::slice::from_ref(&value))
    }

    fn set_data_type(&mut self, attribute: c_int, data_type: DataType) -> Result<()> {
        let native: c_int = data_type.code() as c_int;
        ffi::check(
            &self.syms,
            unsafe {
                (self.syms.backend_set_attribute)(
                    self.raw,
                    attribute,
                    ffi::CUDNN_TYPE_DATA_TYPE,
                    1,
                    &native as *const c_int as *const c_void,
                )
            },
            "cudnnBackendSetAttribute",
        )
    }

    fn finalize(&mut self) -> Result<()> {
        ffi::check(
            &self.syms,
            unsafe { (self.syms.backend_finalize)(self.raw) },
            "cudnnBackendFinalize",
        )
    }
}

impl Drop for BackendDescriptor {
    fn drop(&mut self) {
        let _ = unsafe { (self.syms.backend_destroy_descriptor)(self.raw) };
    }
}

/// A graph argument tensor: the placeholder bound to real data when a
/// (out-of-scope) cuDNN graph is executed.
///
/// Owns one finalized backend tensor descriptor plus the metadata it was
/// built from.
#[derive(Debug)]
pub struct ArgTensor {
    desc: BackendDescriptor,
    dims: SmallVec<[i64; 4]>,
    strides: SmallVec<[i64; 4]>,
    uid: i64,
    data_type: DataType,
    alignment: i64,
}

impl ArgTensor {
    /// Build and finalize a backend tensor descriptor.
    ///
    /// `dims` and `strides` must have equal length. Every native step is
    /// checked; on failure the partially configured descriptor is
    /// destroyed and no tensor is returned.
    pub fn create(
        syms: CudnnSymbols,
        dims: SmallVec<[i64; 4]>,
        strides: SmallVec<[i64; 4]>,
        uid: i64,
        data_type: DataType,
        alignment: i64,
    ) -> Result<Self> {
        debug_assert_eq!(dims.len(), strides.len());
        let mut desc = BackendDescriptor::create(syms, ffi::CUDNN_BACKEND_TENSOR_DESCRIPTOR)?;
        desc.set_data_type(ffi::CUDNN_ATTR_TENSOR_DATA_TYPE, data_type)?;
        desc.set_i64_array(ffi::CUDNN_ATTR_TENSOR_DIMENSIONS, &dims)?;
        desc.set_i64_array(ffi::CUDNN_ATTR_TENSOR_STRIDES, &strides)?;
        desc.set_i64(ffi::CUDNN_ATTR_TENSOR_UNIQUE_ID, uid)?;
        desc.set_i64(ffi::CUDNN_ATTR_TENSOR_BYTE_ALIGNMENT, alignment)?;
        desc.finalize()?;
        Ok(Self {
            desc,
            dims,
            strides,
            uid,
            data_type,
            alignment,
        })
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn strides(&self) -> &[i64] {
        &self.strides
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn alignment(&self) -> i64 {
        self.alignment
    }

    /// Raw backend descriptor handle, for graph construction layers.
    pub fn raw_descriptor(&self) -> CudnnBackendDescriptorT {
        self.desc.raw
    }

    pub fn describe(&self) -> String {
        format!(
            "CudnnArgTensor(uid={}, dtype={}, dims={:?}, strides={:?}, alignment={})",
            self.uid, self.data_type, self.dims, self.strides, self.alignment
        )
    }
}
