//! # nvgpu-cudnn
//!
//! cuDNN custom module for the nvgpu host VM: exposes cuDNN's graph
//! tensor primitives as callable VM operations.
//!
//! The module owns the native-handle lifecycle per execution context,
//! translates VM values (integer codes, dimension lists) into native
//! tensor descriptors, and hands typed, reference-counted tensor objects
//! back to the VM as opaque references.
//!
//! - `cudnn.tensor.arg(dtype, dims, uid, alignment) -> tensor ref`
//! - `cudnn.tensor.debug(tensor ref)`
//!
//! cuDNN itself is loaded at runtime via dlopen (no build-time
//! dependency); graph compilation and execution live above this crate.

pub mod device;
pub mod dtype;
pub mod error;
pub mod ffi;
pub mod layout;
pub mod module;
pub mod tensor;

pub use device::{CuContext, CudaHalDevice, CurrentContext};
pub use dtype::DataType;
pub use error::CudnnError;
pub use layout::row_major_strides;
pub use module::{create, register_types, CudnnModule, CudnnModuleState};
pub use tensor::{ArgTensor, CudnnTensor, CUDNN_TENSOR_TYPE};

pub type Result<T> = std::result::Result<T, CudnnError>;
