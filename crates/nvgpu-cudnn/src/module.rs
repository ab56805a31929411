//! The cuDNN custom module: per-context state, the operations it exposes
//! to the VM dispatcher, and the host-facing registration entry points.

use std::ptr;
use std::sync::Arc;

use smallvec::SmallVec;

use nvgpu_vm::{Instance, List, NativeFunction, NativeModule, OpaqueRef, Status, Value};

use crate::device::{CuContext, CudaHalDevice};
use crate::dtype::DataType;
use crate::error::CudnnError;
use crate::ffi::{self, CudnnHandleT, CudnnSymbols};
use crate::layout::row_major_strides;
use crate::tensor::{ArgTensor, CudnnTensor, CUDNN_TENSOR_TYPE};

/// Name the module registers its operations under.
pub const MODULE_NAME: &str = "cudnn";
pub const MODULE_VERSION: u32 = 0;

// ---------------------------------------------------------------------------
// Module state
// ---------------------------------------------------------------------------

/// Per-context module state: one resolved symbol table and one cuDNN
/// handle, created and destroyed as a pair.
///
/// Thread-compatible, not thread-safe: the VM dispatcher invokes
/// operations on one state strictly sequentially, so the handle needs no
/// internal locking.
#[derive(Debug)]
pub struct CudnnModuleState {
    syms: CudnnSymbols,
    handle: CudnnHandleT,
}

// Safety: the raw handle may move between threads with the state; the
// dispatcher contract above serializes every native call through it.
unsafe impl Send for CudnnModuleState {}

impl CudnnModuleState {
    /// Take ownership of an already-created handle and the symbol table
    /// that will destroy it.
    pub fn new(syms: CudnnSymbols, handle: CudnnHandleT) -> Self {
        Self { syms, handle }
    }

    /// Create a handle through `syms` and wrap it as a new state.
    ///
    /// The caller must have the owning CUDA context current; see
    /// `CudnnModule::create_state`.
    pub fn create(syms: CudnnSymbols) -> Result<Self, CudnnError> {
        let mut handle: CudnnHandleT = ptr::null_mut();
        ffi::check(&syms, unsafe { (syms.cudnn_create)(&mut handle) }, "cudnnCreate")?;
        Ok(Self::new(syms, handle))
    }

    /// Raw cuDNN handle, for graph construction and execution layers.
    pub fn handle(&self) -> CudnnHandleT {
        self.handle
    }

    /// `tensor.arg`: build a graph argument tensor from VM values.
    ///
    /// Validates the dtype code, copies the dimension list out of the
    /// VM-owned container, derives row-major strides, and constructs the
    /// native tensor descriptor. Any failure constructs nothing.
    pub fn create_tensor_arg(
        &mut self,
        dtype: i64,
        dims: &List,
        uid: i64,
        alignment: i64,
    ) -> Result<OpaqueRef, Status> {
        let data_type = DataType::from_code(dtype)?;
        let dims = load_i64_vec(dims)?;
        let strides = row_major_strides(&dims);
        let tensor = ArgTensor::create(self.syms, dims, strides, uid, data_type, alignment)?;
        OpaqueRef::new(CudnnTensor::Arg(tensor))
    }

    /// `tensor.debug`: write a one-line description of `tensor` to the
    /// diagnostic stream.
    pub fn print_tensor_debug(&self, tensor: &OpaqueRef) -> Result<(), Status> {
        let tensor = tensor.downcast_ref::<CudnnTensor>().ok_or_else(|| {
            Status::invalid_argument(format!(
                "expected a {} ref, got {}",
                CUDNN_TENSOR_TYPE.name(),
                tensor.type_name()
            ))
        })?;
        eprintln!("{}", tensor.describe());
        Ok(())
    }
}

impl Drop for CudnnModuleState {
    fn drop(&mut self) {
        let status = unsafe { (self.syms.cudnn_destroy)(self.handle) };
        // A failed teardown means the handle or its context is already
        // corrupt; there is no recovery path worth taking.
        assert_eq!(
            status, ffi::CUDNN_STATUS_SUCCESS,
            "cudnnDestroy failed with status {status}"
        );
    }
}

/// Copy every element of a VM list out as an `i64`.
fn load_i64_vec(list: &List) -> Result<SmallVec<[i64; 4]>, Status> {
    let mut values = SmallVec::with_capacity(list.len());
    for i in 0..list.len() {
        values.push(list.get_i64(i)?);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// VM dispatch wrappers
// ---------------------------------------------------------------------------

fn arg_i64(args: &[Value], index: usize, what: &str) -> Result<i64, Status> {
    args.get(index)
        .ok_or_else(|| Status::invalid_argument(format!("missing argument {index} ({what})")))?
        .as_i64()
        .ok_or_else(|| {
            Status::invalid_argument(format!("argument {index} ({what}) must be an integer"))
        })
}

fn arg_ref<'a>(args: &'a [Value], index: usize, what: &str) -> Result<&'a OpaqueRef, Status> {
    args.get(index)
        .ok_or_else(|| Status::invalid_argument(format!("missing argument {index} ({what})")))?
        .as_opaque_ref()
        .ok_or_else(|| Status::invalid_argument(format!("argument {index} ({what}) must be a ref")))
}

fn tensor_arg(state: &mut CudnnModuleState, args: &[Value]) -> Result<Option<Value>, Status> {
    let dtype = arg_i64(args, 0, "dtype")?;
    let dims_ref = arg_ref(args, 1, "dims")?;
    let dims = dims_ref.downcast_ref::<List>().ok_or_else(|| {
        Status::invalid_argument(format!(
            "argument 1 (dims) must be a vm.list ref, got {}",
            dims_ref.type_name()
        ))
    })?;
    let uid = arg_i64(args, 2, "uid")?;
    let alignment = arg_i64(args, 3, "alignment")?;
    let tensor = state.create_tensor_arg(dtype, dims, uid, alignment)?;
    Ok(Some(Value::Ref(tensor)))
}

fn tensor_debug(state: &mut CudnnModuleState, args: &[Value]) -> Result<Option<Value>, Status> {
    let tensor = arg_ref(args, 0, "tensor")?;
    state.print_tensor_debug(tensor)?;
    Ok(None)
}

static CUDNN_FUNCTIONS: [NativeFunction<CudnnModuleState>; 2] = [
    NativeFunction {
        name: "tensor.arg",
        call: tensor_arg,
    },
    NativeFunction {
        name: "tensor.debug",
        call: tensor_debug,
    },
];

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// The cuDNN module bound to one VM instance and one HAL device.
///
/// Retains the device so the CUDA context wrapped by it outlives the
/// module and every state created through it. Exactly one execution
/// context per module, fixed at construction.
pub struct CudnnModule {
    instance: Arc<Instance>,
    device: Arc<dyn CudaHalDevice>,
    cuda_ctx: CuContext,
}

impl CudnnModule {
    pub fn new(
        instance: Arc<Instance>,
        device: Arc<dyn CudaHalDevice>,
        cuda_ctx: CuContext,
    ) -> Self {
        Self {
            instance,
            device,
            cuda_ctx,
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The execution context every state of this module is bound to.
    pub fn cuda_context(&self) -> CuContext {
        self.cuda_ctx
    }
}

impl NativeModule for CudnnModule {
    type State = CudnnModuleState;

    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn version(&self) -> u32 {
        MODULE_VERSION
    }

    fn functions(&self) -> &'static [NativeFunction<CudnnModuleState>] {
        &CUDNN_FUNCTIONS
    }

    /// Resolve cuDNN symbols and create a handle bound to this module's
    /// execution context.
    ///
    /// The device is asked to make its context current first, and the
    /// returned token is checked against the context cached at module
    /// construction; a mismatch fails before any handle exists.
    fn create_state(&self) -> Result<CudnnModuleState, Status> {
        let syms = ffi::cudnn_symbols().ok_or(CudnnError::NotAvailable)?;
        let current = self.device.make_current()?;
        if current.context() != self.cuda_ctx {
            return Err(CudnnError::WrongContext {
                expected: self.cuda_ctx,
                actual: current.context(),
            }
            .into());
        }
        let state = CudnnModuleState::create(syms)?;
        tracing::debug!(context = self.cuda_ctx.raw(), "created cuDNN module state");
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Registration entry points
// ---------------------------------------------------------------------------

/// Instantiate the cuDNN module against `device`.
///
/// Queries the device's execution context (propagating failure as-is)
/// and binds the module to it for the module's lifetime.
pub fn create(
    instance: &Arc<Instance>,
    device: Arc<dyn CudaHalDevice>,
) -> Result<CudnnModule, Status> {
    let cuda_ctx = device.cuda_context()?;
    Ok(CudnnModule::new(Arc::clone(instance), device, cuda_ctx))
}

/// Register every tensor type this module defines. Idempotent; must run
/// before any tensor value crosses the VM boundary.
pub fn register_types(instance: &Instance) -> Result<(), Status> {
    instance.register_type(&CUDNN_TENSOR_TYPE)
}
