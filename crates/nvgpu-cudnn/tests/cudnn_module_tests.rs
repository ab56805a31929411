//! End-to-end tests for the cuDNN module against stub symbol tables.
//!
//! No GPU or cuDNN install is required: states are constructed from
//! locally defined `extern "C"` stubs, and the scenarios that depend on
//! the real library being absent guard on that before asserting.

use std::ffi::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nvgpu_cudnn::ffi::{self, CudnnBackendDescriptorT, CudnnHandleT, CudnnStatusT, CudnnSymbols};
use nvgpu_cudnn::{
    create, register_types, CuContext, CudaHalDevice, CudnnModule, CudnnModuleState, CudnnTensor,
    CurrentContext,
};
use nvgpu_vm::{Instance, List, NativeModule, OpaqueRef, Status, StatusCode, Value};

// ---------------------------------------------------------------------------
// Stub cuDNN
// ---------------------------------------------------------------------------

unsafe extern "C" fn stub_create(out: *mut CudnnHandleT) -> CudnnStatusT {
    *out = 0x1000 as CudnnHandleT;
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn stub_destroy(_handle: CudnnHandleT) -> CudnnStatusT {
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn stub_error_string(_status: CudnnStatusT) -> *const c_char {
    c"CUDNN_STATUS_ALLOC_FAILED".as_ptr()
}

unsafe extern "C" fn stub_desc_create(
    _kind: c_int,
    out: *mut CudnnBackendDescriptorT,
) -> CudnnStatusT {
    *out = 0x2000 as CudnnBackendDescriptorT;
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn stub_set_attribute(
    _desc: CudnnBackendDescriptorT,
    _name: c_int,
    _ty: c_int,
    _count: i64,
    _values: *const c_void,
) -> CudnnStatusT {
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn stub_finalize(_desc: CudnnBackendDescriptorT) -> CudnnStatusT {
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn stub_desc_destroy(_desc: CudnnBackendDescriptorT) -> CudnnStatusT {
    ffi::CUDNN_STATUS_SUCCESS
}

fn ok_symbols() -> CudnnSymbols {
    CudnnSymbols {
        cudnn_create: stub_create,
        cudnn_destroy: stub_destroy,
        cudnn_get_error_string: stub_error_string,
        backend_create_descriptor: stub_desc_create,
        backend_set_attribute: stub_set_attribute,
        backend_finalize: stub_finalize,
        backend_destroy_descriptor: stub_desc_destroy,
    }
}

// Counting variants. Tests that assert on the counters serialize through
// COUNT_LOCK so parallel test threads cannot skew the deltas.

static COUNT_LOCK: Mutex<()> = Mutex::new(());
static HANDLES_CREATED: AtomicUsize = AtomicUsize::new(0);
static HANDLES_DESTROYED: AtomicUsize = AtomicUsize::new(0);
static DESCS_CREATED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn counting_create(out: *mut CudnnHandleT) -> CudnnStatusT {
    HANDLES_CREATED.fetch_add(1, Ordering::SeqCst);
    *out = 0x1000 as CudnnHandleT;
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn counting_create_fail(_out: *mut CudnnHandleT) -> CudnnStatusT {
    2 // CUDNN_STATUS_ALLOC_FAILED
}

unsafe extern "C" fn counting_destroy(_handle: CudnnHandleT) -> CudnnStatusT {
    HANDLES_DESTROYED.fetch_add(1, Ordering::SeqCst);
    ffi::CUDNN_STATUS_SUCCESS
}

unsafe extern "C" fn counting_desc_create(
    _kind: c_int,
    out: *mut CudnnBackendDescriptorT,
) -> CudnnStatusT {
    DESCS_CREATED.fetch_add(1, Ordering::SeqCst);
    *out = 0x2000 as CudnnBackendDescriptorT;
    ffi::CUDNN_STATUS_SUCCESS
}

fn counting_symbols() -> CudnnSymbols {
    CudnnSymbols {
        cudnn_create: counting_create,
        cudnn_destroy: counting_destroy,
        backend_create_descriptor: counting_desc_create,
        ..ok_symbols()
    }
}

// ---------------------------------------------------------------------------
// Fake HAL device
// ---------------------------------------------------------------------------

struct FakeDevice {
    ctx: CuContext,
}

impl CudaHalDevice for FakeDevice {
    fn cuda_context(&self) -> Result<CuContext, Status> {
        Ok(self.ctx)
    }

    fn make_current(&self) -> Result<CurrentContext, Status> {
        Ok(CurrentContext::new(self.ctx))
    }
}

fn test_module(instance: &Arc<Instance>) -> CudnnModule {
    let device = Arc::new(FakeDevice {
        ctx: CuContext::from_raw(0xc0de),
    });
    create(instance, device).unwrap()
}

fn dims_list(dims: &[i64]) -> Value {
    Value::Ref(OpaqueRef::new(List::from_i64s(dims)).unwrap())
}

fn setup() -> (Arc<Instance>, CudnnModule, CudnnModuleState) {
    let instance = Arc::new(Instance::new());
    register_types(&instance).unwrap();
    let module = test_module(&instance);
    let state = CudnnModuleState::create(ok_symbols()).unwrap();
    (instance, module, state)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_tensor_arg_end_to_end() {
    let (_instance, module, mut state) = setup();

    let args = [
        Value::I64(0), // float
        dims_list(&[2, 3, 4]),
        Value::I64(7),
        Value::I64(16),
    ];
    let out = module.invoke(&mut state, "tensor.arg", &args).unwrap();
    let tensor_ref = match out {
        Some(Value::Ref(r)) => r,
        other => panic!("expected a tensor ref, got {other:?}"),
    };
    assert_eq!(tensor_ref.type_name(), "cudnn.tensor");

    let tensor = tensor_ref.downcast_ref::<CudnnTensor>().unwrap();
    let CudnnTensor::Arg(arg) = tensor;
    assert_eq!(arg.dims(), &[2, 3, 4]);
    assert_eq!(arg.strides(), &[12, 4, 1]);
    assert_eq!(arg.uid(), 7);
    assert_eq!(arg.alignment(), 16);

    let desc = tensor.describe();
    assert!(desc.contains("[2, 3, 4]"));
    assert!(desc.contains("[12, 4, 1]"));

    // Debug print must accept the ref and produce no value.
    let out = module
        .invoke(&mut state, "tensor.debug", &[Value::Ref(tensor_ref)])
        .unwrap();
    assert!(out.is_none());
}

#[test]
fn test_invalid_dtype_makes_no_native_call() {
    let _guard = COUNT_LOCK.lock().unwrap();
    let (_instance, module, _state) = setup();
    let mut state = CudnnModuleState::create(counting_symbols()).unwrap();

    let before = DESCS_CREATED.load(Ordering::SeqCst);
    let args = [Value::I64(999), dims_list(&[2, 2]), Value::I64(1), Value::I64(4)];
    let err = module.invoke(&mut state, "tensor.arg", &args).unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidArgument);
    assert!(err.message().contains("999"));
    assert_eq!(DESCS_CREATED.load(Ordering::SeqCst), before);
}

#[test]
fn test_non_integer_dim_rejected() {
    let _guard = COUNT_LOCK.lock().unwrap();
    let (_instance, module, _state) = setup();
    let mut state = CudnnModuleState::create(counting_symbols()).unwrap();

    let mut dims = List::from_i64s(&[2]);
    dims.push(Value::F32(3.0));
    let before = DESCS_CREATED.load(Ordering::SeqCst);
    let args = [
        Value::I64(0),
        Value::Ref(OpaqueRef::new(dims).unwrap()),
        Value::I64(1),
        Value::I64(4),
    ];
    let err = module.invoke(&mut state, "tensor.arg", &args).unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidArgument);
    assert!(err.message().contains("f32"));
    assert_eq!(DESCS_CREATED.load(Ordering::SeqCst), before);
}

#[test]
fn test_identical_calls_produce_distinct_refs() {
    let (_instance, module, mut state) = setup();

    let make = |state: &mut CudnnModuleState| {
        let args = [Value::I64(0), dims_list(&[4, 4]), Value::I64(9), Value::I64(8)];
        match module.invoke(state, "tensor.arg", &args).unwrap() {
            Some(Value::Ref(r)) => r,
            other => panic!("expected a tensor ref, got {other:?}"),
        }
    };
    let a = make(&mut state);
    let b = make(&mut state);
    assert!(!a.ptr_eq(&b));
}

#[test]
fn test_state_drop_destroys_handle_once() {
    let _guard = COUNT_LOCK.lock().unwrap();

    let created_before = HANDLES_CREATED.load(Ordering::SeqCst);
    let destroyed_before = HANDLES_DESTROYED.load(Ordering::SeqCst);

    let state = CudnnModuleState::create(counting_symbols()).unwrap();
    assert_eq!(HANDLES_CREATED.load(Ordering::SeqCst), created_before + 1);
    assert_eq!(HANDLES_DESTROYED.load(Ordering::SeqCst), destroyed_before);

    drop(state);
    assert_eq!(HANDLES_DESTROYED.load(Ordering::SeqCst), destroyed_before + 1);
}

#[test]
fn test_failed_handle_creation_destroys_nothing() {
    let _guard = COUNT_LOCK.lock().unwrap();

    let destroyed_before = HANDLES_DESTROYED.load(Ordering::SeqCst);
    let syms = CudnnSymbols {
        cudnn_create: counting_create_fail,
        cudnn_destroy: counting_destroy,
        ..ok_symbols()
    };
    let err = CudnnModuleState::create(syms).unwrap_err();
    assert!(err.to_string().contains("cudnnCreate"));
    assert_eq!(HANDLES_DESTROYED.load(Ordering::SeqCst), destroyed_before);
}

#[test]
fn test_register_types_is_idempotent() {
    let instance = Instance::new();
    register_types(&instance).unwrap();
    register_types(&instance).unwrap();
    assert!(instance.lookup_type("cudnn.tensor").is_some());
}

#[test]
fn test_debug_rejects_non_tensor_ref() {
    let (_instance, module, mut state) = setup();

    let not_a_tensor = dims_list(&[1, 2]);
    let err = module
        .invoke(&mut state, "tensor.debug", &[not_a_tensor])
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidArgument);
    assert!(err.message().contains("vm.list"));
}

#[test]
fn test_unknown_function_not_found() {
    let (_instance, module, mut state) = setup();
    let err = module.invoke(&mut state, "tensor.gone", &[]).unwrap_err();
    assert_eq!(err.code(), StatusCode::NotFound);
}

#[test]
fn test_module_identity_and_context() {
    let instance = Arc::new(Instance::new());
    let module = test_module(&instance);
    assert_eq!(module.name(), "cudnn");
    assert_eq!(module.version(), 0);
    let names: Vec<_> = module.functions().iter().map(|f| f.name).collect();
    assert_eq!(names, ["tensor.arg", "tensor.debug"]);
    assert_eq!(module.cuda_context(), CuContext::from_raw(0xc0de));
}

#[test]
fn test_missing_library_fails_unavailable() {
    // Only meaningful where no real cuDNN is installed.
    if ffi::cudnn_symbols().is_some() {
        return;
    }
    let instance = Arc::new(Instance::new());
    register_types(&instance).unwrap();
    let module = test_module(&instance);
    let err = module.create_state().unwrap_err();
    assert_eq!(err.code(), StatusCode::Unavailable);
}
