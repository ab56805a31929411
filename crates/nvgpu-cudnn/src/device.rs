//! Host HAL device boundary.
//!
//! The bridge never owns a CUDA context; it borrows the one bound to the
//! host device it was created against, and every context-affine native
//! call must happen while that context is current on the calling thread.

use nvgpu_vm::Status;

/// A raw CUDA driver context handle (`CUcontext`).
///
/// Carried as a plain integer so holders stay `Send + Sync`; only the
/// host device dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CuContext(usize);

impl CuContext {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

/// Proof that a CUDA context is current on the calling thread.
///
/// Handed out by `CudaHalDevice::make_current`; consumed by state
/// creation so that context affinity is an explicit capability rather
/// than an ordering convention.
#[derive(Debug)]
pub struct CurrentContext {
    ctx: CuContext,
}

impl CurrentContext {
    pub fn new(ctx: CuContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> CuContext {
        self.ctx
    }
}

/// The host device abstraction this module consumes.
///
/// One device wraps one CUDA context for its whole lifetime. The module
/// retains its device so the context outlives every state created
/// against it.
pub trait CudaHalDevice: Send + Sync {
    /// The native execution context bound to this device. Stable for the
    /// device's lifetime.
    fn cuda_context(&self) -> Result<CuContext, Status>;

    /// Make this device's context current on the calling thread.
    fn make_current(&self) -> Result<CurrentContext, Status>;
}
