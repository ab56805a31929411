//! Reference-counted opaque objects crossing the VM boundary.
//!
//! A module hands values back to the VM as `OpaqueRef`s: shared-ownership
//! handles the VM's garbage collector tracks by reference count. The
//! wrapped object is destroyed when the last reference drops. Before a
//! type's values may cross the boundary its `TypeDescriptor` must be
//! registered with the instance (see `Instance::register_type`).

use std::any::Any;
use std::sync::{Arc, OnceLock};

use crate::status::Status;

/// Describes one opaque reference type to the VM.
///
/// Declared as a `static` by the module that owns the type. Starts
/// unregistered; `Instance::register_type` latches it exactly once.
pub struct TypeDescriptor {
    name: &'static str,
    registered: OnceLock<()>,
}

impl TypeDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            registered: OnceLock::new(),
        }
    }

    /// Display name of the type, e.g. `cudnn.tensor`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_registered(&self) -> bool {
        self.registered.get().is_some()
    }

    pub(crate) fn mark_registered(&self) {
        let _ = self.registered.set(());
    }
}

/// An object that can live behind an `OpaqueRef`.
pub trait RefObject: Send + Sync + 'static {
    /// The registered VM type this object belongs to.
    fn type_descriptor(&self) -> &'static TypeDescriptor;

    /// Checked-downcast hook; implementations return `self`.
    fn as_any(&self) -> &dyn Any;
}

/// A reference-counted handle to an opaque object.
///
/// Cloning bumps the reference count; the wrapped object's `Drop` is the
/// type's destroy entry point and runs when the last clone is released.
#[derive(Clone)]
pub struct OpaqueRef(Arc<dyn RefObject>);

impl OpaqueRef {
    /// Wrap `value` as a counted reference.
    ///
    /// Fails if the value's type was never registered — the VM cannot
    /// track references of unknown types.
    pub fn new<T: RefObject>(value: T) -> Result<Self, Status> {
        let descriptor = value.type_descriptor();
        if !descriptor.is_registered() {
            return Err(Status::failed_precondition(format!(
                "type '{}' is not registered with the VM instance",
                descriptor.name()
            )));
        }
        Ok(Self(Arc::new(value)))
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_descriptor().name()
    }

    /// Downcast to the concrete object type, if it matches.
    pub fn downcast_ref<T: RefObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Whether two refs point at the same object.
    pub fn ptr_eq(&self, other: &OpaqueRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live references to the object.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl std::fmt::Debug for OpaqueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaqueRef")
            .field("type", &self.type_name())
            .field("refs", &self.ref_count())
            .finish()
    }
}
