//! VM instance: the process-facing registry of reference types.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::list::LIST_TYPE;
use crate::refs::TypeDescriptor;
use crate::status::Status;

/// One VM instance.
///
/// Holds the table of registered reference types. Registration is
/// one-shot per type and has process lifetime — there is no teardown.
pub struct Instance {
    types: Mutex<HashMap<&'static str, &'static TypeDescriptor>>,
}

impl Instance {
    pub fn new() -> Self {
        let instance = Self {
            types: Mutex::new(HashMap::new()),
        };
        // Builtin container type; infallible on a fresh table.
        instance
            .register_type(&LIST_TYPE)
            .expect("builtin list type registration");
        instance
    }

    /// Register a reference type.
    ///
    /// Idempotent: registering the same descriptor again succeeds without
    /// altering it. A *different* descriptor under an already-taken name
    /// is rejected with `AlreadyExists`.
    pub fn register_type(&self, descriptor: &'static TypeDescriptor) -> Result<(), Status> {
        let mut types = self.types.lock();
        match types.get(descriptor.name()) {
            Some(existing) if std::ptr::eq(*existing, descriptor) => Ok(()),
            Some(_) => Err(Status::already_exists(format!(
                "type name '{}' is already registered to a different descriptor",
                descriptor.name()
            ))),
            None => {
                descriptor.mark_registered();
                types.insert(descriptor.name(), descriptor);
                Ok(())
            }
        }
    }

    /// Look up a registered type by name.
    pub fn lookup_type(&self, name: &str) -> Option<&'static TypeDescriptor> {
        self.types.lock().get(name).copied()
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
