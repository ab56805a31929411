//! The VM-owned ordered value container.
//!
//! Lists are themselves a registered reference type (`vm.list`), so a
//! list travels inside `Value::Ref` like any other opaque object. Module
//! operations never borrow list storage across calls; they copy elements
//! out through the checked accessors.

use std::any::Any;

use crate::refs::{RefObject, TypeDescriptor};
use crate::status::Status;
use crate::value::Value;

/// Builtin type descriptor for VM lists, registered by `Instance::new`.
pub static LIST_TYPE: TypeDescriptor = TypeDescriptor::new("vm.list");

#[derive(Debug, Clone, Default)]
pub struct List {
    items: Vec<Value>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        Self { items }
    }

    /// Convenience constructor for integer lists.
    pub fn from_i64s(values: &[i64]) -> Self {
        Self {
            items: values.iter().copied().map(Value::I64).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Read element `index` as a 64-bit integer.
    ///
    /// An out-of-bounds index is `OutOfRange`; a non-integer element is
    /// `InvalidArgument`.
    pub fn get_i64(&self, index: usize) -> Result<i64, Status> {
        let value = self.items.get(index).ok_or_else(|| {
            Status::out_of_range(format!(
                "list index {index} out of range (len {})",
                self.items.len()
            ))
        })?;
        value.as_i64().ok_or_else(|| {
            Status::invalid_argument(format!(
                "list element {index} is {}, expected an integer",
                value.kind()
            ))
        })
    }
}

impl RefObject for List {
    fn type_descriptor(&self) -> &'static TypeDescriptor {
        &LIST_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
