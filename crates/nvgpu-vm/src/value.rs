use crate::refs::OpaqueRef;

/// A VM value: a primitive or a counted reference to an opaque object.
#[derive(Debug, Clone)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Ref(OpaqueRef),
}

impl Value {
    /// Read as a 64-bit integer, widening `I32`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_opaque_ref(&self) -> Option<&OpaqueRef> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Ref(_) => "ref",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<OpaqueRef> for Value {
    fn from(r: OpaqueRef) -> Self {
        Value::Ref(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_i64_widens_i32() {
        assert_eq!(Value::I32(-7).as_i64(), Some(-7));
        assert_eq!(Value::I64(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(Value::F32(1.0).as_i64(), None);
        assert_eq!(Value::F64(1.0).as_i64(), None);
    }
}
