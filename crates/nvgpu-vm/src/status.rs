use std::fmt;

/// Error kinds a VM operation can fail with.
///
/// Closed set — the dispatcher switches on the code to decide how a
/// failure surfaces to the calling program, so modules must not invent
/// kinds of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// A caller-supplied value is malformed or outside its valid range.
    InvalidArgument,
    /// An index is outside the bounds of its container.
    OutOfRange,
    /// A named entity (function, symbol, type) does not exist.
    NotFound,
    /// A required external resource (library, device) cannot be reached.
    Unavailable,
    /// An operation was invoked before a required setup step.
    FailedPrecondition,
    /// A name is already taken by a different registration.
    AlreadyExists,
    /// The wrapped native layer reported a failure.
    Internal,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::InvalidArgument => "invalid argument",
            StatusCode::OutOfRange => "out of range",
            StatusCode::NotFound => "not found",
            StatusCode::Unavailable => "unavailable",
            StatusCode::FailedPrecondition => "failed precondition",
            StatusCode::AlreadyExists => "already exists",
            StatusCode::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

/// A tagged failure crossing the operation boundary.
///
/// Every recoverable error a module operation produces is one of these;
/// the dispatcher owns surfacing it to the calling program.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: StatusCode,
    message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OutOfRange, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Unavailable, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FailedPrecondition, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(StatusCode::AlreadyExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, message)
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let s = Status::invalid_argument("unsupported data type");
        assert_eq!(s.to_string(), "invalid argument: unsupported data type");
        assert_eq!(s.code(), StatusCode::InvalidArgument);
    }
}
