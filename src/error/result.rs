//! Result type alias for knowledge-base operations.

use super::context::ErrorContext;
use super::kb_error::KbError;

/// Type alias for Results using KbError.
pub type KbResult<T> = Result<T, KbError>;

/// Extension trait for Result types to add context to errors.
pub trait ResultExt<T> {
    /// Add context to an error if the result is Err.
    fn context(self, ctx: ErrorContext) -> KbResult<T>;

    /// Add context using a closure (only called on error).
    fn with_context<F>(self, f: F) -> KbResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<KbError>,
{
    fn context(self, ctx: ErrorContext) -> KbResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> KbResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, ValidationError};

    #[test]
    fn test_context_extension() {
        let result: KbResult<i32> = Err(KbError::Network(NetworkError::Cancelled));
        let err = result.context(ErrorContext::new("fetch_sessions")).unwrap_err();
        assert_eq!(err.context().unwrap().operation, "fetch_sessions");
    }

    #[test]
    fn test_context_extension_preserves_ok() {
        let result: KbResult<i32> = Ok(42);
        assert_eq!(result.context(ErrorContext::new("x")).unwrap(), 42);
    }

    #[test]
    fn test_with_context_lazy_evaluation() {
        let result: KbResult<i32> = Ok(42);
        let mut called = false;
        let with_ctx = result.with_context(|| {
            called = true;
            ErrorContext::new("test")
        });
        assert!(with_ctx.is_ok());
        assert!(!called);
    }

    #[test]
    fn test_context_from_leaf_errors() {
        let io_result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not found"));
        let err = io_result
            .context(ErrorContext::new("read upload").with_url("/documents/upload"))
            .unwrap_err();
        assert!(matches!(err.inner(), KbError::Io(_)));

        let invalid: Result<(), ValidationError> = Err(ValidationError::Empty { field: "content" });
        let err = invalid
            .with_context(|| ErrorContext::new("save diary"))
            .unwrap_err();
        assert!(matches!(err.inner(), KbError::Validation(_)));
    }
}
