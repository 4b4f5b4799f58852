//! Unified error handling for xrspace
//!
//! Every fallible operation in the workspace returns [`XrResult`]. The
//! variants follow the four failure classes the tracking layer knows about:
//!
//! - **Unsupported capability**: [`XrError::Unsupported`]. Callers branch on it;
//!   it never indicates a fault.
//! - **Invalid input**: [`XrError::InvalidInput`] / [`XrError::Config`]. Raised
//!   before any side effect happens.
//! - **Backend fault**: [`XrError::Backend`]. Surfaced to sessions as a
//!   notification, never terminates one.
//! - **Programming error**: [`XrError::Internal`], created with
//!   [`xr_internal!`](crate::xr_internal) so the offending call site is recorded.

use thiserror::Error;

/// Main error type for xrspace operations
#[derive(Debug, Error)]
pub enum XrError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracking backend reported a failure
    #[error("Backend '{backend}' error: {message}")]
    Backend { backend: String, message: String },

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Capability not offered by the active backend
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Resource not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Already exists errors (for creation operations)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Operation attempted on a session that has ended
    #[error("Session has ended")]
    SessionEnded,

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A single-resolution result was abandoned before it settled
    #[error("Canceled: {0}")]
    Canceled(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Contract violations with source location for debugging.
    /// Use the `xr_internal!()` macro to create these; it captures file/line automatically.
    #[error("Internal error: {message} (at {file}:{line})")]
    Internal {
        message: String,
        file: &'static str,
        line: u32,
    },
}

/// Create an internal error with automatic file/line capture.
///
/// ```rust,ignore
/// use xrspace_core::xr_internal;
/// return Err(xr_internal!("anchor '{}' is not registered", uid));
/// ```
#[macro_export]
macro_rules! xr_internal {
    ($($arg:tt)*) => {
        $crate::error::XrError::Internal {
            message: format!($($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Convenience type alias for Results using XrError
pub type XrResult<T> = std::result::Result<T, XrError>;

/// Short alias, `Result<T>` is equivalent to `XrResult<T>`
pub type Result<T> = XrResult<T>;

impl From<toml::de::Error> for XrError {
    fn from(err: toml::de::Error) -> Self {
        XrError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for XrError {
    fn from(err: toml::ser::Error) -> Self {
        XrError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for XrError {
    fn from(err: serde_yaml::Error) -> Self {
        XrError::Config(format!("YAML error: {}", err))
    }
}

impl XrError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        XrError::Config(msg.into())
    }

    /// Create a backend error with backend name and message
    pub fn backend<S: Into<String>, T: Into<String>>(backend: S, message: T) -> Self {
        XrError::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        XrError::InvalidInput(msg.into())
    }

    /// Create an unsupported-capability error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        XrError::Unsupported(msg.into())
    }

    /// True for the "capability not offered" class
    pub fn is_unsupported(&self) -> bool {
        matches!(self, XrError::Unsupported(_))
    }

    /// True for failures reported by a tracking backend
    pub fn is_backend_fault(&self) -> bool {
        matches!(self, XrError::Backend { .. })
    }

    /// True for contract violations raised through `xr_internal!`
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, XrError::Internal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_macro_captures_location() {
        let err = xr_internal!("missing anchor '{}'", "a-1");
        match &err {
            XrError::Internal { message, file, line } => {
                assert_eq!(message, "missing anchor 'a-1'");
                assert!(file.ends_with("error.rs"));
                assert!(*line > 0);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_classification() {
        assert!(XrError::unsupported("light estimate").is_unsupported());
        assert!(XrError::backend("native-ar", "lost tracking").is_backend_fault());
        assert!(!XrError::invalid_input("x").is_unsupported());
    }

    #[test]
    fn test_error_display() {
        let err = XrError::backend("native-ar", "session interrupted");
        assert_eq!(
            err.to_string(),
            "Backend 'native-ar' error: session interrupted"
        );
    }

    #[test]
    fn test_yaml_error_converts_to_config() {
        let parsed: std::result::Result<Vec<u32>, _> = serde_yaml::from_str("{ not: [valid");
        let err: XrError = parsed.unwrap_err().into();
        assert!(matches!(err, XrError::Config(_)));
    }
}
