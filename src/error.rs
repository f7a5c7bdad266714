//! Error types for Sugerir operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for Sugerir operations.
///
/// Covers caller misuse (bad arguments, unknown users or items), failures in
/// the underlying preference data, and operations a component's configuration
/// does not support.
///
/// An *undefined* estimate or similarity is not an error: those surface as
/// `f64::NAN` so callers can skip them in aggregations.
///
/// # Examples
///
/// ```
/// use sugerir::error::SugerirError;
///
/// let err = SugerirError::InvalidArgument {
///     param: "how_many".to_string(),
///     value: "0".to_string(),
///     constraint: ">= 1".to_string(),
/// };
/// assert!(err.to_string().contains("Invalid argument"));
/// ```
#[derive(Debug)]
pub enum SugerirError {
    /// Caller-supplied argument violates a documented constraint.
    InvalidArgument {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// No user exists with the given id.
    NoSuchUser {
        /// The unknown user id
        user_id: u64,
    },

    /// No item (or no preference for the item) exists with the given id.
    NoSuchItem {
        /// The unknown item id
        item_id: u64,
    },

    /// Failure reading or writing the underlying preference data.
    DataAccess {
        /// Error description
        message: String,
    },

    /// Operation not supported by this component's configuration.
    Unsupported {
        /// Operation name
        operation: String,
        /// Why the configuration forbids it
        reason: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for SugerirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SugerirError::InvalidArgument {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid argument: {param} = {value}, expected {constraint}"
                )
            }
            SugerirError::NoSuchUser { user_id } => {
                write!(f, "No such user: {user_id}")
            }
            SugerirError::NoSuchItem { item_id } => {
                write!(f, "No such item: {item_id}")
            }
            SugerirError::DataAccess { message } => {
                write!(f, "Data access failure: {message}")
            }
            SugerirError::Unsupported { operation, reason } => {
                write!(f, "Unsupported operation: {operation} ({reason})")
            }
            SugerirError::Io(e) => write!(f, "I/O error: {e}"),
            SugerirError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SugerirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SugerirError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SugerirError {
    fn from(err: std::io::Error) -> Self {
        SugerirError::Io(err)
    }
}

impl From<&str> for SugerirError {
    fn from(msg: &str) -> Self {
        SugerirError::Other(msg.to_string())
    }
}

impl From<String> for SugerirError {
    fn from(msg: String) -> Self {
        SugerirError::Other(msg)
    }
}

impl SugerirError {
    /// Create an invalid-argument error with descriptive context.
    #[must_use]
    pub fn invalid_argument(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidArgument {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create an unsupported-operation error.
    #[must_use]
    pub fn unsupported(operation: &str, reason: &str) -> Self {
        Self::Unsupported {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an empty input error.
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::Other(format!("empty input: {context}"))
    }
}

#[allow(clippy::cmp_owned)]
impl PartialEq<&str> for SugerirError {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

#[allow(clippy::cmp_owned)]
impl PartialEq<SugerirError> for &str {
    fn eq(&self, other: &SugerirError) -> bool {
        *self == other.to_string()
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, SugerirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = SugerirError::invalid_argument("n", 0, ">= 1");
        assert!(err.to_string().contains("Invalid argument"));
        assert!(err.to_string().contains("n = 0"));
        assert!(err.to_string().contains(">= 1"));
    }

    #[test]
    fn test_no_such_user_display() {
        let err = SugerirError::NoSuchUser { user_id: 42 };
        assert!(err.to_string().contains("No such user"));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_no_such_item_display() {
        let err = SugerirError::NoSuchItem { item_id: 7 };
        assert!(err.to_string().contains("No such item"));
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_data_access_display() {
        let err = SugerirError::DataAccess {
            message: "store unavailable".to_string(),
        };
        assert!(err.to_string().contains("Data access failure"));
        assert!(err.to_string().contains("store unavailable"));
    }

    #[test]
    fn test_unsupported_display() {
        let err = SugerirError::unsupported("update_item_pref", "stddev weighting is enabled");
        assert!(err.to_string().contains("Unsupported operation"));
        assert!(err.to_string().contains("update_item_pref"));
        assert!(err.to_string().contains("stddev"));
    }

    #[test]
    fn test_from_str() {
        let err: SugerirError = "test error".into();
        assert!(matches!(err, SugerirError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_string() {
        let err: SugerirError = "test error".to_string().into();
        assert!(matches!(err, SugerirError::Other(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SugerirError = io_err.into();
        assert!(matches!(err, SugerirError::Io(_)));
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SugerirError::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_other() {
        use std::error::Error;
        let err = SugerirError::Other("test".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_empty_input_helper() {
        let err = SugerirError::empty_input("running average");
        assert!(err.to_string().contains("empty input"));
        assert!(err.to_string().contains("running average"));
    }

    #[test]
    fn test_error_eq_str() {
        let err = SugerirError::Other("test error".to_string());
        assert!(err == "test error");
        assert!("test error" == err);
    }
}
