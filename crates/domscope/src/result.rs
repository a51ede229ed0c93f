//! Result and error types for Domscope.

use thiserror::Error;

use crate::node::NodeId;

/// Result type for Domscope operations
pub type DomscopeResult<T> = Result<T, DomscopeError>;

/// Errors that can occur in Domscope
#[derive(Debug, Error)]
pub enum DomscopeError {
    /// A find/exists search exhausted its timeout with zero matches
    #[error("No element matching {query} was found within {timeout_ms}ms ({attempts} attempts)")]
    NotFound {
        /// Description of the query that failed
        query: String,
        /// Timeout the search polled for
        timeout_ms: u64,
        /// Number of match attempts performed
        attempts: usize,
    },

    /// No addressable ancestor exists for the element
    #[error("Cannot build a command target for {element}: {reason}")]
    LocatorUnbuildable {
        /// Short description of the element (tag, id, span)
        element: String,
        /// Why the locator could not be built
        reason: String,
    },

    /// The remote agent reported an explicit error
    #[error("Remote execution of '{operation}' on {target} failed: {message}")]
    RemoteExecutionFailed {
        /// Operation that failed
        operation: String,
        /// Description of the resolved target
        target: String,
        /// Error message reported by the remote side
        message: String,
    },

    /// No response arrived within the command timeout, either because the
    /// executor gave up without one or because the deadline passed
    #[error("Operation '{operation}' got no response within {ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Command timeout in milliseconds
        ms: u64,
    },

    /// Invalid markup, argument or pattern
    #[error("Malformed input: {message}")]
    MalformedInput {
        /// Error message
        message: String,
    },

    /// The node handle was discarded by a refresh
    #[error("Element {node} is stale; it was replaced by a refresh and must be found again")]
    StaleElement {
        /// The stale handle
        node: NodeId,
    },

    /// A live operation was issued on a page without a command executor
    #[error("Operation '{operation}' requires a live page but no command executor is attached")]
    NotConnected {
        /// Operation that was attempted
        operation: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl DomscopeError {
    /// Create a malformed input error
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Check whether this is a not-found outcome
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check whether this is a command timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<regex::Error> for DomscopeError {
    fn from(err: regex::Error) -> Self {
        Self::malformed(format!("invalid pattern: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_query() {
        let err = DomscopeError::NotFound {
            query: "tag='a' index=2".to_string(),
            timeout_ms: 1500,
            attempts: 4,
        };
        let text = err.to_string();
        assert!(text.contains("tag='a' index=2"));
        assert!(text.contains("1500ms"));
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_is_distinct_from_not_found() {
        let err = DomscopeError::Timeout {
            operation: "click".to_string(),
            ms: 2000,
        };
        assert!(err.is_timeout());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("click"));
    }

    #[test]
    fn test_regex_error_maps_to_malformed_input() {
        let err: DomscopeError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, DomscopeError::MalformedInput { .. }));
    }
}
