//! Command wire types exchanged with the remote agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::locator::CommandTarget;

// =============================================================================
// OPERATION
// =============================================================================

/// Logical operation carried by a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Click the target
    Click,
    /// Replace the target's value
    SetText,
    /// Fire a named DOM event on the target
    DispatchEvent,
    /// Move focus to the target
    Focus,
    /// Markup of the whole document
    GetDom,
    /// Markup of the target's subtree
    GetElementDom,
    /// Live inner text of the target
    GetInnerText,
    /// Wait until an attribute has a value
    WaitForAttribute,
    /// Wait until the target's inner text equals a value
    WaitForInnerText,
    /// Wait until the target disappears
    WaitUntilGone,
    /// Wait until the document changes
    WaitForChange,
    /// Load a URL in the current window
    Navigate,
    /// Caller-defined operation
    Custom(String),
}

impl Operation {
    /// Wire name of the operation
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Click => "click",
            Self::SetText => "set-text",
            Self::DispatchEvent => "dispatch-event",
            Self::Focus => "focus",
            Self::GetDom => "get-dom",
            Self::GetElementDom => "get-element-dom",
            Self::GetInnerText => "get-inner-text",
            Self::WaitForAttribute => "wait-for-attribute",
            Self::WaitForInnerText => "wait-for-inner-text",
            Self::WaitUntilGone => "wait-until-gone",
            Self::WaitForChange => "wait-for-change",
            Self::Navigate => "navigate",
            Self::Custom(name) => name,
        }
    }

    /// Whether the operation reads markup for a refresh
    #[must_use]
    pub const fn is_dom_read(&self) -> bool {
        matches!(self, Self::GetDom | Self::GetElementDom)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// COMMAND
// =============================================================================

/// One request to the remote agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Operation to perform
    pub operation: Operation,
    /// Element the operation applies to, if any
    pub target: Option<CommandTarget>,
    /// Positional arguments
    pub arguments: Vec<String>,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Remote side must report an error if the target does not resolve
    pub requires_target_resolved: bool,
    /// Popup window index, stamped by the dispatcher
    pub window_index: Option<usize>,
    /// Frame name path from the top document, stamped by the dispatcher
    pub frame_path: Vec<String>,
    /// Diagnostic messages flushed with this command
    pub traces: Vec<String>,
}

impl Command {
    /// Create a command with no target or arguments
    #[must_use]
    pub const fn new(operation: Operation, timeout_ms: u64) -> Self {
        Self {
            operation,
            target: None,
            arguments: Vec::new(),
            timeout_ms,
            requires_target_resolved: false,
            window_index: None,
            frame_path: Vec::new(),
            traces: Vec::new(),
        }
    }

    /// Set the target
    #[must_use]
    pub fn with_target(mut self, target: CommandTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Append an argument
    #[must_use]
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Require the target to resolve on the remote side
    #[must_use]
    pub const fn require_target(mut self) -> Self {
        self.requires_target_resolved = true;
        self
    }

    /// Timeout as a duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Operation plus target, for error messages
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.target {
            Some(target) => format!("{} {target}", self.operation),
            None => self.operation.to_string(),
        }
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Response from the remote agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    /// Payload, e.g. markup or text
    pub data: Option<String>,
    /// Error reported by the remote side
    pub error_messages: Option<String>,
}

impl BrowserInfo {
    /// Successful response carrying data
    #[must_use]
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            error_messages: None,
        }
    }

    /// Successful response without data
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: None,
            error_messages: None,
        }
    }

    /// Error response
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error_messages: Some(message.into()),
        }
    }

    /// Non-empty error message, if any
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_messages
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Identifies the logical test thread issuing commands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random session id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Session id with a fixed value
    #[must_use]
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// String form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod command_tests {
        use super::*;

        #[test]
        fn test_builder_and_describe() {
            let command = Command::new(Operation::SetText, 2000)
                .with_target(CommandTarget::id("email"))
                .with_argument("me@example.com")
                .require_target();
            assert_eq!(command.arguments, vec!["me@example.com"]);
            assert!(command.requires_target_resolved);
            assert_eq!(command.timeout(), Duration::from_secs(2));
            assert_eq!(command.describe(), "set-text #email");
            assert_eq!(Command::new(Operation::GetDom, 1).describe(), "get-dom");
        }

        #[test]
        fn test_operation_wire_names() {
            let json = serde_json::to_string(&Operation::WaitUntilGone).unwrap();
            assert_eq!(json, "\"wait-until-gone\"");
            assert_eq!(Operation::Custom("scroll".into()).name(), "scroll");
            assert!(Operation::GetElementDom.is_dom_read());
            assert!(!Operation::Click.is_dom_read());
        }
    }

    mod response_tests {
        use super::*;

        #[test]
        fn test_blank_error_is_success() {
            assert_eq!(BrowserInfo::error("  ").error_message(), None);
            assert_eq!(BrowserInfo::error("boom").error_message(), Some("boom"));
            assert_eq!(BrowserInfo::data("x").error_message(), None);
        }
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from_string("t1").as_str(), "t1");
    }
}
