//! Command dispatch through an injected executor.
//!
//! The dispatcher stamps routing metadata, flushes pending trace messages,
//! waits for the response up to the command's timeout and translates the
//! outcome. It never retries.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::{BrowserInfo, Command, Operation, SessionId};
use crate::result::{DomscopeError, DomscopeResult};

/// Capability that delivers commands to the remote agent.
///
/// Returning `None` means no response arrived.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute one command for `session`
    async fn execute_command(
        &self,
        session: &SessionId,
        source_hint: Option<&str>,
        command: &Command,
    ) -> Option<BrowserInfo>;
}

/// Browsing context that owns a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    /// Popup window index; `None` for the main window
    pub window_index: Option<usize>,
    /// Frame names from the top document down; empty for the top document
    pub frame_path: Vec<String>,
    /// Session carried on every command
    pub session_id: SessionId,
}

impl PageContext {
    /// Main window, top document, fresh session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Address a popup window
    #[must_use]
    pub const fn with_window(mut self, index: usize) -> Self {
        self.window_index = Some(index);
        self
    }

    /// Address a nested frame
    #[must_use]
    pub fn with_frame(mut self, name: impl Into<String>) -> Self {
        self.frame_path.push(name.into());
        self
    }

    /// Use a fixed session id
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Whether commands need routing metadata
    #[must_use]
    pub fn needs_routing(&self) -> bool {
        self.window_index.is_some() || !self.frame_path.is_empty()
    }
}

/// Diagnostic messages waiting for the next command
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer {
    messages: Vec<String>,
}

impl TraceBuffer {
    /// Queue a message
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Pending messages
    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.messages
    }

    /// Take every pending message, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

/// Sends commands for one page
#[derive(Clone)]
pub struct CommandDispatcher {
    executor: Arc<dyn CommandExecutor>,
    context: PageContext,
    navigate_settle: Duration,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("context", &self.context)
            .field("navigate_settle", &self.navigate_settle)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(executor: Arc<dyn CommandExecutor>, context: PageContext) -> Self {
        Self {
            executor,
            context,
            navigate_settle: Duration::from_millis(crate::config::DEFAULT_NAVIGATE_SETTLE_MS),
        }
    }

    /// Set the delay applied after a successful navigate
    #[must_use]
    pub const fn with_navigate_settle(mut self, settle: Duration) -> Self {
        self.navigate_settle = settle;
        self
    }

    /// Browsing context
    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.context
    }

    /// Execute `command`, consuming the pending traces.
    ///
    /// `target_description` names the resolved node in error messages.
    pub async fn execute(
        &self,
        mut command: Command,
        traces: &mut TraceBuffer,
        target_description: Option<&str>,
    ) -> DomscopeResult<BrowserInfo> {
        if self.context.needs_routing() {
            command.window_index = self.context.window_index;
            command.frame_path.clone_from(&self.context.frame_path);
        }
        command.traces.extend(traces.drain());

        let operation = command.operation.clone();
        let timeout = command.timeout();
        let target = target_description
            .map(str::to_string)
            .or_else(|| command.target.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| "document".to_string());
        debug!(
            operation = %operation,
            target = %target,
            session = %self.context.session_id,
            timeout_ms = command.timeout_ms,
            "dispatching command"
        );

        let response = tokio::time::timeout(
            timeout,
            self.executor
                .execute_command(&self.context.session_id, target_description, &command),
        )
        .await;

        let info = match response {
            Ok(Some(info)) => info,
            Ok(None) | Err(_) => {
                warn!(
                    operation = %operation,
                    timeout_ms = command.timeout_ms,
                    "no response to command"
                );
                return Err(DomscopeError::Timeout {
                    operation: operation.to_string(),
                    ms: command.timeout_ms,
                });
            }
        };

        if let Some(message) = info.error_message() {
            warn!(
                operation = %operation,
                target = %target,
                error = message,
                "remote execution failed"
            );
            return Err(DomscopeError::RemoteExecutionFailed {
                operation: operation.to_string(),
                target,
                message: message.to_string(),
            });
        }

        if operation == Operation::Navigate && !self.navigate_settle.is_zero() {
            tokio::time::sleep(self.navigate_settle).await;
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::CommandTarget;
    use crate::mock::{MockExecutor, MockResponse};
    use std::time::Instant;

    fn dispatcher(executor: &Arc<MockExecutor>) -> CommandDispatcher {
        CommandDispatcher::new(executor.clone(), PageContext::new())
            .with_navigate_settle(Duration::ZERO)
    }

    mod outcome_tests {
        use super::*;

        #[tokio::test]
        async fn test_success_returns_info() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::data("hello"))
            }));
            let info = dispatcher(&executor)
                .execute(
                    Command::new(Operation::GetInnerText, 1000),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap();
            assert_eq!(info.data.as_deref(), Some("hello"));
        }

        #[tokio::test]
        async fn test_remote_error_names_operation_and_target() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::error("element detached"))
            }));
            let command =
                Command::new(Operation::Click, 1000).with_target(CommandTarget::id("go"));
            let err = dispatcher(&executor)
                .execute(command, &mut TraceBuffer::default(), Some("button#go"))
                .await
                .unwrap_err();
            match err {
                DomscopeError::RemoteExecutionFailed {
                    operation,
                    target,
                    message,
                } => {
                    assert_eq!(operation, "click");
                    assert_eq!(target, "button#go");
                    assert_eq!(message, "element detached");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_hung_executor_times_out() {
            let executor = Arc::new(MockExecutor::with_handler(|_| MockResponse::Hang));
            let start = Instant::now();
            let err = dispatcher(&executor)
                .execute(
                    Command::new(Operation::Click, 200),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap_err();
            let elapsed = start.elapsed();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("200ms"));
            assert!(elapsed >= Duration::from_millis(200));
            assert!(elapsed < Duration::from_secs(5));
        }

        #[tokio::test]
        async fn test_no_response_is_timeout() {
            let executor = Arc::new(MockExecutor::with_handler(|_| MockResponse::NoResponse));
            let err = dispatcher(&executor)
                .execute(
                    Command::new(Operation::Focus, 1000),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap_err();
            assert!(err.is_timeout());
            assert!(!err.is_not_found());
            assert!(err.to_string().contains("no response"));
        }

        #[tokio::test]
        async fn test_navigate_waits_for_settle() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::empty())
            }));
            let dispatcher = CommandDispatcher::new(executor.clone(), PageContext::new())
                .with_navigate_settle(Duration::from_millis(150));
            let start = Instant::now();
            let _ = dispatcher
                .execute(
                    Command::new(Operation::Navigate, 1000).with_argument("/next"),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap();
            assert!(start.elapsed() >= Duration::from_millis(150));
        }
    }

    mod metadata_tests {
        use super::*;

        #[tokio::test]
        async fn test_traces_flushed_exactly_once() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::empty())
            }));
            let dispatcher = dispatcher(&executor);
            let mut traces = TraceBuffer::default();
            traces.push("clicking login");
            traces.push("after form fill");

            let _ = dispatcher
                .execute(Command::new(Operation::Click, 1000), &mut traces, None)
                .await
                .unwrap();
            let _ = dispatcher
                .execute(Command::new(Operation::Click, 1000), &mut traces, None)
                .await
                .unwrap();

            let sent = executor.commands();
            assert_eq!(sent[0].traces, vec!["clicking login", "after form fill"]);
            assert!(sent[1].traces.is_empty());
            assert!(traces.pending().is_empty());
        }

        #[tokio::test]
        async fn test_traces_cleared_on_failure() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::error("nope"))
            }));
            let mut traces = TraceBuffer::default();
            traces.push("note");
            let _ = dispatcher(&executor)
                .execute(Command::new(Operation::Click, 1000), &mut traces, None)
                .await
                .unwrap_err();
            assert!(traces.pending().is_empty());
            assert_eq!(executor.commands()[0].traces, vec!["note"]);
        }

        #[tokio::test]
        async fn test_routing_stamped_for_frames_only() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::empty())
            }));
            let framed = CommandDispatcher::new(
                executor.clone(),
                PageContext::new()
                    .with_window(2)
                    .with_frame("outer")
                    .with_frame("inner"),
            );
            let _ = framed
                .execute(
                    Command::new(Operation::Focus, 1000),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap();
            let _ = dispatcher(&executor)
                .execute(
                    Command::new(Operation::Focus, 1000),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap();

            let sent = executor.commands();
            assert_eq!(sent[0].window_index, Some(2));
            assert_eq!(sent[0].frame_path, vec!["outer", "inner"]);
            assert_eq!(sent[1].window_index, None);
            assert!(sent[1].frame_path.is_empty());
        }

        #[tokio::test]
        async fn test_session_carried_on_every_command() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::empty())
            }));
            let session = SessionId::from_string("worker-7");
            let dispatcher = CommandDispatcher::new(
                executor.clone(),
                PageContext::new().with_session(session.clone()),
            );
            let _ = dispatcher
                .execute(
                    Command::new(Operation::Focus, 1000),
                    &mut TraceBuffer::default(),
                    None,
                )
                .await
                .unwrap();
            assert_eq!(executor.sessions(), vec![session]);
        }
    }
}
