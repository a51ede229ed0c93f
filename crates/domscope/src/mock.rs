//! In-process stand-in for the remote agent.
//!
//! [`MockExecutor`] records every command it receives and answers from a
//! handler. [`LiveDocument`] is a handler that keeps mutable markup and
//! resolves command targets against it the way a browser-side agent would.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::builder::TreeBuilder;
use crate::command::{BrowserInfo, Command, Operation, SessionId};
use crate::dispatcher::CommandExecutor;
use crate::locator::resolve;
use crate::markup::{MarkupParser, TagSoupParser};
use crate::node::ElementTree;
use crate::result::DomscopeResult;

/// How the mock answers one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Respond with this info
    Reply(BrowserInfo),
    /// Report that no response arrived
    NoResponse,
    /// Never respond
    Hang,
}

type Handler = Box<dyn Fn(&Command) -> MockResponse + Send + Sync>;

/// One command as received by the mock
#[derive(Debug, Clone)]
pub struct ReceivedCommand {
    /// Session that sent it
    pub session: SessionId,
    /// Source node hint passed by the dispatcher
    pub source_hint: Option<String>,
    /// The command itself
    pub command: Command,
}

/// Recording command executor
pub struct MockExecutor {
    handler: Handler,
    received: Mutex<Vec<ReceivedCommand>>,
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor")
            .field("received", &self.received().len())
            .finish_non_exhaustive()
    }
}

impl MockExecutor {
    /// Answer every command with `handler`
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&Command) -> MockResponse + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Serve a live document
    #[must_use]
    pub fn serving(document: LiveDocument) -> Self {
        Self::with_handler(move |command| MockResponse::Reply(document.answer(command)))
    }

    /// Every command received so far
    #[must_use]
    pub fn received(&self) -> Vec<ReceivedCommand> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Commands received so far, in order
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.received().into_iter().map(|r| r.command).collect()
    }

    /// Session ids of the commands received so far
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        self.received().into_iter().map(|r| r.session).collect()
    }

    /// Number of received commands with this operation
    #[must_use]
    pub fn count(&self, operation: &Operation) -> usize {
        self.received()
            .iter()
            .filter(|r| &r.command.operation == operation)
            .count()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute_command(
        &self,
        session: &SessionId,
        source_hint: Option<&str>,
        command: &Command,
    ) -> Option<BrowserInfo> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReceivedCommand {
                session: session.clone(),
                source_hint: source_hint.map(str::to_string),
                command: command.clone(),
            });
        match (self.handler)(command) {
            MockResponse::Reply(info) => Some(info),
            MockResponse::NoResponse => None,
            MockResponse::Hang => std::future::pending().await,
        }
    }
}

/// Mutable markup shared between a test and a [`MockExecutor`]
#[derive(Debug, Clone, Default)]
pub struct LiveDocument {
    markup: Arc<Mutex<String>>,
}

impl LiveDocument {
    /// Document with initial markup
    #[must_use]
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: Arc::new(Mutex::new(markup.into())),
        }
    }

    /// Current markup
    #[must_use]
    pub fn markup(&self) -> String {
        self.markup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the markup, as if the page changed
    pub fn set_markup(&self, markup: impl Into<String>) {
        *self.markup.lock().unwrap_or_else(PoisonError::into_inner) = markup.into();
    }

    fn snapshot(&self) -> DomscopeResult<ElementTree> {
        let nodes = TagSoupParser::new().parse(&self.markup())?;
        TreeBuilder::default().build(&nodes)
    }

    /// Answer one command against the current markup
    #[must_use]
    pub fn answer(&self, command: &Command) -> BrowserInfo {
        let tree = match self.snapshot() {
            Ok(tree) => tree,
            Err(err) => return BrowserInfo::error(err.to_string()),
        };
        let resolved = command.target.as_ref().and_then(|t| resolve(&tree, t));
        if command.requires_target_resolved && command.target.is_some() && resolved.is_none() {
            if command.operation == Operation::WaitUntilGone {
                return BrowserInfo::empty();
            }
            return BrowserInfo::error(format!(
                "target {} did not resolve",
                command.describe()
            ));
        }

        let argument = |i: usize| {
            command
                .arguments
                .get(i)
                .map(String::as_str)
                .unwrap_or_default()
        };
        let result = match (&command.operation, resolved) {
            (Operation::GetDom, _) => tree
                .root()
                .map(|root| tree.outer_markup(root).map(BrowserInfo::data)),
            (Operation::GetElementDom, Some(node)) => {
                Some(tree.outer_markup(node).map(BrowserInfo::data))
            }
            (Operation::GetInnerText, Some(node)) => {
                Some(tree.text_content(node).map(BrowserInfo::data))
            }
            (Operation::SetText, Some(node)) => {
                let mut tree = tree;
                let updated = tree
                    .get_mut(node)
                    .map(|n| n.attributes.set("value", argument(0)));
                match updated.and_then(|()| {
                    tree.root()
                        .map_or_else(|| Ok(String::new()), |root| tree.outer_markup(root))
                }) {
                    Ok(markup) => {
                        self.set_markup(markup);
                        Some(Ok(BrowserInfo::empty()))
                    }
                    Err(err) => Some(Err(err)),
                }
            }
            (Operation::WaitForAttribute, Some(node)) => {
                let actual = tree
                    .node(node)
                    .and_then(|n| n.attributes().raw(argument(0)));
                (actual != Some(argument(1))).then(|| {
                    Ok(BrowserInfo::error(format!(
                        "attribute '{}' is {:?}, expected '{}'",
                        argument(0),
                        actual,
                        argument(1)
                    )))
                })
            }
            (Operation::WaitForInnerText, Some(node)) => {
                let text = tree.text_content(node).unwrap_or_default();
                (!text.eq_ignore_ascii_case(argument(0).trim())).then(|| {
                    Ok(BrowserInfo::error(format!(
                        "inner text is '{text}', expected '{}'",
                        argument(0)
                    )))
                })
            }
            (Operation::WaitUntilGone, Some(_)) => {
                Some(Ok(BrowserInfo::error("element is still present")))
            }
            _ => None,
        };

        match result {
            Some(Ok(info)) => info,
            Some(Err(err)) => BrowserInfo::error(err.to_string()),
            None => BrowserInfo::empty(),
        }
    }
}
