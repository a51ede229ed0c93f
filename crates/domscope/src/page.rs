//! Page: the cached tree plus the channel that keeps it in sync.
//!
//! A page built from markup is static: finds run once against the cache and
//! actions report [`DomscopeError::NotConnected`]. A connected page refreshes
//! from the remote agent and routes node actions through a
//! [`CommandDispatcher`], one command per action.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::builder::TreeBuilder;
use crate::collection::{ElementCollection, Scope};
use crate::command::{BrowserInfo, Command, Operation};
use crate::config::EngineConfig;
use crate::dispatcher::{CommandDispatcher, CommandExecutor, PageContext, TraceBuffer};
use crate::find::FindParams;
use crate::locator::{build_locator, CommandTarget};
use crate::markup::{MarkupParser, TagSoupParser};
use crate::node::{ElementNode, ElementTree, NodeId};
use crate::result::{DomscopeError, DomscopeResult};

/// Cached document and its command channel
#[derive(Debug)]
pub struct Page {
    pub(crate) tree: ElementTree,
    builder: TreeBuilder,
    parser: Arc<dyn MarkupParser>,
    dispatcher: Option<CommandDispatcher>,
    traces: TraceBuffer,
    pub(crate) config: EngineConfig,
}

impl Page {
    /// Static page built from markup
    pub fn from_markup(markup: &str) -> DomscopeResult<Self> {
        let mut page = Self::empty(None, EngineConfig::default());
        page.load_document(markup)?;
        Ok(page)
    }

    /// Live page driven through `executor`; call [`refresh`](Self::refresh)
    /// to load the document
    #[must_use]
    pub fn connect(
        executor: Arc<dyn CommandExecutor>,
        context: PageContext,
        config: EngineConfig,
    ) -> Self {
        let dispatcher = CommandDispatcher::new(executor, context)
            .with_navigate_settle(config.navigate_settle());
        Self::empty(Some(dispatcher), config)
    }

    fn empty(dispatcher: Option<CommandDispatcher>, config: EngineConfig) -> Self {
        Self {
            tree: ElementTree::new(),
            builder: TreeBuilder::default(),
            parser: Arc::new(TagSoupParser::new()),
            dispatcher,
            traces: TraceBuffer::default(),
            config,
        }
    }

    /// Replace the markup parser used by refreshes
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn MarkupParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the engine settings (find timeout, poll interval, settle delay)
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if let Some(dispatcher) = self.dispatcher.take() {
            self.dispatcher = Some(dispatcher.with_navigate_settle(config.navigate_settle()));
        }
        self.config = config;
        self
    }

    /// Replace the tree builder (and its tag registry) used by refreshes
    #[must_use]
    pub fn with_builder(mut self, builder: TreeBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Whether a command executor is attached
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Cached tree
    #[must_use]
    pub const fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Browsing context, for live pages
    #[must_use]
    pub fn context(&self) -> Option<&PageContext> {
        self.dispatcher.as_ref().map(CommandDispatcher::context)
    }

    /// Look up a cached node
    pub fn node(&self, id: NodeId) -> DomscopeResult<&ElementNode> {
        self.tree.get(id)
    }

    /// Queue a diagnostic message for the next command
    pub fn trace(&mut self, message: impl Into<String>) {
        self.traces.push(message);
    }

    /// Messages not yet sent
    #[must_use]
    pub fn pending_traces(&self) -> &[String] {
        self.traces.pending()
    }

    /// Collection over the whole document
    pub fn elements(&mut self) -> ElementCollection<'_> {
        ElementCollection::new(self, Scope::Document)
    }

    /// Collection over the descendants of `node`
    pub fn child_elements(&mut self, node: NodeId) -> DomscopeResult<ElementCollection<'_>> {
        let _ = self.tree.get(node)?;
        Ok(ElementCollection::new(self, Scope::Node(node)))
    }

    /// Find in the whole document with the configured timeout
    pub async fn find(&mut self, params: &FindParams) -> DomscopeResult<NodeId> {
        self.elements().find(params).await
    }

    /// Command target for a cached node
    pub fn build_locator(&self, node: NodeId) -> DomscopeResult<CommandTarget> {
        build_locator(&self.tree, node)
    }

    /// Reload the whole document from the remote agent
    pub async fn refresh(&mut self) -> DomscopeResult<()> {
        self.refresh_scope(Scope::Document, &[]).await
    }

    fn load_document(&mut self, markup: &str) -> DomscopeResult<()> {
        let nodes = self.parser.parse(markup)?;
        let _ = self.builder.replace_document(&mut self.tree, &nodes)?;
        Ok(())
    }

    /// Fetch a fresh snapshot for `scope` and rebuild it.
    ///
    /// `preload` names attributes the remote agent must include.
    pub(crate) async fn refresh_scope(
        &mut self,
        scope: Scope,
        preload: &[String],
    ) -> DomscopeResult<()> {
        let dispatcher = self.dispatcher.as_ref().ok_or_else(|| DomscopeError::NotConnected {
            operation: Operation::GetDom.to_string(),
        })?;

        let mut command = match scope {
            Scope::Document => Command::new(Operation::GetDom, self.config.command_timeout_ms),
            Scope::Node(node) => {
                Command::new(Operation::GetElementDom, self.config.command_timeout_ms)
                    .with_target(build_locator(&self.tree, node)?)
                    .require_target()
            }
        };
        command.arguments.extend(preload.iter().cloned());
        let description = match scope {
            Scope::Document => None,
            Scope::Node(node) => Some(self.tree.get(node)?.describe()),
        };

        let info = dispatcher
            .execute(command, &mut self.traces, description.as_deref())
            .await?;
        let markup = info.data.unwrap_or_default();
        let nodes = self.parser.parse(&markup)?;
        match scope {
            Scope::Document => {
                let _ = self.builder.replace_document(&mut self.tree, &nodes)?;
            }
            Scope::Node(node) => self.builder.replace_subtree(&mut self.tree, node, &nodes)?,
        }
        debug!(scope = %scope, nodes = self.tree.len(), "refreshed scope");
        Ok(())
    }

    /// Send one command targeting `node`
    async fn send_to_node(
        &mut self,
        node: NodeId,
        command: Command,
    ) -> DomscopeResult<BrowserInfo> {
        let dispatcher = self.dispatcher.as_ref().ok_or_else(|| DomscopeError::NotConnected {
            operation: command.operation.to_string(),
        })?;
        let target = build_locator(&self.tree, node)?;
        let description = format!("{} ({target})", self.tree.get(node)?.describe());
        dispatcher
            .execute(
                command.with_target(target).require_target(),
                &mut self.traces,
                Some(&description),
            )
            .await
    }

    /// Send one page-level command
    async fn send_to_page(&mut self, command: Command) -> DomscopeResult<BrowserInfo> {
        let dispatcher = self.dispatcher.as_ref().ok_or_else(|| DomscopeError::NotConnected {
            operation: command.operation.to_string(),
        })?;
        dispatcher.execute(command, &mut self.traces, None).await
    }

    /// Remote wait: operation arguments first, then the wait in milliseconds.
    /// The channel timeout covers the wait plus the normal command timeout.
    fn wait_command(&self, operation: Operation, arguments: &[&str], wait: Duration) -> Command {
        let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        let command = arguments.iter().fold(
            Command::new(operation, wait_ms.saturating_add(self.config.command_timeout_ms)),
            |command, argument| command.with_argument(*argument),
        );
        command.with_argument(wait_ms.to_string())
    }

    /// Click `node`
    pub async fn click(&mut self, node: NodeId) -> DomscopeResult<()> {
        let command = Command::new(Operation::Click, self.config.command_timeout_ms);
        self.send_to_node(node, command).await.map(drop)
    }

    /// Replace the value of `node`; the cached `value` attribute follows
    pub async fn set_text(&mut self, node: NodeId, text: &str) -> DomscopeResult<()> {
        let command =
            Command::new(Operation::SetText, self.config.command_timeout_ms).with_argument(text);
        let _ = self.send_to_node(node, command).await?;
        self.tree.get_mut(node)?.attributes.set("value", text);
        Ok(())
    }

    /// Fire a named DOM event on `node`
    pub async fn dispatch_event(&mut self, node: NodeId, event: &str) -> DomscopeResult<()> {
        if event.trim().is_empty() {
            return Err(DomscopeError::malformed("event name must not be empty"));
        }
        let command = Command::new(Operation::DispatchEvent, self.config.command_timeout_ms)
            .with_argument(event);
        self.send_to_node(node, command).await.map(drop)
    }

    /// Move focus to `node`
    pub async fn focus(&mut self, node: NodeId) -> DomscopeResult<()> {
        let command = Command::new(Operation::Focus, self.config.command_timeout_ms);
        self.send_to_node(node, command).await.map(drop)
    }

    /// Live inner text of `node`, read from the remote document
    pub async fn get_inner_text(&mut self, node: NodeId) -> DomscopeResult<String> {
        let command = Command::new(Operation::GetInnerText, self.config.command_timeout_ms);
        let info = self.send_to_node(node, command).await?;
        Ok(info.data.unwrap_or_default())
    }

    /// Wait on the remote side until attribute `name` of `node` equals `value`
    pub async fn wait_for_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
        wait: Duration,
    ) -> DomscopeResult<()> {
        if name.trim().is_empty() {
            return Err(DomscopeError::malformed("attribute name must not be empty"));
        }
        let command = self.wait_command(Operation::WaitForAttribute, &[name, value], wait);
        self.send_to_node(node, command).await.map(drop)
    }

    /// Wait on the remote side until the inner text of `node` equals `text`
    pub async fn wait_for_inner_text(
        &mut self,
        node: NodeId,
        text: &str,
        wait: Duration,
    ) -> DomscopeResult<()> {
        let command = self.wait_command(Operation::WaitForInnerText, &[text], wait);
        self.send_to_node(node, command).await.map(drop)
    }

    /// Wait on the remote side until `node` no longer resolves
    pub async fn wait_until_gone(&mut self, node: NodeId, wait: Duration) -> DomscopeResult<()> {
        let command = self.wait_command(Operation::WaitUntilGone, &[], wait);
        self.send_to_node(node, command).await.map(drop)
    }

    /// Load `url`, then reload the cached document
    pub async fn navigate(&mut self, url: &str) -> DomscopeResult<()> {
        if url.trim().is_empty() {
            return Err(DomscopeError::malformed("navigate requires a URL"));
        }
        let command =
            Command::new(Operation::Navigate, self.config.command_timeout_ms).with_argument(url);
        let _ = self.send_to_page(command).await?;
        self.refresh().await
    }

    /// Wait on the remote side until the document changes.
    ///
    /// The cache is not refreshed; call [`refresh`](Self::refresh) afterwards.
    pub async fn wait_for_change(&mut self, wait: Duration) -> DomscopeResult<()> {
        let command = self.wait_command(Operation::WaitForChange, &[], wait);
        self.send_to_page(command).await.map(drop)
    }
}
