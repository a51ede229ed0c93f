//! Element collections and the find retry loop.
//!
//! A collection is a scope (the document, or one node's descendants) on a
//! [`Page`]. Finds try the cached tree first. On a live page a miss triggers a
//! refresh of the scope and another try, until a match turns up or the timeout
//! runs out. At least two attempts are always made on a live page, so a zero
//! timeout still gets one refresh.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::find::{search, FindParams, SearchMode};
use crate::node::NodeId;
use crate::page::Page;
use crate::result::{DomscopeError, DomscopeResult};

/// Root of a find or refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole document
    Document,
    /// Descendants of one node
    Node(NodeId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("document"),
            Self::Node(node) => write!(f, "node {node}"),
        }
    }
}

/// Result of one retry loop
#[derive(Debug)]
struct SearchOutcome {
    found: Vec<NodeId>,
    attempts: usize,
}

/// Scoped view of a page used to find elements
#[derive(Debug)]
pub struct ElementCollection<'p> {
    page: &'p mut Page,
    scope: Scope,
}

impl<'p> ElementCollection<'p> {
    pub(crate) fn new(page: &'p mut Page, scope: Scope) -> Self {
        Self { page, scope }
    }

    /// Scope of this collection
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Top-level members of the scope
    pub fn members(&self) -> DomscopeResult<Vec<NodeId>> {
        match self.scope {
            Scope::Document => Ok(self.page.tree.roots().to_vec()),
            Scope::Node(node) => Ok(self.page.tree.get(node)?.children().to_vec()),
        }
    }

    /// First match, polling up to the configured find timeout
    pub async fn find(&mut self, params: &FindParams) -> DomscopeResult<NodeId> {
        let timeout = self.page.config.find_timeout();
        self.find_within(params, timeout).await
    }

    /// First match, polling up to `timeout`
    pub async fn find_within(
        &mut self,
        params: &FindParams,
        timeout: Duration,
    ) -> DomscopeResult<NodeId> {
        let outcome = self
            .search_with_retry(params, timeout, SearchMode::First)
            .await?;
        match outcome.found.first() {
            Some(node) => Ok(*node),
            None => Err(self.not_found(params, timeout, outcome.attempts)),
        }
    }

    /// Every match after the first `index`, polling up to the configured
    /// find timeout; empty when nothing turned up
    pub async fn find_all(&mut self, params: &FindParams) -> DomscopeResult<Vec<NodeId>> {
        let timeout = self.page.config.find_timeout();
        self.find_all_within(params, timeout).await
    }

    /// Every match after the first `index`, polling up to `timeout`
    pub async fn find_all_within(
        &mut self,
        params: &FindParams,
        timeout: Duration,
    ) -> DomscopeResult<Vec<NodeId>> {
        let outcome = self
            .search_with_retry(params, timeout, SearchMode::All)
            .await?;
        Ok(outcome.found)
    }

    /// Whether a match exists, polling up to the configured find timeout
    pub async fn exists(&mut self, params: &FindParams) -> DomscopeResult<bool> {
        let timeout = self.page.config.find_timeout();
        self.exists_within(params, timeout).await
    }

    /// Whether a match exists, polling up to `timeout`
    pub async fn exists_within(
        &mut self,
        params: &FindParams,
        timeout: Duration,
    ) -> DomscopeResult<bool> {
        match self.find_within(params, timeout).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Replace the scope's cached nodes with a fresh snapshot.
    ///
    /// `preload` names attributes the remote agent must serialize.
    pub async fn refresh(&mut self, preload: &[&str]) -> DomscopeResult<()> {
        let preload: Vec<String> = preload.iter().map(|a| (*a).to_string()).collect();
        self.page.refresh_scope(self.scope, &preload).await
    }

    async fn search_with_retry(
        &mut self,
        params: &FindParams,
        timeout: Duration,
        mode: SearchMode,
    ) -> DomscopeResult<SearchOutcome> {
        let live = self.page.is_live();
        let poll_interval = self.page.config.poll_interval();
        // Every refresh in this loop must carry the queried attributes.
        let preload = params.attribute_names();

        // Attribute values go stale faster than structure; read them fresh.
        if live && params.has_attribute_predicates() && params.index() == 0 {
            debug!(scope = %self.scope, query = %params, "refreshing before attribute query");
            self.page.refresh_scope(self.scope, &preload).await?;
        }

        let start = Instant::now();
        let mut attempts = 0;
        loop {
            let found = search(&self.page.tree, &self.members()?, params, mode);
            attempts += 1;
            if !found.is_empty() || !live {
                return Ok(SearchOutcome { found, attempts });
            }
            if attempts >= 2 && (timeout.is_zero() || start.elapsed() >= timeout) {
                break;
            }
            if attempts >= 2 {
                tokio::time::sleep(poll_interval).await;
            }
            debug!(
                scope = %self.scope,
                query = %params,
                attempt = attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "no match, refreshing"
            );
            self.page.refresh_scope(self.scope, &preload).await?;
        }

        Ok(SearchOutcome {
            found: Vec::new(),
            attempts,
        })
    }

    fn not_found(&self, params: &FindParams, timeout: Duration, attempts: usize) -> DomscopeError {
        let within = match self.scope {
            Scope::Document => String::new(),
            Scope::Node(node) => self.page.tree.node(node).map_or_else(
                || format!(" within {node}"),
                |n| format!(" within {}", n.describe()),
            ),
        };
        DomscopeError::NotFound {
            query: format!("{params}{within}"),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BrowserInfo, Operation};
    use crate::config::EngineConfig;
    use crate::dispatcher::PageContext;
    use crate::find::MatchMethod;
    use crate::mock::{LiveDocument, MockExecutor, MockResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config() -> EngineConfig {
        EngineConfig::new()
            .with_find_timeout(0)
            .with_poll_interval(10)
            .with_command_timeout(1000)
            .with_navigate_settle(0)
    }

    async fn live(document: &LiveDocument, config: EngineConfig) -> (Page, Arc<MockExecutor>) {
        let executor = Arc::new(MockExecutor::serving(document.clone()));
        let mut page = Page::connect(executor.clone(), PageContext::new(), config);
        page.refresh().await.unwrap();
        (page, executor)
    }

    mod static_tests {
        use super::*;

        #[tokio::test]
        async fn test_nested_same_ids_select_middle() {
            let mut page = Page::from_markup(
                r#"<div id="control1"><div id="control1"><div id="control1"/></div></div>"#,
            )
            .unwrap();
            let params = FindParams::builder()
                .id_matching("control1", MatchMethod::EndsWith)
                .index(1)
                .build()
                .unwrap();
            let found = page.find(&params).await.unwrap();
            let outer = page.tree().root().unwrap();
            assert_eq!(found, page.node(outer).unwrap().children()[0]);
        }

        #[tokio::test]
        async fn test_static_miss_is_single_attempt() {
            let mut page = Page::from_markup("<div><p/></div>").unwrap();
            let err = page
                .elements()
                .find_within(&FindParams::by_tag("span"), Duration::from_secs(10))
                .await
                .unwrap_err();
            match err {
                DomscopeError::NotFound { query, attempts, timeout_ms } => {
                    assert_eq!(attempts, 1);
                    assert_eq!(timeout_ms, 10_000);
                    assert!(query.contains("tag='span'"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_child_scope_excludes_scope_node() {
            let mut page =
                Page::from_markup(r#"<div id="a"><div id="b"><p/></div></div>"#).unwrap();
            let outer = page.tree().root().unwrap();
            let mut children = page.child_elements(outer).unwrap();
            assert!(!children.exists(&FindParams::by_id("a")).await.unwrap());
            assert!(children.exists(&FindParams::by_id("b")).await.unwrap());
            assert!(children.exists(&FindParams::by_tag("p")).await.unwrap());
        }

        #[tokio::test]
        async fn test_find_all_applies_index() {
            let mut page = Page::from_markup("<ul><li/><li/><li/></ul>").unwrap();
            let all = page
                .elements()
                .find_all(&FindParams::by_tag_index("li", 1))
                .await
                .unwrap();
            assert_eq!(all.len(), 2);
            let none = page
                .elements()
                .find_all(&FindParams::by_tag("ol"))
                .await
                .unwrap();
            assert!(none.is_empty());
        }
    }

    mod retry_tests {
        use super::*;

        #[tokio::test]
        async fn test_zero_timeout_still_refreshes_once() {
            let document = LiveDocument::new(r#"<div id="app"/>"#);
            let (mut page, executor) = live(&document, config()).await;
            let err = page
                .elements()
                .find_within(&FindParams::by_id("missing"), Duration::ZERO)
                .await
                .unwrap_err();
            assert!(matches!(err, DomscopeError::NotFound { attempts: 2, .. }));
            assert_eq!(executor.count(&Operation::GetDom), 2);
        }

        #[tokio::test]
        async fn test_miss_terminates_after_timeout() {
            let document = LiveDocument::new(r#"<div id="app"/>"#);
            let (mut page, _) = live(&document, config().with_poll_interval(20)).await;
            let start = Instant::now();
            let err = page
                .elements()
                .find_within(&FindParams::by_id("missing"), Duration::from_millis(300))
                .await
                .unwrap_err();
            let elapsed = start.elapsed();
            assert!(err.is_not_found());
            assert!(elapsed >= Duration::from_millis(300));
            assert!(elapsed < Duration::from_secs(3));
            match err {
                DomscopeError::NotFound { attempts, .. } => assert!(attempts >= 2),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_late_element_found_after_refreshes() {
            let served = Arc::new(AtomicUsize::new(0));
            let counter = served.clone();
            let executor = Arc::new(MockExecutor::with_handler(move |command| {
                if command.operation != Operation::GetDom {
                    return MockResponse::Reply(BrowserInfo::empty());
                }
                let markup = if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    r#"<div id="app"></div>"#
                } else {
                    r#"<div id="app"><p id="late">done</p></div>"#
                };
                MockResponse::Reply(BrowserInfo::data(markup))
            }));
            let mut page = Page::connect(executor.clone(), PageContext::new(), config());
            page.refresh().await.unwrap();

            let found = page
                .elements()
                .find_within(&FindParams::by_id("late"), Duration::from_secs(2))
                .await
                .unwrap();
            assert_eq!(page.node(found).unwrap().inner_text(), "done");
            assert_eq!(served.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn test_exists_reports_false_on_timeout() {
            let document = LiveDocument::new(r#"<div id="app"><p id="here"/></div>"#);
            let (mut page, _) = live(&document, config()).await;
            assert!(page.elements().exists(&FindParams::by_id("here")).await.unwrap());
            assert!(!page.elements().exists(&FindParams::by_id("gone")).await.unwrap());
        }

        #[tokio::test]
        async fn test_refresh_errors_propagate() {
            let executor = Arc::new(MockExecutor::with_handler(|_| {
                MockResponse::Reply(BrowserInfo::error("agent crashed"))
            }));
            let mut page = Page::connect(executor, PageContext::new(), config());
            let err = page
                .elements()
                .find_within(&FindParams::by_tag("p"), Duration::ZERO)
                .await
                .unwrap_err();
            assert!(matches!(err, DomscopeError::RemoteExecutionFailed { .. }));
        }
    }

    mod refresh_tests {
        use super::*;

        #[tokio::test]
        async fn test_attribute_query_refreshes_first() {
            let document =
                LiveDocument::new(r#"<div id="app"><input id="x" data-state="busy"/></div>"#);
            let (mut page, executor) = live(&document, config()).await;
            document.set_markup(r#"<div id="app"><input id="x" data-state="idle"/></div>"#);

            let params = FindParams::builder()
                .attribute("data-state", "idle")
                .build()
                .unwrap();
            let found = page
                .elements()
                .find_within(&params, Duration::ZERO)
                .await
                .unwrap();
            assert_eq!(page.node(found).unwrap().id(), Some("x"));

            let reads: Vec<_> = executor
                .commands()
                .into_iter()
                .filter(|c| c.operation == Operation::GetDom)
                .collect();
            assert_eq!(reads.len(), 2);
            assert_eq!(reads[1].arguments, vec!["data-state"]);
        }

        #[tokio::test]
        async fn test_retry_refreshes_keep_attribute_preload() {
            let document = LiveDocument::new(r#"<div id="app"><input id="x"/></div>"#);
            let (mut page, executor) = live(&document, config()).await;

            let params = FindParams::builder()
                .attribute("data-state", "idle")
                .build()
                .unwrap();
            let err = page
                .elements()
                .find_within(&params, Duration::ZERO)
                .await
                .unwrap_err();
            assert!(err.is_not_found());

            let reads: Vec<_> = executor
                .commands()
                .into_iter()
                .filter(|c| c.operation == Operation::GetDom)
                .skip(1)
                .collect();
            assert_eq!(reads.len(), 2);
            for read in &reads {
                assert_eq!(read.arguments, vec!["data-state"]);
            }
        }

        #[tokio::test]
        async fn test_indexed_attribute_query_preloads_on_retry() {
            let document = LiveDocument::new(r#"<ul id="list"><li data-on="1"/></ul>"#);
            let (mut page, executor) = live(&document, config()).await;
            document.set_markup(r#"<ul id="list"><li data-on="1"/><li data-on="1"/></ul>"#);

            let params = FindParams::builder()
                .attribute("data-on", "1")
                .index(1)
                .build()
                .unwrap();
            let found = page
                .elements()
                .find_within(&params, Duration::ZERO)
                .await
                .unwrap();
            assert_eq!(page.node(found).unwrap().tag_name(), "li");

            let last = executor.commands().pop().unwrap();
            assert_eq!(last.operation, Operation::GetDom);
            assert_eq!(last.arguments, vec!["data-on"]);
        }

        #[tokio::test]
        async fn test_node_scope_refreshes_subtree() {
            let document = LiveDocument::new(r#"<html><div id="panel"><p/></div></html>"#);
            let (mut page, executor) = live(&document, config()).await;
            let html = page.tree().root().unwrap();
            let panel = page.node(html).unwrap().children()[0];
            document.set_markup(r#"<html><div id="panel"><p/><span id="new"/></div></html>"#);

            let found = page
                .child_elements(panel)
                .unwrap()
                .find_within(&FindParams::by_id("new"), Duration::ZERO)
                .await
                .unwrap();
            assert_eq!(page.node(found).unwrap().parent(), Some(panel));
            assert!(page.tree().contains(html));

            let sent = executor.commands();
            let subtree_read = sent
                .iter()
                .find(|c| c.operation == Operation::GetElementDom)
                .unwrap();
            assert_eq!(
                subtree_read.target,
                Some(crate::locator::CommandTarget::id("panel"))
            );
            assert!(subtree_read.requires_target_resolved);
        }

        #[tokio::test]
        async fn test_explicit_refresh_with_preload() {
            let document = LiveDocument::new(r#"<div id="app"/>"#);
            let (mut page, executor) = live(&document, config()).await;
            page.elements().refresh(&["class", "title"]).await.unwrap();
            let last = executor.commands().pop().unwrap();
            assert_eq!(last.operation, Operation::GetDom);
            assert_eq!(last.arguments, vec!["class", "title"]);
        }
    }
}
