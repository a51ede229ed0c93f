//! Domscope: a cached element tree with durable remote locators.
//!
//! Domscope mirrors a live web document locally, answers most queries from
//! that cache, and addresses nodes on the remote side through command targets
//! that survive a rebuild of the cache.
//!
//! # Architecture
//!
//! ```text
//!  find / exists          miss (live page)
//! ElementCollection ──► ElementTree ──────────► refresh scope ──► TreeBuilder
//!        │                  ▲                     (get-dom)           │
//!        │                  └─────────── rebuilt subtree ─────────────┘
//!        │ action
//!        ▼
//!      Page ──► build_locator ──► CommandTarget ──► CommandDispatcher ──► executor
//! ```
//!
//! # Example
//!
//! ```
//! use domscope::{
//!     build_locator, search, CommandTarget, FindParams, MarkupParser, SearchMode, TagSoupParser,
//!     TreeBuilder,
//! };
//!
//! let nodes = TagSoupParser::new().parse(r#"<table id="Grid"><a/><foo><a/><a/></foo><a/></table>"#)?;
//! let tree = TreeBuilder::default().build(&nodes)?;
//! let params = FindParams::builder().tag("a").index(3).build()?;
//! let last = search(&tree, tree.roots(), &params, SearchMode::First)[0];
//! assert_eq!(
//!     build_locator(&tree, last)?,
//!     CommandTarget::descendant(CommandTarget::id("Grid"), "a", 3)
//! );
//! # Ok::<(), domscope::DomscopeError>(())
//! ```

#![warn(missing_docs)]

mod attributes;
mod builder;
mod collection;
mod command;
mod config;
mod dispatcher;
mod find;
mod kind;
mod locator;
mod markup;
mod node;
mod page;
mod result;

/// In-process command executor for tests and offline use
pub mod mock;

pub use attributes::{is_boolean_attribute, AttributeStore, FromAttribute, BOOLEAN_ATTRIBUTES};
pub use builder::TreeBuilder;
pub use collection::{ElementCollection, Scope};
pub use command::{BrowserInfo, Command, Operation, SessionId};
pub use config::{
    EngineConfig, DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_FIND_TIMEOUT_MS, DEFAULT_NAVIGATE_SETTLE_MS,
    DEFAULT_POLL_INTERVAL_MS,
};
pub use dispatcher::{CommandDispatcher, CommandExecutor, PageContext, TraceBuffer};
pub use find::{
    search, AttributePredicate, FindParams, FindParamsBuilder, MatchMethod, SearchMode, TextMatch,
};
pub use kind::{
    AnchorView, InputType, InputView, KindConstructor, NodeKind, OptionView, SelectView,
    TagRegistry,
};
pub use locator::{build_locator, is_localizable, resolve, CommandTarget};
pub use markup::{
    decode_entities, MarkupParser, ParsedNode, ParsedNodeType, SourceSpan, TagSoupParser,
    RAW_TEXT_ELEMENTS, VOID_ELEMENTS,
};
pub use node::{ElementNode, ElementTree, NodeId};
pub use page::Page;
pub use result::{DomscopeError, DomscopeResult};

/// Common imports
pub mod prelude {
    pub use super::{
        build_locator, CommandExecutor, CommandTarget, DomscopeError, DomscopeResult,
        ElementCollection, EngineConfig, FindParams, MatchMethod, NodeId, Page, PageContext,
    };
}
