//! Tag-specific node kinds and typed attribute views.
//!
//! A [`TagRegistry`] maps tag names to [`NodeKind`] constructors. The kind only
//! changes how attributes are read (through the view types below); matching,
//! locating and refreshing treat every node the same.

use std::collections::HashMap;

use crate::attributes::{AttributeStore, FromAttribute};

/// Classification of an element by tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    /// Any tag without a registered kind
    #[default]
    Generic,
    /// `<input>`
    Input,
    /// `<textarea>`
    TextArea,
    /// `<select>`
    Select,
    /// `<option>`
    OptionItem,
    /// `<a>`
    Anchor,
    /// `<button>`
    Button,
    /// `<form>`
    Form,
    /// `<img>`
    Image,
    /// `<table>`
    Table,
    /// `<script>`
    Script,
    /// `<style>`
    Style,
    /// Kind registered by the caller
    Custom(String),
}

impl NodeKind {
    /// Whether the element's content is captured verbatim as inner text
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        matches!(self, Self::Script | Self::Style)
    }
}

/// Constructor stored in the registry
pub type KindConstructor = fn(&str) -> NodeKind;

/// Tag name to node kind constructor registry
#[derive(Clone)]
pub struct TagRegistry {
    constructors: HashMap<String, KindConstructor>,
}

impl std::fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.constructors.keys().collect();
        tags.sort();
        f.debug_struct("TagRegistry").field("tags", &tags).finish()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("input", |_| NodeKind::Input);
        registry.register("textarea", |_| NodeKind::TextArea);
        registry.register("select", |_| NodeKind::Select);
        registry.register("option", |_| NodeKind::OptionItem);
        registry.register("a", |_| NodeKind::Anchor);
        registry.register("button", |_| NodeKind::Button);
        registry.register("form", |_| NodeKind::Form);
        registry.register("img", |_| NodeKind::Image);
        registry.register("table", |_| NodeKind::Table);
        registry.register("script", |_| NodeKind::Script);
        registry.register("style", |_| NodeKind::Style);
        registry
    }
}

impl TagRegistry {
    /// Registry with no known tags
    #[must_use]
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register (or replace) the constructor for a tag
    pub fn register(&mut self, tag: &str, constructor: KindConstructor) {
        let _ = self
            .constructors
            .insert(tag.to_ascii_lowercase(), constructor);
    }

    /// Kind for a tag; unknown tags are [`NodeKind::Generic`]
    #[must_use]
    pub fn kind_for(&self, tag: &str) -> NodeKind {
        self.constructors
            .get(&tag.to_ascii_lowercase())
            .map_or(NodeKind::Generic, |ctor| ctor(tag))
    }

    /// Whether a tag has a registered kind
    #[must_use]
    pub fn is_registered(&self, tag: &str) -> bool {
        self.constructors.contains_key(&tag.to_ascii_lowercase())
    }
}

/// Value of an `<input type=...>` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputType {
    /// `text` (and any unknown type)
    #[default]
    Text,
    /// `password`
    Password,
    /// `checkbox`
    Checkbox,
    /// `radio`
    Radio,
    /// `submit`
    Submit,
    /// `button`
    Button,
    /// `hidden`
    Hidden,
    /// `file`
    File,
    /// `image`
    Image,
    /// `reset`
    Reset,
}

impl FromAttribute for InputType {
    fn from_attribute(raw: &str) -> Option<Self> {
        let kind = match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "password" => Self::Password,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "submit" => Self::Submit,
            "button" => Self::Button,
            "hidden" => Self::Hidden,
            "file" => Self::File,
            "image" => Self::Image,
            "reset" => Self::Reset,
            _ => return None,
        };
        Some(kind)
    }
}

/// Typed view over an `<input>`
#[derive(Debug, Clone, Copy)]
pub struct InputView<'a> {
    attributes: &'a AttributeStore,
}

impl<'a> InputView<'a> {
    pub(crate) const fn new(attributes: &'a AttributeStore) -> Self {
        Self { attributes }
    }

    /// `type` attribute, defaulting to text
    #[must_use]
    pub fn input_type(&self) -> InputType {
        self.attributes.get_or_default("type")
    }

    /// Cached `value`
    #[must_use]
    pub fn value(&self) -> &'a str {
        self.attributes.raw("value").unwrap_or_default()
    }

    /// `checked` flag
    #[must_use]
    pub fn checked(&self) -> bool {
        self.attributes.get("checked", false)
    }

    /// `disabled` flag
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.attributes.get("disabled", false)
    }

    /// `maxlength`, unset when absent or empty
    #[must_use]
    pub fn max_length(&self) -> Option<u32> {
        self.attributes.get("maxlength", None)
    }
}

/// Typed view over an `<a>`
#[derive(Debug, Clone, Copy)]
pub struct AnchorView<'a> {
    attributes: &'a AttributeStore,
}

impl<'a> AnchorView<'a> {
    pub(crate) const fn new(attributes: &'a AttributeStore) -> Self {
        Self { attributes }
    }

    /// `href`
    #[must_use]
    pub fn href(&self) -> Option<&'a str> {
        self.attributes.raw("href")
    }

    /// `target` browsing context name
    #[must_use]
    pub fn target(&self) -> Option<&'a str> {
        self.attributes.raw("target")
    }
}

/// Typed view over a `<select>`
#[derive(Debug, Clone, Copy)]
pub struct SelectView<'a> {
    attributes: &'a AttributeStore,
}

impl<'a> SelectView<'a> {
    pub(crate) const fn new(attributes: &'a AttributeStore) -> Self {
        Self { attributes }
    }

    /// `multiple` flag
    #[must_use]
    pub fn multiple(&self) -> bool {
        self.attributes.get("multiple", false)
    }

    /// `disabled` flag
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.attributes.get("disabled", false)
    }

    /// `size`, unset when absent
    #[must_use]
    pub fn size(&self) -> Option<u32> {
        self.attributes.get("size", None)
    }
}

/// Typed view over an `<option>`
#[derive(Debug, Clone, Copy)]
pub struct OptionView<'a> {
    attributes: &'a AttributeStore,
}

impl<'a> OptionView<'a> {
    pub(crate) const fn new(attributes: &'a AttributeStore) -> Self {
        Self { attributes }
    }

    /// `selected` flag
    #[must_use]
    pub fn selected(&self) -> bool {
        self.attributes.get("selected", false)
    }

    /// `value`, if present
    #[must_use]
    pub fn value(&self) -> Option<&'a str> {
        self.attributes.raw("value")
    }
}
