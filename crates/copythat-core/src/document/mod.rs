//! Host document seam
//!
//! The design tool owns the node tree; copythat only talks to it through the
//! [`Document`] trait. [`MemoryDocument`] is the in-process implementation
//! used by the CLI and the tests.

mod memory;
mod snapshot;

pub use memory::MemoryDocument;
pub use snapshot::{DocumentSnapshot, NodeSnapshot, PageSnapshot, TextSnapshot};

use crate::error::DocumentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Node identifier, stable for the node's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node kinds the synchronizer cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Document root
    Document,
    /// Page (canvas)
    Page,
    /// Any container: frame, group, component
    Frame,
    /// Text layer
    Text,
}

/// Font family and style
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontName {
    /// Family, e.g. `Inter`
    pub family: String,
    /// Style, e.g. `Bold Italic`
    pub style: String,
}

impl FontName {
    /// Create a font name
    #[inline]
    #[must_use]
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl Default for FontName {
    fn default() -> Self {
        Self::new("Inter", "Regular")
    }
}

impl Display for FontName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Operations copythat needs from the host document
///
/// Character offsets count Unicode scalar values. Text mutation
/// (`set_characters`, `set_range_font_name`) requires the fonts involved to
/// have been loaded with [`Document::load_font`] first.
#[async_trait]
pub trait Document: Send + Sync {
    /// All text nodes, in tree order
    async fn find_text_nodes(&self) -> Result<Vec<NodeId>, DocumentError>;

    /// Text nodes with exactly this name, in tree order
    async fn find_text_nodes_named(&self, name: &str) -> Result<Vec<NodeId>, DocumentError>;

    /// Kind of a node
    async fn kind(&self, node: NodeId) -> Result<NodeKind, DocumentError>;

    /// Layer name
    async fn name(&self, node: NodeId) -> Result<String, DocumentError>;

    /// Parent node, `None` for the root
    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DocumentError>;

    /// Displayed text of a text node
    async fn characters(&self, node: NodeId) -> Result<String, DocumentError>;

    /// Replace the displayed text of a text node
    async fn set_characters(&self, node: NodeId, text: &str) -> Result<(), DocumentError>;

    /// Toggle whether the host renames the layer after its content
    async fn set_auto_rename(&self, node: NodeId, enabled: bool) -> Result<(), DocumentError>;

    /// Whether any font used by the node is unavailable locally
    async fn has_missing_font(&self, node: NodeId) -> Result<bool, DocumentError>;

    /// Font new text receives when the node is empty
    async fn font_name(&self, node: NodeId) -> Result<FontName, DocumentError>;

    /// Distinct fonts used by the node
    async fn fonts(&self, node: NodeId) -> Result<Vec<FontName>, DocumentError>;

    /// Font over `start..end`, `None` when the range mixes fonts
    async fn range_font_name(
        &self,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Option<FontName>, DocumentError>;

    /// Apply a font over `start..end`
    async fn set_range_font_name(
        &self,
        node: NodeId,
        start: usize,
        end: usize,
        font: &FontName,
    ) -> Result<(), DocumentError>;

    /// Make a font ready for text mutation
    async fn load_font(&self, font: &FontName) -> Result<(), DocumentError>;

    /// Create an empty text node on the current page
    async fn create_text(&self, name: &str) -> Result<NodeId, DocumentError>;

    /// Remove a node and its descendants
    async fn remove(&self, node: NodeId) -> Result<(), DocumentError>;
}

/// Name of the page containing `node`
///
/// Walks the parent chain; `None` when the chain ends without a page.
pub async fn page_name<D>(doc: &D, node: NodeId) -> Result<Option<String>, DocumentError>
where
    D: Document + ?Sized,
{
    let mut current = Some(node);
    while let Some(id) = current {
        if doc.kind(id).await? == NodeKind::Page {
            return doc.name(id).await.map(Some);
        }
        current = doc.parent(id).await?;
    }
    Ok(None)
}
