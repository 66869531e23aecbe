//! JSON snapshot of a [`MemoryDocument`]
//!
//! Pages hold nested frames and text nodes. Each text node is stored in a
//! single font: the font of its first character.

use super::{FontName, MemoryDocument, NodeId, NodeKind};
use crate::error::{DocumentError, SyncError};
use serde::{Deserialize, Serialize};

/// Whole-document snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Pages in order; the first is the current page
    #[serde(default)]
    pub pages: Vec<PageSnapshot>,
    /// Fonts not installed locally
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_fonts: Vec<FontName>,
}

/// One page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Page name
    pub name: String,
    /// Top-level layers
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

/// A layer below a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeSnapshot {
    /// Container layer
    Frame {
        /// Layer name
        name: String,
        /// Nested layers
        #[serde(default)]
        children: Vec<NodeSnapshot>,
    },
    /// Text layer
    Text(TextSnapshot),
}

/// A text layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSnapshot {
    /// Layer name
    pub name: String,
    /// Displayed text
    #[serde(default)]
    pub characters: String,
    /// Font of the whole layer
    #[serde(default)]
    pub font: FontName,
    /// Host reports a missing font for this layer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub missing_font: bool,
    /// Host renames the layer after its text
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_rename: bool,
}

impl TextSnapshot {
    /// Text layer in the default font
    #[must_use]
    pub fn new(name: impl Into<String>, characters: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            characters: characters.into(),
            font: FontName::default(),
            missing_font: false,
            auto_rename: false,
        }
    }
}

impl DocumentSnapshot {
    /// Parse a snapshot from JSON
    ///
    /// # Errors
    /// - `SyncError::Config` if the JSON does not describe a document
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::Config(format!("document snapshot: {e}")))
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// - `SyncError::Config` if serialization fails
    pub fn to_json_string(&self) -> Result<String, SyncError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("document snapshot: {e}")))
    }
}

impl MemoryDocument {
    /// Build a document from a snapshot
    ///
    /// # Errors
    /// Propagates tree construction failures
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self, DocumentError> {
        let doc = Self::new();
        for page in &snapshot.pages {
            let id = doc.add_page(&page.name);
            for child in &page.children {
                doc.import(id, child)?;
            }
        }
        for font in &snapshot.unavailable_fonts {
            doc.mark_font_unavailable(font.clone());
        }
        Ok(doc)
    }

    /// Capture the current tree
    ///
    /// # Errors
    /// Propagates node lookup failures
    pub fn snapshot(&self) -> Result<DocumentSnapshot, DocumentError> {
        let mut pages = Vec::new();
        for page in self.pages() {
            let children = self
                .children(page)?
                .into_iter()
                .map(|child| self.export(child))
                .collect::<Result<_, _>>()?;
            pages.push(PageSnapshot {
                name: self.name_of(page)?,
                children,
            });
        }
        Ok(DocumentSnapshot {
            pages,
            unavailable_fonts: self.unavailable_fonts(),
        })
    }

    fn import(&self, parent: NodeId, node: &NodeSnapshot) -> Result<(), DocumentError> {
        match node {
            NodeSnapshot::Frame { name, children } => {
                let id = self.add_frame(parent, name)?;
                for child in children {
                    self.import(id, child)?;
                }
            }
            NodeSnapshot::Text(text) => {
                let id = self.add_text(parent, &text.name, &text.characters, text.font.clone())?;
                self.set_text_flags(id, text.missing_font, text.auto_rename)?;
            }
        }
        Ok(())
    }

    fn export(&self, node: NodeId) -> Result<NodeSnapshot, DocumentError> {
        let name = self.name_of(node)?;
        if self.kind_of(node)? == NodeKind::Text {
            let (characters, font) = self.text_of(node)?;
            let (missing_font, auto_rename) = self.text_flags(node)?;
            return Ok(NodeSnapshot::Text(TextSnapshot {
                name,
                characters,
                font,
                missing_font,
                auto_rename,
            }));
        }

        let children = self
            .children(node)?
            .into_iter()
            .map(|child| self.export(child))
            .collect::<Result<_, _>>()?;
        Ok(NodeSnapshot::Frame { name, children })
    }
}
