//! In-memory document
//!
//! An ordered node arena behind a `parking_lot::RwLock`. It follows the host's
//! rules that matter to a sync: text edits need loaded fonts, unavailable
//! fonts cannot be loaded, auto-renamed layers take their name from their
//! text, and new text lands on the current page.

use super::{Document, FontName, NodeId, NodeKind};
use crate::error::DocumentError;
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: Option<TextData>,
}

#[derive(Debug, Clone)]
struct TextData {
    characters: String,
    /// One entry per character
    runs: Vec<FontName>,
    default_font: FontName,
    missing_font: bool,
    auto_rename: bool,
}

impl TextData {
    fn len(&self) -> usize {
        self.runs.len()
    }

    fn fonts(&self) -> Vec<FontName> {
        if self.runs.is_empty() {
            return vec![self.default_font.clone()];
        }
        let distinct: IndexSet<&FontName> = self.runs.iter().collect();
        distinct.into_iter().cloned().collect()
    }

    fn check_range(&self, node: NodeId, start: usize, end: usize) -> Result<(), DocumentError> {
        if start >= end || end > self.len() {
            return Err(DocumentError::InvalidRange {
                node,
                start,
                end,
                len: self.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Tree {
    nodes: IndexMap<NodeId, Node>,
    root: NodeId,
    current_page: Option<NodeId>,
    next_id: u64,
    loaded_fonts: IndexSet<FontName>,
    unavailable_fonts: IndexSet<FontName>,
}

impl Tree {
    fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = IndexMap::new();
        nodes.insert(
            root,
            Node {
                kind: NodeKind::Document,
                name: "Document".to_string(),
                parent: None,
                children: Vec::new(),
                text: None,
            },
        );
        Self {
            nodes,
            root,
            current_page: None,
            next_id: 1,
            loaded_fonts: IndexSet::new(),
            unavailable_fonts: IndexSet::new(),
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, DocumentError> {
        self.nodes.get(&id).ok_or(DocumentError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DocumentError> {
        self.nodes.get_mut(&id).ok_or(DocumentError::NodeNotFound(id))
    }

    fn text(&self, id: NodeId) -> Result<&TextData, DocumentError> {
        self.node(id)?.text.as_ref().ok_or(DocumentError::NotText(id))
    }

    fn text_mut(&mut self, id: NodeId) -> Result<&mut TextData, DocumentError> {
        self.node_mut(id)?
            .text
            .as_mut()
            .ok_or(DocumentError::NotText(id))
    }

    fn insert(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: &str,
        text: Option<TextData>,
    ) -> Result<NodeId, DocumentError> {
        let id = NodeId(self.next_id);
        self.node_mut(parent)?.children.push(id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                name: name.to_string(),
                parent: Some(parent),
                children: Vec::new(),
                text,
            },
        );
        Ok(id)
    }

    /// Pre-order walk from the root
    fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    fn text_nodes_where(&self, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.kind == NodeKind::Text && pred(n))
            })
            .collect()
    }

    fn require_loaded(&self, node: NodeId, fonts: &[FontName]) -> Result<(), DocumentError> {
        match fonts.iter().find(|f| !self.loaded_fonts.contains(*f)) {
            Some(font) => Err(DocumentError::FontNotLoaded {
                node,
                font: font.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Document held entirely in memory
#[derive(Debug)]
pub struct MemoryDocument {
    tree: RwLock<Tree>,
    yield_on_edit: bool,
}

impl MemoryDocument {
    /// Create an empty document with no pages
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree::new()),
            yield_on_edit: false,
        }
    }

    /// Yield to the scheduler before every text edit
    ///
    /// Makes concurrent element tasks interleave the way they do against a
    /// real host.
    #[must_use]
    pub fn with_yield_on_edit(mut self, enabled: bool) -> Self {
        self.yield_on_edit = enabled;
        self
    }

    /// Document root
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.tree.read().root
    }

    /// Append a page; the first page becomes the current page
    pub fn add_page(&self, name: &str) -> NodeId {
        let mut tree = self.tree.write();
        let root = tree.root;
        let id = NodeId(tree.next_id);
        tree.next_id += 1;
        tree.nodes.insert(
            id,
            Node {
                kind: NodeKind::Page,
                name: name.to_string(),
                parent: Some(root),
                children: Vec::new(),
                text: None,
            },
        );
        if let Some(node) = tree.nodes.get_mut(&root) {
            node.children.push(id);
        }
        if tree.current_page.is_none() {
            tree.current_page = Some(id);
        }
        id
    }

    /// Current page, where new text nodes are created
    #[must_use]
    pub fn current_page(&self) -> Option<NodeId> {
        self.tree.read().current_page
    }

    /// Switch the current page
    ///
    /// # Errors
    /// - `DocumentError::NodeNotFound` if `page` does not exist
    /// - `DocumentError::Host` if `page` is not a page
    pub fn set_current_page(&self, page: NodeId) -> Result<(), DocumentError> {
        let mut tree = self.tree.write();
        if tree.node(page)?.kind != NodeKind::Page {
            return Err(DocumentError::Host(format!("node {page} is not a page")));
        }
        tree.current_page = Some(page);
        Ok(())
    }

    /// Append a container under `parent`
    ///
    /// # Errors
    /// - `DocumentError::NodeNotFound` if `parent` does not exist
    pub fn add_frame(&self, parent: NodeId, name: &str) -> Result<NodeId, DocumentError> {
        self.tree.write().insert(parent, NodeKind::Frame, name, None)
    }

    /// Append a text node under `parent`, set in a single font
    ///
    /// # Errors
    /// - `DocumentError::NodeNotFound` if `parent` does not exist
    pub fn add_text(
        &self,
        parent: NodeId,
        name: &str,
        characters: &str,
        font: FontName,
    ) -> Result<NodeId, DocumentError> {
        let text = TextData {
            characters: characters.to_string(),
            runs: vec![font.clone(); characters.chars().count()],
            default_font: font,
            missing_font: false,
            auto_rename: false,
        };
        self.tree
            .write()
            .insert(parent, NodeKind::Text, name, Some(text))
    }

    /// Flag a text node as having a missing font
    ///
    /// # Errors
    /// - `DocumentError::NotText` if `node` is not a text node
    pub fn set_missing_font(&self, node: NodeId, missing: bool) -> Result<(), DocumentError> {
        self.tree.write().text_mut(node)?.missing_font = missing;
        Ok(())
    }

    /// Mark a font as not installed
    pub fn mark_font_unavailable(&self, font: FontName) {
        let mut tree = self.tree.write();
        tree.loaded_fonts.shift_remove(&font);
        tree.unavailable_fonts.insert(font);
    }

    /// Fonts marked as not installed
    #[must_use]
    pub fn unavailable_fonts(&self) -> Vec<FontName> {
        self.tree.read().unavailable_fonts.iter().cloned().collect()
    }

    /// Whether a font has been loaded
    #[must_use]
    pub fn is_font_loaded(&self, font: &FontName) -> bool {
        self.tree.read().loaded_fonts.contains(font)
    }

    /// Auto-rename flag of a text node
    ///
    /// # Errors
    /// - `DocumentError::NotText` if `node` is not a text node
    pub fn auto_rename(&self, node: NodeId) -> Result<bool, DocumentError> {
        Ok(self.tree.read().text(node)?.auto_rename)
    }

    /// Per-character fonts of a text node
    ///
    /// # Errors
    /// - `DocumentError::NotText` if `node` is not a text node
    pub fn font_runs(&self, node: NodeId) -> Result<Vec<FontName>, DocumentError> {
        Ok(self.tree.read().text(node)?.runs.clone())
    }

    /// Children of a node, in order
    ///
    /// # Errors
    /// - `DocumentError::NodeNotFound` if `node` does not exist
    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        Ok(self.tree.read().node(node)?.children.clone())
    }

    /// Whether a node exists
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.tree.read().nodes.contains_key(&node)
    }

    pub(super) fn set_text_flags(
        &self,
        node: NodeId,
        missing_font: bool,
        auto_rename: bool,
    ) -> Result<(), DocumentError> {
        let mut tree = self.tree.write();
        let text = tree.text_mut(node)?;
        text.missing_font = missing_font;
        text.auto_rename = auto_rename;
        Ok(())
    }

    pub(super) fn text_flags(&self, node: NodeId) -> Result<(bool, bool), DocumentError> {
        let tree = self.tree.read();
        let text = tree.text(node)?;
        Ok((text.missing_font, text.auto_rename))
    }

    pub(super) fn kind_of(&self, node: NodeId) -> Result<NodeKind, DocumentError> {
        Ok(self.tree.read().node(node)?.kind)
    }

    pub(super) fn name_of(&self, node: NodeId) -> Result<String, DocumentError> {
        Ok(self.tree.read().node(node)?.name.clone())
    }

    pub(super) fn text_of(&self, node: NodeId) -> Result<(String, FontName), DocumentError> {
        let tree = self.tree.read();
        let text = tree.text(node)?;
        let font = text.runs.first().unwrap_or(&text.default_font).clone();
        Ok((text.characters.clone(), font))
    }

    pub(super) fn pages(&self) -> Vec<NodeId> {
        let tree = self.tree.read();
        tree.nodes
            .get(&tree.root)
            .map(|root| root.children.clone())
            .unwrap_or_default()
    }

    async fn pause(&self) {
        if self.yield_on_edit {
            tokio::task::yield_now().await;
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Document for MemoryDocument {
    async fn find_text_nodes(&self) -> Result<Vec<NodeId>, DocumentError> {
        Ok(self.tree.read().text_nodes_where(|_| true))
    }

    async fn find_text_nodes_named(&self, name: &str) -> Result<Vec<NodeId>, DocumentError> {
        Ok(self.tree.read().text_nodes_where(|n| n.name == name))
    }

    async fn kind(&self, node: NodeId) -> Result<NodeKind, DocumentError> {
        self.kind_of(node)
    }

    async fn name(&self, node: NodeId) -> Result<String, DocumentError> {
        self.name_of(node)
    }

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DocumentError> {
        Ok(self.tree.read().node(node)?.parent)
    }

    async fn characters(&self, node: NodeId) -> Result<String, DocumentError> {
        Ok(self.tree.read().text(node)?.characters.clone())
    }

    async fn set_characters(&self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        self.pause().await;

        let mut tree = self.tree.write();
        let fonts = tree.text(node)?.fonts();
        tree.require_loaded(node, &fonts)?;

        let data = tree.text_mut(node)?;
        let font = data.runs.first().unwrap_or(&data.default_font).clone();
        data.characters = text.to_string();
        data.runs = vec![font; text.chars().count()];
        let rename = data.auto_rename;

        if rename {
            tree.node_mut(node)?.name = text.to_string();
        }
        Ok(())
    }

    async fn set_auto_rename(&self, node: NodeId, enabled: bool) -> Result<(), DocumentError> {
        self.tree.write().text_mut(node)?.auto_rename = enabled;
        Ok(())
    }

    async fn has_missing_font(&self, node: NodeId) -> Result<bool, DocumentError> {
        let tree = self.tree.read();
        let text = tree.text(node)?;
        Ok(text.missing_font
            || text
                .fonts()
                .iter()
                .any(|f| tree.unavailable_fonts.contains(f)))
    }

    async fn font_name(&self, node: NodeId) -> Result<FontName, DocumentError> {
        Ok(self.tree.read().text(node)?.default_font.clone())
    }

    async fn fonts(&self, node: NodeId) -> Result<Vec<FontName>, DocumentError> {
        Ok(self.tree.read().text(node)?.fonts())
    }

    async fn range_font_name(
        &self,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Option<FontName>, DocumentError> {
        let tree = self.tree.read();
        let text = tree.text(node)?;
        text.check_range(node, start, end)?;

        let first = &text.runs[start];
        let uniform = text.runs[start..end].iter().all(|f| f == first);
        Ok(uniform.then(|| first.clone()))
    }

    async fn set_range_font_name(
        &self,
        node: NodeId,
        start: usize,
        end: usize,
        font: &FontName,
    ) -> Result<(), DocumentError> {
        self.pause().await;

        let mut tree = self.tree.write();
        let mut needed = tree.text(node)?.fonts();
        needed.push(font.clone());
        tree.require_loaded(node, &needed)?;

        let text = tree.text_mut(node)?;
        text.check_range(node, start, end)?;
        for slot in &mut text.runs[start..end] {
            slot.clone_from(font);
        }
        if start == 0 {
            text.default_font = font.clone();
        }
        Ok(())
    }

    async fn load_font(&self, font: &FontName) -> Result<(), DocumentError> {
        tokio::task::yield_now().await;

        let mut tree = self.tree.write();
        if tree.unavailable_fonts.contains(font) {
            return Err(DocumentError::FontUnavailable(font.clone()));
        }
        tree.loaded_fonts.insert(font.clone());
        Ok(())
    }

    async fn create_text(&self, name: &str) -> Result<NodeId, DocumentError> {
        let mut tree = self.tree.write();
        let page = tree
            .current_page
            .ok_or_else(|| DocumentError::Host("document has no current page".to_string()))?;
        let text = TextData {
            characters: String::new(),
            runs: Vec::new(),
            default_font: FontName::default(),
            missing_font: false,
            auto_rename: true,
        };
        tree.insert(page, NodeKind::Text, name, Some(text))
    }

    async fn remove(&self, node: NodeId) -> Result<(), DocumentError> {
        let mut tree = self.tree.write();
        let parent = tree.node(node)?.parent.ok_or_else(|| {
            DocumentError::Host("the document root cannot be removed".to_string())
        })?;

        if let Some(p) = tree.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = tree.nodes.shift_remove(&id) {
                stack.extend(removed.children);
            }
        }

        if tree.current_page.is_some_and(|p| !tree.nodes.contains_key(&p)) {
            let fallback = tree
                .nodes
                .get(&tree.root)
                .and_then(|root| root.children.first().copied());
            tree.current_page = fallback;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::page_name;

    fn inter() -> FontName {
        FontName::default()
    }

    fn doc_with_text(characters: &str) -> (MemoryDocument, NodeId) {
        let doc = MemoryDocument::new();
        let page = doc.add_page("Home");
        let frame = doc.add_frame(page, "Hero").unwrap();
        let text = doc.add_text(frame, "{{title}}", characters, inter()).unwrap();
        (doc, text)
    }

    #[tokio::test]
    async fn finds_text_nodes_in_tree_order() {
        let doc = MemoryDocument::new();
        let home = doc.add_page("Home");
        let about = doc.add_page("About");
        let frame = doc.add_frame(home, "Card").unwrap();
        let a = doc.add_text(frame, "a", "A", inter()).unwrap();
        let b = doc.add_text(home, "b", "B", inter()).unwrap();
        let c = doc.add_text(about, "a", "C", inter()).unwrap();

        assert_eq!(doc.find_text_nodes().await.unwrap(), vec![a, b, c]);
        assert_eq!(doc.find_text_nodes_named("a").await.unwrap(), vec![a, c]);
    }

    #[tokio::test]
    async fn page_name_walks_parents() {
        let (doc, text) = doc_with_text("Hi");
        assert_eq!(page_name(&doc, text).await.unwrap().as_deref(), Some("Home"));
        assert_eq!(page_name(&doc, doc.root()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn editing_requires_loaded_font() {
        let (doc, text) = doc_with_text("Hi");

        let err = doc.set_characters(text, "Hello").await.unwrap_err();
        assert!(matches!(err, DocumentError::FontNotLoaded { .. }));

        doc.load_font(&inter()).await.unwrap();
        doc.set_characters(text, "Hello").await.unwrap();
        assert_eq!(doc.characters(text).await.unwrap(), "Hello");
        assert_eq!(doc.font_runs(text).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unavailable_fonts_cannot_load() {
        let (doc, text) = doc_with_text("Hi");
        doc.mark_font_unavailable(inter());

        assert!(doc.has_missing_font(text).await.unwrap());
        assert_eq!(
            doc.load_font(&inter()).await,
            Err(DocumentError::FontUnavailable(inter()))
        );
    }

    #[tokio::test]
    async fn range_fonts_detect_mixed_runs() {
        let (doc, text) = doc_with_text("Hello");
        let bold = FontName::new("Inter", "Bold");
        doc.load_font(&inter()).await.unwrap();
        doc.load_font(&bold).await.unwrap();

        doc.set_range_font_name(text, 2, 5, &bold).await.unwrap();
        assert_eq!(doc.range_font_name(text, 0, 1).await.unwrap(), Some(inter()));
        assert_eq!(doc.range_font_name(text, 0, 5).await.unwrap(), None);
        assert_eq!(doc.fonts(text).await.unwrap(), vec![inter(), bold]);

        let err = doc.range_font_name(text, 3, 9).await.unwrap_err();
        assert!(matches!(err, DocumentError::InvalidRange { len: 5, .. }));
    }

    #[tokio::test]
    async fn auto_rename_follows_text() {
        let (doc, text) = doc_with_text("Hi");
        doc.load_font(&inter()).await.unwrap();
        doc.set_auto_rename(text, true).await.unwrap();

        doc.set_characters(text, "Renamed").await.unwrap();
        assert_eq!(doc.name(text).await.unwrap(), "Renamed");
    }

    #[tokio::test]
    async fn create_and_remove() {
        let doc = MemoryDocument::new();
        assert!(doc.create_text("x").await.is_err());

        let page = doc.add_page("Home");
        let frame = doc.add_frame(page, "Frame").unwrap();
        let inner = doc.add_text(frame, "inner", "", inter()).unwrap();
        let created = doc.create_text("report").await.unwrap();
        assert_eq!(doc.parent(created).await.unwrap(), Some(page));

        doc.remove(frame).await.unwrap();
        assert!(!doc.contains(inner));
        assert_eq!(doc.children(page).unwrap(), vec![created]);
        assert!(doc.remove(doc.root()).await.is_err());
    }
}
