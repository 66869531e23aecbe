//! Testing utilities for copythat workspace
//!
//! Document fixtures, data mappings and report readers shared by the
//! core and CLI test suites.

#![allow(missing_docs)]

use copythat_core::{
    find_report, DataMapping, Document, DocumentSnapshot, FontName, MemoryDocument, NodeId,
    NodeSnapshot, PageSnapshot, ReportConfig, SyncConfig, Synchronizer, TextSnapshot,
};
use std::sync::Arc;

pub fn inter() -> FontName {
    FontName::default()
}

pub fn inter_bold() -> FontName {
    FontName::new("Inter", "Bold")
}

pub fn text(name: &str, characters: &str) -> NodeSnapshot {
    NodeSnapshot::Text(TextSnapshot::new(name, characters))
}

pub fn missing_font_text(name: &str, characters: &str) -> NodeSnapshot {
    NodeSnapshot::Text(TextSnapshot {
        missing_font: true,
        ..TextSnapshot::new(name, characters)
    })
}

pub fn frame(name: &str, children: Vec<NodeSnapshot>) -> NodeSnapshot {
    NodeSnapshot::Frame {
        name: name.to_string(),
        children,
    }
}

/// Fluent builder over [`DocumentSnapshot`]
///
/// Layers go onto the most recently added page; a page named `Page 1` is
/// added if none exists yet.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    snapshot: DocumentSnapshot,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, name: &str) -> Self {
        self.snapshot.pages.push(PageSnapshot {
            name: name.to_string(),
            children: Vec::new(),
        });
        self
    }

    pub fn layer(mut self, node: NodeSnapshot) -> Self {
        if self.snapshot.pages.is_empty() {
            self = self.page("Page 1");
        }
        if let Some(page) = self.snapshot.pages.last_mut() {
            page.children.push(node);
        }
        self
    }

    pub fn text(self, name: &str, characters: &str) -> Self {
        self.layer(text(name, characters))
    }

    pub fn frame(self, name: &str, children: Vec<NodeSnapshot>) -> Self {
        self.layer(frame(name, children))
    }

    pub fn unavailable_font(mut self, font: FontName) -> Self {
        self.snapshot.unavailable_fonts.push(font);
        self
    }

    pub fn snapshot(&self) -> &DocumentSnapshot {
        &self.snapshot
    }

    pub fn build(self) -> Arc<MemoryDocument> {
        Arc::new(MemoryDocument::from_snapshot(&self.snapshot).unwrap())
    }
}

pub fn mapping(pairs: &[(&str, &str)]) -> DataMapping {
    pairs.iter().copied().collect()
}

pub fn setup_synchronizer(doc: &Arc<MemoryDocument>) -> Synchronizer<MemoryDocument> {
    Synchronizer::new(Arc::clone(doc), SyncConfig::new())
}

/// First text layer with the given name
pub async fn node_named(doc: &MemoryDocument, name: &str) -> NodeId {
    doc.find_text_nodes_named(name)
        .await
        .unwrap()
        .first()
        .copied()
        .unwrap_or_else(|| panic!("no text layer named {name}"))
}

pub async fn text_of(doc: &MemoryDocument, node: NodeId) -> String {
    doc.characters(node).await.unwrap()
}

/// Anomaly lines of the default report layer
pub async fn report_lines(doc: &MemoryDocument) -> Vec<String> {
    let report = find_report(doc, &ReportConfig::default())
        .await
        .unwrap()
        .expect("report layer exists");
    report.lines(doc).await.unwrap()
}

pub fn assert_report_contains(lines: &[String], expected: &str) {
    assert!(
        lines.iter().any(|line| line == expected),
        "report has no line {expected:?}; lines: {lines:#?}"
    );
}
