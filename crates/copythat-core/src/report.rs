//! Sync report layer
//!
//! One reserved text layer per document collects a line per anomaly:
//!
//! ```text
//! {{copyThat.airtable}} report — synced 5 Mar 2024, 14:07
//! ===================================
//! Home > {{farewell}} — String wasn't found in Airtable.
//! ```
//!
//! [`create_report`] resets the layer and hands back a [`ReportHandle`];
//! every append goes through that handle.

use crate::config::ReportConfig;
use crate::document::{page_name, Document, NodeId};
use crate::error::{DocumentError, SyncError, SyncResult};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter, Write};

/// Separator under the header line
pub const REPORT_RULE: &str = "===================================";

const HEADER_LINES: usize = 2;

/// Kinds of sync problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Layer uses a font that is not installed; text left untouched
    MissingFont,
    /// Key absent from the data mapping; placeholder written
    #[serde(rename = "NOT_IN_AIRTABLE")]
    NotInAirtable,
    /// Diagnostic line for checking the report layer itself
    JustTesting,
}

impl AnomalyKind {
    /// Stable identifier
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingFont => "MISSING_FONT",
            Self::NotInAirtable => "NOT_IN_AIRTABLE",
            Self::JustTesting => "JUST_TESTING",
        }
    }

    /// Sentence written into the report
    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            Self::MissingFont => "Missing font. Node not updated.",
            Self::NotInAirtable => "String wasn't found in Airtable.",
            Self::JustTesting => "Just testing to see if this works. Nothing to see here.",
        }
    }
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One problem found during a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    /// Page containing the layer, if any
    pub page: Option<String>,
    /// Layer name
    pub element: String,
    /// What went wrong
    pub kind: AnomalyKind,
}

impl Anomaly {
    /// Create an anomaly record
    #[must_use]
    pub fn new(page: Option<String>, element: impl Into<String>, kind: AnomalyKind) -> Self {
        Self {
            page,
            element: element.into(),
            kind,
        }
    }

    /// Look up page and layer name of `element`
    ///
    /// # Errors
    /// Propagates host lookup failures
    pub async fn describe<D>(doc: &D, element: NodeId, kind: AnomalyKind) -> Result<Self, DocumentError>
    where
        D: Document + ?Sized,
    {
        let page = page_name(doc, element).await?;
        let name = doc.name(element).await?;
        Ok(Self::new(page, name, kind))
    }

    /// Report line: `<page> > <element> — <phrase>`
    #[must_use]
    pub fn line(&self, unknown_page: &str) -> String {
        format!(
            "{} > {} — {}",
            self.page.as_deref().unwrap_or(unknown_page),
            self.element,
            self.kind.phrase()
        )
    }
}

/// Reference to the report layer of the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHandle {
    node: NodeId,
    unknown_page_label: String,
}

impl ReportHandle {
    /// Report layer node
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Append one anomaly line
    ///
    /// # Errors
    /// - `SyncError::ReportMissing` if the layer was removed
    /// - `SyncError::Document` on other host failures
    pub async fn append<D>(&self, doc: &D, anomaly: &Anomaly) -> SyncResult<()>
    where
        D: Document + ?Sized,
    {
        let mut content = doc.characters(self.node).await.map_err(|e| self.missing(e))?;
        content.push('\n');
        content.push_str(&anomaly.line(&self.unknown_page_label));
        doc.set_characters(self.node, &content)
            .await
            .map_err(|e| self.missing(e))
    }

    /// Describe `element` and append a line for it
    ///
    /// # Errors
    /// Same as [`ReportHandle::append`], plus lookup failures for `element`
    pub async fn append_anomaly<D>(&self, doc: &D, element: NodeId, kind: AnomalyKind) -> SyncResult<Anomaly>
    where
        D: Document + ?Sized,
    {
        let anomaly = Anomaly::describe(doc, element, kind).await?;
        self.append(doc, &anomaly).await?;
        Ok(anomaly)
    }

    /// Anomaly lines currently in the layer, header excluded
    ///
    /// # Errors
    /// - `SyncError::ReportMissing` if the layer was removed
    pub async fn lines<D>(&self, doc: &D) -> SyncResult<Vec<String>>
    where
        D: Document + ?Sized,
    {
        let content = doc.characters(self.node).await.map_err(|e| self.missing(e))?;
        Ok(content
            .lines()
            .skip(HEADER_LINES)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn missing(&self, err: DocumentError) -> SyncError {
        match err {
            DocumentError::NodeNotFound(id) if id == self.node => SyncError::ReportMissing(id),
            other => SyncError::Document(other),
        }
    }
}

/// Header text for a run started at `at`
#[must_use]
pub fn header(config: &ReportConfig, at: NaiveDateTime) -> String {
    format!(
        "{} report — synced {}, {}\n{}",
        config.title,
        stamp(at, &config.date_format),
        stamp(at, &config.time_format),
        REPORT_RULE
    )
}

fn stamp(at: NaiveDateTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(format)).is_err() {
        tracing::warn!("Invalid report timestamp format {:?}, using ISO 8601", format);
        out = at.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    out
}

/// Reset the report layer, stamped with the current local time
///
/// # Errors
/// Propagates host failures; the font must load before anything is written
pub async fn create_report<D>(doc: &D, config: &ReportConfig) -> SyncResult<ReportHandle>
where
    D: Document + ?Sized,
{
    create_report_at(doc, config, Local::now().naive_local()).await
}

/// Reset the report layer with an explicit timestamp
///
/// Removes every text layer carrying the reserved name, creates a fresh one
/// on the current page, loads its font and writes the header.
///
/// # Errors
/// Propagates host failures
pub async fn create_report_at<D>(doc: &D, config: &ReportConfig, at: NaiveDateTime) -> SyncResult<ReportHandle>
where
    D: Document + ?Sized,
{
    let stale = doc.find_text_nodes_named(&config.node_name).await?;
    if !stale.is_empty() {
        tracing::debug!("Removing {} previous report layer(s)", stale.len());
    }
    for node in stale {
        doc.remove(node).await?;
    }

    let node = doc.create_text(&config.node_name).await?;
    doc.set_auto_rename(node, false).await?;
    let font = doc.font_name(node).await?;
    doc.load_font(&font).await?;
    doc.set_characters(node, &header(config, at)).await?;

    tracing::info!("Created report layer {}", node);
    Ok(ReportHandle {
        node,
        unknown_page_label: config.unknown_page_label.clone(),
    })
}

/// Report layer left by an earlier run, if any
///
/// # Errors
/// Propagates host failures
pub async fn find_report<D>(doc: &D, config: &ReportConfig) -> SyncResult<Option<ReportHandle>>
where
    D: Document + ?Sized,
{
    let existing = doc.find_text_nodes_named(&config.node_name).await?;
    Ok(existing.first().map(|&node| ReportHandle {
        node,
        unknown_page_label: config.unknown_page_label.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FontName, MemoryDocument};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap()
    }

    #[test]
    fn header_layout() {
        assert_eq!(
            header(&ReportConfig::default(), at()),
            "{{copyThat.airtable}} report — synced 5 Mar 2024, 14:07\n==================================="
        );
    }

    #[test]
    fn bad_format_falls_back() {
        let config = ReportConfig {
            date_format: "%Q".to_string(),
            ..ReportConfig::default()
        };
        assert!(header(&config, at()).contains("synced 2024-03-05 14:07:00, 14:07"));
    }

    #[test]
    fn anomaly_lines() {
        let anomaly = Anomaly::new(Some("Home".into()), "{{farewell}}", AnomalyKind::NotInAirtable);
        assert_eq!(
            anomaly.line("(no page)"),
            "Home > {{farewell}} — String wasn't found in Airtable."
        );

        let orphan = Anomaly::new(None, "{{x}}", AnomalyKind::MissingFont);
        assert_eq!(orphan.line("(no page)"), "(no page) > {{x}} — Missing font. Node not updated.");
        assert_eq!(AnomalyKind::JustTesting.to_string(), "JUST_TESTING");
    }

    #[tokio::test]
    async fn create_replaces_previous_reports() {
        let doc = MemoryDocument::new();
        let page = doc.add_page("Home");
        let config = ReportConfig::default();
        doc.add_text(page, &config.node_name, "old", FontName::default())
            .unwrap();
        doc.add_text(page, &config.node_name, "older", FontName::default())
            .unwrap();

        let report = create_report_at(&doc, &config, at()).await.unwrap();
        let again = create_report_at(&doc, &config, at()).await.unwrap();

        let remaining = doc.find_text_nodes_named(&config.node_name).await.unwrap();
        assert_eq!(remaining, vec![again.node()]);
        assert!(!doc.contains(report.node()));
        assert!(again.lines(&doc).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let doc = MemoryDocument::new();
        let page = doc.add_page("Landing");
        let frame = doc.add_frame(page, "Hero").unwrap();
        let text = doc
            .add_text(frame, "{{headline}}", "Hi", FontName::default())
            .unwrap();

        let report = create_report_at(&doc, &ReportConfig::default(), at())
            .await
            .unwrap();
        let anomaly = report
            .append_anomaly(&doc, text, AnomalyKind::JustTesting)
            .await
            .unwrap();

        assert_eq!(anomaly.page.as_deref(), Some("Landing"));
        assert_eq!(
            report.lines(&doc).await.unwrap(),
            vec!["Landing > {{headline}} — Just testing to see if this works. Nothing to see here."]
        );
        assert_eq!(
            find_report(&doc, &ReportConfig::default()).await.unwrap(),
            Some(report)
        );
    }

    #[tokio::test]
    async fn append_after_removal_is_typed() {
        let doc = MemoryDocument::new();
        doc.add_page("Home");
        let report = create_report_at(&doc, &ReportConfig::default(), at())
            .await
            .unwrap();
        doc.remove(report.node()).await.unwrap();

        let err = report
            .append(&doc, &Anomaly::new(None, "x", AnomalyKind::JustTesting))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ReportMissing(id) if id == report.node()));
    }
}
