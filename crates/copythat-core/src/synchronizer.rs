//! Text synchronizer
//!
//! Scans every text layer, and for each layer whose name is a binding:
//! - turns off auto-rename so the name survives the edit
//! - leaves it alone and reports it if a font is missing
//! - writes the placeholder and reports it if the key has no value
//! - otherwise flattens its font to the first character's and writes the value
//!
//! Layers are processed as separate tasks in a `JoinSet`; `synchronize`
//! returns only after every task and every report write has finished.

use crate::config::SyncConfig;
use crate::document::{page_name, Document, NodeId};
use crate::error::{SyncError, SyncResult};
use crate::mapping::DataMapping;
use crate::report::{create_report, Anomaly, AnomalyKind, ReportHandle};
use crate::writer::{ReportSender, ReportWriter, WRITER_CAPACITY};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What happened to one bound layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStatus {
    /// Text replaced with the mapped value
    Replaced,
    /// Font missing; text untouched
    MissingFont,
    /// Key absent; placeholder written
    NotFound,
}

/// Summary of one sync run
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Text layers scanned, the report layer included
    pub scanned: usize,
    /// Layers whose name is not a binding, plus the report layer
    pub skipped: usize,
    /// Layers given their mapped value
    pub replaced: usize,
    /// Layers left untouched because of a missing font
    pub missing_font: usize,
    /// Layers whose key had no value
    pub not_found: usize,
    /// Layers whose processing hit a host error
    pub failed: usize,
    /// Anomalies written to the report, in write order
    pub anomalies: Vec<Anomaly>,
    /// Report layer of this run
    pub report: ReportHandle,
    /// Wall time of the run
    pub duration: Duration,
}

impl SyncOutcome {
    fn new(report: ReportHandle) -> Self {
        Self {
            scanned: 0,
            skipped: 0,
            replaced: 0,
            missing_font: 0,
            not_found: 0,
            failed: 0,
            anomalies: Vec::new(),
            report,
            duration: Duration::ZERO,
        }
    }

    fn record(&mut self, status: ElementStatus) {
        match status {
            ElementStatus::Replaced => self.replaced += 1,
            ElementStatus::MissingFont => self.missing_font += 1,
            ElementStatus::NotFound => self.not_found += 1,
        }
    }

    /// Bound layers processed (skipped layers excluded)
    #[inline]
    #[must_use]
    pub fn bound(&self) -> usize {
        self.replaced + self.missing_font + self.not_found + self.failed
    }

    /// Check if every bound layer got its value
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_font == 0 && self.not_found == 0 && self.failed == 0
    }
}

/// Drives syncs against one document
#[derive(Debug)]
pub struct Synchronizer<D> {
    doc: Arc<D>,
    config: Arc<SyncConfig>,
}

impl<D: Document + 'static> Synchronizer<D> {
    /// Create a synchronizer
    #[must_use]
    pub fn new(doc: Arc<D>, config: SyncConfig) -> Self {
        Self {
            doc,
            config: Arc::new(config),
        }
    }

    /// Document being synced
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Arc<D> {
        &self.doc
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reset the report layer for a new run
    ///
    /// # Errors
    /// Propagates host failures
    pub async fn create_report(&self) -> SyncResult<ReportHandle> {
        create_report(self.doc.as_ref(), &self.config.report).await
    }

    /// Run a full sync: fresh report, then every bound layer
    ///
    /// # Errors
    /// Host failures while creating the report or listing layers, and report
    /// write failures. Per-layer failures are counted, not returned.
    pub async fn synchronize(&self, data: &DataMapping) -> SyncResult<SyncOutcome> {
        let report = self.create_report().await?;
        self.synchronize_into(&report, data).await
    }

    /// Sync every bound layer, reporting into an existing report layer
    ///
    /// # Errors
    /// Same as [`Synchronizer::synchronize`], minus report creation
    pub async fn synchronize_into(
        &self,
        report: &ReportHandle,
        data: &DataMapping,
    ) -> SyncResult<SyncOutcome> {
        let start = Instant::now();
        let data = Arc::new(data.clone());
        let writer = ReportWriter::spawn(Arc::clone(&self.doc), report.clone(), WRITER_CAPACITY);
        let limiter = self
            .config
            .max_concurrent_elements
            .map(|max| Arc::new(Semaphore::new(max)));

        let mut outcome = SyncOutcome::new(report.clone());
        let mut tasks = JoinSet::new();

        let nodes = self.doc.find_text_nodes().await?;
        outcome.scanned = nodes.len();
        tracing::info!("Syncing {} text layers against {} keys", nodes.len(), data.len());

        for node in nodes {
            if node == report.node() {
                outcome.skipped += 1;
                continue;
            }

            let name = match self.doc.name(node).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("Could not read name of layer {}: {}", node, e);
                    outcome.failed += 1;
                    continue;
                }
            };

            if !self.config.binding.is_variable(&name) {
                tracing::debug!("Skipping {}: not a binding", name);
                outcome.skipped += 1;
                continue;
            }

            let permit = match &limiter {
                Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
                None => None,
            };
            let task = ElementTask {
                doc: Arc::clone(&self.doc),
                data: Arc::clone(&data),
                config: Arc::clone(&self.config),
                report: writer.sender(),
                node,
                name,
            };
            tasks.spawn(async move {
                let _permit = permit;
                task.run().await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(status))) => outcome.record(status),
                Ok((name, Err(e))) => {
                    tracing::warn!("Failed to sync {}: {}", name, e);
                    outcome.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Layer task cancelled: {}", e);
                    outcome.failed += 1;
                }
            }
        }

        outcome.anomalies = writer.finish().await?;
        outcome.duration = start.elapsed();

        tracing::info!(
            "Sync finished: {} replaced, {} missing font, {} not found, {} failed",
            outcome.replaced,
            outcome.missing_font,
            outcome.not_found,
            outcome.failed
        );
        Ok(outcome)
    }
}

/// Work for one bound layer
struct ElementTask<D> {
    doc: Arc<D>,
    data: Arc<DataMapping>,
    config: Arc<SyncConfig>,
    report: ReportSender,
    node: NodeId,
    name: String,
}

impl<D: Document + 'static> ElementTask<D> {
    /// Process the layer in its own task so a panic is reported against
    /// the layer name
    async fn run(self) -> (String, SyncResult<ElementStatus>) {
        let name = self.name.clone();
        let result = match tokio::spawn(async move { self.process().await }).await {
            Ok(result) => result,
            Err(e) => Err(SyncError::TaskFailed(e.to_string())),
        };
        (name, result)
    }

    async fn process(&self) -> SyncResult<ElementStatus> {
        let doc = self.doc.as_ref();
        doc.set_auto_rename(self.node, false).await?;

        let page = page_name(doc, self.node).await?;
        let page_label = page
            .as_deref()
            .unwrap_or(self.config.report.unknown_page_label.as_str())
            .to_string();

        if doc.has_missing_font(self.node).await? {
            tracing::info!("Node has missing font. Not replacing: {} > {}", page_label, self.name);
            self.report
                .record(Anomaly::new(page, self.name.clone(), AnomalyKind::MissingFont))
                .await?;
            return Ok(ElementStatus::MissingFont);
        }

        tracing::info!("Replacing text: {} > {}", page_label, self.name);
        let value = self
            .config
            .binding
            .extract_key(&self.name)
            .and_then(|key| self.data.resolve(key, self.config.empty_values));

        let Some(value) = value else {
            tracing::warn!("{} not in data source", self.name);
            self.load_fonts().await?;
            doc.set_characters(self.node, &self.config.placeholder_text)
                .await?;
            self.report
                .record(Anomaly::new(page, self.name.clone(), AnomalyKind::NotInAirtable))
                .await?;
            return Ok(ElementStatus::NotFound);
        };

        self.load_fonts().await?;
        let original = doc.characters(self.node).await?;
        let len = original.chars().count();
        if len > 0 {
            let first = match doc.range_font_name(self.node, 0, 1).await? {
                Some(font) => font,
                None => doc.font_name(self.node).await?,
            };
            doc.set_range_font_name(self.node, 0, len, &first).await?;
        }

        tracing::debug!("  Original: {:?}, New: {:?}", original, value);
        doc.set_characters(self.node, value).await?;
        Ok(ElementStatus::Replaced)
    }

    async fn load_fonts(&self) -> SyncResult<()> {
        for font in self.doc.fonts(self.node).await? {
            self.doc.load_font(&font).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FontName, MemoryDocument};
    use pretty_assertions::assert_eq;

    fn setup(names: &[(&str, &str)]) -> (Arc<MemoryDocument>, Vec<NodeId>) {
        let doc = MemoryDocument::new();
        let page = doc.add_page("Home");
        let ids = names
            .iter()
            .map(|(name, text)| doc.add_text(page, name, text, FontName::default()).unwrap())
            .collect();
        (Arc::new(doc), ids)
    }

    #[tokio::test]
    async fn outcome_counts() {
        let (doc, _) = setup(&[
            ("{{greeting}}", "x"),
            ("{{farewell}}", "y"),
            ("Plain", "z"),
        ]);

        let data: DataMapping = [("greeting", "Hello")].into_iter().collect();
        let sync = Synchronizer::new(Arc::clone(&doc), SyncConfig::default());
        let outcome = sync.synchronize(&data).await.unwrap();

        // The fresh report layer is scanned and skipped too.
        assert_eq!(outcome.scanned, 4);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.replaced, 1);
        assert_eq!(outcome.not_found, 1);
        assert_eq!(outcome.bound(), 2);
        assert!(!outcome.is_clean());
        assert_eq!(outcome.anomalies.len(), 1);
    }

    #[tokio::test]
    async fn report_layer_is_never_synced() {
        let (doc, _) = setup(&[("{{greeting}}", "x")]);
        let data: DataMapping = [("greeting", "Hello")].into_iter().collect();
        let sync = Synchronizer::new(Arc::clone(&doc), SyncConfig::default());

        sync.synchronize(&data).await.unwrap();
        let outcome = sync.synchronize(&data).await.unwrap();

        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn unavailable_font_in_any_run_is_missing() {
        let (doc, ids) = setup(&[("{{greeting}}", "x")]);
        let bold = FontName::new("Inter", "Bold");
        doc.load_font(&bold).await.unwrap();
        doc.load_font(&FontName::default()).await.unwrap();
        doc.set_range_font_name(ids[0], 0, 1, &bold).await.unwrap();
        doc.mark_font_unavailable(bold);

        let data: DataMapping = [("greeting", "Hello")].into_iter().collect();
        let outcome = Synchronizer::new(Arc::clone(&doc), SyncConfig::default())
            .synchronize(&data)
            .await
            .unwrap();

        assert_eq!(outcome.missing_font, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(doc.characters(ids[0]).await.unwrap(), "x");
    }
}
