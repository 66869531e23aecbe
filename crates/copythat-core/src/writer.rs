//! Serialized report writer
//!
//! Appending reads the whole report text and writes it back, so two appends
//! racing each other lose a line. Element tasks therefore never touch the
//! report; they send [`Anomaly`] records to a single writer task that applies
//! them one at a time, in arrival order.

use crate::document::Document;
use crate::error::{SyncError, SyncResult};
use crate::report::{Anomaly, ReportHandle};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel depth between element tasks and the writer
pub const WRITER_CAPACITY: usize = 64;

/// Sending side handed to element tasks
#[derive(Debug, Clone)]
pub struct ReportSender {
    sender: mpsc::Sender<Anomaly>,
}

impl ReportSender {
    /// Queue an anomaly for the report
    ///
    /// # Errors
    /// - `SyncError::WriterClosed` if the writer task has stopped
    pub async fn record(&self, anomaly: Anomaly) -> SyncResult<()> {
        self.sender
            .send(anomaly)
            .await
            .map_err(|_| SyncError::WriterClosed)
    }
}

/// Writer task plus its sending side
#[derive(Debug)]
pub struct ReportWriter {
    sender: ReportSender,
    task: JoinHandle<SyncResult<Vec<Anomaly>>>,
}

impl ReportWriter {
    /// Start a writer appending to `report`
    pub fn spawn<D>(doc: Arc<D>, report: ReportHandle, capacity: usize) -> Self
    where
        D: Document + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(run(doc, report, receiver));
        Self {
            sender: ReportSender { sender },
            task,
        }
    }

    /// New sender for an element task
    #[must_use]
    pub fn sender(&self) -> ReportSender {
        self.sender.clone()
    }

    /// Wait until every queued anomaly is written
    ///
    /// Returns the anomalies in the order they were written. All senders
    /// handed out must be dropped first, or this waits forever.
    ///
    /// # Errors
    /// - The first append failure, after the queue has drained
    /// - `SyncError::WriterClosed` if the writer task panicked
    pub async fn finish(self) -> SyncResult<Vec<Anomaly>> {
        drop(self.sender);
        self.task.await.map_err(|_| SyncError::WriterClosed)?
    }
}

async fn run<D>(
    doc: Arc<D>,
    report: ReportHandle,
    mut receiver: mpsc::Receiver<Anomaly>,
) -> SyncResult<Vec<Anomaly>>
where
    D: Document + 'static,
{
    let mut written = Vec::new();
    let mut first_error = None;

    while let Some(anomaly) = receiver.recv().await {
        match report.append(doc.as_ref(), &anomaly).await {
            Ok(()) => written.push(anomaly),
            Err(e) => {
                tracing::warn!("Could not add {} for {} to report: {}", anomaly.kind, anomaly.element, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::document::MemoryDocument;
    use crate::report::{create_report, AnomalyKind};

    #[tokio::test]
    async fn concurrent_records_are_all_written() {
        let doc = Arc::new(MemoryDocument::new().with_yield_on_edit(true));
        doc.add_page("Home");
        let report = create_report(doc.as_ref(), &ReportConfig::default())
            .await
            .unwrap();

        let writer = ReportWriter::spawn(Arc::clone(&doc), report.clone(), 4);
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..50 {
            let sender = writer.sender();
            tasks.spawn(async move {
                sender
                    .record(Anomaly::new(
                        Some("Home".into()),
                        format!("{{{{key{i}}}}}"),
                        AnomalyKind::NotInAirtable,
                    ))
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let written = writer.finish().await.unwrap();
        assert_eq!(written.len(), 50);
        assert_eq!(report.lines(doc.as_ref()).await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn missing_report_surfaces_on_finish() {
        let doc = Arc::new(MemoryDocument::new());
        doc.add_page("Home");
        let report = create_report(doc.as_ref(), &ReportConfig::default())
            .await
            .unwrap();
        doc.remove(report.node()).await.unwrap();

        let writer = ReportWriter::spawn(Arc::clone(&doc), report, WRITER_CAPACITY);
        writer
            .sender()
            .record(Anomaly::new(None, "x", AnomalyKind::MissingFont))
            .await
            .unwrap();

        assert!(matches!(
            writer.finish().await,
            Err(SyncError::ReportMissing(_))
        ));
    }
}
