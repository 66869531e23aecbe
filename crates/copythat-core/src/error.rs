//! Error types for copythat core
//!
//! Provides error handling for:
//! - Host document operations (missing nodes, unloaded fonts, bad ranges)
//! - Sync orchestration (report lifecycle, writer shutdown, layer task panics)
//! - Configuration and data mapping input

use crate::document::{FontName, NodeId};

/// Errors raised by a [`Document`](crate::document::Document) implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// Node does not exist (never existed or was removed)
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Operation requires a text node
    #[error("node {0} is not a text node")]
    NotText(NodeId),

    /// Text mutation attempted before the node's font was loaded
    #[error("font {font} must be loaded before editing node {node}")]
    FontNotLoaded {
        /// Node being edited
        node: NodeId,
        /// Font that is not loaded yet
        font: FontName,
    },

    /// Font is not installed on this machine
    #[error("font unavailable: {0}")]
    FontUnavailable(FontName),

    /// Character range outside the node's text
    #[error("invalid range {start}..{end} for node {node} with {len} characters")]
    InvalidRange {
        /// Node being addressed
        node: NodeId,
        /// Range start (inclusive)
        start: usize,
        /// Range end (exclusive)
        end: usize,
        /// Character count of the node
        len: usize,
    },

    /// Any other host failure
    #[error("host error: {0}")]
    Host(String),
}

/// Main sync error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Host document failure outside a single element's processing
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Report element was removed while a sync was writing to it
    #[error("report element {0} no longer exists")]
    ReportMissing(NodeId),

    /// Report writer task stopped before all anomalies were recorded
    #[error("report writer closed")]
    WriterClosed,

    /// Binding delimiters cannot form a valid pattern
    #[error("invalid binding syntax: {0}")]
    InvalidBinding(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Data mapping could not be read
    #[error("invalid data mapping: {0}")]
    InvalidMapping(String),

    /// Layer processing panicked
    #[error("layer task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    /// Check if error came from the host document
    #[inline]
    #[must_use]
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::Document(_) | Self::ReportMissing(_))
    }
}

/// Result alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
