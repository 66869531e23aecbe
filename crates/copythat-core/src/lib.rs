//! copythat core - copy sync for design documents
//!
//! Fills text layers from a key-value data source:
//! - Layers named like `{{key}}` are bindings
//! - Bound layers get the mapped value, set in their first character's font
//! - Layers with missing fonts or unknown keys are listed in a report layer
//!
//! # Example
//!
//! ```rust,ignore
//! use copythat_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = MemoryDocument::new();
//! let page = doc.add_page("Home");
//! doc.add_text(page, "{{greeting}}", "placeholder", FontName::default())?;
//!
//! let data = DataMapping::from_json_str(r#"{"greeting": "Hello"}"#)?;
//! let sync = Synchronizer::new(Arc::new(doc), SyncConfig::new());
//! let outcome = sync.synchronize(&data).await?;
//!
//! println!("Replaced {} layers", outcome.replaced);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod binding;
pub mod config;
pub mod document;
pub mod error;
pub mod mapping;
pub mod report;
pub mod synchronizer;
pub mod writer;

// Re-exports for convenience
pub use binding::{extract_key, is_variable, BindingSyntax, Delimiters};
pub use config::{
    EmptyValuePolicy, ReportConfig, SyncConfig, PLACEHOLDER_TEXT, REPORT_NODE_NAME, REPORT_TITLE,
    UNKNOWN_PAGE_LABEL,
};
pub use document::{
    page_name, Document, DocumentSnapshot, FontName, MemoryDocument, NodeId, NodeKind,
    NodeSnapshot, PageSnapshot, TextSnapshot,
};
pub use error::{DocumentError, SyncError, SyncResult};
pub use mapping::DataMapping;
pub use report::{create_report, create_report_at, find_report, Anomaly, AnomalyKind, ReportHandle};
pub use synchronizer::{ElementStatus, SyncOutcome, Synchronizer};
pub use writer::{ReportSender, ReportWriter};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with copythat core
    pub use crate::{
        AnomalyKind, DataMapping, Document, FontName, MemoryDocument, NodeId, ReportHandle,
        SyncConfig, SyncError, SyncOutcome, Synchronizer,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
