//! Sync configuration
//!
//! Every field has a default matching the plugin's stock behaviour, so a
//! TOML file only needs the settings it changes.

use crate::binding::BindingSyntax;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reserved name of the report text layer
pub const REPORT_NODE_NAME: &str = "copyThat.airtable.sync.report";

/// Title at the start of the report header
pub const REPORT_TITLE: &str = "{{copyThat.airtable}}";

/// Text written into layers whose key has no value
pub const PLACEHOLDER_TEXT: &str = "!! This string isn't in Airtable";

/// Page label for layers that are not inside any page
pub const UNKNOWN_PAGE_LABEL: &str = "(no page)";

/// How an empty mapped value is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValuePolicy {
    /// Empty strings count as absent keys
    #[default]
    TreatAsMissing,
    /// Empty strings replace the layer text
    Replace,
}

/// Report layer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Reserved layer name
    pub node_name: String,
    /// Header title
    pub title: String,
    /// Header date format (chrono strftime)
    pub date_format: String,
    /// Header time format (chrono strftime)
    pub time_format: String,
    /// Page label for layers outside any page
    pub unknown_page_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            node_name: REPORT_NODE_NAME.to_string(),
            title: REPORT_TITLE.to_string(),
            date_format: "%-d %b %Y".to_string(),
            time_format: "%H:%M".to_string(),
            unknown_page_label: UNKNOWN_PAGE_LABEL.to_string(),
        }
    }
}

/// Sync settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Binding name delimiters
    pub binding: BindingSyntax,
    /// Treatment of empty mapped values
    pub empty_values: EmptyValuePolicy,
    /// Text for layers whose key is absent
    pub placeholder_text: String,
    /// Cap on element tasks in flight (`None` = unbounded)
    pub max_concurrent_elements: Option<usize>,
    /// Report layer settings
    pub report: ReportConfig,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML configuration
    ///
    /// # Errors
    /// - `SyncError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(toml: &str) -> Result<Self, SyncError> {
        let config: Self = toml::from_str(toml).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file
    ///
    /// # Errors
    /// - `SyncError::Config` if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Check values serde cannot check
    ///
    /// # Errors
    /// - `SyncError::Config` on a zero concurrency cap or blank report name
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_concurrent_elements == Some(0) {
            return Err(SyncError::Config(
                "max_concurrent_elements must be at least 1".to_string(),
            ));
        }
        if self.report.node_name.trim().is_empty() {
            return Err(SyncError::Config("report.node_name must not be blank".to_string()));
        }
        Ok(())
    }

    /// With binding syntax
    #[inline]
    #[must_use]
    pub fn with_binding(mut self, binding: BindingSyntax) -> Self {
        self.binding = binding;
        self
    }

    /// With empty value policy
    #[inline]
    #[must_use]
    pub fn with_empty_values(mut self, policy: EmptyValuePolicy) -> Self {
        self.empty_values = policy;
        self
    }

    /// With placeholder text
    #[inline]
    #[must_use]
    pub fn with_placeholder_text(mut self, text: impl Into<String>) -> Self {
        self.placeholder_text = text.into();
        self
    }

    /// With concurrency cap
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_elements(mut self, max: usize) -> Self {
        self.max_concurrent_elements = Some(max);
        self
    }

    /// With report settings
    #[inline]
    #[must_use]
    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            binding: BindingSyntax::default(),
            empty_values: EmptyValuePolicy::default(),
            placeholder_text: PLACEHOLDER_TEXT.to_string(),
            max_concurrent_elements: None,
            report: ReportConfig::default(),
        }
    }
}
