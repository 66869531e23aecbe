//! Binding names
//!
//! A text layer takes part in a sync when its name wraps a variable key in a
//! delimiter pair, e.g. `{{headline}}`. [`BindingSyntax`] holds the pair and
//! the compiled pattern; [`is_variable`] and [`extract_key`] use the default
//! `{{` / `}}` pair.

use crate::error::SyncError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default opening delimiter
pub const DEFAULT_OPEN: &str = "{{";
/// Default closing delimiter
pub const DEFAULT_CLOSE: &str = "}}";

static DEFAULT_SYNTAX: Lazy<BindingSyntax> = Lazy::new(BindingSyntax::default);

/// Delimiter pair as it appears in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    /// Opening delimiter
    pub open: String,
    /// Closing delimiter
    pub close: String,
}

/// Compiled binding syntax
///
/// Spaces and tabs just inside the delimiters are ignored. The key must be
/// non-empty, on one line, and must not contain either delimiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Delimiters", into = "Delimiters")]
pub struct BindingSyntax {
    open: String,
    close: String,
    pattern: Regex,
}

impl BindingSyntax {
    /// Build a syntax from a delimiter pair
    ///
    /// # Errors
    /// - `SyncError::InvalidBinding` if either delimiter is blank
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, SyncError> {
        let open = open.into();
        let close = close.into();

        if open.trim().is_empty() || close.trim().is_empty() {
            return Err(SyncError::InvalidBinding(format!(
                "delimiters must not be blank (open: {open:?}, close: {close:?})"
            )));
        }

        Ok(Self {
            pattern: compile(&open, &close),
            open,
            close,
        })
    }

    /// Opening delimiter
    #[inline]
    #[must_use]
    pub fn open(&self) -> &str {
        &self.open
    }

    /// Closing delimiter
    #[inline]
    #[must_use]
    pub fn close(&self) -> &str {
        &self.close
    }

    /// Check if a layer name is a binding name
    #[must_use]
    pub fn is_variable(&self, name: &str) -> bool {
        self.extract_key(name).is_some()
    }

    /// Variable key inside a binding name
    ///
    /// Returns `None` for names that are not bindings.
    #[must_use]
    pub fn extract_key<'a>(&self, name: &'a str) -> Option<&'a str> {
        let key = self.pattern.captures(name)?.name("key")?.as_str();
        if key.contains(self.open.as_str()) || key.contains(self.close.as_str()) {
            return None;
        }
        Some(key)
    }

    /// Wrap a key in this syntax's delimiters
    #[must_use]
    pub fn wrap(&self, key: &str) -> String {
        format!("{}{}{}", self.open, key, self.close)
    }
}

impl Default for BindingSyntax {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
            pattern: compile(DEFAULT_OPEN, DEFAULT_CLOSE),
        }
    }
}

impl PartialEq for BindingSyntax {
    fn eq(&self, other: &Self) -> bool {
        self.open == other.open && self.close == other.close
    }
}

impl Eq for BindingSyntax {}

impl TryFrom<Delimiters> for BindingSyntax {
    type Error = SyncError;

    fn try_from(value: Delimiters) -> Result<Self, Self::Error> {
        Self::new(value.open, value.close)
    }
}

impl From<BindingSyntax> for Delimiters {
    fn from(value: BindingSyntax) -> Self {
        Self {
            open: value.open,
            close: value.close,
        }
    }
}

fn compile(open: &str, close: &str) -> Regex {
    let pattern = format!(
        r"^{}[ \t]*(?P<key>\S(?:.*?\S)?)[ \t]*{}$",
        regex::escape(open),
        regex::escape(close)
    );
    Regex::new(&pattern).expect("escaped delimiters always form a valid pattern")
}

/// Check a name against the default `{{key}}` syntax
#[must_use]
pub fn is_variable(name: &str) -> bool {
    DEFAULT_SYNTAX.is_variable(name)
}

/// Extract the key from a default-syntax binding name
#[must_use]
pub fn extract_key(name: &str) -> Option<&str> {
    DEFAULT_SYNTAX.extract_key(name)
}
