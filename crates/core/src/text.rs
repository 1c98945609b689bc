//! Opaque display text.
//!
//! Navigation code never interprets displayed strings; it only carries these
//! tokens to the host, which resolves them through its translation service.

use serde::{Deserialize, Serialize};

/// A displayable string token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Text {
    /// Translation key with positional parameters.
    Key {
        /// Translation key
        key: String,
        /// Positional parameters
        params: Vec<String>,
    },
    /// Literal text shown as-is.
    Raw(String),
}

impl Text {
    /// A translation key without parameters.
    pub fn key(key: impl Into<String>) -> Self {
        Text::Key {
            key: key.into(),
            params: Vec::new(),
        }
    }

    /// A translation key with positional parameters.
    pub fn key_with(key: impl Into<String>, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Text::Key {
            key: key.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Literal text.
    pub fn raw(text: impl Into<String>) -> Self {
        Text::Raw(text.into())
    }
}

impl From<&str> for Text {
    fn from(key: &str) -> Self {
        Text::key(key)
    }
}
