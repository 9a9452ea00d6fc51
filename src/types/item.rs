//! Newtype wrapper for item names.
//!
//! An item's identity is its exact string value. The engine does not enforce
//! uniqueness; two items with the same text are ordinary distinct tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A text item to be ranked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemName(pub String);

impl ItemName {
    pub fn new(s: impl Into<String>) -> Self {
        ItemName(s.into())
    }

    /// Returns the item text as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemName {
    fn from(s: String) -> Self {
        ItemName(s)
    }
}

impl From<&str> for ItemName {
    fn from(s: &str) -> Self {
        ItemName(s.to_string())
    }
}
