//! Patient identifier canonicalisation.
//!
//! Registers and tracked tables disagree on how an NHS number is stored: the spreadsheet holds
//! formatted text such as `943 476 5919`, while a Notion number property arrives as the float
//! `9434765919.0`. Both must reduce to the same key before comparison.
//!
//! Policy:
//! - text: every whitespace character is removed, then compared exactly (case-sensitive)
//! - number: integral values render without a fractional part, others via their display form
//! - bool: `true` / `false`
//! - empty cells, and text that is empty once whitespace is removed, have no key
//!
//! A row without a key can never match a tracked row.

use crate::table::{format_number, Scalar};
use std::fmt;

/// Canonical identifier used for set membership.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentifierKey(String);

impl IdentifierKey {
    /// Canonicalises a cell, returning `None` when the cell carries no identifier.
    pub fn from_scalar(value: &Scalar) -> Option<Self> {
        let key = match value {
            Scalar::Text(s) => s.chars().filter(|c| !c.is_whitespace()).collect(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Empty => return None,
        };

        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
