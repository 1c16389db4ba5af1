//! Shared types used across all pipeline stages.
//!
//! Every batch operation (scan, stage, process, apply, revert) reports
//! per-item problems with the same two shapes so the CLI can print one
//! consistent end-of-batch summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One item that failed inside a batch. The batch itself kept going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// What failed: a canonical asset path, a mod id, or an archive directory.
    pub item: String,
    /// Human-readable error detail.
    pub detail: String,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self {
            item: item.into(),
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.detail)
    }
}

/// Expected-but-missing optional input. Informational; never counts as failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub item: String,
    pub message: String,
}

impl Warning {
    pub fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.message)
    }
}
