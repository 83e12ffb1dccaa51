//! Error types for validation operations

use crate::rov::status::Source;
use crate::snapshot::SnapshotKey;
use thiserror::Error;

/// Errors that can occur while loading or querying the validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RovError {
    /// The query prefix is not a canonical CIDR prefix
    #[error("Invalid prefix '{input}': {reason}")]
    InvalidPrefix {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// The query ASN is not a number
    #[error("Invalid ASN '{0}'")]
    InvalidAsn(String),

    /// The snapshot selector is not a calendar date
    #[error("Invalid snapshot date '{0}' (expected YYYY/MM/DD)")]
    InvalidSnapshot(String),

    /// An archived RPKI snapshot was requested but never loaded
    ///
    /// There is no fallback to the latest load: that would report today's
    /// state as the historical one.
    #[error("RPKI snapshot {0} is not loaded")]
    SnapshotNotLoaded(SnapshotKey),

    /// One or more sources never built an index
    #[error("Databases not fully loaded, missing: {}", format_sources(.missing))]
    LoadIncomplete {
        /// Sources with no index
        missing: Vec<Source>,
    },
}

impl RovError {
    /// Whether this error was caused by malformed query input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RovError::InvalidPrefix { .. } | RovError::InvalidAsn(_) | RovError::InvalidSnapshot(_)
        )
    }
}

fn format_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
