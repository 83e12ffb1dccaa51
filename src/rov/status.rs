//! Load bookkeeping: which sources are loaded and how much they hold

use crate::snapshot::SnapshotKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A data source feeding the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// IRR route objects
    Irr,
    /// Current RPKI validated ROA payloads
    Rpki,
    /// RIR delegated address blocks
    DelegatedPrefix,
    /// RIR delegated ASN blocks
    DelegatedAsn,
}

impl Source {
    /// All sources, in reporting order
    pub const ALL: [Source; 4] = [
        Source::Irr,
        Source::Rpki,
        Source::DelegatedPrefix,
        Source::DelegatedAsn,
    ];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Irr => write!(f, "irr"),
            Source::Rpki => write!(f, "rpki"),
            Source::DelegatedPrefix => write!(f, "delegated-prefix"),
            Source::DelegatedAsn => write!(f, "delegated-asn"),
        }
    }
}

/// State of one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Which source
    pub source: Source,
    /// Number of records in the current index, `None` if never loaded
    pub records: Option<usize>,
}

impl SourceStatus {
    /// Whether an index exists for this source
    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }
}

/// Snapshot of what the validator currently has loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStatus {
    /// One entry per source, in [`Source::ALL`] order
    pub sources: Vec<SourceStatus>,
    /// Archived RPKI days, oldest first
    pub snapshots: Vec<SnapshotKey>,
}

impl LoadStatus {
    /// Sources that were never loaded
    pub fn missing(&self) -> Vec<Source> {
        self.sources
            .iter()
            .filter(|s| !s.is_loaded())
            .map(|s| s.source)
            .collect()
    }

    /// Whether every source has an index
    pub fn is_complete(&self) -> bool {
        self.sources.iter().all(SourceStatus::is_loaded)
    }

    /// Status for one source
    pub fn get(&self, source: Source) -> Option<&SourceStatus> {
        self.sources.iter().find(|s| s.source == source)
    }
}

/// What a call to [`Rov::load_databases`](crate::Rov::load_databases) did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Sources rebuilt, with their record counts
    pub loaded: Vec<(Source, usize)>,
    /// Archived days added
    pub snapshots_added: Vec<SnapshotKey>,
    /// Archived days skipped because they were already loaded
    pub snapshots_skipped: Vec<SnapshotKey>,
    /// Wall time spent building indices
    pub elapsed: Duration,
}

impl LoadReport {
    /// Records loaded for `source` by this call, if it was rebuilt
    pub fn records(&self, source: Source) -> Option<usize> {
        self.loaded
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, n)| *n)
    }
}
