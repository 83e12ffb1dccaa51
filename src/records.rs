//! Normalized input records for each data source
//!
//! These are the already-parsed, well-formed records handed over by the
//! normalization step. Field names follow the JSON feed contract.

use crate::classify::OriginRecord;
use crate::prefix::index::IndexedRecord;
use crate::prefix::Prefix;
use serde::{Deserialize, Serialize};

/// An IRR route object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrrRecord {
    /// Announced prefix (`route:` / `route6:`)
    pub prefix: Prefix,
    /// Origin ASN (`origin:`)
    pub origin_asn: u32,
    /// Free-text description (`descr:`), possibly multi-line
    #[serde(default)]
    pub descr: String,
    /// Registry the object came from (e.g., "RADB")
    #[serde(default)]
    pub source: String,
}

impl IrrRecord {
    /// Create a route object
    pub fn new(
        prefix: Prefix,
        origin_asn: u32,
        descr: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            prefix,
            origin_asn,
            descr: descr.into(),
            source: source.into(),
        }
    }
}

impl IndexedRecord for IrrRecord {
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
}

impl OriginRecord for IrrRecord {
    fn origin_asn(&self) -> u32 {
        self.origin_asn
    }

    /// IRR carries no max length, so only the exact prefix is authorized
    fn authorized_length(&self) -> u8 {
        self.prefix.prefix_len()
    }
}

/// A validated ROA payload
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RpkiRecord {
    /// Authorized prefix
    pub prefix: Prefix,
    /// Authorized origin ASN
    #[serde(alias = "asn")]
    pub origin_asn: u32,
    /// Longest announcement length allowed; the prefix length when absent
    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u8>,
    /// Trust anchor the ROA chains to (e.g., "ripencc")
    #[serde(alias = "ta", default)]
    pub trust_anchor: String,
    /// Repository URI of the ROA object, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Start of the ROA validity window, when known
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    /// End of the ROA validity window, when known
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
}

impl RpkiRecord {
    /// Create a VRP without archive metadata
    pub fn new(
        prefix: Prefix,
        origin_asn: u32,
        max_length: Option<u8>,
        trust_anchor: impl Into<String>,
    ) -> Self {
        Self {
            prefix,
            origin_asn,
            max_length,
            trust_anchor: trust_anchor.into(),
            uri: None,
            not_before: None,
            not_after: None,
        }
    }

    /// Attach the ROA object URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Attach the ROA validity window
    pub fn with_validity(mut self, not_before: impl Into<String>, not_after: impl Into<String>) -> Self {
        self.not_before = Some(not_before.into());
        self.not_after = Some(not_after.into());
        self
    }

    /// Effective max length
    pub fn max_length(&self) -> u8 {
        self.max_length.unwrap_or(self.prefix.prefix_len())
    }
}

impl IndexedRecord for RpkiRecord {
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
}

impl OriginRecord for RpkiRecord {
    fn origin_asn(&self) -> u32 {
        self.origin_asn
    }

    fn authorized_length(&self) -> u8 {
        self.max_length()
    }
}

/// An address block from an RIR delegated-stats file.
///
/// Records order by prefix, then date, so among entries for the same block
/// the latest-dated one sorts last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DelegatedPrefixRecord {
    /// Delegated block
    pub prefix: Prefix,
    /// Allocation date as published (YYYYMMDD)
    #[serde(default)]
    pub date: String,
    /// Registry that delegated the block (e.g., "ripencc")
    #[serde(default)]
    pub registry: String,
    /// Allocation status (assigned, allocated, reserved, available, ...)
    pub status: String,
    /// ISO country code, "ZZ" when unknown
    #[serde(default)]
    pub country: String,
}

impl DelegatedPrefixRecord {
    /// Create a delegated block
    pub fn new(
        prefix: Prefix,
        status: impl Into<String>,
        date: impl Into<String>,
        registry: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            prefix,
            date: date.into(),
            registry: registry.into(),
            status: status.into(),
            country: country.into(),
        }
    }
}

impl IndexedRecord for DelegatedPrefixRecord {
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
}

fn one() -> u32 {
    1
}

/// An ASN block from an RIR delegated-stats file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AsnRecord {
    /// First ASN of the block
    pub asn: u32,
    /// Number of consecutive ASNs in the block
    #[serde(default = "one")]
    pub count: u32,
    /// Allocation status
    pub status: String,
    /// Registry that delegated the block
    #[serde(default)]
    pub registry: String,
}

impl AsnRecord {
    /// Create a single-ASN record
    pub fn new(asn: u32, status: impl Into<String>, registry: impl Into<String>) -> Self {
        Self {
            asn,
            count: 1,
            status: status.into(),
            registry: registry.into(),
        }
    }

    /// Extend the record to cover `count` consecutive ASNs
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Last ASN covered by this record (inclusive)
    pub fn last_asn(&self) -> u32 {
        self.asn.saturating_add(self.count.max(1) - 1)
    }
}
