//! Result types for validation operations

use crate::classify::{RouteStatus, Validation};
use crate::delegated::{is_bogon_status, AsnAllocation};
use crate::prefix::Prefix;
use crate::records::{DelegatedPrefixRecord, IrrRecord, RpkiRecord};
use crate::rov::query::Query;
use serde::{Deserialize, Serialize};

/// IRR route object that decided a validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrMatch {
    /// Prefix of the route object
    pub prefix: Prefix,
    /// Route object description
    pub descr: String,
    /// Registry holding the route object
    pub source: String,
}

impl From<&IrrRecord> for IrrMatch {
    fn from(rec: &IrrRecord) -> Self {
        Self {
            prefix: rec.prefix,
            descr: rec.descr.clone(),
            source: rec.source.clone(),
        }
    }
}

/// ROA payload that decided a validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpkiMatch {
    /// Prefix of the ROA
    pub prefix: Prefix,
    /// Effective max length of the ROA
    #[serde(rename = "maxLength")]
    pub max_length: u8,
    /// Trust anchor
    pub ta: String,
    /// ROA object URI, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Start of validity, when known
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    /// End of validity, when known
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
}

impl From<&RpkiRecord> for RpkiMatch {
    fn from(rec: &RpkiRecord) -> Self {
        Self {
            prefix: rec.prefix,
            max_length: rec.max_length(),
            ta: rec.trust_anchor.clone(),
            uri: rec.uri.clone(),
            not_before: rec.not_before.clone(),
            not_after: rec.not_after.clone(),
        }
    }
}

/// IRR validation outcome
pub type IrrValidation = Validation<IrrMatch>;

/// RPKI validation outcome
pub type RpkiValidation = Validation<RpkiMatch>;

/// Raw delegated-resource status for the query prefix and ASN
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedStatus {
    /// Most specific delegated block covering the prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<DelegatedPrefixRecord>,
    /// Allocation of the ASN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<AsnAllocation>,
}

impl DelegatedStatus {
    /// Whether either the prefix or the ASN has a bogon status
    pub fn is_bogon(&self) -> bool {
        self.prefix.as_ref().is_some_and(|p| is_bogon_status(&p.status))
            || self.asn.as_ref().is_some_and(|a| is_bogon_status(&a.status))
    }
}

/// Combined result of validating one query.
///
/// The RPKI block reflects the snapshot named in the query, while the IRR
/// and delegated blocks always reflect the current loads.
///
/// # Examples
///
/// ```
/// use rov::{Prefix, Rov};
/// use rov::records::IrrRecord;
///
/// let rov = Rov::new();
/// let prefix: Prefix = "8.8.8.0/24".parse().unwrap();
/// rov.load_irr(vec![IrrRecord::new(prefix, 15169, "Google", "RADB")]);
///
/// let result = rov.check(&prefix, 15169, None).unwrap();
/// let json = serde_json::to_value(&result).unwrap();
/// assert_eq!(json["irr"]["status"], "Valid");
/// assert_eq!(json["irr"]["source"], "RADB");
/// assert_eq!(json["rpki"]["status"], "NotFound");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The query as validated
    pub query: Query,
    /// Outcome against IRR route objects
    pub irr: IrrValidation,
    /// Outcome against RPKI
    pub rpki: RpkiValidation,
    /// Delegated-resource status
    pub delegated: DelegatedStatus,
}

impl ValidationResult {
    /// IRR status
    pub fn irr_status(&self) -> RouteStatus {
        self.irr.status()
    }

    /// RPKI status
    pub fn rpki_status(&self) -> RouteStatus {
        self.rpki.status()
    }
}

/// Raw records covering a prefix in each source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
    /// The looked-up prefix
    pub prefix: Prefix,
    /// Covering IRR route objects, least specific first
    pub irr: Vec<IrrRecord>,
    /// Covering ROA payloads, least specific first
    pub rpki: Vec<RpkiRecord>,
    /// Most specific covering delegated block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated: Option<DelegatedPrefixRecord>,
}
