//! Origin validation shared by the IRR and RPKI sources
//!
//! [`classify`] maps a query (prefix, ASN) and the set of records covering
//! the prefix to one of four outcomes. It keeps two kinds of failure apart:
//! the right origin announcing a prefix longer than it is authorized for
//! (`Invalid,more-specific`) and a different origin altogether (`Invalid`).

use crate::prefix::index::IndexedRecord;
use crate::prefix::Prefix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A record that authorizes an origin ASN for a prefix
pub trait OriginRecord: IndexedRecord {
    /// The ASN authorized to originate the prefix
    fn origin_asn(&self) -> u32;

    /// Longest announcement length this record authorizes
    fn authorized_length(&self) -> u8;
}

/// Validation status of a (prefix, ASN) pair against one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteStatus {
    /// No record covers the prefix
    NotFound,
    /// Covering records exist, none for this ASN
    Invalid,
    /// The ASN is authorized for a covering prefix, but not at this length
    #[serde(rename = "Invalid,more-specific")]
    InvalidMoreSpecific,
    /// The ASN is authorized for this prefix at this length
    Valid,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteStatus::NotFound => write!(f, "NotFound"),
            RouteStatus::Invalid => write!(f, "Invalid"),
            RouteStatus::InvalidMoreSpecific => write!(f, "Invalid,more-specific"),
            RouteStatus::Valid => write!(f, "Valid"),
        }
    }
}

/// Outcome of a validation, carrying the deciding record for every status
/// except `NotFound`.
///
/// Serializes as `{"status": ...}` with the payload's fields alongside, so a
/// payload can only appear together with a status that has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Validation<T> {
    /// No covering record
    NotFound,
    /// Covering records exist, none for this ASN; carries the most specific
    /// covering record as reference
    Invalid(T),
    /// Right ASN, prefix too long; carries the most permissive record for the ASN
    #[serde(rename = "Invalid,more-specific")]
    InvalidMoreSpecific(T),
    /// Authorized; carries the record granting it
    Valid(T),
}

impl<T> Validation<T> {
    /// Status without the payload
    pub fn status(&self) -> RouteStatus {
        match self {
            Validation::NotFound => RouteStatus::NotFound,
            Validation::Invalid(_) => RouteStatus::Invalid,
            Validation::InvalidMoreSpecific(_) => RouteStatus::InvalidMoreSpecific,
            Validation::Valid(_) => RouteStatus::Valid,
        }
    }

    /// The deciding record, if any
    pub fn record(&self) -> Option<&T> {
        match self {
            Validation::NotFound => None,
            Validation::Invalid(r) | Validation::InvalidMoreSpecific(r) | Validation::Valid(r) => {
                Some(r)
            }
        }
    }

    /// Whether the status is `Valid`
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    /// Transform the payload, keeping the status
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Validation<U> {
        match self {
            Validation::NotFound => Validation::NotFound,
            Validation::Invalid(r) => Validation::Invalid(f(r)),
            Validation::InvalidMoreSpecific(r) => Validation::InvalidMoreSpecific(f(r)),
            Validation::Valid(r) => Validation::Valid(f(r)),
        }
    }
}

/// Classify `asn` originating `query` given the records covering `query`.
///
/// `covering` must hold exactly the records whose prefix covers `query`, in
/// least-to-most specific order, as returned by
/// [`PrefixIndex::covering`](crate::prefix::PrefixIndex::covering).
///
/// 1. No covering record: `NotFound`.
/// 2. Among records for `asn`, take the one with the greatest authorized
///    length (ties go to the more specific prefix, then the greatest record
///    by `Ord`). `Valid` if the query is no longer than that, else
///    `Invalid,more-specific`.
/// 3. No record for `asn`: `Invalid`, referencing the most specific covering
///    record (ties go to the greatest record by `Ord`).
///
/// The result depends only on the set of covering records, never on their
/// order in `covering`.
///
/// # Examples
///
/// ```
/// use rov::classify::{classify, RouteStatus};
/// use rov::records::IrrRecord;
///
/// let route = IrrRecord::new("8.8.8.0/24".parse().unwrap(), 15169, "Google", "RADB");
/// let covering = vec![&route];
///
/// let exact = classify(&"8.8.8.0/24".parse().unwrap(), 15169, &covering);
/// assert_eq!(exact.status(), RouteStatus::Valid);
///
/// let longer = classify(&"8.8.8.0/25".parse().unwrap(), 15169, &covering);
/// assert_eq!(longer.status(), RouteStatus::InvalidMoreSpecific);
///
/// let other = classify(&"8.8.8.0/24".parse().unwrap(), 64500, &covering);
/// assert_eq!(other.status(), RouteStatus::Invalid);
/// ```
pub fn classify<'a, R: OriginRecord + Ord>(
    query: &Prefix,
    asn: u32,
    covering: &[&'a R],
) -> Validation<&'a R> {
    if covering.is_empty() {
        return Validation::NotFound;
    }

    // Full records break ties so slice order never decides
    let best = covering
        .iter()
        .copied()
        .filter(|r| r.origin_asn() == asn)
        .max_by(|a, b| {
            (a.authorized_length(), a.prefix().prefix_len())
                .cmp(&(b.authorized_length(), b.prefix().prefix_len()))
                .then_with(|| a.cmp(b))
        });

    if let Some(best) = best {
        if query.prefix_len() <= best.authorized_length() {
            return Validation::Valid(best);
        }
        return Validation::InvalidMoreSpecific(best);
    }

    let reference = covering.iter().copied().max_by(|a, b| {
        a.prefix()
            .prefix_len()
            .cmp(&b.prefix().prefix_len())
            .then_with(|| a.cmp(b))
    });

    match reference {
        Some(reference) => Validation::Invalid(reference),
        None => Validation::NotFound,
    }
}
