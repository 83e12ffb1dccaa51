//! RIR delegated-resource status for prefixes and ASNs
//!
//! Unlike the IRR and RPKI sources, delegated data says nothing about who
//! may originate a prefix. The resolver only reports the raw allocation
//! status of the prefix and of the ASN, independently of each other.

pub mod asn;

pub use asn::{AsnAllocation, AsnIndex};

use crate::prefix::{Prefix, PrefixIndex};
use crate::records::DelegatedPrefixRecord;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Index of delegated address blocks
pub type DelegatedPrefixIndex = PrefixIndex<DelegatedPrefixRecord>;

/// Statuses that mark a resource as never validly originated
pub const BOGON_STATUSES: &[&str] = &["reserved", "available"];

/// Whether a raw delegated status marks a bogon resource
pub fn is_bogon_status(status: &str) -> bool {
    BOGON_STATUSES
        .iter()
        .any(|bogon| bogon.eq_ignore_ascii_case(status))
}

/// Resolves allocation status against the delegated prefix and ASN tables.
///
/// Each table is published independently and replaced by swapping its
/// reference, so a lookup sees either the previous table or the new one in
/// full.
#[derive(Debug, Default)]
pub struct DelegatedResolver {
    prefixes: ArcSwapOption<DelegatedPrefixIndex>,
    asns: ArcSwapOption<AsnIndex>,
}

impl DelegatedResolver {
    /// Create a resolver with no tables loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new prefix table
    pub fn replace_prefixes(&self, index: DelegatedPrefixIndex) {
        self.prefixes.store(Some(Arc::new(index)));
    }

    /// Publish a new ASN table
    pub fn replace_asns(&self, index: AsnIndex) {
        self.asns.store(Some(Arc::new(index)));
    }

    /// Allocation record of the most specific delegated block covering `prefix`.
    ///
    /// When a block is listed more than once, the latest-dated entry wins.
    pub fn prefix_status(&self, prefix: &Prefix) -> Option<DelegatedPrefixRecord> {
        let guard = self.prefixes.load();
        let index = Option::as_ref(&guard)?;
        index.most_specific(prefix).cloned()
    }

    /// Allocation status of `asn`
    pub fn asn_status(&self, asn: u32) -> Option<AsnAllocation> {
        let guard = self.asns.load();
        let index = Option::as_ref(&guard)?;
        index.get(asn).cloned()
    }

    /// Current prefix table, if one was loaded
    pub fn prefixes(&self) -> Option<Arc<DelegatedPrefixIndex>> {
        self.prefixes.load_full()
    }

    /// Current ASN table, if one was loaded
    pub fn asns(&self) -> Option<Arc<AsnIndex>> {
        self.asns.load_full()
    }
}
