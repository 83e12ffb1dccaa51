//! rov - Offline route origin validation
//!
//! This library answers whether a (prefix, origin ASN) announcement is
//! authorized by IRR route objects and RPKI, and reports the RIR
//! delegation status of the prefix and ASN. Historical RPKI days can be
//! loaded and queried by date.

pub mod classify;
pub mod delegated;
pub mod feed;
pub mod prefix;
pub mod records;
pub mod rov;
pub mod snapshot;

// Re-export core types for library users
pub use classify::{RouteStatus, Validation};
pub use feed::{load_dir, FeedError, Feeds};
pub use prefix::{Family, Prefix, PrefixIndex};
pub use rov::{
    LoadReport, LoadStatus, Lookup, Query, Rov, RovConfig, RovConfigBuilder, RovError, Source,
    ValidationResult,
};
pub use snapshot::SnapshotKey;
