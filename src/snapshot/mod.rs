//! Dated RPKI snapshots
//!
//! The RPKI source is the only one with history: besides the current load,
//! any number of archived days can be loaded and queried by date. Archived
//! indices are write-once so an answer for a given day never changes.

use crate::prefix::PrefixIndex;
use crate::records::RpkiRecord;
use crate::rov::RovError;
use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Index of validated ROA payloads
pub type RpkiIndex = PrefixIndex<RpkiRecord>;

/// Calendar day identifying an archived RPKI load.
///
/// Displays as `YYYY/MM/DD`; parses `YYYY/MM/DD` or `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotKey(NaiveDate);

impl SnapshotKey {
    /// Key for the given day
    ///
    /// # Errors
    ///
    /// * `RovError::InvalidSnapshot` - if the date does not exist
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, RovError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| RovError::InvalidSnapshot(format!("{year:04}/{month:02}/{day:02}")))
    }

    /// Year
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month (1-12)
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day of month (1-31)
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// The day as a `chrono` date
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `YYYY-MM-DD`, used for archive file names
    pub fn file_stem(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl From<NaiveDate> for SnapshotKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y/%m/%d"))
    }
}

impl FromStr for SnapshotKey {
    type Err = RovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveDate::parse_from_str(trimmed, "%Y/%m/%d")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
            .map(Self)
            .map_err(|_| RovError::InvalidSnapshot(s.to_string()))
    }
}

impl Serialize for SnapshotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SnapshotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Current and archived RPKI indices.
///
/// Both the latest index and the archive map are published by reference
/// swap. Readers pin the `Arc` they resolved and keep using it even if a
/// reload happens mid-query.
#[derive(Debug)]
pub struct TemporalStore {
    latest: ArcSwapOption<RpkiIndex>,
    archive: ArcSwap<BTreeMap<SnapshotKey, Arc<RpkiIndex>>>,
}

impl TemporalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            latest: ArcSwapOption::empty(),
            archive: ArcSwap::from_pointee(BTreeMap::new()),
        }
    }

    /// Publish a fresh current-day index
    pub fn replace_latest(&self, index: RpkiIndex) {
        self.latest.store(Some(Arc::new(index)));
    }

    /// Add an archived index for `key`.
    ///
    /// Returns `false` and leaves the store untouched if `key` is already
    /// loaded.
    pub fn insert_archive(&self, key: SnapshotKey, index: RpkiIndex) -> bool {
        let index = Arc::new(index);
        let mut inserted = false;

        self.archive.rcu(|current| {
            if current.contains_key(&key) {
                inserted = false;
                return Arc::clone(current);
            }
            let mut next = BTreeMap::clone(current);
            next.insert(key, Arc::clone(&index));
            inserted = true;
            Arc::new(next)
        });

        inserted
    }

    /// Drop an archived index. Readers already holding it are unaffected.
    pub fn unload(&self, key: SnapshotKey) -> bool {
        let mut removed = false;

        self.archive.rcu(|current| {
            if !current.contains_key(&key) {
                removed = false;
                return Arc::clone(current);
            }
            let mut next = BTreeMap::clone(current);
            next.remove(&key);
            removed = true;
            Arc::new(next)
        });

        removed
    }

    /// Index to answer a query against.
    ///
    /// `None` selects the latest load, which may itself be absent. A date
    /// selects that archived load only.
    ///
    /// # Errors
    ///
    /// * `RovError::SnapshotNotLoaded` - if `snapshot` names a day that was
    ///   never loaded
    pub fn resolve(&self, snapshot: Option<SnapshotKey>) -> Result<Option<Arc<RpkiIndex>>, RovError> {
        match snapshot {
            None => Ok(self.latest.load_full()),
            Some(key) => self
                .archive
                .load()
                .get(&key)
                .cloned()
                .map(Some)
                .ok_or(RovError::SnapshotNotLoaded(key)),
        }
    }

    /// Latest index, if loaded
    pub fn latest(&self) -> Option<Arc<RpkiIndex>> {
        self.latest.load_full()
    }

    /// Archived days, oldest first
    pub fn snapshots(&self) -> Vec<SnapshotKey> {
        self.archive.load().keys().copied().collect()
    }

    /// Whether `key` is loaded
    pub fn contains(&self, key: SnapshotKey) -> bool {
        self.archive.load().contains_key(&key)
    }
}

impl Default for TemporalStore {
    fn default() -> Self {
        Self::new()
    }
}
