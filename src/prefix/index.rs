//! Longest-match index over canonical prefixes
//!
//! Records are stored once, sorted by prefix, and grouped into one slot per
//! distinct prefix. Each address family keeps a hash table from prefix to
//! slot plus the ascending list of prefix lengths that actually occur, so a
//! covering query probes at most one slot per occurring length (33 for IPv4,
//! 129 for IPv6) regardless of how many records are loaded.

use super::{Family, Prefix};
use std::collections::HashMap;
use std::ops::Range;

/// A record that can be stored in a [`PrefixIndex`]
pub trait IndexedRecord {
    /// The prefix this record is attached to
    fn prefix(&self) -> &Prefix;
}

#[derive(Debug, Default)]
struct FamilyTable {
    /// Distinct prefix lengths present, ascending
    lengths: Vec<u8>,
    slots: HashMap<Prefix, Range<usize>>,
}

impl FamilyTable {
    fn slot(&self, prefix: &Prefix) -> Option<Range<usize>> {
        self.slots.get(prefix).cloned()
    }
}

/// Immutable index answering "which records cover this prefix".
///
/// The index is built once from a record list and never changes afterwards.
/// Output never depends on the order records were supplied in: records are
/// sorted by prefix and then by their own `Ord` implementation, and exact
/// duplicates collapse to a single entry.
///
/// # Examples
///
/// ```
/// use rov::prefix::index::{IndexedRecord, PrefixIndex};
/// use rov::Prefix;
///
/// #[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
/// struct Route(Prefix);
///
/// impl IndexedRecord for Route {
///     fn prefix(&self) -> &Prefix {
///         &self.0
///     }
/// }
///
/// let index = PrefixIndex::build(vec![
///     Route("8.8.8.0/24".parse().unwrap()),
///     Route("8.0.0.0/8".parse().unwrap()),
/// ]);
///
/// let query: Prefix = "8.8.8.0/25".parse().unwrap();
/// let covering = index.covering(&query);
/// assert_eq!(covering.len(), 2);
/// assert_eq!(covering[0].0.to_string(), "8.0.0.0/8");
/// ```
#[derive(Debug)]
pub struct PrefixIndex<R> {
    records: Vec<R>,
    v4: FamilyTable,
    v6: FamilyTable,
}

impl<R: IndexedRecord + Ord> PrefixIndex<R> {
    /// Build an index from records in any order
    pub fn build<I: IntoIterator<Item = R>>(records: I) -> Self {
        let mut records: Vec<R> = records.into_iter().collect();
        records.sort_by(|a, b| a.prefix().cmp(b.prefix()).then_with(|| a.cmp(b)));
        records.dedup();

        let mut v4 = FamilyTable::default();
        let mut v6 = FamilyTable::default();

        let mut start = 0;
        while start < records.len() {
            let prefix = *records[start].prefix();
            let run = records[start..]
                .iter()
                .take_while(|r| *r.prefix() == prefix)
                .count();
            let end = start + run;

            let table = match prefix.family() {
                Family::V4 => &mut v4,
                Family::V6 => &mut v6,
            };
            table.slots.insert(prefix, start..end);
            table.lengths.push(prefix.prefix_len());

            start = end;
        }

        for table in [&mut v4, &mut v6] {
            table.lengths.sort_unstable();
            table.lengths.dedup();
        }

        Self { records, v4, v6 }
    }
}

impl<R> PrefixIndex<R> {
    /// An index holding no records
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            v4: FamilyTable::default(),
            v6: FamilyTable::default(),
        }
    }

    fn table(&self, family: Family) -> &FamilyTable {
        match family {
            Family::V4 => &self.v4,
            Family::V6 => &self.v6,
        }
    }

    /// Every record whose prefix covers `query`, least specific first.
    ///
    /// Records sharing a prefix are all returned, in record order. A query
    /// from a family the index holds no records for yields an empty set.
    pub fn covering(&self, query: &Prefix) -> Vec<&R> {
        let table = self.table(query.family());
        let mut found = Vec::new();

        for &len in &table.lengths {
            if len > query.prefix_len() {
                break;
            }
            let Some(candidate) = query.truncate(len) else {
                break;
            };
            if let Some(range) = table.slot(&candidate) {
                found.extend(&self.records[range]);
            }
        }

        found
    }

    /// The single most specific record covering `query`, if any.
    ///
    /// When several records share the most specific prefix, the last one in
    /// record order is returned.
    pub fn most_specific(&self, query: &Prefix) -> Option<&R> {
        let table = self.table(query.family());

        table
            .lengths
            .iter()
            .rev()
            .filter(|&&len| len <= query.prefix_len())
            .filter_map(|&len| query.truncate(len))
            .find_map(|candidate| table.slot(&candidate))
            .and_then(|range| self.records[range].last())
    }

    /// Records stored at exactly `prefix`
    pub fn exact(&self, prefix: &Prefix) -> &[R] {
        match self.table(prefix.family()).slot(prefix) {
            Some(range) => &self.records[range],
            None => &[],
        }
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct prefixes for a family
    pub fn prefix_count(&self, family: Family) -> usize {
        self.table(family).slots.len()
    }

    /// All records, sorted by prefix
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }
}

impl<R> Default for PrefixIndex<R> {
    fn default() -> Self {
        Self::empty()
    }
}
