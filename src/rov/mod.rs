//! Route origin validation facade
//!
//! [`Rov`] owns the current index of every source and answers checks
//! against them. Each source is published by reference swap, so checks
//! never block on a reload and always see each source's index whole.

pub mod config;
pub mod error;
pub mod query;
pub mod result;
pub mod status;

pub use config::{RovConfig, RovConfigBuilder};
pub use error::RovError;
pub use query::{parse_asn, Query};
pub use result::{DelegatedStatus, IrrMatch, Lookup, RpkiMatch, ValidationResult};
pub use status::{LoadReport, LoadStatus, Source, SourceStatus};

use crate::classify::{classify, OriginRecord, Validation};
use crate::delegated::{AsnIndex, DelegatedPrefixIndex, DelegatedResolver};
use crate::feed::Feeds;
use crate::prefix::{Prefix, PrefixIndex};
use crate::records::{AsnRecord, DelegatedPrefixRecord, IrrRecord, RpkiRecord};
use crate::snapshot::{RpkiIndex, SnapshotKey, TemporalStore};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Index of IRR route objects
pub type IrrIndex = PrefixIndex<IrrRecord>;

/// Offline route origin validator over IRR, RPKI and RIR delegated data.
///
/// All methods take `&self`; loads and checks may run concurrently from
/// any number of threads.
///
/// # Examples
///
/// ```
/// use rov::{Prefix, RouteStatus, Rov};
/// use rov::records::RpkiRecord;
///
/// let rov = Rov::new();
/// let roa = RpkiRecord::new("2.0.0.0/12".parse().unwrap(), 3215, Some(17), "ripencc");
/// rov.load_rpki(vec![roa]);
///
/// let result = rov.check_str("2.0.0.0/18", "AS3215", None).unwrap();
/// assert_eq!(result.rpki_status(), RouteStatus::InvalidMoreSpecific);
/// ```
#[derive(Debug, Default)]
pub struct Rov {
    config: RovConfig,
    irr: ArcSwapOption<IrrIndex>,
    rpki: TemporalStore,
    delegated: DelegatedResolver,
}

/// Indices built by one `load_databases` call, not yet published
struct Built {
    irr: Option<(IrrIndex, Duration)>,
    rpki: Option<(RpkiIndex, Duration)>,
    archive: Vec<(SnapshotKey, RpkiIndex)>,
    delegated_prefixes: Option<(DelegatedPrefixIndex, Duration)>,
    delegated_asns: Option<(AsnIndex, Duration)>,
}

fn timed<T>(build: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = build();
    (value, start.elapsed())
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

fn build_archive(archive: Vec<(SnapshotKey, Vec<RpkiRecord>)>) -> Vec<(SnapshotKey, RpkiIndex)> {
    archive
        .into_iter()
        .map(|(key, records)| (key, PrefixIndex::build(records)))
        .collect()
}

fn validate<R, M>(index: Option<&PrefixIndex<R>>, prefix: &Prefix, asn: u32) -> Validation<M>
where
    R: OriginRecord + Ord,
    M: for<'r> From<&'r R>,
{
    match index {
        Some(index) => classify(prefix, asn, &index.covering(prefix)).map(M::from),
        None => Validation::NotFound,
    }
}

impl Rov {
    /// Create a validator with the default configuration and nothing loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with a specific configuration
    pub fn with_config(config: RovConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RovConfig {
        &self.config
    }

    /// Build and publish every source present in `feeds`.
    ///
    /// Sources absent from `feeds` keep their previous index. Archived RPKI
    /// days that are already loaded are skipped and listed in the report.
    pub fn load_databases(&self, feeds: Feeds) -> LoadReport {
        let start = Instant::now();
        let Feeds {
            irr,
            rpki,
            mut rpki_archive,
            delegated_prefixes,
            delegated_asns,
        } = feeds;

        // Skip building days we would refuse to publish anyway
        let mut skipped = Vec::new();
        rpki_archive.retain(|(key, _)| {
            let fresh = !self.rpki.contains(*key);
            if !fresh {
                skipped.push(*key);
            }
            fresh
        });

        let built = if self.config.parallel_load {
            thread::scope(|s| {
                let irr = irr.map(|r| s.spawn(move || timed(|| PrefixIndex::build(r))));
                let rpki = rpki.map(|r| s.spawn(move || timed(|| PrefixIndex::build(r))));
                let archive = s.spawn(move || build_archive(rpki_archive));
                let prefixes =
                    delegated_prefixes.map(|r| s.spawn(move || timed(|| PrefixIndex::build(r))));
                let asns = delegated_asns.map(|r| s.spawn(move || timed(|| AsnIndex::build(r))));

                Built {
                    irr: irr.map(join),
                    rpki: rpki.map(join),
                    archive: join(archive),
                    delegated_prefixes: prefixes.map(join),
                    delegated_asns: asns.map(join),
                }
            })
        } else {
            Built {
                irr: irr.map(|r| timed(|| PrefixIndex::build(r))),
                rpki: rpki.map(|r| timed(|| PrefixIndex::build(r))),
                archive: build_archive(rpki_archive),
                delegated_prefixes: delegated_prefixes.map(|r| timed(|| PrefixIndex::build(r))),
                delegated_asns: delegated_asns.map(|r| timed(|| AsnIndex::build(r))),
            }
        };

        let mut report = LoadReport {
            snapshots_skipped: skipped,
            ..LoadReport::default()
        };

        if let Some((index, elapsed)) = built.irr {
            report.loaded.push((Source::Irr, self.publish_irr(index, elapsed)));
        }
        if let Some((index, elapsed)) = built.rpki {
            report.loaded.push((Source::Rpki, self.publish_rpki(index, elapsed)));
        }
        for (key, index) in built.archive {
            if self.publish_archive(key, index) {
                report.snapshots_added.push(key);
            } else {
                report.snapshots_skipped.push(key);
            }
        }
        if let Some((index, elapsed)) = built.delegated_prefixes {
            report
                .loaded
                .push((Source::DelegatedPrefix, self.publish_delegated_prefixes(index, elapsed)));
        }
        if let Some((index, elapsed)) = built.delegated_asns {
            report
                .loaded
                .push((Source::DelegatedAsn, self.publish_delegated_asns(index, elapsed)));
        }

        for key in &report.snapshots_skipped {
            warn!(snapshot = %key, "RPKI snapshot already loaded, skipping");
        }

        if let Err(err) = self.ensure_complete() {
            warn!("{}", err);
        }

        report.elapsed = start.elapsed();
        report
    }

    /// Replace the IRR index, returning the number of records loaded
    pub fn load_irr(&self, records: Vec<IrrRecord>) -> usize {
        let (index, elapsed) = timed(|| PrefixIndex::build(records));
        self.publish_irr(index, elapsed)
    }

    /// Replace the latest RPKI index, returning the number of records loaded
    pub fn load_rpki(&self, records: Vec<RpkiRecord>) -> usize {
        let (index, elapsed) = timed(|| PrefixIndex::build(records));
        self.publish_rpki(index, elapsed)
    }

    /// Add an archived RPKI day.
    ///
    /// Returns `false` if `key` was already loaded; the existing index is
    /// kept.
    pub fn load_rpki_archive(&self, key: SnapshotKey, records: Vec<RpkiRecord>) -> bool {
        if self.rpki.contains(key) {
            warn!(snapshot = %key, "RPKI snapshot already loaded, skipping");
            return false;
        }
        // A concurrent load may still win the race for the same day
        let added = self.publish_archive(key, PrefixIndex::build(records));
        if !added {
            warn!(snapshot = %key, "RPKI snapshot already loaded, skipping");
        }
        added
    }

    /// Replace the delegated prefix table, returning the number of records loaded
    pub fn load_delegated_prefixes(&self, records: Vec<DelegatedPrefixRecord>) -> usize {
        let (index, elapsed) = timed(|| PrefixIndex::build(records));
        self.publish_delegated_prefixes(index, elapsed)
    }

    /// Replace the delegated ASN table, returning the number of records loaded
    pub fn load_delegated_asns(&self, records: Vec<AsnRecord>) -> usize {
        let (index, elapsed) = timed(|| AsnIndex::build(records));
        self.publish_delegated_asns(index, elapsed)
    }

    fn publish_irr(&self, index: IrrIndex, elapsed: Duration) -> usize {
        let records = index.len();
        self.irr.store(Some(Arc::new(index)));
        info!(source = %Source::Irr, records, ?elapsed, "Loaded source");
        records
    }

    fn publish_rpki(&self, index: RpkiIndex, elapsed: Duration) -> usize {
        let records = index.len();
        self.rpki.replace_latest(index);
        info!(source = %Source::Rpki, records, ?elapsed, "Loaded source");
        records
    }

    fn publish_archive(&self, key: SnapshotKey, index: RpkiIndex) -> bool {
        let records = index.len();
        let added = self.rpki.insert_archive(key, index);
        if added {
            debug!(snapshot = %key, records, "Registered RPKI snapshot");
        }
        added
    }

    fn publish_delegated_prefixes(&self, index: DelegatedPrefixIndex, elapsed: Duration) -> usize {
        let records = index.len();
        self.delegated.replace_prefixes(index);
        info!(source = %Source::DelegatedPrefix, records, ?elapsed, "Loaded source");
        records
    }

    fn publish_delegated_asns(&self, index: AsnIndex, elapsed: Duration) -> usize {
        let records = index.record_count();
        let blocks = index.block_count();
        self.delegated.replace_asns(index);
        info!(source = %Source::DelegatedAsn, records, blocks, ?elapsed, "Loaded source");
        records
    }

    /// Validate `prefix` originated by `asn`.
    ///
    /// `snapshot` selects an archived RPKI day; `None` uses the latest RPKI
    /// load. IRR and delegated data always come from the current loads.
    ///
    /// # Errors
    ///
    /// * `RovError::SnapshotNotLoaded` - if `snapshot` names a day never loaded
    /// * `RovError::LoadIncomplete` - if `require_complete` is set and a
    ///   source was never loaded
    pub fn check(
        &self,
        prefix: &Prefix,
        asn: u32,
        snapshot: Option<SnapshotKey>,
    ) -> Result<ValidationResult, RovError> {
        self.check_query(&Query {
            prefix: *prefix,
            asn,
            snapshot,
        })
    }

    /// Validate a prepared query. See [`Rov::check`].
    pub fn check_query(&self, query: &Query) -> Result<ValidationResult, RovError> {
        if self.config.require_complete {
            self.ensure_complete()?;
        }

        let rpki_index = self.rpki.resolve(query.snapshot)?;
        if let Some(key) = query.snapshot {
            debug!(snapshot = %key, prefix = %query.prefix, "Resolved archived RPKI snapshot");
        }
        let irr_index = self.irr.load_full();

        Ok(ValidationResult {
            query: *query,
            irr: validate(irr_index.as_deref(), &query.prefix, query.asn),
            rpki: validate(rpki_index.as_deref(), &query.prefix, query.asn),
            delegated: DelegatedStatus {
                prefix: self.delegated.prefix_status(&query.prefix),
                asn: self.delegated.asn_status(query.asn),
            },
        })
    }

    /// Parse textual inputs and validate them.
    ///
    /// The ASN may be written `15169` or `AS15169`; the snapshot as
    /// `YYYY/MM/DD` or `YYYY-MM-DD`. Input errors are reported before any
    /// index is consulted.
    pub fn check_str(
        &self,
        prefix: &str,
        asn: &str,
        snapshot: Option<&str>,
    ) -> Result<ValidationResult, RovError> {
        let query = Query::parse(prefix, asn, snapshot)?;
        self.check_query(&query)
    }

    /// Validate many queries, one result per query in input order
    pub fn check_batch(&self, queries: &[Query]) -> Vec<Result<ValidationResult, RovError>> {
        queries.iter().map(|q| self.check_query(q)).collect()
    }

    /// Raw records covering `prefix` in each source.
    ///
    /// # Errors
    ///
    /// * `RovError::SnapshotNotLoaded` - if `snapshot` names a day never loaded
    pub fn lookup(&self, prefix: &Prefix, snapshot: Option<SnapshotKey>) -> Result<Lookup, RovError> {
        let rpki_index = self.rpki.resolve(snapshot)?;
        let irr_index = self.irr.load_full();

        Ok(Lookup {
            prefix: *prefix,
            irr: irr_index
                .map(|index| index.covering(prefix).into_iter().cloned().collect())
                .unwrap_or_default(),
            rpki: rpki_index
                .map(|index| index.covering(prefix).into_iter().cloned().collect())
                .unwrap_or_default(),
            delegated: self.delegated.prefix_status(prefix),
        })
    }

    /// Which sources are loaded and how many records each holds
    pub fn load_status(&self) -> LoadStatus {
        let irr = self.irr.load_full().map(|i| i.len());
        let rpki = self.rpki.latest().map(|i| i.len());
        let prefixes = self.delegated.prefixes().map(|i| i.len());
        let asns = self.delegated.asns().map(|i| i.record_count());

        LoadStatus {
            sources: vec![
                SourceStatus { source: Source::Irr, records: irr },
                SourceStatus { source: Source::Rpki, records: rpki },
                SourceStatus { source: Source::DelegatedPrefix, records: prefixes },
                SourceStatus { source: Source::DelegatedAsn, records: asns },
            ],
            snapshots: self.rpki.snapshots(),
        }
    }

    /// Fail unless every source has been loaded at least once.
    ///
    /// # Errors
    ///
    /// * `RovError::LoadIncomplete` - naming every never-loaded source
    pub fn ensure_complete(&self) -> Result<(), RovError> {
        let missing = self.load_status().missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RovError::LoadIncomplete { missing })
        }
    }

    /// Archived RPKI days, oldest first
    pub fn snapshots(&self) -> Vec<SnapshotKey> {
        self.rpki.snapshots()
    }

    /// Drop an archived RPKI day. Returns `false` if it was not loaded.
    pub fn unload_snapshot(&self, key: SnapshotKey) -> bool {
        let removed = self.rpki.unload(key);
        if removed {
            debug!(snapshot = %key, "Unloaded RPKI snapshot");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RouteStatus;

    fn p(s: &str) -> Prefix {
        s.parse().unwrap()
    }

    fn day(s: &str) -> SnapshotKey {
        s.parse().unwrap()
    }

    fn loaded() -> Rov {
        let rov = Rov::new();
        rov.load_irr(vec![IrrRecord::new(p("8.8.8.0/24"), 15169, "Google", "RADB")]);
        rov.load_rpki(vec![RpkiRecord::new(p("2.0.0.0/12"), 3215, Some(17), "ripencc")]);
        rov.load_delegated_prefixes(vec![DelegatedPrefixRecord::new(
            p("10.0.0.0/8"),
            "reserved",
            "19960201",
            "iana",
            "ZZ",
        )]);
        rov.load_delegated_asns(vec![AsnRecord::new(0, "reserved", "iana")]);
        rov
    }

    #[test]
    fn test_rov_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Rov>();
    }

    #[test]
    fn test_check_unloaded_is_not_found() {
        let rov = Rov::new();
        let result = rov.check(&p("8.8.8.0/24"), 15169, None).unwrap();
        assert_eq!(result.irr_status(), RouteStatus::NotFound);
        assert_eq!(result.rpki_status(), RouteStatus::NotFound);
        assert_eq!(result.delegated, DelegatedStatus::default());
    }

    #[test]
    fn test_check_combines_sources() {
        let rov = loaded();

        let result = rov.check(&p("8.8.8.0/25"), 15169, None).unwrap();
        assert_eq!(result.irr_status(), RouteStatus::InvalidMoreSpecific);
        assert_eq!(result.rpki_status(), RouteStatus::NotFound);

        let result = rov.check(&p("10.1.0.0/16"), 0, None).unwrap();
        assert_eq!(result.delegated.prefix.unwrap().status, "reserved");
        assert_eq!(result.delegated.asn.unwrap().status, "reserved");
    }

    #[test]
    fn test_strict_mode_requires_every_source() {
        let config = RovConfig::builder().require_complete(true).build().unwrap();
        let rov = Rov::with_config(config);
        rov.load_irr(Vec::new());

        match rov.check(&p("8.8.8.0/24"), 15169, None) {
            Err(RovError::LoadIncomplete { missing }) => assert_eq!(
                missing,
                vec![Source::Rpki, Source::DelegatedPrefix, Source::DelegatedAsn]
            ),
            other => panic!("Expected LoadIncomplete, got {:?}", other),
        }

        rov.load_rpki(Vec::new());
        rov.load_delegated_prefixes(Vec::new());
        rov.load_delegated_asns(Vec::new());
        assert!(rov.check(&p("8.8.8.0/24"), 15169, None).is_ok());
    }

    #[test]
    fn test_check_str_reports_input_errors() {
        let rov = loaded();
        assert!(matches!(
            rov.check_str("8.8.8.1/24", "15169", None),
            Err(RovError::InvalidPrefix { .. })
        ));
        assert!(matches!(
            rov.check_str("8.8.8.0/24", "GOOGLE", None),
            Err(RovError::InvalidAsn(_))
        ));
    }

    #[test]
    fn test_load_databases_keeps_absent_sources() {
        let rov = loaded();
        let report = rov.load_databases(
            Feeds::new().with_irr(vec![IrrRecord::new(p("1.1.1.0/24"), 13335, "", "RADB")]),
        );

        assert_eq!(report.records(Source::Irr), Some(1));
        assert_eq!(report.records(Source::Rpki), None);

        // RPKI still answers from the earlier load
        let result = rov.check(&p("2.0.0.0/17"), 3215, None).unwrap();
        assert_eq!(result.rpki_status(), RouteStatus::Valid);
        // IRR was replaced
        let result = rov.check(&p("8.8.8.0/24"), 15169, None).unwrap();
        assert_eq!(result.irr_status(), RouteStatus::NotFound);
    }

    #[test]
    fn test_sequential_and_parallel_loads_agree() {
        let feeds = || {
            Feeds::new()
                .with_irr(vec![IrrRecord::new(p("8.8.8.0/24"), 15169, "Google", "RADB")])
                .with_rpki(vec![RpkiRecord::new(p("8.8.8.0/24"), 15169, None, "arin")])
                .with_archive(day("2018/10/02"), Vec::new())
        };

        let parallel = Rov::new();
        let sequential =
            Rov::with_config(RovConfig::builder().parallel_load(false).build().unwrap());
        let a = parallel.load_databases(feeds());
        let b = sequential.load_databases(feeds());

        assert_eq!(a.loaded, b.loaded);
        assert_eq!(a.snapshots_added, b.snapshots_added);
        assert_eq!(
            parallel.check(&p("8.8.8.0/24"), 15169, None).unwrap(),
            sequential.check(&p("8.8.8.0/24"), 15169, None).unwrap()
        );
    }

    #[test]
    fn test_duplicate_archive_is_skipped() {
        let rov = Rov::new();
        let key = day("2018/10/02");
        let roa = RpkiRecord::new(p("1.1.1.0/24"), 13335, None, "apnic");

        let report = rov.load_databases(Feeds::new().with_archive(key, vec![roa]));
        assert_eq!(report.snapshots_added, vec![key]);

        let report = rov.load_databases(Feeds::new().with_archive(key, Vec::new()));
        assert!(report.snapshots_added.is_empty());
        assert_eq!(report.snapshots_skipped, vec![key]);
        assert!(!rov.load_rpki_archive(key, Vec::new()));

        // The first load still answers
        let result = rov.check(&p("1.1.1.0/24"), 13335, Some(key)).unwrap();
        assert_eq!(result.rpki_status(), RouteStatus::Valid);
    }

    #[test]
    fn test_same_day_twice_in_one_bundle_keeps_first() {
        for parallel in [true, false] {
            let config = RovConfig::builder().parallel_load(parallel).build().unwrap();
            let rov = Rov::with_config(config);
            let key = day("2018/10/03");
            let first = RpkiRecord::new(p("1.1.1.0/24"), 13335, None, "apnic");
            let second = RpkiRecord::new(p("1.1.1.0/24"), 64500, None, "apnic");

            let feeds = Feeds::new()
                .with_archive(key, vec![first])
                .with_archive(key, vec![second]);
            let report = rov.load_databases(feeds);
            assert_eq!(report.snapshots_added, vec![key]);
            assert_eq!(report.snapshots_skipped, vec![key]);
            assert_eq!(rov.snapshots(), vec![key]);

            let result = rov.check(&p("1.1.1.0/24"), 13335, Some(key)).unwrap();
            assert_eq!(result.rpki_status(), RouteStatus::Valid);
            let result = rov.check(&p("1.1.1.0/24"), 64500, Some(key)).unwrap();
            assert_eq!(result.rpki_status(), RouteStatus::Invalid);
        }
    }

    #[test]
    fn test_unknown_snapshot_fails() {
        let rov = loaded();
        match rov.check(&p("2.0.0.0/16"), 3215, Some(day("2018/10/01"))) {
            Err(RovError::SnapshotNotLoaded(key)) => assert_eq!(key, day("2018/10/01")),
            other => panic!("Expected SnapshotNotLoaded, got {:?}", other),
        }
    }

    #[test]
    fn test_unload_snapshot() {
        let rov = Rov::new();
        let key = day("2018/10/02");
        assert!(rov.load_rpki_archive(key, Vec::new()));
        assert_eq!(rov.snapshots(), vec![key]);

        assert!(rov.unload_snapshot(key));
        assert!(!rov.unload_snapshot(key));
        assert!(rov.check(&p("1.1.1.0/24"), 13335, Some(key)).is_err());
    }

    #[test]
    fn test_lookup_returns_covering_records() {
        let rov = Rov::new();
        rov.load_irr(vec![
            IrrRecord::new(p("8.0.0.0/8"), 3356, "Level3", "RADB"),
            IrrRecord::new(p("8.8.8.0/24"), 15169, "Google", "RADB"),
            IrrRecord::new(p("9.0.0.0/8"), 3356, "Other", "RADB"),
        ]);

        let lookup = rov.lookup(&p("8.8.8.0/24"), None).unwrap();
        let prefixes: Vec<String> = lookup.irr.iter().map(|r| r.prefix.to_string()).collect();
        assert_eq!(prefixes, vec!["8.0.0.0/8", "8.8.8.0/24"]);
        assert!(lookup.rpki.is_empty());
        assert!(lookup.delegated.is_none());
    }

    #[test]
    fn test_check_batch_preserves_order() {
        let rov = loaded();
        let queries = vec![
            Query::new(p("8.8.8.0/24"), 15169),
            Query::new(p("8.8.8.0/24"), 15169).at(day("2018/10/01")),
            Query::new(p("8.8.8.0/24"), 123),
        ];

        let results = rov.check_batch(&queries);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().irr_status(), RouteStatus::Valid);
        assert!(matches!(results[1], Err(RovError::SnapshotNotLoaded(_))));
        assert_eq!(results[2].as_ref().unwrap().irr_status(), RouteStatus::Invalid);
    }

    #[test]
    fn test_load_status_counts() {
        let rov = loaded();
        let status = rov.load_status();
        assert!(status.is_complete());
        assert_eq!(status.get(Source::Irr).unwrap().records, Some(1));
        assert!(rov.ensure_complete().is_ok());
    }
}
