//! Normalized feed bundles and the on-disk feed directory
//!
//! A feed directory holds one JSON array per source:
//!
//! ```text
//! <dir>/irr.json
//! <dir>/rpki.json
//! <dir>/rpki-archive/YYYY-MM-DD.json
//! <dir>/delegated-prefix.json
//! <dir>/delegated-asn.json
//! ```
//!
//! A missing file means the source is not provided; the validator keeps
//! whatever it had loaded for it before.

use crate::records::{AsnRecord, DelegatedPrefixRecord, IrrRecord, RpkiRecord};
use crate::snapshot::SnapshotKey;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// IRR route objects file
pub const IRR_FILE: &str = "irr.json";
/// Current RPKI payloads file
pub const RPKI_FILE: &str = "rpki.json";
/// Directory of archived RPKI days
pub const RPKI_ARCHIVE_DIR: &str = "rpki-archive";
/// Delegated address blocks file
pub const DELEGATED_PREFIX_FILE: &str = "delegated-prefix.json";
/// Delegated ASN blocks file
pub const DELEGATED_ASN_FILE: &str = "delegated-asn.json";

/// Errors raised while reading a feed directory
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed directory does not exist
    #[error("Feed directory {} does not exist", .0.display())]
    MissingDir(PathBuf),

    /// A feed file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A feed file is not a JSON array of records
    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        /// File being parsed
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// An archive file is not named after its day
    #[error("Invalid archive file name {} (expected YYYY-MM-DD.json)", .0.display())]
    ArchiveName(PathBuf),
}

/// Records for one load, per source.
///
/// `None` means the source is not part of this load. An empty vector is a
/// real (empty) load that replaces the previous index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feeds {
    /// IRR route objects
    pub irr: Option<Vec<IrrRecord>>,
    /// Current RPKI payloads
    pub rpki: Option<Vec<RpkiRecord>>,
    /// Archived RPKI payloads by day
    pub rpki_archive: Vec<(SnapshotKey, Vec<RpkiRecord>)>,
    /// Delegated address blocks
    pub delegated_prefixes: Option<Vec<DelegatedPrefixRecord>>,
    /// Delegated ASN blocks
    pub delegated_asns: Option<Vec<AsnRecord>>,
}

impl Feeds {
    /// An empty bundle that changes nothing when loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Include IRR route objects
    pub fn with_irr(mut self, records: Vec<IrrRecord>) -> Self {
        self.irr = Some(records);
        self
    }

    /// Include current RPKI payloads
    pub fn with_rpki(mut self, records: Vec<RpkiRecord>) -> Self {
        self.rpki = Some(records);
        self
    }

    /// Include one archived RPKI day
    pub fn with_archive(mut self, key: SnapshotKey, records: Vec<RpkiRecord>) -> Self {
        self.rpki_archive.push((key, records));
        self
    }

    /// Include delegated address blocks
    pub fn with_delegated_prefixes(mut self, records: Vec<DelegatedPrefixRecord>) -> Self {
        self.delegated_prefixes = Some(records);
        self
    }

    /// Include delegated ASN blocks
    pub fn with_delegated_asns(mut self, records: Vec<AsnRecord>) -> Self {
        self.delegated_asns = Some(records);
        self
    }

    /// Whether loading this bundle would change nothing
    pub fn is_empty(&self) -> bool {
        self.irr.is_none()
            && self.rpki.is_none()
            && self.rpki_archive.is_empty()
            && self.delegated_prefixes.is_none()
            && self.delegated_asns.is_none()
    }
}

/// Day named by an archive file, e.g. `rpki-archive/2018-10-02.json`
///
/// # Errors
///
/// * `FeedError::ArchiveName` - if the stem is not a `YYYY-MM-DD` date
pub fn archive_key(path: &Path) -> Result<SnapshotKey, FeedError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok())
        .map(SnapshotKey::from)
        .ok_or_else(|| FeedError::ArchiveName(path.to_path_buf()))
}

async fn read_records<T: DeserializeOwned>(path: PathBuf) -> Result<Option<Vec<T>>, FeedError> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Feed file not present");
            return Ok(None);
        }
        Err(source) => return Err(FeedError::Io { path, source }),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| FeedError::Json { path, source })
}

async fn read_archive(dir: PathBuf) -> Result<Vec<(SnapshotKey, Vec<RpkiRecord>)>, FeedError> {
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(FeedError::Io { path: dir, source }),
    };

    let mut paths = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    paths.push(path);
                }
            }
            Ok(None) => break,
            Err(source) => return Err(FeedError::Io { path: dir, source }),
        }
    }
    paths.sort();

    let days = paths.into_iter().map(|path| async move {
        let key = archive_key(&path)?;
        let records = read_records(path).await?.unwrap_or_default();
        Ok::<_, FeedError>((key, records))
    });

    futures::future::try_join_all(days).await
}

/// Read every feed file present under `dir`.
///
/// Files are read concurrently. Archive days come back oldest first.
///
/// # Errors
///
/// * `FeedError::MissingDir` - if `dir` does not exist
/// * `FeedError::Io` / `FeedError::Json` - if a present file cannot be read
///   or parsed
/// * `FeedError::ArchiveName` - if an archive file is not named `YYYY-MM-DD.json`
pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Feeds, FeedError> {
    let dir = dir.as_ref();
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(FeedError::MissingDir(dir.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FeedError::MissingDir(dir.to_path_buf()))
        }
        Err(source) => {
            return Err(FeedError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    }

    let (irr, rpki, rpki_archive, delegated_prefixes, delegated_asns) = tokio::try_join!(
        read_records(dir.join(IRR_FILE)),
        read_records(dir.join(RPKI_FILE)),
        read_archive(dir.join(RPKI_ARCHIVE_DIR)),
        read_records(dir.join(DELEGATED_PREFIX_FILE)),
        read_records(dir.join(DELEGATED_ASN_FILE)),
    )?;

    Ok(Feeds {
        irr,
        rpki,
        rpki_archive,
        delegated_prefixes,
        delegated_asns,
    })
}
