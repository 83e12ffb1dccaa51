//! Query input and its validation

use crate::prefix::Prefix;
use crate::rov::RovError;
use crate::snapshot::SnapshotKey;
use serde::{Deserialize, Serialize};

/// A (prefix, origin ASN) pair to validate, optionally against an archived
/// RPKI snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Announced prefix
    pub prefix: Prefix,
    /// Origin ASN
    pub asn: u32,
    /// Archived RPKI day; latest load when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotKey>,
}

impl Query {
    /// Query against the latest RPKI load
    pub fn new(prefix: Prefix, asn: u32) -> Self {
        Self {
            prefix,
            asn,
            snapshot: None,
        }
    }

    /// Select an archived RPKI day
    pub fn at(mut self, snapshot: SnapshotKey) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Parse textual query fields.
    ///
    /// # Errors
    ///
    /// * `RovError::InvalidPrefix` - `prefix` is not canonical CIDR
    /// * `RovError::InvalidAsn` - `asn` is not a number (an `AS` prefix is allowed)
    /// * `RovError::InvalidSnapshot` - `snapshot` is not a calendar date
    pub fn parse(prefix: &str, asn: &str, snapshot: Option<&str>) -> Result<Self, RovError> {
        let prefix: Prefix = prefix.parse()?;
        let asn = parse_asn(asn)?;
        let snapshot: Option<SnapshotKey> = snapshot.map(str::parse).transpose()?;
        Ok(Self {
            prefix,
            asn,
            snapshot,
        })
    }

    /// Parse one line of a batch file: `prefix asn [snapshot]`
    pub fn parse_line(line: &str) -> Result<Self, RovError> {
        let mut fields = line.split_whitespace();
        let prefix = fields.next().unwrap_or_default();
        let asn = fields.next().unwrap_or_default();
        let snapshot = fields.next();
        Self::parse(prefix, asn, snapshot)
    }
}

/// Parse an ASN written as `15169` or `AS15169`
pub fn parse_asn(input: &str) -> Result<u32, RovError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("AS")
        .or_else(|| trimmed.strip_prefix("as"))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RovError::InvalidAsn(input.to_string()));
    }

    digits
        .parse()
        .map_err(|_| RovError::InvalidAsn(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asn() {
        assert_eq!(parse_asn("15169").unwrap(), 15169);
        assert_eq!(parse_asn("AS15169").unwrap(), 15169);
        assert_eq!(parse_asn("as3215").unwrap(), 3215);
        assert_eq!(parse_asn(" 0 ").unwrap(), 0);
        assert_eq!(parse_asn("4294967295").unwrap(), u32::MAX);
    }

    #[test]
    fn test_parse_asn_rejects_non_numeric() {
        for bad in ["", "AS", "google", "-1", "+5", "15169.5", "4294967296", "AS 15169"] {
            assert!(
                matches!(parse_asn(bad), Err(RovError::InvalidAsn(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_query_parse() {
        let q = Query::parse("8.8.8.0/24", "15169", None).unwrap();
        assert_eq!(q.prefix.to_string(), "8.8.8.0/24");
        assert_eq!(q.asn, 15169);
        assert!(q.snapshot.is_none());

        let q = Query::parse("8.8.8.0/24", "AS15169", Some("2018/10/01")).unwrap();
        assert_eq!(q.snapshot.unwrap().to_string(), "2018/10/01");
    }

    #[test]
    fn test_query_parse_errors() {
        assert!(matches!(
            Query::parse("8.8.8.0", "15169", None),
            Err(RovError::InvalidPrefix { .. })
        ));
        assert!(matches!(
            Query::parse("8.8.8.0/24", "x", None),
            Err(RovError::InvalidAsn(_))
        ));
        assert!(matches!(
            Query::parse("8.8.8.0/24", "15169", Some("2018/02/31")),
            Err(RovError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_parse_line() {
        let q = Query::parse_line("  1.1.1.0/24   13335  2018-10-02 ").unwrap();
        assert_eq!(q.asn, 13335);
        assert_eq!(q.snapshot.unwrap().to_string(), "2018/10/02");

        assert!(Query::parse_line("1.1.1.0/24").is_err());
        assert!(Query::parse_line("").is_err());
    }

    #[test]
    fn test_query_builder() {
        let q = Query::new("10.0.0.0/8".parse().unwrap(), 64500).at("2020/01/01".parse().unwrap());
        assert_eq!(q.snapshot.unwrap().year(), 2020);
    }
}
