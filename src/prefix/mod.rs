//! Canonical IP prefixes and the containment arithmetic used by every index

pub mod index;

pub use index::PrefixIndex;

use crate::rov::RovError;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Address family of a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// IPv4 (32-bit addresses)
    V4,
    /// IPv6 (128-bit addresses)
    V6,
}

impl Family {
    /// Number of address bits for this family
    pub fn max_len(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// A canonical CIDR prefix.
///
/// The host bits below the prefix length are always zero, so two prefixes
/// are equal exactly when they describe the same address block. Construction
/// rejects non-canonical input instead of masking it.
///
/// # Examples
///
/// ```
/// use rov::Prefix;
///
/// let block: Prefix = "8.8.0.0/16".parse().unwrap();
/// let route: Prefix = "8.8.8.0/24".parse().unwrap();
/// assert!(block.covers(&route));
/// assert!(!route.covers(&block));
///
/// // Host bits set: rejected, never coerced
/// assert!("8.8.8.1/24".parse::<Prefix>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prefix(IpNet);

impl Prefix {
    /// Build a prefix from an address and a length
    ///
    /// # Errors
    ///
    /// * `RovError::InvalidPrefix` - if the length exceeds the family's width
    ///   or the address has bits set below the length
    pub fn new(addr: IpAddr, len: u8) -> Result<Self, RovError> {
        let net = IpNet::new(addr, len).map_err(|_| RovError::InvalidPrefix {
            input: format!("{addr}/{len}"),
            reason: "prefix length out of range".to_string(),
        })?;
        Self::from_net(net)
    }

    /// Wrap an `IpNet`, rejecting it if host bits are set
    pub fn from_net(net: IpNet) -> Result<Self, RovError> {
        if net.addr() != net.network() {
            return Err(RovError::InvalidPrefix {
                input: net.to_string(),
                reason: format!("host bits set (network is {})", net.trunc()),
            });
        }
        Ok(Self(net))
    }

    /// Network address
    pub fn addr(&self) -> IpAddr {
        self.0.network()
    }

    /// Prefix length in bits
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Address family
    pub fn family(&self) -> Family {
        match self.0 {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }

    /// Underlying `ipnet` value
    pub fn as_net(&self) -> &IpNet {
        &self.0
    }

    /// Whether `self` covers `other`.
    ///
    /// True iff both share a family, `other` is at least as long as `self`
    /// and `other`'s address masked to `self`'s length equals `self`'s
    /// address. A prefix covers itself.
    pub fn covers(&self, other: &Prefix) -> bool {
        other.prefix_len() >= self.prefix_len() && self.0.contains(&other.0)
    }

    /// The covering prefix of length `len`, or `None` if `len` is longer
    /// than this prefix
    pub fn truncate(&self, len: u8) -> Option<Prefix> {
        if len > self.prefix_len() {
            return None;
        }
        IpNet::new(self.addr(), len).ok().map(|net| Self(net.trunc()))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Prefix {
    type Err = RovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let net: IpNet = trimmed.parse().map_err(|_| RovError::InvalidPrefix {
            input: s.to_string(),
            reason: "expected CIDR notation such as 192.0.2.0/24".to_string(),
        })?;
        Self::from_net(net)
    }
}

impl From<Ipv4Net> for Prefix {
    /// Truncates host bits; `Ipv4Net` values may carry them
    fn from(net: Ipv4Net) -> Self {
        Self(IpNet::V4(net.trunc()))
    }
}

impl From<Ipv6Net> for Prefix {
    /// Truncates host bits; `Ipv6Net` values may carry them
    fn from(net: Ipv6Net) -> Self {
        Self(IpNet::V6(net.trunc()))
    }
}

impl Serialize for Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Prefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
