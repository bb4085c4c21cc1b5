//! Probe locations and AS paths as observed at one snapped instant.

use crate::Timestamp;
use std::collections::BTreeMap;

/// The token standing in for a hop that could not be assigned a single,
/// unambiguous AS.
pub const UNRESOLVED_ASN: &str = "*";

/// Identifier of a vantage probe.
pub type ProbeId = u64;

/// Where a probe sat in the network at one instant.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NetworkLocation {
    /// The probe's source address.
    pub ip_addr: String,

    /// The routed prefix enclosing `ip_addr`, in `addr/len` form.
    pub prefix: String,

    /// The origin ASN token of `prefix`.
    ///
    /// This is a raw token and may encode several candidate ASNs for
    /// multi-origin address space.
    pub asn: String,
}

impl NetworkLocation {
    /// Construct a new location.
    pub fn new(
        ip_addr: impl Into<String>,
        prefix: impl Into<String>,
        asn: impl Into<String>,
    ) -> Self {
        Self {
            ip_addr: ip_addr.into(),
            prefix: prefix.into(),
            asn: asn.into(),
        }
    }

    /// Whether two locations are physically the same vantage point.
    ///
    /// The origin ASN is ignored. It is a property of the routing table
    /// snapshot, not of the probe.
    pub fn same_place(&self, other: &NetworkLocation) -> bool {
        self.ip_addr == other.ip_addr && self.prefix == other.prefix
    }
}

/// An ordered sequence of ASN tokens with no two consecutive entries
/// equal. The first entry is the origin AS.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct AsPath(Vec<String>);

impl AsPath {
    /// Build a path from hop tokens, dropping consecutive repeats.
    pub fn from_hops<I, S>(hops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for hop in hops {
            let hop = hop.into();
            if out.last() != Some(&hop) {
                out.push(hop);
            }
        }
        Self(out)
    }

    /// The tokens of this path.
    pub fn hops(&self) -> &[String] {
        &self.0
    }

    /// Take the tokens out of this path.
    pub fn into_hops(self) -> Vec<String> {
        self.0
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the path has no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The origin AS token, if any.
    pub fn origin(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// The AS adjacent to the far end of the path.
    ///
    /// This is the second-to-last token: the network a destination-side
    /// observer sees the traffic arrive from. Paths too short to have one
    /// yield `None`.
    pub fn observation(&self) -> Option<&str> {
        if self.0.len() < 2 {
            return None;
        }
        Some(self.0[self.0.len() - 2].as_str())
    }
}

/// A probe's location together with its AS path at one instant.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ProbePath {
    /// Where the probe was.
    pub location: NetworkLocation,

    /// The AS path it measured.
    pub as_path: AsPath,
}

impl ProbePath {
    /// Construct a new probe path.
    pub fn new(location: NetworkLocation, as_path: AsPath) -> Self {
        Self { location, as_path }
    }

    /// See [AsPath::observation].
    pub fn observation(&self) -> Option<&str> {
        self.as_path.observation()
    }
}

/// Every probe's path during one measurement interval.
pub type ProbePaths = BTreeMap<ProbeId, ProbePath>;

/// The atomic unit of anonymity-set membership.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ProbeTime {
    /// The probe.
    pub probe_id: ProbeId,

    /// The snapped instant it was seen at.
    pub instant: Timestamp,
}

impl ProbeTime {
    /// Construct a new probe-time pair.
    pub fn new(probe_id: ProbeId, instant: Timestamp) -> Self {
        Self { probe_id, instant }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_hops_dedups_consecutive() {
        let p = AsPath::from_hops(["1", "1", "2", "*", "*", "2", "3"]);
        assert_eq!(&["1", "2", "*", "2", "3"], p.hops());
    }

    #[test]
    fn observation_is_second_to_last() {
        assert_eq!(
            Some("64500"),
            AsPath::from_hops(["3320", "64500", "15169"]).observation()
        );
        assert_eq!(None, AsPath::from_hops(["3320"]).observation());
        assert_eq!(None, AsPath::default().observation());
    }

    #[test]
    fn same_place_ignores_asn() {
        let a = NetworkLocation::new("192.0.2.1", "192.0.2.0/24", "64500");
        let b = NetworkLocation::new("192.0.2.1", "192.0.2.0/24", "64501");
        let c = NetworkLocation::new("192.0.2.2", "192.0.2.0/24", "64500");
        assert!(a.same_place(&b));
        assert!(!a.same_place(&c));
    }

    #[test]
    fn probe_path_json_shape() {
        let p = ProbePath::new(
            NetworkLocation::new("192.0.2.1", "192.0.2.0/24", "64500"),
            AsPath::from_hops(["64500", "64501", "15169"]),
        );
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(
            r#"{"location":{"ip_addr":"192.0.2.1","prefix":"192.0.2.0/24","asn":"64500"},"as_path":["64500","64501","15169"]}"#,
            json
        );
        assert_eq!(p, serde_json::from_str::<ProbePath>(&json).unwrap());
    }
}
