//! Resolution of traceroute hop addresses into AS paths.
//!
//! Fetching traceroutes and building the routing table both happen
//! outside this crate. What lives here is the deterministic part: given
//! one probe's hop list and an address to prefix/AS lookup, produce its
//! [NetworkLocation] and normalized [AsPath].

use crate::address::Prefix;
use crate::asn::{asn_is_unambiguous, UNRESOLVED_ASN};
use crate::normalize::normalize_as_path;
use hornet_api::{AsPath, HornetResult, NetworkLocation, ProbePath};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

/// One probe's traceroute within a measurement interval.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TracerouteResult {
    /// The probe's source address.
    pub origin_addr: IpAddr,

    /// Per hop, the responding address of each packet sent. `None` marks
    /// a packet that got no reply.
    pub ip_path: Vec<Vec<Option<IpAddr>>>,
}

/// The routed prefix covering an address, and its origin ASN token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch {
    /// The matching prefix, in `addr/len` form.
    pub prefix: String,

    /// The origin ASN token announced for it.
    pub asn: String,
}

/// Longest-prefix-match lookup from address to routed prefix.
pub trait PrefixLookup {
    /// The most specific routed prefix covering `addr`, if any.
    fn lookup(&self, addr: IpAddr) -> Option<PrefixMatch>;
}

/// A simple in-memory [PrefixLookup].
#[derive(Debug, Default)]
pub struct PrefixTable {
    // keyed by (is_v6, len), longest first on lookup
    by_len: BTreeMap<(bool, u8), HashMap<IpAddr, String>>,
}

impl PrefixTable {
    /// Announce `prefix` with origin token `asn`, replacing any previous
    /// announcement of the same prefix.
    pub fn insert(&mut self, prefix: &str, asn: &str) -> HornetResult<()> {
        let prefix: Prefix = prefix.parse()?;
        self.by_len
            .entry((prefix.network().is_ipv6(), prefix.len()))
            .or_default()
            .insert(prefix.network(), asn.to_string());
        Ok(())
    }
}

impl PrefixLookup for PrefixTable {
    fn lookup(&self, addr: IpAddr) -> Option<PrefixMatch> {
        for ((is_v6, len), nets) in self.by_len.iter().rev() {
            if *is_v6 != addr.is_ipv6() {
                continue;
            }
            let Ok(candidate) = Prefix::new(addr, *len) else {
                continue;
            };
            if let Some(asn) = nets.get(&candidate.network()) {
                return Some(PrefixMatch {
                    prefix: candidate.to_string(),
                    asn: asn.clone(),
                });
            }
        }
        None
    }
}

fn is_private(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(a) => {
            let o = a.octets();
            a.is_private()
                || a.is_loopback()
                || a.is_link_local()
                || (o[0] == 100 && (o[1] & 0xc0) == 64)
        }
        IpAddr::V6(a) => {
            a.is_loopback()
                || (a.segments()[0] & 0xfe00) == 0xfc00
                || (a.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Resolve one hop to a single ASN token.
///
/// A hop whose replies map to exactly one unambiguous token resolves to
/// that token. Anything else, including a hop with no replies at all,
/// resolves to [UNRESOLVED_ASN].
fn resolve_hop<L: PrefixLookup + ?Sized>(
    replies: &[Option<IpAddr>],
    origin_addr: IpAddr,
    in_src_as: bool,
    lookup: &L,
) -> String {
    let asns: BTreeSet<String> = replies
        .iter()
        .flatten()
        .map(|a| {
            if in_src_as && is_private(a) {
                origin_addr
            } else {
                *a
            }
        })
        .filter_map(|a| lookup.lookup(a).map(|m| m.asn))
        .collect();

    let single = match asns.first() {
        Some(asn) if asns.len() == 1 => Some(asn.as_str()),
        _ => None,
    };

    match single {
        Some(asn) if asn_is_unambiguous(Some(asn)) => asn.to_string(),
        _ => UNRESOLVED_ASN.to_string(),
    }
}

/// Build the normalized AS path of `result`.
///
/// Private addresses seen while still inside the source AS are taken to
/// belong to it. The origin AS is always the first token. Returns `None`
/// when the origin address is not routed.
pub fn resolve_as_path<L: PrefixLookup + ?Sized>(
    result: &TracerouteResult,
    lookup: &L,
) -> Option<AsPath> {
    let origin_as = lookup.lookup(result.origin_addr)?.asn;
    let mut hops: Vec<String> = Vec::with_capacity(result.ip_path.len() + 1);
    let mut in_src_as = true;

    for replies in &result.ip_path {
        let asn = resolve_hop(replies, result.origin_addr, in_src_as, lookup);
        if in_src_as && asn != origin_as {
            in_src_as = false;
        }
        hops.push(asn);
    }

    if hops.first() != Some(&origin_as) {
        hops.insert(0, origin_as);
    }

    Some(normalize_as_path(AsPath::from_hops(hops)))
}

/// Build a probe's location and path, or `None` if its origin is not
/// routed and it must be excluded from the snapshot.
pub fn resolve_probe_path<L: PrefixLookup + ?Sized>(
    result: &TracerouteResult,
    lookup: &L,
) -> Option<ProbePath> {
    let origin = lookup.lookup(result.origin_addr)?;
    let as_path = resolve_as_path(result, lookup)?;
    Some(ProbePath::new(
        NetworkLocation::new(
            result.origin_addr.to_string(),
            origin.prefix,
            origin.asn,
        ),
        as_path,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> PrefixTable {
        let mut t = PrefixTable::default();
        t.insert("192.0.2.0/24", "64500").unwrap();
        t.insert("198.51.100.0/24", "64501").unwrap();
        t.insert("198.51.100.128/25", "64502_64503").unwrap();
        t.insert("203.0.113.0/24", "64510").unwrap();
        t
    }

    fn ip(s: &str) -> Option<IpAddr> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn longest_prefix_wins() {
        let t = table();
        let m = t.lookup("198.51.100.200".parse().unwrap()).unwrap();
        assert_eq!("198.51.100.128/25", m.prefix);
        assert_eq!("64502_64503", m.asn);
        let m = t.lookup("198.51.100.3".parse().unwrap()).unwrap();
        assert_eq!("198.51.100.0/24", m.prefix);
        assert!(t.lookup("8.8.8.8".parse().unwrap()).is_none());
    }

    #[test]
    fn resolves_and_prepends_origin() {
        let r = TracerouteResult {
            origin_addr: "192.0.2.10".parse().unwrap(),
            ip_path: vec![
                vec![ip("10.0.0.1"), ip("10.0.0.1")],
                vec![ip("198.51.100.1"), None],
                vec![None, None],
                vec![ip("198.51.100.9")],
                vec![ip("203.0.113.1")],
            ],
        };
        let p = resolve_as_path(&r, &table()).unwrap();
        // private first hop maps to the origin, the silent hop bounces
        assert_eq!(&["64500", "64501", "64510"], p.hops());
        assert_eq!(Some("64501"), p.observation());
    }

    #[test]
    fn mixed_replies_are_unresolved() {
        let r = TracerouteResult {
            origin_addr: "192.0.2.10".parse().unwrap(),
            ip_path: vec![
                vec![ip("198.51.100.1"), ip("203.0.113.1")],
                vec![ip("203.0.113.1")],
            ],
        };
        let p = resolve_as_path(&r, &table()).unwrap();
        assert_eq!(&["64500", UNRESOLVED_ASN, "64510"], p.hops());
    }

    #[test]
    fn multi_origin_hops_are_kept() {
        let r = TracerouteResult {
            origin_addr: "192.0.2.10".parse().unwrap(),
            ip_path: vec![
                vec![ip("198.51.100.129")],
                vec![ip("203.0.113.1")],
            ],
        };
        let p = resolve_as_path(&r, &table()).unwrap();
        assert_eq!(Some("64502_64503"), p.observation());
    }

    #[test]
    fn unrouted_origin_is_excluded() {
        let r = TracerouteResult {
            origin_addr: "8.8.8.8".parse().unwrap(),
            ip_path: vec![vec![ip("203.0.113.1")]],
        };
        assert!(resolve_probe_path(&r, &table()).is_none());
    }

    #[test]
    fn probe_path_location() {
        let r = TracerouteResult {
            origin_addr: "192.0.2.10".parse().unwrap(),
            ip_path: vec![vec![ip("203.0.113.1")]],
        };
        let p = resolve_probe_path(&r, &table()).unwrap();
        assert_eq!(
            NetworkLocation::new("192.0.2.10", "192.0.2.0/24", "64500"),
            p.location
        );
        assert_eq!(Some("64500"), p.observation());
    }
}
