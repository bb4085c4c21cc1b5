//! The ambiguity model over ASN tokens.
//!
//! An ASN token is a raw string. Address space announced by several
//! origins is written as a `,` or `_` separated list of candidates, and
//! hops that resolve to no single AS carry [UNRESOLVED_ASN].
//!
//! Two tokens are indistinguishable when they share a candidate. This
//! relation is reflexive and symmetric but **not** transitive:
//! `"1_2"` matches `"2_3"` and `"3_4"`, but `"1_2"` does not match `"3_4"`.
//! Callers must only ever rely on pairwise comparisons.

pub use hornet_api::UNRESOLVED_ASN;
use std::collections::BTreeSet;

/// Split an ASN token into its candidate ASNs.
///
/// Always yields at least one element, possibly the empty string.
pub fn split_asn_set(token: &str) -> BTreeSet<&str> {
    token.split([',', '_']).collect()
}

/// Could an observer fail to tell `x` and `y` apart?
///
/// Absent observations are never indistinguishable from anything,
/// including each other.
pub fn asns_are_indistinguishable(x: Option<&str>, y: Option<&str>) -> bool {
    let (x, y) = match (x, y) {
        (Some(x), Some(y)) => (x, y),
        _ => return false,
    };

    if x == UNRESOLVED_ASN && y == UNRESOLVED_ASN {
        return true;
    }

    let x_set = split_asn_set(x);
    split_asn_set(y).iter().any(|c| x_set.contains(c))
}

/// Is `asn` trustworthy enough to anchor a boundary or a score?
pub fn asn_is_unambiguous(asn: Option<&str>) -> bool {
    match asn {
        None => false,
        Some(a) => !a.is_empty() && a != UNRESOLVED_ASN,
    }
}
