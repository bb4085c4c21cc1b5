//! Removal of bounce-through artifacts from AS paths.
//!
//! A middle hop that cannot be resolved makes a path look like it left
//! an AS and came straight back: `[A, *, A]`. Such windows are collapsed
//! to `[A]`.

use crate::asn::UNRESOLVED_ASN;
use hornet_api::AsPath;
use std::collections::VecDeque;

/// Collapse every `[A, *, A]` window of `path` into `[A]`.
///
/// Scans left to right. After a collapse the surviving `A` is
/// re-examined as the head of a new window, so runs like
/// `[A, *, A, *, A]` cascade all the way down to `[A]`. Normalization is
/// idempotent.
pub fn normalize_as_path(path: AsPath) -> AsPath {
    AsPath::from_hops(collapse_unmapped_hops(path.into_hops()))
}

/// [normalize_as_path] over bare tokens.
pub fn collapse_unmapped_hops(hops: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(hops.len());
    let mut rest: VecDeque<String> = hops.into();

    while rest.len() >= 3 {
        if rest[1] == UNRESOLVED_ASN && rest[0] == rest[2] {
            // keep the head, drop the bounce
            rest.remove(1);
            rest.remove(1);
        } else if let Some(head) = rest.pop_front() {
            out.push(head);
        }
    }

    out.extend(rest);
    out
}
