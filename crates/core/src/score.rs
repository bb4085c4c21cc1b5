//! Ranking probes by how attributable their observed change is.

use crate::asn::{asns_are_indistinguishable, UNRESOLVED_ASN};
use crate::{common_probes, Hornet};
use hornet_api::*;
use std::collections::HashMap;

/// The share of a snapshot's probes making each observation.
pub type ObservationFrequencies = HashMap<Option<String>, f64>;

/// Normalized observation counts of one snapshot.
///
/// The frequencies sum to one, unless the snapshot is empty.
pub fn observation_frequencies(paths: &ProbePaths) -> ObservationFrequencies {
    let mut out = ObservationFrequencies::new();
    for path in paths.values() {
        let o = path.observation().map(str::to_string);
        *out.entry(o).or_default() += 1.0;
    }
    let total = paths.len() as f64;
    for v in out.values_mut() {
        *v /= total;
    }
    out
}

/// How rare the change from `p0` to `p1` is.
///
/// Zero if the probe relocated, either path is too short to observe,
/// either observation is unresolved, or the two observations are
/// indistinguishable. Otherwise the frequency of the
/// first observation at the first instant over that of the second at
/// the second.
pub fn candidate_score(
    p0: &ProbePath,
    p1: &ProbePath,
    f0: &ObservationFrequencies,
    f1: &ObservationFrequencies,
) -> f64 {
    if !p0.location.same_place(&p1.location) {
        return 0.0;
    }

    let (Some(o0), Some(o1)) = (p0.observation(), p1.observation()) else {
        return 0.0;
    };
    if o0 == UNRESOLVED_ASN || o1 == UNRESOLVED_ASN {
        return 0.0;
    }
    if asns_are_indistinguishable(Some(o0), Some(o1)) {
        return 0.0;
    }

    let freq = |f: &ObservationFrequencies, o: &str| {
        f.get(&Some(o.to_string())).copied().unwrap_or(0.0)
    };
    let denom = freq(f1, o1);
    if denom == 0.0 {
        return 0.0;
    }
    freq(f0, o0) / denom
}

impl Hornet {
    /// [candidate_score] of every probe measured at both `start` and
    /// `end`, highest first. Ties keep probe id order.
    pub fn hornet_scores(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> HornetResult<Vec<(ProbeId, f64)>> {
        let start_paths = self.probe_paths(start)?;
        let end_paths = self.probe_paths(end)?;
        let f0 = observation_frequencies(&start_paths);
        let f1 = observation_frequencies(&end_paths);

        let mut out: Vec<(ProbeId, f64)> =
            common_probes(&start_paths, &end_paths)
                .into_iter()
                .map(|p| {
                    let (p0, p1) = (&start_paths[&p], &end_paths[&p]);
                    (p, candidate_score(p0, p1, &f0, &f1))
                })
                .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn path(ip: &str, hops: &[&str]) -> ProbePath {
        ProbePath::new(
            NetworkLocation::new(ip, "192.0.2.0/24", "64496"),
            AsPath::from_hops(hops.iter().copied()),
        )
    }

    fn freqs(pairs: &[(&str, f64)]) -> ObservationFrequencies {
        pairs
            .iter()
            .map(|(o, f)| (Some(o.to_string()), *f))
            .collect()
    }

    #[test]
    fn frequencies_sum_to_one() {
        let mut paths = ProbePaths::new();
        paths.insert(1, path("192.0.2.1", &["64496", "64500", "1"]));
        paths.insert(2, path("192.0.2.2", &["64496", "64500", "1"]));
        paths.insert(3, path("192.0.2.3", &["64496", "64501", "1"]));
        paths.insert(4, path("192.0.2.4", &["64496"]));
        let f = observation_frequencies(&paths);
        assert_eq!(0.5, f[&Some("64500".to_string())]);
        assert_eq!(0.25, f[&Some("64501".to_string())]);
        assert_eq!(0.25, f[&None::<String>]);
        assert!(observation_frequencies(&ProbePaths::new()).is_empty());
    }

    #[test]
    fn ratio_of_frequencies() {
        let f0 = freqs(&[("64500", 0.1)]);
        let f1 = freqs(&[("64501", 0.4)]);
        let a = path("192.0.2.1", &["64496", "64500", "1"]);
        let b = path("192.0.2.1", &["64496", "64501", "1"]);
        assert_eq!(0.25, candidate_score(&a, &b, &f0, &f1));
    }

    #[test]
    fn zero_when_indistinguishable() {
        let f0 = freqs(&[("64500_64502", 0.01)]);
        let f1 = freqs(&[("64502_64503", 0.9)]);
        let a = path("192.0.2.1", &["64496", "64500_64502", "1"]);
        let b = path("192.0.2.1", &["64496", "64502_64503", "1"]);
        assert_eq!(0.0, candidate_score(&a, &b, &f0, &f1));
    }

    #[test]
    fn zero_when_relocated_or_unresolved() {
        let f0 = freqs(&[("64500", 0.1), ("*", 0.1)]);
        let f1 = freqs(&[("64501", 0.4), ("*", 0.1)]);
        let a = path("192.0.2.1", &["64496", "64500", "1"]);
        let moved = path("192.0.2.9", &["64496", "64501", "1"]);
        assert_eq!(0.0, candidate_score(&a, &moved, &f0, &f1));

        let star = path("192.0.2.1", &["64496", "*", "1"]);
        assert_eq!(0.0, candidate_score(&a, &star, &f0, &f1));
        assert_eq!(0.0, candidate_score(&star, &a, &f0, &f1));
    }

    #[test]
    fn zero_when_observation_missing() {
        let mut f0 = freqs(&[("64500", 0.5)]);
        f0.insert(None, 0.5);
        let f1 = freqs(&[("64501", 1.0)]);
        let short = path("192.0.2.1", &["64496"]);
        let b = path("192.0.2.1", &["64496", "64501", "1"]);
        assert_eq!(0.0, candidate_score(&short, &b, &f0, &f1));
        assert_eq!(0.0, candidate_score(&b, &short, &f1, &f0));
    }
}
