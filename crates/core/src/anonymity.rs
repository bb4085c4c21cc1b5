//! Indistinguishability sets and their cardinalities.
//!
//! Set membership is decided pairwise against a single reference
//! observation. Since [crate::asn::asns_are_indistinguishable] is not
//! transitive, two members of one set may be distinguishable from each
//! other.

use crate::address::{address_count, fraction_of_allocable};
use crate::asn::{asn_is_unambiguous, split_asn_set};
use crate::Hornet;
use hornet_api::*;
use std::collections::{BTreeMap, BTreeSet};

/// A set of probe-instant pairs.
pub type ProbeTimes = BTreeSet<ProbeTime>;

/// Cardinalities of one set of probe-instant pairs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetStats {
    /// Distinct probes.
    pub probes: usize,

    /// Distinct enclosing prefixes.
    pub prefixes: usize,

    /// Addresses covered by those prefixes.
    pub addresses: u128,

    /// `addresses` as a fraction of the allocable IPv4 space.
    pub fraction: f64,

    /// Distinct candidate origin ASes.
    pub ases: usize,
}

impl SetStats {
    /// Measure already-projected sets.
    pub fn from_sets(
        probes: &BTreeSet<ProbeId>,
        prefixes: &BTreeSet<String>,
        ases: &BTreeSet<String>,
    ) -> HornetResult<Self> {
        let addresses = address_count(prefixes.iter().map(String::as_str))?;
        Ok(Self {
            probes: probes.len(),
            prefixes: prefixes.len(),
            addresses,
            fraction: fraction_of_allocable(addresses),
            ases: ases.len(),
        })
    }
}

impl std::fmt::Display for SetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.probes, self.prefixes, self.addresses, self.fraction, self.ases
        )
    }
}

/// The distinct probes of a set.
pub fn uniq_probes(probe_times: &ProbeTimes) -> BTreeSet<ProbeId> {
    probe_times.iter().map(|pt| pt.probe_id).collect()
}

impl Hornet {
    /// Probes at `instant` whose observation is `eq_fn`-equivalent to
    /// `observation`.
    pub fn anonymity_set<F>(
        &self,
        observation: Option<&str>,
        eq_fn: F,
        instant: Timestamp,
    ) -> HornetResult<ProbeTimes>
    where
        F: Fn(Option<&str>, Option<&str>) -> bool,
    {
        let instant = self.snap(instant);
        Ok(self
            .probe_paths(instant)?
            .iter()
            .filter(|(_, path)| eq_fn(path.observation(), observation))
            .map(|(probe, _)| ProbeTime::new(*probe, instant))
            .collect())
    }

    /// The union of [Hornet::anonymity_set] over `instants`.
    pub fn anonymity_set_wide<F>(
        &self,
        observation: Option<&str>,
        eq_fn: F,
        instants: &[Timestamp],
    ) -> HornetResult<ProbeTimes>
    where
        F: Fn(Option<&str>, Option<&str>) -> bool,
    {
        let mut out = ProbeTimes::new();
        for t in instants {
            out.extend(self.anonymity_set(observation, &eq_fn, *t)?);
        }
        Ok(out)
    }

    /// Every probe measured at any of `instants`.
    pub fn all_known_probes(
        &self,
        instants: &[Timestamp],
    ) -> HornetResult<ProbeTimes> {
        self.anonymity_set_wide(None, |_, _| true, instants)
    }

    /// Every probe with an unambiguous observation at any of `instants`.
    pub fn all_probes_with_valid_obs(
        &self,
        instants: &[Timestamp],
    ) -> HornetResult<ProbeTimes> {
        self.anonymity_set_wide(None, |o, _| asn_is_unambiguous(o), instants)
    }

    fn locations_of(
        &self,
        probe_times: &ProbeTimes,
    ) -> HornetResult<Vec<NetworkLocation>> {
        let mut by_instant: BTreeMap<Timestamp, Vec<ProbeId>> = BTreeMap::new();
        for pt in probe_times {
            by_instant.entry(pt.instant).or_default().push(pt.probe_id);
        }

        let mut out = Vec::with_capacity(probe_times.len());
        for (instant, probes) in by_instant {
            let mut paths = self.probe_paths(instant)?;
            out.extend(
                probes
                    .iter()
                    .filter_map(|p| paths.remove(p))
                    .map(|path| path.location),
            );
        }
        Ok(out)
    }

    /// The distinct prefixes enclosing the members of a set, each at its
    /// own instant.
    pub fn uniq_prefixes(
        &self,
        probe_times: &ProbeTimes,
    ) -> HornetResult<BTreeSet<String>> {
        Ok(self
            .locations_of(probe_times)?
            .into_iter()
            .map(|l| l.prefix)
            .collect())
    }

    /// The distinct origin ASes of the members of a set.
    ///
    /// A multi-origin token contributes every one of its candidates.
    pub fn uniq_ases(
        &self,
        probe_times: &ProbeTimes,
    ) -> HornetResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for l in self.locations_of(probe_times)? {
            out.extend(split_asn_set(&l.asn).into_iter().map(str::to_string));
        }
        Ok(out)
    }

    /// [SetStats] of a set.
    pub fn probe_times_stats(
        &self,
        probe_times: &ProbeTimes,
    ) -> HornetResult<SetStats> {
        SetStats::from_sets(
            &uniq_probes(probe_times),
            &self.uniq_prefixes(probe_times)?,
            &self.uniq_ases(probe_times)?,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stats_display_and_measure() {
        let probes = [1, 2, 3].into_iter().collect();
        let prefixes = ["192.0.2.0/24".to_string(), "198.51.100.0/25".into()]
            .into_iter()
            .collect();
        let ases = ["64500".to_string()].into_iter().collect();
        let s = SetStats::from_sets(&probes, &prefixes, &ases).unwrap();
        assert_eq!(3, s.probes);
        assert_eq!(2, s.prefixes);
        assert_eq!(384, s.addresses);
        assert_eq!(1, s.ases);
        assert!(s.fraction > 0.0 && s.fraction < 1e-6);
        assert!(s.to_string().starts_with("3,2,384,"));
        assert!(s.to_string().ends_with(",1"));
    }

    #[test]
    fn empty_stats() {
        let s = SetStats::from_sets(
            &BTreeSet::new(),
            &BTreeSet::new(),
            &BTreeSet::new(),
        )
        .unwrap();
        assert_eq!(SetStats::default(), s);
        assert_eq!("0,0,0,0,0", s.to_string());
    }

    #[test]
    fn uniq_probes_across_instants() {
        let set: ProbeTimes = [
            ProbeTime::new(1, Timestamp::from_secs(0)),
            ProbeTime::new(1, Timestamp::from_secs(10)),
            ProbeTime::new(2, Timestamp::from_secs(10)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            [1, 2].into_iter().collect::<BTreeSet<_>>(),
            uniq_probes(&set)
        );
    }
}
