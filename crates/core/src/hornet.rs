//! The analysis context.

use crate::asn::{asns_are_indistinguishable, UNRESOLVED_ASN};
use crate::boundary_search::{boundary_search, SearchAxis};
use crate::cache::Cached;
use crate::Config;
use hornet_api::*;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Each probe's location at every instant it was seen, keyed by probe.
pub type ProbeLocations = BTreeMap<ProbeId, Vec<NetworkLocation>>;

/// A probe's observation at one instant.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct ObservedAt {
    /// The observed upstream AS, `None` if the probe had no path.
    pub observation: Option<String>,

    /// The snapped instant.
    pub instant: Timestamp,
}

/// Each probe's observations in instant order, keyed by probe.
pub type ObservationSequences = BTreeMap<ProbeId, Vec<ObservedAt>>;

/// Which way [Hornet::instants_from_stride] walks the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stride {
    /// Toward later instants.
    Forward,

    /// Toward earlier instants.
    Backward,
}

impl Stride {
    fn sign(&self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Probe ids present in both snapshots, ascending.
pub fn common_probes(a: &ProbePaths, b: &ProbePaths) -> Vec<ProbeId> {
    a.keys().filter(|k| b.contains_key(k)).copied().collect()
}

/// Adjacent pairs of a sequence across which the observation changed.
///
/// Both observations must be present, resolved, and distinguishable.
pub fn list_of_boundaries(seq: &[ObservedAt]) -> Vec<(Timestamp, Timestamp)> {
    seq.windows(2)
        .filter_map(|w| {
            let x = w[0].observation.as_deref()?;
            let y = w[1].observation.as_deref()?;
            if x == UNRESOLVED_ASN || y == UNRESOLVED_ASN {
                return None;
            }
            if asns_are_indistinguishable(Some(x), Some(y)) {
                return None;
            }
            Some((w[0].instant, w[1].instant))
        })
        .collect()
}

/// The boundary-search class relation: two missing observations are the
/// same class, otherwise [asns_are_indistinguishable].
fn same_observation_class(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        _ => asns_are_indistinguishable(a, b),
    }
}

fn digest<I: IntoIterator<Item = [u8; 8]>>(items: I) -> String {
    let mut hasher = Sha256::new();
    for i in items {
        hasher.update(i);
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
struct Snapshots {
    msm_id: u64,
    interval: u64,
    source: DynProbePathSource,
}

impl Snapshots {
    fn at(&self, instant: Timestamp) -> HornetResult<ProbePaths> {
        self.source
            .probe_paths(self.msm_id, instant.snap(self.interval))
    }

    fn probe_locations(
        &self,
        instants: &[Timestamp],
    ) -> HornetResult<ProbeLocations> {
        let mut out = ProbeLocations::new();
        let (Some(first), Some(last)) = (instants.first(), instants.last())
        else {
            return Ok(out);
        };
        let probes = common_probes(&self.at(*first)?, &self.at(*last)?);

        for t in instants {
            let paths = self.at(*t)?;
            for p in &probes {
                if let Some(path) = paths.get(p) {
                    out.entry(*p).or_default().push(path.location.clone());
                }
            }
        }

        Ok(out)
    }

    fn observation_sequences(
        &self,
        probes: &[ProbeId],
        instants: &[Timestamp],
    ) -> HornetResult<ObservationSequences> {
        let mut out = ObservationSequences::new();

        for t in instants {
            let instant = t.snap(self.interval);
            let paths = self.at(instant)?;
            for p in probes {
                let observation = paths
                    .get(p)
                    .and_then(|path| path.observation())
                    .map(str::to_string);
                out.entry(*p).or_default().push(ObservedAt {
                    observation,
                    instant,
                });
            }
        }

        Ok(out)
    }
}

/// One measurement campaign's analysis context.
///
/// Holds the snapshot source, the durable store the expensive derived
/// lookups are cached in, and the run configuration. Every instant
/// passed in is snapped to the measurement grid before use.
#[derive(Debug)]
pub struct Hornet {
    snaps: Snapshots,
    config: Config,
    locations: Cached<[Timestamp], ProbeLocations>,
    obs_seqs: Cached<(Vec<ProbeId>, Vec<Timestamp>), ObservationSequences>,
}

impl Hornet {
    /// Set up the context for measurement `msm_id`.
    ///
    /// Fetches the measurement interval from `source`.
    pub fn new(
        msm_id: u64,
        source: DynProbePathSource,
        store: DynStore,
        config: Config,
    ) -> HornetResult<Self> {
        let interval = source.measurement_interval(msm_id)?;
        if interval == 0 {
            return Err(HornetError::other(format!(
                "measurement {msm_id} has a zero-length interval"
            )));
        }
        let snaps = Snapshots {
            msm_id,
            interval,
            source,
        };

        let s = snaps.clone();
        let locations = Cached::new(
            move |instants: &[Timestamp]| s.probe_locations(instants),
            "common_probe_locations",
            move |instants: &[Timestamp]| {
                format!(
                    "{msm_id} - {}",
                    digest(instants.iter().map(|t| t.as_secs().to_le_bytes()))
                )
            },
            store.clone(),
            None,
        );

        let s = snaps.clone();
        let obs_seqs = Cached::new(
            move |(probes, instants): &(Vec<ProbeId>, Vec<Timestamp>)| {
                s.observation_sequences(probes, instants)
            },
            "hornet_obs_seqs",
            move |(probes, instants): &(Vec<ProbeId>, Vec<Timestamp>)| {
                let mut sorted = probes.clone();
                sorted.sort_unstable();
                format!(
                    "{msm_id} - {} - {}",
                    digest(sorted.iter().map(|p| p.to_le_bytes())),
                    digest(instants.iter().map(|t| t.as_secs().to_le_bytes()))
                )
            },
            store,
            None,
        );

        Ok(Self {
            snaps,
            config,
            locations,
            obs_seqs,
        })
    }

    /// The measurement this context analyzes.
    pub fn msm_id(&self) -> u64 {
        self.snaps.msm_id
    }

    /// The measurement interval in seconds.
    pub fn interval(&self) -> u64 {
        self.snaps.interval
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snap `t` down to the measurement grid.
    pub fn snap(&self, t: Timestamp) -> Timestamp {
        t.snap(self.snaps.interval)
    }

    /// Every probe's path during the interval containing `t`.
    pub fn probe_paths(&self, t: Timestamp) -> HornetResult<ProbePaths> {
        self.snaps.at(t)
    }

    /// One probe's path during the interval containing `t`, if it was
    /// measured then.
    pub fn probe_path_at(
        &self,
        probe_id: ProbeId,
        t: Timestamp,
    ) -> HornetResult<Option<ProbePath>> {
        Ok(self.probe_paths(t)?.remove(&probe_id))
    }

    /// Grid points from `start`, stepping by `tick` seconds and snapping
    /// each step, up to and including `end`.
    ///
    /// `start` itself is kept as given.
    pub fn analysis_interval_points(
        &self,
        start: Timestamp,
        end: Timestamp,
        tick: u64,
    ) -> HornetResult<Vec<Timestamp>> {
        if start > end {
            return Err(HornetError::other(format!(
                "analysis interval starts at {start} after it ends at {end}"
            )));
        }
        let mut out = vec![start];
        let mut next = self.snap(start.offset(tick as i64));

        while next <= end {
            if out.last().is_some_and(|last| next <= *last) {
                return Err(HornetError::other(format!(
                    "tick of {tick}s does not advance the {}s grid",
                    self.interval()
                )));
            }
            out.push(next);
            next = self.snap(next.offset(tick as i64));
        }

        Ok(out)
    }

    /// `t` followed by `num_strides` instants one interval apart, walking
    /// in `direction`.
    pub fn instants_from_stride(
        &self,
        t: Timestamp,
        num_strides: usize,
        direction: Stride,
    ) -> Vec<Timestamp> {
        let step = self.interval() as i64 * direction.sign();
        (0..=num_strides as i64).map(|i| t.offset(step * i)).collect()
    }

    /// Probes whose observation changed between `start` and `end`.
    ///
    /// A probe counts only if it was measured at both instants from the
    /// same location with a path long enough to observe, neither
    /// observation is unresolved, and the two are distinguishable.
    pub fn hornet_diffs(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> HornetResult<Vec<ProbeId>> {
        let start_paths = self.probe_paths(start)?;
        let end_paths = self.probe_paths(end)?;

        Ok(common_probes(&start_paths, &end_paths)
            .into_iter()
            .filter(|probe| {
                let (p0, p1) = (&start_paths[probe], &end_paths[probe]);
                if !p0.location.same_place(&p1.location) {
                    return false;
                }
                let (Some(o0), Some(o1)) = (p0.observation(), p1.observation())
                else {
                    return false;
                };
                if o0 == UNRESOLVED_ASN || o1 == UNRESOLVED_ASN {
                    return false;
                }
                !asns_are_indistinguishable(Some(o0), Some(o1))
            })
            .collect())
    }

    /// Narrow every change of `probe_id`'s observation between `start`
    /// and `end` down to one measurement interval.
    pub fn search_for_boundaries(
        &self,
        probe_id: ProbeId,
        start: Timestamp,
        end: Timestamp,
    ) -> HornetResult<Vec<Boundary<Timestamp>>> {
        let mut axis = HornetAxis {
            hornet: self,
            probe_id,
        };
        boundary_search(
            &mut axis,
            self.snap(start),
            self.snap(end),
            self.interval(),
            self.config.max_search_steps,
        )
    }

    /// Locations of the probes measured at both the first and last of
    /// `instants`, at every instant they were measured. Cached.
    pub fn common_probe_locations(
        &self,
        instants: &[Timestamp],
    ) -> HornetResult<ProbeLocations> {
        self.locations.call(instants)
    }

    /// Probes whose prefix and origin AS never change across `instants`.
    pub fn stable_location_probes(
        &self,
        instants: &[Timestamp],
    ) -> HornetResult<Vec<ProbeId>> {
        Ok(self
            .common_probe_locations(instants)?
            .into_iter()
            .filter(|(_, locs)| {
                locs.iter()
                    .map(|l| (&l.prefix, &l.asn))
                    .collect::<BTreeSet<_>>()
                    .len()
                    == 1
            })
            .map(|(p, _)| p)
            .collect())
    }

    /// Each of `probes`' observation at every one of `instants`. Cached.
    pub fn observation_sequences(
        &self,
        probes: &[ProbeId],
        instants: &[Timestamp],
    ) -> HornetResult<ObservationSequences> {
        self.obs_seqs.call(&(probes.to_vec(), instants.to_vec()))
    }
}

struct HornetAxis<'a> {
    hornet: &'a Hornet,
    probe_id: ProbeId,
}

impl SearchAxis for HornetAxis<'_> {
    type Index = Timestamp;
    type Key = Option<String>;

    fn key_at(&mut self, idx: Timestamp) -> HornetResult<Option<String>> {
        Ok(self
            .hornet
            .probe_path_at(self.probe_id, idx)?
            .and_then(|p| p.observation().map(str::to_string)))
    }

    fn same_class(&self, a: &Option<String>, b: &Option<String>) -> bool {
        same_observation_class(a.as_deref(), b.as_deref())
    }

    fn metric(&self, lo: Timestamp, hi: Timestamp) -> u64 {
        lo.abs_diff(hi)
    }

    fn mid(&self, lo: Timestamp, hi: Timestamp) -> Timestamp {
        self.hornet.snap(lo.midpoint(hi))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn at(observation: Option<&str>, secs: i64) -> ObservedAt {
        ObservedAt {
            observation: observation.map(str::to_string),
            instant: Timestamp::from_secs(secs),
        }
    }

    #[test]
    fn boundaries_in_sequence() {
        let seq = [
            at(Some("64500"), 0),
            at(Some("64501"), 10),
            at(None, 20),
            at(Some("64500"), 30),
            at(Some("*"), 40),
            at(Some("64502"), 50),
            at(Some("64502_64503"), 60),
            at(Some("64503"), 70),
            at(Some("64504"), 80),
        ];
        assert_eq!(
            vec![
                (Timestamp::from_secs(0), Timestamp::from_secs(10)),
                (Timestamp::from_secs(70), Timestamp::from_secs(80)),
            ],
            list_of_boundaries(&seq)
        );
    }

    #[test]
    fn observation_class() {
        assert!(same_observation_class(None, None));
        assert!(!same_observation_class(None, Some("64500")));
        assert!(same_observation_class(Some("*"), Some("*")));
        assert!(same_observation_class(Some("1_2"), Some("2")));
        assert!(!same_observation_class(Some("1"), Some("2")));
    }

    #[test]
    fn digest_is_stable_hex() {
        let a = digest([1i64.to_le_bytes(), 2i64.to_le_bytes()]);
        let b = digest([1i64.to_le_bytes(), 2i64.to_le_bytes()]);
        let c = digest([2i64.to_le_bytes(), 1i64.to_le_bytes()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(64, a.len());
        assert_eq!(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            digest(std::iter::empty())
        );
    }
}
