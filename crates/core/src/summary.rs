//! Per-AS summary of observed upstream changes.

use crate::asn::split_asn_set;
use crate::{list_of_boundaries, Hornet, ObservedAt};
use hornet_api::*;
use std::collections::BTreeMap;

/// How often probes in one origin AS saw their upstream change, and how
/// large their anonymity sets were around the changes.
#[derive(Debug, Clone, PartialEq)]
pub struct AsChangeSummary {
    /// The origin AS.
    pub asn: String,

    /// Mean number of changes per probe.
    pub mean_changes: f64,

    /// Mean over probes of the mean before-set AS count, `None` if no
    /// probe in this AS changed.
    pub mean_before: Option<f64>,

    /// Mean over probes of the mean before-and-after AS count.
    pub mean_after: Option<f64>,
}

impl std::fmt::Display for AsChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opt = |v: Option<f64>| match v {
            Some(v) => v.to_string(),
            None => "nan".to_string(),
        };
        write!(
            f,
            "{},{},{},{}",
            self.asn,
            self.mean_changes,
            opt(self.mean_before),
            opt(self.mean_after)
        )
    }
}

fn mean<I: IntoIterator<Item = f64>>(it: I) -> Option<f64> {
    let (sum, n) = it
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Default)]
struct Tally {
    changes: Vec<f64>,
    before: Vec<f64>,
    after: Vec<f64>,
}

impl Hornet {
    /// Summarize upstream changes of single-origin, stably located probes
    /// across `instants`, grouped by origin AS.
    ///
    /// At most `max_probes` probes are analyzed. A failure while analyzing
    /// one probe is logged and that probe skipped.
    pub fn as_change_summary(
        &self,
        instants: &[Timestamp],
        max_probes: Option<usize>,
    ) -> HornetResult<Vec<AsChangeSummary>> {
        let Some(first) = instants.first().copied() else {
            return Ok(Vec::new());
        };

        let stable = self.stable_location_probes(instants)?;
        let first_paths = self.probe_paths(first)?;
        let origin_of = |p: &ProbeId| {
            first_paths.get(p).map(|path| path.location.asn.as_str())
        };

        let mut single_origin: Vec<ProbeId> = stable
            .iter()
            .filter(|p| {
                origin_of(*p).is_some_and(|asn| split_asn_set(asn).len() == 1)
            })
            .copied()
            .collect();
        if let Some(max) = max_probes {
            single_origin.truncate(max);
        }

        let seqs = self.observation_sequences(&stable, instants)?;
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

        for (idx, probe) in single_origin.iter().enumerate() {
            if idx % 10 == 0 {
                tracing::info!(
                    "Analyzing probe {idx} of {}",
                    single_origin.len()
                );
            }
            let (Some(asn), Some(seq)) = (origin_of(probe), seqs.get(probe))
            else {
                continue;
            };
            let tally = tallies.entry(asn.to_string()).or_default();
            if let Err(err) = self.tally_probe(*probe, seq, tally) {
                tracing::warn!(?err, probe, "Failed to analyze probe");
            }
        }

        Ok(tallies
            .into_iter()
            .map(|(asn, t)| AsChangeSummary {
                asn,
                mean_changes: mean(t.changes).unwrap_or(0.0),
                mean_before: mean(t.before),
                mean_after: mean(t.after),
            })
            .collect())
    }

    fn tally_probe(
        &self,
        probe_id: ProbeId,
        seq: &[ObservedAt],
        tally: &mut Tally,
    ) -> HornetResult<()> {
        let boundaries = list_of_boundaries(seq);
        tally.changes.push(boundaries.len() as f64);
        if boundaries.is_empty() {
            return Ok(());
        }

        let mut before = Vec::with_capacity(boundaries.len());
        let mut after = Vec::with_capacity(boundaries.len());
        for (t0, t1) in boundaries {
            let (b, a) = self.analyze_boundary_ases(probe_id, t0, t1)?;
            before.push(b as f64);
            after.push(a as f64);
        }

        tally.before.extend(mean(before));
        tally.after.extend(mean(after));
        Ok(())
    }
}
