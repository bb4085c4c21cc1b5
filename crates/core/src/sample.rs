//! Probe sampling weighted by prefix size.

use crate::address::Prefix;
use crate::Hornet;
use hornet_api::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

fn origin_asn<'a>(paths: &'a ProbePaths, probe: &ProbeId) -> &'a str {
    paths
        .get(probe)
        .map(|path| path.location.asn.as_str())
        .unwrap_or_default()
}

impl Hornet {
    /// Draw probes from `probes` until `as_thresh` distinct origin ASes
    /// have been chosen.
    ///
    /// A prefix is picked with probability proportional to its size, then
    /// a probe uniformly from those in it, using their locations at `t`.
    /// Probes not measured at `t` are never drawn. A prefix leaves the
    /// pool once none of its remaining probes would add a new AS, and
    /// drawing stops when the pool is empty. Sampling is seeded with
    /// [crate::Config::sample_seed], so runs are reproducible.
    pub fn sample_probes_by_as_thresh(
        &self,
        probes: &[ProbeId],
        t: Timestamp,
        as_thresh: usize,
        with_replacement: bool,
    ) -> HornetResult<Vec<ProbeId>> {
        let paths = self.probe_paths(t)?;

        let mut by_prefix: BTreeMap<&str, Vec<ProbeId>> = BTreeMap::new();
        for p in probes {
            if let Some(path) = paths.get(p) {
                by_prefix
                    .entry(path.location.prefix.as_str())
                    .or_default()
                    .push(*p);
            }
        }

        let mut pool = Vec::with_capacity(by_prefix.len());
        for (pfx, members) in by_prefix {
            let weight = pfx.parse::<Prefix>()?.num_addresses() as f64;
            pool.push((weight, members));
        }

        let mut rng = StdRng::seed_from_u64(self.config().sample_seed);
        let mut chosen_ases: BTreeSet<&str> = BTreeSet::new();
        let mut chosen = Vec::new();

        while chosen_ases.len() < as_thresh {
            pool.retain(|(_, members)| {
                members
                    .iter()
                    .any(|p| !chosen_ases.contains(origin_asn(&paths, p)))
            });
            let Some(last) = pool.len().checked_sub(1) else {
                break;
            };

            let cumulative: Vec<f64> = pool
                .iter()
                .scan(0.0_f64, |acc, (w, _)| {
                    *acc += w;
                    Some(*acc)
                })
                .collect();
            let r = rng.gen::<f64>() * cumulative[last];
            let idx = cumulative.partition_point(|c| *c <= r).min(last);

            let members = &mut pool[idx].1;
            let Some(probe) = members.choose(&mut rng).copied() else {
                continue;
            };
            if !with_replacement {
                members.retain(|p| *p != probe);
            }
            chosen.push(probe);
            chosen_ases.insert(origin_asn(&paths, &probe));
        }

        tracing::info!(
            ases = chosen_ases.len(),
            probes = chosen.len(),
            "Sampled probes"
        );

        Ok(chosen)
    }
}
