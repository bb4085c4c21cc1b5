//! Turning one probe's boundaries into a report row.

use crate::asn::{asn_is_unambiguous, asns_are_indistinguishable};
use crate::*;
use hornet_api::*;
use std::collections::BTreeSet;

/// The before and after windows of one boundary, plus the observations
/// at its ends.
struct BoundaryWindows {
    t0_obs: Option<String>,
    t1_obs: Option<String>,
    before: Vec<Timestamp>,
    after: Vec<Timestamp>,
}

impl Hornet {
    fn boundary_windows(
        &self,
        probe_id: ProbeId,
        t0: Timestamp,
        t1: Timestamp,
    ) -> HornetResult<(BoundaryWindows, Option<ProbePath>, Option<ProbePath>)>
    {
        let p0 = self.probe_path_at(probe_id, t0)?;
        let p1 = self.probe_path_at(probe_id, t1)?;
        let n = self.config().num_strides;
        let windows = BoundaryWindows {
            t0_obs: p0.as_ref().and_then(|p| p.observation()).map(Into::into),
            t1_obs: p1.as_ref().and_then(|p| p.observation()).map(Into::into),
            before: self.instants_from_stride(t0, n, Stride::Backward),
            after: self.instants_from_stride(t1, n, Stride::Forward),
        };
        Ok((windows, p0, p1))
    }

    fn before_after_sets(
        &self,
        w: &BoundaryWindows,
    ) -> HornetResult<(ProbeTimes, ProbeTimes)> {
        let before = self.anonymity_set_wide(
            w.t0_obs.as_deref(),
            asns_are_indistinguishable,
            &w.before,
        )?;
        let after = self.anonymity_set_wide(
            w.t1_obs.as_deref(),
            asns_are_indistinguishable,
            &w.after,
        )?;
        Ok((before, after))
    }

    /// Distinct ASes in the before anonymity set of a boundary, and in the
    /// intersection of the before and after sets.
    pub fn analyze_boundary_ases(
        &self,
        probe_id: ProbeId,
        t0: Timestamp,
        t1: Timestamp,
    ) -> HornetResult<(usize, usize)> {
        let (w, _, _) = self.boundary_windows(probe_id, t0, t1)?;
        let (before, after) = self.before_after_sets(&w)?;
        let before = self.uniq_ases(&before)?;
        let after = self.uniq_ases(&after)?;
        Ok((before.len(), before.intersection(&after).count()))
    }

    /// Addresses covered by the before anonymity set of a boundary, and
    /// by the prefixes common to the before and after sets.
    pub fn analyze_boundary_prefixes(
        &self,
        probe_id: ProbeId,
        t0: Timestamp,
        t1: Timestamp,
    ) -> HornetResult<(u128, u128)> {
        let (w, _, _) = self.boundary_windows(probe_id, t0, t1)?;
        let (before, after) = self.before_after_sets(&w)?;
        let before = self.uniq_prefixes(&before)?;
        let after = self.uniq_prefixes(&after)?;
        Ok((
            address::address_count(before.iter().map(String::as_str))?,
            address::address_count(
                before.intersection(&after).map(String::as_str),
            )?,
        ))
    }

    /// Analyze the first usable boundary of `boundaries`, which should be
    /// ordered most precise first.
    ///
    /// A boundary is usable if it was found, the probe is measured at
    /// both ends, and both observations are unambiguous. If the probe
    /// moved across the boundary it is skipped as well, unless
    /// [Config::skip_relocated_boundaries] is off.
    pub fn analyze_boundaries(
        &self,
        probe_id: ProbeId,
        boundaries: &[Boundary<Timestamp>],
    ) -> HornetResult<ReportRow> {
        for (t0, t1) in boundaries.iter().filter_map(Boundary::window) {
            let (w, p0, p1) = self.boundary_windows(probe_id, t0, t1)?;

            let (Some(p0), Some(p1)) = (&p0, &p1) else {
                tracing::info!(
                    probe_id,
                    %t0,
                    %t1,
                    "Ignoring boundary where the probe was not measured"
                );
                continue;
            };

            if !p0.location.same_place(&p1.location) {
                tracing::info!(
                    probe_id,
                    %t0,
                    %t1,
                    from = ?p0.location,
                    to = ?p1.location,
                    "Probe location changed across boundary"
                );
                if self.config().skip_relocated_boundaries {
                    continue;
                }
            }

            let (Some(t0_obs), Some(t1_obs)) = (&w.t0_obs, &w.t1_obs) else {
                tracing::info!(
                    probe_id,
                    %t0,
                    %t1,
                    "Ignoring boundary with a path too short to observe"
                );
                continue;
            };
            if !asn_is_unambiguous(Some(t0_obs.as_str()))
                || !asn_is_unambiguous(Some(t1_obs.as_str()))
            {
                tracing::info!(
                    probe_id,
                    %t0,
                    %t1,
                    %t0_obs,
                    %t1_obs,
                    "Ignoring boundary with ambiguous hop"
                );
                continue;
            }

            let all = self.all_known_probes(&w.before)?;
            let valid = self.all_probes_with_valid_obs(&w.before)?;
            let (before, after) = self.before_after_sets(&w)?;

            let before_probes = uniq_probes(&before);
            let before_prefixes = self.uniq_prefixes(&before)?;
            let before_ases = self.uniq_ases(&before)?;

            let itc_probes: BTreeSet<ProbeId> = before_probes
                .intersection(&uniq_probes(&after))
                .copied()
                .collect();
            let itc_prefixes: BTreeSet<String> = before_prefixes
                .intersection(&self.uniq_prefixes(&after)?)
                .cloned()
                .collect();
            let itc_ases: BTreeSet<String> = before_ases
                .intersection(&self.uniq_ases(&after)?)
                .cloned()
                .collect();

            return Ok(ReportRow::Found(BoundaryReport {
                msm_id: self.msm_id(),
                probe_id,
                t0,
                t1,
                t0_obs: t0_obs.clone(),
                t1_obs: t1_obs.clone(),
                all: self.probe_times_stats(&all)?,
                valid: self.probe_times_stats(&valid)?,
                before: SetStats::from_sets(
                    &before_probes,
                    &before_prefixes,
                    &before_ases,
                )?,
                intersection: SetStats::from_sets(
                    &itc_probes,
                    &itc_prefixes,
                    &itc_ases,
                )?,
            }));
        }

        Ok(ReportRow::NoBoundary {
            msm_id: self.msm_id(),
            probe_id,
        })
    }
}
