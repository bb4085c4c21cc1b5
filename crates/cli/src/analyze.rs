//! Report rows for the probes whose upstream changed.

use hornet_api::*;
use hornet_core::*;
use std::collections::BTreeSet;

fn first_occurrences(probes: Vec<ProbeId>) -> Vec<ProbeId> {
    let mut seen = BTreeSet::new();
    probes.into_iter().filter(|p| seen.insert(*p)).collect()
}

/// Sample the probes whose observation differs between `start` and `end`,
/// then search and analyze each one, handing every row to `emit`.
///
/// Each sampled probe yields exactly one row, in sampling order, however
/// many times it was drawn. A failure on one probe is logged and that
/// probe skipped.
pub fn analyze_sampled(
    hornet: &Hornet,
    start: Timestamp,
    end: Timestamp,
    mut emit: impl FnMut(ReportRow),
) -> HornetResult<()> {
    let diffs = hornet.hornet_diffs(start, end)?;
    tracing::info!(count = diffs.len(), "Probes with an upstream change");

    let sampled = first_occurrences(hornet.sample_probes_by_as_thresh(
        &diffs,
        start,
        hornet.config().as_thresh,
        true,
    )?);

    for probe in sampled {
        tracing::info!(probe, "Analyzing probe");
        let row = hornet
            .search_for_boundaries(probe, start, end)
            .and_then(|b| hornet.analyze_boundaries(probe, &b));
        match row {
            Ok(row) => emit(row),
            Err(err) => tracing::warn!(?err, probe, "Failed to analyze probe"),
        }
    }

    Ok(())
}
