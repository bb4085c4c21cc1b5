//! The collaborator supplying traceroute-derived probe paths.

use crate::{HornetResult, ProbePaths, Timestamp};
use std::sync::Arc;

/// Supplies the per-interval probe to path mapping of a measurement.
///
/// Fetching raw traceroutes and resolving them against a routing table
/// happens behind this trait. Implementations may block.
pub trait ProbePathSource: 'static + Send + Sync + std::fmt::Debug {
    /// The fixed grid width of measurement `msm_id`, in seconds.
    fn measurement_interval(&self, msm_id: u64) -> HornetResult<u64>;

    /// Every probe's path for the interval starting at `instant`.
    ///
    /// `instant` is already snapped. Probes whose origin address could not
    /// be mapped to a prefix and AS must not appear in the result.
    fn probe_paths(
        &self,
        msm_id: u64,
        instant: Timestamp,
    ) -> HornetResult<ProbePaths>;
}

/// Trait-object [ProbePathSource].
pub type DynProbePathSource = Arc<dyn ProbePathSource>;
