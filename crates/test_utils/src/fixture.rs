//! An in-memory [ProbePathSource] of hand-built snapshots.

use hornet_api::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The destination AS every fixture path ends in.
pub const DEST_ASN: &str = "15169";

/// A fixed location for `probe_id`, inside origin AS `asn`.
///
/// Each probe sits alone in its own /24.
pub fn probe_location(probe_id: ProbeId, asn: &str) -> NetworkLocation {
    let (a, b) = ((probe_id >> 8) & 0xff, probe_id & 0xff);
    NetworkLocation::new(
        format!("100.{a}.{b}.1"),
        format!("100.{a}.{b}.0/24"),
        asn,
    )
}

/// Snapshots of a single measurement, answering for any measurement id.
///
/// Instants with no snapshot yield an empty one.
#[derive(Debug)]
pub struct FixtureSource {
    interval: u64,
    snapshots: BTreeMap<Timestamp, ProbePaths>,
    fetches: AtomicUsize,
}

impl FixtureSource {
    /// An empty source on a grid of `interval` seconds.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            snapshots: BTreeMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Record `path` for `probe_id` at `secs`, snapped.
    pub fn with_path(
        mut self,
        secs: i64,
        probe_id: ProbeId,
        path: ProbePath,
    ) -> Self {
        let t = Timestamp::from_secs(secs).snap(self.interval);
        self.snapshots.entry(t).or_default().insert(probe_id, path);
        self
    }

    /// Record that `probe_id`, located in `origin`, observed `upstream`
    /// at `secs`.
    pub fn with_observation(
        self,
        secs: i64,
        probe_id: ProbeId,
        origin: &str,
        upstream: &str,
    ) -> Self {
        let path = ProbePath::new(
            probe_location(probe_id, origin),
            AsPath::from_hops([origin, upstream, DEST_ASN]),
        );
        self.with_path(secs, probe_id, path)
    }

    /// [FixtureSource::with_observation] at every grid point in
    /// `from..to`.
    pub fn with_span(
        mut self,
        from: i64,
        to: i64,
        probe_id: ProbeId,
        origin: &str,
        upstream: &str,
    ) -> Self {
        let step = self.interval as usize;
        for secs in (from..to).step_by(step) {
            self = self.with_observation(secs, probe_id, origin, upstream);
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// How many snapshots have been fetched.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ProbePathSource for FixtureSource {
    fn measurement_interval(&self, _msm_id: u64) -> HornetResult<u64> {
        Ok(self.interval)
    }

    fn probe_paths(
        &self,
        _msm_id: u64,
        instant: Timestamp,
    ) -> HornetResult<ProbePaths> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .snapshots
            .get(&instant.snap(self.interval))
            .cloned()
            .unwrap_or_default())
    }
}
