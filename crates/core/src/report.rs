//! One result row per analyzed probe.

use crate::SetStats;
use hornet_api::{ProbeId, Timestamp};

/// Column names of a [ReportRow::Found] row, in order.
pub const REPORT_HEADER: [&str; 26] = [
    "MSM_ID",
    "PROBE_ID",
    "T0",
    "T1",
    "T0_OBS",
    "T1_OBS",
    "#_ALL_PROBES",
    "#_ALL_PFX",
    "#_ALL_ADDR",
    "PCT_ALL_ADDR",
    "NUM_ALL_ASES",
    "#_VALID_PROBES",
    "#_VALID_PFX",
    "#_VALID_ADDR",
    "PCT_VALID_ADDR",
    "NUM_VALID_ASES",
    "#_PRV_PROBE",
    "#_PRV_PFX",
    "#_PRV_ADDR",
    "PCT_PRV_ADDR",
    "NUM_PRV_ASES",
    "#_ITC_PROBES",
    "#_ITC_PFX",
    "#_ITC_ADDR",
    "PCT_ITC_ADDR",
    "NUM_ITC_ASES",
];

/// Marker of a probe for which no boundary survived filtering.
pub const NO_BOUNDARY: &str = "NIL";

/// The analysis of one probe's first usable boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryReport {
    /// Measurement id.
    pub msm_id: u64,

    /// Probe id.
    pub probe_id: ProbeId,

    /// Last instant before the change.
    pub t0: Timestamp,

    /// First instant after the change.
    pub t1: Timestamp,

    /// Observation at `t0`.
    pub t0_obs: String,

    /// Observation at `t1`.
    pub t1_obs: String,

    /// Every probe measured during the before window.
    pub all: SetStats,

    /// Probes with an unambiguous observation during the before window.
    pub valid: SetStats,

    /// The before anonymity set.
    pub before: SetStats,

    /// The before and after anonymity sets intersected, each projection
    /// separately.
    pub intersection: SetStats,
}

/// A row of the boundary report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRow {
    /// A boundary was analyzed.
    Found(BoundaryReport),

    /// No boundary survived filtering.
    NoBoundary {
        /// Measurement id.
        msm_id: u64,

        /// Probe id.
        probe_id: ProbeId,
    },
}

impl ReportRow {
    /// The probe this row is about.
    pub fn probe_id(&self) -> ProbeId {
        match self {
            Self::Found(r) => r.probe_id,
            Self::NoBoundary { probe_id, .. } => *probe_id,
        }
    }
}

/// A multi-origin token with its `,` separators written as `_`, so that
/// it stays one column.
fn csv_token(token: &str) -> String {
    token.replace(',', "_")
}

impl std::fmt::Display for ReportRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(r) => write!(
                f,
                "{},{},{},{},{},{},{},{},{},{}",
                r.msm_id,
                r.probe_id,
                r.t0,
                r.t1,
                csv_token(&r.t0_obs),
                csv_token(&r.t1_obs),
                r.all,
                r.valid,
                r.before,
                r.intersection,
            ),
            Self::NoBoundary { msm_id, probe_id } => {
                write!(f, "{msm_id},{probe_id},{NO_BOUNDARY}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn row_columns_match_header() {
        let stats = SetStats {
            probes: 3,
            prefixes: 2,
            addresses: 512,
            fraction: 0.5,
            ases: 1,
        };
        let row = ReportRow::Found(BoundaryReport {
            msm_id: 5001,
            probe_id: 42,
            t0: Timestamp::from_secs(100),
            t1: Timestamp::from_secs(200),
            t0_obs: "64500".into(),
            t1_obs: "64501".into(),
            all: stats,
            valid: stats,
            before: stats,
            intersection: SetStats::default(),
        });
        let line = row.to_string();
        assert_eq!(REPORT_HEADER.len(), line.split(',').count());
        assert!(line.starts_with("5001,42,100,200,64500,64501,3,2,512,0.5,1,"));
        assert!(line.ends_with(",0,0,0,0,0"));
        assert_eq!(42, row.probe_id());
    }

    #[test]
    fn multi_origin_observation_stays_one_column() {
        let row = ReportRow::Found(BoundaryReport {
            msm_id: 5001,
            probe_id: 42,
            t0: Timestamp::from_secs(100),
            t1: Timestamp::from_secs(200),
            t0_obs: "64500,64501".into(),
            t1_obs: "64502_64503,64504".into(),
            all: SetStats::default(),
            valid: SetStats::default(),
            before: SetStats::default(),
            intersection: SetStats::default(),
        });
        let line = row.to_string();
        assert_eq!(REPORT_HEADER.len(), line.split(',').count());
        assert!(line
            .starts_with("5001,42,100,200,64500_64501,64502_64503_64504,"));
    }

    #[test]
    fn no_boundary_row() {
        let row = ReportRow::NoBoundary {
            msm_id: 5001,
            probe_id: 7,
        };
        assert_eq!("5001,7,NIL", row.to_string());
    }
}
