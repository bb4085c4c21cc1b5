use hornet_api::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Snapshots stored as JSON files, one directory per measurement.
///
/// ```text
/// <root>/<msm_id>/interval           measurement interval in seconds
/// <root>/<msm_id>/<unix-secs>.json   ProbePaths of one snapped instant
/// ```
///
/// A missing snapshot file reads as an empty snapshot.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    /// Read snapshots under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn msm_dir(&self, msm_id: u64) -> PathBuf {
        self.root.join(msm_id.to_string())
    }
}

fn read_err<E>(path: &Path, err: E) -> HornetError
where
    E: std::error::Error + 'static + Send + Sync,
{
    HornetError::other_src(format!("failed to read {}", path.display()), err)
}

impl ProbePathSource for JsonDirSource {
    fn measurement_interval(&self, msm_id: u64) -> HornetResult<u64> {
        let path = self.msm_dir(msm_id).join("interval");
        let text =
            std::fs::read_to_string(&path).map_err(|e| read_err(&path, e))?;
        text.trim().parse().map_err(|e| read_err(&path, e))
    }

    fn probe_paths(
        &self,
        msm_id: u64,
        instant: Timestamp,
    ) -> HornetResult<ProbePaths> {
        let path = self.msm_dir(msm_id).join(format!("{instant}.json"));
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No snapshot");
                return Ok(ProbePaths::new());
            }
            Err(err) => return Err(read_err(&path, err)),
        };
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| read_err(&path, e))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_snapshots_and_interval() {
        let dir = tempfile::tempdir().unwrap();
        let msm = dir.path().join("5001");
        std::fs::create_dir(&msm).unwrap();
        std::fs::write(msm.join("interval"), "900\n").unwrap();
        std::fs::write(
            msm.join("1800.json"),
            r#"{"7":{"location":{"ip_addr":"192.0.2.1","prefix":"192.0.2.0/24","asn":"64500"},"as_path":["64500","64501","15169"]}}"#,
        )
        .unwrap();

        let s = JsonDirSource::new(dir.path());
        assert_eq!(900, s.measurement_interval(5001).unwrap());

        let paths = s.probe_paths(5001, Timestamp::from_secs(1800)).unwrap();
        assert_eq!(Some("64501"), paths[&7].observation());

        assert!(s
            .probe_paths(5001, Timestamp::from_secs(2700))
            .unwrap()
            .is_empty());
        assert!(s.measurement_interval(5002).is_err());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let msm = dir.path().join("1");
        std::fs::create_dir(&msm).unwrap();
        std::fs::write(msm.join("interval"), "not a number").unwrap();
        std::fs::write(msm.join("0.json"), "{").unwrap();

        let s = JsonDirSource::new(dir.path());
        assert!(s.measurement_interval(1).is_err());
        assert!(s.probe_paths(1, Timestamp::from_secs(0)).is_err());
    }
}
