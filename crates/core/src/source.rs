//! Decorators over a [ProbePathSource].

use crate::cache::Cached;
use crate::Config;
use backon::BackoffBuilder;
use hornet_api::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Retries failed collaborator calls with exponential back-off and jitter.
///
/// The last error is returned once the retry ceiling is reached.
#[derive(Debug)]
pub struct RetryingSource<S> {
    inner: S,
    min_delay: Duration,
    max_delay: Duration,
    max_times: usize,
}

impl<S: ProbePathSource> RetryingSource<S> {
    /// Wrap `inner` using the retry settings of `config`.
    pub fn new(inner: S, config: &Config) -> Self {
        Self {
            inner,
            min_delay: config.retry_min_delay,
            max_delay: config.retry_max_delay,
            max_times: config.retry_max_times,
        }
    }

    fn retry<T>(
        &self,
        what: &str,
        mut f: impl FnMut() -> HornetResult<T>,
    ) -> HornetResult<T> {
        let mut back_off = backon::ExponentialBuilder::default()
            .with_factor(2.0)
            .with_jitter()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_times)
            .build();

        loop {
            match f() {
                Ok(r) => return Ok(r),
                Err(err) => match back_off.next() {
                    Some(delay) => {
                        tracing::warn!(
                            ?err,
                            ?delay,
                            "{what} failed, retrying"
                        );
                        std::thread::sleep(delay);
                    }
                    None => return Err(err),
                },
            }
        }
    }
}

impl<S: ProbePathSource> ProbePathSource for RetryingSource<S> {
    fn measurement_interval(&self, msm_id: u64) -> HornetResult<u64> {
        self.retry("measurement_interval", || {
            self.inner.measurement_interval(msm_id)
        })
    }

    fn probe_paths(
        &self,
        msm_id: u64,
        instant: Timestamp,
    ) -> HornetResult<ProbePaths> {
        self.retry("probe_paths", || self.inner.probe_paths(msm_id, instant))
    }
}

/// Memoizes snapshots in a durable [Store].
///
/// Snapshots are keyed `paths-{msm_id} {snapped}`, and the most recently
/// used ones are also kept decoded in memory.
pub struct CachedProbePathSource {
    inner: DynProbePathSource,
    intervals: Mutex<HashMap<u64, u64>>,
    paths: Cached<(u64, Timestamp), ProbePaths>,
}

impl std::fmt::Debug for CachedProbePathSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedProbePathSource")
            .field("inner", &self.inner)
            .field("paths", &self.paths)
            .finish()
    }
}

impl CachedProbePathSource {
    /// Wrap `inner`, caching into `store`.
    pub fn new(
        inner: DynProbePathSource,
        store: DynStore,
        config: &Config,
    ) -> Self {
        let fetch = inner.clone();
        let paths = Cached::new(
            move |(msm_id, instant): &(u64, Timestamp)| {
                fetch.probe_paths(*msm_id, *instant)
            },
            "paths",
            |(msm_id, instant): &(u64, Timestamp)| {
                format!("{msm_id} {instant}")
            },
            store,
            Some(config.memo_max_entries),
        );
        Self {
            inner,
            intervals: Mutex::new(HashMap::new()),
            paths,
        }
    }

    /// Convenience for `Arc::new(Self::new(..))`.
    pub fn create(
        inner: DynProbePathSource,
        store: DynStore,
        config: &Config,
    ) -> DynProbePathSource {
        Arc::new(Self::new(inner, store, config))
    }
}

impl ProbePathSource for CachedProbePathSource {
    fn measurement_interval(&self, msm_id: u64) -> HornetResult<u64> {
        if let Some(i) = self.intervals.lock().unwrap().get(&msm_id) {
            return Ok(*i);
        }
        let interval = self.inner.measurement_interval(msm_id)?;
        self.intervals.lock().unwrap().insert(msm_id, interval);
        Ok(interval)
    }

    fn probe_paths(
        &self,
        msm_id: u64,
        instant: Timestamp,
    ) -> HornetResult<ProbePaths> {
        let snapped = instant.snap(self.measurement_interval(msm_id)?);
        self.paths.call(&(msm_id, snapped))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::PersistentLru;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Flaky {
        fail_first: usize,
        calls: AtomicUsize,
    }

    impl ProbePathSource for Flaky {
        fn measurement_interval(&self, _msm_id: u64) -> HornetResult<u64> {
            Ok(100)
        }

        fn probe_paths(
            &self,
            _msm_id: u64,
            instant: Timestamp,
        ) -> HornetResult<ProbePaths> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(HornetError::other("flaky"));
            }
            let mut out = ProbePaths::new();
            out.insert(
                instant.as_secs() as ProbeId,
                ProbePath::new(
                    NetworkLocation::new("192.0.2.1", "192.0.2.0/24", "64500"),
                    AsPath::from_hops(["64500", "64501", "64510"]),
                ),
            );
            Ok(out)
        }
    }

    #[test]
    fn retries_until_success() {
        let s = RetryingSource::new(
            Flaky {
                fail_first: 2,
                ..Default::default()
            },
            &Config::testing(),
        );
        let paths = s.probe_paths(1, Timestamp::from_secs(200)).unwrap();
        assert_eq!(1, paths.len());
        assert_eq!(3, s.inner.calls.load(Ordering::SeqCst));
    }

    #[test]
    fn gives_up_after_ceiling() {
        let config = Config::testing();
        let s = RetryingSource::new(
            Flaky {
                fail_first: usize::MAX,
                ..Default::default()
            },
            &config,
        );
        assert!(s.probe_paths(1, Timestamp::from_secs(200)).is_err());
        assert_eq!(
            config.retry_max_times + 1,
            s.inner.calls.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn cached_snaps_and_fetches_once() {
        let inner = Arc::new(Flaky::default());
        let store = PersistentLru::create_mem(8);
        let s = CachedProbePathSource::new(
            inner.clone(),
            store.clone(),
            &Config::testing(),
        );

        let a = s.probe_paths(7, Timestamp::from_secs(250)).unwrap();
        let b = s.probe_paths(7, Timestamp::from_secs(299)).unwrap();
        assert_eq!(a, b);
        assert!(a.contains_key(&200));
        assert_eq!(1, inner.calls.load(Ordering::SeqCst));
        assert!(store.has_key("paths-7 200"));
    }
}
