//! config types.

use std::time::Duration;

/// Configuration for a hornet analysis run.
#[derive(Debug, Clone)]
pub struct Config {
    /// The maximum number of entries the durable cache retains.
    ///
    /// Once exceeded, least recently set entries are evicted.
    ///
    /// Defaults:
    /// - `testing = 64`
    /// - `production = 8096`
    pub cache_max_entries: usize,

    /// The maximum number of decoded values held by the in-memory memo
    /// layer in front of the durable cache.
    ///
    /// A full snapshot of probe paths decodes to a few megabytes, so this
    /// should stay small.
    ///
    /// Defaults:
    /// - `testing = 8`
    /// - `production = 64`
    pub memo_max_entries: usize,

    /// How many measurement intervals the before and after windows reach
    /// out from a boundary.
    ///
    /// Defaults:
    /// - `testing = 4`
    /// - `production = 4`
    pub num_strides: usize,

    /// Skip boundaries across which the probe itself moved.
    ///
    /// When false, the relocation is only logged.
    ///
    /// Defaults:
    /// - `testing = true`
    /// - `production = true`
    pub skip_relocated_boundaries: bool,

    /// Hard cap on the number of windows a single boundary search may
    /// examine.
    ///
    /// An axis with many short-lived classes fans the search out toward
    /// one step per grid point. This bounds that.
    ///
    /// Defaults:
    /// - `testing = 4096`
    /// - `production = 1_000_000`
    pub max_search_steps: usize,

    /// Attempts after the first before a collaborator failure propagates.
    ///
    /// Defaults:
    /// - `testing = 3`
    /// - `production = 30`
    pub retry_max_times: usize,

    /// The first back-off delay.
    ///
    /// Defaults:
    /// - `testing = 1ms`
    /// - `production = 1s`
    pub retry_min_delay: Duration,

    /// The back-off delay ceiling.
    ///
    /// Defaults:
    /// - `testing = 10ms`
    /// - `production = 10min`
    pub retry_max_delay: Duration,

    /// Sample probes until this many distinct origin ASes are covered.
    ///
    /// Defaults:
    /// - `testing = 50`
    /// - `production = 50`
    pub as_thresh: usize,

    /// Seed for probe sampling, so that runs are reproducible.
    ///
    /// Defaults:
    /// - `testing = 313`
    /// - `production = 313`
    pub sample_seed: u64,
}

impl Config {
    /// Get a config suitable for testing.
    pub fn testing() -> Self {
        Self {
            cache_max_entries: 64,
            memo_max_entries: 8,
            num_strides: 4,
            skip_relocated_boundaries: true,
            max_search_steps: 4096,
            retry_max_times: 3,
            retry_min_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(10),
            as_thresh: 50,
            sample_seed: 313,
        }
    }

    /// Get a config suitable for production.
    pub fn production() -> Self {
        Self {
            cache_max_entries: 8096,
            memo_max_entries: 64,
            num_strides: 4,
            skip_relocated_boundaries: true,
            max_search_steps: 1_000_000,
            retry_max_times: 30,
            retry_min_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60 * 10),
            as_thresh: 50,
            sample_seed: 313,
        }
    }
}
