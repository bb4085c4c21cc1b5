/// Hornet timestamp.
///
/// Internally i64 seconds from unix epoch. Measurement campaigns run on a
/// fixed grid of whole seconds, so finer resolution buys nothing.
// - We don't need chrono
// - We don't need human readable times
// - We DO need grid snapping
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Construct a new timestamp of "now".
    pub fn now() -> Self {
        std::time::SystemTime::now().into()
    }

    /// Construct a timestamp from i64 seconds since unix epoch.
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Get the i64 seconds since unix epoch.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Round down onto a grid of `interval` seconds anchored at the epoch.
    ///
    /// Snapping is idempotent. An interval of zero leaves the timestamp
    /// untouched.
    pub fn snap(&self, interval: u64) -> Self {
        if interval == 0 {
            return *self;
        }
        let interval = interval as i64;
        Self(self.0 - self.0.rem_euclid(interval))
    }

    /// Is this timestamp on the grid of `interval` seconds?
    pub fn is_snapped(&self, interval: u64) -> bool {
        self.snap(interval) == *self
    }

    /// Absolute distance to another timestamp, in seconds.
    pub fn abs_diff(&self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// The unsnapped midpoint between two timestamps.
    pub fn midpoint(&self, other: Timestamp) -> Self {
        Self(self.0 + (other.0 - self.0) / 2)
    }

    /// Shift by a signed number of seconds.
    pub fn offset(&self, secs: i64) -> Self {
        Self(self.0 + secs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::ops::Add<std::time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: std::time::Duration) -> Self::Output {
        Timestamp(self.0 + rhs.as_secs() as i64)
    }
}

impl std::ops::AddAssign<std::time::Duration> for Timestamp {
    fn add_assign(&mut self, rhs: std::time::Duration) {
        self.0 += rhs.as_secs() as i64;
    }
}

impl std::ops::Sub<std::time::Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: std::time::Duration) -> Self::Output {
        Timestamp(self.0 - rhs.as_secs() as i64)
    }
}

impl From<std::time::SystemTime> for Timestamp {
    fn from(t: std::time::SystemTime) -> Self {
        match t.duration_since(std::time::SystemTime::UNIX_EPOCH) {
            Ok(d) => Self(d.as_secs() as i64),
            Err(e) => Self(-(e.duration().as_secs() as i64)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snap_rounds_down() {
        assert_eq!(
            Timestamp::from_secs(1800),
            Timestamp::from_secs(1799 + 900).snap(900)
        );
        assert_eq!(
            Timestamp::from_secs(-900),
            Timestamp::from_secs(-1).snap(900)
        );
    }

    #[test]
    fn snap_is_idempotent() {
        for secs in [-7201, -1, 0, 1, 899, 900, 1_451_606_461] {
            let once = Timestamp::from_secs(secs).snap(900);
            assert_eq!(once, once.snap(900));
            assert!(once.is_snapped(900));
        }
    }

    #[test]
    fn zero_interval_is_identity() {
        assert_eq!(Timestamp::from_secs(17), Timestamp::from_secs(17).snap(0));
    }

    #[test]
    fn midpoint_and_distance() {
        let a = Timestamp::from_secs(100);
        let b = Timestamp::from_secs(301);
        assert_eq!(Timestamp::from_secs(200), a.midpoint(b));
        assert_eq!(201, a.abs_diff(b));
        assert_eq!(201, b.abs_diff(a));
    }

    #[test]
    fn duration_arithmetic() {
        let mut t = Timestamp::from_secs(10);
        t += std::time::Duration::from_secs(5);
        assert_eq!(Timestamp::from_secs(15), t);
        assert_eq!(
            Timestamp::from_secs(5),
            t - std::time::Duration::from_secs(10)
        );
    }
}
