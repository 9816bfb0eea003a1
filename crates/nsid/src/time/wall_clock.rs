use crate::TimeSource;
use std::time::{SystemTime, UNIX_EPOCH};

/// A [`TimeSource`] backed by [`SystemTime`].
///
/// Identifiers only carry whole seconds, so wall-clock adjustments merely
/// affect ordering, never uniqueness: the counter and discriminators keep
/// identifiers distinct even if the clock steps backwards.
///
/// A system clock set before the Unix epoch reports `0`.
#[derive(Default, Clone, Copy, Debug)]
pub struct WallClock;

impl TimeSource<u64> for WallClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_after_2025() {
        // Wednesday, January 1, 2025 00:00:00 UTC
        assert!(WallClock.current_millis() > 1_735_689_600_000);
    }
}
