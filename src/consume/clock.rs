/// Time sources for expiring licenses
use chrono::Utc;

/// Current time as unix seconds.
pub trait Clock {
    fn unix_time(&self) -> u32;
}

/// Wall clock of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> u32 {
        // Before 1970 or after 2106 reads as "no clock"
        u32::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn unix_time(&self) -> u32 {
        self.0
    }
}
