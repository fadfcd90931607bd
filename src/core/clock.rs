use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" for every timestamp the services write.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Epoch milliseconds, the unit threads and posts are stamped with.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock: every reading returns the current instant and then
/// advances it by `step_millis`.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    step_millis: i64,
}

impl ManualClock {
    pub fn new(start_millis: i64, step_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
            step_millis,
        }
    }

    /// The value the next reading will return, without consuming it.
    pub fn peek_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.fetch_add(self.step_millis, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_ticks_on_every_reading() {
        let clock = ManualClock::new(1_000, 5);
        assert_eq!(clock.now_millis(), 1_000);
        assert_eq!(clock.now_millis(), 1_005);
        clock.advance(100);
        assert_eq!(clock.peek_millis(), 1_110);
        assert_eq!(clock.now().timestamp_millis(), 1_110);
    }
}
