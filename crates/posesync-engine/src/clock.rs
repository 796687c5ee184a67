use std::time::{Duration, Instant};

/// Wall-clock source for the throttle. Abstracted so tests can drive time
/// explicitly.
pub trait Clock {
    fn now(&mut self) -> Duration;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }
}

/// Rate limiter for windowed-view updates: fires at most once per interval of
/// wall-clock time, independent of how often it is asked.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Duration>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// Returns true when enough wall-clock time has passed since the last
    /// accepted update. The first call always fires.
    pub fn should_fire(&mut self, now: Duration) -> bool {
        match self.last_fired {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}
