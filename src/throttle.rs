use std::time::{Duration, Instant};

/// Drops calls that arrive sooner than `interval` after the last executed one.
///
/// There is no queueing and no trailing call: a dropped invocation is simply
/// lost. The first call always runs.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_call: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
        }
    }

    /// Run `f` if the interval has elapsed at `now`, returning its result.
    pub fn call<R>(&mut self, now: Instant, f: impl FnOnce() -> R) -> Option<R> {
        if !self.ready(now) {
            return None;
        }
        self.last_call = Some(now);
        Some(f())
    }

    fn ready(&self, now: Instant) -> bool {
        match self.last_call {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }
}
