// Licensed under the Open Software License version 3.0
//! Delay between poll cycles.
//!
//! After `n` consecutive failures the delay is `interval * 2^n`, capped at the
//! ceiling and never shorter than the interval. One success resets it.
use std::{cmp::max, time::Duration};

#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    ceiling: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(interval: Duration, ceiling: Duration) -> Self {
        Self {
            interval,
            ceiling: max(ceiling, interval),
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    pub fn delay(&self) -> Duration {
        if self.failures == 0 {
            return self.interval;
        }
        let factor = 2u32.checked_pow(self.failures).unwrap_or(u32::MAX);
        self.interval
            .checked_mul(factor)
            .map_or(self.ceiling, |delay| delay.min(self.ceiling))
    }
}
