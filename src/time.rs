//! Tick / nanosecond conversion
//!
//! Both directions split the value into whole seconds, handled in integer
//! arithmetic, and a sub-second remainder that is the only part passing
//! through floating point. Results depend only on the absolute input, so
//! repeated conversions never accumulate drift.

const NS_PER_SEC: i64 = 1_000_000_000;

/// Converts between hardware ticks and nanoseconds at a fixed sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConverter {
    rate: f64,
}

impl TimeConverter {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Time of `ticks` in nanoseconds.
    pub fn ticks_to_ns(&self, ticks: u64) -> i64 {
        let ticks = ticks as i64;
        let rate_ll = self.rate as i64;
        if rate_ll <= 0 {
            return 0;
        }
        let full = ticks / rate_ll;
        let err = ticks - full * rate_ll;
        let part = full as f64 * (self.rate - rate_ll as f64);
        let frac = (err as f64 - part) * NS_PER_SEC as f64 / self.rate;
        full * NS_PER_SEC + frac.round() as i64
    }

    /// Tick at `time_ns`. Negative times map to tick 0.
    pub fn ns_to_ticks(&self, time_ns: i64) -> u64 {
        if time_ns <= 0 {
            return 0;
        }
        let rate_ll = self.rate as i64;
        let full = time_ns / NS_PER_SEC;
        let err = time_ns - full * NS_PER_SEC;
        let part = full as f64 * (self.rate - rate_ll as f64);
        let frac = part + err as f64 * self.rate / NS_PER_SEC as f64;
        let ticks = full * rate_ll + frac.round() as i64;
        ticks.max(0) as u64
    }
}
