// Boundary-aligned aggregation window: [start, start + period), unix seconds.

use serde::Serialize;

/// Default window length (seconds).
pub const DEFAULT_PERIOD_SECS: u32 = 60;

/// One closed aggregation window. `start` is always a multiple of `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub start: i64,
    pub period: u32,
}

impl Window {
    /// Window containing `ts_secs`, aligned down (floor, also for negative timestamps).
    pub fn containing(ts_secs: i64, period: u32) -> Self {
        let p = i64::from(period.max(1));
        Self {
            start: ts_secs.div_euclid(p) * p,
            period: period.max(1),
        }
    }

    /// Window containing a millisecond timestamp.
    pub fn containing_ms(ts_ms: i64, period: u32) -> Self {
        Self::containing(ts_ms.div_euclid(1000), period)
    }

    /// Exclusive upper bound (seconds).
    pub fn end(&self) -> i64 {
        self.start + i64::from(self.period)
    }

    pub fn start_ms(&self) -> i64 {
        self.start * 1000
    }

    pub fn end_ms(&self) -> i64 {
        self.end() * 1000
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.end(),
            period: self.period,
        }
    }

    /// Half-open membership test on a millisecond timestamp.
    pub fn contains_ms(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms() && ts_ms < self.end_ms()
    }

    /// True once the whole window lies strictly before the aligned `now_secs` boundary.
    pub fn is_closed_at(&self, now_secs: i64) -> bool {
        self.end() < Self::containing(now_secs, self.period).start
    }
}
