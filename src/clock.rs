// Wall-clock seam. The scheduler recomputes "present" from this on every loop check.

use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Current unix time in whole seconds.
    fn now_secs(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, operation = "now_secs", "system time before epoch");
                0
            })
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_secs(&self) -> i64 {
        (**self).now_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_secs() > 1_577_836_800);
    }
}
