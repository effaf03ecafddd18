use chrono::Utc;
use tokio::time::Instant;

/// Millisecond wall-clock that only moves forward.
///
/// The epoch reading is taken once and then advanced by the monotonic
/// `anchor`, the same baseline-plus-anchor split used for session timing.
/// Under a paused tokio runtime the clock follows virtual time.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch_baseline_ms: i64,
    anchor: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now().timestamp_millis())
    }

    /// Clock whose first reading is `epoch_ms`.
    pub fn starting_at(epoch_ms: i64) -> Self {
        Self {
            epoch_baseline_ms: epoch_ms,
            anchor: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        let elapsed = self.anchor.elapsed().as_millis();
        self.epoch_baseline_ms
            .saturating_add(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_virtual_time() {
        let clock = Clock::starting_at(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        tokio::time::advance(Duration::from_millis(2_500)).await;
        assert_eq!(clock.now_ms(), 3_500);
    }
}
