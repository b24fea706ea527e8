//! Fixed-rate pacing against the monotonic clock
//!
//! Deadlines are `start + k * period`, so time spent encoding and sending
//! is absorbed instead of accumulating as drift. A loop that falls more than
//! a whole period behind is re-anchored rather than allowed to burst.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

pub struct Pacer {
    period: Duration,
    deadline: Instant,
    late_ticks: u64,
}

impl Pacer {
    /// First deadline is one period from now
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    pub fn starting_at(start: Instant, period: Duration) -> Self {
        Self {
            period,
            deadline: start + period,
            late_ticks: 0,
        }
    }

    /// Sleep until the current deadline, then schedule the next one
    pub async fn wait(&mut self) {
        sleep_until(self.deadline).await;
        self.schedule_next(Instant::now());
    }

    /// Move to the next deadline given the time the previous one was observed
    pub fn schedule_next(&mut self, now: Instant) {
        self.deadline += self.period;
        if self.deadline <= now {
            self.late_ticks += 1;
            self.deadline = now + self.period;
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of times the schedule had to be re-anchored
    pub fn late_ticks(&self) -> u64 {
        self.late_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    #[test]
    fn test_deadlines_accumulate_without_drift() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(start, PERIOD);

        // Each wake-up is 3 ms late; deadlines stay on the 20 ms grid
        for k in 1..=100u32 {
            let woke = pacer.deadline() + Duration::from_millis(3);
            pacer.schedule_next(woke);
            assert_eq!(pacer.deadline(), start + PERIOD * (k + 1));
        }
        assert_eq!(pacer.late_ticks(), 0);
    }

    #[test]
    fn test_reanchors_after_falling_behind() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(start, PERIOD);

        let woke = start + Duration::from_millis(75);
        pacer.schedule_next(woke);

        assert_eq!(pacer.deadline(), woke + PERIOD);
        assert_eq!(pacer.late_ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_tracks_nominal_cadence() {
        let start = Instant::now();
        let mut pacer = Pacer::new(PERIOD);

        for _ in 0..50 {
            pacer.wait().await;
        }

        // The timer wheel rounds to whole milliseconds
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(1) + PERIOD, "{elapsed:?}");
        assert_eq!(pacer.late_ticks(), 0);
    }
}
