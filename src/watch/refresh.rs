use std::time::{Duration, Instant};

/// Fixed-period auto-refresh timer for the selected node.
///
/// Armed once a full load wave has landed, disarmed whenever the selection
/// changes or clears. Firing re-arms for the next period, so a node left
/// selected refreshes indefinitely.
#[derive(Debug)]
pub struct RefreshScheduler {
    period: Duration,
    deadline: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.period);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// True when the period has elapsed. Re-arms from `now` so drift does not
    /// accumulate into back-to-back refreshes.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    /// Whole seconds until the next refresh, for the countdown readout.
    pub fn remaining_secs(&self, now: Instant) -> Option<u64> {
        let deadline = self.deadline?;
        Some(deadline.saturating_duration_since(now).as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(300);

    #[test]
    fn fires_once_per_period_and_rearms() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        let t0 = Instant::now();
        scheduler.arm(t0);

        assert!(!scheduler.poll(t0 + Duration::from_secs(299)));
        assert!(scheduler.poll(t0 + PERIOD));
        // Re-armed from the firing instant, not the original deadline.
        assert!(!scheduler.poll(t0 + PERIOD + Duration::from_secs(299)));
        assert!(scheduler.poll(t0 + PERIOD + PERIOD));
    }

    #[test]
    fn disarmed_scheduler_never_fires() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        let t0 = Instant::now();
        scheduler.arm(t0);
        scheduler.disarm();

        assert!(!scheduler.poll(t0 + PERIOD * 2));
        assert!(scheduler.remaining_secs(t0).is_none());
    }

    #[test]
    fn countdown_reports_whole_seconds() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        let t0 = Instant::now();
        scheduler.arm(t0);

        assert_eq!(scheduler.remaining_secs(t0), Some(300));
        assert_eq!(
            scheduler.remaining_secs(t0 + Duration::from_millis(500)),
            Some(299)
        );
        assert_eq!(scheduler.remaining_secs(t0 + PERIOD), Some(0));
    }
}
