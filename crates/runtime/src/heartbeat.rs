use std::time::{Duration, Instant};

/// Keep-alive interval used when the caller does not configure one.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(200);

/// Fire-and-reschedule keep-alive timer owned by a single session.
///
/// The timer never sleeps itself: the owner asks for [`Heartbeat::deadline`]
/// and calls [`Heartbeat::poll`] once that instant has passed. Cancelling (or
/// re-arming for a new session) drops the pending deadline, so a superseded
/// session can never fire again.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    next_due: Option<Instant>,
    fired: u64,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the schedule. The first beat is due immediately, then every
    /// `interval`.
    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now);
        self.fired = 0;
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_due
    }

    /// Number of beats fired since the last `arm`.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Returns true when a beat is due at `now`, rescheduling the next one
    /// unconditionally.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                self.fired += 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_ALIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::Heartbeat;
    use std::time::{Duration, Instant};

    #[test]
    fn unarmed_never_fires() {
        let mut hb = Heartbeat::new(Duration::from_secs(1));
        assert!(!hb.poll(Instant::now()));
        assert_eq!(hb.deadline(), None);
    }

    #[test]
    fn fires_then_reschedules() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(Duration::from_secs(200));
        hb.arm(t0);
        assert!(hb.poll(t0));
        assert_eq!(hb.deadline(), Some(t0 + Duration::from_secs(200)));
        assert!(!hb.poll(t0 + Duration::from_secs(199)));
        assert!(hb.poll(t0 + Duration::from_secs(200)));
        assert_eq!(hb.fired(), 2);
    }

    #[test]
    fn cancel_stops_rescheduling() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(Duration::from_secs(5));
        hb.arm(t0);
        assert!(hb.poll(t0));
        hb.cancel();
        assert_eq!(hb.deadline(), None);
        assert!(!hb.poll(t0 + Duration::from_secs(60)));
    }
}
