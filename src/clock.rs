use std::time::{Duration, Instant};

/// Lifecycle of a single typing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Tracks wall-clock progress of a session.
///
/// Elapsed time is accrued only while running: every running stretch is
/// banked on pause so paused wall-clock time never counts.
#[derive(Debug, Clone)]
pub struct SessionClock {
    status: SessionStatus,
    duration: Option<Duration>,
    resumed_at: Option<Instant>,
    banked: Duration,
    samples_taken: u64,
}

impl SessionClock {
    /// `duration_secs` of `None` or zero means the session is untimed.
    pub fn new(duration_secs: Option<f64>) -> Self {
        let duration = duration_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|limit| !limit.is_zero());

        Self {
            status: SessionStatus::Idle,
            duration,
            resumed_at: None,
            banked: Duration::ZERO,
            samples_taken: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns true when the clock moved from idle to running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.status != SessionStatus::Idle {
            return false;
        }
        self.resumed_at = Some(now);
        self.status = SessionStatus::Running;
        true
    }

    /// Flips running <-> paused. Returns the new status, or `None` when the
    /// clock is idle or finished.
    pub fn toggle_pause(&mut self, now: Instant) -> Option<SessionStatus> {
        match self.status {
            SessionStatus::Running => {
                self.bank(now);
                self.status = SessionStatus::Paused;
            }
            SessionStatus::Paused => {
                self.resumed_at = Some(now);
                self.status = SessionStatus::Running;
            }
            SessionStatus::Idle | SessionStatus::Finished => return None,
        }
        Some(self.status)
    }

    /// Forces the finished state. Returns false if it was already finished.
    pub fn stop(&mut self, now: Instant) -> bool {
        if self.status == SessionStatus::Finished {
            return false;
        }
        if self.status == SessionStatus::Running {
            self.bank(now);
        }
        self.status = SessionStatus::Finished;
        true
    }

    fn bank(&mut self, now: Instant) {
        if let Some(resumed_at) = self.resumed_at.take() {
            self.banked += now.saturating_duration_since(resumed_at);
        }
    }

    /// Running time accrued so far, capped at the duration for timed sessions.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let running = match (self.status, self.resumed_at) {
            (SessionStatus::Running, Some(resumed_at)) => now.saturating_duration_since(resumed_at),
            _ => Duration::ZERO,
        };
        let elapsed = self.banked + running;

        match self.duration {
            Some(limit) => elapsed.min(limit),
            None => elapsed,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.duration
            .map(|limit| limit.saturating_sub(self.elapsed(now)))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_some_and(|left| left.is_zero())
    }

    /// Number of whole seconds crossed since the last call. Each one is
    /// owed exactly one sample; nothing is owed unless running.
    pub fn take_due_samples(&mut self, now: Instant) -> u64 {
        if self.status != SessionStatus::Running {
            return 0;
        }
        let whole_secs = self.elapsed(now).as_secs();
        let due = whole_secs.saturating_sub(self.samples_taken);
        self.samples_taken = self.samples_taken.max(whole_secs);
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_new_clock_is_idle() {
        let clock = SessionClock::new(None);
        assert_eq!(clock.status(), SessionStatus::Idle);
        assert_eq!(clock.duration(), None);
        assert_eq!(clock.elapsed(Instant::now()), Duration::ZERO);
        assert_eq!(clock.remaining(Instant::now()), None);
    }

    #[test]
    fn test_zero_duration_is_untimed() {
        let clock = SessionClock::new(Some(0.0));
        assert_eq!(clock.duration(), None);
    }

    #[test]
    fn test_out_of_range_duration_is_untimed() {
        assert_eq!(SessionClock::new(Some(1e20)).duration(), None);
        assert_eq!(SessionClock::new(Some(1e-12)).duration(), None);
    }

    #[test]
    fn test_start_only_from_idle() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(Some(30.0));

        assert!(clock.start(t0));
        assert_eq!(clock.status(), SessionStatus::Running);
        assert!(!clock.start(at(t0, 500)));
        assert_eq!(clock.elapsed(at(t0, 1_000)), Duration::from_secs(1));
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(Some(10.0));
        clock.start(t0);

        assert_eq!(clock.toggle_pause(at(t0, 2_000)), Some(SessionStatus::Paused));
        assert_eq!(clock.elapsed(at(t0, 9_000)), Duration::from_secs(2));

        assert_eq!(clock.toggle_pause(at(t0, 9_000)), Some(SessionStatus::Running));
        assert_eq!(clock.elapsed(at(t0, 10_000)), Duration::from_secs(3));
        assert_eq!(clock.remaining(at(t0, 10_000)), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_toggle_pause_is_noop_when_idle_or_finished() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(None);
        assert_eq!(clock.toggle_pause(t0), None);

        clock.start(t0);
        clock.stop(at(t0, 100));
        assert_eq!(clock.toggle_pause(at(t0, 200)), None);
        assert_eq!(clock.status(), SessionStatus::Finished);
    }

    #[test]
    fn test_stop_banks_running_time() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(None);
        clock.start(t0);

        assert!(clock.stop(at(t0, 1_500)));
        assert!(!clock.stop(at(t0, 5_000)));
        assert_eq!(clock.elapsed(at(t0, 5_000)), Duration::from_millis(1_500));
    }

    #[test]
    fn test_elapsed_capped_for_timed_sessions() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(Some(1.0));
        clock.start(t0);

        assert!(!clock.is_expired(at(t0, 900)));
        assert!(clock.is_expired(at(t0, 1_300)));
        assert_eq!(clock.elapsed(at(t0, 1_300)), Duration::from_secs(1));
        assert_eq!(clock.remaining(at(t0, 1_300)), Some(Duration::ZERO));
    }

    #[test]
    fn test_due_samples_once_per_whole_second() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(None);
        assert_eq!(clock.take_due_samples(at(t0, 5_000)), 0);

        clock.start(t0);
        assert_eq!(clock.take_due_samples(at(t0, 400)), 0);
        assert_eq!(clock.take_due_samples(at(t0, 1_000)), 1);
        assert_eq!(clock.take_due_samples(at(t0, 1_100)), 0);
        assert_eq!(clock.take_due_samples(at(t0, 3_200)), 2);
    }

    #[test]
    fn test_no_samples_while_paused() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new(None);
        clock.start(t0);
        clock.toggle_pause(at(t0, 500));

        assert_eq!(clock.take_due_samples(at(t0, 4_000)), 0);

        clock.toggle_pause(at(t0, 4_000));
        assert_eq!(clock.take_due_samples(at(t0, 4_400)), 0);
        assert_eq!(clock.take_due_samples(at(t0, 4_500)), 1);
    }
}
