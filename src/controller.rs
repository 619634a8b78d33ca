use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, trace};

use crate::clock::{SessionClock, SessionStatus};
use crate::error::Result;
use crate::metrics::{self, LiveWpm};
use crate::runtime::{ManualScheduler, TickHandle, TickScheduler, TICK_RATE_MS};
use crate::session::{
    CompletionCallback, DisplayTargets, Keystroke, LiveStats, SessionConfig, SessionId,
    SessionObserver, SessionResult,
};
use crate::tracker::{CharState, Counters, InputTracker, MistakeTally};

/// What a keystroke did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// The session was idle, paused, finished, or the text was exhausted
    Ignored,
    Applied { position: usize, matched: bool },
    Erased { position: usize },
}

/// Live state of the currently loaded session
struct Session {
    id: SessionId,
    text: String,
    duration_secs: Option<f64>,
    tracker: InputTracker,
    clock: SessionClock,
    live: LiveWpm,
    samples: Vec<f64>,
    keystrokes_at_last_sample: u64,
    display_targets: DisplayTargets,
    on_complete: Option<CompletionCallback>,
    tick: Option<TickHandle>,
}

impl Session {
    fn new(id: SessionId, text: &str, config: SessionConfig) -> Self {
        Self {
            id,
            text: text.to_string(),
            duration_secs: config.duration_secs.filter(|secs| *secs > 0.0),
            tracker: InputTracker::new(text),
            clock: SessionClock::new(config.duration_secs),
            live: LiveWpm::new(),
            samples: Vec::new(),
            keystrokes_at_last_sample: 0,
            display_targets: config.display_targets,
            on_complete: config.on_complete,
            tick: None,
        }
    }

    /// Appends `due` per-second samples covering keystrokes since the last one
    fn take_samples(&mut self, due: u64) {
        if due == 0 {
            return;
        }
        let keystrokes = self.tracker.keystrokes();
        let typed = keystrokes.saturating_sub(self.keystrokes_at_last_sample) as f64;
        self.keystrokes_at_last_sample = keystrokes;

        let per_second = metrics::wpm(typed / due as f64, Duration::from_secs(1));
        self.samples
            .extend(std::iter::repeat(per_second).take(due as usize));
    }

    fn progress_percent(&self, now: Instant) -> f64 {
        let fraction = match self.clock.duration() {
            Some(limit) => self.clock.elapsed(now).as_secs_f64() / limit.as_secs_f64(),
            None => self.tracker.caret() as f64 / self.tracker.len() as f64,
        };
        (fraction * 100.0).clamp(0.0, 100.0)
    }

    fn result(&self, now: Instant) -> SessionResult {
        let elapsed = self.clock.elapsed(now);
        let counters = self.tracker.counters();
        let net_wpm = metrics::net_wpm(counters.correct, elapsed);

        SessionResult {
            gross_wpm: metrics::gross_wpm(counters.typed, elapsed),
            net_wpm,
            accuracy: metrics::accuracy(counters.correct, counters.typed),
            consistency: metrics::consistency(&self.samples, net_wpm),
            elapsed_secs: elapsed.as_secs_f64(),
            mistakes_by_char: self.tracker.mistakes_by_char().clone(),
            typed: counters.typed,
            correct: counters.correct,
            mistakes: counters.mistakes,
            duration_secs: self.duration_secs,
            completed: self.tracker.is_exhausted()
                && self.tracker.states().last() == Some(&CharState::Correct),
            wpm_samples: self.samples.clone(),
            finished_at: Local::now(),
            display_targets: self.display_targets.clone(),
        }
    }
}

/// Drives one typing session at a time: keystrokes, ticks, pause, and
/// delivery of the final result.
pub struct SessionController {
    session: Option<Session>,
    next_id: u64,
    scheduler: Box<dyn TickScheduler>,
    tick_interval: Duration,
    observers: Vec<Box<dyn SessionObserver>>,
    last_result: Option<SessionResult>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    /// Headless controller; ticks are driven by the caller via `tick_at`.
    pub fn new() -> Self {
        Self::with_scheduler(Box::new(ManualScheduler::new()))
    }

    pub fn with_scheduler(scheduler: Box<dyn TickScheduler>) -> Self {
        Self {
            session: None,
            next_id: 0,
            scheduler,
            tick_interval: Duration::from_millis(TICK_RATE_MS),
            observers: Vec::new(),
            last_result: None,
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Replaces whatever session is live with a fresh idle one.
    pub fn load(&mut self, text: &str, config: SessionConfig) -> Result<SessionId> {
        config.validate(text)?;

        if let Some(previous) = self.session.take() {
            debug!(session = %previous.id, status = %previous.clock.status(), "discarding session");
        }

        self.next_id += 1;
        let id = SessionId(self.next_id);
        debug!(
            session = %id,
            chars = text.chars().count(),
            duration_secs = ?config.duration_secs,
            "session loaded"
        );
        self.session = Some(Session::new(id, text, config));
        Ok(id)
    }

    /// Reloads the current text with a new configuration
    pub fn restart(&mut self, config: SessionConfig) -> Result<Option<SessionId>> {
        match self.session.as_ref().map(|s| s.text.clone()) {
            Some(text) => self.load(&text, config).map(Some),
            None => Ok(None),
        }
    }

    pub fn submit_keystroke(&mut self, key: Keystroke) -> InputOutcome {
        self.submit_keystroke_at(key, Instant::now())
    }

    pub fn submit_keystroke_at(&mut self, key: Keystroke, now: Instant) -> InputOutcome {
        let Some(session) = self.session.as_mut() else {
            return InputOutcome::Ignored;
        };

        let outcome = match (key, session.clock.status()) {
            (Keystroke::Char(c), SessionStatus::Idle) if session.tracker.caret() == 0 => {
                session.clock.start(now);
                session.tick = Some(self.scheduler.schedule(session.id, self.tick_interval));
                debug!(session = %session.id, "session started");
                Self::apply_char(session, c, now)
            }
            (Keystroke::Char(c), SessionStatus::Running) => Self::apply_char(session, c, now),
            (Keystroke::Backspace, SessionStatus::Running) => match session.tracker.backspace() {
                Some(position) => InputOutcome::Erased { position },
                None => InputOutcome::Ignored,
            },
            _ => InputOutcome::Ignored,
        };

        match outcome {
            InputOutcome::Applied { position, matched } => {
                trace!(position, matched, "input applied");
                for observer in self.observers.iter_mut() {
                    observer.on_input_applied(position, matched);
                }
            }
            InputOutcome::Erased { position } => {
                trace!(position, "input erased");
                for observer in self.observers.iter_mut() {
                    observer.on_backspace(position);
                }
            }
            InputOutcome::Ignored => {}
        }

        // A wrong final character stays open for correction
        if matches!(outcome, InputOutcome::Applied { matched: true, .. })
            && session.tracker.is_exhausted()
        {
            self.finish(now);
        }

        outcome
    }

    fn apply_char(session: &mut Session, c: char, now: Instant) -> InputOutcome {
        let position = session.tracker.caret();
        match session.tracker.type_char(c) {
            Some(matched) => {
                session.live.record(now);
                session.live.update(now);
                InputOutcome::Applied { position, matched }
            }
            None => InputOutcome::Ignored,
        }
    }

    pub fn toggle_pause(&mut self) -> Option<SessionStatus> {
        self.toggle_pause_at(Instant::now())
    }

    /// Returns the new status, or `None` when not running or paused.
    pub fn toggle_pause_at(&mut self, now: Instant) -> Option<SessionStatus> {
        let session = self.session.as_mut()?;
        let status = session.clock.toggle_pause(now)?;
        debug!(session = %session.id, %status, "pause toggled");
        Some(status)
    }

    pub fn abort(&mut self) -> bool {
        self.abort_at(Instant::now())
    }

    /// Forces the live session to finish and delivers its result. A session
    /// that never started finishes with zero elapsed time. Returns whether a
    /// result was produced.
    pub fn abort_at(&mut self, now: Instant) -> bool {
        match self.status() {
            Some(SessionStatus::Idle | SessionStatus::Running | SessionStatus::Paused) => {
                debug!("session aborted");
                self.finish(now)
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, id: SessionId) {
        self.tick_at(id, Instant::now())
    }

    /// Periodic update. Ticks for any session other than the live,
    /// running one are ignored.
    pub fn tick_at(&mut self, id: SessionId, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.id != id || session.clock.status() != SessionStatus::Running {
            return;
        }

        let due = session.clock.take_due_samples(now);
        session.take_samples(due);
        session.live.update(now);

        let remaining = session.clock.remaining(now).map(|d| d.as_secs_f64());
        let progress = session.progress_percent(now);
        for observer in self.observers.iter_mut() {
            observer.on_tick(remaining, progress);
        }

        if session.clock.is_expired(now) {
            self.finish(now);
        }
    }

    /// Freezes the session and hands its result to the session's callback,
    /// or keeps it for `take_last_result` when none was registered.
    fn finish(&mut self, now: Instant) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.clock.stop(now) {
            return false;
        }
        if let Some(handle) = session.tick.take() {
            handle.cancel();
            trace!(session = %handle.session(), "ticks cancelled");
        }

        let result = session.result(now);
        info!(
            session = %session.id,
            gross_wpm = result.gross_wpm,
            net_wpm = result.net_wpm,
            accuracy = result.accuracy,
            consistency = result.consistency,
            elapsed_secs = result.elapsed_secs,
            completed = result.completed,
            "session finished"
        );

        match session.on_complete.take() {
            Some(callback) => callback(result),
            None => self.last_result = Some(result),
        }
        true
    }

    /// Result of the most recent session finished without a callback
    pub fn take_last_result(&mut self) -> Option<SessionResult> {
        self.last_result.take()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn status(&self) -> Option<SessionStatus> {
        self.session.as_ref().map(|s| s.clock.status())
    }

    pub fn text(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.text.as_str())
    }

    pub fn target(&self) -> &[char] {
        self.session
            .as_ref()
            .map(|s| s.tracker.target())
            .unwrap_or_default()
    }

    pub fn states(&self) -> &[CharState] {
        self.session
            .as_ref()
            .map(|s| s.tracker.states())
            .unwrap_or_default()
    }

    pub fn caret(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.tracker.caret())
    }

    /// Next key the typist is expected to press
    pub fn expected(&self) -> Option<char> {
        self.session.as_ref().and_then(|s| s.tracker.expected())
    }

    pub fn counters(&self) -> Counters {
        self.session
            .as_ref()
            .map(|s| s.tracker.counters())
            .unwrap_or_default()
    }

    pub fn mistakes_by_char(&self) -> Option<&MistakeTally> {
        self.session.as_ref().map(|s| s.tracker.mistakes_by_char())
    }

    pub fn samples(&self) -> &[f64] {
        self.session
            .as_ref()
            .map(|s| s.samples.as_slice())
            .unwrap_or_default()
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.session
            .as_ref()
            .map_or(Duration::ZERO, |s| s.clock.elapsed(now))
    }

    pub fn live_stats(&self) -> Option<LiveStats> {
        self.live_stats_at(Instant::now())
    }

    pub fn live_stats_at(&self, now: Instant) -> Option<LiveStats> {
        let session = self.session.as_ref()?;
        let counters = session.tracker.counters();
        let elapsed = session.clock.elapsed(now);

        Some(LiveStats {
            status: session.clock.status(),
            caret: session.tracker.caret(),
            typed: counters.typed,
            correct: counters.correct,
            mistakes: counters.mistakes,
            live_wpm: session.live.value(),
            net_wpm: metrics::net_wpm(counters.correct, elapsed),
            accuracy: metrics::accuracy(counters.correct, counters.typed),
            elapsed_secs: elapsed.as_secs_f64(),
            remaining_secs: session.clock.remaining(now).map(|d| d.as_secs_f64()),
            progress_percent: session.progress_percent(now),
        })
    }
}
