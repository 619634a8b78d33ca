use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::session::SessionId;

/// Cadence of session ticks
pub const TICK_RATE_MS: u64 = 100;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum EngineEvent {
    Key(KeyEvent),
    Resize,
    /// Periodic tick scheduled for the given session
    Tick(SessionId),
}

/// Source of terminal and tick events
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<EngineEvent>,
    tx: Sender<EngineEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let key_tx = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if key_tx.send(EngineEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if key_tx.send(EngineEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx, tx }
    }

    /// Handle for other producers (the tick scheduler) to post into the same queue
    pub fn sender(&self) -> Sender<EngineEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<EngineEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<EngineEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable redraw cadence
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Read-only view of a tick handle's cancellation flag
#[derive(Clone, Debug)]
pub struct TickWatch {
    cancelled: Arc<AtomicBool>,
}

impl TickWatch {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Keeps a recurring tick alive. Cancels on `cancel()` or when dropped.
#[derive(Debug)]
pub struct TickHandle {
    session: SessionId,
    cancelled: Arc<AtomicBool>,
}

impl TickHandle {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn watch(&self) -> TickWatch {
        TickWatch {
            cancelled: self.cancelled.clone(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts recurring ticks for a session
pub trait TickScheduler {
    fn schedule(&mut self, session: SessionId, interval: Duration) -> TickHandle;
}

/// Posts `EngineEvent::Tick` into an event queue from a background thread
/// until the returned handle is cancelled.
pub struct ThreadTickScheduler {
    tx: Sender<EngineEvent>,
}

impl ThreadTickScheduler {
    pub fn new(tx: Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl TickScheduler for ThreadTickScheduler {
    fn schedule(&mut self, session: SessionId, interval: Duration) -> TickHandle {
        let handle = TickHandle::new(session);
        let watch = handle.watch();
        let tx = self.tx.clone();

        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if watch.is_cancelled() {
                break;
            }
            if tx.send(EngineEvent::Tick(session)).is_err() {
                break;
            }
        });

        handle
    }
}

/// Scheduler for headless use: the caller drives ticks itself.
/// Clones share the record of issued handles.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    issued: Arc<Mutex<Vec<(SessionId, TickWatch)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every handle issued so far, oldest first
    pub fn issued(&self) -> Vec<(SessionId, TickWatch)> {
        self.issued
            .lock()
            .map(|issued| issued.clone())
            .unwrap_or_default()
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, session: SessionId, _interval: Duration) -> TickHandle {
        let handle = TickHandle::new(session);
        if let Ok(mut issued) = self.issued.lock() {
            issued.push((session, handle.watch()));
        }
        handle
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the redraw interval and returns the next event, or
    /// `None` when the interval passes without one.
    pub fn step(&self) -> Option<EngineEvent> {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
