// Library surface: the headless session engine plus the collaborators the
// terminal front end uses. Keep bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod metrics;
pub mod passages;
pub mod runtime;
pub mod session;
pub mod tracker;

pub use clock::SessionStatus;
pub use controller::{InputOutcome, SessionController};
pub use error::{EngineError, Result};
pub use session::{
    DisplayTargets, Keystroke, LiveStats, SessionConfig, SessionId, SessionObserver,
    SessionResult,
};
