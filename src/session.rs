use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::clock::SessionStatus;
use crate::error::{EngineError, Result};
use crate::tracker::MistakeTally;

/// Receives the final result of the session it was registered with
pub type CompletionCallback = Box<dyn FnOnce(SessionResult)>;

/// Identifies one loaded session. Every `load` issues a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One accepted input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Char(char),
    Backspace,
}

/// Logical display role -> presentation-defined location.
///
/// The engine never reads these; it only hands them back in the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTargets(BTreeMap<String, String>);

impl DisplayTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: impl Into<String>, target: impl Into<String>) -> Self {
        self.0.insert(role.into(), target.into());
        self
    }

}

#[derive(Default)]
pub struct SessionConfig {
    /// `None` or zero: the session ends when the text is exhausted
    pub duration_secs: Option<f64>,
    pub display_targets: DisplayTargets,
    /// When absent the result is kept for `SessionController::take_last_result`
    pub on_complete: Option<CompletionCallback>,
}

impl SessionConfig {
    pub fn untimed() -> Self {
        Self::default()
    }

    pub fn timed(secs: f64) -> Self {
        Self {
            duration_secs: Some(secs),
            ..Self::default()
        }
    }

    pub fn with_targets(mut self, targets: DisplayTargets) -> Self {
        self.display_targets = targets;
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(SessionResult) + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn validate(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "target text must not be empty".into(),
            ));
        }
        if let Some(secs) = self.duration_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "duration must be a non-negative number of seconds, got {secs}"
                )));
            }
            match Duration::try_from_secs_f64(secs) {
                Ok(limit) if secs > 0.0 && limit.is_zero() => {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "duration of {secs}s is too short to time"
                    )));
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "duration of {secs}s is out of range: {e}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("duration_secs", &self.duration_secs)
            .field("display_targets", &self.display_targets)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Final report of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub gross_wpm: u32,
    pub net_wpm: u32,
    pub accuracy: u8,
    pub consistency: u8,
    pub elapsed_secs: f64,
    pub mistakes_by_char: MistakeTally,
    pub typed: usize,
    pub correct: usize,
    pub mistakes: usize,
    pub duration_secs: Option<f64>,
    /// True when the whole text was typed, false on timeout or abort
    pub completed: bool,
    pub wpm_samples: Vec<f64>,
    pub finished_at: DateTime<Local>,
    pub display_targets: DisplayTargets,
}

impl SessionResult {
    /// Most-missed keys first, ties broken alphabetically
    pub fn weakest_keys(&self, n: usize) -> Vec<(String, u32)> {
        self.mistakes_by_char
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
            .take(n)
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

/// Snapshot of a session for a live display
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStats {
    pub status: SessionStatus,
    pub caret: usize,
    pub typed: usize,
    pub correct: usize,
    pub mistakes: usize,
    pub live_wpm: f64,
    pub net_wpm: u32,
    pub accuracy: u8,
    pub elapsed_secs: f64,
    pub remaining_secs: Option<f64>,
    pub progress_percent: f64,
}

/// Presentation-side subscriber (timers, keyboard hints, sound).
pub trait SessionObserver {
    fn on_tick(&mut self, _remaining_secs: Option<f64>, _progress_percent: f64) {}
    fn on_input_applied(&mut self, _position: usize, _matched: bool) {}
    fn on_backspace(&mut self, _position: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn result_with(mistakes: &[(&str, u32)]) -> SessionResult {
        SessionResult {
            gross_wpm: 0,
            net_wpm: 0,
            accuracy: 100,
            consistency: 100,
            elapsed_secs: 0.0,
            mistakes_by_char: mistakes
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            typed: 0,
            correct: 0,
            mistakes: 0,
            duration_secs: None,
            completed: false,
            wpm_samples: vec![],
            finished_at: Local::now(),
            display_targets: DisplayTargets::new(),
        }
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        assert_matches!(
            SessionConfig::untimed().validate(""),
            Err(EngineError::InvalidConfiguration(_))
        );
    }

    #[test]
    fn test_validate_rejects_bad_durations() {
        assert_matches!(
            SessionConfig::timed(-1.0).validate("abc"),
            Err(EngineError::InvalidConfiguration(_))
        );
        assert_matches!(
            SessionConfig::timed(f64::NAN).validate("abc"),
            Err(EngineError::InvalidConfiguration(_))
        );
        assert_matches!(
            SessionConfig::timed(1e20).validate("abc"),
            Err(EngineError::InvalidConfiguration(_))
        );
        assert_matches!(
            SessionConfig::timed(1e-12).validate("abc"),
            Err(EngineError::InvalidConfiguration(_))
        );
        assert!(SessionConfig::timed(0.0).validate("abc").is_ok());
        assert!(SessionConfig::timed(60.0).validate("abc").is_ok());
    }

    #[test]
    fn test_display_targets_roundtrip() {
        let targets = DisplayTargets::new()
            .with("text", "#prompt")
            .with("wpm", "#hud-wpm");

        assert_ne!(targets, DisplayTargets::new());
        assert_eq!(
            targets,
            DisplayTargets::new()
                .with("wpm", "#hud-wpm")
                .with("text", "#prompt")
        );
    }

    #[test]
    fn test_config_debug_hides_callback() {
        let cfg = SessionConfig::timed(30.0).on_complete(|_| {});
        let dbg = format!("{cfg:?}");
        assert!(dbg.contains("on_complete: true"));
    }

    #[test]
    fn test_weakest_keys_ordering() {
        let result = result_with(&[("a", 1), ("space", 4), ("t", 4), ("e", 2)]);
        assert_eq!(
            result.weakest_keys(3),
            vec![
                ("space".to_string(), 4),
                ("t".to_string(), 4),
                ("e".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_result_serializes() {
        let result = result_with(&[("t", 1)]);
        let json = serde_json::to_string(&result).unwrap();
        let back: SessionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mistakes_by_char, result.mistakes_by_char);
    }
}
