use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const CHARS_PER_WORD: f64 = 5.0;

/// Keystrokes older than this drop out of the live WPM window
pub const LIVE_WINDOW: Duration = Duration::from_secs(2);

/// Weight kept from the previous smoothed live WPM on every update
pub const LIVE_SMOOTHING: f64 = 0.8;

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let avg = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = avg - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

/// Unrounded words per minute for `chars` characters over `elapsed`.
/// Zero elapsed time yields zero.
pub fn wpm(chars: f64, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if minutes <= 0.0 {
        return 0.0;
    }
    (chars / CHARS_PER_WORD) / minutes
}

pub fn gross_wpm(typed: usize, elapsed: Duration) -> u32 {
    wpm(typed as f64, elapsed).round() as u32
}

pub fn net_wpm(correct: usize, elapsed: Duration) -> u32 {
    wpm(correct as f64, elapsed).max(0.0).round() as u32
}

/// Percentage of typed characters that were correct, 100 when nothing was typed
pub fn accuracy(correct: usize, typed: usize) -> u8 {
    if typed == 0 {
        return 100;
    }
    ((correct as f64 / typed as f64) * 100.0).round() as u8
}

/// Inverse coefficient of variation of the per-second samples, 0-100.
/// With no samples the session counts as one sample of `net_wpm`.
pub fn consistency(samples: &[f64], net_wpm: u32) -> u8 {
    let fallback = [net_wpm as f64];
    let series = if samples.is_empty() { &fallback[..] } else { samples };

    let (avg, sd) = match (mean(series), std_dev(series)) {
        (Some(avg), Some(sd)) => (avg, sd),
        _ => return 100,
    };
    if avg == 0.0 {
        return 100;
    }

    (100.0 - (sd / avg) * 100.0).clamp(0.0, 100.0).round() as u8
}

/// Smoothed keystroke rate for a live display. Not used for final results.
#[derive(Debug, Clone, Default)]
pub struct LiveWpm {
    /// Keystrokes that still fall inside the window
    keypresses: VecDeque<Instant>,
    smoothed: f64,
}

impl LiveWpm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: Instant) {
        self.keypresses.push_back(at);
    }

    /// Trims the window at `now`, folds the raw rate into the smoothed
    /// value and returns it.
    pub fn update(&mut self, now: Instant) -> f64 {
        while let Some(oldest) = self.keypresses.front() {
            if now.saturating_duration_since(*oldest) > LIVE_WINDOW {
                self.keypresses.pop_front();
            } else {
                break;
            }
        }

        let raw = (self.keypresses.len() as f64 / LIVE_WINDOW.as_secs_f64())
            * (60.0 / CHARS_PER_WORD);
        self.smoothed = self.smoothed * LIVE_SMOOTHING + raw * (1.0 - LIVE_SMOOTHING);
        self.smoothed
    }

    pub fn value(&self) -> f64 {
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[42.0]), Some(42.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(
            std_dev(&[100., 120., 90., 102., 94.]),
            Some(10.322790320451151)
        );
        assert_eq!(std_dev(&[5.0, 5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_wpm_zero_elapsed() {
        assert_eq!(wpm(50.0, Duration::ZERO), 0.0);
        assert_eq!(gross_wpm(50, Duration::ZERO), 0);
        assert_eq!(net_wpm(50, Duration::ZERO), 0);
    }

    #[test]
    fn test_gross_and_net_wpm() {
        let minute = Duration::from_secs(60);
        assert_eq!(gross_wpm(300, minute), 60);
        assert_eq!(net_wpm(250, minute), 50);

        let half = Duration::from_secs(30);
        assert_eq!(gross_wpm(52, half), 21);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(0, 0), 100);
        assert_eq!(accuracy(3, 4), 75);
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(0, 5), 0);
    }

    #[test]
    fn test_consistency_steady_typist() {
        assert_eq!(consistency(&[60.0, 60.0, 60.0, 60.0], 60), 100);
    }

    #[test]
    fn test_consistency_variable_typist() {
        let c = consistency(&[20.0, 90.0, 10.0, 120.0], 60);
        assert!(c < 100);
    }

    #[test]
    fn test_consistency_clamped_at_zero() {
        assert_eq!(consistency(&[0.0, 0.0, 0.0, 400.0], 10), 0);
    }

    #[test]
    fn test_consistency_fallbacks() {
        assert_eq!(consistency(&[], 0), 100);
        assert_eq!(consistency(&[], 45), 100);
        assert_eq!(consistency(&[0.0, 0.0], 0), 100);
    }

    #[test]
    fn test_live_wpm_window_and_smoothing() {
        let t0 = Instant::now();
        let mut live = LiveWpm::new();
        assert_eq!(live.update(t0), 0.0);

        for i in 0..4 {
            live.record(t0 + Duration::from_millis(i * 100));
        }
        // 4 keystrokes over a 2s window -> 24 wpm raw, 20% folded in
        let v = live.update(t0 + Duration::from_millis(400));
        assert!((v - 4.8).abs() < 1e-9);

        // Window has emptied, so only the decayed history remains
        live.update(t0 + Duration::from_secs(5));
        assert!((live.value() - v * LIVE_SMOOTHING).abs() < 1e-9);
    }
}
