use std::collections::BTreeMap;

/// Label recorded in the mistake tally when the expected character was a space
pub const SPACE_LABEL: &str = "space";

/// Mistaken expected character -> number of times it was missed
pub type MistakeTally = BTreeMap<String, u32>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharState {
    Untyped,
    Correct,
    Incorrect,
}

/// Running totals. `typed == correct + mistakes` after every event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub typed: usize,
    pub correct: usize,
    pub mistakes: usize,
}

pub fn mistake_label(expected: char) -> String {
    match expected {
        ' ' => SPACE_LABEL.to_string(),
        c => c.to_string(),
    }
}

/// Per-character correctness of the input against the target text
#[derive(Debug, Clone)]
pub struct InputTracker {
    target: Vec<char>,
    states: Vec<CharState>,
    caret: usize,
    counters: Counters,
    mistakes_by_char: MistakeTally,
    keystrokes: u64,
}

impl InputTracker {
    pub fn new(text: &str) -> Self {
        let target: Vec<char> = text.chars().collect();
        let states = vec![CharState::Untyped; target.len()];

        Self {
            target,
            states,
            caret: 0,
            counters: Counters::default(),
            mistakes_by_char: MistakeTally::new(),
            keystrokes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn mistakes_by_char(&self) -> &MistakeTally {
        &self.mistakes_by_char
    }

    pub fn states(&self) -> &[CharState] {
        &self.states
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    /// Character expected at the caret, if any remain
    pub fn expected(&self) -> Option<char> {
        self.target.get(self.caret).copied()
    }

    /// Character inputs ever applied, never decremented by backspace
    pub fn keystrokes(&self) -> u64 {
        self.keystrokes
    }

    pub fn is_exhausted(&self) -> bool {
        self.caret == self.target.len()
    }

    /// Applies `c` at the caret. Returns whether it matched, or `None` when
    /// the text is already exhausted.
    pub fn type_char(&mut self, c: char) -> Option<bool> {
        let expected = self.expected()?;
        let matched = c == expected;

        if matched {
            self.states[self.caret] = CharState::Correct;
            self.counters.correct += 1;
        } else {
            self.states[self.caret] = CharState::Incorrect;
            self.counters.mistakes += 1;
            *self
                .mistakes_by_char
                .entry(mistake_label(expected))
                .or_insert(0) += 1;
        }

        self.counters.typed += 1;
        self.caret += 1;
        self.keystrokes += 1;

        Some(matched)
    }

    /// Steps the caret back one position and withdraws whatever that
    /// position contributed to the counters. The mistake tally keeps its
    /// entries so undone mistakes still feed weak-key analysis.
    /// Returns the reset position, or `None` at the start of the text.
    pub fn backspace(&mut self) -> Option<usize> {
        if self.caret == 0 {
            return None;
        }
        self.caret -= 1;

        match self.states[self.caret] {
            CharState::Correct => self.counters.correct -= 1,
            CharState::Incorrect => self.counters.mistakes -= 1,
            CharState::Untyped => {}
        }
        self.states[self.caret] = CharState::Untyped;
        self.counters.typed -= 1;

        Some(self.caret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(tracker: &InputTracker) {
        let c = tracker.counters();
        assert_eq!(c.typed, c.correct + c.mistakes);
        assert!(tracker.states()[..tracker.caret()]
            .iter()
            .all(|s| *s != CharState::Untyped));
        assert!(tracker.states()[tracker.caret()..]
            .iter()
            .all(|s| *s == CharState::Untyped));
    }

    #[test]
    fn test_new_tracker() {
        let tracker = InputTracker::new("hello");

        assert_eq!(tracker.len(), 5);
        assert_eq!(tracker.caret(), 0);
        assert_eq!(tracker.counters(), Counters::default());
        assert_eq!(tracker.expected(), Some('h'));
        assert!(!tracker.is_exhausted());
        assert_consistent(&tracker);
    }

    #[test]
    fn test_type_correct_char() {
        let mut tracker = InputTracker::new("test");

        assert_eq!(tracker.type_char('t'), Some(true));
        assert_eq!(tracker.caret(), 1);
        assert_eq!(tracker.states()[0], CharState::Correct);
        assert_eq!(
            tracker.counters(),
            Counters {
                typed: 1,
                correct: 1,
                mistakes: 0
            }
        );
        assert!(tracker.mistakes_by_char().is_empty());
    }

    #[test]
    fn test_type_incorrect_char_tallies_expected() {
        let mut tracker = InputTracker::new("test");

        assert_eq!(tracker.type_char('x'), Some(false));
        assert_eq!(tracker.states()[0], CharState::Incorrect);
        assert_eq!(tracker.counters().mistakes, 1);
        assert_eq!(tracker.mistakes_by_char().get("t"), Some(&1));
    }

    #[test]
    fn test_space_mistake_uses_label() {
        let mut tracker = InputTracker::new("a b");
        tracker.type_char('a');
        tracker.type_char('x');

        assert_eq!(tracker.mistakes_by_char().get(SPACE_LABEL), Some(&1));
    }

    #[test]
    fn test_type_past_end_is_noop() {
        let mut tracker = InputTracker::new("hi");
        tracker.type_char('h');
        tracker.type_char('i');
        assert!(tracker.is_exhausted());

        assert_eq!(tracker.type_char('!'), None);
        assert_eq!(tracker.counters().typed, 2);
        assert_eq!(tracker.keystrokes(), 2);
    }

    #[test]
    fn test_backspace_at_start() {
        let mut tracker = InputTracker::new("test");

        assert_eq!(tracker.backspace(), None);
        assert_eq!(tracker.caret(), 0);
        assert_eq!(tracker.counters(), Counters::default());
    }

    #[test]
    fn test_backspace_after_mistake_keeps_tally() {
        let mut tracker = InputTracker::new("test");
        tracker.type_char('t');
        let before = tracker.counters();

        tracker.type_char('x');
        assert_eq!(tracker.backspace(), Some(1));

        assert_eq!(tracker.caret(), 1);
        assert_eq!(tracker.counters(), before);
        assert_eq!(tracker.states()[1], CharState::Untyped);
        assert_eq!(tracker.mistakes_by_char().get("e"), Some(&1));
        assert_eq!(tracker.keystrokes(), 2);
    }

    #[test]
    fn test_backspace_withdraws_correct() {
        let mut tracker = InputTracker::new("ab");
        tracker.type_char('a');
        tracker.backspace();

        assert_eq!(tracker.counters(), Counters::default());
        assert_eq!(tracker.expected(), Some('a'));
    }

    #[test]
    fn test_counters_consistent_under_mixed_input() {
        let mut tracker = InputTracker::new("the quick brown fox");
        let script = "thx\u{8}e qy\u{8}\u{8}\u{8}\u{8}uick brwn";

        for c in script.chars() {
            if c == '\u{8}' {
                tracker.backspace();
            } else {
                tracker.type_char(c);
            }
            assert_consistent(&tracker);
        }
    }

    #[test]
    fn test_cat_scenario() {
        let mut tracker = InputTracker::new("cat");

        tracker.type_char('c');
        tracker.type_char('a');
        tracker.type_char('x');
        assert_eq!(tracker.counters().mistakes, 1);
        tracker.backspace();
        assert_eq!(tracker.counters().typed, 2);
        assert_eq!(tracker.counters().mistakes, 0);
        tracker.type_char('t');

        assert!(tracker.is_exhausted());
        assert_eq!(
            tracker.counters(),
            Counters {
                typed: 3,
                correct: 3,
                mistakes: 0
            }
        );
        assert_eq!(tracker.mistakes_by_char().len(), 1);
        assert_eq!(tracker.mistakes_by_char().get("t"), Some(&1));
    }
}
