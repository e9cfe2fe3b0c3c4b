//! Pass/fail classification of echoes

use std::fmt;

use crate::constants::RESULT_LABEL_WIDTH;

use super::sequencer::SequencerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "PASSED"),
            TestStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Result of one comparison. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub label: String,
    pub status: TestStatus,
    pub expected_text: String,
    pub received_text: String,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }

    /// Lines shown in the console; failures carry both texts
    pub fn console_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{:<width$} {}",
            self.label,
            self.status,
            width = RESULT_LABEL_WIDTH
        )];
        if self.status == TestStatus::Failed {
            lines.push(format!("\t> expected {}", self.expected_text));
            lines.push(format!("\t> received {}", self.received_text));
        }
        lines
    }
}

/// Compares echoes against the single outstanding expectation
#[derive(Debug, Default, Clone, Copy)]
pub struct Verifier;

impl Verifier {
    /// Exact text comparison, no numeric tolerance
    pub fn compare(&self, label: &str, expected: &str, received: &str) -> TestOutcome {
        let status = if expected == received {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        TestOutcome {
            label: label.to_string(),
            status,
            expected_text: expected.to_string(),
            received_text: received.to_string(),
        }
    }

    /// Classify an echo against the last issued stimulus.
    ///
    /// Returns None when nothing has been issued yet.
    pub fn on_echo(&self, label: &str, echo_text: &str, state: &SequencerState) -> Option<TestOutcome> {
        let expected = state.last_expected_text()?;
        Some(self.compare(label, expected, echo_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_text_passes() {
        let outcome = Verifier.compare("Message", "test 1;", "test 1;");
        assert!(outcome.passed());
        assert_eq!(outcome.console_lines().len(), 1);
        assert!(outcome.console_lines()[0].ends_with("PASSED"));
    }

    #[test]
    fn test_one_character_difference_fails() {
        let outcome = Verifier.compare("Float", "0.5", "0.6");
        assert_eq!(outcome.status, TestStatus::Failed);

        let outcome = Verifier.compare("Symbol", "abc", "abc ");
        assert_eq!(outcome.status, TestStatus::Failed);
    }

    #[test]
    fn test_list_separator_mismatch() {
        let outcome = Verifier.compare("List", "0; 15.99; test;", "0 15.99 test;");
        assert_eq!(outcome.status, TestStatus::Failed);
        assert_eq!(outcome.expected_text, "0; 15.99; test;");
        assert_eq!(outcome.received_text, "0 15.99 test;");

        let lines = outcome.console_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "\t> expected 0; 15.99; test;");
        assert_eq!(lines[2], "\t> received 0 15.99 test;");
    }

    #[test]
    fn test_numeric_equal_but_textually_different_fails() {
        let outcome = Verifier.compare("Float", "1", "1.0");
        assert_eq!(outcome.status, TestStatus::Failed);
    }

    #[test]
    fn test_no_expectation_no_outcome() {
        let state = SequencerState::default();
        assert!(Verifier.on_echo("Bang", "bang", &state).is_none());
    }

    #[test]
    fn test_on_echo_uses_last_expectation() {
        let mut state = SequencerState::default();
        state.expect("bang");
        let outcome = Verifier.on_echo("Bang", "bang", &state).unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.label, "Bang");
    }
}
