//! Threshold rule deciding whether the conversation loop keeps requesting replies.

use serde::{Deserialize, Serialize};

/// How the command-count and error thresholds combine.
///
/// `Literal` keeps looping while `executed < min_commands || errors > max_errors`.
/// The threshold exit therefore needs enough executed commands *and* a low
/// error count at the same time; a run of unparsable replies alone never ends
/// the loop. `Bounded` stops as soon as either threshold is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopRule {
    #[default]
    Literal,
    Bounded,
}

/// Counters evaluated by [`StopRule::should_continue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopProgress {
    /// Commands attempted so far, across every run of the loop.
    pub executed: usize,
    /// Replies without any extractable command in the current run.
    pub errors: u32,
}

/// Thresholds evaluated by [`StopRule::should_continue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub min_commands: usize,
    pub max_errors: u32,
}

impl StopRule {
    pub fn should_continue(self, progress: LoopProgress, thresholds: Thresholds) -> bool {
        let below_min = progress.executed < thresholds.min_commands;
        let over_errors = progress.errors > thresholds.max_errors;
        match self {
            StopRule::Literal => below_min || over_errors,
            StopRule::Bounded => below_min && !over_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: Thresholds = Thresholds {
        min_commands: 5,
        max_errors: 3,
    };

    fn progress(executed: usize, errors: u32) -> LoopProgress {
        LoopProgress { executed, errors }
    }

    #[test]
    fn literal_keeps_going_on_errors_alone() {
        for errors in 0..10 {
            assert!(StopRule::Literal.should_continue(progress(0, errors), THRESHOLDS));
        }
    }

    #[test]
    fn literal_stops_only_with_enough_commands_and_few_errors() {
        assert!(!StopRule::Literal.should_continue(progress(5, 0), THRESHOLDS));
        assert!(!StopRule::Literal.should_continue(progress(7, 3), THRESHOLDS));
        assert!(StopRule::Literal.should_continue(progress(5, 4), THRESHOLDS));
        assert!(StopRule::Literal.should_continue(progress(4, 0), THRESHOLDS));
    }

    #[test]
    fn bounded_stops_on_either_threshold() {
        assert!(StopRule::Bounded.should_continue(progress(4, 3), THRESHOLDS));
        assert!(!StopRule::Bounded.should_continue(progress(5, 0), THRESHOLDS));
        assert!(!StopRule::Bounded.should_continue(progress(0, 4), THRESHOLDS));
    }

    #[test]
    fn default_is_literal() {
        assert_eq!(StopRule::default(), StopRule::Literal);
    }
}
