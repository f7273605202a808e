//! Operation state as reported by ARM

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a long-running operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationState {
    /// Parse a `status` or `provisioningState` value.
    ///
    /// Matching is case-insensitive. Any value that is not one of the three
    /// terminal states counts as in progress, since resource providers report
    /// their own in-flight spellings (`Running`, `Creating`, `Deleting`, ...).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "succeeded" => OperationState::Succeeded,
            "failed" => OperationState::Failed,
            "canceled" | "cancelled" => OperationState::Canceled,
            _ => OperationState::InProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::InProgress => "InProgress",
            OperationState::Succeeded => "Succeeded",
            OperationState::Failed => "Failed",
            OperationState::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::InProgress)
    }

    /// Only `InProgress` may move, and only forward
    pub fn can_transition_to(&self, next: OperationState) -> bool {
        match self {
            OperationState::InProgress => true,
            terminal => *terminal == next,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(OperationState::parse("SUCCEEDED"), OperationState::Succeeded);
        assert_eq!(OperationState::parse("failed"), OperationState::Failed);
        assert_eq!(OperationState::parse("Cancelled"), OperationState::Canceled);
        assert_eq!(OperationState::parse("Canceled"), OperationState::Canceled);
    }

    #[test]
    fn test_in_flight_spellings_are_in_progress() {
        for value in ["InProgress", "Running", "Accepted", "Creating", "Updating", "Deleting", ""] {
            assert_eq!(OperationState::parse(value), OperationState::InProgress, "{}", value);
        }
    }

    #[test]
    fn test_terminal_states_do_not_transition() {
        assert!(OperationState::InProgress.can_transition_to(OperationState::Succeeded));
        assert!(OperationState::InProgress.can_transition_to(OperationState::InProgress));
        assert!(!OperationState::Succeeded.can_transition_to(OperationState::InProgress));
        assert!(!OperationState::Failed.can_transition_to(OperationState::Succeeded));
        assert!(OperationState::Canceled.can_transition_to(OperationState::Canceled));
    }
}
