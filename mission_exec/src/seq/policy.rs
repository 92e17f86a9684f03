//! # Failure Policy
//!
//! Decides what the sequencer does when a command fails. The policy is configured separately for
//! each class of [`CommandError`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::cmd_port::CommandError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureParams {
    /// Policy applied when the FCS refuses a command
    #[serde(default = "default_on_rejected")]
    pub on_rejected: FailurePolicy,

    /// Policy applied when the FCS can't be reached
    #[serde(default = "default_on_unreachable")]
    pub on_unreachable: FailurePolicy,

    #[serde(default)]
    pub retry: RetryParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryParams {
    /// Total number of times a step's command is issued before giving up, including the first
    pub max_attempts: u32,

    /// Backoff before the first re-issue, doubled for each further attempt
    pub initial_backoff_s: f64,

    pub max_backoff_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the mission
    Abort,

    /// Move on to the next step without waiting for this one to complete
    Skip,

    /// Re-issue the command after a backoff
    Retry,

    /// Carry on as if the command succeeded
    Continue,
}

/// What the sequencer should do about a particular failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureAction {
    Abort,
    Skip,
    Retry { backoff_s: f64 },
    Continue,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FailureParams {
    /// Decide what to do about the error, given the number of attempts already made at the
    /// current step (including the one which just failed).
    pub fn decide(&self, error: &CommandError, attempts: u32) -> FailureAction {
        let policy = match error {
            CommandError::Rejected(_) => self.on_rejected,
            CommandError::Unreachable(_) => self.on_unreachable,
        };

        match policy {
            FailurePolicy::Abort => FailureAction::Abort,
            FailurePolicy::Skip => FailureAction::Skip,
            FailurePolicy::Continue => FailureAction::Continue,
            FailurePolicy::Retry => {
                if attempts < self.retry.max_attempts {
                    FailureAction::Retry {
                        backoff_s: self.retry.backoff_s(attempts),
                    }
                } else {
                    FailureAction::Abort
                }
            }
        }
    }
}

impl Default for FailureParams {
    fn default() -> Self {
        Self {
            on_rejected: default_on_rejected(),
            on_unreachable: default_on_unreachable(),
            retry: RetryParams::default(),
        }
    }
}

impl RetryParams {
    /// Backoff to apply after the given number of failed attempts.
    pub fn backoff_s(&self, failed_attempts: u32) -> f64 {
        let exp = failed_attempts.saturating_sub(1).min(31) as i32;
        (self.initial_backoff_s * 2f64.powi(exp)).min(self.max_backoff_s)
    }
}

impl Default for RetryParams {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_s: 0.5,
            max_backoff_s: 4.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_on_rejected() -> FailurePolicy {
    FailurePolicy::Abort
}

fn default_on_unreachable() -> FailurePolicy {
    FailurePolicy::Retry
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = FailureParams::default();

        assert_eq!(
            params.decide(&CommandError::Rejected("no".into()), 1),
            FailureAction::Abort
        );
        assert_eq!(
            params.decide(&CommandError::Unreachable("timeout".into()), 1),
            FailureAction::Retry { backoff_s: 0.5 }
        );
        assert_eq!(
            params.decide(&CommandError::Unreachable("timeout".into()), 2),
            FailureAction::Retry { backoff_s: 1.0 }
        );
        assert_eq!(
            params.decide(&CommandError::Unreachable("timeout".into()), 3),
            FailureAction::Abort
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryParams {
            max_attempts: 10,
            initial_backoff_s: 0.5,
            max_backoff_s: 4.0,
        };

        assert_eq!(retry.backoff_s(1), 0.5);
        assert_eq!(retry.backoff_s(3), 2.0);
        assert_eq!(retry.backoff_s(4), 4.0);
        assert_eq!(retry.backoff_s(9), 4.0);
        assert_eq!(retry.backoff_s(1000), 4.0);
    }

    #[test]
    fn test_from_toml() {
        let params: FailureParams = toml::from_str(
            r#"
            on_rejected = "skip"

            [retry]
            max_attempts = 5
            initial_backoff_s = 1.0
            max_backoff_s = 8.0
            "#,
        )
        .unwrap();

        assert_eq!(params.on_rejected, FailurePolicy::Skip);
        assert_eq!(params.on_unreachable, FailurePolicy::Retry);
        assert_eq!(params.retry.max_attempts, 5);
    }
}
