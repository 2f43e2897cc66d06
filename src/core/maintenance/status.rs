//! Maintenance status labels and the transition table between them.
//!
//! The table lists, for each status, the statuses it may be entered from.
//! Whether a transition outside the table is refused or only flagged is
//! decided by the [`TransitionPolicy`].

use crate::{
    config::store::MaintenanceConfig,
    core::string_enum,
    errors::{Error, Result},
};

string_enum! {
    /// Lifecycle status of a repair ticket
    pub enum MaintenanceStatus("status") {
        Received => "received",
        Diagnosed => "diagnosed",
        WaitingApproval => "waiting_approval",
        Approved => "approved",
        InProgress => "in_progress",
        Testing => "testing",
        Ready => "ready",
        Completed => "completed",
        Cancelled => "cancelled",
        OnHold => "on_hold",
    }
}

use MaintenanceStatus::{
    Approved, Cancelled, Completed, Diagnosed, InProgress, OnHold, Ready, Received, Testing,
    WaitingApproval,
};

impl MaintenanceStatus {
    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Completed | Cancelled)
    }

    /// Statuses this one may legally be entered from.
    #[must_use]
    pub const fn allowed_predecessors(self) -> &'static [Self] {
        match self {
            Received => &[OnHold],
            Diagnosed => &[Received, OnHold],
            WaitingApproval => &[Diagnosed, OnHold],
            Approved => &[WaitingApproval, OnHold],
            InProgress => &[Diagnosed, Approved, Testing, OnHold],
            Testing => &[InProgress, OnHold],
            Ready => &[Testing, OnHold],
            Completed => &[Ready],
            Cancelled => &[
                Received,
                Diagnosed,
                WaitingApproval,
                Approved,
                InProgress,
                Testing,
                Ready,
                OnHold,
            ],
            OnHold => &[
                Received,
                Diagnosed,
                WaitingApproval,
                Approved,
                InProgress,
                Testing,
                Ready,
            ],
        }
    }

    /// Whether `self -> to` is in the transition table.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        to.allowed_predecessors().contains(&self)
    }
}

/// What to do with a transition that is not in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Accept it and flag the history entry as out of sequence
    #[default]
    Permissive,
    /// Refuse it with [`Error::IllegalTransition`]
    Strict,
}

impl From<MaintenanceConfig> for TransitionPolicy {
    fn from(config: MaintenanceConfig) -> Self {
        if config.strict_transitions {
            Self::Strict
        } else {
            Self::Permissive
        }
    }
}

impl TransitionPolicy {
    /// Checks a transition, returning whether it is out of sequence.
    ///
    /// # Errors
    /// Returns `Error::IllegalTransition` for an out-of-table transition under [`TransitionPolicy::Strict`].
    pub fn check(self, from: MaintenanceStatus, to: MaintenanceStatus) -> Result<bool> {
        if from.can_transition_to(to) {
            return Ok(false);
        }
        match self {
            Self::Permissive => Ok(true),
            Self::Strict => Err(Error::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            Received,
            Diagnosed,
            WaitingApproval,
            Approved,
            InProgress,
            Testing,
            Ready,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_cancel_and_hold_reachable_from_every_open_status() {
        for status in MaintenanceStatus::ALL {
            if status.is_terminal() {
                continue;
            }
            assert!(status.can_transition_to(Cancelled), "{status} -> cancelled");
            if *status != OnHold {
                assert!(status.can_transition_to(OnHold), "{status} -> on_hold");
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for to in MaintenanceStatus::ALL {
            assert!(!Completed.can_transition_to(*to));
            assert!(!Cancelled.can_transition_to(*to));
        }
    }

    #[test]
    fn test_skipping_ahead_is_not_in_table() {
        assert!(!Received.can_transition_to(Completed));
        assert!(!WaitingApproval.can_transition_to(InProgress));
        assert!(!Diagnosed.can_transition_to(Diagnosed));
    }

    #[test]
    fn test_policy_check() {
        assert_eq!(TransitionPolicy::Strict.check(Received, Diagnosed).ok(), Some(false));
        assert_eq!(TransitionPolicy::Permissive.check(Received, Completed).ok(), Some(true));
        assert!(matches!(
            TransitionPolicy::Strict.check(Received, Completed),
            Err(Error::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_policy_from_config() {
        let strict = MaintenanceConfig {
            strict_transitions: true,
        };
        assert_eq!(TransitionPolicy::from(strict), TransitionPolicy::Strict);
        assert_eq!(
            TransitionPolicy::from(MaintenanceConfig::default()),
            TransitionPolicy::Permissive
        );
    }

    #[test]
    fn test_status_names() {
        assert_eq!(WaitingApproval.as_str(), "waiting_approval");
        assert_eq!("on_hold".parse::<MaintenanceStatus>().ok(), Some(OnHold));
        assert!("shipped".parse::<MaintenanceStatus>().is_err());
    }
}
