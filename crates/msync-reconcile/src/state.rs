//! Per-run lifecycle.
//!
//! ```text
//! Idle -> Validating -> Reconciling -> Completed
//!   |         |              |
//!   +---------+--------------+-----> Aborted
//! ```
//!
//! `Idle -> Aborted` covers a dataset read failing before validation starts.
//! `Completed` and `Aborted` are terminal; there is no partial-success state.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Validating,
    Reconciling,
    Completed,
    Aborted,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "IDLE",
            RunState::Validating => "VALIDATING",
            RunState::Reconciling => "RECONCILING",
            RunState::Completed => "COMPLETED",
            RunState::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Idle, Aborted)
                | (Validating, Reconciling)
                | (Validating, Aborted)
                | (Reconciling, Completed)
                | (Reconciling, Aborted)
        )
    }

    pub fn transition(self, next: RunState) -> Result<RunState, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: RunState,
    pub to: RunState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal run state transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let s = RunState::Idle
            .transition(RunState::Validating)
            .and_then(|s| s.transition(RunState::Reconciling))
            .and_then(|s| s.transition(RunState::Completed))
            .unwrap();
        assert_eq!(s, RunState::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn every_live_state_can_abort() {
        for s in [RunState::Idle, RunState::Validating, RunState::Reconciling] {
            assert!(s.can_transition_to(RunState::Aborted), "{s} must be abortable");
        }
    }

    #[test]
    fn cannot_skip_validation() {
        let err = RunState::Idle.transition(RunState::Reconciling).unwrap_err();
        assert_eq!(err.to_string(), "illegal run state transition IDLE -> RECONCILING");
    }

    #[test]
    fn terminal_states_are_final() {
        for s in [RunState::Completed, RunState::Aborted] {
            for next in [
                RunState::Idle,
                RunState::Validating,
                RunState::Reconciling,
                RunState::Completed,
                RunState::Aborted,
            ] {
                assert!(!s.can_transition_to(next));
            }
        }
    }
}
