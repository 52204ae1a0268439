use std::fmt;

use msync_reconcile::{IllegalTransition, ReconcileError, RunState};
use msync_store::StoreError;
use uuid::Uuid;

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// One of the dataset reads failed; nothing was validated.
    Read(StoreError),
    /// The data broke a batch or row rule.
    Rejected(ReconcileError),
    /// The writer refused the update for `sample_id`.
    Write { sample_id: String, source: StoreError },
    /// The audit log could not be appended.
    Audit(String),
    State(IllegalTransition),
}

impl RunError {
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Read(_) => "READ_FAILURE",
            RunError::Rejected(e) => e.kind().as_str(),
            RunError::Write { .. } => "WRITE_FAILURE",
            RunError::Audit(_) => "AUDIT_FAILURE",
            RunError::State(_) => "ILLEGAL_TRANSITION",
        }
    }

    pub fn sample_id(&self) -> Option<&str> {
        match self {
            RunError::Rejected(e) => e.sample_id(),
            RunError::Write { sample_id, .. } => Some(sample_id),
            _ => None,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Read(e) => write!(f, "{e}"),
            RunError::Rejected(e) => write!(f, "{e}"),
            // Writer errors surface unchanged.
            RunError::Write { source, .. } => write!(f, "{source}"),
            RunError::Audit(msg) => write!(f, "audit log append failed: {msg}"),
            RunError::State(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Read(e) => Some(e),
            RunError::Rejected(e) => Some(e),
            RunError::Write { source, .. } => Some(source),
            RunError::Audit(_) => None,
            RunError::State(e) => Some(e),
        }
    }
}

impl From<ReconcileError> for RunError {
    fn from(e: ReconcileError) -> Self {
        RunError::Rejected(e)
    }
}

impl From<IllegalTransition> for RunError {
    fn from(e: IllegalTransition) -> Self {
        RunError::State(e)
    }
}

/// A run that ended in `Aborted`.
///
/// `state` is the phase the run was in when it failed. Rows merged before the
/// failure stay merged; `rows_merged` says how many.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAbort {
    pub run_id: Uuid,
    pub rows_merged: usize,
    pub state: RunState,
    pub cause: RunError,
}

impl fmt::Display for RunAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl std::error::Error for RunAbort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_displays_cause_verbatim() {
        let abort = RunAbort {
            run_id: Uuid::nil(),
            rows_merged: 0,
            state: RunState::Reconciling,
            cause: RunError::Rejected(ReconcileError::UnmatchedRow { key: "S2".into() }),
        };
        assert_eq!(
            abort.to_string(),
            "S2 was listed in the new CSV but it could not be found in the original Manifest. \
             Please fix this error and run the script again."
        );
    }

    #[test]
    fn write_failure_passes_store_error_through() {
        let source = StoreError::Rejected("locked".into());
        let err = RunError::Write {
            sample_id: "S1".into(),
            source: source.clone(),
        };
        assert_eq!(err.to_string(), source.to_string());
        assert_eq!(err.kind(), "WRITE_FAILURE");
        assert_eq!(err.sample_id(), Some("S1"));
    }
}
