use std::fmt;

const FIX_AND_RERUN: &str = "Please fix this error and run the script again.";

/// Where a duplicated batch key was seen (1-based batch positions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateContext {
    pub key: String,
    pub first_row: usize,
    pub second_row: usize,
}

/// Fatal data errors. Any of these aborts the whole run.
///
/// The `Display` text is the operator-facing message. Batch-level variants
/// carry row context only when the caller asked for it
/// ([`crate::ValidationOptions::name_offending_rows`]); otherwise the stock
/// wording is used and the offending row is not named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    DuplicateBatchKey { context: Option<DuplicateContext> },
    MissingSampleId { row: Option<usize> },
    DuplicateManifestKey { key: String, count: usize },
    UnmatchedRow { key: String },
}

/// Stable machine-readable tag for a [`ReconcileError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcileErrorKind {
    DuplicateBatchKey,
    MissingSampleId,
    DuplicateManifestKey,
    UnmatchedRow,
}

impl ReconcileErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileErrorKind::DuplicateBatchKey => "DUPLICATE_BATCH_KEY",
            ReconcileErrorKind::MissingSampleId => "MISSING_SAMPLE_ID",
            ReconcileErrorKind::DuplicateManifestKey => "DUPLICATE_MANIFEST_KEY",
            ReconcileErrorKind::UnmatchedRow => "UNMATCHED_ROW",
        }
    }
}

impl ReconcileError {
    pub fn kind(&self) -> ReconcileErrorKind {
        match self {
            ReconcileError::DuplicateBatchKey { .. } => ReconcileErrorKind::DuplicateBatchKey,
            ReconcileError::MissingSampleId { .. } => ReconcileErrorKind::MissingSampleId,
            ReconcileError::DuplicateManifestKey { .. } => {
                ReconcileErrorKind::DuplicateManifestKey
            }
            ReconcileError::UnmatchedRow { .. } => ReconcileErrorKind::UnmatchedRow,
        }
    }

    /// Batch-level errors are raised before any row is resolved.
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            ReconcileError::DuplicateBatchKey { .. } | ReconcileError::MissingSampleId { .. }
        )
    }

    /// The sample key the error is about, where one is known.
    pub fn sample_id(&self) -> Option<&str> {
        match self {
            ReconcileError::DuplicateBatchKey { context } => {
                context.as_ref().map(|c| c.key.as_str())
            }
            ReconcileError::MissingSampleId { .. } => None,
            ReconcileError::DuplicateManifestKey { key, .. } => Some(key),
            ReconcileError::UnmatchedRow { key } => Some(key),
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::DuplicateBatchKey { context: None } => {
                write!(f, "Duplicate detected in CSV table. {FIX_AND_RERUN}")
            }
            ReconcileError::DuplicateBatchKey { context: Some(c) } => write!(
                f,
                "Duplicate detected in CSV table: '{}' appears on rows {} and {}. {FIX_AND_RERUN}",
                c.key, c.first_row, c.second_row
            ),
            ReconcileError::MissingSampleId { row: None } => write!(
                f,
                "There is a row in the CSV file that does not have a Sample ID. {FIX_AND_RERUN}"
            ),
            ReconcileError::MissingSampleId { row: Some(r) } => write!(
                f,
                "There is a row in the CSV file (row {r}) that does not have a Sample ID. {FIX_AND_RERUN}"
            ),
            ReconcileError::DuplicateManifestKey { key, .. } => {
                write!(f, "{key} duplicate detected in Manifest Table. {FIX_AND_RERUN}")
            }
            ReconcileError::UnmatchedRow { key } => write!(
                f,
                "{key} was listed in the new CSV but it could not be found in the original Manifest. {FIX_AND_RERUN}"
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_messages_do_not_name_rows() {
        let dup = ReconcileError::DuplicateBatchKey { context: None };
        assert_eq!(
            dup.to_string(),
            "Duplicate detected in CSV table. Please fix this error and run the script again."
        );

        let missing = ReconcileError::MissingSampleId { row: None };
        assert_eq!(
            missing.to_string(),
            "There is a row in the CSV file that does not have a Sample ID. Please fix this error and run the script again."
        );
    }

    #[test]
    fn row_level_messages_lead_with_the_key() {
        let e = ReconcileError::DuplicateManifestKey {
            key: "S7".to_string(),
            count: 2,
        };
        assert_eq!(
            e.to_string(),
            "S7 duplicate detected in Manifest Table. Please fix this error and run the script again."
        );

        let e = ReconcileError::UnmatchedRow {
            key: "S2".to_string(),
        };
        assert!(e
            .to_string()
            .starts_with("S2 was listed in the new CSV but it could not be found"));
        assert_eq!(e.sample_id(), Some("S2"));
    }

    #[test]
    fn detailed_messages_name_the_row() {
        let e = ReconcileError::MissingSampleId { row: Some(4) };
        assert!(e.to_string().contains("(row 4)"));

        let e = ReconcileError::DuplicateBatchKey {
            context: Some(DuplicateContext {
                key: "S1".to_string(),
                first_row: 1,
                second_row: 3,
            }),
        };
        assert!(e.to_string().contains("'S1' appears on rows 1 and 3"));
    }

    #[test]
    fn kinds_are_stable() {
        assert!(ReconcileError::MissingSampleId { row: None }.is_batch_level());
        assert!(!ReconcileError::UnmatchedRow { key: "x".into() }.is_batch_level());
        assert_eq!(
            ReconcileError::UnmatchedRow { key: "x".into() }.kind().as_str(),
            "UNMATCHED_ROW"
        );
    }
}
