//! Error types for the harvest engine.
//!
//! Errors fall into four scopes. [`HarvestError::ListNotReady`] and
//! [`HarvestError::Navigation`] abort the whole run, since a broken
//! list page leaves nothing to iterate. [`HarvestError::DetailInteraction`]
//! and [`HarvestError::MissingName`] are confined to a single row: the
//! coordinator logs them, counts the row as skipped and moves on.
//! [`HarvestError::Recorder`] aborts (losing output is worse than losing
//! a run), while [`HarvestError::ImportHandoff`] is only ever logged.

use thiserror::Error;

use crate::surface::DriverError;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// The association list never rendered on the start page.
    #[error("association list never became ready: {context}")]
    ListNotReady { context: String },

    /// A list-level browser operation failed beyond recovery.
    #[error("navigation failed during {action}: {source}")]
    Navigation {
        action: String,
        #[source]
        source: DriverError,
    },

    /// Opening, capturing or closing one row's detail view failed.
    #[error("detail interaction failed for row {row} on page {page}: {reason}")]
    DetailInteraction { page: u32, row: u32, reason: String },

    /// A detail surface yielded no association name at all.
    #[error("row {row} on page {page} has no association name")]
    MissingName { page: u32, row: u32 },

    /// Writing the record log or snapshot failed.
    #[error("recorder I/O error on {path}: {source}")]
    Recorder {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The post-run import command failed. Never fatal.
    #[error("import handoff failed: {reason}")]
    ImportHandoff { reason: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl HarvestError {
    /// Whether this error is confined to a single list row.
    ///
    /// Row-scoped errors are logged and counted; everything else
    /// ends the run.
    #[must_use]
    pub fn is_row_scoped(&self) -> bool {
        matches!(
            self,
            Self::DetailInteraction { .. } | Self::MissingName { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_interaction_is_row_scoped() {
        let err = HarvestError::DetailInteraction {
            page: 2,
            row: 7,
            reason: "modal never appeared".into(),
        };
        assert!(err.is_row_scoped());
    }

    #[test]
    fn missing_name_is_row_scoped() {
        let err = HarvestError::MissingName { page: 0, row: 3 };
        assert!(err.is_row_scoped());
    }

    #[test]
    fn list_not_ready_is_fatal() {
        let err = HarvestError::ListNotReady {
            context: "#register".into(),
        };
        assert!(!err.is_row_scoped());
    }

    #[test]
    fn import_handoff_is_not_row_scoped() {
        let err = HarvestError::ImportHandoff {
            reason: "exit status 1".into(),
        };
        assert!(!err.is_row_scoped());
    }

    #[test]
    fn error_messages_carry_position() {
        let err = HarvestError::MissingName { page: 1, row: 4 };
        let msg = err.to_string();
        assert!(msg.contains("row 4"), "got: {msg}");
        assert!(msg.contains("page 1"), "got: {msg}");
    }
}
