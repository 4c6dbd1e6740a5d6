//! Post-run handoff of the snapshot to an external importer.
//!
//! The handoff is advisory: a failed import is logged by the caller
//! and never fails the run, since the records are already safe on
//! disk.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::HarvestError;

#[async_trait]
pub trait Importer: Send + Sync {
    /// Hands a finished snapshot to the downstream import step.
    ///
    /// # Errors
    ///
    /// [`HarvestError::ImportHandoff`] when the importer could not be
    /// run or reported failure.
    async fn import(&self, snapshot: &Path, municipality: &str) -> Result<(), HarvestError>;
}

/// Used when no import command is configured.
pub struct NoImport;

#[async_trait]
impl Importer for NoImport {
    async fn import(&self, snapshot: &Path, _municipality: &str) -> Result<(), HarvestError> {
        debug!(snapshot = %snapshot.display(), "no import command configured, skipping handoff");
        Ok(())
    }
}

/// Runs a configured command line with the snapshot path and the
/// municipality appended as the final two arguments.
pub struct ImportCommand {
    program: String,
    leading_args: Vec<String>,
}

impl ImportCommand {
    /// Splits a command line on whitespace into program and leading
    /// arguments. Returns `None` for a blank command line.
    #[must_use]
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            leading_args: parts.collect(),
        })
    }
}

#[async_trait]
impl Importer for ImportCommand {
    async fn import(&self, snapshot: &Path, municipality: &str) -> Result<(), HarvestError> {
        info!(
            command = %self.program,
            snapshot = %snapshot.display(),
            municipality,
            "handing snapshot to importer"
        );
        let status = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(snapshot)
            .arg(municipality)
            .status()
            .await
            .map_err(|e| HarvestError::ImportHandoff {
                reason: format!("could not launch {}: {e}", self.program),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(HarvestError::ImportHandoff {
                reason: format!("{} exited with {status}", self.program),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_splits_into_program_and_args() {
        let importer = ImportCommand::from_command_line("python3 scripts/import.py --verbose")
            .expect("non-empty command line");
        assert_eq!(importer.program, "python3");
        assert_eq!(importer.leading_args, vec!["scripts/import.py", "--verbose"]);
    }

    #[test]
    fn blank_command_line_is_rejected() {
        assert!(ImportCommand::from_command_line("   ").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_reports_ok() {
        let importer = ImportCommand::from_command_line("true").unwrap();
        let result = importer.import(Path::new("/tmp/snapshot.json"), "uppsala").await;
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_handoff_error() {
        let importer = ImportCommand::from_command_line("false").unwrap();
        let result = importer.import(Path::new("/tmp/snapshot.json"), "uppsala").await;
        assert!(matches!(
            result,
            Err(HarvestError::ImportHandoff { .. })
        ));
    }
}
