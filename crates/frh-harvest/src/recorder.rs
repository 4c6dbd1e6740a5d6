//! Persistence for harvested records.
//!
//! Two artifacts per run, named `{municipality}_{source}_{timestamp}`:
//! an NDJSON log appended record by record, and a pretty-printed JSON
//! snapshot of the whole run written at the end. The NDJSON append is
//! the durability point: a run that dies mid-way leaves every record
//! harvested so far on disk.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use frh_core::{AssociationRecord, SourceSystem};

use crate::error::HarvestError;

pub struct Recorder {
    log_path: PathBuf,
    snapshot_path: PathBuf,
    log: File,
}

impl Recorder {
    /// Opens the run's NDJSON log, creating the output directory as
    /// needed.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Recorder`] when the directory or log file
    /// cannot be created.
    pub fn create(
        output_dir: &Path,
        municipality_key: &str,
        source: SourceSystem,
        started_at: DateTime<Utc>,
    ) -> Result<Self, HarvestError> {
        fs::create_dir_all(output_dir).map_err(|e| io_error(output_dir, e))?;

        let stamp = started_at.format("%Y%m%dT%H%M%SZ");
        let base = format!("{municipality_key}_{}_{stamp}", source.as_str());
        let log_path = output_dir.join(format!("{base}.ndjson"));
        let snapshot_path = output_dir.join(format!("{base}.json"));

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| io_error(&log_path, e))?;

        info!(log = %log_path.display(), "recording run");
        Ok(Self {
            log_path,
            snapshot_path,
            log,
        })
    }

    /// Appends one record as a single NDJSON line and flushes it.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Recorder`] when serialization or the write
    /// fails.
    pub fn append(&mut self, record: &AssociationRecord) -> Result<(), HarvestError> {
        let line = serde_json::to_string(record)
            .map_err(|e| io_error(&self.log_path, std::io::Error::other(e)))?;
        writeln!(self.log, "{line}").map_err(|e| io_error(&self.log_path, e))?;
        self.log.flush().map_err(|e| io_error(&self.log_path, e))?;
        Ok(())
    }

    /// Writes the whole run as one pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Recorder`] when serialization or the write
    /// fails.
    pub fn write_snapshot(&self, records: &[AssociationRecord]) -> Result<PathBuf, HarvestError> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| io_error(&self.snapshot_path, std::io::Error::other(e)))?;
        fs::write(&self.snapshot_path, json).map_err(|e| io_error(&self.snapshot_path, e))?;
        Ok(self.snapshot_path.clone())
    }

    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

fn io_error(path: &Path, source: std::io::Error) -> HarvestError {
    HarvestError::Recorder {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::Map;
    use uuid::Uuid;

    use frh_core::{Association, SourceNavigation};

    use super::*;

    fn record(name: &str) -> AssociationRecord {
        AssociationRecord {
            source_system: SourceSystem::Fri,
            municipality: "Uppsala".into(),
            scrape_run_id: Uuid::nil(),
            scraped_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            association: Association {
                name: name.into(),
                org_number: None,
                types: Vec::new(),
                activities: Vec::new(),
                categories: Vec::new(),
                homepage_url: None,
                detail_url: "https://fri.uppsala.se/forening/1".into(),
                street_address: None,
                postal_code: None,
                city: None,
                email: None,
                phone: None,
                description: None,
            },
            contacts: Vec::new(),
            source_navigation: SourceNavigation {
                list_page_index: 0,
                position_on_page: 0,
                pagination_model: "next_link".into(),
                filter_state: None,
            },
            extras: Map::new(),
        }
    }

    #[test]
    fn file_names_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let recorder =
            Recorder::create(dir.path(), "uppsala", SourceSystem::Fri, started).unwrap();

        assert_eq!(
            recorder.log_path().file_name().unwrap(),
            "uppsala_fri_20260314T093000Z.ndjson"
        );
        assert_eq!(
            recorder.snapshot_path().file_name().unwrap(),
            "uppsala_fri_20260314T093000Z.json"
        );
    }

    #[test]
    fn appended_lines_parse_back_individually() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder =
            Recorder::create(dir.path(), "uppsala", SourceSystem::Fri, Utc::now()).unwrap();

        recorder.append(&record("Sunnersta AIF")).unwrap();
        recorder.append(&record("OK Linné")).unwrap();

        let contents = fs::read_to_string(recorder.log_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AssociationRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.association.name, "Sunnersta AIF");
        let second: AssociationRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.association.name, "OK Linné");
    }

    #[test]
    fn snapshot_round_trips_the_whole_run() {
        let dir = tempfile::tempdir().unwrap();
        let recorder =
            Recorder::create(dir.path(), "uppsala", SourceSystem::Fri, Utc::now()).unwrap();

        let records = vec![record("Sunnersta AIF"), record("OK Linné")];
        let path = recorder.write_snapshot(&records).unwrap();

        let parsed: Vec<AssociationRecord> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn log_survives_across_appends() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        {
            let mut recorder =
                Recorder::create(dir.path(), "umea", SourceSystem::InterbookGo, started).unwrap();
            recorder.append(&record("Första")).unwrap();
        }
        // A second recorder for the same run appends, never truncates.
        let mut recorder =
            Recorder::create(dir.path(), "umea", SourceSystem::InterbookGo, started).unwrap();
        recorder.append(&record("Andra")).unwrap();

        let contents = fs::read_to_string(recorder.log_path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
