//! Orchestration of a complete harvest run for one site.
//!
//! The coordinator walks the paginated register, captures and extracts
//! one detail surface per row, sanitizes each record, and appends it
//! to the run log before moving on. Row-scoped failures are counted
//! and skipped; anything else ends the run. When the last page is done
//! it writes the snapshot and hands it to the importer exactly once.

mod import;

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use frh_core::{
    AppConfig, Association, AssociationRecord, Description, SourceNavigation, SourceSystem,
};

use crate::error::HarvestError;
use crate::extract::{strategy_for, DetailExtraction, ExtractionStrategy};
use crate::navigator::Navigator;
use crate::recorder::Recorder;
use crate::sanitize::sanitize_record;
use crate::sites::SiteDefinition;
use crate::surface::PageDriver;

pub use import::{ImportCommand, Importer, NoImport};

/// Counters accumulated while a run is in flight.
#[derive(Debug, Default)]
pub struct RunStats {
    pub total_records: usize,
    pub rows_skipped: usize,
    pub pages_visited: usize,
    pub missing_org_number: usize,
    pub missing_contact: usize,
    pub missing_address: usize,
    /// Register's own result count, when the page exposes one.
    pub expected_total: Option<usize>,
    homepage_domains: HashSet<String>,
    types_seen: HashSet<String>,
    activities_seen: HashSet<String>,
}

impl RunStats {
    fn observe(&mut self, record: &AssociationRecord) {
        self.total_records += 1;

        let association = &record.association;
        if association.org_number.is_none() {
            self.missing_org_number += 1;
        }
        let has_contact = !record.contacts.is_empty()
            || association.email.is_some()
            || association.phone.is_some();
        if !has_contact {
            self.missing_contact += 1;
        }
        let has_address = association.street_address.is_some()
            || association.postal_code.is_some()
            || association.city.is_some();
        if !has_address {
            self.missing_address += 1;
        }
        if let Some(raw) = &association.homepage_url {
            let host = Url::parse(raw)
                .ok()
                .and_then(|u| u.host_str().map(str::to_lowercase));
            if let Some(host) = host {
                self.homepage_domains.insert(host);
            }
        }
        for item in &association.types {
            self.types_seen.insert(item.to_lowercase());
        }
        for item in &association.activities {
            self.activities_seen.insert(item.to_lowercase());
        }
    }

    #[must_use]
    pub fn distinct_homepage_domains(&self) -> usize {
        self.homepage_domains.len()
    }

    #[must_use]
    pub fn distinct_types(&self) -> usize {
        self.types_seen.len()
    }

    #[must_use]
    pub fn distinct_activities(&self) -> usize {
        self.activities_seen.len()
    }
}

/// What a finished run produced, for reporting at the CLI boundary.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub site_key: String,
    pub municipality: String,
    pub source_system: SourceSystem,
    pub stats: RunStats,
    pub log_path: PathBuf,
    pub snapshot_path: PathBuf,
}

/// Values fixed at run start and stamped verbatim on every record, so
/// all records of one run share the same provenance.
struct RunProvenance<'a> {
    run_id: Uuid,
    scraped_at: DateTime<Utc>,
    pagination_model: &'a str,
    filter_state: Option<&'a str>,
}

/// Drives one harvest run end to end for a single site.
pub struct RunCoordinator<'a> {
    driver: &'a dyn PageDriver,
    site: &'a SiteDefinition,
    config: &'a AppConfig,
    importer: &'a dyn Importer,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(
        driver: &'a dyn PageDriver,
        site: &'a SiteDefinition,
        config: &'a AppConfig,
        importer: &'a dyn Importer,
    ) -> Self {
        Self {
            driver,
            site,
            config,
            importer,
        }
    }

    /// Harvests every list page of the site.
    ///
    /// # Errors
    ///
    /// Returns the first non-row-scoped [`HarvestError`]: the list
    /// never became ready, navigation failed beyond recovery, or the
    /// recorder could not write. Row-scoped failures are logged,
    /// counted in `rows_skipped`, and do not end the run.
    pub async fn run(&self) -> Result<RunSummary, HarvestError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let profile = self.site.profile();
        let pagination_model = profile.pagination.model.as_str();
        let strategy = strategy_for(self.site.source_system);
        let mut navigator = Navigator::new(self.driver, &profile, self.site.start_url, self.config);
        let mut recorder = Recorder::create(
            &self.config.output_dir,
            self.site.key,
            self.site.source_system,
            started_at,
        )?;

        info!(
            site = self.site.key,
            municipality = self.site.municipality,
            source = self.site.source_system.as_str(),
            %run_id,
            "starting harvest run"
        );

        navigator.start().await?;

        let mut stats = RunStats {
            expected_total: navigator.probe_expected_total().await,
            ..RunStats::default()
        };
        let filter_state = navigator.read_filter_state().await;
        let provenance = RunProvenance {
            run_id,
            scraped_at: started_at,
            pagination_model,
            filter_state: filter_state.as_deref(),
        };
        let mut records: Vec<AssociationRecord> = Vec::new();

        loop {
            let row_count = navigator.row_count().await?;
            debug!(
                page = navigator.current_page(),
                rows = row_count,
                "harvesting list page"
            );

            for row in 0..row_count {
                let outcome = self
                    .harvest_row(&navigator, strategy, &provenance, row)
                    .await;
                match outcome {
                    Ok(record) => {
                        recorder.append(&record)?;
                        stats.observe(&record);
                        records.push(record);
                    }
                    Err(error) if error.is_row_scoped() => {
                        warn!(
                            page = navigator.current_page(),
                            row,
                            error = %error,
                            "skipping row"
                        );
                        stats.rows_skipped += 1;
                    }
                    Err(error) => return Err(error),
                }
            }

            stats.pages_visited += 1;
            if stats.pages_visited >= self.config.page_limit {
                warn!(
                    limit = self.config.page_limit,
                    "page safety limit reached, ending run"
                );
                break;
            }
            if !navigator.go_to_next_page().await? {
                break;
            }
        }

        let snapshot_path = recorder.write_snapshot(&records)?;

        if let Some(expected) = stats.expected_total {
            if expected != stats.total_records {
                warn!(
                    expected,
                    actual = stats.total_records,
                    skipped = stats.rows_skipped,
                    "record count differs from the register's stated total"
                );
            }
        }
        info!(
            records = stats.total_records,
            pages = stats.pages_visited,
            skipped = stats.rows_skipped,
            missing_org_number = stats.missing_org_number,
            missing_contact = stats.missing_contact,
            missing_address = stats.missing_address,
            homepage_domains = stats.distinct_homepage_domains(),
            snapshot = %snapshot_path.display(),
            "harvest run finished"
        );

        if let Err(error) = self
            .importer
            .import(&snapshot_path, self.site.municipality)
            .await
        {
            warn!(error = %error, "import handoff failed, records remain on disk");
        }

        Ok(RunSummary {
            run_id,
            site_key: self.site.key.to_owned(),
            municipality: self.site.municipality.to_owned(),
            source_system: self.site.source_system,
            stats,
            log_path: recorder.log_path().to_owned(),
            snapshot_path,
        })
    }

    async fn harvest_row(
        &self,
        navigator: &Navigator<'_>,
        strategy: &dyn ExtractionStrategy,
        provenance: &RunProvenance<'_>,
        row: usize,
    ) -> Result<AssociationRecord, HarvestError> {
        let page = navigator.current_page();
        // List-level reads come first: once the detail surface is open the
        // row may be occluded or replaced.
        let name_hint = navigator.row_name(row).await;
        let detail_url = navigator.row_detail_url(row).await;

        let surface = navigator.capture_row_detail(row).await?;
        let extraction = strategy
            .extract(&surface, name_hint.as_deref())
            .map_err(|_| HarvestError::MissingName {
                page,
                row: row_index(row),
            })?;

        let record = build_record(self.site, provenance, page, row, detail_url, extraction);
        Ok(sanitize_record(record))
    }
}

fn build_record(
    site: &SiteDefinition,
    provenance: &RunProvenance<'_>,
    page: u32,
    row: usize,
    detail_url: Option<String>,
    extraction: DetailExtraction,
) -> AssociationRecord {
    let DetailExtraction {
        name,
        org_number,
        email,
        phone,
        homepage_url,
        street_address,
        postal_code,
        city,
        types,
        activities,
        categories,
        free_text,
        sections,
        contacts,
        extras,
    } = extraction;

    // Rows without a permalink still get a stable, re-findable anchor.
    let detail_url =
        detail_url.unwrap_or_else(|| format!("{}#row-{page}-{row}", site.start_url));
    let description = match (free_text, sections.is_empty()) {
        (None, true) => None,
        (Some(text), true) => Some(Description::Text(text)),
        (free_text, false) => Some(Description::Structured {
            free_text,
            sections,
        }),
    };

    AssociationRecord {
        source_system: site.source_system,
        municipality: site.municipality.to_owned(),
        scrape_run_id: provenance.run_id,
        scraped_at: provenance.scraped_at,
        association: Association {
            name,
            org_number,
            types,
            activities,
            categories,
            homepage_url,
            detail_url,
            street_address,
            postal_code,
            city,
            email,
            phone,
            description,
        },
        contacts,
        source_navigation: SourceNavigation {
            list_page_index: page,
            position_on_page: row_index(row),
            pagination_model: provenance.pagination_model.to_owned(),
            filter_state: provenance.filter_state.map(str::to_owned),
        },
        extras,
    }
}

fn row_index(row: usize) -> u32 {
    u32::try_from(row).unwrap_or(u32::MAX)
}
