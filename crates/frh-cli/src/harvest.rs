//! The `run` and `sites` command handlers.
//!
//! `run` is called from `main` after configuration and logging are
//! established. With `--all`, per-site failures are logged and skipped
//! rather than propagated so one broken registry does not abort the
//! other harvests.

use clap::Args;
use tracing::{error, info, warn};

use frh_core::AppConfig;
use frh_harvest::run::{ImportCommand, Importer, NoImport, RunSummary};
use frh_harvest::{all_sites, find_site, ChromeDriver, RunCoordinator, SiteDefinition};

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Site key to harvest (see `sites`).
    #[arg(long, conflicts_with = "all")]
    site: Option<String>,
    /// Harvest every site in the catalog.
    #[arg(long)]
    all: bool,
    /// Run with a visible browser window, overriding `FRH_HEADLESS`.
    #[arg(long)]
    headed: bool,
}

/// Harvests the selected sites, one browser session per site.
///
/// # Errors
///
/// Returns an error when no valid target is selected, when a
/// single-site harvest fails, or when every site of an `--all` run
/// fails. Partial `--all` failures are logged and reported through the
/// exit message of the sites that did succeed.
pub(crate) async fn run(config: &AppConfig, args: &RunArgs) -> anyhow::Result<()> {
    let sites = resolve_targets(args.site.as_deref(), args.all)?;
    let headless = config.headless && !args.headed;

    let importer: Box<dyn Importer> = match config.import_command.as_deref() {
        Some(command_line) => match ImportCommand::from_command_line(command_line) {
            Some(command) => Box::new(command),
            None => {
                warn!("FRH_IMPORT_COMMAND is blank, skipping the import handoff");
                Box::new(NoImport)
            }
        },
        None => Box::new(NoImport),
    };

    let mut failures: Vec<(&str, anyhow::Error)> = Vec::new();
    for site in &sites {
        info!(site = site.key, headless, "launching browser");
        let driver = match ChromeDriver::launch(headless).await {
            Ok(driver) => driver,
            Err(e) => {
                error!(site = site.key, error = %e, "browser launch failed");
                failures.push((site.key, anyhow::anyhow!("browser launch failed: {e}")));
                continue;
            }
        };

        let outcome = RunCoordinator::new(&driver, site, config, importer.as_ref())
            .run()
            .await;
        driver.shutdown().await;

        match outcome {
            Ok(summary) => print_summary(&summary),
            Err(e) => {
                error!(site = site.key, error = %e, "harvest failed");
                failures.push((site.key, e.into()));
            }
        }
    }

    if failures.is_empty() {
        return Ok(());
    }
    if sites.len() == 1 {
        if let Some((_, error)) = failures.pop() {
            return Err(error);
        }
    }
    let failed: Vec<&str> = failures.iter().map(|(key, _)| *key).collect();
    anyhow::bail!(
        "{} of {} harvests failed: [{}]",
        failures.len(),
        sites.len(),
        failed.join(", ")
    )
}

fn resolve_targets(
    site: Option<&str>,
    all: bool,
) -> anyhow::Result<Vec<&'static SiteDefinition>> {
    match (site, all) {
        (Some(key), false) => {
            let site = find_site(key).ok_or_else(|| {
                anyhow::anyhow!("unknown site \"{key}\", run `frh-cli sites` to list site keys")
            })?;
            Ok(vec![site])
        }
        (None, true) => Ok(all_sites().iter().collect()),
        _ => anyhow::bail!("choose a target: --site <key> or --all"),
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{}: {} records from {} pages ({} rows skipped) -> {}",
        summary.site_key,
        summary.stats.total_records,
        summary.stats.pages_visited,
        summary.stats.rows_skipped,
        summary.snapshot_path.display()
    );
    if let Some(expected) = summary.stats.expected_total {
        if expected != summary.stats.total_records {
            println!("  note: the register itself reports {expected} associations");
        }
    }
}

pub(crate) fn print_sites() {
    for site in all_sites() {
        println!(
            "{:<10} {:<12} {:<16} {}",
            site.key,
            site.municipality,
            site.source_system.as_str(),
            site.start_url
        );
    }
}
