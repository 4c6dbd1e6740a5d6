use std::path::PathBuf;

/// Runtime configuration for a harvest run, resolved from the environment.
///
/// Everything is defaulted: the harvester is expected to run with no
/// configuration beyond an optional output directory and headless toggle.
/// Site identity (start URL, source system, municipality) is compiled into
/// the site catalog, not configured here.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory receiving the per-run NDJSON log and snapshot files.
    pub output_dir: PathBuf,
    /// Run the browser headless. Headed mode exists for debugging selector
    /// profiles against live sites.
    pub headless: bool,
    pub log_level: String,
    /// Bounded wait for the list container to populate, per page.
    pub list_timeout_secs: u64,
    /// Bounded wait for a detail surface to appear or disappear.
    pub detail_timeout_secs: u64,
    /// Additional attempts after the first failure when opening or closing
    /// a detail surface.
    pub detail_retries: u32,
    /// Base delay for the shared exponential backoff, in milliseconds.
    pub retry_backoff_base_ms: u64,
    /// Safety limit on pages per run, guarding against a pagination control
    /// that never reports "done".
    pub page_limit: usize,
    /// Randomized pause between page interactions, lower bound.
    pub delay_min_ms: u64,
    /// Randomized pause between page interactions, upper bound.
    pub delay_max_ms: u64,
    /// External import command invoked once per run with the snapshot path
    /// and municipality name. `None` disables the handoff.
    pub import_command: Option<String>,
}
