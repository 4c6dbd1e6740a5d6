use std::path::PathBuf;

use thiserror::Error;

use crate::app_config::AppConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Load harvester configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env
/// vars.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable has an unparsable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load harvester configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable has an unparsable value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build the configuration using the provided env-var lookup function.
///
/// The parsing/validation core is decoupled from the real environment so it
/// can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got \"{other}\""),
            }),
        }
    };

    let output_dir = PathBuf::from(or_default("FRH_OUTPUT_DIR", "./harvests"));
    let headless = parse_bool("FRH_HEADLESS", "true")?;
    let log_level = or_default("FRH_LOG_LEVEL", "info");

    let list_timeout_secs = parse_u64("FRH_LIST_TIMEOUT_SECS", "8")?;
    let detail_timeout_secs = parse_u64("FRH_DETAIL_TIMEOUT_SECS", "5")?;
    let detail_retries = parse_u32("FRH_DETAIL_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("FRH_RETRY_BACKOFF_BASE_MS", "400")?;
    let page_limit = parse_usize("FRH_PAGE_LIMIT", "200")?;
    let delay_min_ms = parse_u64("FRH_DELAY_MIN_MS", "350")?;
    let delay_max_ms = parse_u64("FRH_DELAY_MAX_MS", "1200")?;
    let import_command = lookup("FRH_IMPORT_COMMAND").ok().filter(|s| !s.is_empty());

    if page_limit == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "FRH_PAGE_LIMIT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    if delay_max_ms < delay_min_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "FRH_DELAY_MAX_MS".to_string(),
            reason: format!("must be >= FRH_DELAY_MIN_MS ({delay_min_ms})"),
        });
    }

    Ok(AppConfig {
        output_dir,
        headless,
        log_level,
        list_timeout_secs,
        detail_timeout_secs,
        detail_retries,
        retry_backoff_base_ms,
        page_limit,
        delay_min_ms,
        delay_max_ms,
        import_command,
    })
}
