//! Shared types for the municipal association-registry harvester: the
//! normalized record schema and the environment-driven run configuration.

pub mod app_config;
pub mod config;
pub mod record;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use record::{
    Association, AssociationRecord, ContactRecord, Description, DescriptionSection,
    SourceNavigation, SourceSystem,
};
