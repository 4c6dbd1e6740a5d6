//! The normalized association record schema shared by the harvest engine,
//! the output files, and the external importer.
//!
//! The external JSON representation is camelCase because that is what the
//! downstream import command consumes; the structs themselves follow normal
//! Rust naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies which site family produced a record, and therefore which
/// extraction strategy ran against its detail surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    /// FRI Webb-Förening: detail is an inline two-column `label | value`
    /// table, optionally split into an org table and a contact table.
    Fri,
    /// Actor Smartbook: detail opens as a button-triggered modal with
    /// `label: value` list items plus a fixed-column contacts table.
    ActorSmartbook,
    /// Interbook GO: detail opens as a link-triggered modal containing
    /// unstructured text with recognizable section headings.
    InterbookGo,
}

impl SourceSystem {
    /// Stable identifier used in file names and the serialized schema.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceSystem::Fri => "fri",
            SourceSystem::ActorSmartbook => "actor_smartbook",
            SourceSystem::InterbookGo => "interbook_go",
        }
    }

    /// All supported site families.
    #[must_use]
    pub fn all() -> &'static [SourceSystem] {
        &[
            SourceSystem::Fri,
            SourceSystem::ActorSmartbook,
            SourceSystem::InterbookGo,
        ]
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One harvested organization plus provenance, contacts, and navigation
/// trace. Immutable once handed to the sanitizer; corrections require a new
/// run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationRecord {
    pub source_system: SourceSystem,
    pub municipality: String,
    pub scrape_run_id: Uuid,
    pub scraped_at: DateTime<Utc>,
    pub association: Association,
    pub contacts: Vec<ContactRecord>,
    pub source_navigation: SourceNavigation,
    /// Escape hatch for source-specific fields with no first-class slot
    /// (bank details, target groups, plausibility flags). Never used for
    /// fields that have a dedicated slot above.
    pub extras: serde_json::Map<String, serde_json::Value>,
}

/// Core organization fields. Optional fields stay `None` when a source does
/// not expose them; the sanitizer never invents values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub name: String,
    pub org_number: Option<String>,
    pub types: Vec<String>,
    pub activities: Vec<String>,
    pub categories: Vec<String>,
    pub homepage_url: Option<String>,
    /// Always non-empty: a direct permalink when the source exposes one,
    /// otherwise a synthetic anchor derived from the list position.
    pub detail_url: String,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<Description>,
}

/// Free-text description, or a structured variant preserving site-specific
/// sections without forcing them into a single schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Text(String),
    #[serde(rename_all = "camelCase")]
    Structured {
        free_text: Option<String>,
        sections: Vec<DescriptionSection>,
    },
}

/// One titled block of structured description data, e.g. a "Verksamhet"
/// section with its parsed key/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionSection {
    pub title: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// One contact person. Multiple contacts per association are allowed and a
/// block with several email addresses fans out into several entries rather
/// than concatenating them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Where in the source list a record was found, so it can be traced back for
/// debugging and re-scrape diffing. Page and row indices are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNavigation {
    pub list_page_index: u32,
    pub position_on_page: u32,
    /// Which pagination model the list used ("numbered_links", "next_link"
    /// or "next_button").
    pub pagination_model: String,
    /// Active list filter when the row was read (e.g. an A–Ö letter), if
    /// the source exposes one.
    pub filter_state: Option<String>,
}
