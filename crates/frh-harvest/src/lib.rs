pub mod error;
pub mod extract;
pub mod navigator;
pub mod pacing;
pub mod profile;
pub mod recorder;
pub mod retry;
pub mod run;
pub mod sanitize;
pub mod sites;
pub mod surface;

pub use error::HarvestError;
pub use navigator::Navigator;
pub use recorder::Recorder;
pub use run::{ImportCommand, Importer, NoImport, RunCoordinator, RunStats, RunSummary};
pub use sites::{all_sites, find_site, SiteDefinition};
pub use surface::{DetailSurface, DriverError, PageDriver};

#[cfg(feature = "browser")]
pub use surface::ChromeDriver;
