//! The browser seam.
//!
//! Everything the harvester does to a registry page goes through the
//! [`PageDriver`] trait: navigate, wait, count, click, read. The
//! production implementation drives headless Chrome; tests drive an
//! in-memory fake. Keeping the surface this narrow is what makes the
//! navigator and the extraction strategies testable without a browser.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "browser")]
pub mod chrome;

#[cfg(feature = "browser")]
pub use chrome::ChromeDriver;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {waited_ms}ms waiting for \"{selector}\"")]
    WaitTimeout { selector: String, waited_ms: u64 },

    #[error("no element matches \"{selector}\"")]
    NotFound { selector: String },

    #[error("interaction with \"{selector}\" failed: {reason}")]
    Interaction { selector: String, reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser backend error: {0}")]
    Backend(String),
}

/// One row's detail view, captured as a static snapshot.
///
/// `html` is the outer HTML of the detail root, `text` its rendered
/// text with line breaks preserved. Extraction strategies work on this
/// snapshot only, so a detail view that vanishes mid-parse cannot
/// corrupt a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSurface {
    pub html: String,
    pub text: String,
}

/// Minimal browser operations the harvester needs.
///
/// Selector-with-index operations (`click_nth`, `text_of_nth`,
/// `attr_of_nth`) address the n-th match of a selector in document
/// order. Per-row selectors are written to match exactly once per
/// list row, so the n-th match is row n.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates to `url` and waits for the page to load.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Polls until `selector` matches at least one element.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Whether `selector` currently matches anything.
    async fn exists(&self, selector: &str) -> Result<bool, DriverError>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, DriverError>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Clicks the `index`-th element matching `selector`.
    async fn click_nth(&self, selector: &str, index: usize) -> Result<(), DriverError>;

    /// Rendered text of the first match, `None` when nothing matches.
    async fn text_of(&self, selector: &str) -> Result<Option<String>, DriverError>;

    /// Rendered text of the `index`-th match.
    async fn text_of_nth(&self, selector: &str, index: usize)
        -> Result<Option<String>, DriverError>;

    /// Outer HTML of the first match.
    async fn html_of(&self, selector: &str) -> Result<Option<String>, DriverError>;

    /// Attribute value of the `index`-th match.
    async fn attr_of_nth(
        &self,
        selector: &str,
        index: usize,
        attr: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Dispatches an Escape keypress to the document.
    async fn press_escape(&self) -> Result<(), DriverError>;
}
