//! List and detail navigation for one registry site.
//!
//! The navigator owns the page lifecycle: reach the list, walk its
//! rows, open and close each row's detail view, advance pages. Every
//! interaction runs with bounded retries, and a detail view that will
//! not close triggers an escalating recovery sequence. Failures while
//! handling one row never abort the run; failures to reach the list
//! do.

use std::time::Duration;

use tracing::{debug, error, warn};

use frh_core::AppConfig;

use crate::error::HarvestError;
use crate::pacing::Pacing;
use crate::profile::{parse_trailing_count, SiteProfile};
use crate::retry::retry_with_backoff;
use crate::surface::{DetailSurface, DriverError, PageDriver};

const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Navigator<'a> {
    driver: &'a dyn PageDriver,
    profile: &'a SiteProfile,
    start_url: &'a str,
    pacing: Pacing,
    list_timeout: Duration,
    detail_timeout: Duration,
    detail_retries: u32,
    backoff_base_ms: u64,
    current_page: u32,
}

impl<'a> Navigator<'a> {
    #[must_use]
    pub fn new(
        driver: &'a dyn PageDriver,
        profile: &'a SiteProfile,
        start_url: &'a str,
        config: &AppConfig,
    ) -> Self {
        Self {
            driver,
            profile,
            start_url,
            pacing: Pacing::new(config.delay_min_ms, config.delay_max_ms),
            list_timeout: Duration::from_secs(config.list_timeout_secs),
            detail_timeout: Duration::from_secs(config.detail_timeout_secs),
            detail_retries: config.detail_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            current_page: 0,
        }
    }

    /// Zero-based index of the list page currently shown.
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Opens the start URL and waits for the association list.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Navigation`] when the page cannot be reached,
    /// [`HarvestError::ListNotReady`] when the list never renders.
    pub async fn start(&mut self) -> Result<(), HarvestError> {
        self.driver
            .goto(self.start_url)
            .await
            .map_err(|source| HarvestError::Navigation {
                action: format!("open {}", self.start_url),
                source,
            })?;
        self.current_page = 0;
        self.await_list_ready().await
    }

    async fn await_list_ready(&self) -> Result<(), HarvestError> {
        self.driver
            .wait_for(&self.profile.list_ready_selector, self.list_timeout)
            .await
            .map_err(|source| HarvestError::ListNotReady {
                context: format!("{} ({source})", self.profile.list_ready_selector),
            })
    }

    /// Number of association rows on the current page.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Navigation`] when the list cannot be read.
    pub async fn row_count(&self) -> Result<usize, HarvestError> {
        self.driver
            .count(&self.profile.row_selector)
            .await
            .map_err(|source| HarvestError::Navigation {
                action: "count list rows".into(),
                source,
            })
    }

    /// The association name shown on a list row, when readable.
    pub async fn row_name(&self, row: usize) -> Option<String> {
        self.driver
            .text_of_nth(&self.profile.row_name_selector, row)
            .await
            .ok()
            .flatten()
            .map(|text| collapse_whitespace(&text))
            .filter(|text| !text.is_empty())
    }

    /// A stable detail permalink from the row's anchor, when the
    /// platform exposes one.
    pub async fn row_detail_url(&self, row: usize) -> Option<String> {
        let selector = self.profile.row_link_selector.as_ref()?;
        self.driver
            .attr_of_nth(selector, row, "href")
            .await
            .ok()
            .flatten()
            .map(|href| href.trim().to_owned())
            .filter(|href| !href.is_empty() && href != "#")
    }

    /// Text describing the list's active filter, when the platform
    /// shows one.
    pub async fn read_filter_state(&self) -> Option<String> {
        let selector = self.profile.filter_state_selector.as_ref()?;
        self.driver
            .text_of(selector)
            .await
            .ok()
            .flatten()
            .map(|text| collapse_whitespace(&text))
            .filter(|text| !text.is_empty())
    }

    /// The total the site claims the register holds, when stated.
    pub async fn probe_expected_total(&self) -> Option<usize> {
        let selector = self.profile.total_count_selector.as_ref()?;
        let text = self.driver.text_of(selector).await.ok().flatten()?;
        parse_trailing_count(&text)
    }

    /// Opens one row's detail view, captures it and closes it again.
    ///
    /// Every step is retried with backoff. On failure the list is
    /// recovered so the next row can proceed, and the row is reported
    /// as a row-scoped error. A close failure discards the row even
    /// when a surface was captured, because the list state it left
    /// behind cannot be trusted.
    ///
    /// # Errors
    ///
    /// [`HarvestError::DetailInteraction`] scoped to this row.
    pub async fn capture_row_detail(&self, row: usize) -> Result<DetailSurface, HarvestError> {
        let page = self.current_page;
        let row_index = u32::try_from(row).unwrap_or(u32::MAX);

        let opened = retry_with_backoff(self.detail_retries, self.backoff_base_ms, || {
            async move {
                self.pacing.pause().await;
                self.driver
                    .click_nth(&self.profile.row_open_selector, row)
                    .await?;
                self.driver
                    .wait_for(&self.profile.detail_root_selector, self.detail_timeout)
                    .await
            }
        })
        .await;
        if let Err(source) = opened {
            warn!(page, row, error = %source, "detail view never opened");
            self.recover_list_logged().await;
            return Err(HarvestError::DetailInteraction {
                page,
                row: row_index,
                reason: format!("open failed: {source}"),
            });
        }

        let surface = match self.capture_surface().await {
            Ok(surface) => surface,
            Err(source) => {
                warn!(page, row, error = %source, "detail surface vanished before capture");
                self.recover_list_logged().await;
                return Err(HarvestError::DetailInteraction {
                    page,
                    row: row_index,
                    reason: format!("capture failed: {source}"),
                });
            }
        };

        if let Err(source) = self.close_detail().await {
            warn!(page, row, error = %source, "detail view would not close");
            self.recover_list_logged().await;
            return Err(HarvestError::DetailInteraction {
                page,
                row: row_index,
                reason: format!("close failed: {source}"),
            });
        }

        // Platforms that open details as a separate page come back to
        // the list asynchronously after the close click.
        if let Err(source) = self.await_list_ready().await {
            warn!(page, row, error = %source, "list did not return after closing detail");
            self.recover_list_logged().await;
            return Err(HarvestError::DetailInteraction {
                page,
                row: row_index,
                reason: "list did not return after close".into(),
            });
        }

        Ok(surface)
    }

    async fn capture_surface(&self) -> Result<DetailSurface, DriverError> {
        let selector = &self.profile.detail_root_selector;
        let html = self
            .driver
            .html_of(selector)
            .await?
            .ok_or_else(|| DriverError::NotFound {
                selector: selector.clone(),
            })?;
        let text = self.driver.text_of(selector).await?.unwrap_or_default();
        Ok(DetailSurface { html, text })
    }

    /// Runs the close fallback chain until the detail view is
    /// confirmed gone, retrying the whole chain with backoff.
    async fn close_detail(&self) -> Result<(), DriverError> {
        retry_with_backoff(self.detail_retries, self.backoff_base_ms, || {
            async move { self.close_chain_once().await }
        })
        .await
    }

    async fn close_chain_once(&self) -> Result<(), DriverError> {
        for selector in &self.profile.close_selectors {
            if self.driver.exists(selector).await? {
                let clicked = self.driver.click(selector).await;
                if clicked.is_ok() && self.confirmed_closed().await? {
                    return Ok(());
                }
            }
        }
        self.driver.press_escape().await?;
        if self.confirmed_closed().await? {
            return Ok(());
        }
        Err(DriverError::WaitTimeout {
            selector: self.profile.detail_root_selector.clone(),
            waited_ms: u64::try_from(self.detail_timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Closing counts only once the detail root is gone and, for
    /// modal platforms, the page-level modal marker has cleared.
    async fn confirmed_closed(&self) -> Result<bool, DriverError> {
        let started = tokio::time::Instant::now();
        loop {
            let root_gone = !self
                .driver
                .exists(&self.profile.detail_root_selector)
                .await?;
            let marker_gone = match &self.profile.modal_open_selector {
                Some(marker) => !self.driver.exists(marker).await?,
                None => true,
            };
            if root_gone && marker_gone {
                return Ok(true);
            }
            if started.elapsed() >= self.detail_timeout {
                return Ok(false);
            }
            tokio::time::sleep(CLOSE_POLL_INTERVAL).await;
        }
    }

    async fn recover_list_logged(&self) {
        if let Err(recovery_error) = self.recover_list().await {
            error!(error = %recovery_error, "list recovery failed, later rows may not load");
        }
    }

    /// Escalating recovery back to a usable list: Escape, then a fresh
    /// list-ready wait, then full re-navigation and paging forward to
    /// the page the run was on.
    async fn recover_list(&self) -> Result<(), HarvestError> {
        if self.driver.press_escape().await.is_ok()
            && self.confirmed_closed().await.unwrap_or(false)
            && self.await_list_ready().await.is_ok()
        {
            debug!("list recovered via escape");
            return Ok(());
        }

        if self.confirmed_closed().await.unwrap_or(false) && self.await_list_ready().await.is_ok()
        {
            debug!("list recovered after renewed wait");
            return Ok(());
        }

        debug!(page = self.current_page, "re-navigating to recover the list");
        self.driver
            .goto(self.start_url)
            .await
            .map_err(|source| HarvestError::Navigation {
                action: "re-navigation during recovery".into(),
                source,
            })?;
        self.await_list_ready().await?;
        for _ in 0..self.current_page {
            if !self.advance_once().await {
                return Err(HarvestError::Navigation {
                    action: "paging forward during recovery".into(),
                    source: DriverError::NotFound {
                        selector: self.profile.pagination.next_selector.clone(),
                    },
                });
            }
        }
        Ok(())
    }

    /// Whether the pagination control offers a further page.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Navigation`] when the control cannot be read.
    pub async fn has_next_page(&self) -> Result<bool, HarvestError> {
        let pagination = &self.profile.pagination;
        let present = self
            .driver
            .exists(&pagination.next_selector)
            .await
            .map_err(|source| HarvestError::Navigation {
                action: "check pagination".into(),
                source,
            })?;
        if !present {
            return Ok(false);
        }
        if let Some(disabled) = &pagination.disabled_selector {
            let inert = self.driver.exists(disabled).await.map_err(|source| {
                HarvestError::Navigation {
                    action: "check pagination".into(),
                    source,
                }
            })?;
            if inert {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Advances to the next page. Returns `false`, ending pagination
    /// normally, when no next page is offered or the advance keeps
    /// failing; a broken next control is indistinguishable from the
    /// last page.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Navigation`] when the pagination state cannot
    /// be read at all.
    pub async fn go_to_next_page(&mut self) -> Result<bool, HarvestError> {
        if !self.has_next_page().await? {
            return Ok(false);
        }
        if self.advance_once().await {
            self.current_page += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn advance_once(&self) -> bool {
        let advanced = retry_with_backoff(self.detail_retries, self.backoff_base_ms, || {
            async move {
                self.pacing.pause().await;
                self.driver
                    .click(&self.profile.pagination.next_selector)
                    .await?;
                self.driver
                    .wait_for(&self.profile.list_ready_selector, self.list_timeout)
                    .await
            }
        })
        .await;
        match advanced {
            Ok(()) => true,
            Err(error) => {
                warn!(page = self.current_page, error = %error, "could not advance to next page");
                false
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
