//! Headless Chrome implementation of [`PageDriver`] via the DevTools
//! protocol.
//!
//! All element operations are evaluated inside the page as small
//! JavaScript expressions. That keeps the implementation uniform
//! across list rows, modals and server-rendered detail pages, and
//! `innerText` preserves the rendered line structure the free-text
//! strategy depends on.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{DriverError, PageDriver};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeDriver {
    /// Launches a Chrome instance and opens a blank page.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Backend`] when the browser cannot be
    /// spawned or the CDP session cannot be established.
    pub async fn launch(headless: bool) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DriverError::Backend)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        debug!(headless, "chrome session established");
        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Closes the browser and stops the event handler task.
    pub async fn shutdown(mut self) {
        if let Err(error) = self.browser.close().await {
            debug!(error = %error, "browser close failed");
        }
        self.handler_task.abort();
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T, DriverError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| DriverError::Backend(e.to_string()))
    }

    /// Embeds a CSS selector into a script as a JS string literal.
    fn quote(selector: &str) -> String {
        serde_json::to_string(selector).unwrap_or_else(|_| String::from("\"\""))
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let started = tokio::time::Instant::now();
        loop {
            if self.exists(selector).await? {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(DriverError::WaitTimeout {
                    selector: selector.to_owned(),
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        let sel = Self::quote(selector);
        self.eval(format!("document.querySelector({sel}) !== null"))
            .await
    }

    async fn count(&self, selector: &str) -> Result<usize, DriverError> {
        let sel = Self::quote(selector);
        self.eval(format!("document.querySelectorAll({sel}).length"))
            .await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.click_nth(selector, 0).await
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<(), DriverError> {
        let sel = Self::quote(selector);
        let clicked: bool = self
            .eval(format!(
                "(() => {{ const el = document.querySelectorAll({sel})[{index}]; \
                 if (!el) return false; el.scrollIntoView({{block: 'center'}}); \
                 el.click(); return true; }})()"
            ))
            .await?;
        if clicked {
            Ok(())
        } else {
            Err(DriverError::NotFound {
                selector: format!("{selector}[{index}]"),
            })
        }
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>, DriverError> {
        self.text_of_nth(selector, 0).await
    }

    async fn text_of_nth(
        &self,
        selector: &str,
        index: usize,
    ) -> Result<Option<String>, DriverError> {
        let sel = Self::quote(selector);
        self.eval(format!(
            "(() => {{ const el = document.querySelectorAll({sel})[{index}]; \
             return el ? el.innerText : null; }})()"
        ))
        .await
    }

    async fn html_of(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let sel = Self::quote(selector);
        self.eval(format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return el ? el.outerHTML : null; }})()"
        ))
        .await
    }

    async fn attr_of_nth(
        &self,
        selector: &str,
        index: usize,
        attr: &str,
    ) -> Result<Option<String>, DriverError> {
        let sel = Self::quote(selector);
        let attr_js = Self::quote(attr);
        self.eval(format!(
            "(() => {{ const el = document.querySelectorAll({sel})[{index}]; \
             return el ? el.getAttribute({attr_js}) : null; }})()"
        ))
        .await
    }

    async fn press_escape(&self) -> Result<(), DriverError> {
        let _: bool = self
            .eval(String::from(
                "(() => { const opts = {key: 'Escape', code: 'Escape', keyCode: 27, \
                 bubbles: true, cancelable: true}; \
                 document.dispatchEvent(new KeyboardEvent('keydown', opts)); \
                 document.dispatchEvent(new KeyboardEvent('keyup', opts)); \
                 return true; })()",
            ))
            .await?;
        Ok(())
    }
}
