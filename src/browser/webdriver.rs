//! [`Automation`] over a W3C WebDriver server.
//!
//! Connects to an already running driver (e.g. `chromedriver --port=4444`)
//! with `fantoccini`. Chrome options from the configuration are passed through
//! the `goog:chromeOptions` capability.

use super::{Automation, BrowserError, Locator, Readiness};
use crate::retry::with_backoff;
use fantoccini::elements::Element;
use fantoccini::wd::{Capabilities, WindowHandle};
use fantoccini::{Client, ClientBuilder};
use futures::future::try_join_all;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A live WebDriver session.
#[derive(Clone)]
pub struct WebDriver {
    client: Client,
}

impl std::fmt::Debug for WebDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriver").finish_non_exhaustive()
    }
}

impl WebDriver {
    /// Open a new browser session on the driver at `webdriver_url`.
    ///
    /// Connection attempts are retried with backoff, since the driver process
    /// is frequently started alongside this one.
    #[instrument(level = "info", skip(browser_args))]
    pub async fn connect(webdriver_url: &str, browser_args: &[String]) -> Result<Self, BrowserError> {
        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": browser_args }),
        );

        let client = with_backoff("webdriver connect", 5, Duration::from_secs(1), || {
            let caps = caps.clone();
            async move {
                ClientBuilder::native()
                    .capabilities(caps)
                    .connect(webdriver_url)
                    .await
            }
        })
        .await?;

        info!(%webdriver_url, "WebDriver session started");
        Ok(Self { client })
    }
}

/// Map a [`Locator`] onto fantoccini's. `Name` lookups are rewritten as CSS
/// attribute selectors held in `buf`.
fn to_wd<'a>(locator: Locator<'a>, buf: &'a mut String) -> fantoccini::Locator<'a> {
    match locator {
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
        Locator::LinkText(s) => fantoccini::Locator::LinkText(s),
        Locator::Id(s) => fantoccini::Locator::Id(s),
        Locator::Name(s) => {
            *buf = format!("[name=\"{s}\"]");
            fantoccini::Locator::Css(buf.as_str())
        }
    }
}

impl WebDriver {
    async fn find(&self, locator: Locator<'_>) -> Result<Element, BrowserError> {
        let mut buf = String::new();
        match self.client.find(to_wd(locator, &mut buf)).await {
            Ok(element) => Ok(element),
            Err(e) if e.is_no_such_element() => Err(BrowserError::NoSuchElement(locator.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

impl Automation for WebDriver {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        debug!(%url, "Navigating");
        Ok(self.client.goto(url).await?)
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.client.title().await?)
    }

    async fn current_window(&self) -> Result<String, BrowserError> {
        Ok(self.client.window().await?.into())
    }

    async fn window_handles(&self) -> Result<Vec<String>, BrowserError> {
        let handles = self.client.windows().await?;
        Ok(handles.into_iter().map(String::from).collect())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<(), BrowserError> {
        let handle = WindowHandle::try_from(handle.to_string())
            .map_err(|e| BrowserError::InvalidWindow(format!("{handle}: {e}")))?;
        Ok(self.client.switch_to_window(handle).await?)
    }

    async fn switch_to_default_frame(&self) -> Result<(), BrowserError> {
        Ok(self.client.enter_frame(None).await?)
    }

    async fn switch_to_frame(&self, name: &str) -> Result<bool, BrowserError> {
        let css = format!("frame[name=\"{name}\"], iframe[name=\"{name}\"]");
        match self.find(Locator::Css(&css)).await {
            Ok(frame) => {
                frame.enter_frame().await?;
                Ok(true)
            }
            Err(BrowserError::NoSuchElement(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn is_ready(&self, locator: Locator<'_>, readiness: Readiness) -> Result<bool, BrowserError> {
        let element = match self.find(locator).await {
            Ok(element) => element,
            Err(BrowserError::NoSuchElement(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        // A stale element mid-poll just means "not ready yet".
        let ready = match readiness {
            Readiness::Present => true,
            Readiness::Visible => element.is_displayed().await.unwrap_or(false),
            Readiness::Clickable => {
                element.is_displayed().await.unwrap_or(false)
                    && element.is_enabled().await.unwrap_or(false)
            }
        };
        Ok(ready)
    }

    async fn click(&self, locator: Locator<'_>) -> Result<(), BrowserError> {
        Ok(self.find(locator).await?.click().await?)
    }

    async fn send_keys(&self, locator: Locator<'_>, text: &str) -> Result<(), BrowserError> {
        Ok(self.find(locator).await?.send_keys(text).await?)
    }

    async fn clear(&self, locator: Locator<'_>) -> Result<(), BrowserError> {
        Ok(self.find(locator).await?.clear().await?)
    }

    async fn texts(&self, locator: Locator<'_>) -> Result<Vec<String>, BrowserError> {
        let mut buf = String::new();
        let found = self.client.find_all(to_wd(locator, &mut buf)).await?;
        let texts = try_join_all(found.iter().map(|e| e.text())).await?;
        Ok(texts)
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.client.source().await?)
    }

    async fn alert_present(&self) -> Result<bool, BrowserError> {
        Ok(self.client.get_alert_text().await.is_ok())
    }

    async fn accept_alert(&self) -> Result<(), BrowserError> {
        Ok(self.client.accept_alert().await?)
    }

    async fn close_window(&self) -> Result<(), BrowserError> {
        Ok(self.client.close_window().await?)
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        self.client.clone().close().await?;
        info!("WebDriver session closed");
        Ok(())
    }
}
