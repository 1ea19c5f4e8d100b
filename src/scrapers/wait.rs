//! Bounded-polling readiness checks.
//!
//! Every transition in the portal workflow waits for some observable
//! condition (a page title, an element, a frame, a popup window). The portal
//! gives no completion signal, so [`Waiter`] polls the condition every
//! `poll_interval` until it holds or the deadline passes.
//!
//! Two policies:
//! - [`Waiter::require`]: a timeout is fatal and surfaces as
//!   [`ScrapeError::StepTimeout`] naming the step
//! - [`Waiter::optional`] / [`Waiter::dismiss`]: a timeout is logged and
//!   reported as `false`

use crate::browser::{Automation, BrowserError, Locator, Readiness};
use crate::error::{Result, ScrapeError};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// A condition observed on the active window/frame.
#[derive(Debug, Clone, Copy)]
pub enum Condition<'a> {
    TitleContains(&'a str),
    Present(Locator<'a>),
    Visible(Locator<'a>),
    Clickable(Locator<'a>),
    /// Holding switches into the frame.
    FrameAvailable(&'a str),
    WindowCount(usize),
    /// Some window not in the given list is open.
    NewWindow(&'a [String]),
    AlertPresent,
}

pub struct Waiter<'b, B> {
    browser: &'b B,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'b, B: Automation> Waiter<'b, B> {
    pub fn new(browser: &'b B, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            browser,
            timeout,
            poll_interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate `condition` once.
    pub async fn holds(&self, condition: Condition<'_>) -> std::result::Result<bool, BrowserError> {
        let b = self.browser;
        match condition {
            Condition::TitleContains(fragment) => Ok(b.title().await?.contains(fragment)),
            Condition::Present(l) => b.is_ready(l, Readiness::Present).await,
            Condition::Visible(l) => b.is_ready(l, Readiness::Visible).await,
            Condition::Clickable(l) => b.is_ready(l, Readiness::Clickable).await,
            Condition::FrameAvailable(name) => b.switch_to_frame(name).await,
            Condition::WindowCount(n) => Ok(b.window_handles().await?.len() == n),
            Condition::NewWindow(known) => {
                let handles = b.window_handles().await?;
                Ok(handles.iter().any(|h| !known.contains(h)))
            }
            Condition::AlertPresent => b.alert_present().await,
        }
    }

    /// Poll until `condition` holds. Returns `Ok(false)` on deadline.
    async fn poll(&self, condition: Condition<'_>) -> std::result::Result<bool, BrowserError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.holds(condition).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Wait for a condition the workflow cannot continue without.
    pub async fn require(&self, step: &'static str, condition: Condition<'_>) -> Result<()> {
        if self.poll(condition).await? {
            debug!(step, "Step ready");
            Ok(())
        } else {
            warn!(step, timeout = ?self.timeout, ?condition, "Required step timed out");
            Err(ScrapeError::StepTimeout {
                step,
                timeout: self.timeout,
            })
        }
    }

    /// Wait for a condition that may legitimately never happen.
    pub async fn optional(&self, what: &'static str, condition: Condition<'_>) -> bool {
        match self.poll(condition).await {
            Ok(true) => true,
            Ok(false) => {
                info!(what, timeout = ?self.timeout, "Optional condition not met; continuing");
                false
            }
            Err(e) => {
                info!(what, error = %e, "Optional condition check failed; continuing");
                false
            }
        }
    }

    /// Click away an interstitial if it shows up within the deadline.
    ///
    /// Returns whether it was dismissed.
    pub async fn dismiss(&self, what: &'static str, locator: Locator<'_>) -> bool {
        if !self.optional(what, Condition::Visible(locator)).await {
            return false;
        }
        match self.browser.click(locator).await {
            Ok(()) => {
                info!(what, "Dismissed popup");
                true
            }
            Err(e) => {
                info!(what, error = %e, "Popup vanished before it could be dismissed");
                false
            }
        }
    }

    /// Wait until `locator` is ready, then click it.
    pub async fn click(&self, step: &'static str, locator: Locator<'_>, readiness: Readiness) -> Result<()> {
        self.require(step, ready(locator, readiness)).await?;
        self.browser.click(locator).await?;
        Ok(())
    }

    /// Wait until `locator` is ready, then type into it.
    pub async fn type_into(
        &self,
        step: &'static str,
        locator: Locator<'_>,
        readiness: Readiness,
        text: &str,
    ) -> Result<()> {
        self.require(step, ready(locator, readiness)).await?;
        self.browser.send_keys(locator, text).await?;
        Ok(())
    }

    /// Wait until `locator` is clickable, then clear it.
    pub async fn clear(&self, step: &'static str, locator: Locator<'_>) -> Result<()> {
        self.require(step, Condition::Clickable(locator)).await?;
        self.browser.clear(locator).await?;
        Ok(())
    }
}

fn ready(locator: Locator<'_>, readiness: Readiness) -> Condition<'_> {
    match readiness {
        Readiness::Present => Condition::Present(locator),
        Readiness::Visible => Condition::Visible(locator),
        Readiness::Clickable => Condition::Clickable(locator),
    }
}
