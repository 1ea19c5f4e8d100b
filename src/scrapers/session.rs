//! Authenticated browser session against the WiseNews portal.
//!
//! [`SessionController`] owns the browser for the whole run and tracks which
//! page and window the automation is on. Each public operation checks the
//! session state before touching the browser, so calling steps out of order
//! fails fast with [`ScrapeError::InvalidState`] instead of clicking on the
//! wrong page.
//!
//! State progression:
//!
//! ```text
//! Unauthenticated -> AuthenticatingOnHost -> AuthenticatingOnIdentityProvider
//!   -> OnPortalHome -> OnResultsList <-> OnArticleViewer -> LoggedOut
//! ```
//!
//! Any state may go to `LoggedOut` through [`SessionController::teardown`],
//! which never fails and releases the browser exactly once.

use super::extract::{self, Extraction};
use super::selectors::*;
use super::wait::{Condition, Waiter};
use crate::browser::{Automation, Readiness, keys};
use crate::config::{AppConfig, Credentials};
use crate::error::{Result, ScrapeError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Which popup the viewer window was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    Scrape,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AuthenticatingOnHost,
    AuthenticatingOnIdentityProvider,
    OnPortalHome,
    OnResultsList,
    OnArticleViewer(ViewerKind),
    LoggedOut,
}

/// Windows the session knows about and where the automation currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Every handle adopted so far, in order of appearance.
    pub windows: Vec<String>,
    pub active: Option<String>,
    /// Frames entered from the top-level document of the active window.
    pub frame_path: Vec<String>,
}

/// Teardown phases, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownPhase {
    CloseViewer,
    PortalLogout,
    IdentityProviderSignOut,
    ReleaseBrowser,
}

/// What happened in each teardown phase that ran. `None` means success.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub phases: Vec<(TeardownPhase, Option<String>)>,
}

impl TeardownReport {
    fn record(&mut self, phase: TeardownPhase, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                debug!(?phase, "Teardown phase done");
                self.phases.push((phase, None));
            }
            Err(e) => {
                warn!(?phase, error = %e, "Teardown phase failed; continuing");
                self.phases.push((phase, Some(e.to_string())));
            }
        }
    }

    pub fn ran(&self, phase: TeardownPhase) -> bool {
        self.phases.iter().any(|(p, _)| *p == phase)
    }

    pub fn failures(&self) -> impl Iterator<Item = &(TeardownPhase, Option<String>)> {
        self.phases.iter().filter(|(_, e)| e.is_some())
    }
}

pub struct SessionController<B> {
    browser: B,
    config: AppConfig,
    state: SessionState,
    context: SessionContext,
    main_window: Option<String>,
    identity_window: Option<String>,
    /// Popups opened from the results list that may still be open.
    popups: Vec<String>,
    released: bool,
}

impl<B: Automation> SessionController<B> {
    pub fn new(browser: B, config: AppConfig) -> Self {
        Self {
            browser,
            config,
            state: SessionState::Unauthenticated,
            context: SessionContext::default(),
            main_window: None,
            identity_window: None,
            popups: Vec::new(),
            released: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub(crate) fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn waiter(&self) -> Waiter<'_, B> {
        Waiter::new(&self.browser, self.config.timeout(), self.config.poll_interval())
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "Session state change");
        self.state = state;
    }

    pub(crate) fn expect_state(&self, operation: &'static str, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ScrapeError::InvalidState {
                operation,
                expected,
                found: self.state,
            })
        }
    }

    /// Switch to `handle` at its top-level document.
    pub(crate) async fn activate_window(&mut self, handle: &str) -> Result<()> {
        self.browser.switch_to_window(handle).await?;
        self.context.active = Some(handle.to_string());
        self.context.frame_path.clear();
        Ok(())
    }

    pub(crate) async fn activate_main(&mut self) -> Result<()> {
        let main = self.main_window.clone().ok_or(ScrapeError::InvalidState {
            operation: "activate main window",
            expected: SessionState::OnPortalHome,
            found: self.state,
        })?;
        self.activate_window(&main).await
    }

    /// Wait for `name` to load inside the current frame and enter it.
    pub(crate) async fn enter_frame(&mut self, step: &'static str, name: &str) -> Result<()> {
        self.waiter().require(step, Condition::FrameAvailable(name)).await?;
        self.context.frame_path.push(name.to_string());
        Ok(())
    }

    /// Main window, then the content frame, then the results list frame.
    pub(crate) async fn enter_results_frames(&mut self) -> Result<()> {
        self.activate_main().await?;
        self.browser.switch_to_default_frame().await?;
        self.enter_frame("search frame", CONTENT_FRAME).await?;
        self.enter_frame("results frame", RESULTS_FRAME).await
    }

    /// Wait for a window the session has not seen yet and adopt it.
    ///
    /// With `expected_count`, also waits until exactly that many windows are
    /// open. The new handle is recorded but not switched to.
    pub(crate) async fn await_new_window(
        &mut self,
        step: &'static str,
        expected_count: Option<usize>,
    ) -> Result<String> {
        if let Some(n) = expected_count {
            self.waiter().require(step, Condition::WindowCount(n)).await?;
        }
        let known = self.context.windows.clone();
        self.waiter().require(step, Condition::NewWindow(&known)).await?;

        let handles = self.browser.window_handles().await?;
        let adopted = handles
            .into_iter()
            .rev()
            .find(|h| !known.contains(h))
            .ok_or(ScrapeError::StepTimeout {
                step,
                timeout: self.config.timeout(),
            })?;
        debug!(step, handle = %adopted, "Adopted new window");
        self.context.windows.push(adopted.clone());
        Ok(adopted)
    }

    /// Give the portal's scripts time to finish after a page transition.
    pub(crate) async fn settle(&self) {
        let pause = self.config.settle();
        if !pause.is_zero() {
            sleep(pause).await;
        }
    }

    pub(crate) fn track_popup(&mut self, handle: &str) {
        self.popups.push(handle.to_string());
    }

    pub(crate) fn forget_popup(&mut self, handle: &str) {
        self.popups.retain(|h| h != handle);
    }

    /// Sign in through the library page and the identity provider.
    #[instrument(level = "info", skip_all, fields(login = %credentials.login))]
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        self.expect_state("login", SessionState::Unauthenticated)?;
        self.set_state(SessionState::AuthenticatingOnHost);

        let main = self.browser.current_window().await?;
        self.context.windows = vec![main.clone()];
        self.main_window = Some(main.clone());
        self.activate_window(&main).await?;

        let url = self.config.library_login_url.clone();
        self.browser.goto(&url).await?;
        self.waiter().dismiss("library notice", LIBRARY_NOTICE_CLOSE).await;
        self.waiter()
            .require("library home page", Condition::TitleContains(LIBRARY_TITLE))
            .await?;

        let expected = self.browser.window_handles().await?.len() + 1;
        self.waiter()
            .click("library login button", LIBRARY_LOGIN_BUTTON, Readiness::Clickable)
            .await?;
        let idp = self.await_new_window("identity provider window", Some(expected)).await?;
        self.identity_window = Some(idp.clone());
        self.activate_window(&idp).await?;
        self.set_state(SessionState::AuthenticatingOnIdentityProvider);

        let w = self.waiter();
        w.require("identity provider page", Condition::TitleContains(IDP_TITLE))
            .await?;
        w.type_into("user id field", IDP_USER_ID, Readiness::Visible, &credentials.login)
            .await?;
        w.type_into("password field", IDP_PASSWORD, Readiness::Visible, &credentials.password)
            .await?;
        w.click("sign-in button", IDP_SUBMIT, Readiness::Clickable).await?;

        info!("Submitted library credentials");
        Ok(())
    }

    /// Open WiseNews in the main window and enter the information portal.
    #[instrument(level = "info", skip_all)]
    pub async fn get_portal(&mut self) -> Result<()> {
        self.expect_state("get_portal", SessionState::AuthenticatingOnIdentityProvider)?;
        self.activate_main().await?;

        let url = self.config.portal_url.clone();
        self.browser.goto(&url).await?;
        self.waiter()
            .require("WiseNews landing page", Condition::TitleContains(WISENEWS_TITLE))
            .await?;
        self.enter_frame("header frame", HEADER_FRAME).await?;
        self.waiter()
            .click("portal link", PORTAL_LINK, Readiness::Present)
            .await?;
        self.waiter()
            .require("portal home page", Condition::TitleContains(PORTAL_TITLE))
            .await?;
        self.browser.switch_to_default_frame().await?;
        self.context.frame_path.clear();

        self.set_state(SessionState::OnPortalHome);
        info!("Portal home reached");
        Ok(())
    }

    /// Open the full-text viewer for every article in the result list.
    #[instrument(level = "info", skip_all)]
    pub async fn open_viewer(&mut self) -> Result<()> {
        self.expect_state("open_viewer", SessionState::OnResultsList)?;
        self.enter_results_frames().await?;

        let expected = self.browser.window_handles().await?.len() + 1;
        self.waiter()
            .click("view button", VIEW_BUTTON, Readiness::Visible)
            .await?;
        let picker = self.await_new_window("viewer options window", Some(expected)).await?;
        self.track_popup(&picker);
        self.activate_window(&picker).await?;

        self.waiter()
            .click("view all button", VIEW_ALL_BUTTON, Readiness::Visible)
            .await?;
        let viewer = self.await_new_window("article viewer window", None).await?;
        self.track_popup(&viewer);
        self.settle().await;
        self.activate_window(&viewer).await?;

        self.set_state(SessionState::OnArticleViewer(ViewerKind::Scrape));
        info!(viewer = %viewer, "Article viewer open");
        Ok(())
    }

    /// Rebuild the articles shown in the open viewer.
    #[instrument(level = "info", skip_all)]
    pub async fn extract(&self, sections: &[String]) -> Result<Extraction> {
        self.expect_state("extract", SessionState::OnArticleViewer(ViewerKind::Scrape))?;
        let extraction = extract::extract(&self.browser, &self.waiter(), sections).await?;
        info!(
            articles = extraction.articles.len(),
            rejected = extraction.rejected.len(),
            "Viewer extracted"
        );
        Ok(extraction)
    }

    /// Save the viewer's HTML so it can be replayed offline.
    #[instrument(level = "info", skip(self))]
    pub async fn capture_page(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        self.expect_state("capture_page", SessionState::OnArticleViewer(ViewerKind::Scrape))?;
        let html = self.browser.page_source().await?;
        let path = dir.join(format!("{name}.html"));
        fs::create_dir_all(dir).await.map_err(|e| ScrapeError::io(dir, e))?;
        fs::write(&path, html).await.map_err(|e| ScrapeError::io(&path, e))?;
        info!(path = %path.display(), "Viewer page captured");
        Ok(path)
    }

    /// Close tracked popups newest first. A handle is forgotten only once it
    /// is closed, so a failure leaves the rest for teardown.
    async fn close_popups(&mut self) -> Result<()> {
        let open = self.browser.window_handles().await?;
        while let Some(handle) = self.popups.last().cloned() {
            if open.contains(&handle) {
                self.activate_window(&handle).await?;
                self.browser.close_window().await?;
                debug!(handle = %handle, "Closed popup");
            }
            self.popups.pop();
        }
        self.activate_main().await
    }

    /// Close the viewer popups and return to the results list.
    #[instrument(level = "info", skip_all)]
    pub async fn close_viewer(&mut self) -> Result<()> {
        self.expect_state("close_viewer", SessionState::OnArticleViewer(ViewerKind::Scrape))?;
        self.close_popups().await?;
        self.set_state(SessionState::OnResultsList);
        Ok(())
    }

    async fn portal_logout(&mut self) -> Result<()> {
        self.activate_main().await?;
        self.browser.switch_to_default_frame().await?;
        // The link ignores clicks; it only reacts to keyboard activation.
        self.browser
            .send_keys(LOGOUT_LINK, &keys::ENTER.to_string())
            .await?;
        info!("Logged out of portal");
        Ok(())
    }

    async fn identity_sign_out(&mut self, handle: &str) -> Result<()> {
        self.activate_window(handle).await?;
        let w = self.waiter();
        w.click("identity provider menu", IDP_MENU, Readiness::Clickable)
            .await?;
        w.click("identity provider sign-out", IDP_SIGN_OUT, Readiness::Clickable)
            .await?;
        info!("Signed out of identity provider");
        Ok(())
    }

    /// Log out everywhere and release the browser.
    ///
    /// Every phase runs even if an earlier one failed. The browser is released
    /// on the first call; later calls do nothing.
    #[instrument(level = "info", skip_all, fields(state = ?self.state))]
    pub async fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.released {
            return report;
        }

        if !self.popups.is_empty() {
            let outcome = self.close_popups().await;
            report.record(TeardownPhase::CloseViewer, outcome);
        }

        if self.main_window.is_some() {
            let outcome = self.portal_logout().await;
            report.record(TeardownPhase::PortalLogout, outcome);
        }

        if let Some(idp) = self.identity_window.clone() {
            let outcome = self.identity_sign_out(&idp).await;
            report.record(TeardownPhase::IdentityProviderSignOut, outcome);
        }

        let outcome = self.browser.quit().await.map_err(ScrapeError::from);
        self.released = true;
        report.record(TeardownPhase::ReleaseBrowser, outcome);

        self.set_state(SessionState::LoggedOut);
        info!(failures = report.failures().count(), "Session torn down");
        report
    }
}
