//! UI-automation capability consumed by the session workflow.
//!
//! The workflow never talks to a browser driver directly. It goes through the
//! [`Automation`] trait, which exposes exactly the primitives the portal
//! needs: navigation, window and frame switching, element probing, typing,
//! clicking, text reads and JavaScript alerts.
//!
//! - [`webdriver`]: production implementation over a WebDriver server
//!   (chromedriver, geckodriver) using `fantoccini`
//! - `fake`: scripted in-memory implementation used by unit tests

pub mod webdriver;

#[cfg(test)]
pub mod fake;

use std::fmt;
use thiserror::Error;

pub use webdriver::WebDriver;

/// Failure reported by the automation backend.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("webdriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("could not start webdriver session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("invalid window handle {0}")]
    InvalidWindow(String),

    #[error("no element matches {0}")]
    NoSuchElement(String),

    #[error("{0}")]
    Unavailable(String),
}

/// How to find an element on the active frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
    LinkText(&'a str),
    Id(&'a str),
    Name(&'a str),
}

impl fmt::Display for Locator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
            Locator::LinkText(s) => write!(f, "link:{s}"),
            Locator::Id(s) => write!(f, "id:{s}"),
            Locator::Name(s) => write!(f, "name:{s}"),
        }
    }
}

/// Degree of readiness an element must reach before it is interacted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Attached to the DOM.
    Present,
    /// Attached and displayed.
    Visible,
    /// Displayed and enabled.
    Clickable,
}

/// WebDriver key codes sent through `send_keys`.
pub mod keys {
    pub const ENTER: char = '\u{e007}';
    pub const ARROW_DOWN: char = '\u{e015}';
}

/// Primitive browser operations.
///
/// All operations act on the *current* window and frame. Window handles are
/// opaque strings; frames are addressed by their `name` attribute relative to
/// the current frame.
pub trait Automation {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn current_window(&self) -> Result<String, BrowserError>;

    /// Every open top-level window, in the order the driver reports them.
    async fn window_handles(&self) -> Result<Vec<String>, BrowserError>;

    /// Switch to a window. The frame context resets to the top-level document.
    async fn switch_to_window(&self, handle: &str) -> Result<(), BrowserError>;

    async fn switch_to_default_frame(&self) -> Result<(), BrowserError>;

    /// Enter the child frame called `name`. Returns `false` if no such frame
    /// is currently available.
    async fn switch_to_frame(&self, name: &str) -> Result<bool, BrowserError>;

    /// Whether the first element matching `locator` has reached `readiness`.
    /// A missing element is `Ok(false)`, not an error.
    async fn is_ready(&self, locator: Locator<'_>, readiness: Readiness) -> Result<bool, BrowserError>;

    async fn click(&self, locator: Locator<'_>) -> Result<(), BrowserError>;

    async fn send_keys(&self, locator: Locator<'_>, text: &str) -> Result<(), BrowserError>;

    async fn clear(&self, locator: Locator<'_>) -> Result<(), BrowserError>;

    /// Rendered text of every element matching `locator`, in document order.
    async fn texts(&self, locator: Locator<'_>) -> Result<Vec<String>, BrowserError>;

    async fn page_source(&self) -> Result<String, BrowserError>;

    async fn alert_present(&self) -> Result<bool, BrowserError>;

    async fn accept_alert(&self) -> Result<(), BrowserError>;

    /// Close the current window.
    async fn close_window(&self) -> Result<(), BrowserError>;

    /// End the driver session and release the browser.
    async fn quit(&self) -> Result<(), BrowserError>;
}
