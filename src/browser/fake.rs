//! Scripted in-memory [`Automation`] for unit tests.
//!
//! Every element is present, visible and clickable unless listed in
//! `missing`. Clicking a locator registered with [`FakeBrowser::opens_window_on`]
//! spawns a new window handle. Every mutating call is appended to an action
//! log so tests can assert on exactly what was typed and clicked.

use super::{Automation, BrowserError, Locator, Readiness};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    windows: Vec<String>,
    current: usize,
    frames: Vec<String>,
    next_window: usize,
    title: String,
    missing: HashSet<String>,
    missing_frames: HashSet<String>,
    failing_clicks: HashSet<String>,
    failing_closes: usize,
    opens_window: HashMap<String, usize>,
    closes_window: HashSet<String>,
    texts: HashMap<String, Vec<String>>,
    alert: bool,
    alert_on_click: HashSet<String>,
    source: String,
    actions: Vec<String>,
    quit_calls: usize,
}

pub struct FakeBrowser {
    state: Mutex<State>,
}

impl FakeBrowser {
    /// A browser with a single window whose title matches every page the
    /// workflow waits for.
    pub fn new() -> Self {
        let state = State {
            windows: vec!["main".to_string()],
            next_window: 1,
            title: "HKU Libraries | HKUL Authentication | WiseNews | Wisers Information Portal"
                .to_string(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_title(&self, title: &str) {
        self.with(|s| s.title = title.to_string());
    }

    pub fn hide(&self, locator: Locator<'_>) {
        self.with(|s| s.missing.insert(locator.to_string()));
    }

    pub fn hide_frame(&self, name: &str) {
        self.with(|s| s.missing_frames.insert(name.to_string()));
    }

    pub fn fail_click(&self, locator: Locator<'_>) {
        self.with(|s| s.failing_clicks.insert(locator.to_string()));
    }

    /// Open a window without any click, as a browser profile's startup tab.
    pub fn open_window(&self) -> String {
        self.with(|s| {
            let handle = format!("w{}", s.next_window);
            s.next_window += 1;
            s.windows.push(handle.clone());
            handle
        })
    }

    /// The next `close_window` call fails and leaves the window open.
    pub fn fail_next_close(&self) {
        self.with(|s| s.failing_closes += 1);
    }

    /// Clicking `locator` opens `count` new windows.
    pub fn opens_window_on(&self, locator: Locator<'_>, count: usize) {
        self.with(|s| s.opens_window.insert(locator.to_string(), count));
    }

    /// Clicking `locator` raises a JavaScript alert.
    pub fn alert_on(&self, locator: Locator<'_>) {
        self.with(|s| s.alert_on_click.insert(locator.to_string()));
    }

    /// Accepting an alert raised by `locator` closes the current window.
    pub fn closes_window_on_accept(&self, locator: Locator<'_>) {
        self.with(|s| s.closes_window.insert(locator.to_string()));
    }

    pub fn set_texts(&self, locator: Locator<'_>, texts: &[&str]) {
        self.with(|s| {
            s.texts
                .insert(locator.to_string(), texts.iter().map(|t| t.to_string()).collect())
        });
    }

    pub fn set_source(&self, html: &str) {
        self.with(|s| s.source = html.to_string());
    }

    pub fn actions(&self) -> Vec<String> {
        self.with(|s| s.actions.clone())
    }

    pub fn quit_calls(&self) -> usize {
        self.with(|s| s.quit_calls)
    }

    pub fn open_windows(&self) -> Vec<String> {
        self.with(|s| s.windows.clone())
    }

    pub fn frame_path(&self) -> Vec<String> {
        self.with(|s| s.frames.clone())
    }

    pub fn current(&self) -> String {
        self.with(|s| s.windows[s.current].clone())
    }
}

impl Automation for FakeBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.with(|s| {
            s.frames.clear();
            s.actions.push(format!("goto {url}"));
        });
        Ok(())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.with(|s| s.title.clone()))
    }

    async fn current_window(&self) -> Result<String, BrowserError> {
        Ok(self.current())
    }

    async fn window_handles(&self) -> Result<Vec<String>, BrowserError> {
        Ok(self.open_windows())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<(), BrowserError> {
        self.with(|s| match s.windows.iter().position(|w| w == handle) {
            Some(i) => {
                s.current = i;
                s.frames.clear();
                s.actions.push(format!("window {handle}"));
                Ok(())
            }
            None => Err(BrowserError::InvalidWindow(handle.to_string())),
        })
    }

    async fn switch_to_default_frame(&self) -> Result<(), BrowserError> {
        self.with(|s| s.frames.clear());
        Ok(())
    }

    async fn switch_to_frame(&self, name: &str) -> Result<bool, BrowserError> {
        Ok(self.with(|s| {
            if s.missing_frames.contains(name) {
                return false;
            }
            s.frames.push(name.to_string());
            true
        }))
    }

    async fn is_ready(&self, locator: Locator<'_>, _readiness: Readiness) -> Result<bool, BrowserError> {
        Ok(self.with(|s| !s.missing.contains(&locator.to_string())))
    }

    async fn click(&self, locator: Locator<'_>) -> Result<(), BrowserError> {
        let key = locator.to_string();
        self.with(|s| {
            if s.failing_clicks.contains(&key) || s.missing.contains(&key) {
                return Err(BrowserError::Unavailable(format!("click failed on {key}")));
            }
            s.actions.push(format!("click {key}"));
            if let Some(&count) = s.opens_window.get(&key) {
                for _ in 0..count {
                    let handle = format!("w{}", s.next_window);
                    s.next_window += 1;
                    s.windows.push(handle);
                }
            }
            if s.alert_on_click.contains(&key) {
                s.alert = true;
                s.actions.push(format!("alert-from {key}"));
            }
            Ok(())
        })
    }

    async fn send_keys(&self, locator: Locator<'_>, text: &str) -> Result<(), BrowserError> {
        self.with(|s| s.actions.push(format!("keys {locator} {text}")));
        Ok(())
    }

    async fn clear(&self, locator: Locator<'_>) -> Result<(), BrowserError> {
        self.with(|s| s.actions.push(format!("clear {locator}")));
        Ok(())
    }

    async fn texts(&self, locator: Locator<'_>) -> Result<Vec<String>, BrowserError> {
        Ok(self.with(|s| s.texts.get(&locator.to_string()).cloned().unwrap_or_default()))
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.with(|s| s.source.clone()))
    }

    async fn alert_present(&self) -> Result<bool, BrowserError> {
        Ok(self.with(|s| s.alert))
    }

    async fn accept_alert(&self) -> Result<(), BrowserError> {
        self.with(|s| {
            if !s.alert {
                return Err(BrowserError::Unavailable("no alert open".to_string()));
            }
            s.alert = false;
            s.actions.push("accept-alert".to_string());
            let raised_by = s
                .actions
                .iter()
                .rev()
                .find_map(|a| a.strip_prefix("alert-from ").map(str::to_string));
            if raised_by.is_some_and(|k| s.closes_window.contains(&k)) && s.windows.len() > 1 {
                s.windows.remove(s.current);
                s.current = 0;
                s.frames.clear();
            }
            Ok(())
        })
    }

    async fn close_window(&self) -> Result<(), BrowserError> {
        self.with(|s| {
            if s.failing_closes > 0 {
                s.failing_closes -= 1;
                return Err(BrowserError::Unavailable("window refused to close".to_string()));
            }
            let closed = s.windows.remove(s.current);
            s.actions.push(format!("close {closed}"));
            s.current = 0;
            s.frames.clear();
            Ok(())
        })
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        self.with(|s| {
            s.quit_calls += 1;
            s.actions.push("quit".to_string());
        });
        Ok(())
    }
}
