//! Browser-driven collection of articles from WiseNews.
//!
//! The portal sits behind the HKU library's single sign-on and renders its
//! search form, result list and article viewer in nested frames and popup
//! windows. Each submodule covers one part of that workflow:
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Login, portal entry, viewer popups, teardown |
//! | [`search`] | Search form: region, sections, date range, keywords |
//! | [`notify`] | Emailing the result set through the portal's mailer |
//! | [`extract`] | Rebuilding article records from the viewer |
//! | [`wait`] | Bounded polling for page readiness |
//! | [`selectors`] | Locators, frame names and page titles |
//!
//! # Run order
//!
//! 1. `login` then `get_portal`
//! 2. `search` for the first category, `update_search` for the rest
//! 3. optionally `email_results`
//! 4. `open_viewer`, `extract`, `close_viewer`
//! 5. `teardown`, always

pub mod extract;
pub mod notify;
pub mod search;
pub mod selectors;
pub mod session;
pub mod wait;
