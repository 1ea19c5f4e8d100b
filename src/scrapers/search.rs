//! Filling in the portal's search form.

use super::selectors::*;
use super::session::{SessionController, SessionState};
use super::wait::Condition;
use crate::browser::{Automation, Locator, Readiness, keys};
use crate::error::Result;
use crate::models::SearchConfig;
use tracing::{info, instrument};

/// Drives the search form of a session that is on the portal.
pub struct SearchParameterBuilder<'s, B> {
    session: &'s mut SessionController<B>,
}

impl<'s, B: Automation> SearchParameterBuilder<'s, B> {
    pub fn new(session: &'s mut SessionController<B>) -> Self {
        Self { session }
    }

    /// Run the first search of the session from the portal home page.
    #[instrument(level = "info", skip_all, fields(date_range = ?config.date_range))]
    pub async fn search(&mut self, config: &SearchConfig) -> Result<()> {
        let s = &mut *self.session;
        s.expect_state("search", SessionState::OnPortalHome)?;

        s.activate_main().await?;
        s.enter_frame("search frame", CONTENT_FRAME).await?;
        s.settle().await;
        s.waiter().dismiss("search alert layer", ALERT_LAYER_CLOSE).await;

        let w = s.waiter();
        w.click("region select-all", REGION_SELECT_ALL, Readiness::Visible)
            .await?;
        w.click("region checkbox", Locator::Id(&s.config().region), Readiness::Clickable)
            .await?;
        if !config.section_filter.is_empty() {
            w.type_into(
                "section field",
                SECTION_FIELD,
                Readiness::Clickable,
                &config.section_filter.join(","),
            )
            .await?;
        }

        w.require("date range dropdown", Condition::Clickable(DATE_RANGE_DROPDOWN))
            .await?;
        let arrow = keys::ARROW_DOWN.to_string();
        for _ in 0..config.date_range.steps() {
            s.browser().send_keys(DATE_RANGE_DROPDOWN, &arrow).await?;
        }

        w.type_into("search text", SEARCH_TEXT, Readiness::Clickable, &submit(&config.keyword_query))
            .await?;

        s.set_state(SessionState::OnResultsList);
        info!(query = %config.keyword_query, "Search submitted");
        Ok(())
    }

    /// Change the sections and keywords of the current search from the
    /// results list. The region and date range stay as they were.
    #[instrument(level = "info", skip_all)]
    pub async fn update_search(&mut self, config: &SearchConfig) -> Result<()> {
        let s = &mut *self.session;
        s.expect_state("update_search", SessionState::OnResultsList)?;

        s.enter_results_frames().await?;
        s.settle().await;

        let w = s.waiter();
        w.click("edit search button", EDIT_SEARCH, Readiness::Clickable)
            .await?;
        w.clear("section field", SECTION_FIELD).await?;
        if !config.section_filter.is_empty() {
            w.type_into(
                "section field",
                SECTION_FIELD,
                Readiness::Clickable,
                &config.section_filter.join(","),
            )
            .await?;
        }
        w.clear("search text", SEARCH_TEXT).await?;
        w.type_into("search text", SEARCH_TEXT, Readiness::Clickable, &submit(&config.keyword_query))
            .await?;

        s.set_state(SessionState::OnResultsList);
        info!(query = %config.keyword_query, "Search updated");
        Ok(())
    }
}

/// The query followed by the Enter key.
fn submit(query: &str) -> String {
    format!("{query}{}", keys::ENTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;
    use crate::error::ScrapeError;
    use crate::models::DateRange;
    use crate::scrapers::session::tests::on_portal;

    fn search_config(sections: &[&str]) -> SearchConfig {
        SearchConfig {
            date_range: DateRange::Week,
            keyword_query: "自殺".to_string(),
            section_filter: sections.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn keys_on(actions: &[String], locator: Locator<'_>) -> Vec<String> {
        let prefix = format!("keys {locator} ");
        actions
            .iter()
            .filter_map(|a| a.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_search_fills_form() {
        let mut session = on_portal(FakeBrowser::new()).await;
        SearchParameterBuilder::new(&mut session)
            .search(&search_config(&["港聞", "要聞"]))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::OnResultsList);
        let actions = session.browser().actions();
        assert!(actions.contains(&"click id:regionSelectAll".to_string()));
        assert!(actions.contains(&"click id:hk".to_string()));
        assert_eq!(keys_on(&actions, SECTION_FIELD), vec!["港聞,要聞"]);
        assert_eq!(keys_on(&actions, DATE_RANGE_DROPDOWN).len(), 3);
        assert_eq!(
            keys_on(&actions, SEARCH_TEXT),
            vec![format!("自殺{}", keys::ENTER)]
        );
        assert_eq!(session.browser().frame_path(), vec![CONTENT_FRAME]);
    }

    #[tokio::test]
    async fn test_empty_section_filter_leaves_field_alone() {
        let mut session = on_portal(FakeBrowser::new()).await;
        SearchParameterBuilder::new(&mut session)
            .search(&search_config(&[]))
            .await
            .unwrap();

        assert!(keys_on(&session.browser().actions(), SECTION_FIELD).is_empty());
    }

    #[tokio::test]
    async fn test_search_without_alert_layer() {
        let browser = FakeBrowser::new();
        browser.hide(ALERT_LAYER_CLOSE);
        let mut session = on_portal(browser).await;
        SearchParameterBuilder::new(&mut session)
            .search(&search_config(&["港聞"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_region_names_step() {
        let browser = FakeBrowser::new();
        browser.hide(REGION_SELECT_ALL);
        let mut session = on_portal(browser).await;
        let err = SearchParameterBuilder::new(&mut session)
            .search(&search_config(&[]))
            .await
            .unwrap_err();

        assert_eq!(err.failed_step(), Some("region select-all"));
        assert_eq!(session.state(), SessionState::OnPortalHome);
    }

    #[tokio::test]
    async fn test_update_search_rewrites_fields() {
        let mut session = on_portal(FakeBrowser::new()).await;
        let mut builder = SearchParameterBuilder::new(&mut session);
        builder.search(&search_config(&["港聞"])).await.unwrap();
        let mut next = search_config(&["突發"]);
        next.keyword_query = "葉兆輝".to_string();
        builder.update_search(&next).await.unwrap();

        let actions = session.browser().actions();
        assert!(actions.contains(&"click id:edit_search".to_string()));
        assert!(actions.contains(&"clear id:ShowSection".to_string()));
        assert!(actions.contains(&"clear id:searchTxt".to_string()));
        assert_eq!(keys_on(&actions, SECTION_FIELD), vec!["港聞", "突發"]);
        assert_eq!(keys_on(&actions, SEARCH_TEXT).last().unwrap(), &format!("葉兆輝{}", keys::ENTER));
        assert_eq!(session.browser().frame_path(), vec![CONTENT_FRAME, RESULTS_FRAME]);
    }

    #[tokio::test]
    async fn test_update_with_no_sections_clears_field() {
        let mut session = on_portal(FakeBrowser::new()).await;
        let mut builder = SearchParameterBuilder::new(&mut session);
        builder.search(&search_config(&["港聞"])).await.unwrap();
        builder.update_search(&search_config(&[])).await.unwrap();

        let actions = session.browser().actions();
        assert!(actions.contains(&"clear id:ShowSection".to_string()));
        assert_eq!(keys_on(&actions, SECTION_FIELD), vec!["港聞"]);
        assert_eq!(session.state(), SessionState::OnResultsList);
    }

    #[tokio::test]
    async fn test_missing_content_frame_names_step() {
        let browser = FakeBrowser::new();
        browser.hide_frame(CONTENT_FRAME);
        let mut session = on_portal(browser).await;
        let err = SearchParameterBuilder::new(&mut session)
            .search(&search_config(&["港聞"]))
            .await
            .unwrap_err();

        assert_eq!(err.failed_step(), Some("search frame"));
        assert_eq!(session.state(), SessionState::OnPortalHome);
        assert!(session.browser().frame_path().is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_results_list() {
        let mut session = on_portal(FakeBrowser::new()).await;
        let err = SearchParameterBuilder::new(&mut session)
            .update_search(&search_config(&[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::InvalidState {
                operation: "update_search",
                found: SessionState::OnPortalHome,
                ..
            }
        ));
    }
}
