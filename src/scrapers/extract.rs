//! Article reconstruction from the WiseNews article viewer.
//!
//! The viewer renders every article of a result set on one page, but not as
//! self-contained blocks. Instead it exposes four parallel collections:
//!
//! | Collection | Live page | Saved capture |
//! |------------|-----------|---------------|
//! | headings | `//*[@class="bluebold"]` | `[class="bluebold"]` |
//! | bodies | `//*[@class="content"]` | `[class="content"]` |
//! | sources | `//*[@id="content_source"]/a` | `[id="content_source"] > a` |
//! | details | `//*[@id="content_details"]` | `[id="content_details"]` |
//!
//! Details hold two entries per article: the metadata line
//! (`港聞|A12|2020-07-15`) at even positions and the labelled identifier
//! (`Document ID: WN20200715001`) at odd positions. Articles are rebuilt by
//! position, so every collection must line up exactly.

use super::selectors::{
    BODIES, BODIES_CSS, DETAILS, DETAILS_CSS, HEADINGS, HEADINGS_CSS, SOURCES, SOURCES_CSS,
};
use super::wait::{Condition, Waiter};
use crate::browser::Automation;
use crate::error::Result;
use crate::models::{Article, MetaData};
use crate::utils::{strip_illegal_characters, strip_whitespace, truncate_for_log};
use chrono::{DateTime, FixedOffset, NaiveDate};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());
static PAGE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][0-9]{2}$").unwrap());

/// Label separator in front of a document identifier.
const ID_SEPARATOR: &str = ": ";

const HKT_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(
        "result collections are misaligned: {headings} headings, {bodies} bodies, {sources} sources, \
         {page_details} page details, {document_ids} document ids"
    )]
    Misaligned {
        headings: usize,
        bodies: usize,
        sources: usize,
        page_details: usize,
        document_ids: usize,
    },

    #[error("invalid selector {0}")]
    Selector(String),
}

/// Why an otherwise aligned record was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetailError {
    #[error("no publication date in `{0}`")]
    MissingDate(String),

    #[error("more than one publication date {dates:?} in `{detail}`")]
    MultipleDates { detail: String, dates: Vec<String> },
}

/// Raw text collections as read off the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCollections {
    pub headings: Vec<String>,
    pub bodies: Vec<String>,
    pub sources: Vec<String>,
    pub details: Vec<String>,
}

/// Metadata parsed out of one detail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDetail {
    pub pub_date: DateTime<FixedOffset>,
    pub section: String,
    pub page: Option<String>,
}

/// A record dropped because its detail line could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub document_id: String,
    pub reason: DetailError,
}

/// Output of one extraction run.
#[derive(Debug, Default)]
pub struct Extraction {
    pub articles: Vec<Article>,
    pub rejected: Vec<Rejected>,
}

impl RawCollections {
    /// Read the four collections from the current viewer window.
    ///
    /// Each collection must be populated within the wait deadline; the page
    /// fills them in as it loads.
    #[instrument(level = "info", skip_all)]
    pub async fn read<B: Automation>(browser: &B, waiter: &Waiter<'_, B>) -> Result<Self> {
        waiter.require("viewer headings", Condition::Present(HEADINGS)).await?;
        waiter.require("viewer bodies", Condition::Present(BODIES)).await?;
        waiter.require("viewer sources", Condition::Present(SOURCES)).await?;
        waiter.require("viewer details", Condition::Present(DETAILS)).await?;

        let raw = Self {
            headings: browser.texts(HEADINGS).await?,
            bodies: browser.texts(BODIES).await?,
            sources: browser.texts(SOURCES).await?,
            details: browser.texts(DETAILS).await?,
        };
        info!(
            headings = raw.headings.len(),
            bodies = raw.bodies.len(),
            sources = raw.sources.len(),
            details = raw.details.len(),
            "Read viewer collections"
        );
        Ok(raw)
    }

    /// Read the four collections from a saved copy of the viewer page.
    pub fn from_html(html: &str) -> std::result::Result<Self, ExtractError> {
        let document = Html::parse_document(html);
        let texts = |css: &str| -> std::result::Result<Vec<String>, ExtractError> {
            let selector = Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))?;
            Ok(document
                .select(&selector)
                .map(|e| e.text().collect::<String>().trim().to_string())
                .collect())
        };
        Ok(Self {
            headings: texts(HEADINGS_CSS)?,
            bodies: texts(BODIES_CSS)?,
            sources: texts(SOURCES_CSS)?,
            details: texts(DETAILS_CSS)?,
        })
    }

    /// Rebuild articles by position.
    ///
    /// Fails as a whole if the collections do not line up. Records whose
    /// detail line has no single publication date are returned in
    /// [`Extraction::rejected`] instead of [`Extraction::articles`].
    pub fn into_articles(self, sections: &[String]) -> std::result::Result<Extraction, ExtractError> {
        let (page_details, document_ids) = split_details(&self.details);

        let lengths = [
            self.headings.len(),
            self.bodies.len(),
            self.sources.len(),
            page_details.len(),
            document_ids.len(),
        ];
        if lengths.iter().any(|&n| n != lengths[0]) {
            return Err(ExtractError::Misaligned {
                headings: lengths[0],
                bodies: lengths[1],
                sources: lengths[2],
                page_details: lengths[3],
                document_ids: lengths[4],
            });
        }

        let mut extraction = Extraction::default();
        let rows = self
            .headings
            .into_iter()
            .zip(self.bodies)
            .zip(self.sources)
            .zip(page_details.into_iter().zip(document_ids));

        for (((heading, content), source), (detail, document_id)) in rows {
            match parse_page_detail(detail, sections) {
                Ok(parsed) => {
                    debug!(%document_id, heading = %truncate_for_log(&heading, 40), "Parsed article");
                    extraction.articles.push(Article {
                        document_id: strip_illegal_characters(&document_id),
                        heading: strip_illegal_characters(&heading),
                        content: strip_illegal_characters(&content),
                        meta_data: MetaData {
                            source: strip_illegal_characters(&source),
                            pub_date: parsed.pub_date,
                            section: strip_illegal_characters(&parsed.section),
                            page: parsed.page,
                        },
                    });
                }
                Err(reason) => {
                    warn!(%document_id, %reason, "Rejected article with unusable detail line");
                    extraction.rejected.push(Rejected { document_id, reason });
                }
            }
        }

        info!(
            articles = extraction.articles.len(),
            rejected = extraction.rejected.len(),
            "Extraction complete"
        );
        Ok(extraction)
    }
}

/// Separate interleaved detail entries into metadata lines (even positions)
/// and document identifiers (odd positions).
pub fn split_details(details: &[String]) -> (Vec<&str>, Vec<String>) {
    let page_details = details.iter().step_by(2).map(String::as_str).collect();
    let document_ids = details
        .iter()
        .skip(1)
        .step_by(2)
        .map(|s| parse_document_id(s))
        .collect();
    (page_details, document_ids)
}

/// `"Document ID: WN20200715001"` → `"WN20200715001"`.
pub fn parse_document_id(labelled: &str) -> String {
    labelled
        .rsplit(ID_SEPARATOR)
        .next()
        .unwrap_or(labelled)
        .trim()
        .to_string()
}

enum Token<'a> {
    Date(NaiveDate),
    Page(&'a str),
    Section(&'a str),
    Other,
}

fn classify<'a>(token: &'a str, sections: &[String]) -> Token<'a> {
    if DATE_TOKEN.is_match(token) {
        if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            return Token::Date(date);
        }
    }
    if PAGE_TOKEN.is_match(token) {
        return Token::Page(token);
    }
    if sections.iter().any(|s| s == token) {
        return Token::Section(token);
    }
    Token::Other
}

/// Parse a `|`-delimited detail line such as `港聞 | A12 | 2020-07-15`.
///
/// Whitespace is removed before splitting. Tokens are consumed last-first;
/// `page` ends up as the last page code seen in that order. Sections keep
/// their left-to-right order. Exactly one date token must be present; a
/// repeated date counts as ambiguous.
pub fn parse_page_detail(detail: &str, sections: &[String]) -> std::result::Result<PageDetail, DetailError> {
    let normalized = strip_whitespace(detail);

    let mut dates = Vec::new();
    let mut page = None;
    let mut found_sections = Vec::new();

    for token in normalized.split('|').rev() {
        match classify(token, sections) {
            Token::Date(date) => dates.push(date),
            Token::Page(code) => page = Some(code.to_string()),
            Token::Section(name) => found_sections.push(name),
            Token::Other => {
                if !token.is_empty() {
                    debug!(token, "Ignoring unclassified detail token");
                }
            }
        }
    }

    let date = match dates.as_slice() {
        [date] => *date,
        [] => return Err(DetailError::MissingDate(normalized)),
        _ => {
            return Err(DetailError::MultipleDates {
                detail: normalized,
                dates: dates.iter().rev().map(|d| d.to_string()).collect(),
            });
        }
    };

    let hkt = FixedOffset::east_opt(HKT_OFFSET_SECS).expect("UTC+8 is a valid offset");
    let pub_date = date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(hkt).single())
        .expect("midnight exists at a fixed offset");

    Ok(PageDetail {
        pub_date,
        section: found_sections.iter().rev().join("/"),
        page,
    })
}

/// Read the current viewer and rebuild its articles.
pub async fn extract<B: Automation>(
    browser: &B,
    waiter: &Waiter<'_, B>,
    sections: &[String],
) -> Result<Extraction> {
    let raw = RawCollections::read(browser, waiter).await?;
    Ok(raw.into_articles(sections)?)
}
