//! Data models for search requests and extracted articles.
//!
//! - [`Article`] / [`MetaData`]: one news item reconstructed from the viewer
//! - [`SearchConfig`]: what gets typed into the portal's search form
//! - [`DateRange`]: the fixed date-range dropdown, by number of steps
//! - [`KeywordCategory`]: the built-in category table (collection + query)

use chrono::{DateTime, FixedOffset};
use clap::ValueEnum;
use mongodb::bson::{self, Document, doc};
use serde::{Deserialize, Serialize};

/// A news article as stored in the archive.
///
/// `document_id` is assigned by WiseNews and is the storage key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    pub document_id: String,
    pub heading: String,
    pub content: String,
    pub meta_data: MetaData,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetaData {
    /// Publication name, e.g. "明報".
    pub source: String,
    /// Midnight of the publication day at UTC+8.
    pub pub_date: DateTime<FixedOffset>,
    /// Matching section names joined by `/`, in page order. May be empty.
    pub section: String,
    /// Page code such as `A12`.
    pub page: Option<String>,
}

impl Article {
    /// BSON form written to MongoDB. `pub_date` becomes a native BSON date.
    pub fn to_document(&self) -> Document {
        doc! {
            "document_id": &self.document_id,
            "heading": &self.heading,
            "content": &self.content,
            "meta_data": {
                "source": &self.meta_data.source,
                "pub_date": bson::DateTime::from_millis(self.meta_data.pub_date.timestamp_millis()),
                "section": &self.meta_data.section,
                "page": self.meta_data.page.clone(),
            },
        }
    }
}

/// Positions of the portal's date-range dropdown.
///
/// The discriminant is the number of arrow-down presses from the default
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    ThreeDays = 2,
    Week = 3,
    #[value(name = "year-2020")]
    #[serde(rename = "year-2020")]
    Year2020 = 8,
    #[value(name = "year-2019")]
    #[serde(rename = "year-2019")]
    Year2019 = 9,
    #[value(name = "year-2018")]
    #[serde(rename = "year-2018")]
    Year2018 = 10,
    #[value(name = "year-2017")]
    #[serde(rename = "year-2017")]
    Year2017 = 11,
}

impl DateRange {
    pub fn steps(self) -> usize {
        self as usize
    }
}

/// Parameters for one portal search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub date_range: DateRange,
    pub keyword_query: String,
    /// Also the classifier for section tokens during extraction.
    pub section_filter: Vec<String>,
}

/// A named keyword search and the collection its results are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordCategory {
    pub key: &'static str,
    pub collection: &'static str,
    pub query: &'static str,
}

pub const KEYWORD_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        key: "helium",
        collection: "helium_news",
        query: "(雪種 or 石油氣 or 笠頭 or 包頭 or 膠袋 or 氣袋 or 氮氣 or 毒氣 or 氫氣 or 吸氣 or 氣體 or 氣罐 or 氦氣 or 氣瓶 or 氣樽 or 氣罐) and (自殺 or 亡 or 命危)",
    },
    KeywordCategory {
        key: "csrp",
        collection: "csrp_news",
        query: "防止自殺研究中心 or 葉兆輝",
    },
    KeywordCategory {
        key: "suicide",
        collection: "suicide_news",
        query: "自殺",
    },
];

/// News sections searched and recognised in article details by default.
pub const DEFAULT_SECTIONS: &[&str] = &["港聞", "香港新聞", "要聞", "突發"];
