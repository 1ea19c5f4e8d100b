//! JSON export of extracted articles.
//!
//! Files are grouped by the local date of the run, one file per collection:
//! ```text
//! json_output_dir/
//! └── 2020-07-15/
//!     ├── suicide_news.json
//!     └── helium_news.json
//! ```
//!
//! A second run on the same day for the same collection overwrites the file.

use crate::models::Article;
use chrono::{Local, NaiveDate};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the export file for `collection` on `date`.
pub fn export_path(json_output_dir: &str, date: NaiveDate, collection: &str) -> PathBuf {
    Path::new(json_output_dir)
        .join(date.to_string())
        .join(format!("{collection}.json"))
}

/// Write `articles` to `{json_output_dir}/{today}/{collection}.json`.
#[instrument(level = "info", skip(articles), fields(count = articles.len()))]
pub async fn write_articles(
    articles: &[Article],
    json_output_dir: &str,
    collection: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = export_path(json_output_dir, Local::now().date_naive(), collection);
    let json = serde_json::to_string_pretty(articles)?;

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON export");
    Ok(path)
}
