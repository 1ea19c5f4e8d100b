//! Persisting an extraction: database first, then the optional JSON export.
//!
//! Used by both the live browser run and `--replay`.

use crate::error::{Result, ScrapeError};
use crate::outputs::json;
use crate::scrapers::extract::{Extraction, RawCollections};
use crate::store::{DedupStore, DocumentStore, IngestReport};
use tracing::{error, info, instrument};

/// Store the accepted articles of `extraction` in `collection` and export
/// them as JSON when `json_output_dir` is set.
///
/// A failed export is logged but does not fail the run.
#[instrument(level = "info", skip(store, extraction), fields(accepted = extraction.articles.len()))]
pub async fn ingest_extraction<S: DocumentStore>(
    store: &mut DedupStore<S>,
    collection: &str,
    extraction: &Extraction,
    json_output_dir: Option<&str>,
) -> Result<IngestReport> {
    let report = store.ingest(collection, &extraction.articles).await?;

    if let Some(dir) = json_output_dir {
        if let Err(e) = json::write_articles(&extraction.articles, dir, collection).await {
            error!(error = %e, collection, "Failed to write JSON export");
        }
    }
    Ok(report)
}

/// Ingest a saved viewer page without a browser.
#[instrument(level = "info", skip(store, sections))]
pub async fn replay_capture<S: DocumentStore>(
    store: &mut DedupStore<S>,
    path: &str,
    collection: &str,
    sections: &[String],
    json_output_dir: Option<&str>,
) -> Result<IngestReport> {
    let html = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ScrapeError::io(path, e))?;
    let extraction = RawCollections::from_html(&html)?.into_articles(sections)?;
    info!(
        articles = extraction.articles.len(),
        rejected = extraction.rejected.len(),
        "Replayed capture"
    );
    ingest_extraction(store, collection, &extraction, json_output_dir).await
}
