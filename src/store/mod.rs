//! Document storage with at-most-once ingestion per article.
//!
//! The [`DocumentStore`] trait is the capability consumed from the database
//! engine. [`DedupStore`] layers the ingestion contract on top of it:
//!
//! - a unique index on `document_id` is created before the first insert into
//!   a collection
//! - inserts are attempted one record at a time; a duplicate-key rejection
//!   means the article is already stored and is skipped
//! - the stored copy is never replaced by ingestion (first write wins)
//! - any other failure stops the batch; earlier inserts stay in place
//!
//! Implementations:
//! - [`mongo`]: MongoDB via the official driver
//! - `memory`: in-process store for unit tests

pub mod mongo;

#[cfg(test)]
pub mod memory;

use crate::models::Article;
use mongodb::bson::Document;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, instrument};

pub use mongo::MongoStore;

/// Field every article collection is keyed on.
pub const ARTICLE_KEY: &str = "document_id";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The insert would violate a unique index.
    #[error("duplicate key in {collection}: {message}")]
    DuplicateKey { collection: String, message: String },

    #[error("document has no `{0}` field")]
    MissingKey(String),

    #[error("database error: {0}")]
    Backend(#[from] mongodb::error::Error),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// Primitive operations of the document database.
pub trait DocumentStore {
    async fn create_unique_index(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Insert one document. Violating a unique index must surface as
    /// [`StoreError::DuplicateKey`].
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError>;

    /// Replace the document whose `key` field equals `document[key]`, or
    /// insert it if there is none.
    async fn replace_or_insert(&self, collection: &str, document: Document, key: &str)
    -> Result<(), StoreError>;

    async fn count(&self, collection: &str) -> Result<u64, StoreError>;
}

/// Outcome of ingesting one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Whether a single record was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Inserted,
    AlreadyStored,
}

/// Duplicate-safe article ingestion over a [`DocumentStore`].
pub struct DedupStore<S> {
    store: S,
    indexed: HashSet<String>,
}

impl<S: DocumentStore> DedupStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            indexed: HashSet::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Create the unique index on `key` unless this store already did so for
    /// `collection`.
    pub async fn ensure_unique_index(&mut self, collection: &str, key: &str) -> Result<(), StoreError> {
        let marker = format!("{collection}.{key}");
        if self.indexed.contains(&marker) {
            return Ok(());
        }
        self.store.create_unique_index(collection, key).await?;
        info!(collection, key, "Unique index ensured");
        self.indexed.insert(marker);
        Ok(())
    }

    /// Store one article unless an article with the same `document_id` is
    /// already present.
    pub async fn ingest_one(&mut self, collection: &str, article: &Article) -> Result<Ingested, StoreError> {
        self.ensure_unique_index(collection, ARTICLE_KEY).await?;
        match self.store.insert(collection, article.to_document()).await {
            Ok(()) => Ok(Ingested::Inserted),
            Err(e) if e.is_duplicate_key() => {
                info!(
                    collection,
                    document_id = %article.document_id,
                    "Insertion skipped; record already ingested"
                );
                Ok(Ingested::AlreadyStored)
            }
            Err(e) => Err(e),
        }
    }

    /// Store a batch record by record. Stops at the first non-duplicate
    /// failure without undoing earlier inserts.
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    pub async fn ingest(&mut self, collection: &str, articles: &[Article]) -> Result<IngestReport, StoreError> {
        let mut report = IngestReport::default();
        for article in articles {
            match self.ingest_one(collection, article).await? {
                Ingested::Inserted => report.inserted += 1,
                Ingested::AlreadyStored => report.skipped += 1,
            }
        }
        info!(
            collection,
            inserted = report.inserted,
            skipped = report.skipped,
            "Scrapes loaded into database"
        );
        Ok(report)
    }

    /// Bulk insert in one round trip, without per-record duplicate
    /// skipping: a unique-index violation fails the call with
    /// [`StoreError::DuplicateKey`]. Suited to collections known to be fresh.
    pub async fn insert_many(&mut self, collection: &str, articles: &[Article]) -> Result<(), StoreError> {
        if articles.is_empty() {
            return Ok(());
        }
        self.ensure_unique_index(collection, ARTICLE_KEY).await?;
        let documents = articles.iter().map(Article::to_document).collect();
        self.store.insert_many(collection, documents).await?;
        info!(collection, count = articles.len(), "Bulk insert done");
        Ok(())
    }

    /// Replace-or-insert for document kinds that should track upstream
    /// changes. Not used for articles.
    pub async fn upsert(&self, collection: &str, document: Document, key: &str) -> Result<(), StoreError> {
        if !document.contains_key(key) {
            return Err(StoreError::MissingKey(key.to_string()));
        }
        self.store.replace_or_insert(collection, document, key).await
    }

    pub async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.store.count(collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::models::MetaData;
    use chrono::{FixedOffset, TimeZone};
    use mongodb::bson::doc;

    fn article(id: &str, heading: &str) -> Article {
        Article {
            document_id: id.to_string(),
            heading: heading.to_string(),
            content: "內文".to_string(),
            meta_data: MetaData {
                source: "明報".to_string(),
                pub_date: FixedOffset::east_opt(8 * 3600)
                    .unwrap()
                    .with_ymd_and_hms(2020, 7, 15, 0, 0, 0)
                    .unwrap(),
                section: "港聞".to_string(),
                page: Some("A12".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_ingesting_twice_stores_once() {
        let mut store = DedupStore::new(MemoryStore::new());
        let a = article("WN20200715001", "first");

        assert_eq!(store.ingest_one("suicide_news", &a).await.unwrap(), Ingested::Inserted);
        assert_eq!(store.ingest_one("suicide_news", &a).await.unwrap(), Ingested::AlreadyStored);
        assert_eq!(store.count("suicide_news").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let mut store = DedupStore::new(MemoryStore::new());
        store.ingest("c", &[article("WN1", "original")]).await.unwrap();
        let report = store.ingest("c", &[article("WN1", "corrected")]).await.unwrap();

        assert_eq!(report, IngestReport { inserted: 0, skipped: 1 });
        let stored = store.inner().find("c", "document_id", "WN1").unwrap();
        assert_eq!(stored.get_str("heading").unwrap(), "original");
    }

    #[tokio::test]
    async fn test_index_created_once_per_collection() {
        let mut store = DedupStore::new(MemoryStore::new());
        store
            .ingest("a", &[article("WN1", "x"), article("WN2", "y")])
            .await
            .unwrap();
        store.ingest("b", &[article("WN1", "x")]).await.unwrap();
        store.ingest("a", &[article("WN3", "z")]).await.unwrap();

        assert_eq!(store.inner().index_calls(), 2);
        assert_eq!(store.count("a").await.unwrap(), 3);
        assert_eq!(store.count("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_other_failures_abort_without_rollback() {
        let mut store = DedupStore::new(MemoryStore::new());
        store.inner().fail_insert_of("WN2");

        let batch = [article("WN1", "a"), article("WN2", "b"), article("WN3", "c")];
        let err = store.ingest("c", &batch).await.unwrap_err();

        assert!(!err.is_duplicate_key());
        assert_eq!(store.count("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_many_empty_batch_is_noop() {
        let mut store = DedupStore::new(MemoryStore::new());
        store.insert_many("c", &[]).await.unwrap();

        assert_eq!(store.inner().index_calls(), 0);
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_many_reports_duplicate_key() {
        let mut store = DedupStore::new(MemoryStore::new());
        store
            .insert_many("c", &[article("WN1", "a"), article("WN2", "b")])
            .await
            .unwrap();
        assert_eq!(store.count("c").await.unwrap(), 2);

        let err = store
            .insert_many("c", &[article("WN3", "c"), article("WN1", "again")])
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.inner().index_calls(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = DedupStore::new(MemoryStore::new());
        store
            .upsert("runs", doc! { "run_id": "r1", "status": "started" }, "run_id")
            .await
            .unwrap();
        store
            .upsert("runs", doc! { "run_id": "r1", "status": "done" }, "run_id")
            .await
            .unwrap();

        assert_eq!(store.count("runs").await.unwrap(), 1);
        let stored = store.inner().find("runs", "run_id", "r1").unwrap();
        assert_eq!(stored.get_str("status").unwrap(), "done");
    }

    #[tokio::test]
    async fn test_upsert_requires_key() {
        let store = DedupStore::new(MemoryStore::new());
        let err = store.upsert("runs", doc! { "status": "x" }, "run_id").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingKey(k) if k == "run_id"));
    }
}
