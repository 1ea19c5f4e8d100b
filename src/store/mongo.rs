//! [`DocumentStore`] backed by MongoDB.

use super::{DocumentStore, StoreError};
use crate::retry::with_backoff;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::time::Duration;
use tracing::{info, instrument};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

pub struct MongoStore {
    client: Client,
    db: Database,
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore").field("db", &self.db.name()).finish()
    }
}

impl MongoStore {
    /// Connect and verify the server answers a ping.
    #[instrument(level = "info", skip(uri))]
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        with_backoff("mongodb ping", 5, Duration::from_secs(1), || async {
            db.run_command(doc! { "ping": 1 }).await
        })
        .await?;
        info!(database, "Connected to MongoDB");
        Ok(Self { client, db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    /// Close pooled connections. Call once at the end of the run.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY_CODE,
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|we| we.code == DUPLICATE_KEY_CODE)),
        _ => false,
    }
}

fn duplicate_or(collection: &str, e: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&e) {
        StoreError::DuplicateKey {
            collection: collection.to_string(),
            message: e.to_string(),
        }
    } else {
        e.into()
    }
}

impl DocumentStore for MongoStore {
    async fn create_unique_index(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut keys = Document::new();
        keys.insert(key, 1);
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection(collection).create_index(model).await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| duplicate_or(collection, e))?;
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        if documents.is_empty() {
            return Ok(());
        }
        self.collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| duplicate_or(collection, e))?;
        Ok(())
    }

    async fn replace_or_insert(&self, collection: &str, document: Document, key: &str) -> Result<(), StoreError> {
        let value = document
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))?;
        let mut filter = Document::new();
        filter.insert(key, value);
        self.collection(collection)
            .replace_one(filter, document)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        Ok(self.collection(collection).count_documents(doc! {}).await?)
    }
}
