//! In-memory [`DocumentStore`] for tests.
//!
//! Enforces unique indexes the way MongoDB does and can be told to fail the
//! insert of a specific `document_id` to exercise error paths.

use super::{DocumentStore, StoreError};
use mongodb::bson::{Bson, Document};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Collection {
    unique_keys: Vec<String>,
    documents: Vec<Document>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    failing_ids: Mutex<HashSet<String>>,
    index_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_insert_of(&self, document_id: &str) {
        self.failing_ids.lock().unwrap().insert(document_id.to_string());
    }

    pub fn index_calls(&self) -> usize {
        *self.index_calls.lock().unwrap()
    }

    pub fn find(&self, collection: &str, key: &str, value: &str) -> Option<Document> {
        let collections = self.collections.lock().unwrap();
        collections
            .get(collection)?
            .documents
            .iter()
            .find(|d| d.get_str(key).ok() == Some(value))
            .cloned()
    }
}

fn same_key(a: &Document, b: &Document, key: &str) -> bool {
    match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl DocumentStore for MemoryStore {
    async fn create_unique_index(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        *self.index_calls.lock().unwrap() += 1;
        let mut collections = self.collections.lock().unwrap();
        let c = collections.entry(collection.to_string()).or_default();
        if !c.unique_keys.iter().any(|k| k == key) {
            c.unique_keys.push(key.to_string());
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        if let Some(Bson::String(id)) = document.get("document_id") {
            if self.failing_ids.lock().unwrap().contains(id) {
                return Err(StoreError::Other(format!("simulated failure inserting {id}")));
            }
        }
        let mut collections = self.collections.lock().unwrap();
        let c = collections.entry(collection.to_string()).or_default();
        for key in &c.unique_keys {
            if c.documents.iter().any(|d| same_key(d, &document, key)) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    message: format!("E11000 duplicate key on {key}"),
                });
            }
        }
        c.documents.push(document);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        for document in documents {
            self.insert(collection, document).await?;
        }
        Ok(())
    }

    async fn replace_or_insert(&self, collection: &str, document: Document, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let c = collections.entry(collection.to_string()).or_default();
        match c.documents.iter_mut().find(|d| same_key(d, &document, key)) {
            Some(existing) => *existing = document,
            None => c.documents.push(document),
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(collection).map_or(0, |c| c.documents.len() as u64))
    }
}
