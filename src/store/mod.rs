//! Document Store Adapter
//!
//! A schema-agnostic view of a document database. Callers hand over plain
//! JSON records, get back opaque identifiers, and read records that have
//! already been normalized for transport (see [`StoredDocument`]).

mod document;
mod memory;
mod postgres;

pub use document::StoredDocument;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A loosely-typed document: field name -> JSON value
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document store is not configured")]
    NotConfigured,

    #[error("Document store unavailable: {cause}")]
    Unavailable { cause: String },

    #[error("Write to {collection} rejected: {cause}")]
    WriteRejected { collection: String, cause: String },

    #[error("Read from {collection} failed: {cause}")]
    ReadFailed { collection: String, cause: String },

    #[error("Invalid collection name: {name}")]
    InvalidCollection { name: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Equality filter over top-level fields. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Record,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn as_record(&self) -> &Record {
        &self.fields
    }

    /// True when every filtered field is present in `record` with an equal value
    pub fn matches(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

/// Backend holding the documents.
///
/// One instance is created at startup and shared by every request, so
/// implementations must be safe for concurrent use.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist `record` in `collection` and return its new identifier
    async fn insert(&self, collection: &str, record: Record) -> Result<String>;

    /// Up to `limit` records of `collection` matching `filter`, in store order,
    /// normalized for transport
    async fn query(&self, collection: &str, filter: &Filter, limit: usize) -> Result<Vec<Record>>;

    /// Check the store can be reached
    async fn ping(&self) -> Result<()>;

    /// Names of the collections that currently exist
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Short label for logs
    fn backend(&self) -> &'static str;
}

/// Collection names become table names, so keep them to plain lowercase identifiers.
pub fn is_valid_collection_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub(crate) fn check_collection(name: &str) -> Result<()> {
    if is_valid_collection_name(name) {
        Ok(())
    } else {
        Err(StorageError::InvalidCollection {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_collection_name() {
        assert!(is_valid_collection_name("offer"));
        assert!(is_valid_collection_name("customer_reviews_2024"));
        assert!(is_valid_collection_name("_staging"));

        assert!(!is_valid_collection_name(""));
        assert!(!is_valid_collection_name("offer; DROP TABLE post"));
        assert!(!is_valid_collection_name("Offers"));
        assert!(!is_valid_collection_name("1offer"));
        assert!(!is_valid_collection_name(&"a".repeat(64)));
    }

    #[test]
    fn test_filter_matches() {
        let record = json!({"title": "Rome", "is_featured": true, "price": 450.0});
        let record = record.as_object().unwrap();

        assert!(Filter::new().matches(record));
        assert!(Filter::new().eq("is_featured", true).matches(record));
        assert!(Filter::new()
            .eq("is_featured", true)
            .eq("title", "Rome")
            .matches(record));
        assert!(!Filter::new().eq("is_featured", false).matches(record));
        assert!(!Filter::new().eq("missing", Value::Null).matches(record));
    }

    #[test]
    fn test_check_collection_error() {
        match check_collection("Bad Name") {
            Err(StorageError::InvalidCollection { name }) => assert_eq!(name, "Bad Name"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
