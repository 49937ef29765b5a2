//! Schema Registry
//!
//! Declares the shape and validation rules of every document kind, and the
//! table that maps each kind to the collection it is stored in. Nothing in
//! here talks to storage: a record leaves this module only after it has
//! passed validation.

mod collections;
mod models;

pub use collections::CollectionMap;
pub use models::{Offer, Post, Review};

use crate::store::Record;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use validator::{Validate, ValidationErrors};

/// The kinds of document this service stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    Offer,
    Post,
    Review,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Offer, DocumentKind::Post, DocumentKind::Review];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Offer => "offer",
            DocumentKind::Post => "post",
            DocumentKind::Review => "review",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed document definition.
///
/// Implementors declare their constraints with `#[derive(Validate)]`; the
/// registry turns a validated value into the loosely-typed [`Record`] the
/// store adapter works with.
pub trait Schema: Serialize + DeserializeOwned + Validate + Send + 'static {
    const KIND: DocumentKind;
}

/// Client input that failed schema validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub kind: DocumentKind,
    /// Field name -> messages for that field
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    fn from_errors(kind: DocumentKind, errors: &ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => format!("failed '{}' check", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self { kind, fields }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}:", self.kind)?;
        for (field, messages) in &self.fields {
            write!(f, " {} ({})", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Validate a typed document and convert it into a storable record.
///
/// Runs before any storage call is attempted.
pub fn validate_record<T: Schema>(document: &T) -> Result<Record, ValidationFailure> {
    document
        .validate()
        .map_err(|e| ValidationFailure::from_errors(T::KIND, &e))?;

    match serde_json::to_value(document) {
        Ok(Value::Object(record)) => Ok(record),
        // Every schema is a plain struct, so anything else means the
        // document cannot be represented as a record at all.
        Ok(_) | Err(_) => Err(ValidationFailure {
            kind: T::KIND,
            fields: BTreeMap::from([(
                "__all__".to_string(),
                vec!["document is not a JSON object".to_string()],
            )]),
        }),
    }
}
