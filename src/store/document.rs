use super::Record;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Field some document stores use for their internal identifier
const INTERNAL_ID_FIELD: &str = "_id";

/// A document as held by a backend, before transport normalization
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Record,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn new(id: String, fields: Record, now: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Wire-safe record: the identifier becomes a string `id` field, any
    /// internal `_id` is dropped and timestamps are rendered as RFC 3339.
    pub fn into_record(self) -> Record {
        let mut record = self.fields;
        record.remove(INTERNAL_ID_FIELD);
        record.insert("id".to_string(), Value::String(self.id));
        record.insert("created_at".to_string(), Value::String(iso8601(&self.created_at)));
        record.insert("updated_at".to_string(), Value::String(iso8601(&self.updated_at)));
        record
    }
}

fn iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}
