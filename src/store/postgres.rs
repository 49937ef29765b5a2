//! PostgreSQL-backed document store.
//!
//! Each collection is a table in the `documents` schema holding one JSONB
//! document per row. The database assigns the identifier and both
//! timestamps; equality filters are answered with JSONB containment.

use super::{check_collection, DocumentStore, Filter, Record, Result, StorageError, StoredDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use deadpool_postgres::{Config as PoolConfig, Object, Pool, Runtime};
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

/// Schema holding one table per collection
pub const DOCUMENT_SCHEMA: &str = "documents";

pub struct PgDocumentStore {
    pool: Pool,
    /// Collections whose table is known to exist
    ensured: DashSet<String>,
}

impl PgDocumentStore {
    /// Build the shared connection pool. Connections are opened lazily, so
    /// this succeeds even while the database is down.
    pub fn connect(database_url: &str, database_name: Option<&str>, max_size: usize) -> Result<Self> {
        let mut cfg = PoolConfig::new();
        cfg.url = Some(database_url.to_string());
        cfg.dbname = database_name.map(str::to_string);

        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(5)),
                create: Some(Duration::from_secs(5)),
                recycle: Some(Duration::from_secs(5)),
            },
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::Unavailable {
                cause: format!("Failed to create pool: {}", e),
            })?;

        Ok(Self {
            pool,
            ensured: DashSet::new(),
        })
    }

    /// Create the document schema and a table for every given collection
    pub async fn prepare<'a>(&self, collections: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let client = self.client().await?;

        for collection in collections {
            self.ensure_collection(&client, collection).await?;
        }

        info!("Document collections ready in schema {}", DOCUMENT_SCHEMA);
        Ok(())
    }

    async fn client(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| StorageError::Unavailable {
            cause: e.to_string(),
        })
    }

    async fn ensure_collection(&self, client: &Object, collection: &str) -> Result<()> {
        check_collection(collection)?;
        if self.ensured.contains(collection) {
            return Ok(());
        }

        client
            .batch_execute(&create_collection_sql(collection))
            .await
            .map_err(|e| StorageError::WriteRejected {
                collection: collection.to_string(),
                cause: format!("Failed to create collection: {}", e),
            })?;

        self.ensured.insert(collection.to_string());
        debug!("Ensured collection {}", collection);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, record: Record) -> Result<String> {
        check_collection(collection)?;
        let client = self.client().await?;
        self.ensure_collection(&client, collection).await?;

        let sql = format!(
            "INSERT INTO {} (doc) VALUES ($1) RETURNING id::text",
            qualified_table(collection)
        );
        let doc = Value::Object(record);

        let row = client
            .query_one(&sql, &[&doc])
            .await
            .map_err(|e| StorageError::WriteRejected {
                collection: collection.to_string(),
                cause: e.to_string(),
            })?;

        row.try_get::<_, String>(0)
            .map_err(|e| StorageError::WriteRejected {
                collection: collection.to_string(),
                cause: e.to_string(),
            })
    }

    async fn query(&self, collection: &str, filter: &Filter, limit: usize) -> Result<Vec<Record>> {
        check_collection(collection)?;
        let client = self.client().await?;
        self.ensure_collection(&client, collection).await?;

        let sql = format!(
            "SELECT id::text, doc, created_at, updated_at FROM {} WHERE doc @> $1 LIMIT $2",
            qualified_table(collection)
        );
        let containment = Value::Object(filter.as_record().clone());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = client
            .query(&sql, &[&containment, &limit])
            .await
            .map_err(|e| StorageError::ReadFailed {
                collection: collection.to_string(),
                cause: e.to_string(),
            })?;

        rows.iter()
            .map(|row| {
                row_to_document(row)
                    .map(StoredDocument::into_record)
                    .map_err(|e| StorageError::ReadFailed {
                        collection: collection.to_string(),
                        cause: e.to_string(),
                    })
            })
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| StorageError::Unavailable {
                cause: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT table_name::text FROM information_schema.tables WHERE table_schema::text = $1 ORDER BY table_name",
                &[&DOCUMENT_SCHEMA],
            )
            .await
            .map_err(|e| StorageError::ReadFailed {
                collection: "information_schema.tables".to_string(),
                cause: e.to_string(),
            })?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn row_to_document(row: &Row) -> std::result::Result<StoredDocument, tokio_postgres::Error> {
    let id: String = row.try_get(0)?;
    let doc: Value = row.try_get(1)?;
    let created_at: DateTime<Utc> = row.try_get(2)?;
    let updated_at: DateTime<Utc> = row.try_get(3)?;

    let fields = match doc {
        Value::Object(map) => map,
        other => {
            // Only objects are ever inserted; keep foreign rows readable anyway
            let mut map = Record::new();
            map.insert("value".to_string(), other);
            map
        }
    };

    Ok(StoredDocument {
        id,
        fields,
        created_at,
        updated_at,
    })
}

/// Callers must have checked `collection` with `check_collection`
fn qualified_table(collection: &str) -> String {
    format!("\"{}\".\"{}\"", DOCUMENT_SCHEMA, collection)
}

fn create_collection_sql(collection: &str) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS \"{schema}\";
         CREATE TABLE IF NOT EXISTS {table} (
             id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
             doc JSONB NOT NULL,
             created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
             updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
         );",
        schema = DOCUMENT_SCHEMA,
        table = qualified_table(collection),
    )
}
