use crate::schema::{CollectionMap, DocumentKind};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Which backend holds the documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown DOCUMENT_STORE '{}' (expected 'postgres' or 'memory')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_name: Option<String>,
    pub store_backend: StoreBackend,
    pub max_connections: usize,
    pub log_dir: Option<PathBuf>,
    pub collections: CollectionMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            database_name: None,
            store_backend: StoreBackend::Postgres,
            max_connections: 10,
            log_dir: None,
            collections: CollectionMap::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let database_url = non_empty_var("DATABASE_URL");
        let database_name = non_empty_var("DATABASE_NAME");

        let store_backend = match non_empty_var("DOCUMENT_STORE") {
            Some(value) => value.parse()?,
            None => defaults.store_backend,
        };

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);

        let log_dir = non_empty_var("LOG_DIR").map(PathBuf::from);

        let mut collections = defaults.collections;
        for (kind, var) in [
            (DocumentKind::Offer, "OFFER_COLLECTION"),
            (DocumentKind::Post, "POST_COLLECTION"),
            (DocumentKind::Review, "REVIEW_COLLECTION"),
        ] {
            if let Some(name) = non_empty_var(var) {
                collections = collections.with(kind, name);
            }
        }

        Ok(Config {
            host,
            port,
            database_url,
            database_name,
            store_backend,
            max_connections,
            log_dir,
            collections,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
