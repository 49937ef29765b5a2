use super::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub const ROOT_MESSAGE: &str = "Travel Agency Backend is running";

/// Collections reported by `/test`
const MAX_LISTED_COLLECTIONS: usize = 10;
/// Error text kept in diagnostic fields
const MAX_ERROR_CHARS: usize = 50;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": ROOT_MESSAGE }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    pub backend: String,
    pub database: String,
    pub database_url: String,
    pub database_name: String,
    pub connection_status: String,
    pub collections: Vec<String>,
}

/// Report backend and document store reachability. Never fails: problems
/// are described in the response fields.
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let mut response = DiagnosticsResponse {
        backend: "✅ Running".to_string(),
        database: "❌ Not Available".to_string(),
        database_url: String::new(),
        database_name: String::new(),
        connection_status: "Not Connected".to_string(),
        collections: Vec::new(),
    };

    match &state.store {
        Some(store) => {
            response.database = "✅ Available".to_string();
            response.connection_status = "Connected".to_string();

            match store.list_collections().await {
                Ok(mut collections) => {
                    collections.truncate(MAX_LISTED_COLLECTIONS);
                    response.collections = collections;
                    response.database = "✅ Connected & Working".to_string();
                }
                Err(e) => {
                    warn!("Diagnostics could not list {} collections: {}", store.backend(), e);
                    response.database =
                        format!("⚠️  Connected but Error: {}", truncate(&e.to_string()));
                }
            }
        }
        None => {
            response.database = "⚠️  Available but not initialized".to_string();
        }
    }

    response.database_url = presence(state.database_url_set);
    response.database_name = presence(state.database_name_set);

    Json(response)
}

fn presence(set: bool) -> String {
    let label = if set { "✅ Set" } else { "❌ Not Set" };
    label.to_string()
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_ERROR_CHARS).collect()
}
