mod documents;
mod health;

pub use documents::{
    create_offer, create_post, create_review, list_offers, list_posts, list_reviews,
    CreatedResponse, ListParams, OfferListParams, DEFAULT_LIMIT,
};
pub use health::{diagnostics, root, DiagnosticsResponse, ROOT_MESSAGE};

use crate::schema::CollectionMap;
use crate::store::{DocumentStore, StorageError};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// `None` when no document store is configured
    pub store: Option<Arc<dyn DocumentStore>>,
    pub collections: CollectionMap,
    pub database_url_set: bool,
    pub database_name_set: bool,
}

impl AppState {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, collections: CollectionMap) -> Self {
        Self {
            store,
            collections,
            database_url_set: false,
            database_name_set: false,
        }
    }

    /// Record which connection settings were provided, for `/test`
    pub fn with_database_settings(mut self, url_set: bool, name_set: bool) -> Self {
        self.database_url_set = url_set;
        self.database_name_set = name_set;
        self
    }

    pub fn store(&self) -> Result<&dyn DocumentStore, StorageError> {
        self.store.as_deref().ok_or(StorageError::NotConfigured)
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/test", get(diagnostics))
        .route("/api/offers", get(list_offers).post(create_offer))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/reviews", get(list_reviews).post(create_review))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
