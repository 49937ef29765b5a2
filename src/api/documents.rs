//! Document endpoints
//!
//! - POST /api/{offers,posts,reviews} - validate and store a document
//! - GET  /api/{offers,posts,reviews} - list stored documents

use super::AppState;
use crate::error::{AppError, Result};
use crate::schema::{validate_record, DocumentKind, Offer, Post, Review, Schema};
use crate::store::{Filter, Record};
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OfferListParams {
    pub limit: Option<u32>,
    /// Only offers whose `is_featured` equals this
    #[serde(default, deserialize_with = "query_flag")]
    pub featured: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

type Body<T> = WithRejection<Json<T>, AppError>;
type Params<T> = WithRejection<Query<T>, AppError>;

pub async fn create_offer(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(offer), _): Body<Offer>,
) -> Result<Json<CreatedResponse>> {
    create(&state, offer).await
}

pub async fn list_offers(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): Params<OfferListParams>,
) -> Result<Json<Vec<Record>>> {
    let mut filter = Filter::new();
    if let Some(featured) = params.featured {
        filter = filter.eq("is_featured", featured);
    }

    list(&state, DocumentKind::Offer, filter, params.limit).await
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(post), _): Body<Post>,
) -> Result<Json<CreatedResponse>> {
    create(&state, post).await
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): Params<ListParams>,
) -> Result<Json<Vec<Record>>> {
    list(&state, DocumentKind::Post, Filter::new(), params.limit).await
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(review), _): Body<Review>,
) -> Result<Json<CreatedResponse>> {
    create(&state, review).await
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): Params<ListParams>,
) -> Result<Json<Vec<Record>>> {
    list(&state, DocumentKind::Review, Filter::new(), params.limit).await
}

async fn create<T: Schema>(state: &AppState, document: T) -> Result<Json<CreatedResponse>> {
    // Reject bad input before the store is touched
    let record = validate_record(&document)?;

    let store = state.store()?;
    let collection = state.collections.collection(T::KIND);
    let id = store.insert(collection, record).await?;

    info!("Created {} {} in {} ({})", T::KIND, id, collection, store.backend());

    Ok(Json(CreatedResponse { id }))
}

async fn list(
    state: &AppState,
    kind: DocumentKind,
    filter: Filter,
    limit: Option<u32>,
) -> Result<Json<Vec<Record>>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT) as usize;

    let store = state.store()?;
    let collection = state.collections.collection(kind);
    let records = store.query(collection, &filter, limit).await?;

    debug!(
        "Listed {} {} records from {} (filter fields: {}, limit: {})",
        records.len(),
        kind,
        collection,
        filter.len(),
        limit
    );

    Ok(Json(records))
}

/// Query-string boolean accepting the spellings browsers and form helpers
/// send (`1`, `yes`, `on`, `True`, ...), case-insensitive.
fn query_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    parse_flag(&raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid boolean value `{}`", raw)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
