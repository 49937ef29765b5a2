//! Router-level tests against the in-memory document store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;
use travel_agency_backend::api::{self, AppState, ROOT_MESSAGE};
use travel_agency_backend::schema::{CollectionMap, DocumentKind};
use travel_agency_backend::store::{DocumentStore, MemoryStore};

fn app_with(store: Arc<MemoryStore>, collections: CollectionMap) -> Router {
    let store: Arc<dyn DocumentStore> = store;
    api::router(AppState::new(Some(store), collections))
}

fn app(store: Arc<MemoryStore>) -> Router {
    app_with(store, CollectionMap::default())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn offer(title: &str, featured: bool) -> Value {
    json!({
        "title": title,
        "description": "Five days, four nights",
        "price": 899.5,
        "destination": "Bali, Indonesia",
        "image_url": "https://images.example.com/bali.jpg",
        "is_featured": featured
    })
}

#[tokio::test]
async fn root_reports_running() {
    let app = app(Arc::new(MemoryStore::new()));
    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": ROOT_MESSAGE }));
}

#[tokio::test]
async fn created_offer_round_trips() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());
    let input = offer("Bali Getaway 5D4N", true);

    let (status, created) = send(&app, post_json("/api/offers", input.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().expect("id is a string").to_string();

    let (status, listed) = send(&app, get("/api/offers")).await;
    assert_eq!(status, StatusCode::OK);

    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    let record = listed[0].as_object().unwrap();

    assert_eq!(record["id"], id.as_str());
    assert!(!record.contains_key("_id"));
    assert!(record["created_at"].is_string());
    assert!(record["updated_at"].is_string());
    for (field, value) in input.as_object().unwrap() {
        assert_eq!(&record[field], value, "field {} changed", field);
    }
}

#[tokio::test]
async fn offer_defaults_are_stored() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    let minimal = json!({"title": "Rome", "price": 0, "destination": "Italy"});
    let (status, _) = send(&app, post_json("/api/offers", minimal)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send(&app, get("/api/offers")).await;
    let record = &listed[0];
    assert_eq!(record["is_featured"], false);
    assert!(record["description"].is_null());
    assert!(record["image_url"].is_null());
    assert_eq!(record["price"], 0.0);
}

#[tokio::test]
async fn negative_price_rejected_before_store() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    let mut input = offer("Bargain", false);
    input["price"] = json!(-1);

    let (status, body) = send(&app, post_json("/api/offers", input)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_failed");
    assert!(body["fields"]["price"].is_array());
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn rating_out_of_range_rejected_before_store() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    for rating in [0, 6, -3] {
        let review = json!({"name": "Marta", "rating": rating});
        let (status, body) = send(&app, post_json("/api/reviews", review)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "rating {}", rating);
        assert!(body["fields"]["rating"].is_array());
    }

    assert_eq!(store.operations(), 0);

    let review = json!({"name": "Marta", "rating": 5, "trip": "Cusco trek"});
    let (status, _) = send(&app, post_json("/api/reviews", review)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.count("review"), 1);
}

#[tokio::test]
async fn whole_number_float_rating_is_accepted() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    let review = json!({"name": "Ana", "rating": 4.0});
    let (status, _) = send(&app, post_json("/api/reviews", review)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/reviews")).await;
    assert_eq!(body[0]["rating"], 4);

    let review = json!({"name": "Ana", "rating": 4.5});
    let (status, body) = send(&app, post_json("/api/reviews", review)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(store.count("review"), 1);
}

#[tokio::test]
async fn malformed_image_url_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    let mut bad_offer = offer("Oslo", false);
    bad_offer["image_url"] = json!("not a url");
    let (status, body) = send(&app, post_json("/api/offers", bad_offer)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["image_url"].is_array());

    let bad_post = json!({
        "title": "News",
        "content": "We moved offices",
        "image_url": "ftp://files.example.com/office.png"
    });
    let (status, _) = send(&app, post_json("/api/posts", bad_post)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_failed");

    // Missing required field
    let (status, _) = send(&app, post_json("/api/posts", json!({"title": "Only a title"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Wrong primitive type
    let (status, _) = send(
        &app,
        post_json("/api/reviews", json!({"name": "Ana", "rating": "five"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Empty required text
    let (status, _) = send(&app, post_json("/api/posts", json!({"title": "", "content": "x"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn featured_filter_returns_only_featured_offers() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    for (title, featured) in [("Rome", true), ("Oslo", false), ("Cusco", true)] {
        let (status, _) = send(&app, post_json("/api/offers", offer(title, featured))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, featured) = send(&app, get("/api/offers?featured=true")).await;
    assert_eq!(status, StatusCode::OK);
    let featured = featured.as_array().unwrap();
    assert_eq!(featured.len(), 2);
    assert!(featured.iter().all(|o| o["is_featured"] == true));

    let (_, regular) = send(&app, get("/api/offers?featured=false")).await;
    let regular = regular.as_array().unwrap();
    assert_eq!(regular.len(), 1);
    assert_eq!(regular[0]["title"], "Oslo");

    let (_, all) = send(&app, get("/api/offers")).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    for spelling in ["1", "True", "yes", "on", "TRUE"] {
        let (status, found) = send(&app, get(&format!("/api/offers?featured={}", spelling))).await;
        assert_eq!(status, StatusCode::OK, "featured={}", spelling);
        assert_eq!(found.as_array().unwrap().len(), 2, "featured={}", spelling);
    }

    for spelling in ["0", "False", "no", "off"] {
        let (status, found) = send(&app, get(&format!("/api/offers?featured={}", spelling))).await;
        assert_eq!(status, StatusCode::OK, "featured={}", spelling);
        let found = found.as_array().unwrap();
        assert_eq!(found.len(), 1, "featured={}", spelling);
        assert_eq!(found[0]["title"], "Oslo");
    }
}

#[tokio::test]
async fn limit_bounds_result_count() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    for n in 1..=3 {
        let post = json!({"title": format!("Post {}", n), "content": "Body"});
        let (status, _) = send(&app, post_json("/api/posts", post)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, one) = send(&app, get("/api/posts?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one.as_array().unwrap().len(), 1);

    let (_, all) = send(&app, get("/api/posts")).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|p| p["id"].is_string()));
}

#[tokio::test]
async fn invalid_limit_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    for uri in [
        "/api/reviews?limit=abc",
        "/api/reviews?limit=-1",
        "/api/offers?featured=maybe",
        "/api/offers?featured=2",
        "/api/offers?featured=",
    ] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body["error"], "validation_failed");
    }

    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn storage_failure_is_server_error() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let app = app(store);

    let post = json!({"title": "Hello", "content": "World"});
    let (status, body) = send(&app, post_json("/api/posts", post)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "storage_error");
    assert!(body["cause"].as_str().unwrap().contains("unavailable"));

    let (status, _) = send(&app, get("/api/posts")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn missing_store_is_server_error() {
    let app = api::router(AppState::new(None, CollectionMap::default()));

    let review = json!({"name": "Ana", "rating": 4});
    let (status, body) = send(&app, post_json("/api/reviews", review)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["cause"].as_str().unwrap().contains("not configured"));

    // Input problems are still reported as such
    let review = json!({"name": "Ana", "rating": 40});
    let (status, _) = send(&app, post_json("/api/reviews", review)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn collection_mapping_is_honoured() {
    let store = Arc::new(MemoryStore::new());
    let collections = CollectionMap::default().with(DocumentKind::Review, "customer_reviews");
    let app = app_with(store.clone(), collections);

    let review = json!({"name": "Ana", "rating": 4});
    let (status, _) = send(&app, post_json("/api/reviews", review)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(store.count("customer_reviews"), 1);
    assert_eq!(store.count("review"), 0);

    let (_, listed) = send(&app, get("/api/reviews")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_inserts_get_distinct_ids() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    let mut handles = Vec::new();
    for n in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let post = json!({"title": format!("Post {}", n), "content": "Body"});
            let (status, body) = send(&app, post_json("/api/posts", post)).await;
            assert_eq!(status, StatusCode::OK);
            body["id"].as_str().unwrap().to_string()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }

    assert_eq!(ids.len(), 20);
    assert_eq!(store.count("post"), 20);
}

#[tokio::test]
async fn diagnostics_with_working_store() {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn DocumentStore> = store;
    let app = api::router(
        AppState::new(Some(dyn_store), CollectionMap::default()).with_database_settings(true, false),
    );

    send(&app, post_json("/api/offers", offer("Rome", false))).await;

    let (status, body) = send(&app, get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "✅ Running");
    assert_eq!(body["database"], "✅ Connected & Working");
    assert_eq!(body["connection_status"], "Connected");
    assert_eq!(body["database_url"], "✅ Set");
    assert_eq!(body["database_name"], "❌ Not Set");
    assert_eq!(body["collections"], json!(["offer"]));
}

#[tokio::test]
async fn diagnostics_never_fail() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let app = app(store);

    let (status, body) = send(&app, get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    let database = body["database"].as_str().unwrap();
    assert!(database.starts_with("⚠️  Connected but Error: "));
    assert!(database.chars().count() <= "⚠️  Connected but Error: ".chars().count() + 50);

    let app = api::router(AppState::new(None, CollectionMap::default()));
    let (status, body) = send(&app, get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "⚠️  Available but not initialized");
    assert_eq!(body["connection_status"], "Not Connected");
    assert_eq!(body["database_url"], "❌ Not Set");
    assert_eq!(body["collections"], json!([]));
}
