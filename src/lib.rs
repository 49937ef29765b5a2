//! Travel Agency Backend
//!
//! REST service storing offers, posts and reviews as JSON documents. The
//! schema registry validates input, the store adapter persists records and
//! normalizes them for transport, and the api module wires both to axum.

pub mod api;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;
