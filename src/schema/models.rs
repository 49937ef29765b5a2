//! Document schemas for offers, posts and reviews.

use super::{DocumentKind, Schema};
use serde::{de, Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Travel offer shown in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Offer {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    /// Price in USD
    #[validate(range(min = 0.0, message = "must be greater than or equal to 0"))]
    pub price: f64,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub destination: String,
    #[validate(url(message = "must be a valid URL"), custom(function = "http_scheme"))]
    pub image_url: Option<String>,
    /// Highlight this offer on the homepage
    #[serde(default)]
    pub is_featured: bool,
}

impl Schema for Offer {
    const KIND: DocumentKind = DocumentKind::Offer;
}

/// Agency post or announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Post {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub content: String,
    #[validate(url(message = "must be a valid URL"), custom(function = "http_scheme"))]
    pub image_url: Option<String>,
}

impl Schema for Post {
    const KIND: DocumentKind = DocumentKind::Post;
}

/// Customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Review {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    /// Star rating
    #[serde(deserialize_with = "whole_number")]
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i64,
    pub comment: Option<String>,
    /// Trip the review refers to
    pub trip: Option<String>,
}

impl Schema for Review {
    const KIND: DocumentKind = DocumentKind::Review;
}

/// Integer field that also takes integral floats such as `4.0`.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;

    if let Some(n) = number.as_i64() {
        return Ok(n);
    }

    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(de::Error::custom(format!("expected a whole number, got {}", number))),
    }
}

/// Image links are served to browsers, so only web schemes are accepted.
fn http_scheme(value: &str) -> Result<(), ValidationError> {
    let scheme = value.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());

    match scheme.as_deref() {
        Some("http") | Some("https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("http_scheme");
            err.message = Some("URL scheme must be http or https".into());
            Err(err)
        }
    }
}
