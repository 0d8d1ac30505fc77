use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Genders a product can be listed under.
pub const GENDERS: [&str; 4] = ["men", "women", "kid", "unisex"];

/// A catalog entry with its image URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub description: Option<String>,
    pub slug: String,
    pub stock: i32,
    pub sizes: Vec<String>,
    pub gender: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    /// Last user to create or update the product
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Lower-case, spaces to dashes, apostrophes dropped.
///
/// Idempotent: `slugify(slugify(s)) == slugify(s)`.
pub fn slugify(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace(' ', "-")
        .replace('\'', "")
}
