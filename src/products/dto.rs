use serde::Deserialize;

use super::store::Page;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub price: f64,
    pub description: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub stock: i32,
    pub sizes: Vec<String>,
    pub gender: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub stock: Option<i32>,
    pub sizes: Option<Vec<String>>,
    pub gender: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

/// `?limit=&offset=` on listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    /// Resolve to a [`Page`]; `limit` must be at least 1.
    pub fn into_page(self) -> Result<Page, String> {
        let defaults = Page::default();
        let limit = self.limit.unwrap_or(defaults.limit);
        if limit == 0 {
            return Err("limit must not be less than 1".to_string());
        }

        Ok(Page {
            limit,
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}
