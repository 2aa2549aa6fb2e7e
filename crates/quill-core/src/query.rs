//! Listing query value objects and the paginated result type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PostStatus;

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Upper bound on the page size a client may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// One post-listing request as it arrives from a client: page, limit, and
/// the optional category slug / tag / search filters. Ephemeral, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub page: u64,
    pub limit: u64,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            category: None,
            tag: None,
            search: None,
        }
    }
}

impl PostQuery {
    /// Normalize raw request parameters: missing or zero page/limit fall
    /// back to defaults, limit is capped, empty filter strings count as
    /// absent.
    pub fn new(
        page: Option<u64>,
        limit: Option<u64>,
        category: Option<String>,
        tag: Option<String>,
        search: Option<String>,
    ) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            category: category.filter(|s| !s.is_empty()),
            tag: tag.filter(|s| !s.is_empty()),
            search: search.filter(|s| !s.is_empty()),
        }
    }

    /// Number of items to skip for this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Listing parameters after the category slug has been resolved to an id.
/// This is what repositories consume; all present filters are conjunctive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub page: u64,
    pub limit: u64,
    pub status: Option<PostStatus>,
    pub category: Option<Uuid>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl PostFilter {
    /// The anonymous-reader view: published posts only, filters carried
    /// over from the query with `category_id` already resolved.
    pub fn published(query: &PostQuery, category_id: Option<Uuid>) -> Self {
        Self {
            page: query.page,
            limit: query.limit,
            status: Some(PostStatus::Published),
            category: category_id,
            tag: query.tag.clone(),
            search: query.search.clone(),
        }
    }
}

/// One page of results plus the metadata the response envelope carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    /// Build a page, deriving `pages = ceil(total / limit)`.
    pub fn new(items: Vec<T>, page: u64, limit: u64, total: u64) -> Self {
        Self {
            items,
            page,
            pages: total.div_ceil(limit),
            total,
        }
    }

    /// An empty page for a filter that cannot match anything.
    pub fn empty(page: u64) -> Self {
        Self {
            items: Vec::new(),
            page,
            pages: 0,
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            pages: self.pages,
            total: self.total,
        }
    }
}
