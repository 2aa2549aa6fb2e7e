use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication state of a post. Transitions are free in both directions;
/// only listing visibility depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    /// Parse a stored status value. Unknown values fall back to `Draft`.
    pub fn parse(value: &str) -> Self {
        match value {
            "published" => PostStatus::Published,
            _ => PostStatus::Draft,
        }
    }
}

/// Post entity - one article.
///
/// `author` is stamped at creation time and never changes afterwards.
/// `views` only ever increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: Uuid,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub status: PostStatus,
    pub tags: Vec<String>,
    pub categories: Vec<Uuid>,
    pub featured_image: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The full field set of a post as submitted on creation.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub status: PostStatus,
    pub tags: Vec<String>,
    pub categories: Vec<Uuid>,
    pub featured_image: Option<String>,
}

/// A partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
    pub categories: Option<Vec<Uuid>>,
    pub featured_image: Option<String>,
}

/// Categories are a set; drop repeats while keeping first-seen order.
fn dedupe_categories(categories: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    categories
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect()
}

impl Post {
    /// Create a new post authored by `author`.
    pub fn new(author: Uuid, draft: PostDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            status: draft.status,
            tags: draft.tags,
            categories: dedupe_categories(draft.categories),
            featured_image: draft.featured_image,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into the post. Validation runs on the merged
    /// result, so callers apply the patch to a copy first.
    pub fn apply(&mut self, patch: PostPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(excerpt) = patch.excerpt {
            self.excerpt = Some(excerpt);
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(categories) = patch.categories {
            self.categories = dedupe_categories(categories);
        }
        if let Some(featured_image) = patch.featured_image {
            self.featured_image = Some(featured_image);
        }
        self.updated_at = Utc::now();
    }
}
