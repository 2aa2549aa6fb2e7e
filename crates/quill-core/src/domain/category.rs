use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default display color for categories without an explicit one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6c757d";

/// Category entity - a named tag group referenced by posts.
///
/// The slug is derived from the name and regenerated on every rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: String, description: Option<String>, color: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description,
            color: color.unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rename the category, regenerating its slug.
    pub fn rename(&mut self, name: String) {
        self.slug = slugify(&name);
        self.name = name;
        self.updated_at = Utc::now();
    }
}

/// Derive a URL slug from a display name: lowercase, drop everything
/// outside `[a-z0-9 -]`, turn space runs into single hyphens, collapse
/// hyphen runs.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut separator_pending = false;

    for c in name.to_lowercase().chars() {
        match c {
            'a'..='z' | '0'..='9' => {
                if separator_pending {
                    slug.push('-');
                    separator_pending = false;
                }
                slug.push(c);
            }
            ' ' | '-' => separator_pending = true,
            _ => {}
        }
    }
    if separator_pending {
        slug.push('-');
    }

    slug
}
