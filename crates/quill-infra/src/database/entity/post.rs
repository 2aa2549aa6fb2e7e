//! Post entity for SeaORM.
//!
//! Tags and category links live in side tables (`post_tags`,
//! `post_categories`), so the row alone does not make a domain `Post`;
//! repositories compose the three.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use quill_core::domain::{Post, PostStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub excerpt: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: String,
    pub featured_image: Option<String>,
    pub views: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::post_tag::Entity")]
    PostTag,
    #[sea_orm(has_many = "super::post_category::Entity")]
    PostCategory,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::post_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostTag.def()
    }
}

impl Related<super::post_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Compose a domain Post from the row plus its loaded relations.
    pub fn into_post(self, tags: Vec<String>, categories: Vec<Uuid>) -> Post {
        Post {
            id: self.id,
            author: self.author_id,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            status: PostStatus::parse(&self.status),
            tags,
            categories,
            featured_image: self.featured_image,
            views: self.views,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        }
    }
}

/// Scalar columns of a domain Post; tag and category rows are written
/// separately by the repository.
impl From<&Post> for ActiveModel {
    fn from(post: &Post) -> Self {
        Self {
            id: Set(post.id),
            author_id: Set(post.author),
            title: Set(post.title.clone()),
            excerpt: Set(post.excerpt.clone()),
            content: Set(post.content.clone()),
            status: Set(post.status.as_str().to_string()),
            featured_image: Set(post.featured_image.clone()),
            views: Set(post.views),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
        }
    }
}
