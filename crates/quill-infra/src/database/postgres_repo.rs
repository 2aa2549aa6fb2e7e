//! PostgreSQL repository implementations, including the post listing
//! query builder.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, ExprTrait, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use quill_core::domain::{Category, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, CategoryRepository, PostRepository, UserRepository};
use quill_core::query::{Page, PostFilter};

use super::entity::category::{self, Entity as CategoryEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_category;
use super::entity::post_tag;
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_write_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<CategoryEntity>;

fn query_err(e: DbErr) -> RepoError {
    RepoError::Query(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        // Mask email for logging to avoid PII in logs
        let masked = if let Some(at_pos) = email.find('@') {
            let (local, domain) = email.split_at(at_pos);
            let masked_local = if local.len() > 1 {
                format!("{}***", &local[..1])
            } else {
                "***".to_string()
            };
            format!("{}{}", masked_local, domain)
        } else {
            "***".to_string()
        };
        tracing::debug!(user_email = %masked, "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = CategoryEntity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_all(&self) -> Result<Vec<Category>, RepoError> {
        let result = CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = CategoryEntity::find()
            .filter(category::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// PostgreSQL post repository. Posts span three tables (row, tags,
/// category links), so this one is hand-written rather than going through
/// `PostgresBaseRepository`.
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Batch-load tags and category links for a page of rows and compose
    /// the domain posts.
    async fn load_relations(&self, models: Vec<post::Model>) -> Result<Vec<Post>, RepoError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

        let tag_rows = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.is_in(ids.iter().copied()))
            .order_by_asc(post_tag::Column::PostId)
            .order_by_asc(post_tag::Column::Position)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        let link_rows = post_category::Entity::find()
            .filter(post_category::Column::PostId.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        let mut tags_by_post: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in tag_rows {
            tags_by_post.entry(row.post_id).or_default().push(row.tag);
        }

        let mut categories_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in link_rows {
            categories_by_post
                .entry(row.post_id)
                .or_default()
                .push(row.category_id);
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let tags = tags_by_post.remove(&m.id).unwrap_or_default();
                let categories = categories_by_post.remove(&m.id).unwrap_or_default();
                m.into_post(tags, categories)
            })
            .collect())
    }
}

/// Escape LIKE wildcards in user-supplied search text.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Build the listing select: conjunctive status/category/tag/search
/// filters, newest first with the id as a deterministic tie-break.
pub(crate) fn list_select(filter: &PostFilter) -> Select<PostEntity> {
    let mut cond = Condition::all();

    if let Some(status) = filter.status {
        cond = cond.add(post::Column::Status.eq(status.as_str()));
    }

    if let Some(category_id) = filter.category {
        let linked = Query::select()
            .column(post_category::Column::PostId)
            .from(post_category::Entity)
            .and_where(post_category::Column::CategoryId.eq(category_id))
            .to_owned();
        cond = cond.add(post::Column::Id.in_subquery(linked));
    }

    if let Some(tag) = &filter.tag {
        let tagged = Query::select()
            .column(post_tag::Column::PostId)
            .from(post_tag::Entity)
            .and_where(post_tag::Column::Tag.eq(tag.as_str()))
            .to_owned();
        cond = cond.add(post::Column::Id.in_subquery(tagged));
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        cond = cond.add(
            Condition::any()
                .add(Expr::col((PostEntity, post::Column::Title)).ilike(pattern.clone()))
                .add(Expr::col((PostEntity, post::Column::Content)).ilike(pattern.clone()))
                .add(Expr::col((PostEntity, post::Column::Excerpt)).ilike(pattern)),
        );
    }

    PostEntity::find()
        .filter(cond)
        .order_by_desc(post::Column::CreatedAt)
        .order_by_asc(post::Column::Id)
}

fn tag_rows(post_entry: &Post) -> Vec<post_tag::ActiveModel> {
    post_entry
        .tags
        .iter()
        .enumerate()
        .map(|(position, tag)| post_tag::ActiveModel {
            post_id: Set(post_entry.id),
            position: Set(position as i32),
            tag: Set(tag.clone()),
        })
        .collect()
}

fn link_rows(post_entry: &Post) -> Vec<post_category::ActiveModel> {
    post_entry
        .categories
        .iter()
        .map(|category_id| post_category::ActiveModel {
            post_id: Set(post_entry.id),
            category_id: Set(*category_id),
        })
        .collect()
}

#[async_trait]
impl BaseRepository<Post, Uuid> for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_err)?
        else {
            return Ok(None);
        };

        let mut posts = self.load_relations(vec![model]).await?;
        Ok(posts.pop())
    }

    async fn insert(&self, entity: Post) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(query_err)?;

        post::ActiveModel::from(&entity)
            .insert(&txn)
            .await
            .map_err(map_write_err)?;

        if !entity.tags.is_empty() {
            post_tag::Entity::insert_many(tag_rows(&entity))
                .exec(&txn)
                .await
                .map_err(map_write_err)?;
        }
        if !entity.categories.is_empty() {
            post_category::Entity::insert_many(link_rows(&entity))
                .exec(&txn)
                .await
                .map_err(map_write_err)?;
        }

        txn.commit().await.map_err(query_err)?;
        Ok(entity)
    }

    async fn update(&self, entity: Post) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(query_err)?;

        post::ActiveModel::from(&entity)
            .update(&txn)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => RepoError::NotFound,
                other => map_write_err(other),
            })?;

        // Tag and category links are replaced wholesale.
        post_tag::Entity::delete_many()
            .filter(post_tag::Column::PostId.eq(entity.id))
            .exec(&txn)
            .await
            .map_err(query_err)?;
        if !entity.tags.is_empty() {
            post_tag::Entity::insert_many(tag_rows(&entity))
                .exec(&txn)
                .await
                .map_err(map_write_err)?;
        }

        post_category::Entity::delete_many()
            .filter(post_category::Column::PostId.eq(entity.id))
            .exec(&txn)
            .await
            .map_err(query_err)?;
        if !entity.categories.is_empty() {
            post_category::Entity::insert_many(link_rows(&entity))
                .exec(&txn)
                .await
                .map_err(map_write_err)?;
        }

        txn.commit().await.map_err(query_err)?;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        // Tag and link rows go with the post via ON DELETE CASCADE.
        let result = PostEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_page(&self, filter: &PostFilter) -> Result<Page<Post>, RepoError> {
        let paginator = list_select(filter).paginate(&self.db, filter.limit);

        let total = paginator.num_items().await.map_err(query_err)?;
        let models = paginator
            .fetch_page(filter.page.saturating_sub(1))
            .await
            .map_err(query_err)?;

        let posts = self.load_relations(models).await?;
        Ok(Page::new(posts, filter.page, filter.limit, total))
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError> {
        let result = PostEntity::update_many()
            .col_expr(
                post::Column::Views,
                Expr::col(post::Column::Views).add(1i64),
            )
            .filter(post::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
