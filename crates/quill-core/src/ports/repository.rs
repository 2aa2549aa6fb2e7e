use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Category, Post, User};
use crate::error::RepoError;
use crate::query::{Page, PostFilter};

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Update an existing entity. Fails with `NotFound` if it is absent.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by their username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Batch lookup used to resolve post authors for a page of results.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Category repository.
#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, Uuid> {
    /// Resolve a category slug. Listing treats an unknown slug as a filter
    /// that matches nothing, so `None` here is not an error.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;

    /// All categories, ordered by name.
    async fn find_all(&self) -> Result<Vec<Category>, RepoError>;

    /// Batch lookup used to resolve post categories for a page of results.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, RepoError>;
}

/// Post repository: CRUD plus the listing query and the view counter.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Run the listing query: conjunctive status/category/tag/search
    /// filters, newest-first ordering, and skip/limit pagination. A page
    /// past the end yields an empty item list with the correct totals.
    async fn find_page(&self, filter: &PostFilter) -> Result<Page<Post>, RepoError>;

    /// Atomically add 1 to the post's view counter.
    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError>;
}
