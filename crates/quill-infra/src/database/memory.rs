//! In-memory repository implementations - used as fallback when no
//! database is configured, and as the test double for handler tests.
//!
//! They implement the same listing semantics as the Postgres repositories:
//! conjunctive filters, newest-first ordering with insertion order as the
//! tie-break, skip/limit pagination. Data is lost on process restart.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Category, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, CategoryRepository, PostRepository, UserRepository};
use quill_core::query::{Page, PostFilter};

/// In-memory user repository.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, entity: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.username == entity.username || u.email == entity.email)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        users.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        let slot = users
            .iter_mut()
            .find(|u| u.id == entity.id)
            .ok_or(RepoError::NotFound)?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }
}

/// In-memory category repository.
#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<Vec<Category>>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        let categories = self.categories.read().await;
        Ok(categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, entity: Category) -> Result<Category, RepoError> {
        let mut categories = self.categories.write().await;
        if categories
            .iter()
            .any(|c| c.name == entity.name || c.slug == entity.slug)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        categories.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: Category) -> Result<Category, RepoError> {
        let mut categories = self.categories.write().await;
        if categories
            .iter()
            .any(|c| c.id != entity.id && (c.name == entity.name || c.slug == entity.slug))
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        let slot = categories
            .iter_mut()
            .find(|c| c.id == entity.id)
            .ok_or(RepoError::NotFound)?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut categories = self.categories.write().await;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let categories = self.categories.read().await;
        Ok(categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Category>, RepoError> {
        let categories = self.categories.read().await;
        let mut all: Vec<Category> = categories.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, RepoError> {
        let categories = self.categories.read().await;
        Ok(categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

/// In-memory post repository. The backing Vec keeps insertion order, which
/// doubles as the ordering tie-break for equal timestamps.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(post: &Post, filter: &PostFilter) -> bool {
    if let Some(status) = filter.status {
        if post.status != status {
            return false;
        }
    }
    if let Some(category_id) = filter.category {
        if !post.categories.contains(&category_id) {
            return false;
        }
    }
    if let Some(tag) = &filter.tag {
        if !post.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let in_excerpt = post
            .excerpt
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains(&needle));
        if !post.title.to_lowercase().contains(&needle)
            && !post.content.to_lowercase().contains(&needle)
            && !in_excerpt
        {
            return false;
        }
    }
    true
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, entity: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        if posts.iter().any(|p| p.id == entity.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        posts.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let slot = posts
            .iter_mut()
            .find(|p| p.id == entity.id)
            .ok_or(RepoError::NotFound)?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_page(&self, filter: &PostFilter) -> Result<Page<Post>, RepoError> {
        let posts = self.posts.read().await;

        let mut matching: Vec<&Post> = posts.iter().filter(|p| matches(p, filter)).collect();
        // Stable sort: equal timestamps keep insertion order.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items: Vec<Post> = matching
            .into_iter()
            .skip((filter.page.saturating_sub(1) * filter.limit) as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, filter.page, filter.limit, total))
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        post.views += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use quill_core::domain::{PostDraft, PostStatus};
    use quill_core::query::PostQuery;

    fn published(title: &str, tags: &[&str], categories: &[Uuid]) -> Post {
        Post::new(
            Uuid::new_v4(),
            PostDraft {
                title: title.to_string(),
                content: format!("{title} body"),
                status: PostStatus::Published,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                categories: categories.to_vec(),
                ..Default::default()
            },
        )
    }

    async fn seed(repo: &InMemoryPostRepository, posts: Vec<Post>) {
        for post in posts {
            repo.insert(post).await.unwrap();
        }
    }

    fn filter(query: &PostQuery, category: Option<Uuid>) -> PostFilter {
        PostFilter::published(query, category)
    }

    #[tokio::test]
    async fn pagination_metadata_is_consistent() {
        let repo = InMemoryPostRepository::new();
        let mut posts = Vec::new();
        let base = Utc::now();
        for i in 0..25 {
            let mut post = published(&format!("Post {i}"), &["tech"], &[]);
            post.created_at = base + Duration::seconds(i);
            posts.push(post);
        }
        seed(&repo, posts).await;

        let query = PostQuery::new(Some(2), Some(10), None, None, None);
        let page = repo.find_page(&filter(&query, None)).await.unwrap();

        assert_eq!(page.total, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 10);
        // Newest first: page 2 holds posts 14..=5.
        assert_eq!(page.items[0].title, "Post 14");
        assert_eq!(page.items[9].title, "Post 5");
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_with_correct_totals() {
        let repo = InMemoryPostRepository::new();
        seed(&repo, vec![published("Only", &[], &[])]).await;

        let query = PostQuery::new(Some(5), Some(10), None, None, None);
        let page = repo.find_page(&filter(&query, None)).await.unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.pages, 1);
    }

    #[tokio::test]
    async fn filters_are_conjunctive() {
        let repo = InMemoryPostRepository::new();
        let category = Uuid::new_v4();
        let mut both = published("Rust and the web", &["rust"], &[category]);
        both.content = "async servers".to_string();
        seed(
            &repo,
            vec![
                both,
                published("Rust only", &["rust"], &[]),
                published("Category only", &[], &[category]),
            ],
        )
        .await;

        let query = PostQuery::new(
            None,
            None,
            None,
            Some("rust".to_string()),
            Some("WEB".to_string()),
        );
        let page = repo.find_page(&filter(&query, Some(category))).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Rust and the web");
    }

    #[tokio::test]
    async fn tag_filter_is_exact_and_case_sensitive() {
        let repo = InMemoryPostRepository::new();
        seed(
            &repo,
            vec![
                published("Lower", &["rust"], &[]),
                published("Upper", &["Rust"], &[]),
            ],
        )
        .await;

        let query = PostQuery::new(None, None, None, Some("rust".to_string()), None);
        let page = repo.find_page(&filter(&query, None)).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Lower");
    }

    #[tokio::test]
    async fn search_matches_title_content_or_excerpt() {
        let repo = InMemoryPostRepository::new();
        let mut by_excerpt = published("Plain title", &[], &[]);
        by_excerpt.excerpt = Some("An ACTIX walkthrough".to_string());
        seed(
            &repo,
            vec![by_excerpt, published("Unrelated", &[], &[])],
        )
        .await;

        let query = PostQuery::new(None, None, None, None, Some("actix".to_string()));
        let page = repo.find_page(&filter(&query, None)).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Plain title");
    }

    #[tokio::test]
    async fn drafts_are_invisible_to_listing() {
        let repo = InMemoryPostRepository::new();
        let mut draft = published("Hidden", &[], &[]);
        draft.status = PostStatus::Draft;
        seed(&repo, vec![draft, published("Visible", &[], &[])]).await;

        let query = PostQuery::default();
        let page = repo.find_page(&filter(&query, None)).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Visible");
    }

    #[tokio::test]
    async fn view_counter_increments_per_call() {
        let repo = InMemoryPostRepository::new();
        let post = published("Counted", &[], &[]);
        let id = post.id;
        seed(&repo, vec![post]).await;

        repo.increment_views(id).await.unwrap();
        repo.increment_views(id).await.unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.views, 2);
    }

    #[tokio::test]
    async fn increment_views_on_missing_post_is_not_found() {
        let repo = InMemoryPostRepository::new();
        let result = repo.increment_views(Uuid::new_v4()).await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }
}
