//! The post store: an in-memory projection of the server's post list,
//! mutated only through a closed set of reducer transitions.
//!
//! Mutations are server-first: the store talks to the API, and folds the
//! confirmed response into local state without refetching the list - the
//! server orders newest-first, so a created post is prepended. List
//! fetches are tagged with a monotonic request id; a response from a
//! superseded fetch is discarded instead of overwriting newer state.

use uuid::Uuid;

use quill_core::query::PostQuery;
use quill_shared::PageMeta;
use quill_shared::dto::{
    CategoryResponse, CreatePostRequest, PostResponse, UpdatePostRequest, UserResponse,
};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Snapshot of the post-list view state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub posts: Vec<PostResponse>,
    pub categories: Vec<CategoryResponse>,
    pub pagination: Option<PageMeta>,
    pub loading: bool,
    pub error: Option<String>,
    /// Id of the most recently issued list fetch; responses tagged with an
    /// older id are stale and ignored.
    latest_request: u64,
}

impl StoreState {
    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }
}

/// The closed set of state transitions.
#[derive(Debug, Clone)]
pub enum Action {
    /// A list fetch was issued.
    FetchStarted { request: u64 },
    /// A list fetch resolved; items and pagination are replaced wholesale.
    PostsLoaded {
        request: u64,
        posts: Vec<PostResponse>,
        pagination: PageMeta,
    },
    /// A list fetch failed; previously shown data stays on screen.
    FetchFailed { request: u64, message: String },
    /// The category list resolved.
    CategoriesLoaded { categories: Vec<CategoryResponse> },
    /// The server confirmed a create; prepend to match its ordering.
    PostCreated { post: PostResponse },
    /// The server confirmed an update; swap in place by id.
    PostUpdated { post: PostResponse },
    /// The server confirmed a delete; drop by id.
    PostDeleted { id: Uuid },
    /// A non-list operation failed.
    ErrorSet { message: String },
    /// The error banner was dismissed.
    ErrorCleared,
}

/// Apply one transition. Total: every action leaves the state valid.
pub fn reduce(state: &mut StoreState, action: Action) {
    match action {
        Action::FetchStarted { request } => {
            state.latest_request = request;
            state.loading = true;
        }
        Action::PostsLoaded {
            request,
            posts,
            pagination,
        } => {
            if request < state.latest_request {
                tracing::debug!(request, latest = state.latest_request, "discarding stale list response");
                return;
            }
            state.posts = posts;
            state.pagination = Some(pagination);
            state.loading = false;
        }
        Action::FetchFailed { request, message } => {
            if request < state.latest_request {
                return;
            }
            state.error = Some(message);
            state.loading = false;
        }
        Action::CategoriesLoaded { categories } => {
            state.categories = categories;
        }
        Action::PostCreated { post } => {
            state.posts.insert(0, post);
        }
        Action::PostUpdated { post } => {
            if let Some(slot) = state.posts.iter_mut().find(|p| p.id == post.id) {
                *slot = post;
            }
        }
        Action::PostDeleted { id } => {
            state.posts.retain(|p| p.id != id);
        }
        Action::ErrorSet { message } => {
            state.error = Some(message);
            state.loading = false;
        }
        Action::ErrorCleared => {
            state.error = None;
        }
    }
}

/// Owns the state and drives it through API calls. Errors are recorded in
/// state for the error banner and returned to the caller for inline
/// presentation - never swallowed.
pub struct PostStore {
    api: ApiClient,
    state: StoreState,
    fetch_seq: u64,
}

impl PostStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: StoreState::default(),
            fetch_seq: 0,
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    /// Fetch a page of posts and replace the list wholesale. On failure the
    /// previous items stay visible and only the error flag changes.
    pub async fn fetch_posts(
        &mut self,
        query: &PostQuery,
    ) -> Result<Vec<PostResponse>, ClientError> {
        self.fetch_seq += 1;
        let request = self.fetch_seq;
        reduce(&mut self.state, Action::FetchStarted { request });

        match self.api.list_posts(query).await {
            Ok((posts, pagination)) => {
                reduce(
                    &mut self.state,
                    Action::PostsLoaded {
                        request,
                        posts: posts.clone(),
                        pagination,
                    },
                );
                Ok(posts)
            }
            Err(error) => {
                reduce(
                    &mut self.state,
                    Action::FetchFailed {
                        request,
                        message: error.server_message("Failed to fetch posts"),
                    },
                );
                Err(error)
            }
        }
    }

    /// Fetch one post for a detail or edit view. Pass-through: the shared
    /// list is left alone, since this call bumps the view counter
    /// server-side and must not disturb the list cache.
    pub async fn fetch_post(&mut self, id: Uuid) -> Result<PostResponse, ClientError> {
        match self.api.get_post(id).await {
            Ok(post) => Ok(post),
            Err(error) => {
                let message = error.server_message("Failed to fetch post");
                reduce(&mut self.state, Action::ErrorSet { message });
                Err(error)
            }
        }
    }

    /// Create a post; on confirmation prepend it locally (no refetch).
    pub async fn create_post(
        &mut self,
        request: &CreatePostRequest,
    ) -> Result<PostResponse, ClientError> {
        match self.api.create_post(request).await {
            Ok(post) => {
                reduce(&mut self.state, Action::PostCreated { post: post.clone() });
                Ok(post)
            }
            Err(error) => {
                let message = error.server_message("Failed to create post");
                reduce(&mut self.state, Action::ErrorSet { message });
                Err(error)
            }
        }
    }

    /// Update a post; on confirmation replace it in place.
    pub async fn update_post(
        &mut self,
        id: Uuid,
        request: &UpdatePostRequest,
    ) -> Result<PostResponse, ClientError> {
        match self.api.update_post(id, request).await {
            Ok(post) => {
                reduce(&mut self.state, Action::PostUpdated { post: post.clone() });
                Ok(post)
            }
            Err(error) => {
                let message = error.server_message("Failed to update post");
                reduce(&mut self.state, Action::ErrorSet { message });
                Err(error)
            }
        }
    }

    /// Delete a post; on confirmation remove it locally.
    pub async fn delete_post(&mut self, id: Uuid) -> Result<(), ClientError> {
        match self.api.delete_post(id).await {
            Ok(()) => {
                reduce(&mut self.state, Action::PostDeleted { id });
                Ok(())
            }
            Err(error) => {
                let message = error.server_message("Failed to delete post");
                reduce(&mut self.state, Action::ErrorSet { message });
                Err(error)
            }
        }
    }

    /// Fetch all categories; refreshes the store copy and hands the list
    /// back to the caller.
    pub async fn fetch_categories(&mut self) -> Result<Vec<CategoryResponse>, ClientError> {
        match self.api.list_categories().await {
            Ok(categories) => {
                reduce(
                    &mut self.state,
                    Action::CategoriesLoaded {
                        categories: categories.clone(),
                    },
                );
                Ok(categories)
            }
            Err(error) => {
                let message = error.server_message("Failed to fetch categories");
                reduce(&mut self.state, Action::ErrorSet { message });
                Err(error)
            }
        }
    }

    /// The caller's profile. Pass-through, no shared state involved.
    pub async fn fetch_me(&mut self) -> Result<UserResponse, ClientError> {
        self.api.me().await
    }

    /// Dismiss the error banner.
    pub fn clear_error(&mut self) {
        reduce(&mut self.state, Action::ErrorCleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quill_core::domain::PostStatus;
    use quill_shared::dto::AuthorRef;

    fn sample_post(title: &str) -> PostResponse {
        let now = Utc::now();
        PostResponse {
            id: Uuid::new_v4(),
            title: title.to_string(),
            excerpt: None,
            content: "body".to_string(),
            status: PostStatus::Published,
            tags: Vec::new(),
            categories: Vec::new(),
            author: AuthorRef {
                id: Uuid::new_v4(),
                username: "writer".to_string(),
                avatar: None,
                bio: None,
            },
            featured_image: None,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn meta(page: u64, pages: u64, total: u64) -> PageMeta {
        PageMeta { page, pages, total }
    }

    fn loaded_state(titles: &[&str]) -> StoreState {
        let mut state = StoreState::default();
        reduce(&mut state, Action::FetchStarted { request: 1 });
        reduce(
            &mut state,
            Action::PostsLoaded {
                request: 1,
                posts: titles.iter().map(|t| sample_post(t)).collect(),
                pagination: meta(1, 1, titles.len() as u64),
            },
        );
        state
    }

    #[test]
    fn fetch_replaces_items_wholesale() {
        let mut state = loaded_state(&["old"]);

        reduce(&mut state, Action::FetchStarted { request: 2 });
        assert!(state.loading);

        reduce(
            &mut state,
            Action::PostsLoaded {
                request: 2,
                posts: vec![sample_post("new a"), sample_post("new b")],
                pagination: meta(1, 1, 2),
            },
        );

        assert!(!state.loading);
        assert_eq!(state.posts.len(), 2);
        assert_eq!(state.posts[0].title, "new a");
        assert_eq!(state.pagination, Some(meta(1, 1, 2)));
    }

    #[test]
    fn create_prepends_without_disturbing_order() {
        let mut state = loaded_state(&["first", "second"]);
        let existing: Vec<Uuid> = state.posts.iter().map(|p| p.id).collect();

        let created = sample_post("brand new");
        reduce(
            &mut state,
            Action::PostCreated {
                post: created.clone(),
            },
        );

        assert_eq!(state.posts[0].id, created.id);
        let tail: Vec<Uuid> = state.posts[1..].iter().map(|p| p.id).collect();
        assert_eq!(tail, existing);
    }

    #[test]
    fn failure_preserves_items_and_pagination() {
        let state_before = loaded_state(&["kept"]);
        let mut state = state_before.clone();

        reduce(&mut state, Action::FetchStarted { request: 2 });
        reduce(
            &mut state,
            Action::FetchFailed {
                request: 2,
                message: "server exploded".to_string(),
            },
        );

        assert_eq!(state.posts, state_before.posts);
        assert_eq!(state.pagination, state_before.pagination);
        assert_eq!(state.error.as_deref(), Some("server exploded"));
        assert!(!state.loading);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut state = StoreState::default();
        reduce(&mut state, Action::FetchStarted { request: 1 });
        reduce(&mut state, Action::FetchStarted { request: 2 });

        // The first fetch resolves late - after a newer one was issued.
        reduce(
            &mut state,
            Action::PostsLoaded {
                request: 1,
                posts: vec![sample_post("stale")],
                pagination: meta(1, 1, 1),
            },
        );
        assert!(state.posts.is_empty());
        assert!(state.loading);

        reduce(
            &mut state,
            Action::PostsLoaded {
                request: 2,
                posts: vec![sample_post("fresh")],
                pagination: meta(1, 1, 1),
            },
        );
        assert_eq!(state.posts[0].title, "fresh");
        assert!(!state.loading);
    }

    #[test]
    fn stale_failure_is_discarded() {
        let mut state = loaded_state(&["kept"]);
        reduce(&mut state, Action::FetchStarted { request: 2 });
        reduce(&mut state, Action::FetchStarted { request: 3 });

        reduce(
            &mut state,
            Action::FetchFailed {
                request: 2,
                message: "old failure".to_string(),
            },
        );

        assert_eq!(state.error, None);
        assert!(state.loading);
    }

    #[test]
    fn update_swaps_in_place() {
        let mut state = loaded_state(&["a", "b", "c"]);
        let mut updated = state.posts[1].clone();
        updated.title = "b, revised".to_string();

        reduce(
            &mut state,
            Action::PostUpdated {
                post: updated.clone(),
            },
        );

        assert_eq!(state.posts.len(), 3);
        assert_eq!(state.posts[0].title, "a");
        assert_eq!(state.posts[1].title, "b, revised");
        assert_eq!(state.posts[2].title, "c");
    }

    #[test]
    fn delete_removes_by_id_keeping_order() {
        let mut state = loaded_state(&["a", "b", "c"]);
        let doomed = state.posts[1].id;

        reduce(&mut state, Action::PostDeleted { id: doomed });

        let titles: Vec<&str> = state.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[test]
    fn clear_error_touches_nothing_else() {
        let mut state = loaded_state(&["kept"]);
        reduce(
            &mut state,
            Action::ErrorSet {
                message: "boom".to_string(),
            },
        );
        let posts_before = state.posts.clone();

        reduce(&mut state, Action::ErrorCleared);

        assert_eq!(state.error, None);
        assert_eq!(state.posts, posts_before);
    }
}
