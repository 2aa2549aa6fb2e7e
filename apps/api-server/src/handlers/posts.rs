//! Post handlers: the listing query, detail fetch, and mutations.

use std::collections::{HashMap, HashSet};

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::{Category, Post, PostDraft, PostPatch, User};
use quill_core::error::RepoError;
use quill_core::query::{Page, PostFilter, PostQuery};
use quill_core::validation::validate_post;
use quill_shared::dto::{
    AuthorRef, CategoryRef, CreatePostRequest, ListPostsParams, PostResponse, UpdatePostRequest,
};
use quill_shared::{ApiResponse, PageMeta};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Resolve author and category references for a set of posts with two
/// batched lookups. `detailed` adds the author bio (detail view).
async fn resolve_posts(
    state: &AppState,
    posts: Vec<Post>,
    detailed: bool,
) -> AppResult<Vec<PostResponse>> {
    let mut seen_authors = HashSet::new();
    let author_ids: Vec<Uuid> = posts
        .iter()
        .map(|p| p.author)
        .filter(|id| seen_authors.insert(*id))
        .collect();

    let mut seen_categories = HashSet::new();
    let category_ids: Vec<Uuid> = posts
        .iter()
        .flat_map(|p| p.categories.iter().copied())
        .filter(|id| seen_categories.insert(*id))
        .collect();

    let authors: HashMap<Uuid, User> = state
        .users
        .find_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let categories: HashMap<Uuid, Category> = state
        .categories
        .find_by_ids(&category_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    posts
        .into_iter()
        .map(|post| {
            let author_user = authors.get(&post.author).ok_or_else(|| {
                AppError::Internal(format!("author {} missing for post {}", post.author, post.id))
            })?;
            let author = if detailed {
                AuthorRef::detailed(author_user)
            } else {
                AuthorRef::summary(author_user)
            };
            // Dangling category references are dropped, not errors.
            let resolved: Vec<CategoryRef> = post
                .categories
                .iter()
                .filter_map(|id| categories.get(id))
                .map(CategoryRef::from)
                .collect();

            Ok(PostResponse {
                id: post.id,
                title: post.title,
                excerpt: post.excerpt,
                content: post.content,
                status: post.status,
                tags: post.tags,
                categories: resolved,
                author,
                featured_image: post.featured_image,
                views: post.views,
                created_at: post.created_at,
                updated_at: post.updated_at,
            })
        })
        .collect()
}

async fn resolve_one(state: &AppState, post: Post, detailed: bool) -> AppResult<PostResponse> {
    let mut items = resolve_posts(state, vec![post], detailed).await?;
    items
        .pop()
        .ok_or_else(|| AppError::Internal("post resolution came back empty".to_string()))
}

/// GET /api/posts - the published listing with conjunctive
/// category/tag/search filters and skip/limit pagination.
pub async fn list_posts(
    state: web::Data<AppState>,
    params: web::Query<ListPostsParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();
    let query = PostQuery::new(params.page, params.limit, params.category, params.tag, params.search);

    let category_id = match &query.category {
        Some(slug) => match state.categories.find_by_slug(slug).await? {
            Some(category) => Some(category.id),
            None => {
                // An unknown slug matches nothing: empty page, not an error.
                let empty: Page<Post> = Page::empty(query.page);
                return Ok(HttpResponse::Ok().json(ApiResponse::paginated(
                    Vec::<PostResponse>::new(),
                    PageMeta::from(&empty),
                )));
            }
        },
        None => None,
    };

    let filter = PostFilter::published(&query, category_id);
    let page = state.posts.find_page(&filter).await?;
    let meta = PageMeta::from(&page);
    let items = resolve_posts(&state, page.items, false).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::paginated(items, meta)))
}

/// GET /api/posts/{id} - full detail including the author bio. Every
/// fetch counts one view, repeated fetches included.
pub async fn get_post(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    match state.posts.increment_views(id).await {
        Ok(()) => {}
        Err(RepoError::NotFound) => {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let item = resolve_one(&state, post, true).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(item)))
}

/// POST /api/posts - authenticated. The author is stamped from the
/// caller's identity; any author in the body is ignored.
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    validate_post(&req.title, &req.content, req.excerpt.as_deref())
        .map_err(AppError::Validation)?;

    let post = Post::new(
        identity.user_id,
        PostDraft {
            title: req.title,
            excerpt: req.excerpt,
            content: req.content,
            status: req.status.unwrap_or_default(),
            tags: req.tags,
            categories: req.categories,
            featured_image: req.featured_image,
        },
    );

    let saved = state.posts.insert(post).await?;
    tracing::info!(post_id = %saved.id, author = %identity.username, "Post created");

    let item = resolve_one(&state, saved, false).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(item)))
}

/// PUT /api/posts/{id} - authenticated, author-or-admin. The patch is
/// merged onto the stored post and validation re-runs on the result.
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();

    let mut post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if !identity.can_modify(post.author) {
        return Err(AppError::Forbidden(
            "Not authorized to update this post".to_string(),
        ));
    }

    post.apply(PostPatch {
        title: req.title,
        excerpt: req.excerpt,
        content: req.content,
        status: req.status,
        tags: req.tags,
        categories: req.categories,
        featured_image: req.featured_image,
    });

    validate_post(&post.title, &post.content, post.excerpt.as_deref())
        .map_err(AppError::Validation)?;

    let saved = state.posts.update(post).await?;
    let item = resolve_one(&state, saved, false).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(item)))
}

/// DELETE /api/posts/{id} - authenticated, author-or-admin.
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if !identity.can_modify(post.author) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this post".to_string(),
        ));
    }

    state.posts.delete(id).await?;
    tracing::info!(post_id = %id, caller = %identity.username, "Post deleted");

    Ok(HttpResponse::Ok().json(ApiResponse::confirmation("Post deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use quill_core::domain::{PostStatus, Role};
    use quill_core::validation::MAX_TITLE_LEN;
    use serde_json::Value;

    fn identity(user: &User) -> Identity {
        Identity {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }

    async fn seeded_state() -> (AppState, User) {
        let state = AppState::in_memory();
        let author = User::new(
            "writer".to_string(),
            "writer@example.com".to_string(),
            "hash".to_string(),
        );
        state.users.insert(author.clone()).await.unwrap();
        (state, author)
    }

    fn create_request(title: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.to_string(),
            excerpt: None,
            content: "Some content".to_string(),
            status: Some(PostStatus::Published),
            tags: Vec::new(),
            categories: Vec::new(),
            featured_image: None,
        }
    }

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn create_stamps_author_from_identity() {
        let (state, author) = seeded_state().await;

        let response = create_post(
            web::Data::new(state.clone()),
            identity(&author),
            web::Json(create_request("Hello")),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["author"]["id"], author.id.to_string());
        assert_eq!(body["data"]["author"]["username"], "writer");
        assert!(body["data"]["author"].get("bio").is_none());
    }

    #[actix_rt::test]
    async fn create_validates_title_boundary() {
        let (state, author) = seeded_state().await;
        let state = web::Data::new(state);

        let ok = create_post(
            state.clone(),
            identity(&author),
            web::Json(create_request(&"t".repeat(MAX_TITLE_LEN))),
        )
        .await;
        assert!(ok.is_ok());

        let err = create_post(
            state,
            identity(&author),
            web::Json(create_request(&"t".repeat(MAX_TITLE_LEN + 1))),
        )
        .await
        .unwrap_err();

        match &err {
            AppError::Validation(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field.as_str(), "title");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[actix_rt::test]
    async fn update_by_stranger_is_forbidden_and_leaves_post_unchanged() {
        let (state, author) = seeded_state().await;
        let stranger = User::new(
            "stranger".to_string(),
            "stranger@example.com".to_string(),
            "hash".to_string(),
        );
        state.users.insert(stranger.clone()).await.unwrap();

        let data = web::Data::new(state.clone());
        let created = create_post(
            data.clone(),
            identity(&author),
            web::Json(create_request("Original title")),
        )
        .await
        .unwrap();
        let id: Uuid = body_json(created).await["data"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let err = update_post(
            data.clone(),
            identity(&stranger),
            web::Path::from(id),
            web::Json(UpdatePostRequest {
                title: Some("Hijacked".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let untouched = state.posts.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(untouched.title, "Original title");
    }

    #[actix_rt::test]
    async fn admin_may_update_other_authors_posts() {
        let (state, author) = seeded_state().await;
        let mut admin = User::new(
            "moderator".to_string(),
            "mod@example.com".to_string(),
            "hash".to_string(),
        );
        admin.role = Role::Admin;
        state.users.insert(admin.clone()).await.unwrap();

        let data = web::Data::new(state.clone());
        let created = create_post(
            data.clone(),
            identity(&author),
            web::Json(create_request("Needs moderation")),
        )
        .await
        .unwrap();
        let id: Uuid = body_json(created).await["data"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let response = update_post(
            data,
            identity(&admin),
            web::Path::from(id),
            web::Json(UpdatePostRequest {
                status: Some(PostStatus::Draft),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], "draft");
    }

    #[actix_rt::test]
    async fn listing_envelope_carries_pagination() {
        let (state, author) = seeded_state().await;
        let data = web::Data::new(state);
        for i in 0..12 {
            create_post(
                data.clone(),
                identity(&author),
                web::Json(create_request(&format!("Post {i}"))),
            )
            .await
            .unwrap();
        }

        let response = list_posts(
            data,
            web::Query(ListPostsParams {
                page: Some(2),
                limit: Some(10),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["pagination"]["page"], 2);
        assert_eq!(body["pagination"]["pages"], 2);
        assert_eq!(body["pagination"]["total"], 12);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn unknown_category_slug_yields_empty_page() {
        let (state, author) = seeded_state().await;
        let data = web::Data::new(state);
        create_post(
            data.clone(),
            identity(&author),
            web::Json(create_request("Uncategorized")),
        )
        .await
        .unwrap();

        let response = list_posts(
            data,
            web::Query(ListPostsParams {
                category: Some("no-such-category".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
        assert_eq!(body["pagination"]["total"], 0);
        assert_eq!(body["pagination"]["pages"], 0);
    }

    #[actix_rt::test]
    async fn detail_fetch_counts_views_and_adds_bio() {
        let (state, author) = seeded_state().await;
        let mut with_bio = author.clone();
        with_bio.bio = Some("Writes about Rust".to_string());
        state.users.update(with_bio).await.unwrap();

        let data = web::Data::new(state.clone());
        let created = create_post(
            data.clone(),
            identity(&author),
            web::Json(create_request("Read me twice")),
        )
        .await
        .unwrap();
        let id: Uuid = body_json(created).await["data"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let first = get_post(data.clone(), web::Path::from(id)).await.unwrap();
        let body = body_json(first).await;
        assert_eq!(body["data"]["views"], 1);
        assert_eq!(body["data"]["author"]["bio"], "Writes about Rust");

        let second = get_post(data, web::Path::from(id)).await.unwrap();
        assert_eq!(body_json(second).await["data"]["views"], 2);
    }

    #[actix_rt::test]
    async fn delete_by_author_confirms() {
        let (state, author) = seeded_state().await;
        let data = web::Data::new(state.clone());
        let created = create_post(
            data.clone(),
            identity(&author),
            web::Json(create_request("Short lived")),
        )
        .await
        .unwrap();
        let id: Uuid = body_json(created).await["data"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let response = delete_post(data, identity(&author), web::Path::from(id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Post deleted successfully");
        assert!(state.posts.find_by_id(id).await.unwrap().is_none());
    }
}
