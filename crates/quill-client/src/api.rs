//! Typed HTTP client for the Quill API.
//!
//! Every call decodes the shared response envelope; failure envelopes and
//! non-2xx statuses become [`ClientError::Api`] with the server message
//! and any field errors attached.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use quill_core::query::PostQuery;
use quill_shared::dto::{
    AuthResponse, CategoryResponse, CreateCategoryRequest, CreatePostRequest, LoginRequest,
    PostResponse, RegisterRequest, UpdateCategoryRequest, UpdatePostRequest, UserResponse,
};
use quill_shared::{ApiResponse, PageMeta};

use crate::error::ClientError;

/// API client bound to one server, optionally carrying a bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach the bearer token used for protected calls.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Decode an envelope, turning failure envelopes into `Api` errors.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>, ClientError> {
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if status.is_success() && body.success {
            Ok(body)
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message: body.message.unwrap_or_default(),
                errors: body.errors.unwrap_or_default(),
            })
        }
    }

    fn require_data<T>(body: ApiResponse<T>) -> Result<T, ClientError> {
        body.data
            .ok_or_else(|| ClientError::Decode("missing data in success envelope".to_string()))
    }

    /// GET /api/posts with the query's filters as parameters.
    pub async fn list_posts(
        &self,
        query: &PostQuery,
    ) -> Result<(Vec<PostResponse>, PageMeta), ClientError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(tag) = &query.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let response = self
            .http
            .get(self.url("/api/posts"))
            .query(&params)
            .send()
            .await?;
        let body: ApiResponse<Vec<PostResponse>> = Self::decode(response).await?;

        let pagination = body
            .pagination
            .ok_or_else(|| ClientError::Decode("missing pagination in listing".to_string()))?;
        let posts = Self::require_data(body)?;
        Ok((posts, pagination))
    }

    /// GET /api/posts/{id}. Counts a view server-side on every call.
    pub async fn get_post(&self, id: Uuid) -> Result<PostResponse, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/posts/{id}")))
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// POST /api/posts.
    pub async fn create_post(&self, request: &CreatePostRequest) -> Result<PostResponse, ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/api/posts")))
            .json(request)
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// PUT /api/posts/{id}.
    pub async fn update_post(
        &self,
        id: Uuid,
        request: &UpdatePostRequest,
    ) -> Result<PostResponse, ClientError> {
        let response = self
            .authorized(self.http.put(self.url(&format!("/api/posts/{id}"))))
            .json(request)
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// DELETE /api/posts/{id}.
    pub async fn delete_post(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/api/posts/{id}"))))
            .send()
            .await?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// GET /api/categories.
    pub async fn list_categories(&self) -> Result<Vec<CategoryResponse>, ClientError> {
        let response = self.http.get(self.url("/api/categories")).send().await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// POST /api/categories (admin only).
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<CategoryResponse, ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/api/categories")))
            .json(request)
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// PUT /api/categories/{id} (admin only).
    pub async fn update_category(
        &self,
        id: Uuid,
        request: &UpdateCategoryRequest,
    ) -> Result<CategoryResponse, ClientError> {
        let response = self
            .authorized(self.http.put(self.url(&format!("/api/categories/{id}"))))
            .json(request)
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// POST /api/auth/register.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(request)
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// POST /api/auth/login.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(request)
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }

    /// GET /api/auth/me.
    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        let response = self
            .authorized(self.http.get(self.url("/api/auth/me")))
            .send()
            .await?;
        Self::require_data(Self::decode(response).await?)
    }
}
