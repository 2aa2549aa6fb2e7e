//! Category handlers. Mutations are admin-only; listing is public.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use quill_core::domain::Category;
use quill_core::error::RepoError;
use quill_core::validation::validate_category;
use quill_shared::ApiResponse;
use quill_shared::dto::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn require_admin(identity: &Identity) -> AppResult<()> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to manage categories".to_string(),
        ))
    }
}

/// GET /api/categories
pub async fn list_categories(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories = state.categories.find_all().await?;
    let items: Vec<CategoryResponse> = categories.iter().map(CategoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(items)))
}

/// POST /api/categories - admin only.
pub async fn create_category(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateCategoryRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;
    let req = body.into_inner();

    let name = req.name.trim().to_string();
    validate_category(&name, req.description.as_deref()).map_err(AppError::Validation)?;

    let category = Category::new(name, req.description, req.color);
    let saved = state
        .categories
        .insert(category)
        .await
        .map_err(|e| match e {
            RepoError::Constraint(_) => AppError::Conflict("Category already exists".to_string()),
            other => other.into(),
        })?;

    tracing::info!(category = %saved.name, slug = %saved.slug, "Category created");
    Ok(HttpResponse::Created().json(ApiResponse::ok(CategoryResponse::from(&saved))))
}

/// PUT /api/categories/{id} - admin only. Renaming regenerates the slug.
pub async fn update_category(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCategoryRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;
    let id = path.into_inner();
    let req = body.into_inner();

    let mut category = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    if let Some(name) = req.name {
        category.rename(name.trim().to_string());
    }
    if let Some(description) = req.description {
        category.description = Some(description);
    }
    if let Some(color) = req.color {
        category.color = color;
    }
    category.updated_at = Utc::now();

    validate_category(&category.name, category.description.as_deref())
        .map_err(AppError::Validation)?;

    let saved = state
        .categories
        .update(category)
        .await
        .map_err(|e| match e {
            RepoError::Constraint(_) => AppError::Conflict("Category already exists".to_string()),
            other => other.into(),
        })?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CategoryResponse::from(&saved))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use quill_core::domain::Role;
    use serde_json::Value;

    fn admin_identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: "moderator".to_string(),
            role: Role::Admin,
        }
    }

    fn user_identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: "writer".to_string(),
            role: Role::User,
        }
    }

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn create_derives_slug_and_default_color() {
        let data = web::Data::new(AppState::in_memory());

        let response = create_category(
            data,
            admin_identity(),
            web::Json(CreateCategoryRequest {
                name: "Tech & Science!".to_string(),
                description: None,
                color: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["slug"], "tech-science");
        assert_eq!(body["data"]["color"], "#6c757d");
    }

    #[actix_rt::test]
    async fn create_requires_admin() {
        let data = web::Data::new(AppState::in_memory());

        let err = create_category(
            data,
            user_identity(),
            web::Json(CreateCategoryRequest {
                name: "Tech".to_string(),
                description: None,
                color: None,
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[actix_rt::test]
    async fn duplicate_name_conflicts() {
        let data = web::Data::new(AppState::in_memory());
        let request = CreateCategoryRequest {
            name: "Tech".to_string(),
            description: None,
            color: None,
        };

        create_category(data.clone(), admin_identity(), web::Json(request.clone()))
            .await
            .unwrap();
        let err = create_category(data, admin_identity(), web::Json(request))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_rt::test]
    async fn rename_regenerates_slug() {
        let state = AppState::in_memory();
        let data = web::Data::new(state.clone());
        let created = create_category(
            data.clone(),
            admin_identity(),
            web::Json(CreateCategoryRequest {
                name: "Old Name".to_string(),
                description: None,
                color: None,
            }),
        )
        .await
        .unwrap();
        let id: Uuid = body_json(created).await["data"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let response = update_category(
            data,
            admin_identity(),
            web::Path::from(id),
            web::Json(UpdateCategoryRequest {
                name: Some("Data Engineering".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["data"]["name"], "Data Engineering");
        assert_eq!(body["data"]["slug"], "data-engineering");
    }
}
