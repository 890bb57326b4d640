use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::api::message;
use crate::api::multipart::{read_form, FormParts};
use crate::models::{CategoryForm, CategoryResponse};
use crate::services::category_service;
use crate::services::image_service::UploadedFile;
use crate::state::AppState;
use crate::utils::AppError;

/// Splits a multipart body into the category fields and its image file.
/// A file under `image` is preferred; otherwise the first file sent is used.
pub fn category_form(mut parts: FormParts) -> (CategoryForm, Option<UploadedFile>) {
    let mut form = CategoryForm::default();
    for (name, value) in parts.fields.drain(..) {
        match name.as_str() {
            "name" => form.name = Some(value),
            "description" => form.description = Some(value),
            "image" | "imageUrl" => form.image_url = Some(value),
            other => log::debug!("Ignoring unknown category field '{}'", other),
        }
    }

    let file = parts.take_file("image").or_else(|| {
        if parts.files.is_empty() {
            None
        } else {
            Some(parts.files.remove(0))
        }
    });

    (form, file)
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Categories",
    request_body(content_type = "multipart/form-data", description = "`name`, `description`, file or URL `image`"),
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Name or image missing")
    )
)]
pub async fn create_category(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    log::info!("📂 POST /api/categories");

    let (form, file) = category_form(read_form(payload).await?);
    let category = category_service::create_category(&state, form, file).await?;
    Ok(HttpResponse::Created().json(category))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "All categories, newest first", body = Vec<CategoryResponse>)
    )
)]
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    log::info!("📂 GET /api/categories");
    let categories = category_service::list_categories(&state).await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category ObjectId")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("📂 GET /api/categories/{}", id);
    let category = category_service::get_category(&state, &id).await?;
    Ok(HttpResponse::Ok().json(category))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category ObjectId")),
    request_body(content_type = "multipart/form-data", description = "Any of `name`, `description`, `image`"),
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("✏️  PUT /api/categories/{}", id);

    let (form, file) = category_form(read_form(payload).await?);
    let category = category_service::update_category(&state, &id, form, file).await?;
    Ok(HttpResponse::Ok().json(category))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category ObjectId")),
    responses(
        (status = 200, description = "Category deleted successfully"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🗑️ DELETE /api/categories/{}", id);
    category_service::delete_category(&state, &id).await?;
    Ok(message("Category deleted successfully".to_string()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/categories")
            .route("", web::post().to(create_category))
            .route("", web::get().to(list_categories))
            .route("/{id}", web::get().to(get_category))
            .route("/{id}", web::put().to(update_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}
