use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::api::message;
use crate::api::multipart::{read_form, FormParts};
use crate::models::{ProductForm, ProductPage, ProductResponse};
use crate::services::image_service::UploadedFile;
use crate::services::product_query::ProductListParams;
use crate::services::product_service;
use crate::state::AppState;
use crate::utils::AppError;

/// Parses the text parts into a [`ProductForm`]; every file part is an image.
pub fn product_form(parts: FormParts) -> Result<(ProductForm, Vec<UploadedFile>), AppError> {
    let mut form = ProductForm::default();
    for (name, value) in parts.fields {
        form.apply_field(&name, value)?;
    }
    Ok((form, parts.files))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body(content_type = "multipart/form-data", description = "`name`, `quantity`, `price`, `tag`, `category`, `description`, `star`, files or URLs `images`"),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation failed or category not found")
    )
)]
pub async fn create_product(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    log::info!("🍜 POST /api/products");

    let (form, files) = product_form(read_form(payload).await?)?;
    match product_service::create_product(&state, form, files).await {
        Ok(product) => Ok(HttpResponse::Created().json(product)),
        Err(e) => {
            log::warn!("❌ Product creation failed: {}", e);
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(ProductListParams),
    responses(
        (status = 200, description = "One page of products", body = ProductPage)
    )
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductListParams>,
) -> Result<HttpResponse, AppError> {
    log::info!("🍜 GET /api/products - {:?}", query);
    let page = product_service::list_products(&state, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product ObjectId")),
    responses(
        (status = 200, description = "Product with its category", body = ProductResponse),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🍜 GET /api/products/{}", id);
    let product = product_service::get_product(&state, &id).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product ObjectId")),
    request_body(content_type = "multipart/form-data", description = "Any product field; uploaded files replace the image list"),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found")
    )
)]
pub async fn update_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("✏️  PUT /api/products/{}", id);

    let (form, files) = product_form(read_form(payload).await?)?;
    let product = product_service::update_product(&state, &id, form, files).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product ObjectId")),
    responses(
        (status = 200, description = "Product deleted successfully"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn delete_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🗑️ DELETE /api/products/{}", id);
    product_service::delete_product(&state, &id).await?;
    Ok(message("Product deleted successfully".to_string()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/products")
            .route("", web::post().to(create_product))
            .route("", web::get().to(list_products))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}", web::delete().to(delete_product)),
    );
}
