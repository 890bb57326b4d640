use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::api::message;
use crate::api::multipart::read_form;
use crate::config::JwtConfig;
use crate::middleware::AuthMiddleware;
use crate::models::{UpdateProfileRequest, UserProfile};
use crate::services::auth_service::Claims;
use crate::services::user_service;
use crate::state::AppState;
use crate::utils::AppError;

/// Multipart field carrying the avatar file.
pub const AVATAR_FIELD: &str = "avtFile";

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users, newest first", body = Vec<UserProfile>)
    )
)]
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    log::info!("👥 GET /api/users");
    let users = user_service::list_users(&state).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/get-profile",
    tag = "Users",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /api/users/get-profile - user: {}", claims.sub);
    let profile = user_service::get_profile(&state, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/users/update-profile",
    tag = "Users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /api/users/update-profile - user: {}", claims.sub);

    match user_service::update_profile(&state, &claims.sub, request.into_inner()).await {
        Ok(text) => Ok(message(text)),
        Err(e) => {
            log::warn!("❌ Profile update failed: {} - {}", claims.sub, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/users/upload-avatar",
    tag = "Users",
    request_body(content_type = "multipart/form-data", description = "File field `avtFile`"),
    responses(
        (status = 200, description = "Avatar uploaded, returns `avtUrl`"),
        (status = 400, description = "No file uploaded"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    log::info!("🖼️  POST /api/users/upload-avatar - user: {}", claims.sub);

    let mut form = read_form(payload).await?;
    let file = form
        .take_file(AVATAR_FIELD)
        .ok_or_else(|| AppError::InvalidRequest("No file uploaded".to_string()))?;

    let url = user_service::upload_avatar(&state, &claims.sub, file).await?;
    log::info!("✅ Avatar updated: {}", claims.sub);

    Ok(HttpResponse::Ok().json(json!({ "success": true, "avtUrl": url })))
}

pub fn configure(cfg: &mut web::ServiceConfig, jwt: &JwtConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("", web::get().to(list_users))
            // Protected endpoints requiring JWT authentication
            .service(
                web::resource("/get-profile")
                    .wrap(AuthMiddleware::new(jwt.clone()))
                    .route(web::get().to(get_profile)),
            )
            .service(
                web::resource("/update-profile")
                    .wrap(AuthMiddleware::new(jwt.clone()))
                    .route(web::put().to(update_profile)),
            )
            .service(
                web::resource("/upload-avatar")
                    .wrap(AuthMiddleware::new(jwt.clone()))
                    .route(web::post().to(upload_avatar)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use actix_web::{http::StatusCode, test, App};

    // The middleware rejects before any handler touches the database,
    // so the routes can be mounted without app data.
    #[actix_web::test]
    async fn test_profile_routes_require_a_token() {
        let jwt = Config::for_tests().jwt;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &jwt))).await;

        for req in [
            test::TestRequest::get().uri("/api/users/get-profile"),
            test::TestRequest::put().uri("/api/users/update-profile"),
            test::TestRequest::post().uri("/api/users/upload-avatar"),
        ] {
            let err = test::try_call_service(&app, req.to_request()).await.unwrap_err();
            assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
        }
    }
}
