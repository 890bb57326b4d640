use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub const WELCOME: &str = "Welcome to VFood API";

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

impl HealthResponse {
    pub fn new(database_up: bool) -> Self {
        HealthResponse {
            status: if database_up { "healthy" } else { "degraded" }.to_string(),
            service: "vfood-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_up { "connected" } else { "unreachable" }.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses(
        (status = 200, description = "Welcome message", body = String)
    )
)]
pub async fn welcome() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(WELCOME)
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let database_up = state.db.health_check().await;
    if !database_up {
        log::warn!("⚠️  Health check: database unreachable");
        return HttpResponse::ServiceUnavailable().json(HealthResponse::new(false));
    }
    HttpResponse::Ok().json(HealthResponse::new(true))
}
