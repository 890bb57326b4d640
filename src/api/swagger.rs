use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "VFood API",
        version = "1.0.0",
        description = "Backend for the VFood food-ordering app.\n\n**Authentication:** profile endpoints under `/api/users` require a JWT Bearer token obtained from `/api/auth/login`.\n\n**Features:**\n- Registration with email OTP verification\n- Password reset via OTP\n- Category and product catalog with image upload\n- Product search, price filter, sorting and pagination"
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::forgot_password,
        crate::api::auth::verify_otp,
        crate::api::auth::reset_password,

        // Users
        crate::api::users::list_users,
        crate::api::users::get_profile,
        crate::api::users::update_profile,
        crate::api::users::upload_avatar,

        // Categories
        crate::api::categories::create_category,
        crate::api::categories::list_categories,
        crate::api::categories::get_category,
        crate::api::categories::update_category,
        crate::api::categories::delete_category,

        // Products
        crate::api::products::create_product,
        crate::api::products::list_products,
        crate::api::products::get_product,
        crate::api::products::update_product,
        crate::api::products::delete_product,

        // Health
        crate::api::health::welcome,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::LoginResponse,
            crate::models::ForgotPasswordRequest,
            crate::models::VerifyOtpRequest,
            crate::models::ResetPasswordRequest,
            crate::models::UpdateProfileRequest,
            crate::models::UserProfile,
            crate::models::OtpPurpose,
            crate::models::CategoryResponse,
            crate::models::ProductResponse,
            crate::models::ProductPage,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, OTP verification and password reset."),
        (name = "Users", description = "User listing and the authenticated user's profile."),
        (name = "Categories", description = "Food categories."),
        (name = "Products", description = "Products with search, price range filter, sorting and pagination."),
        (name = "Health", description = "Welcome and health check endpoints."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /api/auth/login"))
                        .build()
                ),
            );
        }
    }
}
