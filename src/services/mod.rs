pub mod auth_service;
pub mod category_service;
pub mod image_service;
pub mod mail_service;
pub mod product_query;
pub mod product_service;
pub mod user_service;
