pub mod auth;
pub mod categories;
pub mod health;
pub mod multipart;
pub mod products;
pub mod swagger;
pub mod users;

use actix_web::{web, HttpResponse};

use crate::config::JwtConfig;
use crate::utils::AppError;

/// `{"success": true, "message": ...}` envelope used by action endpoints.
pub fn message(text: String) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": text }))
}

/// Mounts every route of the API.
pub fn configure(cfg: &mut web::ServiceConfig, jwt: &JwtConfig) {
    // Malformed JSON bodies and query strings get the same error envelope as everything else
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::InvalidRequest(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::InvalidRequest(err.to_string()).into()
    }));

    cfg.route("/", web::get().to(health::welcome))
        .route("/health", web::get().to(health::health_check));

    auth::configure(cfg);
    users::configure(cfg, jwt);
    categories::configure(cfg);
    products::configure(cfg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::MongoDB;
    use crate::services::image_service::InlineImageHost;
    use crate::services::mail_service::{Mail, Mailer};
    use crate::state::AppState;
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Keeps every mail so the test can read the OTP back.
    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<Mail>>,
    }

    impl CapturingMailer {
        fn last_otp(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let body = &sent.last().expect("a mail was sent").body;
            body.trim_start_matches("Your OTP is ").to_string()
        }
    }

    #[async_trait]
    impl Mailer for CapturingMailer {
        async fn send(&self, mail: &Mail) -> Result<(), AppError> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    async fn test_state(mailer: Arc<CapturingMailer>) -> AppState {
        let config = Config::for_tests();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database_url.clone());
        let db = MongoDB::new(&uri, &config.database_name)
            .await
            .expect("MongoDB running");
        AppState::with_collaborators(db, config, Arc::new(InlineImageHost), mailer)
    }

    #[actix_web::test]
    async fn test_message_envelope() {
        let app = test::init_service(
            App::new().route("/", web::get().to(|| async { message("done".to_string()) })),
        )
        .await;
        let json: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(json, serde_json::json!({ "success": true, "message": "done" }));
    }

    #[actix_web::test]
    async fn test_malformed_json_uses_error_envelope() {
        let jwt = Config::for_tests().jwt;
        let app = test::init_service(
            App::new().configure(|cfg| configure(cfg, &jwt)).route(
                "/echo",
                web::post().to(|body: web::Json<crate::models::LoginRequest>| async move {
                    HttpResponse::Ok().body(body.into_inner().email)
                }),
            ),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    #[derive(serde::Deserialize)]
    struct Paging {
        page: u32,
    }

    #[actix_web::test]
    async fn test_malformed_query_uses_error_envelope() {
        let jwt = Config::for_tests().jwt;
        let app = test::init_service(
            App::new().configure(|cfg| configure(cfg, &jwt)).route(
                "/paged",
                web::get().to(|query: web::Query<Paging>| async move {
                    HttpResponse::Ok().body(query.page.to_string())
                }),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/paged?page=abc").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());

        let req = test::TestRequest::get().uri("/paged?page=2").to_request();
        assert_eq!(test::call_and_read_body(&app, req).await, "2");
    }

    #[actix_web::test]
    #[ignore] // requires MongoDB (DATABASE_URL)
    async fn test_invalid_id_is_bad_request() {
        let state = test_state(Arc::new(CapturingMailer::default())).await;
        let jwt = state.config.jwt.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| configure(cfg, &jwt)),
        )
        .await;

        for uri in ["/api/products/not-an-id", "/api/categories/123"] {
            let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            let json: serde_json::Value = test::read_body_json(res).await;
            assert_eq!(json["error"], "Invalid id");
            assert_eq!(json["success"], false);
        }
    }

    #[actix_web::test]
    #[ignore] // requires MongoDB (DATABASE_URL)
    async fn test_register_verify_login_flow() {
        let mailer = Arc::new(CapturingMailer::default());
        let state = test_state(mailer.clone()).await;
        let jwt = state.config.jwt.clone();
        let email = format!("flow-{}@vfood.test", uuid::Uuid::new_v4());

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| configure(cfg, &jwt)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(serde_json::json!({ "fullName": "Pham D", "email": email, "password": "x" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let login = || {
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(serde_json::json!({ "email": email, "password": "x" }))
                .to_request()
        };
        assert_eq!(test::call_service(&app, login()).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/auth/verify-otp")
            .set_json(serde_json::json!({ "email": email, "otp": "000000x", "purpose": "register" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/auth/verify-otp")
            .set_json(serde_json::json!({ "email": email, "otp": mailer.last_otp(), "purpose": "register" }))
            .to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["message"], "User verified and registered");

        let res = test::call_service(&app, login()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let json: serde_json::Value = test::read_body_json(res).await;
        let token = json["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/users/get-profile")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let profile: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(profile["email"], email);
        assert_eq!(profile["verified"], true);
        assert!(profile.get("password").is_none());
    }

    #[actix_web::test]
    #[ignore] // requires MongoDB (DATABASE_URL)
    async fn test_product_listing_filters() {
        let state = test_state(Arc::new(CapturingMailer::default())).await;
        let jwt = state.config.jwt.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| configure(cfg, &jwt)),
        )
        .await;

        let marker = uuid::Uuid::new_v4().simple().to_string();
        let category_name = format!("Drinks {}", marker);
        let body = multipart::tests::multipart_body(
            &[("name", category_name.as_str()), ("image", "https://img.test/d.jpg")],
            &[],
        );
        let req = test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(("Content-Type", multipart::tests::multipart_content_type()))
            .set_payload(body)
            .to_request();
        let category: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let category_id = category["_id"].as_str().unwrap().to_string();

        for (name, price) in [("Bún Bò", "15"), ("Phở Gà", "25"), ("Bún Chả", "9")] {
            let name = format!("{} {}", name, marker);
            let body = multipart::tests::multipart_body(
                &[
                    ("name", name.as_str()),
                    ("quantity", "5"),
                    ("price", price),
                    ("category", category_id.as_str()),
                    ("images", "https://img.test/p.jpg"),
                ],
                &[],
            );
            let req = test::TestRequest::post()
                .uri("/api/products")
                .insert_header(("Content-Type", multipart::tests::multipart_content_type()))
                .set_payload(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get()
            .uri("/api/products?search=bun%20&minPrice=10&maxPrice=20&limit=5")
            .to_request();
        let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let products = page["products"].as_array().unwrap();
        assert!(products.iter().all(|p| {
            let price = p["price"].as_f64().unwrap();
            (10.0..=20.0).contains(&price)
        }));

        let uri = format!("/api/products?search={}&sortBy=price&sortOrder=desc", marker);
        let req = test::TestRequest::get().uri(&uri).to_request();
        let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 3);
        assert_eq!(page["totalPages"], 1);
        assert_eq!(page["products"][0]["price"], 25.0);
        assert_eq!(page["products"][0]["category"]["_id"], category_id.as_str());

        let uri = format!("/api/products?search={}&maxPrice=20&limit=1&page=2", marker);
        let req = test::TestRequest::get().uri(&uri).to_request();
        let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["products"].as_array().unwrap().len(), 1);
    }
}
