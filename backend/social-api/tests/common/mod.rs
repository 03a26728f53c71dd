//! Shared fixtures for database-backed API tests
//!
//! Tests run against `TEST_DATABASE_URL` (default
//! `postgres://localhost/social_api_test`); every fixture wipes the tables
//! first, so tests using it must be `#[serial]`.
#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::Value;
use social_api::config::{ImageGenerationSettings, MailSettings};
use social_api::db::{self, user_repo};
use social_api::services::{EmailService, ImageGenerationClient, UnconfiguredStore};
use social_api::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

pub const PASSWORD: &str = "correct horse battery staple";

/// Build the full application around a state, as `main` does
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .wrap(actix_middleware::CorrelationIdMiddleware)
                .configure(social_api::handlers::configure_routes),
        )
        .await
    };
}

pub fn init_test_secret() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        crypto_core::jwt::initialize_jwt_secret("social-api-integration-secret")
            .expect("Failed to initialize test secret");
    });
}

pub fn test_database_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/social_api_test".to_string())
}

/// Fresh, migrated, empty database with no-op external clients
pub async fn test_state() -> AppState {
    init_test_secret();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_database_url())
        .await
        .expect("Failed to connect to test database");

    db::run_migrations(&pool).await.expect("Failed to run migrations");
    db::reset_database(&pool).await.expect("Failed to reset database");

    AppState {
        db: pool,
        mailer: EmailService::new(&MailSettings::default()).expect("mailer"),
        images: ImageGenerationClient::new(&ImageGenerationSettings::default())
            .expect("image client"),
        storage: Arc::new(UnconfiguredStore),
    }
}

/// Call the service and decode the JSON body (`Null` when empty)
pub async fn call_json<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn register<S, B>(app: &S, username: &str, email: &str) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(serde_json::json!({
            "username": username,
            "email": email,
            "password": PASSWORD,
        }))
        .to_request();
    call_json(app, req).await
}

pub async fn login<S, B>(app: &S, username: &str, password: &str) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/token")
        .set_form([("username", username), ("password", password)])
        .to_request();
    call_json(app, req).await
}

/// Register, confirm and log in; returns the access token
pub async fn confirmed_user_token<S, B>(
    app: &S,
    state: &AppState,
    username: &str,
    email: &str,
) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, _) = register(app, username, email).await;
    assert_eq!(status, StatusCode::CREATED);

    user_repo::set_confirmed(&state.db, email, true)
        .await
        .expect("confirm user");

    let (status, body) = login(app, username, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub async fn create_post<S, B>(app: &S, token: &str, body: &str) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/post")
        .insert_header(bearer(token))
        .set_json(serde_json::json!({ "body": body }))
        .to_request();
    let (status, post) = call_json(app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    post
}
