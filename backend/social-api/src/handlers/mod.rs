/// HTTP request handlers
///
/// - `users`: registration, login, email confirmation
/// - `posts`: posts, comments and likes
/// - `upload`: file upload
/// - `health`: health checks
pub mod health;
pub mod posts;
pub mod upload;
pub mod users;

use actix_web::web;

use crate::error::{form_error_handler, json_error_handler, path_error_handler, query_error_handler};

/// Route table and extractor configuration for the API
///
/// `confirm_email` and `get_post_with_comments` are named so handlers can
/// build absolute links to them with `HttpRequest::url_for`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::FormConfig::default().error_handler(form_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        // Users
        .service(web::resource("/register").route(web::post().to(users::register)))
        .service(web::resource("/token").route(web::post().to(users::login)))
        .service(
            web::resource("/confirm/{token}")
                .name("confirm_email")
                .route(web::get().to(users::confirm_email)),
        )
        .service(web::resource("/reconfirm").route(web::post().to(users::reconfirm)))
        // Posts
        .service(
            web::resource("/post")
                .route(web::post().to(posts::create_post))
                .route(web::get().to(posts::list_posts)),
        )
        .service(
            web::resource("/post/{post_id}/comments").route(web::get().to(posts::get_comments)),
        )
        .service(
            web::resource("/post/{post_id}")
                .name("get_post_with_comments")
                .route(web::get().to(posts::get_post_with_comments)),
        )
        .service(web::resource("/comment").route(web::post().to(posts::create_comment)))
        .service(web::resource("/like").route(web::post().to(posts::like_post)))
        // Upload
        .service(web::resource("/upload").route(web::post().to(upload::upload_file)))
        // Health
        .service(web::resource("/health").route(web::get().to(health::health_summary)))
        .service(web::resource("/health/live").route(web::get().to(health::liveness_check)));
}
