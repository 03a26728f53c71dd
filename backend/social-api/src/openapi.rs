/// OpenAPI documentation for the Social API
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers::{health, posts, upload, users};
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Social API",
        version = "1.0.0",
        description = "Social posting backend. Users register and confirm their email, log in with bearer tokens, write posts (optionally illustrated by a generated image), comment, like, and upload files.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Development server"),
    ),
    paths(
        users::register,
        users::login,
        users::confirm_email,
        users::reconfirm,
        posts::create_post,
        posts::list_posts,
        posts::get_post_with_comments,
        posts::create_comment,
        posts::get_comments,
        posts::like_post,
        upload::upload_file,
        health::health_summary,
        health::liveness_check,
    ),
    components(schemas(
        models::UserIn,
        models::Credentials,
        models::TokenResponse,
        models::DetailResponse,
        models::ErrorResponse,
        models::PostIn,
        models::Post,
        models::PostWithLikes,
        models::PostWithComments,
        models::PostSorting,
        models::CommentIn,
        models::Comment,
        models::LikeIn,
        models::Like,
        upload::UploadResponse,
        upload::UploadForm,
    )),
    tags(
        (name = "users", description = "Registration, login and email confirmation"),
        (name = "posts", description = "Posts, comments and likes"),
        (name = "upload", description = "File upload to the storage bucket"),
        (name = "health", description = "Service health checks"),
    ),
    modifiers(&SecurityAddon),
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
                        .description(Some("Access token from POST /token"))
                        .build(),
                ),
            )
        }
    }
}

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/openapi.json"
    }

    pub fn docs_path() -> &'static str {
        "/docs/{_:.*}"
    }
}
