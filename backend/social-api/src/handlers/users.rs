/// Registration, login and email confirmation
use actix_web::{web, HttpRequest, HttpResponse};
use crypto_core::jwt::{self, TokenType};
use crypto_core::password;
use validator::Validate;

use crate::db::{self, user_repo};
use crate::error::{AppError, Result};
use crate::models::{Credentials, DetailResponse, ErrorResponse, TokenResponse, User, UserIn};
use crate::services::tasks;
use crate::telemetry::LoggedEmail;
use crate::AppState;

const DUPLICATE_USER: &str = "A user with that username or email already exists.";
const INVALID_LOGIN: &str = "Invalid email or password";
const INVALID_RECONFIRM: &str = "Incorrect username or password";

/// Register a new (unconfirmed) user and email them a confirmation link
#[utoipa::path(
    post,
    path = "/register",
    tag = "users",
    request_body = UserIn,
    responses(
        (status = 201, description = "User created", body = DetailResponse),
        (status = 400, description = "Username or email taken", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn register(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<UserIn>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    payload.validate()?;

    if user_repo::username_or_email_taken(&state.db, &payload.username, &payload.email).await? {
        return Err(AppError::BadRequest(DUPLICATE_USER.to_string()));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = user_repo::create_user(&state.db, &payload.username, &payload.email, &password_hash)
        .await
        .map_err(|e| {
            // Lost a race with a concurrent registration
            if db::is_unique_violation(&e) {
                AppError::BadRequest(DUPLICATE_USER.to_string())
            } else {
                e.into()
            }
        })?;

    tracing::info!(user_id = user.id, email = %LoggedEmail(&user.email), "User registered");
    schedule_confirmation_email(&req, &state, &user)?;

    Ok(HttpResponse::Created().json(DetailResponse::new(
        "User created. Please confirm your email.",
    )))
}

/// Exchange credentials for an access token
///
/// `username` may carry either the username or the email address.
#[utoipa::path(
    post,
    path = "/token",
    tag = "users",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials or unconfirmed email", body = ErrorResponse)
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<Credentials>,
) -> Result<HttpResponse> {
    let user = user_repo::find_by_login(&state.db, &form.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_LOGIN.to_string()))?;

    if !password::verify_password(&form.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "Password mismatch");
        return Err(AppError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    if !user.confirmed {
        return Err(AppError::Unauthorized(
            "User has not confirmed email".to_string(),
        ));
    }

    let access_token = jwt::generate_access_token(&user.email)?;
    tracing::info!(user_id = user.id, "Access token issued");

    Ok(HttpResponse::Ok().json(TokenResponse::bearer(access_token)))
}

/// Confirm the email address named by a confirmation token
#[utoipa::path(
    get,
    path = "/confirm/{token}",
    tag = "users",
    params(("token" = String, Path, description = "Confirmation token from the email")),
    responses(
        (status = 200, description = "User confirmed", body = DetailResponse),
        (status = 401, description = "Invalid, expired or wrong-type token", body = ErrorResponse)
    )
)]
pub async fn confirm_email(
    state: web::Data<AppState>,
    token: web::Path<String>,
) -> Result<HttpResponse> {
    let email = jwt::validate_token(&token, TokenType::Confirmation)?;

    if !user_repo::set_confirmed(&state.db, &email, true).await? {
        return Err(AppError::Unauthorized(
            "Could not find user for this token".to_string(),
        ));
    }

    tracing::info!(email = %LoggedEmail(&email), "User confirmed");
    Ok(HttpResponse::Ok().json(DetailResponse::new("User confirmed")))
}

/// Reset confirmation and send a fresh confirmation link
#[utoipa::path(
    post,
    path = "/reconfirm",
    tag = "users",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Reconfirmation initiated", body = DetailResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn reconfirm(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<Credentials>,
) -> Result<HttpResponse> {
    let user = user_repo::find_by_username(&state.db, &form.username)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_RECONFIRM.to_string()))?;

    if !password::verify_password(&form.password, &user.password_hash)? {
        return Err(AppError::BadRequest(INVALID_RECONFIRM.to_string()));
    }

    user_repo::set_confirmed(&state.db, &user.email, false).await?;
    schedule_confirmation_email(&req, &state, &user)?;

    Ok(HttpResponse::Ok().json(DetailResponse::new(
        "Reconfirmation initiated. Please check your emails.",
    )))
}

fn schedule_confirmation_email(req: &HttpRequest, state: &AppState, user: &User) -> Result<()> {
    let token = jwt::generate_confirmation_token(&user.email)?;
    let confirmation_url = req
        .url_for("confirm_email", [token.as_str()])
        .map_err(|e| AppError::Internal(format!("Failed to build confirmation URL: {e}")))?;

    tasks::spawn_registration_email(
        state.mailer.clone(),
        user.username.clone(),
        user.email.clone(),
        confirmation_url.to_string(),
    );
    Ok(())
}
