/// Request extractors for authenticated routes
///
/// Bearer-token parsing and token validation live in the shared
/// `actix-middleware` crate; this module adds the database lookup that turns
/// a token subject into a stored user.
use crate::db::user_repo;
use crate::error::AppError;
use crate::models::User;
use crate::telemetry::LoggedEmail;
use crate::AppState;
use actix_middleware::AccessSubject;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

/// The user owning the request's access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let subject = AccessSubject::from_request(req, payload);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let AccessSubject(email) = subject.await?;
            let state = state
                .ok_or_else(|| AppError::Internal("AppState not registered".to_string()))?;

            let user = user_repo::find_by_email(&state.db, &email)
                .await?
                .ok_or_else(|| {
                    tracing::debug!(email = %LoggedEmail(&email), "Token subject has no user");
                    AppError::Unauthorized("Could not find user for this token".to_string())
                })?;

            Ok(CurrentUser(user))
        })
    }
}
