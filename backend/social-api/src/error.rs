/// Error types for the social API
///
/// Every failure a handler can produce is an [`AppError`]. Errors render as
/// `{"detail": ..., "status": ...}` and are logged once, as
/// `HTTPException: {status} {detail}`, when the response is built.
use actix_middleware::AuthError;
use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError},
    http::{header, StatusCode},
    HttpRequest, HttpResponse, ResponseError,
};
use crypto_core::{PasswordError, TokenError};

/// Result type for social-api operations
pub type Result<T> = std::result::Result<T, AppError>;

const HIDDEN_DETAIL: &str = "Internal server error";

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// Authentication failure; the response carries `WWW-Authenticate: Bearer`
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Malformed or invalid request body, query, form or path
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Mail or image API failure
    #[error("{0}")]
    ExternalService(String),

    /// Upload failure reported to the client as-is
    #[error("{0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message sent to the client; server-side failures are not described
    pub fn detail(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => HIDDEN_DETAIL.to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let detail = self.detail();

        if status.is_server_error() {
            tracing::error!(error = %self, "HTTPException: {} {}", status.as_u16(), detail);
        } else {
            tracing::warn!("HTTPException: {} {}", status.as_u16(), detail);
        }

        let mut builder = HttpResponse::build(status);
        if let AppError::Unauthorized(_) = self {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        builder.json(serde_json::json!({
            "detail": detail,
            "status": status.as_u16(),
        }))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotInitialized | TokenError::Encoding(_) => {
                AppError::Internal(err.to_string())
            }
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(token_err) => token_err.into(),
            missing @ AuthError::MissingCredentials => AppError::Unauthorized(missing.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

// ============================================================================
// Extractor error handlers
// ============================================================================

/// Rejected JSON bodies become 422 responses
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

/// Rejected query strings become 422 responses
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

/// Rejected url-encoded forms become 422 responses
pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

/// Unparsable path segments become 422 responses
pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let resp = err.error_response();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_client_errors_expose_detail() {
        let body = body_json(AppError::NotFound("Post not found".into())).await;
        assert_eq!(body["detail"], "Post not found");
        assert_eq!(body["status"], 404);
    }

    #[actix_web::test]
    async fn test_server_errors_hide_detail() {
        let body = body_json(AppError::Database(sqlx::Error::PoolTimedOut)).await;
        assert_eq!(body["detail"], "Internal server error");
        assert_eq!(body["status"], 500);
    }

    #[test]
    fn test_unauthorized_sets_bearer_challenge() {
        let resp = AppError::Unauthorized("Invalid token".into()).error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn test_token_errors_map_to_statuses() {
        assert_eq!(
            AppError::from(TokenError::Expired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(TokenError::Expired).to_string(),
            "Token has expired"
        );
        assert_eq!(
            AppError::from(TokenError::NotInitialized).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(AuthError::MissingCredentials).to_string(),
            "Not authenticated"
        );
    }

    #[actix_web::test]
    async fn test_storage_errors_keep_their_message() {
        let body = body_json(AppError::Storage(
            "There was an error uploading the file".into(),
        ))
        .await;
        assert_eq!(body["detail"], "There was an error uploading the file");
        assert_eq!(body["status"], 500);
    }

    #[test]
    fn test_validation_is_unprocessable() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
