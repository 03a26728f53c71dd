use actix_web::{
    dev::Payload,
    http::{header, StatusCode},
    FromRequest, HttpRequest, HttpResponse, ResponseError,
};
use crypto_core::jwt::{self, TokenError, TokenType};
use std::future::{ready, Ready};

/// Authentication failures raised while reading a bearer token
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header on the request
    #[error("Not authenticated")]
    MissingCredentials,

    /// Token present but refused
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Token(TokenError::NotInitialized | TokenError::Encoding(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        tracing::warn!("HTTPException: {} {}", status.as_u16(), self);

        let mut builder = HttpResponse::build(status);
        if status == StatusCode::UNAUTHORIZED {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        builder.json(serde_json::json!({
            "detail": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

/// Raw bearer token from the `Authorization` header
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn from_request_headers(req: &HttpRequest) -> Result<Self, AuthError> {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let (scheme, token) = value
            .split_once(' ')
            .ok_or(AuthError::MissingCredentials)?;

        if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        Ok(BearerToken(token.trim().to_string()))
    }
}

impl FromRequest for BearerToken {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_request_headers(req))
    }
}

/// Email subject of a validated access token
///
/// Extracting this validates the bearer token as an *access* token; a
/// confirmation token is refused with [`TokenError::WrongType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSubject(pub String);

impl FromRequest for AccessSubject {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = BearerToken::from_request_headers(req).and_then(|BearerToken(token)| {
            jwt::validate_token(&token, TokenType::Access)
                .map(AccessSubject)
                .map_err(|e| {
                    tracing::debug!("JWT validation failed: {}", e);
                    AuthError::from(e)
                })
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    fn init_test_secret() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            jwt::initialize_jwt_secret("actix-middleware-test-secret")
                .expect("Failed to initialize test secret");
        });
    }

    async fn whoami(subject: AccessSubject) -> HttpResponse {
        HttpResponse::Ok().body(subject.0)
    }

    #[actix_web::test]
    async fn test_valid_access_token() {
        init_test_secret();
        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;

        let token = jwt::generate_access_token("ada@example.com").unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "ada@example.com");
    }

    #[actix_web::test]
    async fn test_missing_header_is_unauthorized() {
        init_test_secret();
        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[actix_web::test]
    async fn test_confirmation_token_is_refused() {
        init_test_secret();
        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;

        let token = jwt::generate_confirmation_token("ada@example.com").unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Token has incorrect type, expected access");
    }

    #[actix_web::test]
    async fn test_non_bearer_scheme_is_refused() {
        let req = test::TestRequest::get()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(matches!(
            BearerToken::from_request_headers(&req),
            Err(AuthError::MissingCredentials)
        ));
    }
}
