//! Request correlation ID middleware
//!
//! Extracts or generates unique correlation IDs for request tracing.
//!
//! ## Design
//! - If request has X-Correlation-ID header: use it
//! - Otherwise: generate UUID v4
//! - Store it in request extensions as [`CorrelationId`]
//! - Every log line emitted while handling the request carries it
//!   (the request future runs inside a `request` span)
//! - Echo it back on the response
//!
//! ## Example
//! ```rust,ignore
//! use actix_middleware::CorrelationIdMiddleware;
//! use actix_web::App;
//!
//! let app = App::new()
//!     .wrap(CorrelationIdMiddleware);
//! ```

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use tracing::Instrument;
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Longest inbound id that is accepted as-is; longer ones are replaced
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation ID stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Middleware that manages request correlation IDs
#[derive(Clone, Default)]
pub struct CorrelationIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for CorrelationIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CorrelationIdMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorrelationIdMiddlewareService { service }))
    }
}

pub struct CorrelationIdMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CorrelationIdMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|s| is_acceptable_id(s))
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        req.extensions_mut()
            .insert(CorrelationId(correlation_id.clone()));

        let span = tracing::info_span!(
            "request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.path(),
        );

        let fut = {
            let _entered = span.enter();
            self.service.call(req)
        };

        Box::pin(
            async move {
                let mut res = fut.await?;
                if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
                }
                Ok(res)
            }
            .instrument(span),
        )
    }
}

fn is_acceptable_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CORRELATION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};

    async fn echo_id(req: HttpRequest) -> HttpResponse {
        let id = req
            .extensions()
            .get::<CorrelationId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        HttpResponse::Ok().body(id)
    }

    #[actix_web::test]
    async fn test_generates_id_when_missing() {
        let app = test::init_service(
            App::new()
                .wrap(CorrelationIdMiddleware)
                .route("/", web::get().to(echo_id)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let header = resp
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("header set")
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(header.len(), 36);

        let body = test::read_body(resp).await;
        assert_eq!(body, header.as_bytes());
    }

    #[actix_web::test]
    async fn test_reuses_incoming_id() {
        let app = test::init_service(
            App::new()
                .wrap(CorrelationIdMiddleware)
                .route("/", web::get().to(echo_id)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((CORRELATION_ID_HEADER, "abc-123"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(
            resp.headers().get(CORRELATION_ID_HEADER).unwrap(),
            "abc-123"
        );
    }

    #[actix_web::test]
    async fn test_rejects_unsafe_ids() {
        assert!(is_acceptable_id("req_42.retry-1"));
        assert!(!is_acceptable_id(""));
        assert!(!is_acceptable_id("has space"));
        assert!(!is_acceptable_id(&"x".repeat(200)));
    }
}
