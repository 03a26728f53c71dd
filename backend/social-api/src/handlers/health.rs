/// Health check endpoints
use actix_web::{web, HttpResponse};

use crate::db;
use crate::AppState;

/// Service health with a database round trip
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and database healthy"),
        (status = 503, description = "Database unreachable")
    )
)]
pub async fn health_summary(state: web::Data<AppState>) -> HttpResponse {
    match db::ping(&state.db).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "social-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "error": "Database unavailable",
                "service": "social-api"
            }))
        }
    }
}

/// Process liveness
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
