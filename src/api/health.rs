use crate::store::Store;
use actix_web::{HttpResponse, web};
use serde_json::json;

/// Liveness plus a store round trip
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and store reachable", body = Object, example = json!({
            "success": true,
            "status": "ok"
        })),
        (status = 503, description = "Store unreachable")
    ),
    tag = "Health"
)]
pub async fn health(store: web::Data<dyn Store>) -> HttpResponse {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "status": "ok" })),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "success": false,
                "status": "unavailable"
            }))
        }
    }
}
