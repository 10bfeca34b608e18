use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::worker::{WorkerPresence, WorkerProfile, WorkerUpdate};
use crate::service::worker::{self as roster, CreateWorker};
use crate::store::Store;
use actix_web::{HttpResponse, web};
use serde_json::json;

/// List workers with their presence (admin)
#[utoipa::path(
    get,
    path = "/api/workers",
    responses(
        (status = 200, description = "Workers ordered by name", body = [WorkerPresence]),
        (status = 403, description = "Admin only")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_workers(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let workers = store.list_workers().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": workers.len(),
        "data": workers,
    })))
}

/// Create Worker (admin)
#[utoipa::path(
    post,
    path = "/api/workers",
    request_body = CreateWorker,
    responses(
        (status = 201, description = "Worker created", body = WorkerProfile),
        (status = 400, description = "Missing field or malformed email"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Worker id or email already exists", body = Object, example = json!({
            "success": false,
            "error": "Duplicate",
            "message": "Worker id or email already exists"
        }))
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_worker(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    payload: web::Json<CreateWorker>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let profile = roster::create_worker(store.get_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Worker created successfully",
        "data": profile,
    })))
}

/// Get Worker (self or admin)
#[utoipa::path(
    get,
    path = "/api/workers/{id}",
    params(("id" = String, Path, description = "Worker id")),
    responses(
        (status = 200, description = "Worker profile", body = WorkerProfile),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Worker not found")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_worker(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_self_or_admin(&path)?;

    let profile = roster::find_profile(store.get_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": profile })))
}

/// Update Worker (self or admin; status is admin only)
#[utoipa::path(
    put,
    path = "/api/workers/{id}",
    params(("id" = String, Path, description = "Worker id")),
    request_body = WorkerUpdate,
    responses(
        (status = 200, description = "Updated profile", body = WorkerProfile),
        (status = 400, description = "Nothing to update"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Worker not found"),
        (status = 409, description = "Email already in use")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_worker(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    payload: web::Json<WorkerUpdate>,
) -> Result<HttpResponse, AppError> {
    let profile =
        roster::update_worker(store.get_ref(), &auth, &path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Worker updated successfully",
        "data": profile,
    })))
}
