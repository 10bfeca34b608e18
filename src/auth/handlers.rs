use crate::{
    auth::{
        jwt::{claims_for, generate_token},
        password::verify_password,
    },
    config::Config,
    error::AppError,
    model::{role::Role, worker::Worker},
    models::{LoginReqDto, LoginResponse, WorkerLoginReqDto},
    store::Store,
};
use actix_web::{HttpResponse, web};
use tracing::{debug, info, instrument};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn invalid_credentials() -> AppError {
    AppError::Authentication(INVALID_CREDENTIALS.into())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Checks the password and issues a token. Unknown user and wrong password
/// produce the same error.
fn issue_token(
    worker: Option<Worker>,
    password: &str,
    config: &Config,
    with_profile: bool,
) -> Result<LoginResponse, AppError> {
    let Some(worker) = worker else {
        info!("Invalid credentials: user not found");
        return Err(invalid_credentials());
    };

    if let Err(e) = verify_password(password, &worker.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid_credentials());
    }
    debug!("Password verified");

    let claims = claims_for(&worker, config.token_ttl, with_profile);
    let token = generate_token(&claims, &config.jwt_secret).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign token");
        AppError::Internal
    })?;

    info!(worker_id = %worker.id, role = %worker.role, "Login successful");
    Ok(LoginResponse {
        success: true,
        token,
        user: worker.profile(),
    })
}

/// Login with email and password (any role)
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(store, config, body))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let (Some(email), Some(password)) = (present(&body.email), body.password.as_deref()) else {
        return Err(AppError::validation("Email and password are required"));
    };
    if password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let worker = store.find_worker_by_email(email).await?;
    let response = issue_token(worker, password, &config, false)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Worker login by id or email. Admin accounts are refused here.
#[utoipa::path(
    post,
    path = "/api/worker-login",
    request_body = WorkerLoginReqDto,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing identifier or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_worker_login", skip(store, config, body))]
pub async fn worker_login(
    body: web::Json<WorkerLoginReqDto>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Worker login request received");

    let password = body.password.as_deref().filter(|p| !p.is_empty());
    let identifier = present(&body.id).or_else(|| present(&body.email));
    let (Some(identifier), Some(password)) = (identifier, password) else {
        return Err(AppError::validation("Worker ID or email and password are required"));
    };

    let worker = if identifier.contains('@') {
        store.find_worker_by_email(identifier).await?
    } else {
        store.find_worker(identifier).await?
    };
    let worker = worker.filter(|w| w.role == Role::Worker);

    let response = issue_token(worker, password, &config, true)?;
    Ok(HttpResponse::Ok().json(response))
}
