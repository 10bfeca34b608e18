use crate::auth::auth::{AuthUser, bearer_token};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Rejects the request before any handler runs unless it carries a valid bearer token.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = match req.app_data::<Data<Config>>() {
        Some(config) => config.jwt_secret.clone(),
        None => {
            tracing::error!("App config missing from app data");
            return Ok(req.error_response(AppError::Internal));
        }
    };

    let claims = match bearer_token(req.request()) {
        Ok(token) => verify_token(token, &secret).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AppError::Authentication("Invalid or expired token".into())
        }),
        Err(e) => Err(e),
    };

    match claims {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser::from(claims));
            next.call(req).await
        }
        Err(e) => {
            let resp = e.error_response();
            Ok(req.into_response(resp))
        }
    }
}
