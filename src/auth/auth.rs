use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::{model::role::Role, models::Claims};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The authenticated caller, taken from the bearer token claims.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub worker_id: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            worker_id: claims.sub,
            email: claims.email,
            role: claims.role,
            department: claims.department,
            position: claims.position,
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Authentication("Authentication required".into()))?;

    header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Authentication("Authorization header must start with Bearer".into()))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Ok(t) => t,
            Err(e) => return ready(Err(e.into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(AppError::Internal.into())),
        };

        match verify_token(token, &config.jwt_secret) {
            Ok(claims) => ready(Ok(claims.into())),
            Err(_) => ready(Err(AppError::Authentication("Invalid or expired token".into()).into())),
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    /// Workers may act on their own records; admins on anyone's.
    pub fn require_self_or_admin(&self, worker_id: &str) -> Result<(), AppError> {
        if self.is_admin() || self.worker_id == worker_id {
            Ok(())
        } else {
            Err(AppError::forbidden("Not allowed to access another worker's records"))
        }
    }

    /// Resolves the worker an attendance action targets.
    pub fn target<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, AppError> {
        match requested.map(str::trim).filter(|id| !id.is_empty()) {
            None => Ok(&self.worker_id),
            Some(id) => {
                self.require_self_or_admin(id)?;
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            worker_id: "kitchen1".into(),
            email: "kitchen@pizzeria.com".into(),
            role,
            department: None,
            position: None,
        }
    }

    #[test]
    fn worker_targets_only_self() {
        let worker = caller(Role::Worker);
        assert_eq!(worker.target(None).unwrap(), "kitchen1");
        assert_eq!(worker.target(Some("kitchen1")).unwrap(), "kitchen1");
        assert_eq!(worker.target(Some("  ")).unwrap(), "kitchen1");
        assert!(matches!(
            worker.target(Some("service1")),
            Err(AppError::Authorization(_))
        ));
        assert!(worker.require_admin().is_err());
    }

    #[test]
    fn admin_targets_anyone() {
        let admin = caller(Role::Admin);
        assert_eq!(admin.target(Some("service1")).unwrap(), "service1");
        assert!(admin.require_self_or_admin("service1").is_ok());
    }
}
