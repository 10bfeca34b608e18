use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every failure a handler can return. Rendered as `{success, error, message}`.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Authentication(String),
    #[display(fmt = "{}", _0)]
    Authorization(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    /// Business-rule violation such as checking in twice.
    #[display(fmt = "{}", message)]
    Conflict { error: &'static str, message: String },
    #[display(fmt = "{}", _0)]
    Duplicate(String),
    #[display(fmt = "An unexpected error occurred")]
    DataStore,
    #[display(fmt = "An unexpected error occurred")]
    Internal,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// Short machine-readable label used as the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation error",
            AppError::Authentication(_) => "Authentication failed",
            AppError::Authorization(_) => "Unauthorized",
            AppError::NotFound(_) => "Not found",
            AppError::Conflict { error, .. } => *error,
            AppError::Duplicate(_) => "Duplicate",
            AppError::DataStore => "Database error",
            AppError::Internal => "Internal server error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::DataStore | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

/// Store failures are logged here and never reach the client.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{e:#}"), "Data store failure");
        AppError::DataStore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn conflict_renders_structured_body() {
        let err = AppError::Conflict {
            error: "Already checked in",
            message: "You are already checked in".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Already checked in");
        assert_eq!(value["message"], "You are already checked in");
    }

    #[test]
    fn store_errors_hide_details() {
        let err: AppError = anyhow::anyhow!("connection refused on 10.0.0.3").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("10.0.0.3"));
    }
}
