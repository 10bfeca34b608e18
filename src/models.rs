use crate::model::{role::Role, worker::WorkerProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin@pizzeria.com")]
    pub email: Option<String>,
    #[schema(example = "admin123")]
    pub password: Option<String>,
}

/// Worker login accepts either the worker id or the email as identifier.
#[derive(Deserialize, ToSchema)]
pub struct WorkerLoginReqDto {
    #[schema(example = "kitchen1")]
    pub id: Option<String>,
    #[schema(example = "kitchen@pizzeria.com")]
    pub email: Option<String>,
    #[schema(example = "kitchen123")]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: WorkerProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Worker id
    pub sub: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}
