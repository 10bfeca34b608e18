use crate::auth::{auth::AuthUser, password::hash_password};
use crate::config::AdminSeed;
use crate::error::AppError;
use crate::model::{
    role::Role,
    worker::{NewWorker, WorkerProfile, WorkerUpdate, WriteOutcome},
};
use crate::store::Store;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

pub const WORKER_STATUSES: [&str; 2] = ["active", "inactive"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorker {
    #[schema(example = "kitchen1")]
    pub id: String,
    #[schema(example = "Kitchen Worker")]
    pub name: String,
    #[schema(example = "kitchen@pizzeria.com", format = "email")]
    pub email: String,
    #[schema(example = "kitchen123")]
    pub password: String,
    /// Defaults to `worker`.
    pub role: Option<Role>,
    #[schema(example = "Kitchen")]
    pub department: Option<String>,
    #[schema(example = "Pizza Chef")]
    pub position: Option<String>,
    /// Defaults to today.
    #[schema(example = "2024-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
}

fn require(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn check_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::validation(format!("{email:?} is not a valid email"))),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[instrument(name = "create_worker", skip(store, req), fields(worker_id = %req.id))]
pub async fn create_worker(
    store: &dyn Store,
    req: CreateWorker,
) -> Result<WorkerProfile, AppError> {
    let id = require("id", &req.id)?;
    let name = require("name", &req.name)?;
    let email = require("email", &req.email)?;
    check_email(&email)?;
    if req.password.is_empty() {
        return Err(AppError::validation("password is required"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::Internal
    })?;

    let new = NewWorker {
        id: id.clone(),
        name,
        email,
        password_hash,
        role: req.role.unwrap_or(Role::Worker),
        department: non_blank(&req.department),
        position: non_blank(&req.position),
        hire_date: req.hire_date.unwrap_or_else(|| Utc::now().date_naive()),
    };

    match store.create_worker(new).await? {
        WriteOutcome::Applied => {}
        WriteOutcome::Duplicate => {
            info!("Worker id or email already taken");
            return Err(AppError::Duplicate("Worker id or email already exists".into()));
        }
        WriteOutcome::NotFound => return Err(AppError::Internal),
    }

    info!("Worker created");
    find_profile(store, &id).await
}

/// Partial update by the worker themself or an admin. Only admins may change `status`.
#[instrument(name = "update_worker", skip(store, caller, update), fields(worker_id = %id))]
pub async fn update_worker(
    store: &dyn Store,
    caller: &AuthUser,
    id: &str,
    update: WorkerUpdate,
) -> Result<WorkerProfile, AppError> {
    caller.require_self_or_admin(id)?;

    if update.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }
    if update.status.is_some() && !caller.is_admin() {
        return Err(AppError::forbidden("Only admins may change a worker's status"));
    }

    let update = WorkerUpdate {
        name: update.name.map(|n| require("name", &n)).transpose()?,
        email: update
            .email
            .map(|e| {
                let e = require("email", &e)?;
                check_email(&e)?;
                Ok::<_, AppError>(e)
            })
            .transpose()?,
        department: update.department.map(|d| d.trim().to_string()),
        position: update.position.map(|p| p.trim().to_string()),
        status: update
            .status
            .map(|s| {
                let s = s.trim().to_lowercase();
                if WORKER_STATUSES.contains(&s.as_str()) {
                    Ok(s)
                } else {
                    Err(AppError::validation(format!(
                        "status must be one of {}",
                        WORKER_STATUSES.join(", ")
                    )))
                }
            })
            .transpose()?,
    };

    match store.update_worker(id, &update).await? {
        WriteOutcome::Applied => {}
        WriteOutcome::NotFound => return Err(AppError::not_found(format!("Worker {id} not found"))),
        WriteOutcome::Duplicate => {
            return Err(AppError::Duplicate("Email already in use".into()));
        }
    }

    info!("Worker updated");
    find_profile(store, id).await
}

pub async fn find_profile(store: &dyn Store, id: &str) -> Result<WorkerProfile, AppError> {
    store
        .find_worker(id)
        .await?
        .map(|w| w.profile())
        .ok_or_else(|| AppError::not_found(format!("Worker {id} not found")))
}

/// Creates the bootstrap admin unless a worker with that email already exists.
pub async fn seed_admin(store: &dyn Store, seed: &AdminSeed) -> anyhow::Result<()> {
    if store.find_worker_by_email(&seed.email).await?.is_some() {
        tracing::debug!(email = %seed.email, "Admin account already present");
        return Ok(());
    }

    let password_hash = hash_password(&seed.password)
        .map_err(|e| anyhow::anyhow!("hash admin password: {e}"))?;

    let outcome = store
        .create_worker(NewWorker {
            id: seed.id.clone(),
            name: "Administrator".to_string(),
            email: seed.email.clone(),
            password_hash,
            role: Role::Admin,
            department: None,
            position: None,
            hire_date: Utc::now().date_naive(),
        })
        .await?;

    match outcome {
        WriteOutcome::Applied => {
            info!(admin_id = %seed.id, "Seeded admin account");
            Ok(())
        }
        other => anyhow::bail!("could not seed admin {}: {other:?}", seed.id),
    }
}
