use super::role::Role;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Worker record as held by the credential store.
#[derive(Debug, Clone)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: String,
}

impl Worker {
    pub fn profile(&self) -> WorkerProfile {
        WorkerProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            department: self.department.clone(),
            position: self.position.clone(),
            hire_date: self.hire_date,
            status: self.status.clone(),
        }
    }
}

/// Public view of a worker; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "kitchen1",
    "name": "Kitchen Worker",
    "email": "kitchen@pizzeria.com",
    "role": "worker",
    "department": "Kitchen",
    "position": "Pizza Chef",
    "hire_date": "2024-01-01",
    "status": "active"
}))]
pub struct WorkerProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: String,
}

/// Fields for a new worker; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewWorker {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct WorkerUpdate {
    #[schema(example = "Kitchen Worker")]
    pub name: Option<String>,
    #[schema(example = "kitchen@pizzeria.com")]
    pub email: Option<String>,
    #[schema(example = "Kitchen")]
    pub department: Option<String>,
    #[schema(example = "Pizza Chef")]
    pub position: Option<String>,
    #[schema(example = "active")]
    pub status: Option<String>,
}

impl WorkerUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.department.is_none()
            && self.position.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Presence {
    /// Has an open attendance session.
    Active,
    Passive,
}

/// Roster row: a worker together with their current attendance state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkerPresence {
    #[serde(flatten)]
    pub worker: WorkerProfile,
    pub presence: Presence,
    pub latest_check_in: Option<DateTime<Utc>>,
    pub latest_check_out: Option<DateTime<Utc>>,
}

/// Result of a write against the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    NotFound,
    /// Unique id or email already taken.
    Duplicate,
}
