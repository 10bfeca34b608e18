//! Persistence seam. Handlers and services only ever see `dyn Store`.

pub mod memory;
pub mod mysql;

use crate::model::{
    attendance::{AttendanceEntry, AttendanceSession, DateRange},
    worker::{NewWorker, Worker, WorkerPresence, WorkerUpdate, WriteOutcome},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Credential store: worker records and profiles.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    async fn find_worker(&self, id: &str) -> anyhow::Result<Option<Worker>>;

    async fn find_worker_by_email(&self, email: &str) -> anyhow::Result<Option<Worker>>;

    /// Workers of role `worker`, ordered by name, with their attendance state.
    async fn list_workers(&self) -> anyhow::Result<Vec<WorkerPresence>>;

    async fn create_worker(&self, worker: NewWorker) -> anyhow::Result<WriteOutcome>;

    async fn update_worker(&self, id: &str, update: &WorkerUpdate) -> anyhow::Result<WriteOutcome>;

    async fn ping(&self) -> anyhow::Result<()>;
}

/// Attendance ledger. Only the attendance service writes to it.
#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Most recently opened session without a check-out, if any.
    async fn open_session(&self, worker_id: &str) -> anyhow::Result<Option<AttendanceSession>>;

    /// Opens a session. Returns `None` when the worker already has an open one.
    async fn insert_open_session(
        &self,
        worker_id: &str,
        check_in_time: DateTime<Utc>,
    ) -> anyhow::Result<Option<u64>>;

    /// Closes exactly this session if it is still open. `false` means another
    /// caller closed it first (or it never existed).
    async fn close_session(
        &self,
        session_id: u64,
        check_out_time: DateTime<Utc>,
        total_hours: f64,
    ) -> anyhow::Result<bool>;

    /// All sessions of one worker, newest first.
    async fn sessions_for_worker(
        &self,
        worker_id: &str,
        range: &DateRange,
    ) -> anyhow::Result<Vec<AttendanceSession>>;

    /// Sessions joined with worker profiles, newest first.
    async fn list_entries(
        &self,
        worker_id: Option<&str>,
        range: &DateRange,
    ) -> anyhow::Result<Vec<AttendanceEntry>>;
}

pub trait Store: WorkerStore + AttendanceLedger {}

impl<T: WorkerStore + AttendanceLedger> Store for T {}
