//! Check-in/check-out lifecycle.
//!
//! A worker is `IN` while exactly one of their sessions has no check-out, and
//! `OUT` otherwise. The check-in guard looks at any open session regardless of
//! the calendar day it was opened on; dates only matter for reporting.

use crate::error::AppError;
use crate::store::Store;
use chrono::{DateTime, SubsecRound, Utc};
use derive_more::Display;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "Worker {} not found", _0)]
    WorkerNotFound(String),
    #[display(fmt = "You are already checked in")]
    AlreadyCheckedIn,
    #[display(fmt = "You are not checked in")]
    NotCheckedIn,
    /// Check-out earlier than check-in; never stored as a negative duration.
    #[display(fmt = "Session {} would end before it started", session_id)]
    InvalidDuration { session_id: u64 },
    #[display(fmt = "Data store failure: {}", _0)]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for AttendanceError {
    fn from(e: anyhow::Error) -> Self {
        AttendanceError::Store(e)
    }
}

impl From<AttendanceError> for AppError {
    fn from(e: AttendanceError) -> Self {
        match e {
            AttendanceError::WorkerNotFound(_) => AppError::not_found(e.to_string()),
            AttendanceError::AlreadyCheckedIn => AppError::Conflict {
                error: "Already checked in",
                message: e.to_string(),
            },
            AttendanceError::NotCheckedIn => AppError::Conflict {
                error: "Not checked in",
                message: e.to_string(),
            },
            AttendanceError::InvalidDuration { session_id } => {
                tracing::error!(
                    session_id,
                    "Check-out precedes check-in, refusing to close session"
                );
                AppError::Internal
            }
            AttendanceError::Store(e) => AppError::from(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckInReceipt {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "kitchen1")]
    pub worker_id: String,
    pub check_in_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckOutReceipt {
    #[schema(example = 42)]
    pub id: u64,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: DateTime<Utc>,
    /// Hours formatted to two decimals.
    #[schema(example = "8.50")]
    pub total_hours: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceStatus {
    pub is_checked_in: bool,
    pub last_check_in: Option<DateTime<Utc>>,
    pub session_id: Option<u64>,
}

/// Current time at the ledger's resolution (whole seconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Elapsed hours between check-in and check-out.
pub fn elapsed_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Option<f64> {
    let millis = (check_out - check_in).num_milliseconds();
    if millis < 0 {
        return None;
    }
    Some(millis as f64 / 3_600_000.0)
}

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}

#[instrument(name = "check_in", skip(store, worker_id), fields(worker_id = %worker_id))]
pub async fn check_in(
    store: &dyn Store,
    worker_id: &str,
    at: DateTime<Utc>,
) -> Result<CheckInReceipt, AttendanceError> {
    // 1. existence
    if store.find_worker(worker_id).await?.is_none() {
        info!("Check-in refused: unknown worker");
        return Err(AttendanceError::WorkerNotFound(worker_id.to_string()));
    }

    // 2. conflict
    if let Some(open) = store.open_session(worker_id).await? {
        info!(session_id = open.id, since = %open.check_in_time, "Worker already checked in");
        return Err(AttendanceError::AlreadyCheckedIn);
    }

    // 3. mutation; the store refuses a second open session on its own
    match store.insert_open_session(worker_id, at).await? {
        Some(id) => {
            info!(session_id = id, "Check-in recorded");
            Ok(CheckInReceipt {
                id,
                worker_id: worker_id.to_string(),
                check_in_time: at,
            })
        }
        None => {
            warn!("Concurrent check-in won the race");
            Err(AttendanceError::AlreadyCheckedIn)
        }
    }
}

#[instrument(name = "check_out", skip(store, worker_id), fields(worker_id = %worker_id))]
pub async fn check_out(
    store: &dyn Store,
    worker_id: &str,
    at: DateTime<Utc>,
) -> Result<CheckOutReceipt, AttendanceError> {
    let Some(open) = store.open_session(worker_id).await? else {
        info!("Check-out refused: no open session");
        return Err(AttendanceError::NotCheckedIn);
    };

    let total_hours = elapsed_hours(open.check_in_time, at)
        .ok_or(AttendanceError::InvalidDuration { session_id: open.id })?;

    // Guarded on this session id still being open.
    if !store.close_session(open.id, at, total_hours).await? {
        info!(session_id = open.id, "Session closed by a concurrent check-out");
        return Err(AttendanceError::NotCheckedIn);
    }

    info!(session_id = open.id, total_hours, "Check-out recorded");
    Ok(CheckOutReceipt {
        id: open.id,
        check_in_time: open.check_in_time,
        check_out_time: at,
        total_hours: format_hours(total_hours),
    })
}

pub async fn status(
    store: &dyn Store,
    worker_id: &str,
) -> Result<AttendanceStatus, AttendanceError> {
    let open = store.open_session(worker_id).await?;
    Ok(AttendanceStatus {
        is_checked_in: open.is_some(),
        last_check_in: open.as_ref().map(|s| s.check_in_time),
        session_id: open.map(|s| s.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceEntry, AttendanceSession, DateRange};
    use crate::model::role::Role;
    use crate::model::worker::{NewWorker, Worker, WorkerPresence, WorkerUpdate, WriteOutcome};
    use crate::store::{AttendanceLedger, MemoryStore, WorkerStore};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    async fn store_with(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store
                .create_worker(NewWorker {
                    id: id.to_string(),
                    name: id.to_string(),
                    email: format!("{id}@pizzeria.com"),
                    password_hash: "x".into(),
                    role: Role::Worker,
                    department: None,
                    position: None,
                    hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                })
                .await
                .unwrap();
        }
        store
    }

    async fn open_count(store: &MemoryStore, worker_id: &str) -> usize {
        store
            .sessions_for_worker(worker_id, &DateRange::ALL)
            .await
            .unwrap()
            .iter()
            .filter(|s| s.is_open())
            .count()
    }

    /// Reads come from a real store; every write reports that another
    /// request got there between our read and our write.
    struct LosingWrites {
        inner: MemoryStore,
        close_calls: AtomicUsize,
    }

    #[async_trait]
    impl WorkerStore for LosingWrites {
        async fn find_worker(&self, id: &str) -> anyhow::Result<Option<Worker>> {
            self.inner.find_worker(id).await
        }

        async fn find_worker_by_email(&self, email: &str) -> anyhow::Result<Option<Worker>> {
            self.inner.find_worker_by_email(email).await
        }

        async fn list_workers(&self) -> anyhow::Result<Vec<WorkerPresence>> {
            self.inner.list_workers().await
        }

        async fn create_worker(&self, worker: NewWorker) -> anyhow::Result<WriteOutcome> {
            self.inner.create_worker(worker).await
        }

        async fn update_worker(
            &self,
            id: &str,
            update: &WorkerUpdate,
        ) -> anyhow::Result<WriteOutcome> {
            self.inner.update_worker(id, update).await
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl AttendanceLedger for LosingWrites {
        async fn open_session(&self, worker_id: &str) -> anyhow::Result<Option<AttendanceSession>> {
            self.inner.open_session(worker_id).await
        }

        async fn insert_open_session(
            &self,
            _worker_id: &str,
            _check_in_time: DateTime<Utc>,
        ) -> anyhow::Result<Option<u64>> {
            Ok(None)
        }

        async fn close_session(
            &self,
            _session_id: u64,
            _check_out_time: DateTime<Utc>,
            _total_hours: f64,
        ) -> anyhow::Result<bool> {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn sessions_for_worker(
            &self,
            worker_id: &str,
            range: &DateRange,
        ) -> anyhow::Result<Vec<AttendanceSession>> {
            self.inner.sessions_for_worker(worker_id, range).await
        }

        async fn list_entries(
            &self,
            worker_id: Option<&str>,
            range: &DateRange,
        ) -> anyhow::Result<Vec<AttendanceEntry>> {
            self.inner.list_entries(worker_id, range).await
        }
    }

    async fn losing_writes(ids: &[&str]) -> LosingWrites {
        LosingWrites {
            inner: store_with(ids).await,
            close_calls: AtomicUsize::new(0),
        }
    }

    #[actix_web::test]
    async fn full_shift_is_eight_and_a_half_hours() {
        let store = store_with(&["w1"]).await;

        let receipt = check_in(&store, "w1", at(10, 9, 0)).await.unwrap();
        assert_eq!(receipt.check_in_time, at(10, 9, 0));
        assert!(status(&store, "w1").await.unwrap().is_checked_in);

        let out = check_out(&store, "w1", at(10, 17, 30)).await.unwrap();
        assert_eq!(out.id, receipt.id);
        assert_eq!(out.total_hours, "8.50");

        let state = status(&store, "w1").await.unwrap();
        assert!(!state.is_checked_in);
        assert!(state.last_check_in.is_none());

        let sessions = store.sessions_for_worker("w1", &DateRange::ALL).await.unwrap();
        assert_eq!(sessions[0].total_hours, Some(8.5));
    }

    #[actix_web::test]
    async fn second_check_in_is_refused_without_mutation() {
        let store = store_with(&["w1"]).await;
        check_in(&store, "w1", at(10, 9, 0)).await.unwrap();

        let err = check_in(&store, "w1", at(10, 9, 1)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedIn));

        let sessions = store.sessions_for_worker("w1", &DateRange::ALL).await.unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[actix_web::test]
    async fn session_left_open_yesterday_still_blocks_check_in() {
        let store = store_with(&["w1"]).await;
        check_in(&store, "w1", at(9, 22, 0)).await.unwrap();

        let err = check_in(&store, "w1", at(10, 8, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedIn));

        // and the overnight session can still be closed
        let out = check_out(&store, "w1", at(10, 6, 0)).await.unwrap();
        assert_eq!(out.total_hours, "8.00");
    }

    #[actix_web::test]
    async fn check_out_when_out_is_refused() {
        let store = store_with(&["w1"]).await;
        let err = check_out(&store, "w1", at(10, 17, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotCheckedIn));
        assert!(store.sessions_for_worker("w1", &DateRange::ALL).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_worker_cannot_check_in() {
        let store = store_with(&[]).await;
        let err = check_in(&store, "ghost", at(10, 9, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::WorkerNotFound(_)));
    }

    #[actix_web::test]
    async fn check_out_before_check_in_is_a_data_error() {
        let store = store_with(&["w1"]).await;
        check_in(&store, "w1", at(10, 9, 0)).await.unwrap();

        let err = check_out(&store, "w1", at(10, 8, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidDuration { .. }));
        // left open rather than closed with a negative duration
        assert_eq!(open_count(&store, "w1").await, 1);
    }

    #[actix_web::test]
    async fn refused_insert_after_clear_read_is_already_checked_in() {
        let store = losing_writes(&["w1"]).await;

        let err = check_in(&store, "w1", at(10, 9, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedIn));
        assert_eq!(open_count(&store.inner, "w1").await, 0);
    }

    #[actix_web::test]
    async fn refused_close_after_open_read_is_not_checked_in() {
        let store = losing_writes(&["w1"]).await;
        store.inner.insert_open_session("w1", at(10, 9, 0)).await.unwrap();

        let err = check_out(&store, "w1", at(10, 17, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotCheckedIn));
        assert_eq!(store.close_calls.load(Ordering::SeqCst), 1);
        // nothing was closed on the caller's behalf
        assert_eq!(open_count(&store.inner, "w1").await, 1);
    }

    #[actix_web::test]
    async fn stale_open_session_read_cannot_close_twice() {
        let store = store_with(&["w1"]).await;
        check_in(&store, "w1", at(10, 9, 0)).await.unwrap();

        // both callers read the same open session before either writes
        let seen_a = store.open_session("w1").await.unwrap().unwrap();
        let seen_b = store.open_session("w1").await.unwrap().unwrap();
        assert_eq!(seen_a.id, seen_b.id);

        assert!(store.close_session(seen_a.id, at(10, 17, 0), 8.0).await.unwrap());
        assert!(!store.close_session(seen_b.id, at(10, 17, 5), 8.08).await.unwrap());

        let sessions = store.sessions_for_worker("w1", &DateRange::ALL).await.unwrap();
        assert_eq!(sessions[0].check_out_time, Some(at(10, 17, 0)));
    }

    #[actix_web::test]
    async fn at_most_one_open_session_after_any_sequence() {
        let store = store_with(&["w1", "w2"]).await;
        // deterministic mix of legal and illegal transitions
        let script = [
            ("w1", true),
            ("w1", true),
            ("w2", true),
            ("w1", false),
            ("w1", false),
            ("w2", true),
            ("w1", true),
            ("w2", false),
            ("w2", false),
            ("w1", true),
        ];
        for (minute, (worker, is_check_in)) in script.iter().enumerate() {
            let when = at(10, 9, minute as u32);
            let _ = if *is_check_in {
                check_in(&store, worker, when).await.map(|_| ())
            } else {
                check_out(&store, worker, when).await.map(|_| ())
            };
            for id in ["w1", "w2"] {
                assert!(open_count(&store, id).await <= 1);
            }
        }
        assert_eq!(open_count(&store, "w1").await, 1);
        assert_eq!(open_count(&store, "w2").await, 0);
    }

    #[test]
    fn elapsed_hours_never_negative() {
        assert_eq!(elapsed_hours(at(10, 9, 0), at(10, 9, 0)), Some(0.0));
        assert_eq!(elapsed_hours(at(10, 9, 0), at(10, 8, 59)), None);
        assert_eq!(format_hours(elapsed_hours(at(10, 9, 0), at(10, 9, 20)).unwrap()), "0.33");
    }

    #[test]
    fn attendance_errors_map_to_http_taxonomy() {
        use actix_web::ResponseError;
        use actix_web::http::StatusCode;

        let conflict: AppError = AttendanceError::AlreadyCheckedIn.into();
        assert_eq!(conflict.status_code(), StatusCode::BAD_REQUEST);
        let missing: AppError = AttendanceError::WorkerNotFound("x".into()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        let data: AppError = AttendanceError::InvalidDuration { session_id: 1 }.into();
        assert_eq!(data.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
