use super::{AttendanceLedger, WorkerStore};
use crate::model::{
    attendance::{AttendanceEntry, AttendanceSession, DateRange, SessionStatus},
    role::Role,
    worker::{NewWorker, Presence, Worker, WorkerPresence, WorkerUpdate, WriteOutcome},
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    workers: Vec<Worker>,
    sessions: Vec<AttendanceSession>,
    next_session_id: u64,
}

impl Inner {
    fn open_session(&self, worker_id: &str) -> Option<&AttendanceSession> {
        self.sessions
            .iter()
            .filter(|s| s.worker_id == worker_id && s.is_open())
            .max_by_key(|s| (s.check_in_time, s.id))
    }

    fn email_taken(&self, email: &str, except_id: Option<&str>) -> bool {
        self.workers
            .iter()
            .any(|w| w.email.eq_ignore_ascii_case(email) && Some(w.id.as_str()) != except_id)
    }
}

/// In-process store. Every operation runs under one lock, which gives the
/// same single-row guarantees the MySQL store gets from its conditional writes.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn newest_first(sessions: &mut [AttendanceSession]) {
        sessions.sort_by(|a, b| {
            b.check_in_time
                .cmp(&a.check_in_time)
                .then_with(|| b.id.cmp(&a.id))
        });
    }
}

#[async_trait]
impl WorkerStore for MemoryStore {
    async fn find_worker(&self, id: &str) -> anyhow::Result<Option<Worker>> {
        Ok(self.lock()?.workers.iter().find(|w| w.id == id).cloned())
    }

    async fn find_worker_by_email(&self, email: &str) -> anyhow::Result<Option<Worker>> {
        Ok(self
            .lock()?
            .workers
            .iter()
            .find(|w| w.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_workers(&self) -> anyhow::Result<Vec<WorkerPresence>> {
        let inner = self.lock()?;
        let mut roster: Vec<WorkerPresence> = inner
            .workers
            .iter()
            .filter(|w| w.role == Role::Worker)
            .map(|w| {
                let latest = inner
                    .sessions
                    .iter()
                    .filter(|s| s.worker_id == w.id)
                    .max_by_key(|s| (s.check_in_time, s.id));
                WorkerPresence {
                    worker: w.profile(),
                    presence: if inner.open_session(&w.id).is_some() {
                        Presence::Active
                    } else {
                        Presence::Passive
                    },
                    latest_check_in: latest.map(|s| s.check_in_time),
                    latest_check_out: latest.and_then(|s| s.check_out_time),
                }
            })
            .collect();
        roster.sort_by(|a, b| a.worker.name.cmp(&b.worker.name));
        Ok(roster)
    }

    async fn create_worker(&self, worker: NewWorker) -> anyhow::Result<WriteOutcome> {
        let mut inner = self.lock()?;
        if inner.workers.iter().any(|w| w.id == worker.id) || inner.email_taken(&worker.email, None)
        {
            return Ok(WriteOutcome::Duplicate);
        }
        inner.workers.push(Worker {
            id: worker.id,
            name: worker.name,
            email: worker.email,
            password_hash: worker.password_hash,
            role: worker.role,
            department: worker.department,
            position: worker.position,
            hire_date: Some(worker.hire_date),
            status: "active".to_string(),
        });
        Ok(WriteOutcome::Applied)
    }

    async fn update_worker(&self, id: &str, update: &WorkerUpdate) -> anyhow::Result<WriteOutcome> {
        let mut inner = self.lock()?;
        if let Some(email) = &update.email {
            if inner.email_taken(email, Some(id)) {
                return Ok(WriteOutcome::Duplicate);
            }
        }
        let Some(worker) = inner.workers.iter_mut().find(|w| w.id == id) else {
            return Ok(WriteOutcome::NotFound);
        };
        if let Some(name) = &update.name {
            worker.name = name.clone();
        }
        if let Some(email) = &update.email {
            worker.email = email.clone();
        }
        if let Some(department) = &update.department {
            worker.department = Some(department.clone());
        }
        if let Some(position) = &update.position {
            worker.position = Some(position.clone());
        }
        if let Some(status) = &update.status {
            worker.status = status.clone();
        }
        Ok(WriteOutcome::Applied)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn open_session(&self, worker_id: &str) -> anyhow::Result<Option<AttendanceSession>> {
        Ok(self.lock()?.open_session(worker_id).cloned())
    }

    async fn insert_open_session(
        &self,
        worker_id: &str,
        check_in_time: DateTime<Utc>,
    ) -> anyhow::Result<Option<u64>> {
        let mut inner = self.lock()?;
        if inner.open_session(worker_id).is_some() {
            return Ok(None);
        }
        inner.next_session_id += 1;
        let id = inner.next_session_id;
        inner.sessions.push(AttendanceSession {
            id,
            worker_id: worker_id.to_string(),
            check_in_time,
            check_out_time: None,
            total_hours: None,
            status: SessionStatus::Active,
            created_at: check_in_time,
            updated_at: check_in_time,
        });
        Ok(Some(id))
    }

    async fn close_session(
        &self,
        session_id: u64,
        check_out_time: DateTime<Utc>,
        total_hours: f64,
    ) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        match inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.is_open())
        {
            Some(session) => {
                session.check_out_time = Some(check_out_time);
                session.total_hours = Some(total_hours);
                session.status = SessionStatus::Completed;
                session.updated_at = check_out_time;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sessions_for_worker(
        &self,
        worker_id: &str,
        range: &DateRange,
    ) -> anyhow::Result<Vec<AttendanceSession>> {
        let mut sessions: Vec<AttendanceSession> = self
            .lock()?
            .sessions
            .iter()
            .filter(|s| s.worker_id == worker_id && range.contains(&s.check_in_time))
            .cloned()
            .collect();
        Self::newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn list_entries(
        &self,
        worker_id: Option<&str>,
        range: &DateRange,
    ) -> anyhow::Result<Vec<AttendanceEntry>> {
        let inner = self.lock()?;
        let mut sessions: Vec<AttendanceSession> = inner
            .sessions
            .iter()
            .filter(|s| worker_id.is_none_or(|id| s.worker_id == id))
            .filter(|s| range.contains(&s.check_in_time))
            .cloned()
            .collect();
        Self::newest_first(&mut sessions);

        // inner join: sessions of unknown workers are dropped
        Ok(sessions
            .into_iter()
            .filter_map(|session| {
                let worker = inner.workers.iter().find(|w| w.id == session.worker_id)?;
                Some(AttendanceEntry {
                    worker_name: worker.name.clone(),
                    worker_email: worker.email.clone(),
                    department: worker.department.clone(),
                    position: worker.position.clone(),
                    session,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::{NaiveDate, TimeZone};

    fn worker(id: &str, name: &str, role: Role) -> NewWorker {
        NewWorker {
            id: id.into(),
            name: name.into(),
            email: format!("{id}@pizzeria.com"),
            password_hash: "x".into(),
            role,
            department: Some("Kitchen".into()),
            position: None,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    #[actix_web::test]
    async fn second_open_session_is_refused() {
        let store = MemoryStore::new();
        assert!(store.insert_open_session("w1", at(10, 9)).await.unwrap().is_some());
        assert!(store.insert_open_session("w1", at(10, 10)).await.unwrap().is_none());
        // other workers are unaffected
        assert!(store.insert_open_session("w2", at(10, 10)).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn close_is_conditional_on_still_open() {
        let store = MemoryStore::new();
        let id = store.insert_open_session("w1", at(10, 9)).await.unwrap().unwrap();

        assert!(store.close_session(id, at(10, 17), 8.0).await.unwrap());
        assert!(!store.close_session(id, at(10, 18), 9.0).await.unwrap());

        let sessions = store.sessions_for_worker("w1", &DateRange::ALL).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].total_hours, Some(8.0));
        assert_eq!(sessions[0].status, SessionStatus::Completed);
    }

    #[actix_web::test]
    async fn duplicate_id_or_email_is_reported() {
        let store = MemoryStore::new();
        assert_eq!(
            store.create_worker(worker("w1", "Ann", Role::Worker)).await.unwrap(),
            WriteOutcome::Applied
        );
        assert_eq!(
            store.create_worker(worker("w1", "Bob", Role::Worker)).await.unwrap(),
            WriteOutcome::Duplicate
        );

        let mut same_email = worker("w2", "Bob", Role::Worker);
        same_email.email = "W1@pizzeria.com".into();
        assert_eq!(store.create_worker(same_email).await.unwrap(), WriteOutcome::Duplicate);
    }

    #[actix_web::test]
    async fn roster_lists_workers_by_name_with_presence() {
        let store = MemoryStore::new();
        store.create_worker(worker("w2", "Zoe", Role::Worker)).await.unwrap();
        store.create_worker(worker("w1", "Ann", Role::Worker)).await.unwrap();
        store.create_worker(worker("a1", "Admin", Role::Admin)).await.unwrap();

        let id = store.insert_open_session("w1", at(9, 9)).await.unwrap().unwrap();
        store.close_session(id, at(9, 17), 8.0).await.unwrap();
        store.insert_open_session("w1", at(10, 9)).await.unwrap();

        let roster = store.list_workers().await.unwrap();
        let names: Vec<&str> = roster.iter().map(|r| r.worker.name.as_str()).collect();
        assert_eq!(names, ["Ann", "Zoe"]);
        assert_eq!(roster[0].presence, Presence::Active);
        assert_eq!(roster[0].latest_check_in, Some(at(10, 9)));
        assert_eq!(roster[0].latest_check_out, None);
        assert_eq!(roster[1].presence, Presence::Passive);
        assert_eq!(roster[1].latest_check_in, None);
    }

    #[actix_web::test]
    async fn update_rejects_taken_email_and_unknown_worker() {
        let store = MemoryStore::new();
        store.create_worker(worker("w1", "Ann", Role::Worker)).await.unwrap();
        store.create_worker(worker("w2", "Bob", Role::Worker)).await.unwrap();

        let taken = WorkerUpdate {
            email: Some("w2@pizzeria.com".into()),
            ..Default::default()
        };
        assert_eq!(store.update_worker("w1", &taken).await.unwrap(), WriteOutcome::Duplicate);

        let rename = WorkerUpdate {
            name: Some("Anna".into()),
            ..Default::default()
        };
        assert_eq!(store.update_worker("nobody", &rename).await.unwrap(), WriteOutcome::NotFound);
        assert_eq!(store.update_worker("w1", &rename).await.unwrap(), WriteOutcome::Applied);
        assert_eq!(store.find_worker("w1").await.unwrap().unwrap().name, "Anna");
    }

    #[actix_web::test]
    async fn entries_join_worker_profile_and_filter_by_range() {
        let store = MemoryStore::new();
        store.create_worker(worker("w1", "Ann", Role::Worker)).await.unwrap();
        let first = store.insert_open_session("w1", at(9, 9)).await.unwrap().unwrap();
        store.close_session(first, at(9, 17), 8.0).await.unwrap();
        store.insert_open_session("w1", at(11, 9)).await.unwrap();

        let all = store.list_entries(None, &DateRange::ALL).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].session.check_in_time, at(11, 9));
        assert_eq!(all[0].worker_name, "Ann");

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 9),
            NaiveDate::from_ymd_opt(2024, 1, 10),
        )
        .unwrap();
        let filtered = store.list_entries(Some("w1"), &range).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].session.id, first);
    }
}
