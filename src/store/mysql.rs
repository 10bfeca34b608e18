use super::{AttendanceLedger, WorkerStore};
use crate::model::{
    attendance::{AttendanceEntry, AttendanceSession, DateRange, SessionStatus},
    role::Role,
    worker::{NewWorker, Presence, Worker, WorkerPresence, WorkerUpdate, WriteOutcome},
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use std::str::FromStr;
use tracing::debug;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

// =====================
// Row structs
// =====================

#[derive(FromRow)]
struct WorkerRow {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
    department: Option<String>,
    position: Option<String>,
    hire_date: Option<NaiveDate>,
    status: String,
}

impl TryFrom<WorkerRow> for Worker {
    type Error = anyhow::Error;

    fn try_from(row: WorkerRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| anyhow!("worker {} has unknown role {:?}", row.id, row.role))?;
        Ok(Worker {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            role,
            department: row.department,
            position: row.position,
            hire_date: row.hire_date,
            status: row.status,
        })
    }
}

#[derive(FromRow)]
struct PresenceRow {
    #[sqlx(flatten)]
    worker: WorkerRow,
    is_present: i64,
    latest_check_in: Option<DateTime<Utc>>,
    latest_check_out: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct SessionRow {
    id: u64,
    worker_id: String,
    check_in_time: DateTime<Utc>,
    check_out_time: Option<DateTime<Utc>>,
    total_hours: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for AttendanceSession {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = SessionStatus::from_str(&row.status)
            .map_err(|_| anyhow!("session {} has unknown status {:?}", row.id, row.status))?;
        Ok(AttendanceSession {
            id: row.id,
            worker_id: row.worker_id,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            total_hours: row.total_hours,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EntryRow {
    #[sqlx(flatten)]
    session: SessionRow,
    worker_name: String,
    worker_email: String,
    department: Option<String>,
    position: Option<String>,
}

const WORKER_COLUMNS: &str =
    "w.id, w.name, w.email, w.password, w.role, w.department, w.position, w.hire_date, w.status";

const SESSION_COLUMNS: &str = "a.id, a.worker_id, a.check_in_time, a.check_out_time, a.total_hours, \
     a.status, a.created_at, a.updated_at";

fn is_duplicate(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// `AND` conditions for a date range on `a.check_in_time`, with the values to bind in order.
fn range_conditions(range: &DateRange) -> (String, Vec<DateTime<Utc>>) {
    let mut sql = String::new();
    let mut values = Vec::with_capacity(2);
    if let Some(from) = range.from_time() {
        sql.push_str(" AND a.check_in_time >= ?");
        values.push(from);
    }
    if let Some(until) = range.until_time() {
        sql.push_str(" AND a.check_in_time < ?");
        values.push(until);
    }
    (sql, values)
}

/// SET clause for the fields present in the update. Column names come from
/// this fixed list, never from the request.
fn build_worker_update(update: &WorkerUpdate) -> Option<(String, Vec<&str>)> {
    let fields = [
        ("name", update.name.as_deref()),
        ("email", update.email.as_deref()),
        ("department", update.department.as_deref()),
        ("position", update.position.as_deref()),
        ("status", update.status.as_deref()),
    ];

    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (column, value) in fields {
        if let Some(value) = value {
            columns.push(format!("{column} = ?"));
            values.push(value);
        }
    }
    if columns.is_empty() {
        return None;
    }

    let sql = format!("UPDATE workers SET {} WHERE id = ?", columns.join(", "));
    Some((sql, values))
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_worker(&self, column: &str, value: &str) -> anyhow::Result<Option<Worker>> {
        let sql = format!("SELECT {WORKER_COLUMNS} FROM workers w WHERE w.{column} = ?");
        let row = sqlx::query_as::<_, WorkerRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("fetch worker by {column}"))?;
        row.map(Worker::try_from).transpose()
    }
}

#[async_trait]
impl WorkerStore for MySqlStore {
    async fn find_worker(&self, id: &str) -> anyhow::Result<Option<Worker>> {
        self.fetch_worker("id", id).await
    }

    async fn find_worker_by_email(&self, email: &str) -> anyhow::Result<Option<Worker>> {
        self.fetch_worker("email", email).await
    }

    async fn list_workers(&self) -> anyhow::Result<Vec<WorkerPresence>> {
        let sql = format!(
            r#"
            SELECT {WORKER_COLUMNS},
                CAST(EXISTS(
                    SELECT 1 FROM attendance a
                    WHERE a.worker_id = w.id AND a.check_out_time IS NULL
                ) AS SIGNED) AS is_present,
                (
                    SELECT a.check_in_time FROM attendance a
                    WHERE a.worker_id = w.id
                    ORDER BY a.check_in_time DESC, a.id DESC LIMIT 1
                ) AS latest_check_in,
                (
                    SELECT a.check_out_time FROM attendance a
                    WHERE a.worker_id = w.id
                    ORDER BY a.check_in_time DESC, a.id DESC LIMIT 1
                ) AS latest_check_out
            FROM workers w
            WHERE w.role = ?
            ORDER BY w.name
            "#
        );

        let rows = sqlx::query_as::<_, PresenceRow>(&sql)
            .bind(Role::Worker.as_str())
            .fetch_all(&self.pool)
            .await
            .context("list workers")?;

        rows.into_iter()
            .map(|row| {
                let worker = Worker::try_from(row.worker)?;
                Ok(WorkerPresence {
                    worker: worker.profile(),
                    presence: if row.is_present != 0 {
                        Presence::Active
                    } else {
                        Presence::Passive
                    },
                    latest_check_in: row.latest_check_in,
                    latest_check_out: row.latest_check_out,
                })
            })
            .collect()
    }

    async fn create_worker(&self, worker: NewWorker) -> anyhow::Result<WriteOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO workers (id, name, email, password, role, department, position, hire_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&worker.id)
        .bind(&worker.name)
        .bind(&worker.email)
        .bind(&worker.password_hash)
        .bind(worker.role.as_str())
        .bind(&worker.department)
        .bind(&worker.position)
        .bind(worker.hire_date)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(WriteOutcome::Applied),
            Err(e) if is_duplicate(&e) => Ok(WriteOutcome::Duplicate),
            Err(e) => Err(anyhow::Error::new(e).context("insert worker")),
        }
    }

    async fn update_worker(&self, id: &str, update: &WorkerUpdate) -> anyhow::Result<WriteOutcome> {
        let Some((sql, values)) = build_worker_update(update) else {
            return Ok(WriteOutcome::Applied);
        };
        debug!(sql = %sql, worker_id = id, "Updating worker");

        let mut query = sqlx::query(&sql);
        for value in values {
            query = query.bind(value);
        }
        let result = query.bind(id).execute(&self.pool).await;

        match result {
            Ok(done) if done.rows_affected() > 0 => Ok(WriteOutcome::Applied),
            // zero rows: unknown id, or nothing actually changed
            Ok(_) => match self.find_worker(id).await? {
                Some(_) => Ok(WriteOutcome::Applied),
                None => Ok(WriteOutcome::NotFound),
            },
            Err(e) if is_duplicate(&e) => Ok(WriteOutcome::Duplicate),
            Err(e) => Err(anyhow::Error::new(e).context("update worker")),
        }
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("ping database")?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceLedger for MySqlStore {
    async fn open_session(&self, worker_id: &str) -> anyhow::Result<Option<AttendanceSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM attendance a \
             WHERE a.worker_id = ? AND a.check_out_time IS NULL \
             ORDER BY a.check_in_time DESC, a.id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(worker_id)
            .fetch_optional(&self.pool)
            .await
            .context("fetch open session")?;
        row.map(AttendanceSession::try_from).transpose()
    }

    async fn insert_open_session(
        &self,
        worker_id: &str,
        check_in_time: DateTime<Utc>,
    ) -> anyhow::Result<Option<u64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (worker_id, check_in_time, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(worker_id)
        .bind(check_in_time)
        .bind(SessionStatus::Active.as_str())
        .bind(check_in_time)
        .bind(check_in_time)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            // uq_attendance_open_session: an open session already exists
            Err(e) if is_duplicate(&e) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("insert check-in")),
        }
    }

    async fn close_session(
        &self,
        session_id: u64,
        check_out_time: DateTime<Utc>,
        total_hours: f64,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, total_hours = ?, status = ?, updated_at = ?
            WHERE id = ? AND check_out_time IS NULL
            "#,
        )
        .bind(check_out_time)
        .bind(total_hours)
        .bind(SessionStatus::Completed.as_str())
        .bind(check_out_time)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .context("update check-out")?;

        Ok(result.rows_affected() == 1)
    }

    async fn sessions_for_worker(
        &self,
        worker_id: &str,
        range: &DateRange,
    ) -> anyhow::Result<Vec<AttendanceSession>> {
        let (conditions, values) = range_conditions(range);
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM attendance a WHERE a.worker_id = ?{conditions} \
             ORDER BY a.check_in_time DESC, a.id DESC"
        );

        let mut query = sqlx::query_as::<_, SessionRow>(&sql).bind(worker_id);
        for value in values {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("fetch worker sessions")?;

        rows.into_iter().map(AttendanceSession::try_from).collect()
    }

    async fn list_entries(
        &self,
        worker_id: Option<&str>,
        range: &DateRange,
    ) -> anyhow::Result<Vec<AttendanceEntry>> {
        let (mut conditions, values) = range_conditions(range);
        if worker_id.is_some() {
            conditions.insert_str(0, " AND a.worker_id = ?");
        }
        let sql = format!(
            "SELECT {SESSION_COLUMNS}, w.name AS worker_name, w.email AS worker_email, \
             w.department, w.position \
             FROM attendance a JOIN workers w ON a.worker_id = w.id \
             WHERE 1 = 1{conditions} \
             ORDER BY a.check_in_time DESC, a.id DESC"
        );
        debug!(sql = %sql, "Listing attendance entries");

        let mut query = sqlx::query_as::<_, EntryRow>(&sql);
        if let Some(id) = worker_id {
            query = query.bind(id);
        }
        for value in values {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("list attendance entries")?;

        rows.into_iter()
            .map(|row| {
                Ok(AttendanceEntry {
                    session: AttendanceSession::try_from(row.session)?,
                    worker_name: row.worker_name,
                    worker_email: row.worker_email,
                    department: row.department,
                    position: row.position,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn update_sql_only_names_present_fields() {
        let update = WorkerUpdate {
            name: Some("Anna".into()),
            status: Some("inactive".into()),
            ..Default::default()
        };
        let (sql, values) = build_worker_update(&update).unwrap();
        assert_eq!(sql, "UPDATE workers SET name = ?, status = ? WHERE id = ?");
        assert_eq!(values, ["Anna", "inactive"]);

        assert!(build_worker_update(&WorkerUpdate::default()).is_none());
    }

    #[test]
    fn range_conditions_bind_half_open_interval() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 10),
            NaiveDate::from_ymd_opt(2024, 1, 10),
        )
        .unwrap();
        let (sql, values) = range_conditions(&range);
        assert_eq!(sql, " AND a.check_in_time >= ? AND a.check_in_time < ?");
        assert_eq!(values.len(), 2);
        assert_eq!((values[1] - values[0]).num_hours(), 24);

        let (sql, values) = range_conditions(&DateRange::ALL);
        assert!(sql.is_empty());
        assert!(values.is_empty());
    }
}
