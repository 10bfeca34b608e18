//! Time rollups over completed sessions.
//!
//! Hours are summed at full precision and only rounded to two decimals when
//! serialized, so daily -> monthly -> yearly sums agree with a direct yearly sum.

use crate::model::attendance::{AttendanceSession, DateRange};
use crate::model::worker::WorkerProfile;
use crate::store::Store;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use strum_macros::Display;
use utoipa::ToSchema;

fn round2<S: Serializer>(hours: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((hours * 100.0).round() / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyHours {
    #[schema(example = "2024-01-10")]
    pub date: NaiveDate,
    #[serde(serialize_with = "round2")]
    #[schema(example = 8.5)]
    pub total_hours: f64,
    /// Completed sessions that started on this date.
    #[schema(example = 1)]
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyHours {
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 1)]
    pub month: u32,
    #[serde(serialize_with = "round2")]
    #[schema(example = 160.25)]
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct YearlyHours {
    #[schema(example = 2024)]
    pub year: i32,
    #[serde(serialize_with = "round2")]
    #[schema(example = 1840.0)]
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    /// All sessions, open ones included.
    #[schema(example = 21)]
    pub total_days: usize,
    #[schema(example = 20)]
    pub completed_days: usize,
    pub first_check_in: Option<DateTime<Utc>>,
    pub last_check_out: Option<DateTime<Utc>>,
    #[serde(serialize_with = "round2")]
    #[schema(example = 168.5)]
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DetailedReport {
    pub daily: Vec<DailyHours>,
    pub monthly: Vec<MonthlyHours>,
    pub yearly: Vec<YearlyHours>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkerReport {
    pub worker: WorkerProfile,
    pub summary: AttendanceSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentReport {
    #[schema(example = "Kitchen")]
    pub department: String,
    pub workers: Vec<WorkerReport>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverviewReport {
    pub workers: Vec<WorkerReport>,
    pub departments: Vec<DepartmentReport>,
}

pub const NO_DEPARTMENT: &str = "No Department";

/// Sums completed sessions per calendar date of check-in, newest date first.
/// Several sessions on one date are all summed.
pub fn daily_rollup(sessions: &[AttendanceSession]) -> Vec<DailyHours> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for session in sessions {
        if let Some(hours) = session.hours() {
            let slot = by_date.entry(session.check_in_time.date_naive()).or_default();
            slot.0 += hours;
            slot.1 += 1;
        }
    }

    by_date
        .into_iter()
        .rev()
        .map(|(date, (total_hours, sessions))| DailyHours {
            date,
            total_hours,
            sessions,
        })
        .collect()
}

pub fn monthly_rollup(daily: &[DailyHours]) -> Vec<MonthlyHours> {
    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for day in daily {
        *by_month.entry((day.date.year(), day.date.month())).or_default() += day.total_hours;
    }

    by_month
        .into_iter()
        .rev()
        .map(|((year, month), total_hours)| MonthlyHours {
            year,
            month,
            total_hours,
        })
        .collect()
}

pub fn yearly_rollup(monthly: &[MonthlyHours]) -> Vec<YearlyHours> {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for month in monthly {
        *by_year.entry(month.year).or_default() += month.total_hours;
    }

    by_year
        .into_iter()
        .rev()
        .map(|(year, total_hours)| YearlyHours { year, total_hours })
        .collect()
}

pub fn summary_rollup(sessions: &[AttendanceSession]) -> AttendanceSummary {
    let completed: Vec<f64> = sessions.iter().filter_map(AttendanceSession::hours).collect();

    AttendanceSummary {
        total_days: sessions.len(),
        completed_days: completed.len(),
        first_check_in: sessions.iter().map(|s| s.check_in_time).min(),
        last_check_out: sessions.iter().filter_map(|s| s.check_out_time).max(),
        total_hours: completed.iter().sum(),
    }
}

pub fn detailed_report(sessions: &[AttendanceSession]) -> DetailedReport {
    let daily = daily_rollup(sessions);
    let monthly = monthly_rollup(&daily);
    let yearly = yearly_rollup(&monthly);
    DetailedReport {
        daily,
        monthly,
        yearly,
    }
}

fn department_of(worker: &WorkerProfile) -> &str {
    worker
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DEPARTMENT)
}

/// Groups worker reports by department, departments sorted by name.
pub fn group_by_department(workers: &[WorkerReport]) -> Vec<DepartmentReport> {
    let mut groups: BTreeMap<String, Vec<WorkerReport>> = BTreeMap::new();
    for report in workers {
        groups
            .entry(department_of(&report.worker).to_string())
            .or_default()
            .push(report.clone());
    }

    groups
        .into_iter()
        .map(|(department, workers)| DepartmentReport {
            department,
            workers,
        })
        .collect()
}

/// Summary for every worker on the roster.
pub async fn overview(store: &dyn Store, range: &DateRange) -> anyhow::Result<OverviewReport> {
    let roster = store.list_workers().await?;

    let mut workers = Vec::with_capacity(roster.len());
    for entry in roster {
        let sessions = store.sessions_for_worker(&entry.worker.id, range).await?;
        workers.push(WorkerReport {
            summary: summary_rollup(&sessions),
            worker: entry.worker,
        });
    }

    let departments = group_by_department(&workers);
    Ok(OverviewReport {
        workers,
        departments,
    })
}

/// Which block of a worker's report to export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportSection {
    #[default]
    Daily,
    Monthly,
    Yearly,
    Summary,
}

fn hours_cell(hours: f64) -> String {
    format!("{hours:.2}")
}

fn write_csv<T: Serialize>(
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv: {}", e.error()))
}

/// One section of a worker's report as CSV. Hours are written with two decimals.
pub fn worker_csv(
    report: &DetailedReport,
    summary: &AttendanceSummary,
    section: ExportSection,
) -> anyhow::Result<Vec<u8>> {
    match section {
        ExportSection::Daily => write_csv(
            &["date", "total_hours", "sessions"],
            report.daily.iter().map(|d| {
                (d.date.format("%Y-%m-%d").to_string(), hours_cell(d.total_hours), d.sessions)
            }),
        ),
        ExportSection::Monthly => write_csv(
            &["month", "total_hours"],
            report
                .monthly
                .iter()
                .map(|m| (format!("{:04}-{:02}", m.year, m.month), hours_cell(m.total_hours))),
        ),
        ExportSection::Yearly => write_csv(
            &["year", "total_hours"],
            report.yearly.iter().map(|y| (y.year, hours_cell(y.total_hours))),
        ),
        ExportSection::Summary => write_csv(
            &["total_days", "completed_days", "first_check_in", "last_check_out", "total_hours"],
            [(
                summary.total_days,
                summary.completed_days,
                summary.first_check_in,
                summary.last_check_out,
                hours_cell(summary.total_hours),
            )],
        ),
    }
}

/// Overview rows as CSV, optionally limited to one department group.
pub fn overview_csv(workers: &[WorkerReport], department: Option<&str>) -> anyhow::Result<Vec<u8>> {
    let rows = workers
        .iter()
        .filter(|r| department.is_none_or(|d| department_of(&r.worker) == d))
        .map(|r| {
            (
                r.worker.name.as_str(),
                r.worker.position.as_deref().unwrap_or_default(),
                department_of(&r.worker),
                r.summary.total_days,
                r.summary.completed_days,
                hours_cell(r.summary.total_hours),
                r.summary.first_check_in,
            )
        });
    write_csv(
        &[
            "name",
            "position",
            "department",
            "total_days",
            "completed_days",
            "total_hours",
            "first_check_in",
        ],
        rows,
    )
}
