use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::attendance::{AttendanceEntry, DateRange};
use crate::service::{
    attendance::{self as ledger, AttendanceStatus, CheckInReceipt, CheckOutReceipt},
    report::{self, AttendanceSummary, DetailedReport, ExportSection, OverviewReport},
    worker::find_profile,
};
use crate::store::Store;
use actix_web::{HttpResponse, http::header, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

/// Optional body of check-in/check-out. Admins may act for another worker.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckRequest {
    #[schema(example = "kitchen1")]
    pub worker_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// Inclusive, `YYYY-MM-DD`
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive, `YYYY-MM-DD`
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    pub worker_id: Option<String>,
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DateRange, AppError> {
    DateRange::new(start, end).map_err(AppError::validation)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    /// `daily` (default), `monthly`, `yearly` or `summary`
    #[serde(default)]
    #[param(value_type = Option<String>, example = "monthly")]
    pub section: ExportSection,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewExportQuery {
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    /// Only workers of this department. `No Department` selects workers without one.
    pub department: Option<String>,
}

/// An empty body means the caller. Anything else must be a valid `CheckRequest`.
fn check_request(body: &[u8]) -> Result<CheckRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CheckRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))
}

fn csv_attachment(filename: &str, csv: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(csv)
}

fn entries_response(entries: Vec<AttendanceEntry>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "count": entries.len(),
        "data": entries,
    }))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/check-in",
    request_body(content = CheckRequest, description = "Optional, defaults to the caller"),
    responses(
        (status = 200, description = "Checked in successfully", body = CheckInReceipt),
        (status = 400, description = "Already checked in, or a malformed body", body = Object, example = json!({
            "success": false,
            "error": "Already checked in",
            "message": "You are already checked in"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown worker"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_in", skip_all, fields(caller = %auth.worker_id))]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request = check_request(&body)?;
    let worker_id = auth.target(request.worker_id.as_deref())?;
    let receipt = ledger::check_in(store.get_ref(), worker_id, ledger::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked in successfully",
        "data": receipt,
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/check-out",
    request_body(content = CheckRequest, description = "Optional, defaults to the caller"),
    responses(
        (status = 200, description = "Checked out successfully", body = CheckOutReceipt),
        (status = 400, description = "Not checked in, or a malformed body", body = Object, example = json!({
            "success": false,
            "error": "Not checked in",
            "message": "You are not checked in"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_out", skip_all, fields(caller = %auth.worker_id))]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request = check_request(&body)?;
    let worker_id = auth.target(request.worker_id.as_deref())?;
    let receipt = ledger::check_out(store.get_ref(), worker_id, ledger::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked out successfully",
        "data": receipt,
    })))
}

/// Caller's current attendance state
#[utoipa::path(
    get,
    path = "/api/worker/status",
    responses(
        (status = 200, description = "Current state", body = AttendanceStatus),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn worker_status(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let status = ledger::status(store.get_ref(), &auth.worker_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": status })))
}

/// Attendance state of one worker (self or admin)
#[utoipa::path(
    get,
    path = "/api/attendance/status/{id}",
    params(("id" = String, Path, description = "Worker id")),
    responses(
        (status = 200, description = "Current state", body = AttendanceStatus),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown worker")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn status_for(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let worker_id = path.into_inner();
    auth.require_self_or_admin(&worker_id)?;
    find_profile(store.get_ref(), &worker_id).await?;

    let status = ledger::status(store.get_ref(), &worker_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": status })))
}

/// All sessions, newest first (admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Sessions joined with worker profiles", body = [AttendanceEntry]),
        (status = 400, description = "start_date after end_date"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let range = date_range(query.start_date, query.end_date)?;
    let worker_id = query.worker_id.as_deref().map(str::trim).filter(|id| !id.is_empty());

    let entries = store.list_entries(worker_id, &range).await?;
    Ok(entries_response(entries))
}

/// Caller's own sessions
#[utoipa::path(
    get,
    path = "/api/worker/attendance",
    params(RangeQuery),
    responses(
        (status = 200, description = "Own sessions, newest first", body = [AttendanceEntry]),
        (status = 400, description = "start_date after end_date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn worker_attendance(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let range = date_range(query.start_date, query.end_date)?;
    let entries = store.list_entries(Some(&auth.worker_id), &range).await?;
    Ok(entries_response(entries))
}

/// Sessions of one worker (self or admin)
#[utoipa::path(
    get,
    path = "/api/attendance/worker/{id}",
    params(("id" = String, Path, description = "Worker id"), RangeQuery),
    responses(
        (status = 200, description = "Sessions, newest first", body = [AttendanceEntry]),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_for_worker(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let worker_id = path.into_inner();
    auth.require_self_or_admin(&worker_id)?;
    let range = date_range(query.start_date, query.end_date)?;

    let entries = store.list_entries(Some(&worker_id), &range).await?;
    Ok(entries_response(entries))
}

/// Summary rollup of one worker (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/summary/{id}",
    params(("id" = String, Path, description = "Worker id"), RangeQuery),
    responses(
        (status = 200, description = "Session counts and total hours", body = AttendanceSummary),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Unknown worker")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(name = "api_summary", skip_all, fields(worker_id = %path.as_str()))]
pub async fn summary(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let range = date_range(query.start_date, query.end_date)?;
    let worker = find_profile(store.get_ref(), &path).await?;

    let sessions = store.sessions_for_worker(&worker.id, &range).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "worker": worker,
        "data": report::summary_rollup(&sessions),
    })))
}

/// Daily, monthly and yearly rollups of one worker (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/detailed/{id}",
    params(("id" = String, Path, description = "Worker id"), RangeQuery),
    responses(
        (status = 200, description = "Rollups, newest period first", body = DetailedReport),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Unknown worker")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(name = "api_detailed", skip_all, fields(worker_id = %path.as_str()))]
pub async fn detailed(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let range = date_range(query.start_date, query.end_date)?;
    let worker = find_profile(store.get_ref(), &path).await?;

    let sessions = store.sessions_for_worker(&worker.id, &range).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "worker": worker,
        "data": report::detailed_report(&sessions),
    })))
}

/// Per-worker summaries, also grouped by department (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(RangeQuery),
    responses(
        (status = 200, description = "Overview of all workers", body = OverviewReport),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn overview(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let range = date_range(query.start_date, query.end_date)?;

    let overview = report::overview(store.get_ref(), &range).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": overview })))
}

/// One section of a worker's report as CSV (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/export/{id}",
    params(("id" = String, Path, description = "Worker id"), ExportQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String,
            example = json!("date,total_hours,sessions\n2024-01-10,8.50,1\n")),
        (status = 400, description = "Unknown section or bad dates"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Unknown worker")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(
    name = "api_export",
    skip_all,
    fields(worker_id = %path.as_str(), section = %query.section)
)]
pub async fn export(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let range = date_range(query.start_date, query.end_date)?;
    let worker = find_profile(store.get_ref(), &path).await?;

    let sessions = store.sessions_for_worker(&worker.id, &range).await?;
    let csv = report::worker_csv(
        &report::detailed_report(&sessions),
        &report::summary_rollup(&sessions),
        query.section,
    )?;

    let filename = match query.section {
        ExportSection::Daily => format!("attendance-{}.csv", worker.id),
        section => format!("attendance-{}-{}.csv", worker.id, section),
    };
    Ok(csv_attachment(&filename, csv))
}

/// Overview of all workers as CSV, optionally one department (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/report/export",
    params(OverviewExportQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String,
            example = json!("name,position,department,total_days,completed_days,total_hours,first_check_in\nAlice,Cook,Kitchen,1,1,8.50,2024-01-10T09:00:00Z\n")),
        (status = 400, description = "start_date after end_date"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(name = "api_export_overview", skip_all)]
pub async fn export_overview(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<OverviewExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let range = date_range(query.start_date, query.end_date)?;
    let department = query.department.as_deref().map(str::trim).filter(|d| !d.is_empty());

    let overview = report::overview(store.get_ref(), &range).await?;
    let csv = report::overview_csv(&overview.workers, department)?;
    Ok(csv_attachment("attendance-report.csv", csv))
}
