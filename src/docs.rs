use crate::api::attendance::CheckRequest;
use crate::model::{
    attendance::{AttendanceEntry, AttendanceSession, SessionStatus},
    role::Role,
    worker::{Presence, WorkerPresence, WorkerProfile, WorkerUpdate},
};
use crate::models::{LoginReqDto, LoginResponse, WorkerLoginReqDto};
use crate::service::{
    attendance::{AttendanceStatus, CheckInReceipt, CheckOutReceipt},
    report::{
        AttendanceSummary, DailyHours, DepartmentReport, DetailedReport, ExportSection,
        MonthlyHours, OverviewReport, WorkerReport, YearlyHours,
    },
    worker::CreateWorker,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Worker Attendance Tracker

Workers check in when their shift starts and check out when it ends. Every
check-in/check-out pair is one session in the attendance ledger; hours are
rolled up per day, month and year.

### Security
Everything except login and health requires a **JWT Bearer** token.
Reports, exports and worker management are **admin** only.

### Response Format
- Success: `{"success": true, ...}`
- Failure: `{"success": false, "error": "...", "message": "..."}`
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::worker_login,

        crate::api::health::health,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::worker_status,
        crate::api::attendance::status_for,
        crate::api::attendance::list_attendance,
        crate::api::attendance::worker_attendance,
        crate::api::attendance::attendance_for_worker,
        crate::api::attendance::summary,
        crate::api::attendance::detailed,
        crate::api::attendance::overview,
        crate::api::attendance::export,
        crate::api::attendance::export_overview,

        crate::api::worker::list_workers,
        crate::api::worker::create_worker,
        crate::api::worker::get_worker,
        crate::api::worker::update_worker
    ),
    components(
        schemas(
            LoginReqDto,
            WorkerLoginReqDto,
            LoginResponse,
            Role,
            CheckRequest,
            CheckInReceipt,
            CheckOutReceipt,
            AttendanceStatus,
            SessionStatus,
            AttendanceSession,
            AttendanceEntry,
            AttendanceSummary,
            DailyHours,
            MonthlyHours,
            YearlyHours,
            DetailedReport,
            ExportSection,
            WorkerReport,
            DepartmentReport,
            OverviewReport,
            WorkerProfile,
            WorkerPresence,
            Presence,
            WorkerUpdate,
            CreateWorker
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Token issuance"),
        (name = "Attendance", description = "Check-in, check-out and session listings"),
        (name = "Reports", description = "Hour rollups and exports"),
        (name = "Worker", description = "Worker roster management"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
