use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    /// Checked in, no check-out yet.
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// One check-in/check-out pair in the attendance ledger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSession {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "kitchen1")]
    pub worker_id: String,
    pub check_in_time: DateTime<Utc>,
    /// `None` while the session is open.
    pub check_out_time: Option<DateTime<Utc>>,
    #[schema(example = 8.5)]
    pub total_hours: Option<f64>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceSession {
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }

    /// Hours worked for a completed session, `None` while open.
    pub fn hours(&self) -> Option<f64> {
        let check_out = self.check_out_time?;
        Some(self.total_hours.unwrap_or_else(|| {
            (check_out - self.check_in_time).num_seconds() as f64 / 3600.0
        }))
    }
}

/// Session joined with the worker's profile, used by the admin listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub session: AttendanceSession,
    #[schema(example = "Kitchen Worker")]
    pub worker_name: String,
    #[schema(example = "kitchen@pizzeria.com")]
    pub worker_email: String,
    #[schema(example = "Kitchen", nullable = true)]
    pub department: Option<String>,
    #[schema(example = "Pizza Chef", nullable = true)]
    pub position: Option<String>,
}

/// Inclusive calendar-date filter on `check_in_time` (UTC dates).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub const ALL: DateRange = DateRange { start: None, end: None };

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, String> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(format!("start_date {s} is after end_date {e}"));
            }
        }
        Ok(DateRange { start, end })
    }

    /// Lower bound (inclusive) as a timestamp.
    pub fn from_time(&self) -> Option<DateTime<Utc>> {
        self.start.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// Upper bound (exclusive): midnight after `end`.
    pub fn until_time(&self) -> Option<DateTime<Utc>> {
        self.end
            .and_then(|d| d.succ_opt())
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.from_time().is_none_or(|from| *at >= from)
            && self.until_time().is_none_or(|until| *at < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn range_is_inclusive_of_both_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 10),
            NaiveDate::from_ymd_opt(2024, 1, 11),
        )
        .unwrap();

        assert!(!range.contains(&at(2024, 1, 9, 23)));
        assert!(range.contains(&at(2024, 1, 10, 0)));
        assert!(range.contains(&at(2024, 1, 11, 23)));
        assert!(!range.contains(&at(2024, 1, 12, 0)));
        assert!(DateRange::ALL.contains(&at(1999, 1, 1, 0)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(
            DateRange::new(
                NaiveDate::from_ymd_opt(2024, 2, 1),
                NaiveDate::from_ymd_opt(2024, 1, 1),
            )
            .is_err()
        );
    }

    #[test]
    fn hours_prefer_stored_value() {
        let mut session = AttendanceSession {
            id: 1,
            worker_id: "w1".into(),
            check_in_time: at(2024, 1, 10, 9),
            check_out_time: None,
            total_hours: None,
            status: SessionStatus::Active,
            created_at: at(2024, 1, 10, 9),
            updated_at: at(2024, 1, 10, 9),
        };
        assert!(session.is_open());
        assert_eq!(session.hours(), None);

        session.check_out_time = Some(at(2024, 1, 10, 17));
        assert_eq!(session.hours(), Some(8.0));

        session.total_hours = Some(7.75);
        assert_eq!(session.hours(), Some(7.75));
    }
}
