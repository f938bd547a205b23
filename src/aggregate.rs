use crate::models::{AttendanceRecord, AttendanceSummary, Role, Session, SummaryDecode, User};
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Excellent,
    Warning,
    Poor,
}

impl Tier {
    /// Lower bounds are inclusive: 75 is excellent, 50 is warning.
    pub fn classify(rate: f64) -> Self {
        if rate >= 75.0 {
            Tier::Excellent
        } else if rate >= 50.0 {
            Tier::Warning
        } else {
            Tier::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "🌟 ممتاز",
            Tier::Warning => "⚠️ جيد",
            Tier::Poor => "❌ ضعيف",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Tier::Excellent => "badge-success",
            Tier::Warning => "badge-warning",
            Tier::Poor => "badge-danger",
        }
    }

    pub fn gradient(self) -> &'static str {
        match self {
            Tier::Excellent => "var(--gradient-4)",
            Tier::Warning => "var(--gradient-3)",
            Tier::Poor => "var(--gradient-2)",
        }
    }
}

pub fn students(users: &[User]) -> Vec<&User> {
    by_role(users, Role::Student)
}

pub fn teachers(users: &[User]) -> Vec<&User> {
    by_role(users, Role::Teacher)
}

fn by_role(users: &[User], role: Role) -> Vec<&User> {
    users.iter().filter(|user| user.role() == role).collect()
}

pub fn student_attendance(student: &User) -> SummaryDecode {
    let decode = student.decode_summary();
    if let SummaryDecode::Malformed(reason) = &decode {
        debug!(
            student = student.name.as_deref().unwrap_or("-"),
            "malformed attendance summary, using zeros: {reason}"
        );
    }
    decode
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttendanceTotals {
    pub present: u64,
    pub absent: u64,
}

impl AttendanceTotals {
    pub fn total(&self) -> u64 {
        self.present.saturating_add(self.absent)
    }

    pub fn present_percentage(&self) -> f64 {
        self.share(self.present) * 100.0
    }

    pub fn absent_percentage(&self) -> f64 {
        self.share(self.absent) * 100.0
    }

    pub fn present_angle(&self) -> f64 {
        self.share(self.present) * 360.0
    }

    fn share(&self, part: u64) -> f64 {
        match self.total() {
            0 => 0.0,
            total => part as f64 / total as f64,
        }
    }
}

pub fn attendance_totals<'a, I>(summaries: I) -> AttendanceTotals
where
    I: IntoIterator<Item = &'a AttendanceSummary>,
{
    summaries
        .into_iter()
        .fold(AttendanceTotals::default(), |acc, summary| AttendanceTotals {
            present: acc.present.saturating_add(summary.present),
            absent: acc.absent.saturating_add(summary.absent),
        })
}

/// Sessions taught by `teacher`, matched by RFID uid or, failing that, by name.
/// A missing value on either side never matches.
pub fn teacher_session_count(teacher: &User, sessions: &[Session]) -> usize {
    sessions
        .iter()
        .filter(|session| {
            same(&session.teacher_uid, &teacher.uid_rfid)
                || same(&session.teacher_name, &teacher.name)
        })
        .count()
}

pub fn session_attendance_count(session: &Session, attendance: &[AttendanceRecord]) -> usize {
    attendance
        .iter()
        .filter(|record| same(&record.session_id, &session.session_id))
        .count()
}

fn same(left: &Option<String>, right: &Option<String>) -> bool {
    matches!((left, right), (Some(l), Some(r)) if l == r)
}

/// Whole minutes between start and end, rounded half up. Negative spans pass
/// through; `None` only when a timestamp cannot be parsed.
pub fn session_duration_minutes(session: &Session) -> Option<i64> {
    let start = parse_timestamp(session.start_time.as_deref()?)?;
    let end = parse_timestamp(session.end_time.as_deref()?)?;
    let millis = (end - start).num_milliseconds() as f64;
    Some((millis / 60_000.0 + 0.5).floor() as i64)
}

/// Accepts RFC 3339 (normalised to UTC) and zone-less ISO-like date-times.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

pub fn reverse_chronological<T>(items: &[T]) -> Vec<&T> {
    items.iter().rev().collect()
}
