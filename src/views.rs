//! Display-ready view models, built from a [`Dataset`] without touching any UI.

use crate::aggregate::{
    self, AttendanceTotals, Tier, reverse_chronological, session_attendance_count,
    session_duration_minutes, teacher_session_count,
};
use crate::models::{Dataset, SummarySource};
use serde::Serialize;

pub const PLACEHOLDER: &str = "-";
pub const NO_DATA: &str = "لا توجد بيانات";

const CHART_BARS: usize = 6;
const BAR_TRACK_PX: f64 = 240.0;
const BAR_MIN_PX: f64 = 20.0;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub counters: Vec<Counter>,
    pub bar_chart: BarChart,
    pub overview: Overview,
    pub students: Vec<StudentCard>,
    pub teachers: Vec<TeacherRow>,
    pub sessions: Vec<SessionCard>,
    pub attendance: Vec<AttendanceRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Counter {
    pub id: &'static str,
    pub label: &'static str,
    pub target: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub scale: f64,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub name: String,
    pub label: String,
    pub rate: f64,
    pub value_text: String,
    pub height_px: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub present: u64,
    pub absent: u64,
    pub total: u64,
    pub present_percentage: String,
    pub absent_percentage: String,
    pub present_angle: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentCard {
    pub name: String,
    pub tier: Tier,
    pub tier_label: &'static str,
    pub rate_text: String,
    pub rate: f64,
    pub progress_width: f64,
    pub present: u64,
    pub absent: u64,
    pub total_sessions: u64,
    pub whatsapp: String,
    pub uid_rfid: String,
    pub summary: SummarySource,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherRow {
    pub index: usize,
    pub name: String,
    pub whatsapp: String,
    pub uid_rfid: String,
    pub session_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Open => "مفتوحة",
            SessionStatus::Closed => "مغلقة",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SessionStatus::Open => "🔓",
            SessionStatus::Closed => "🔒",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            SessionStatus::Open => "badge-success",
            SessionStatus::Closed => "badge-danger",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCard {
    pub session_id: String,
    pub teacher_name: String,
    pub status: SessionStatus,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: Option<i64>,
    pub attendance_count: usize,
}

impl SessionCard {
    pub fn duration_text(&self) -> String {
        self.duration_minutes
            .map_or_else(|| PLACEHOLDER.to_string(), |minutes| minutes.to_string())
    }
}

/// Binary presence label. Every status other than the literal `"Present"` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn label(self) -> &'static str {
        match self {
            Presence::Present => "حاضر",
            Presence::Absent => "غائب",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRow {
    pub index: usize,
    pub session_id: String,
    pub student_name: String,
    pub teacher_name: String,
    pub scan_time: String,
    pub presence: Presence,
}

pub fn build_dashboard(data: &Dataset) -> Dashboard {
    Dashboard {
        counters: build_counters(data),
        bar_chart: build_bar_chart(data),
        overview: build_overview(data),
        students: build_student_cards(data),
        teachers: build_teacher_rows(data),
        sessions: build_session_cards(data),
        attendance: build_attendance_rows(data),
    }
}

pub fn build_counters(data: &Dataset) -> Vec<Counter> {
    let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    vec![
        Counter {
            id: "totalStudents",
            label: "إجمالي الطلاب",
            target: count(aggregate::students(&data.users).len()),
        },
        Counter {
            id: "totalTeachers",
            label: "إجمالي الدكاترة",
            target: count(aggregate::teachers(&data.users).len()),
        },
        Counter {
            id: "totalSessions",
            label: "إجمالي المحاضرات",
            target: count(data.sessions.len()),
        },
        Counter {
            id: "totalAttendance",
            label: "سجلات الحضور",
            target: count(data.attendance.len()),
        },
    ]
}

pub fn build_bar_chart(data: &Dataset) -> BarChart {
    let points: Vec<(String, f64)> = aggregate::students(&data.users)
        .into_iter()
        .take(CHART_BARS)
        .map(|student| {
            let rate = aggregate::student_attendance(student).summary().rate_value();
            (text_or_placeholder(&student.name), rate)
        })
        .collect();

    let scale = points.iter().map(|(_, rate)| *rate).fold(100.0, f64::max);
    let bars = points
        .into_iter()
        .map(|(name, rate)| Bar {
            label: short_label(&name),
            value_text: format!("{rate:.1}%"),
            height_px: (rate / scale * BAR_TRACK_PX).max(BAR_MIN_PX),
            tier: Tier::classify(rate),
            rate,
            name,
        })
        .collect();

    BarChart { scale, bars }
}

pub fn build_overview(data: &Dataset) -> Overview {
    let summaries: Vec<_> = aggregate::students(&data.users)
        .into_iter()
        .map(|student| aggregate::student_attendance(student).summary())
        .collect();
    overview_from_totals(aggregate::attendance_totals(&summaries))
}

fn overview_from_totals(totals: AttendanceTotals) -> Overview {
    let percentage = |value: f64| {
        if totals.total() == 0 {
            "0".to_string()
        } else {
            format!("{value:.1}")
        }
    };
    Overview {
        present: totals.present,
        absent: totals.absent,
        total: totals.total(),
        present_percentage: percentage(totals.present_percentage()),
        absent_percentage: percentage(totals.absent_percentage()),
        present_angle: totals.present_angle(),
    }
}

pub fn build_student_cards(data: &Dataset) -> Vec<StudentCard> {
    aggregate::students(&data.users)
        .into_iter()
        .map(|student| {
            let decode = aggregate::student_attendance(student);
            let summary = decode.summary();
            let rate = summary.rate_value();
            let tier = Tier::classify(rate);
            StudentCard {
                name: text_or_placeholder(&student.name),
                tier,
                tier_label: tier.label(),
                rate_text: summary.rate_text(),
                rate,
                progress_width: rate.clamp(0.0, 100.0),
                present: summary.present,
                absent: summary.absent,
                total_sessions: summary.total_sessions,
                whatsapp: text_or_placeholder(&student.whatsapp),
                uid_rfid: text_or_placeholder(&student.uid_rfid),
                summary: decode.source(),
            }
        })
        .collect()
}

pub fn build_teacher_rows(data: &Dataset) -> Vec<TeacherRow> {
    aggregate::teachers(&data.users)
        .into_iter()
        .enumerate()
        .map(|(i, teacher)| TeacherRow {
            index: i + 1,
            name: text_or_placeholder(&teacher.name),
            whatsapp: text_or_placeholder(&teacher.whatsapp),
            uid_rfid: text_or_placeholder(&teacher.uid_rfid),
            session_count: teacher_session_count(teacher, &data.sessions),
        })
        .collect()
}

pub fn build_session_cards(data: &Dataset) -> Vec<SessionCard> {
    reverse_chronological(&data.sessions)
        .into_iter()
        .map(|session| SessionCard {
            session_id: text_or_placeholder(&session.session_id),
            teacher_name: text_or_placeholder(&session.teacher_name),
            status: if session.is_closed() {
                SessionStatus::Closed
            } else {
                SessionStatus::Open
            },
            start_time: text_or_placeholder(&session.start_time),
            end_time: text_or_placeholder(&session.end_time),
            duration_minutes: session_duration_minutes(session),
            attendance_count: session_attendance_count(session, &data.attendance),
        })
        .collect()
}

pub fn build_attendance_rows(data: &Dataset) -> Vec<AttendanceRow> {
    data.attendance
        .iter()
        .enumerate()
        .map(|(i, record)| AttendanceRow {
            index: i + 1,
            session_id: text_or_placeholder(&record.session_id),
            student_name: text_or_placeholder(&record.student_name),
            teacher_name: text_or_placeholder(&record.teacher_name),
            scan_time: text_or_placeholder(&record.scan_time),
            presence: if record.is_present() {
                Presence::Present
            } else {
                Presence::Absent
            },
        })
        .collect()
}

fn text_or_placeholder(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

fn short_label(name: &str) -> String {
    name.split(' ').take(2).collect::<Vec<_>>().join(" ")
}
