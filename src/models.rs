use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One entry from the users endpoint. Students carry an encoded attendance
/// summary under the `"Network theory"` key.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub whatsapp: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub uid_rfid: Option<String>,
    #[serde(rename = "Network theory", default, skip_serializing_if = "Option::is_none")]
    pub summary_field: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Other,
}

impl User {
    pub fn role(&self) -> Role {
        match self.role.as_deref() {
            Some("student") => Role::Student,
            Some("teacher") => Role::Teacher,
            _ => Role::Other,
        }
    }

    /// Decodes the summary field. Never fails: callers that only need the
    /// numbers use [`SummaryDecode::summary`], which falls back to zeros.
    pub fn decode_summary(&self) -> SummaryDecode {
        match &self.summary_field {
            None | Some(Value::Null) => SummaryDecode::Absent,
            Some(Value::String(raw)) if raw.is_empty() => SummaryDecode::Absent,
            Some(Value::String(raw)) => match serde_json::from_str::<AttendanceSummary>(raw) {
                Ok(summary) => SummaryDecode::Decoded(summary),
                Err(err) => SummaryDecode::Malformed(err.to_string()),
            },
            Some(_) => SummaryDecode::Malformed("summary field is not a string".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Session {
    #[serde(default, deserialize_with = "lenient_text")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub teacher_uid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub teacher_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub end_time: Option<String>,
}

impl Session {
    pub fn is_closed(&self) -> bool {
        self.status.as_deref() == Some("Closed")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub student_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub teacher_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub scan_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

impl AttendanceRecord {
    /// Only the literal `"Present"` counts as present.
    pub fn is_present(&self) -> bool {
        self.status.as_deref() == Some("Present")
    }
}

/// One complete fetch cycle's worth of data. Replaced wholesale, never
/// mutated in place.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: Vec<User>,
    pub sessions: Vec<Session>,
    pub attendance: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AttendanceSummary {
    #[serde(default, deserialize_with = "lenient_rate")]
    pub rate: Option<Rate>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub present: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub absent: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_sessions: u64,
    #[serde(default, deserialize_with = "lenient_sessions")]
    pub sessions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rate {
    Number(f64),
    Text(String),
}

impl AttendanceSummary {
    /// Numeric rate: the leading number of the source value, 0 when there is none.
    pub fn rate_value(&self) -> f64 {
        match &self.rate {
            Some(Rate::Number(value)) if value.is_finite() => *value,
            Some(Rate::Text(text)) => leading_number(text).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn rate_text(&self) -> String {
        match &self.rate {
            Some(Rate::Number(value)) if *value != 0.0 && !value.is_nan() => value.to_string(),
            Some(Rate::Text(text)) if !text.is_empty() => text.clone(),
            _ => "0%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryDecode {
    Decoded(AttendanceSummary),
    Absent,
    Malformed(String),
}

impl SummaryDecode {
    pub fn summary(&self) -> AttendanceSummary {
        match self {
            SummaryDecode::Decoded(summary) => summary.clone(),
            SummaryDecode::Absent | SummaryDecode::Malformed(_) => AttendanceSummary::default(),
        }
    }

    pub fn source(&self) -> SummarySource {
        match self {
            SummaryDecode::Decoded(_) => SummarySource::Decoded,
            SummaryDecode::Absent => SummarySource::Absent,
            SummaryDecode::Malformed(_) => SummarySource::Malformed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Decoded,
    Absent,
    Malformed,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub tab: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FilterQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeResponse {
    pub theme: String,
    pub icon: String,
    pub label: String,
}

pub fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// A count that is not a non-negative number reads as 0; the rest of the summary survives.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .unwrap_or(0),
        _ => 0,
    })
}

fn lenient_rate<'de, D>(deserializer: D) -> Result<Option<Rate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64().map(Rate::Number),
        Some(Value::String(text)) => Some(Rate::Text(text)),
        _ => None,
    })
}

fn lenient_sessions<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student(summary: Value) -> User {
        serde_json::from_value(json!({
            "name": "A",
            "role": "student",
            "Network theory": summary,
        }))
        .unwrap()
    }

    #[test]
    fn decodes_encoded_summary() {
        let user = student(json!(r#"{"rate":80,"present":8,"absent":2,"total_sessions":10}"#));
        let SummaryDecode::Decoded(summary) = user.decode_summary() else {
            panic!("expected decoded summary");
        };
        assert_eq!(summary.present, 8);
        assert_eq!(summary.absent, 2);
        assert_eq!(summary.total_sessions, 10);
        assert_eq!(summary.rate_value(), 80.0);
        assert_eq!(summary.rate_text(), "80");
    }

    #[test]
    fn missing_summary_is_absent_and_zero() {
        let user: User = serde_json::from_value(json!({ "name": "B", "role": "student" })).unwrap();
        let decode = user.decode_summary();
        assert_eq!(decode, SummaryDecode::Absent);
        assert_eq!(decode.summary(), AttendanceSummary::default());
        assert_eq!(decode.summary().rate_text(), "0%");
    }

    #[test]
    fn malformed_summary_falls_back_to_zero() {
        let user = student(json!("{not json"));
        let decode = user.decode_summary();
        assert_eq!(decode.source(), SummarySource::Malformed);
        assert_eq!(decode.summary().present, 0);
        assert_eq!(decode.summary().rate_value(), 0.0);
    }

    #[test]
    fn non_string_summary_is_malformed() {
        let user = student(json!({ "rate": 90 }));
        assert_eq!(user.decode_summary().source(), SummarySource::Malformed);
    }

    #[test]
    fn text_rate_keeps_source_text() {
        let user = student(json!(r#"{"rate":"66.7%","present":2,"absent":1,"total_sessions":3}"#));
        let summary = user.decode_summary().summary();
        assert_eq!(summary.rate_text(), "66.7%");
        assert!((summary.rate_value() - 66.7).abs() < 1e-9);
    }

    #[test]
    fn null_counts_read_as_zero() {
        let user = student(json!(r#"{"rate":null,"present":null,"absent":3}"#));
        let summary = user.decode_summary().summary();
        assert_eq!(summary.present, 0);
        assert_eq!(summary.absent, 3);
        assert_eq!(summary.rate_text(), "0%");
    }

    #[test]
    fn bad_counts_keep_the_rest_of_the_summary() {
        let user = student(json!(
            r#"{"rate":"90%","present":"8","absent":-2,"total_sessions":{"n":1}}"#
        ));
        let decode = user.decode_summary();
        assert_eq!(decode.source(), SummarySource::Decoded);
        let summary = decode.summary();
        assert_eq!(summary.present, 0);
        assert_eq!(summary.absent, 0);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.rate_value(), 90.0);
    }

    #[test]
    fn unusable_rate_reads_as_missing() {
        let user = student(json!(r#"{"rate":[80],"present":4}"#));
        let summary = user.decode_summary().summary();
        assert_eq!(summary.rate, None);
        assert_eq!(summary.present, 4);
        assert_eq!(summary.rate_text(), "0%");
    }

    #[test]
    fn leading_number_matches_prefix_parse() {
        assert_eq!(leading_number("80%"), Some(80.0));
        assert_eq!(leading_number("  12.5 percent"), Some(12.5));
        assert_eq!(leading_number("-3e2x"), Some(-300.0));
        assert_eq!(leading_number(".5"), Some(0.5));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number(""), None);
        assert_eq!(leading_number("7e"), Some(7.0));
    }

    #[test]
    fn numeric_ids_are_read_as_text() {
        let session: Session = serde_json::from_value(json!({
            "session_id": 42,
            "teacher_uid": null,
            "status": "Closed",
        }))
        .unwrap();
        assert_eq!(session.session_id.as_deref(), Some("42"));
        assert_eq!(session.teacher_uid, None);
        assert!(session.is_closed());
    }

    #[test]
    fn only_literal_present_counts_as_present() {
        for (status, expected) in [
            (json!("Present"), true),
            (json!("present"), false),
            (json!(""), false),
            (json!(null), false),
            (json!("Error"), false),
        ] {
            let record: AttendanceRecord =
                serde_json::from_value(json!({ "status": status })).unwrap();
            assert_eq!(record.is_present(), expected);
        }
    }
}
