use chrono::NaiveDate;
use serde_json::Value;

use crate::ipc::error::err;
use crate::store::{self, StoreError};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(what: &str) -> Self {
        HandlerErr {
            code: "not_found",
            message: format!("{} not found", what),
            details: None,
        }
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Absent, explicit null, or a string. Nullable columns need to tell
/// "leave alone" apart from "clear".
pub fn get_nullable_str(params: &Value, key: &str) -> Result<Option<Option<String>>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(v) => match v.as_str() {
            Some(s) => Ok(Some(Some(s.to_string()))),
            None => Err(HandlerErr::bad_params(format!(
                "{} must be a string or null",
                key
            ))),
        },
    }
}

pub fn get_required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_f64(params: &Value, key: &str) -> Option<f64> {
    params.get(key).and_then(|v| v.as_f64())
}

pub fn get_opt_i64(params: &Value, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

/// Calendar dates ride as YYYY-MM-DD strings end to end.
pub fn check_date(value: &str, key: &str) -> Result<(), HandlerErr> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

/// Enrollment and submission moments ride as RFC 3339 timestamps.
pub fn check_timestamp(value: &str, key: &str) -> Result<(), HandlerErr> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|_| {
            HandlerErr::bad_params(format!("{} must be an RFC 3339 timestamp", key))
        })
}

pub fn check_status(value: &str) -> Result<(), HandlerErr> {
    if store::ATTENDANCE_STATUSES.contains(&value) {
        return Ok(());
    }
    Err(HandlerErr::bad_params(format!(
        "status must be one of {}",
        store::ATTENDANCE_STATUSES.join(", ")
    )))
}

/// Write-boundary bounds for a grade. Stored rows are not re-checked on
/// read; aggregation tolerates whatever is already in the file.
pub fn check_grade_values(score: f64, max_score: f64) -> Result<(), HandlerErr> {
    if score < 0.0 {
        return Err(HandlerErr::bad_params("score must not be negative"));
    }
    if max_score <= 0.0 {
        return Err(HandlerErr::bad_params("maxScore must be positive"));
    }
    if score > max_score {
        return Err(HandlerErr::bad_params("score must not exceed maxScore"));
    }
    Ok(())
}
