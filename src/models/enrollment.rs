//! Enrollment of a user in a course.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;
use super::timestamp::RecordDate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub course_id: String,
    /// `None` when the stored value is missing or not a known status.
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<EnrollmentStatus>,
    /// 0–100.
    #[serde(default, deserialize_with = "percent")]
    pub progress: u8,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

impl Enrollment {
    pub fn is_completed(&self) -> bool {
        self.status == Some(EnrollmentStatus::Completed)
    }

    pub fn is_active(&self) -> bool {
        self.status == Some(EnrollmentStatus::Active)
    }
}

/// Any stored number, rounded and clamped into 0–100. Non-numbers read as 0.
fn percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .map(|p| p.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollment {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub course_id: String,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnrollment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EnrollmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 100))]
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgressUpdate {
    #[validate(range(max = 100))]
    pub progress: u8,
}

/// Equality filters accepted by the enrollment list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFilters {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
    pub status: Option<EnrollmentStatus>,
}
