//! Learner accounts.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use super::timestamp::RecordDate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    /// Any other stored value. Counts as neither active nor inactive.
    #[serde(other)]
    Unknown,
}

/// Present-but-unrecognised values become [`UserStatus::Unknown`] so they are
/// not mistaken for an unset (active) status.
fn stored_status<'de, D>(deserializer: D) -> Result<Option<UserStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| serde_json::from_value(v).unwrap_or(UserStatus::Unknown)))
}

fn known_status(status: &UserStatus) -> Result<(), ValidationError> {
    match status {
        UserStatus::Unknown => Err(ValidationError::new("status")
            .with_message("status must be 'active' or 'inactive'".into())),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::lenient")]
    pub courses_taken: Vec<String>,
    /// Unset means active.
    #[serde(default, deserialize_with = "stored_status")]
    pub status: Option<UserStatus>,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status.map_or(true, |s| s == UserStatus::Active)
    }

    /// Name shown on leaderboards and activity feeds.
    pub fn display_name(&self) -> String {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("User {}", self.id.chars().take(6).collect::<String>()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "known_status"))]
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "known_status"))]
    pub status: Option<UserStatus>,
}

/// Request body for the transactional enroll-by-name flow.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrollUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub course_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentReceipt {
    pub user_email: String,
    pub course_name: String,
    pub message: String,
}
