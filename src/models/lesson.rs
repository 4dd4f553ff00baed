//! Lessons belong to a module; `courseId` is carried along for direct lookups.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp::RecordDate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub order: i64,
    pub duration: Option<f64>,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLesson {
    #[validate(length(min = 1))]
    pub module_id: String,
    /// Filled from the owning module when omitted.
    pub course_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[validate(range(min = 0.0))]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLesson {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub duration: Option<f64>,
}
