//! Course modules: ordered children of a course.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp::RecordDate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub course_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Sort key within the course; ties keep insertion order.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub estimated_minutes: i64,
    #[serde(default)]
    pub total_lessons: i64,
    pub status: Option<String>,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModule {
    #[validate(length(min = 1))]
    pub course_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub estimated_minutes: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub total_lessons: i64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModule {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub total_lessons: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
