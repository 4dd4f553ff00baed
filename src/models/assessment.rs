//! Technical assessments: code-fix and SQL exercises attached to a course.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp::RecordDate;

/// Type-specific payload, discriminated by the document's `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssessmentPayload {
    #[serde(rename_all = "camelCase")]
    CodeFix {
        #[serde(alias = "broken_code")]
        broken_code: String,
        #[serde(alias = "correct_output")]
        correct_output: String,
        language: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SqlQuery {
        #[serde(alias = "expected_query")]
        expected_query: String,
        #[serde(alias = "sample_table", default)]
        sample_table: serde_json::Value,
    },
}

impl AssessmentPayload {
    pub fn kind(&self) -> AssessmentType {
        match self {
            Self::CodeFix { .. } => AssessmentType::CodeFix,
            Self::SqlQuery { .. } => AssessmentType::SqlQuery,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::CodeFix {
                broken_code,
                correct_output,
                ..
            } => broken_code.trim().is_empty() || correct_output.trim().is_empty(),
            Self::SqlQuery { expected_query, .. } => expected_query.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    CodeFix,
    SqlQuery,
}

impl AssessmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeFix => "code_fix",
            Self::SqlQuery => "sql_query",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAssessment {
    pub id: String,
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<String>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub payload: AssessmentPayload,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

fn validate_payload(payload: &AssessmentPayload) -> Result<(), validator::ValidationError> {
    if payload.is_blank() {
        return Err(validator::ValidationError::new("payload")
            .with_message("type-specific fields must not be empty".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessment {
    pub course_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<String>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    #[validate(custom(function = "validate_payload"))]
    pub payload: AssessmentPayload,
}

/// Partial update. `payload` is nested in the request and replaces the
/// stored type-specific fields as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing)]
    #[validate(custom(function = "validate_payload"))]
    pub payload: Option<AssessmentPayload>,
}

/// Query filters for the assessment list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentFilters {
    #[serde(rename = "type")]
    pub kind: Option<AssessmentType>,
    pub active: Option<bool>,
}
