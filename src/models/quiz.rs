//! Multiple-choice quiz questions.
//!
//! Quizzes live in one flat collection keyed by `courseId` and `moduleId`.
//! Older exports nested them under `course_quiz/{courseId}/questions` with a
//! snake_case `module_id`; that spelling is still accepted on read.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::timestamp::RecordDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuizDifficulty {
    Easy,
    Normal,
    Hard,
}

impl FromStr for QuizDifficulty {
    type Err = String;

    /// Case-insensitive; `Medium` is an alias of `NORMAL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Self::Easy),
            "NORMAL" | "MEDIUM" => Ok(Self::Normal),
            "HARD" => Ok(Self::Hard),
            other => Err(format!("unknown quiz difficulty '{other}'")),
        }
    }
}

fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<QuizDifficulty>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("difficulty"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    #[serde(alias = "module_id")]
    pub module_id: Option<String>,
    pub lesson_id: Option<String>,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_option_index: u8,
    pub difficulty: Option<String>,
    pub explanation: Option<String>,
    /// Unset means active.
    pub is_active: Option<bool>,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuiz {
    /// Taken from the route when posted under a course.
    #[serde(default)]
    pub course_id: String,
    pub module_id: Option<String>,
    pub lesson_id: Option<String>,
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(equal = 4))]
    pub options: Vec<String>,
    #[validate(range(max = 3))]
    pub correct_option_index: u8,
    #[validate(custom(function = "validate_difficulty"))]
    pub difficulty: Option<String>,
    pub explanation: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuiz {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 4))]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 3))]
    pub correct_option_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_difficulty"))]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
