//! Quiz questions, stored flat and filtered by course and module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::{found, to_document};
use crate::errors::AppError;
use crate::models::quiz::{CreateQuiz, Quiz, QuizDifficulty, UpdateQuiz};
use crate::store::{collections, new_id, Filter, Store};

/// Module filter value meaning "every module".
const ALL_MODULES: &str = "all";

/// Quizzes of a course, optionally narrowed to one module.
///
/// The module match is done after loading so documents that still spell the
/// field `module_id` are included.
pub async fn list(
    store: &Store,
    course_id: &str,
    module_id: Option<&str>,
) -> Result<Vec<Quiz>, AppError> {
    let filter = Filter::new().eq("courseId", course_id);
    let quizzes = store.find_as::<Quiz>(collections::QUIZZES, &filter).await?;
    Ok(match module_id.filter(|m| *m != ALL_MODULES) {
        Some(module) => quizzes
            .into_iter()
            .filter(|q| q.module_id.as_deref() == Some(module))
            .collect(),
        None => quizzes,
    })
}

pub async fn get(store: &Store, id: &str) -> Result<Quiz, AppError> {
    found(store.get_as::<Quiz>(collections::QUIZZES, id).await?, "Quiz")
}

/// Canonical upper-case spelling of a validated difficulty.
fn canonical_difficulty(value: &str) -> Result<QuizDifficulty, AppError> {
    value.parse().map_err(AppError::Validation)
}

pub async fn create(store: &Store, course_id: &str, mut input: CreateQuiz) -> Result<Quiz, AppError> {
    input.course_id = course_id.to_string();
    input.validate()?;
    if store.get(collections::COURSES, course_id).await?.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let difficulty = match input.difficulty.as_deref() {
        Some(d) => canonical_difficulty(d)?,
        None => QuizDifficulty::Normal,
    };
    let mut data = to_document(&input)?;
    data["difficulty"] = json!(difficulty);
    data["isActive"] = json!(input.is_active.unwrap_or(true));

    let doc = store.insert(collections::QUIZZES, new_id(), data).await?;
    tracing::info!(quiz_id = %doc.id, course_id, "Quiz created");
    Ok(doc.into_entity()?)
}

pub async fn update(store: &Store, id: &str, input: &UpdateQuiz) -> Result<Quiz, AppError> {
    input.validate()?;
    let mut patch = to_document(input)?;
    if let Some(d) = input.difficulty.as_deref() {
        patch["difficulty"] = json!(canonical_difficulty(d)?);
    }
    let doc = store.update(collections::QUIZZES, id, patch, None).await?;
    Ok(doc.into_entity()?)
}

pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    if !store.delete(collections::QUIZZES, id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    Ok(())
}

/// Difficulty breakdown for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total: i64,
    pub easy: i64,
    pub normal: i64,
    pub hard: i64,
    pub by_module: BTreeMap<String, i64>,
}

/// Count a course's quizzes by difficulty and module.
///
/// Unknown difficulties count as normal; quizzes without a module are
/// grouped under `"unknown"`.
pub async fn stats(store: &Store, course_id: &str) -> Result<QuizStats, AppError> {
    let quizzes = list(store, course_id, None).await?;
    let mut stats = QuizStats {
        total: quizzes.len() as i64,
        easy: 0,
        normal: 0,
        hard: 0,
        by_module: BTreeMap::new(),
    };
    for quiz in &quizzes {
        let difficulty = quiz
            .difficulty
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(QuizDifficulty::Normal);
        match difficulty {
            QuizDifficulty::Easy => stats.easy += 1,
            QuizDifficulty::Normal => stats.normal += 1,
            QuizDifficulty::Hard => stats.hard += 1,
        }
        let module = quiz.module_id.clone().unwrap_or_else(|| "unknown".to_string());
        *stats.by_module.entry(module).or_default() += 1;
    }
    Ok(stats)
}
