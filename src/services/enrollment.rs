//! Enrollment records and the course `enrollmentCount` they drive.
//!
//! Each create or delete commits the enrollment write and the counter change
//! together, guarded by the course version that was read.

use serde_json::json;
use validator::Validate;

use super::{found, to_document, CAS_ATTEMPTS};
use crate::errors::AppError;
use crate::models::enrollment::{
    CreateEnrollment, Enrollment, EnrollmentFilters, EnrollmentStatus, ProgressUpdate,
    UpdateEnrollment,
};
use crate::store::{collections, new_id, Document, Filter, Store, StoreError, WriteOp};

const ALREADY_ENROLLED: &str = "User is already enrolled in this course";

pub async fn list(store: &Store, filters: &EnrollmentFilters) -> Result<Vec<Enrollment>, AppError> {
    let filter = Filter::new()
        .eq_opt("userId", filters.user_id.as_deref())
        .eq_opt("courseId", filters.course_id.as_deref())
        .eq_opt("status", filters.status.map(|s| s.as_str()));
    Ok(store.find_as(collections::ENROLLMENTS, &filter).await?)
}

pub async fn get(store: &Store, id: &str) -> Result<Enrollment, AppError> {
    found(store.get_as::<Enrollment>(collections::ENROLLMENTS, id).await?, "Enrollment")
}

/// Counter patch moving `enrollmentCount` by `delta`, never below zero.
fn count_patch(course: &Document, delta: i64) -> serde_json::Value {
    let current = course.data["enrollmentCount"].as_i64().unwrap_or(0);
    json!({ "enrollmentCount": (current + delta).max(0) })
}

/// Commit `build(course)` against the latest course version, retrying lost races.
async fn commit_with_course<F>(store: &Store, course_id: &str, build: F) -> Result<(), AppError>
where
    F: Fn(&Document) -> Vec<WriteOp>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let course = store
            .get(collections::COURSES, course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
        match store.commit(build(&course)).await {
            Ok(()) => return Ok(()),
            Err(StoreError::Duplicate { .. }) => {
                return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()))
            }
            Err(StoreError::VersionConflict { .. }) if attempt < CAS_ATTEMPTS => {
                tracing::debug!(course_id, attempt, "Course changed during enrollment write, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Create an enrollment. A second active enrollment for the same user and
/// course is rejected.
pub async fn create(store: &Store, input: &CreateEnrollment) -> Result<Enrollment, AppError> {
    input.validate()?;

    let status = input.status.unwrap_or(EnrollmentStatus::Active);
    let progress = match status {
        EnrollmentStatus::Active => 0,
        EnrollmentStatus::Completed => 100,
    };
    let id = new_id();
    let data = json!({
        "userId": input.user_id,
        "courseId": input.course_id,
        "status": status,
        "progress": progress,
    });
    let guard = Filter::new()
        .eq("userId", input.user_id.as_str())
        .eq("courseId", input.course_id.as_str())
        .eq("status", EnrollmentStatus::Active.as_str());

    commit_with_course(store, &input.course_id, |course| {
        let insert = match status {
            EnrollmentStatus::Active => WriteOp::insert_unique(
                collections::ENROLLMENTS,
                id.clone(),
                data.clone(),
                guard.clone(),
            ),
            EnrollmentStatus::Completed => {
                WriteOp::insert(collections::ENROLLMENTS, id.clone(), data.clone())
            }
        };
        vec![
            insert,
            WriteOp::update(
                collections::COURSES,
                course.id.clone(),
                count_patch(course, 1),
                Some(course.version),
            ),
        ]
    })
    .await?;
    tracing::info!(enrollment_id = %id, user_id = %input.user_id, course_id = %input.course_id, "Enrollment created");
    get(store, &id).await
}

pub async fn update(
    store: &Store,
    id: &str,
    input: &UpdateEnrollment,
) -> Result<Enrollment, AppError> {
    input.validate()?;
    let mut patch = to_document(input)?;
    if input.progress == Some(100) {
        patch["status"] = json!(EnrollmentStatus::Completed);
    } else if input.status == Some(EnrollmentStatus::Active) {
        ensure_can_reactivate(store, id).await?;
    }
    let doc = store
        .update(collections::ENROLLMENTS, id, patch, None)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate { .. } => AppError::Conflict(ALREADY_ENROLLED.to_string()),
            other => other.into(),
        })?;
    Ok(doc.into_entity()?)
}

/// Reject moving an enrollment back to active while the same user already
/// holds another active enrollment in that course.
async fn ensure_can_reactivate(store: &Store, id: &str) -> Result<(), AppError> {
    let current = get(store, id).await?;
    if current.is_active() {
        return Ok(());
    }
    let active = Filter::new()
        .eq("userId", current.user_id.as_str())
        .eq("courseId", current.course_id.as_str())
        .eq("status", EnrollmentStatus::Active.as_str());
    if store.count(collections::ENROLLMENTS, &active).await? > 0 {
        return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()));
    }
    Ok(())
}

/// Set progress (0–100). Reaching 100 completes the enrollment.
pub async fn update_progress(
    store: &Store,
    id: &str,
    input: &ProgressUpdate,
) -> Result<Enrollment, AppError> {
    input.validate()?;
    update(
        store,
        id,
        &UpdateEnrollment {
            status: None,
            progress: Some(input.progress),
        },
    )
    .await
}

/// Delete an enrollment and decrement its course's `enrollmentCount`.
pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    let enrollment = get(store, id).await?;
    let course_exists = store
        .get(collections::COURSES, &enrollment.course_id)
        .await?
        .is_some();

    if course_exists {
        commit_with_course(store, &enrollment.course_id, |course| {
            vec![
                WriteOp::delete(collections::ENROLLMENTS, id),
                WriteOp::update(
                    collections::COURSES,
                    course.id.clone(),
                    count_patch(course, -1),
                    Some(course.version),
                ),
            ]
        })
        .await?;
    } else if !store.delete(collections::ENROLLMENTS, id).await? {
        return Err(AppError::NotFound("Enrollment not found".to_string()));
    }
    tracing::info!(enrollment_id = %id, "Enrollment deleted");
    Ok(())
}
