//! User accounts and the transactional enroll-by-course-name flow.

use chrono::SecondsFormat;
use serde_json::json;
use validator::Validate;

use super::{course, found, to_document};
use crate::errors::AppError;
use crate::models::course::Course;
use crate::models::pagination::{PagedResult, Pagination, SortOrder};
use crate::models::user::{CreateUser, EnrollUser, EnrollmentReceipt, UpdateUser, User};
use crate::store::{collections, new_id, Filter, Store, StoreError, WriteOp};

pub async fn list(store: &Store) -> Result<Vec<User>, AppError> {
    store
        .find_as::<User>(collections::USERS, &Filter::new())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to retrieve users");
            AppError::from(e)
        })
}

/// Sort key for one user; missing values compare lowest.
fn sort_key(user: &User, field: &str) -> Option<String> {
    match field {
        "username" => user.username.clone(),
        "email" => user.email.clone(),
        _ => user
            .created_at
            .as_ref()
            .and_then(|d| d.to_datetime())
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
}

/// One page of users sorted by `createdAt`, `username` or `email`.
///
/// Users without the sort field come first ascending and last descending.
pub async fn list_paged(
    store: &Store,
    pagination: &Pagination,
) -> Result<PagedResult<User>, AppError> {
    let field = pagination.sort_by();
    if !matches!(field, "createdAt" | "username" | "email") {
        return Err(AppError::Validation(format!(
            "Cannot sort users by '{field}'"
        )));
    }

    let mut keyed: Vec<(Option<String>, User)> = list(store)
        .await?
        .into_iter()
        .map(|u| (sort_key(&u, field), u))
        .collect();
    // Stable in both directions: equal keys keep store order.
    match pagination.order() {
        SortOrder::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortOrder::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }
    Ok(pagination.apply(keyed.into_iter().map(|(_, u)| u).collect()))
}

pub async fn get(store: &Store, id: &str) -> Result<User, AppError> {
    found(store.get_as::<User>(collections::USERS, id).await?, "User")
}

pub async fn find_by_email(store: &Store, email: &str) -> Result<Option<User>, AppError> {
    let filter = Filter::new().eq("email", email);
    Ok(store
        .find_one(collections::USERS, &filter)
        .await?
        .map(|doc| doc.into_entity())
        .transpose()?)
}

/// Look a user up by document id, then `userId`, then `username`.
pub async fn search(store: &Store, query: &str) -> Result<Vec<User>, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Search query is required".to_string()));
    }
    if let Some(user) = store.get_as::<User>(collections::USERS, query).await? {
        return Ok(vec![user]);
    }
    for field in ["userId", "username"] {
        let filter = Filter::new().eq(field, query);
        let users = store.find_as::<User>(collections::USERS, &filter).await?;
        if !users.is_empty() {
            return Ok(users);
        }
    }
    Ok(Vec::new())
}

/// Register a user. Emails are unique; new users start active with no courses.
pub async fn create(store: &Store, input: &CreateUser) -> Result<User, AppError> {
    input.validate()?;

    let data = json!({
        "userId": input.user_id,
        "username": input.username,
        "email": input.email,
        "coursesTaken": [],
        "status": input.status.map(|s| json!(s)).unwrap_or_else(|| json!("active")),
    });
    let guard = Filter::new().eq("email", input.email.as_str());

    let doc = store
        .insert_unique(collections::USERS, new_id(), data, &guard)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate { .. } => {
                AppError::Conflict("User with this email already exists".to_string())
            }
            other => other.into(),
        })?;
    tracing::info!(user_id = %doc.id, "User created");
    Ok(doc.into_entity()?)
}

pub async fn update(store: &Store, id: &str, input: &UpdateUser) -> Result<User, AppError> {
    input.validate()?;
    if let Some(email) = &input.email {
        if let Some(other) = find_by_email(store, email).await? {
            if other.id != id {
                return Err(AppError::Conflict(
                    "User with this email already exists".to_string(),
                ));
            }
        }
    }
    let doc = store
        .update(collections::USERS, id, to_document(input)?, None)
        .await?;
    Ok(doc.into_entity()?)
}

pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    if !store.delete(collections::USERS, id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(())
}

/// Enroll a user in a course by name.
///
/// The user's `coursesTaken` and the course's `enrolledUsers` are written in
/// one commit, each guarded by the version that was read.
pub async fn enroll_in_course(
    store: &Store,
    input: &EnrollUser,
) -> Result<EnrollmentReceipt, AppError> {
    input.validate()?;

    let user_doc = store
        .find_one(collections::USERS, &Filter::new().eq("email", input.email.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let course_doc = course::find_document_by_name(store, &input.course_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let user: User = user_doc.clone().into_entity()?;
    let target: Course = course_doc.clone().into_entity()?;

    if user.courses_taken.iter().any(|c| c == &input.course_name) {
        return Err(AppError::Conflict(
            "User is already enrolled in this course".to_string(),
        ));
    }

    let mut courses_taken = user.courses_taken;
    courses_taken.push(input.course_name.clone());
    let mut ops = vec![WriteOp::update(
        collections::USERS,
        user_doc.id,
        json!({ "coursesTaken": courses_taken }),
        Some(user_doc.version),
    )];

    if !target.enrolled_users.iter().any(|u| u == &input.email) {
        let mut enrolled = target.enrolled_users;
        enrolled.push(input.email.clone());
        ops.push(WriteOp::update(
            collections::COURSES,
            course_doc.id,
            course::enrolled_users_patch(&enrolled),
            Some(course_doc.version),
        ));
    }

    store.commit(ops).await.map_err(|e| {
        tracing::warn!(email = %input.email, course = %input.course_name, error = %e, "Enrollment commit failed");
        AppError::from(e)
    })?;
    tracing::info!(email = %input.email, course = %input.course_name, "User enrolled in course");

    Ok(EnrollmentReceipt {
        user_email: input.email.clone(),
        course_name: input.course_name.clone(),
        message: "User successfully enrolled in course".to_string(),
    })
}
