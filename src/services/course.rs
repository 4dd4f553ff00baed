//! Course catalogue and the denormalized enrolled-user list.

use chrono::Utc;
use serde_json::json;
use validator::Validate;

use super::{found, to_document, update_with};
use crate::errors::AppError;
use crate::models::course::{Course, CreateCourse, UpdateCourse};
use crate::models::module::Module;
use crate::store::{collections, Document, Filter, Store};

/// All courses with list defaults filled in.
pub async fn list(store: &Store) -> Result<Vec<Course>, AppError> {
    let courses = store
        .find_as::<Course>(collections::COURSES, &Filter::new())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to retrieve courses");
            AppError::from(e)
        })?;
    Ok(courses.into_iter().map(Course::normalized).collect())
}

pub async fn get(store: &Store, id: &str) -> Result<Course, AppError> {
    let course = store.get_as::<Course>(collections::COURSES, id).await?;
    found(course, "Course").map(Course::normalized)
}

/// Look a course up by `courseName`, then by `title`.
pub(crate) async fn find_document_by_name(
    store: &Store,
    name: &str,
) -> Result<Option<Document>, AppError> {
    let by_name = Filter::new().eq("courseName", name);
    if let Some(doc) = store.find_one(collections::COURSES, &by_name).await? {
        return Ok(Some(doc));
    }
    let by_title = Filter::new().eq("title", name);
    Ok(store.find_one(collections::COURSES, &by_title).await?)
}

pub async fn find_by_name(store: &Store, name: &str) -> Result<Option<Course>, AppError> {
    find_document_by_name(store, name)
        .await?
        .map(|doc| doc.into_entity::<Course>().map(Course::normalized))
        .transpose()
        .map_err(AppError::from)
}

/// Create a course. The id is the supplied `courseId`, or `{language}_{millis}`.
pub async fn create(store: &Store, input: &CreateCourse) -> Result<Course, AppError> {
    input.validate()?;

    let language = input.language.as_deref().unwrap_or("General");
    let course_id = input
        .course_id
        .clone()
        .unwrap_or_else(|| format!("{}_{}", language.to_lowercase(), Utc::now().timestamp_millis()));
    let title = input
        .title
        .clone()
        .or_else(|| input.course_name.clone())
        .unwrap_or_else(|| course_id.clone());
    let course_name = input.course_name.clone().unwrap_or_else(|| title.clone());

    if find_document_by_name(store, &course_name).await?.is_some() {
        return Err(AppError::Conflict(
            "Course with this name already exists".to_string(),
        ));
    }

    let data = json!({
        "courseId": course_id,
        "title": title,
        "courseName": course_name,
        "description": input.description.as_deref().unwrap_or("No description available"),
        "difficulty": input.difficulty.as_deref().unwrap_or("Beginner"),
        "language": language,
        "duration": input.duration.unwrap_or(0.0),
        "thumbnail": input.thumbnail,
        "enrolledUsers": [],
        "enrolledStudents": 0,
        "enrollmentCount": 0,
        "rating": 0.0,
        "status": input.status.map(|s| json!(s)).unwrap_or_else(|| json!("active")),
    });

    let doc = store
        .insert(collections::COURSES, course_id.clone(), data)
        .await
        .map_err(|e| {
            tracing::error!(course_id = %course_id, error = %e, "Failed to create course");
            AppError::from(e)
        })?;
    tracing::info!(course_id = %course_id, "Course created");
    Ok(doc.into_entity::<Course>()?.normalized())
}

/// Merge changes; `title` and `courseName` stay in sync.
pub async fn update(store: &Store, id: &str, input: UpdateCourse) -> Result<Course, AppError> {
    input.validate()?;
    let patch = to_document(&input.synced())?;
    let doc = store.update(collections::COURSES, id, patch, None).await?;
    Ok(doc.into_entity::<Course>()?.normalized())
}

/// Remove the course document. Modules and lessons are left in place.
pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    if !store.delete(collections::COURSES, id).await? {
        return Err(AppError::NotFound("Course not found".to_string()));
    }
    tracing::info!(course_id = %id, "Course deleted");
    Ok(())
}

pub async fn add_user(store: &Store, id: &str, email: &str) -> Result<Course, AppError> {
    let doc = update_with(store, collections::COURSES, id, "Course", |doc| {
        let course: Course = doc.clone().into_entity()?;
        if course.enrolled_users.iter().any(|u| u == email) {
            return Err(AppError::Conflict(
                "User is already enrolled in this course".to_string(),
            ));
        }
        let mut users = course.enrolled_users;
        users.push(email.to_string());
        Ok(enrolled_users_patch(&users))
    })
    .await?;
    Ok(doc.into_entity::<Course>()?.normalized())
}

pub async fn remove_user(store: &Store, id: &str, email: &str) -> Result<Course, AppError> {
    let doc = update_with(store, collections::COURSES, id, "Course", |doc| {
        let course: Course = doc.clone().into_entity()?;
        let users: Vec<String> = course
            .enrolled_users
            .into_iter()
            .filter(|u| u != email)
            .collect();
        Ok(enrolled_users_patch(&users))
    })
    .await?;
    Ok(doc.into_entity::<Course>()?.normalized())
}

/// The enrolled list and its count, written together.
pub(crate) fn enrolled_users_patch(users: &[String]) -> serde_json::Value {
    json!({
        "enrolledUsers": users,
        "enrolledStudents": users.len(),
    })
}

pub async fn enrolled_users(store: &Store, id: &str) -> Result<Vec<String>, AppError> {
    Ok(get(store, id).await?.enrolled_users)
}

/// Modules of a course ordered by `order`; equal orders keep insertion order.
pub async fn modules(store: &Store, id: &str) -> Result<Vec<Module>, AppError> {
    let filter = Filter::new().eq("courseId", id);
    let mut modules = store.find_as::<Module>(collections::MODULES, &filter).await?;
    modules.sort_by_key(|m| m.order);
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::CourseStatus;

    fn new_course(id: Option<&str>, name: Option<&str>) -> CreateCourse {
        CreateCourse {
            course_id: id.map(str::to_string),
            title: None,
            course_name: name.map(str::to_string),
            description: None,
            difficulty: None,
            language: Some("Rust".to_string()),
            duration: None,
            thumbnail: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn create_generates_language_prefixed_id_and_mirrors_name() {
        let store = Store::memory();
        let course = create(&store, &new_course(None, Some("Ownership"))).await.unwrap();
        assert!(course.id.starts_with("rust_"));
        assert_eq!(course.title.as_deref(), Some("Ownership"));
        assert_eq!(course.course_name.as_deref(), Some("Ownership"));
        assert_eq!(course.course_id.as_deref(), Some(course.id.as_str()));
        assert_eq!(course.status, Some(CourseStatus::Active));
        assert_eq!(course.enrolled_students, 0);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let store = Store::memory();
        create(&store, &new_course(Some("a"), Some("Same"))).await.unwrap();
        let err = create(&store, &new_course(Some("b"), Some("Same"))).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_keeps_title_and_name_in_sync() {
        let store = Store::memory();
        create(&store, &new_course(Some("c1"), Some("Old"))).await.unwrap();
        let changes = UpdateCourse {
            title: Some("New".to_string()),
            ..Default::default()
        };
        let course = update(&store, "c1", changes).await.unwrap();
        assert_eq!(course.course_name.as_deref(), Some("New"));
        assert_eq!(find_by_name(&store, "New").await.unwrap().unwrap().id, "c1");
    }

    #[tokio::test]
    async fn enrolled_count_tracks_list() {
        let store = Store::memory();
        create(&store, &new_course(Some("c1"), None)).await.unwrap();

        add_user(&store, "c1", "a@x.io").await.unwrap();
        let course = add_user(&store, "c1", "b@x.io").await.unwrap();
        assert_eq!(course.enrolled_students, 2);

        let err = add_user(&store, "c1", "a@x.io").await.unwrap_err();
        assert!(err.is_conflict());

        let course = remove_user(&store, "c1", "a@x.io").await.unwrap();
        assert_eq!(course.enrolled_users, vec!["b@x.io".to_string()]);
        let stored = store.get("courses", "c1").await.unwrap().unwrap();
        assert_eq!(stored.data["enrolledStudents"], 1);
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let store = Store::memory();
        assert!(get(&store, "nope").await.unwrap_err().is_not_found());
        assert!(add_user(&store, "nope", "a@x.io").await.unwrap_err().is_not_found());
        assert!(delete(&store, "nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn modules_sorted_by_order_then_insertion() {
        let store = Store::memory();
        for (id, order) in [("m-late", 2), ("m-first", 1), ("m-tie", 1)] {
            store
                .insert(
                    collections::MODULES,
                    id.to_string(),
                    json!({"courseId": "c1", "title": id, "order": order}),
                )
                .await
                .unwrap();
        }
        let ids: Vec<String> = modules(&store, "c1").await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m-first", "m-tie", "m-late"]);
    }
}
