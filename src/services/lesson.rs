//! Lessons within a module.

use validator::Validate;

use super::{found, to_document};
use crate::errors::AppError;
use crate::models::lesson::{CreateLesson, Lesson, UpdateLesson};
use crate::models::module::Module;
use crate::store::{collections, new_id, Filter, Store};

pub async fn list_by_module(store: &Store, module_id: &str) -> Result<Vec<Lesson>, AppError> {
    let filter = Filter::new().eq("moduleId", module_id);
    let mut lessons = store.find_as::<Lesson>(collections::LESSONS, &filter).await?;
    lessons.sort_by_key(|l| l.order);
    Ok(lessons)
}

pub async fn get(store: &Store, id: &str) -> Result<Lesson, AppError> {
    found(store.get_as::<Lesson>(collections::LESSONS, id).await?, "Lesson")
}

/// Create a lesson, copying `courseId` from its module when not given.
pub async fn create(store: &Store, input: &CreateLesson) -> Result<Lesson, AppError> {
    input.validate()?;
    let module = found(
        store.get_as::<Module>(collections::MODULES, &input.module_id).await?,
        "Module",
    )?;

    let mut data = to_document(input)?;
    if input.course_id.is_none() {
        data["courseId"] = module.course_id.into();
    }
    let doc = store.insert(collections::LESSONS, new_id(), data).await?;
    tracing::info!(lesson_id = %doc.id, module_id = %input.module_id, "Lesson created");
    Ok(doc.into_entity()?)
}

pub async fn update(store: &Store, id: &str, input: &UpdateLesson) -> Result<Lesson, AppError> {
    input.validate()?;
    let doc = store
        .update(collections::LESSONS, id, to_document(input)?, None)
        .await?;
    Ok(doc.into_entity()?)
}

pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    if !store.delete(collections::LESSONS, id).await? {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_lesson(module_id: &str, title: &str, order: i64) -> CreateLesson {
        CreateLesson {
            module_id: module_id.to_string(),
            course_id: None,
            title: title.to_string(),
            content: Some("...".to_string()),
            order,
            duration: Some(10.0),
        }
    }

    async fn store_with_module() -> Store {
        let store = Store::memory();
        store
            .insert(
                collections::MODULES,
                "m1".to_string(),
                json!({"courseId": "c1", "title": "Intro", "order": 1}),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn create_inherits_course_from_module() {
        let store = store_with_module().await;
        let lesson = create(&store, &new_lesson("m1", "Hello", 1)).await.unwrap();
        assert_eq!(lesson.course_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn create_under_missing_module_is_not_found() {
        let store = Store::memory();
        let err = create(&store, &new_lesson("m404", "Hello", 1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn lessons_listed_in_order() {
        let store = store_with_module().await;
        create(&store, &new_lesson("m1", "B", 2)).await.unwrap();
        create(&store, &new_lesson("m1", "A", 1)).await.unwrap();
        let titles: Vec<_> = list_by_module(&store, "m1")
            .await
            .unwrap()
            .into_iter()
            .filter_map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }
}
