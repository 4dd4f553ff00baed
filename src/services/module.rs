//! Course modules.

use validator::Validate;

use super::{found, to_document};
use crate::errors::AppError;
use crate::models::module::{CreateModule, Module, UpdateModule};
use crate::store::{collections, new_id, Filter, Store};

/// Modules of one course in `order`, ties in insertion order.
pub async fn list_by_course(store: &Store, course_id: &str) -> Result<Vec<Module>, AppError> {
    let filter = Filter::new().eq("courseId", course_id);
    let mut modules = store.find_as::<Module>(collections::MODULES, &filter).await?;
    modules.sort_by_key(|m| m.order);
    Ok(modules)
}

pub async fn get(store: &Store, id: &str) -> Result<Module, AppError> {
    found(store.get_as::<Module>(collections::MODULES, id).await?, "Module")
}

/// Create a module under an existing course.
pub async fn create(store: &Store, input: &CreateModule) -> Result<Module, AppError> {
    input.validate()?;
    if store.get(collections::COURSES, &input.course_id).await?.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }
    let doc = store
        .insert(collections::MODULES, new_id(), to_document(input)?)
        .await?;
    tracing::info!(module_id = %doc.id, course_id = %input.course_id, "Module created");
    Ok(doc.into_entity()?)
}

pub async fn update(store: &Store, id: &str, input: &UpdateModule) -> Result<Module, AppError> {
    input.validate()?;
    let doc = store
        .update(collections::MODULES, id, to_document(input)?, None)
        .await?;
    Ok(doc.into_entity()?)
}

/// Delete a module. Its lessons are not touched.
pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    if !store.delete(collections::MODULES, id).await? {
        return Err(AppError::NotFound("Module not found".to_string()));
    }
    Ok(())
}
