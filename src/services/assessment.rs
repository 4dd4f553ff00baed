//! Technical assessments (code-fix and SQL exercises).

use serde_json::{Map, Value};
use validator::Validate;

use super::{found, to_document};
use crate::errors::AppError;
use crate::models::assessment::{
    AssessmentFilters, AssessmentType, CreateAssessment, TechnicalAssessment, UpdateAssessment,
};
use crate::store::{collections, new_id, Filter, Store};

/// Fields owned by one payload variant; replaced as a set when the payload changes.
const PAYLOAD_FIELDS: &[&str] = &[
    "brokenCode",
    "correctOutput",
    "language",
    "expectedQuery",
    "sampleTable",
];

pub async fn list(
    store: &Store,
    filters: &AssessmentFilters,
) -> Result<Vec<TechnicalAssessment>, AppError> {
    let filter = Filter::new()
        .eq_opt("type", filters.kind.map(|k| k.as_str()))
        .eq_opt("isActive", filters.active);
    Ok(store.find_as(collections::ASSESSMENTS, &filter).await?)
}

pub async fn list_active(store: &Store) -> Result<Vec<TechnicalAssessment>, AppError> {
    list(
        store,
        &AssessmentFilters {
            kind: None,
            active: Some(true),
        },
    )
    .await
}

pub async fn list_by_type(
    store: &Store,
    kind: AssessmentType,
) -> Result<Vec<TechnicalAssessment>, AppError> {
    list(
        store,
        &AssessmentFilters {
            kind: Some(kind),
            active: None,
        },
    )
    .await
}

pub async fn get(store: &Store, id: &str) -> Result<TechnicalAssessment, AppError> {
    found(
        store.get_as::<TechnicalAssessment>(collections::ASSESSMENTS, id).await?,
        "Assessment",
    )
}

pub async fn create(
    store: &Store,
    input: &CreateAssessment,
) -> Result<TechnicalAssessment, AppError> {
    input.validate()?;
    let mut data = to_document(input)?;
    if input.is_active.is_none() {
        data["isActive"] = Value::Bool(true);
    }
    let doc = store.insert(collections::ASSESSMENTS, new_id(), data).await?;
    tracing::info!(assessment_id = %doc.id, kind = input.payload.kind().as_str(), "Assessment created");
    Ok(doc.into_entity()?)
}

/// Merge changes. A new payload replaces every type-specific field, so
/// switching type does not leave the old variant's fields behind.
pub async fn update(
    store: &Store,
    id: &str,
    input: &UpdateAssessment,
) -> Result<TechnicalAssessment, AppError> {
    input.validate()?;
    let mut patch = match to_document(input)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(payload) = &input.payload {
        for field in PAYLOAD_FIELDS {
            patch.insert(field.to_string(), Value::Null);
        }
        if let Value::Object(fields) = to_document(payload)? {
            patch.extend(fields);
        }
    }
    let doc = store
        .update(collections::ASSESSMENTS, id, Value::Object(patch), None)
        .await?;
    Ok(doc.into_entity()?)
}

pub async fn delete(store: &Store, id: &str) -> Result<(), AppError> {
    if !store.delete(collections::ASSESSMENTS, id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }
    Ok(())
}
