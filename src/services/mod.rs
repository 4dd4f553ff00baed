//! Business logic services.

pub mod assessment;
pub mod charts;
pub mod course;
pub mod dashboard;
pub mod enrollment;
pub mod lesson;
pub mod module;
pub mod quiz;
pub mod user;

use serde_json::Value;

use crate::errors::AppError;
use crate::store::{Document, Store, StoreError};

/// Attempts made for a compare-and-swap update before reporting a conflict.
pub(crate) const CAS_ATTEMPTS: usize = 3;

/// Read a document, derive a patch from it and write the patch only if the
/// document is unchanged. Lost races are retried with a fresh read.
pub(crate) async fn update_with<F>(
    store: &Store,
    collection: &'static str,
    id: &str,
    entity: &str,
    mut build: F,
) -> Result<Document, AppError>
where
    F: FnMut(&Document) -> Result<Value, AppError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let current = store
            .get(collection, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{entity} not found")))?;
        let patch = build(&current)?;
        match store.update(collection, id, patch, Some(current.version)).await {
            Ok(updated) => return Ok(updated),
            Err(StoreError::VersionConflict { .. }) if attempt < CAS_ATTEMPTS => {
                tracing::debug!(collection, id, attempt, "Concurrent write, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Serialize a validated request into a document body.
pub(crate) fn to_document<T: serde::Serialize>(input: &T) -> Result<Value, AppError> {
    serde_json::to_value(input).map_err(|e| AppError::Internal(e.to_string()))
}

/// Map a missing document to a 404 naming the entity.
pub(crate) fn found<T>(entity: Option<T>, what: &str) -> Result<T, AppError> {
    entity.ok_or_else(|| AppError::NotFound(format!("{what} not found")))
}
