//! Document models and request DTOs for all domain entities.

pub mod assessment;
pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod module;
pub mod pagination;
pub mod quiz;
pub mod timestamp;
pub mod user;

use serde::de::{Deserialize, DeserializeOwned, Deserializer};

/// Read a stored field, falling back to `T::default()` when the value has the
/// wrong shape. Imported documents are not validated on the way in.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
