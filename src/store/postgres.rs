//! PostgreSQL document store: every collection lives in the `documents` table.

use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use super::{Document, Filter, StoreError, Tally, WriteOp};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    version: i64,
    data: Value,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            version: row.version,
            data: row.data,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TallyRow {
    value: Value,
    count: i64,
}

/// Map unique-index violations to [`StoreError::Duplicate`].
fn map_write_error(collection: &str, e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::duplicate(collection)
        }
        _ => StoreError::Database(e),
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(super) async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(super) async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: &Value,
        guard: Option<&Filter>,
    ) -> Result<Document, StoreError> {
        let row = match guard {
            None => sqlx::query_as::<_, DocumentRow>(
                r#"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                RETURNING id, version, data
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(data)
            .fetch_optional(&self.pool)
            .await,
            Some(guard) => sqlx::query_as::<_, DocumentRow>(
                r#"
                INSERT INTO documents (collection, id, data)
                SELECT $1::text, $2::text, $3::jsonb
                WHERE NOT EXISTS (
                    SELECT 1 FROM documents WHERE collection = $1::text AND data @> $4::jsonb
                )
                RETURNING id, version, data
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(data)
            .bind(guard.to_json())
            .fetch_optional(&self.pool)
            .await,
        }
        .map_err(|e| map_write_error(collection, e))?;

        row.map(Document::from)
            .ok_or_else(|| StoreError::duplicate(collection))
    }

    pub(super) async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, version, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    pub(super) async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, version, data
            FROM documents
            WHERE collection = $1 AND data @> $2::jsonb
            ORDER BY seq
            LIMIT $3
            "#,
        )
        .bind(collection)
        .bind(filter.to_json())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    pub(super) async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &Value,
        expected_version: Option<i64>,
    ) -> Result<Document, StoreError> {
        let mut tx = self.pool.begin().await?;
        let doc = update_in_tx(&mut tx, collection, id, patch, expected_version).await?;
        tx.commit().await?;
        Ok(doc)
    }

    pub(super) async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND data @> $2::jsonb",
        )
        .bind(collection)
        .bind(filter.to_json())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub(super) async fn tally(&self, collection: &str, field: &str) -> Result<Vec<Tally>, StoreError> {
        let rows = sqlx::query_as::<_, TallyRow>(
            r#"
            SELECT COALESCE(data -> $2::text, 'null'::jsonb) AS value, COUNT(*) AS count
            FROM documents
            WHERE collection = $1
            GROUP BY 1
            "#,
        )
        .bind(collection)
        .bind(field)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Tally {
                value: r.value,
                count: r.count,
            })
            .collect())
    }

    pub(super) async fn commit(&self, ops: &[WriteOp]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for op in ops {
            match op {
                WriteOp::Insert {
                    collection,
                    id,
                    data,
                    guard,
                } => {
                    let inserted = sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        SELECT $1::text, $2::text, $3::jsonb
                        WHERE $4::jsonb IS NULL OR NOT EXISTS (
                            SELECT 1 FROM documents WHERE collection = $1::text AND data @> $4::jsonb
                        )
                        "#,
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(data)
                    .bind(guard.as_ref().map(Filter::to_json))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_write_error(collection, e))?;
                    if inserted.rows_affected() == 0 {
                        return Err(StoreError::duplicate(collection));
                    }
                }
                WriteOp::Update {
                    collection,
                    id,
                    patch,
                    expected_version,
                } => {
                    update_in_tx(&mut tx, collection, id, patch, *expected_version).await?;
                }
                WriteOp::Delete { collection, id } => {
                    let result =
                        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                            .bind(collection)
                            .bind(id)
                            .execute(&mut *tx)
                            .await?;
                    if result.rows_affected() == 0 {
                        return Err(StoreError::not_found(collection, id));
                    }
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Compare-and-swap merge inside an open transaction.
async fn update_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    id: &str,
    patch: &Value,
    expected_version: Option<i64>,
) -> Result<Document, StoreError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        r#"
        UPDATE documents
        SET data = data || $3::jsonb, version = version + 1, updated_at = NOW()
        WHERE collection = $1 AND id = $2 AND ($4::bigint IS NULL OR version = $4)
        RETURNING id, version, data
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(patch)
    .bind(expected_version)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_write_error(collection, e))?;

    if let Some(row) = row {
        return Ok(row.into());
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND id = $2)",
    )
    .bind(collection)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    if exists {
        Err(StoreError::conflict(collection, id))
    } else {
        Err(StoreError::not_found(collection, id))
    }
}
