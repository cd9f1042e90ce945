//! Collection-oriented document store.
//!
//! Every operation takes the collection name and works on JSON documents,
//! so the same accessor serves all resource kinds.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;

/// Field the store uses for the document identifier on the wire.
pub const ID_FIELD: &str = "_id";

/// Ordering applied to a listing, keyed on a top-level document field.
/// Ties fall back to insertion order in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: &'static str,
    pub descending: bool,
}

impl SortOrder {
    pub const fn descending(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Result of a field-merge update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// A stored document: its id plus the JSON body.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: String,
    pub body: Value,
}

/// Document store backed by SQLite.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Close the underlying pool. Later calls fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert a document and return its generated id.
    pub async fn insert<D: Serialize>(
        &self,
        collection: &str,
        document: &D,
    ) -> Result<String, AppError> {
        let mut fields = into_object(serde_json::to_value(document)?)?;
        fields.remove(ID_FIELD);

        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(&fields)?;

        self.bounded(
            "insert",
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(collection)
                .bind(&id)
                .bind(&body)
                .execute(&self.pool),
        )
        .await?;

        Ok(id)
    }

    /// List every document in a collection.
    pub async fn find_all(
        &self,
        collection: &str,
        order: Option<SortOrder>,
    ) -> Result<Vec<RawDocument>, AppError> {
        let rows = match order {
            None => {
                self.bounded(
                    "find",
                    sqlx::query(
                        "SELECT id, body FROM documents WHERE collection = ? ORDER BY seq",
                    )
                    .bind(collection)
                    .fetch_all(&self.pool),
                )
                .await?
            }
            Some(order) => {
                let sql = if order.descending {
                    "SELECT id, body FROM documents WHERE collection = ? ORDER BY json_extract(body, ?) DESC, seq DESC"
                } else {
                    "SELECT id, body FROM documents WHERE collection = ? ORDER BY json_extract(body, ?) ASC, seq ASC"
                };
                self.bounded(
                    "find",
                    sqlx::query(sql)
                        .bind(collection)
                        .bind(json_path(order.field))
                        .fetch_all(&self.pool),
                )
                .await?
            }
        };

        rows.iter()
            .map(|row| -> Result<RawDocument, AppError> {
                Ok(RawDocument {
                    id: row.get("id"),
                    body: serde_json::from_str(row.get::<&str, _>("body"))?,
                })
            })
            .collect()
    }

    /// Fetch a single document.
    #[cfg(test)]
    pub async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<RawDocument>, AppError> {
        let id = parse_id(id)?;

        let row = self
            .bounded(
                "find",
                sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(&id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        row.map(|row| -> Result<RawDocument, AppError> {
            Ok(RawDocument {
                id: row.get("id"),
                body: serde_json::from_str(row.get::<&str, _>("body"))?,
            })
        })
        .transpose()
    }

    /// Merge `fields` into the document.
    ///
    /// A merge that leaves the body unchanged matches without modifying.
    pub async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<UpdateOutcome, AppError> {
        let id = parse_id(id)?;

        let mut fields = fields.clone();
        fields.remove(ID_FIELD);
        let patch = serde_json::to_string(&fields)?;

        let result = self
            .bounded(
                "update",
                sqlx::query(
                    "UPDATE documents SET body = json_patch(body, ?) WHERE collection = ? AND id = ? AND json(body) IS NOT json_patch(body, ?)",
                )
                .bind(&patch)
                .bind(collection)
                .bind(&id)
                .bind(&patch)
                .execute(&self.pool),
            )
            .await?;

        let modified = result.rows_affected();
        if modified > 0 {
            return Ok(UpdateOutcome {
                matched: modified,
                modified,
            });
        }

        if self.exists(collection, &id).await? {
            Ok(UpdateOutcome {
                matched: 1,
                modified: 0,
            })
        } else {
            Err(not_found(collection, &id))
        }
    }

    /// Atomically add `amount` to an integer field, treating a missing field as 0.
    ///
    /// `amount` must be positive. An increment that would overflow `i64` is
    /// refused and leaves the document untouched.
    pub async fn increment_by_id(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        amount: i64,
    ) -> Result<u64, AppError> {
        let id = parse_id(id)?;
        if amount < 1 {
            return Err(AppError::Validation(format!(
                "Increment of {} must be positive, got {}",
                field, amount
            )));
        }
        let path = json_path(field);
        let ceiling = i64::MAX - amount;

        // One statement, so concurrent increments cannot overwrite each other
        let result = self
            .bounded(
                "increment",
                sqlx::query(
                    "UPDATE documents SET body = json_set(body, ?, COALESCE(json_extract(body, ?), 0) + ?) WHERE collection = ? AND id = ? AND COALESCE(json_extract(body, ?), 0) <= ?",
                )
                .bind(&path)
                .bind(&path)
                .bind(amount)
                .bind(collection)
                .bind(&id)
                .bind(&path)
                .bind(ceiling)
                .execute(&self.pool),
            )
            .await?;

        let rows = result.rows_affected();
        if rows > 0 {
            return Ok(rows);
        }

        if self.exists(collection, &id).await? {
            Err(AppError::Validation(format!(
                "Adding {} to {} of document {} would overflow",
                amount, field, id
            )))
        } else {
            Err(not_found(collection, &id))
        }
    }

    /// Delete a document. Returns the number of deleted documents.
    pub async fn delete_by_id(&self, collection: &str, id: &str) -> Result<u64, AppError> {
        let id = parse_id(id)?;

        let result = self
            .bounded(
                "delete",
                sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(&id)
                    .execute(&self.pool),
            )
            .await?;

        match result.rows_affected() {
            0 => Err(not_found(collection, &id)),
            rows => Ok(rows),
        }
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool, AppError> {
        let row = self
            .bounded(
                "find",
                sqlx::query("SELECT 1 FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;
        Ok(row.is_some())
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                tracing::error!("Store {} timed out after {:?}", operation, self.timeout);
                Err(AppError::Database(format!(
                    "Store {} timed out after {} ms",
                    operation,
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

/// Validate and normalize a document id.
pub fn parse_id(id: &str) -> Result<String, AppError> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| AppError::InvalidId(format!("Invalid document id: {}", id)))
}

fn json_path(field: &str) -> String {
    format!("$.{}", field)
}

fn into_object(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(AppError::Internal(format!(
            "Documents must be JSON objects, got {}",
            other
        ))),
    }
}

fn not_found(collection: &str, id: &str) -> AppError {
    AppError::NotFound(format!("Document {} not found in {}", id, collection))
}
