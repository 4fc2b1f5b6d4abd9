//! Document repository for SQLite operations
//!
//! Every statement is scoped by `entity` first so that unrelated resources
//! sharing the table never see each other's rows.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{CompiledQuery, Document, SqlValue};
use crate::utils::time::{format_timestamp, parse_timestamp};

type DocumentTuple = (String, String, String, String);

const DOCUMENT_COLUMNS: &str = "id, created_at, updated_at, data";

fn row_to_document(entity: &str, row: DocumentTuple) -> Result<Document, SqliteError> {
    let (id, created_at, updated_at, data) = row;
    let corrupt = |reason: String| SqliteError::Corrupt {
        entity: entity.to_string(),
        id: id.clone(),
        reason,
    };

    let created_at = parse_timestamp(&created_at)
        .ok_or_else(|| corrupt(format!("invalid created_at: {}", created_at)))?;
    let updated_at = parse_timestamp(&updated_at)
        .ok_or_else(|| corrupt(format!("invalid updated_at: {}", updated_at)))?;
    let data: Map<String, Value> =
        serde_json::from_str(&data).map_err(|e| corrupt(e.to_string()))?;

    Ok(Document {
        id,
        created_at,
        updated_at,
        data,
    })
}

fn encode_data(data: &Map<String, Value>) -> String {
    Value::Object(data.clone()).to_string()
}

/// Insert a new document; a duplicate id within the entity is a conflict
pub async fn insert_document(
    pool: &SqlitePool,
    entity: &str,
    doc: &Document,
) -> Result<(), SqliteError> {
    let result = sqlx::query(
        r#"
        INSERT INTO documents (entity, id, created_at, updated_at, data)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(entity)
    .bind(&doc.id)
    .bind(format_timestamp(doc.created_at))
    .bind(format_timestamp(doc.updated_at))
    .bind(encode_data(&doc.data))
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(SqliteError::Conflict(
            format!("{}/{} already exists", entity, doc.id),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Get a single document
pub async fn get_document(
    pool: &SqlitePool,
    entity: &str,
    id: &str,
) -> Result<Option<Document>, SqliteError> {
    let sql = format!(
        "SELECT {} FROM documents WHERE entity = ? AND id = ?",
        DOCUMENT_COLUMNS
    );
    let row: Option<DocumentTuple> = sqlx::query_as(&sql)
        .bind(entity)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_document(entity, r)).transpose()
}

/// Merge-patch a document's user fields (RFC 7396: `null` removes a key)
///
/// Returns `None` when the document does not exist.
pub async fn update_document(
    pool: &SqlitePool,
    entity: &str,
    id: &str,
    patch: &Map<String, Value>,
    updated_at: DateTime<Utc>,
) -> Result<Option<Document>, SqliteError> {
    let sql = format!(
        r#"
        UPDATE documents
        SET data = json_patch(data, ?), updated_at = ?
        WHERE entity = ? AND id = ?
        RETURNING {}
        "#,
        DOCUMENT_COLUMNS
    );
    let row: Option<DocumentTuple> = sqlx::query_as(&sql)
        .bind(encode_data(patch))
        .bind(format_timestamp(updated_at))
        .bind(entity)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_document(entity, r)).transpose()
}

/// Delete a document, returning what was removed
///
/// A second delete of the same id returns `None`.
pub async fn delete_document(
    pool: &SqlitePool,
    entity: &str,
    id: &str,
) -> Result<Option<Document>, SqliteError> {
    let sql = format!(
        "DELETE FROM documents WHERE entity = ? AND id = ? RETURNING {}",
        DOCUMENT_COLUMNS
    );
    let row: Option<DocumentTuple> = sqlx::query_as(&sql)
        .bind(entity)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_document(entity, r)).transpose()
}

/// Fetch one page of documents matching a compiled query
pub async fn find_documents(
    pool: &SqlitePool,
    query: &CompiledQuery,
) -> Result<Vec<Document>, SqliteError> {
    let sql = format!(
        "SELECT {} FROM documents WHERE entity = ? AND ({}) ORDER BY {} LIMIT ? OFFSET ?",
        DOCUMENT_COLUMNS,
        query.predicate.sql,
        query.order_by_sql()
    );

    let mut q = sqlx::query_as::<_, DocumentTuple>(&sql).bind(&query.entity);
    for value in &query.predicate.params.values {
        q = match value {
            SqlValue::Text(v) => q.bind(v.as_str()),
            SqlValue::Integer(v) => q.bind(*v),
            SqlValue::Real(v) => q.bind(*v),
        };
    }
    let rows = q
        .bind(query.take as i64)
        .bind(query.skip as i64)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|r| row_to_document(&query.entity, r))
        .collect()
}

/// Count documents matching a compiled query (pagination ignored)
pub async fn count_documents(pool: &SqlitePool, query: &CompiledQuery) -> Result<u64, SqliteError> {
    let sql = format!(
        "SELECT COUNT(*) FROM documents WHERE entity = ? AND ({})",
        query.predicate.sql
    );

    let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(&query.entity);
    for value in &query.predicate.params.values {
        q = match value {
            SqlValue::Text(v) => q.bind(v.as_str()),
            SqlValue::Integer(v) => q.bind(*v),
            SqlValue::Real(v) => q.bind(*v),
        };
    }
    let count = q.fetch_one(pool).await?;

    Ok(count.max(0) as u64)
}

/// Count all documents of one entity
pub async fn count_entity(pool: &SqlitePool, entity: &str) -> Result<u64, SqliteError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE entity = ?")
        .bind(entity)
        .fetch_one(pool)
        .await?;
    Ok(count.max(0) as u64)
}
