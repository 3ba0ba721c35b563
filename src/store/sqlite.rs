//! SQLite-backed [`VectorStore`] implementation.
//!
//! All collections share one `records` table, partitioned by the
//! `collection` column. Embeddings are stored as little-endian `f32` BLOBs
//! and nearest-neighbour queries are brute-force cosine distance over the
//! collection, which is adequate for a personal document folder.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::migrate::run_migrations;
use crate::models::{ChunkMetadata, ChunkRecord, StoredChunk};

use super::{nearest, RecordFilter, ScoredChunk, StoreError, VectorStore, DISTANCE_METRIC};

/// SQLite implementation of the [`VectorStore`] trait.
///
/// Wraps a [`SqlitePool`] opened once per process and scoped to one named
/// collection.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    /// Run migrations and get-or-create `collection` with the cosine metric.
    ///
    /// # Errors
    ///
    /// Fails if the collection already exists with another metric.
    pub async fn open(pool: SqlitePool, collection: impl Into<String>) -> Result<Self, StoreError> {
        run_migrations(&pool).await?;
        let collection = collection.into();

        let metric: Option<String> =
            sqlx::query_scalar("SELECT metric FROM collections WHERE name = ?")
                .bind(&collection)
                .fetch_optional(&pool)
                .await?;

        match metric {
            Some(m) if m != DISTANCE_METRIC => {
                return Err(StoreError::Collection(format!(
                    "collection '{}' uses metric '{}', expected '{}'",
                    collection, m, DISTANCE_METRIC
                )));
            }
            Some(_) => {}
            None => {
                sqlx::query("INSERT INTO collections (name, metric, created_at) VALUES (?, ?, ?)")
                    .bind(&collection)
                    .bind(DISTANCE_METRIC)
                    .bind(unix_now())
                    .execute(&pool)
                    .await?;
                tracing::info!(collection = %collection, "created collection");
            }
        }

        Ok(Self { pool, collection })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Reject `records` whose dimension differs from the collection's, ignoring
/// rows of `replacing` since they are about to be deleted.
async fn check_dimensions(
    conn: &mut SqliteConnection,
    collection: &str,
    replacing: Option<&str>,
    records: &[ChunkRecord],
) -> Result<(), StoreError> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    let existing_bytes: Option<i64> = match replacing {
        Some(source) => {
            sqlx::query_scalar(
                "SELECT length(embedding) FROM records \
                 WHERE collection = ? AND source != ? ORDER BY seq LIMIT 1",
            )
            .bind(collection)
            .bind(source)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_scalar(
                "SELECT length(embedding) FROM records WHERE collection = ? ORDER BY seq LIMIT 1",
            )
            .bind(collection)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    let expected = existing_bytes
        .map(|b| b as usize / 4)
        .unwrap_or(first.embedding.len());
    if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
        return Err(StoreError::Dimension {
            expected,
            actual: bad.embedding.len(),
        });
    }
    Ok(())
}

async fn insert_records(
    conn: &mut SqliteConnection,
    collection: &str,
    records: &[ChunkRecord],
) -> Result<(), StoreError> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO records (collection, id, source, chunk_id, file_hash, document, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                source = excluded.source,
                chunk_id = excluded.chunk_id,
                file_hash = excluded.file_hash,
                document = excluded.document,
                embedding = excluded.embedding
            "#,
        )
        .bind(collection)
        .bind(&record.id)
        .bind(&record.metadata.source)
        .bind(record.metadata.chunk_id)
        .bind(&record.metadata.file_hash)
        .bind(&record.text)
        .bind(vec_to_blob(&record.embedding))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn row_to_chunk(row: &SqliteRow) -> StoredChunk {
    StoredChunk {
        id: row.get("id"),
        text: row.get("document"),
        metadata: ChunkMetadata {
            source: row.get("source"),
            chunk_id: row.get("chunk_id"),
            file_hash: row.get("file_hash"),
        },
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(&self, records: Vec<ChunkRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        check_dimensions(&mut *tx, &self.collection, None, &records).await?;
        insert_records(&mut *tx, &self.collection, &records).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, filter: &RecordFilter) -> Result<Vec<StoredChunk>, StoreError> {
        let mut sql = String::from(
            "SELECT id, source, chunk_id, file_hash, document FROM records WHERE collection = ?",
        );
        if filter.source.is_some() {
            sql.push_str(" AND source = ?");
        }
        if filter.chunk_id.is_some() {
            sql.push_str(" AND chunk_id = ?");
        }
        sql.push_str(" ORDER BY seq ASC");

        let mut query = sqlx::query(&sql).bind(&self.collection);
        if let Some(source) = &filter.source {
            query = query.bind(source);
        }
        if let Some(chunk_id) = filter.chunk_id {
            query = query.bind(chunk_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, source, chunk_id, file_hash, document, embedding
            FROM records
            WHERE collection = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows.iter().map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            (row_to_chunk(row), blob_to_vec(&blob))
        });
        Ok(nearest(embedding, candidates, k))
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_source(
        &self,
        source: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        check_dimensions(&mut *tx, &self.collection, Some(source), &records).await?;

        sqlx::query("DELETE FROM records WHERE collection = ? AND source = ?")
            .bind(&self.collection)
            .bind(source)
            .execute(&mut *tx)
            .await?;
        insert_records(&mut *tx, &self.collection, &records).await?;

        // Dropping an uncommitted transaction rolls it back.
        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    async fn sources(&self) -> Result<BTreeSet<String>, StoreError> {
        let sources: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT source FROM records WHERE collection = ?")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(sources.into_iter().collect())
    }
}
