//! Schema for the SQLite vector store.
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so running it on each
//! startup is safe.

use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // One row per named collection and its distance metric
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            metric TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunk records; `seq` preserves insertion order across upserts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            source TEXT NOT NULL,
            chunk_id INTEGER NOT NULL,
            file_hash TEXT NOT NULL,
            document TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_records_source ON records(collection, source, chunk_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
