//! On-disk persistence for built indexes.
//!
//! Each cache directory (`<cache_root>/<key digest>/`) holds a single
//! SQLite file:
//!
//! ```sql
//! CREATE TABLE index_meta (
//!     key TEXT NOT NULL,
//!     provider TEXT NOT NULL,
//!     dimension INTEGER NOT NULL,
//!     chunk_count INTEGER NOT NULL,
//!     created_at INTEGER NOT NULL
//! );
//! CREATE TABLE chunks (
//!     sequence INTEGER PRIMARY KEY,
//!     content TEXT NOT NULL,
//!     embedding BLOB NOT NULL      -- f16 vector, little-endian bytes
//! );
//! ```
//!
//! Saving is best-effort from the cache's point of view; loading validates
//! everything it reads and reports any oddity as an error, which the cache
//! maps to a rebuild. Nothing in here is allowed to take the process down
//! over a bad cache file.

use crate::error::{IndexError, Result};
use crate::vector_index::{IndexMeta, IndexedChunk, VectorIndex};
use half::f16;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// File name of the index database inside a cache directory.
pub const INDEX_DB_FILE: &str = "index.db";

/// Persist `index` under `dir`, replacing whatever was there.
pub async fn save(dir: &Path, index: &VectorIndex) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(dir.join(INDEX_DB_FILE))
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true),
    )
    .await?;

    let result = write_all(&pool, index).await;
    pool.close().await;
    result
}

async fn write_all(pool: &SqlitePool, index: &VectorIndex) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT NOT NULL,
            provider TEXT NOT NULL,
            dimension INTEGER NOT NULL,
            chunk_count INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            sequence INTEGER PRIMARY KEY,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let mut tx = pool.begin().await?;

    // A rebuild under the same key overwrites the previous serialization.
    sqlx::query("DELETE FROM index_meta").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;

    let meta = index.meta();
    sqlx::query(
        "INSERT INTO index_meta (key, provider, dimension, chunk_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&meta.key)
    .bind(&meta.provider)
    .bind(meta.dimension as i64)
    .bind(meta.chunk_count as i64)
    .bind(meta.created_at)
    .execute(&mut *tx)
    .await?;

    for chunk in index.chunks() {
        let embedding_bytes = bytemuck::cast_slice::<f16, u8>(&chunk.embedding);
        sqlx::query("INSERT INTO chunks (sequence, content, embedding) VALUES (?1, ?2, ?3)")
            .bind(chunk.sequence as i64)
            .bind(&chunk.text)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load and validate the index persisted under `dir`.
///
/// `expected_key` and `expected_dimension` guard against a digest collision
/// and against indexes written by a differently-configured provider; either
/// mismatch is an error, and every error from here means "cache miss" to
/// the caller.
pub async fn load(dir: &Path, expected_key: &str, expected_dimension: usize) -> Result<VectorIndex> {
    let db_path = dir.join(INDEX_DB_FILE);

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true)
            .create_if_missing(false),
    )
    .await?;

    let result = read_all(&pool, expected_key, expected_dimension).await;
    pool.close().await;
    result
}

async fn read_all(
    pool: &SqlitePool,
    expected_key: &str,
    expected_dimension: usize,
) -> Result<VectorIndex> {
    let meta_row = sqlx::query(
        "SELECT key, provider, dimension, chunk_count, created_at FROM index_meta",
    )
    .fetch_one(pool)
    .await?;

    let meta = IndexMeta {
        key: meta_row.get("key"),
        provider: meta_row.get("provider"),
        dimension: meta_row.get::<i64, _>("dimension") as usize,
        chunk_count: meta_row.get::<i64, _>("chunk_count") as usize,
        created_at: meta_row.get("created_at"),
    };

    if meta.key != expected_key {
        return Err(IndexError::corrupt(format!(
            "key mismatch: expected {expected_key:?}, found {:?}",
            meta.key
        )));
    }
    if meta.dimension != expected_dimension {
        return Err(IndexError::corrupt(format!(
            "dimension mismatch: expected {expected_dimension}, found {}",
            meta.dimension
        )));
    }

    let rows = sqlx::query("SELECT sequence, content, embedding FROM chunks ORDER BY sequence")
        .fetch_all(pool)
        .await?;

    let mut chunks = Vec::with_capacity(rows.len());
    for row in rows {
        let sequence: i64 = row.get("sequence");
        let content: String = row.get("content");
        let embedding_bytes: Vec<u8> = row.get("embedding");

        if embedding_bytes.len() != meta.dimension * 2 {
            return Err(IndexError::corrupt(format!(
                "embedding blob for chunk {sequence} has {} bytes, expected {}",
                embedding_bytes.len(),
                meta.dimension * 2
            )));
        }

        // Decode byte-wise; the blob may not be aligned for an f16 cast.
        let embedding: Vec<f16> = embedding_bytes
            .chunks_exact(2)
            .map(|pair| f16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        chunks.push(IndexedChunk {
            sequence: sequence as usize,
            text: content,
            embedding,
        });
    }

    if chunks.len() != meta.chunk_count {
        return Err(IndexError::corrupt(format!(
            "chunk count mismatch: meta says {}, found {}",
            meta.chunk_count,
            chunks.len()
        )));
    }

    Ok(VectorIndex::new(meta, chunks))
}
