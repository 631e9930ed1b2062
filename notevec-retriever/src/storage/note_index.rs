//! SQLite persistence for documents, chunks, and embeddings.
//!
//! Three relations back the index:
//!
//! ```sql
//! CREATE TABLE documents (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     path TEXT UNIQUE NOT NULL,       -- root-relative note path
//!     title TEXT NOT NULL,
//!     modified_at INTEGER NOT NULL,    -- source mtime, epoch seconds
//!     indexed_at INTEGER NOT NULL
//! );
//!
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
//!     content TEXT NOT NULL,
//!     start_line INTEGER NOT NULL,
//!     end_line INTEGER NOT NULL,
//!     heading TEXT NOT NULL
//! );
//!
//! CREATE TABLE embeddings (
//!     chunk_id INTEGER PRIMARY KEY REFERENCES chunks(id) ON DELETE CASCADE,
//!     vector BLOB NOT NULL             -- little-endian f32s
//! );
//! ```
//!
//! The embedding width is recorded in `index_meta` when the store is first
//! created; reopening with a different width is an error, since the stored
//! vectors would be incomparable. Deletions remove embeddings no later than
//! their chunks, inside one transaction.

use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use notevec_context::Chunk;

/// An indexed note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub path: String,
    pub title: String,
    pub modified_at: i64,
    pub indexed_at: i64,
}

/// A similarity-search hit, joined with its chunk and owning document.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub chunk_id: i64,
    pub doc_id: i64,
    pub path: String,
    pub content: String,
    pub heading: String,
    pub start_line: i64,
    pub end_line: i64,
    pub distance: f32,
}

/// SQLite-backed store for the note index.
#[derive(Clone, Debug)]
pub struct NoteIndex {
    pool: SqlitePool,
    embed_dim: usize,
}

impl NoteIndex {
    /// Open (or create) a persistent store at `db_path`.
    pub async fn open(db_path: &Path, embed_dim: usize) -> Result<Self> {
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true),
        )
        .await
        .with_context(|| format!("failed to open index database {}", db_path.display()))?;
        Self::init(pool, embed_dim).await
    }

    /// Open an in-memory store, used by tests.
    pub async fn open_memory(embed_dim: usize) -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory index database")?;
        Self::init(pool, embed_dim).await
    }

    async fn init(pool: SqlitePool, embed_dim: usize) -> Result<Self> {
        Self::create_tables(&pool).await?;

        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_dim'")
                .fetch_optional(&pool)
                .await
                .context("failed to read index metadata")?;
        match stored {
            Some(value) => {
                let stored_dim: usize = value
                    .parse()
                    .with_context(|| format!("corrupt embedding_dim metadata: {value}"))?;
                if stored_dim != embed_dim {
                    bail!(
                        "index stores {stored_dim}-dimensional embeddings but {embed_dim} were \
                         requested; delete the index file and reindex to change dimensions"
                    );
                }
            }
            None => {
                sqlx::query("INSERT INTO index_meta (key, value) VALUES ('embedding_dim', ?1)")
                    .bind(embed_dim.to_string())
                    .execute(&pool)
                    .await
                    .context("failed to record embedding dimension")?;
            }
        }

        Ok(Self { pool, embed_dim })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                modified_at INTEGER NOT NULL,
                indexed_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                heading TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                chunk_id INTEGER PRIMARY KEY REFERENCES chunks(id) ON DELETE CASCADE,
                vector BLOB NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(path)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Width of the stored embedding vectors.
    pub fn embedding_dimension(&self) -> usize {
        self.embed_dim
    }

    pub async fn get_document(&self, path: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, path, title, modified_at, indexed_at FROM documents WHERE path = ?1",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load document {path}"))?;

        Ok(row.map(|row| Document {
            id: row.get("id"),
            path: row.get("path"),
            title: row.get("title"),
            modified_at: row.get("modified_at"),
            indexed_at: row.get("indexed_at"),
        }))
    }

    pub async fn get_all_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT id, path, title, modified_at, indexed_at FROM documents")
            .fetch_all(&self.pool)
            .await
            .context("failed to load documents")?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                path: row.get("path"),
                title: row.get("title"),
                modified_at: row.get("modified_at"),
                indexed_at: row.get("indexed_at"),
            })
            .collect())
    }

    /// Insert or update a document record, returning its id.
    pub async fn upsert_document(
        &self,
        path: &str,
        title: &str,
        modified_at: i64,
        indexed_at: i64,
    ) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO documents (path, title, modified_at, indexed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(path) DO UPDATE SET
                title = excluded.title,
                modified_at = excluded.modified_at,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(path)
        .bind(title)
        .bind(modified_at)
        .bind(indexed_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert document {path}"))?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM documents WHERE path = ?1")
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to resolve id for document {path}"))?;
        Ok(id)
    }

    /// Delete a document and everything it owns. Missing documents are a no-op.
    pub async fn delete_document(&self, path: &str) -> Result<()> {
        let doc_id: Option<i64> = sqlx::query_scalar("SELECT id FROM documents WHERE path = ?1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to look up document {path}"))?;
        let Some(doc_id) = doc_id else {
            return Ok(());
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .with_context(|| format!("failed to start deletion of {path}"))?;
        sqlx::query(
            "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE doc_id = ?1)",
        )
        .bind(doc_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM chunks WHERE doc_id = ?1")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .with_context(|| format!("failed to delete document {path}"))?;
        Ok(())
    }

    /// Delete a document's chunks and their embeddings, keeping the document.
    pub async fn delete_chunks_for_document(&self, doc_id: i64) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .with_context(|| format!("failed to start chunk deletion for document {doc_id}"))?;
        sqlx::query(
            "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE doc_id = ?1)",
        )
        .bind(doc_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM chunks WHERE doc_id = ?1")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .with_context(|| format!("failed to delete chunks for document {doc_id}"))?;
        Ok(())
    }

    /// Insert one chunk, returning its id.
    pub async fn insert_chunk(&self, doc_id: i64, chunk: &Chunk) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO chunks (doc_id, content, start_line, end_line, heading)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(doc_id)
        .bind(&chunk.content)
        .bind(chunk.start_line as i64)
        .bind(chunk.end_line as i64)
        .bind(&chunk.heading)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert chunk for document {doc_id}"))?;
        Ok(result.last_insert_rowid())
    }

    /// Store a chunk's embedding. The vector must match the store's width.
    pub async fn insert_embedding(&self, chunk_id: i64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.embed_dim {
            bail!(
                "embedding for chunk {chunk_id} has {} dimensions, store expects {}",
                vector.len(),
                self.embed_dim
            );
        }

        let bytes: &[u8] = bytemuck::cast_slice(vector);
        sqlx::query(
            r#"
            INSERT INTO embeddings (chunk_id, vector)
            VALUES (?1, ?2)
            ON CONFLICT(chunk_id) DO UPDATE SET vector = excluded.vector
            "#,
        )
        .bind(chunk_id)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert embedding for chunk {chunk_id}"))?;
        Ok(())
    }

    /// Nearest chunks to `query`, ascending by cosine distance.
    ///
    /// Ordering among equal distances is unspecified. Stored vectors whose
    /// width no longer matches the query are skipped with a warning.
    pub async fn search_similar(&self, query: &[f32], k: usize) -> Result<Vec<SearchCandidate>> {
        if query.len() != self.embed_dim {
            bail!(
                "query vector has {} dimensions, store expects {}",
                query.len(),
                self.embed_dim
            );
        }

        let rows = sqlx::query(
            r#"
            SELECT
                e.chunk_id,
                e.vector,
                c.doc_id,
                c.content,
                c.start_line,
                c.end_line,
                c.heading,
                d.path
            FROM embeddings e
            JOIN chunks c ON c.id = e.chunk_id
            JOIN documents d ON d.id = c.doc_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("similarity scan failed")?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let chunk_id: i64 = row.get("chunk_id");
            let bytes: Vec<u8> = row.get("vector");
            let vector: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
            if vector.len() != query.len() {
                warn!(
                    chunk_id,
                    width = vector.len(),
                    "skipping embedding with stale width"
                );
                continue;
            }

            candidates.push(SearchCandidate {
                chunk_id,
                doc_id: row.get("doc_id"),
                path: row.get("path"),
                content: row.get("content"),
                heading: row.get("heading"),
                start_line: row.get("start_line"),
                end_line: row.get("end_line"),
                distance: 1.0 - cosine_similarity(query, &vector),
            });
        }

        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(k);
        Ok(candidates)
    }

    pub async fn document_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .context("failed to count documents")
    }

    pub async fn chunk_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .context("failed to count chunks")
    }

    pub async fn embedding_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await
            .context("failed to count embeddings")
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
