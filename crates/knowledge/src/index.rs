//! SQLite-backed vector index for manual chunks.

use crate::types::KnowledgeChunk;
use crate::vector_index::{cosine_similarity, VectorIndex};
use chrono::{DateTime, Utc};
use patriot_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        page INTEGER NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_page ON chunks(page);

    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

const FINGERPRINT_KEY: &str = "fingerprint";
const INDEXED_AT_KEY: &str = "indexed_at";

/// Vector index stored in a single SQLite file.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) the index at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Self::init(conn)
    }

    /// Index that lives only as long as the value.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("SQLite connection lock poisoned".to_string()))
    }

    /// When the last completed build was recorded.
    pub fn indexed_at(&self) -> AppResult<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let value = get_meta(&conn, INDEXED_AT_KEY)?;
        Ok(value
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

fn get_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to write index metadata: {}", e)))?;
    Ok(())
}

fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding = chunk
        .embedding
        .as_ref()
        .ok_or_else(|| AppError::Knowledge(format!("Chunk {} missing embedding", chunk.id)))?;

    let metadata_json = serde_json::to_string(&chunk.metadata)?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, page, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.page as i64,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(embedding),
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

impl VectorIndex for SqliteIndex {
    fn upsert_chunk(&mut self, chunk: &KnowledgeChunk) -> AppResult<()> {
        let conn = self.conn()?;
        insert_chunk(&conn, chunk)
    }

    fn upsert_chunks(&mut self, chunks: &[KnowledgeChunk]) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        for chunk in chunks {
            insert_chunk(&tx, chunk)?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))
    }

    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, page, position, text, embedding, metadata FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, page, position, text, embedding_bytes, metadata_json) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;

            let embedding = bytes_to_embedding(&embedding_bytes)?;
            let metadata = match metadata_json {
                Some(json) => serde_json::from_str(&json)?,
                None => serde_json::Value::Null,
            };

            let score = cosine_similarity(query_embedding, &embedding);
            results.push((
                KnowledgeChunk {
                    id,
                    page: page as u32,
                    position: position as u32,
                    text,
                    embedding: Some(embedding),
                    metadata,
                },
                score,
            ));
        }

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.position.cmp(&b.0.position))
        });
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn stats(&self) -> AppResult<(u32, u32)> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(DISTINCT page), COUNT(*) FROM chunks",
            [],
            |row| Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)? as u32)),
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))
    }

    fn reset(&mut self) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM meta;")
            .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

        tracing::info!("Reset manual index");
        Ok(())
    }

    fn fingerprint(&self) -> AppResult<Option<String>> {
        let conn = self.conn()?;
        get_meta(&conn, FINGERPRINT_KEY)
    }

    fn set_fingerprint(&mut self, fingerprint: &str) -> AppResult<()> {
        let conn = self.conn()?;
        set_meta(&conn, FINGERPRINT_KEY, fingerprint)?;
        set_meta(&conn, INDEXED_AT_KEY, &Utc::now().to_rfc3339())
    }
}

/// Little-endian f32 encoding.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(id: &str, page: u32, position: u32, text: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            page,
            position,
            text: text.to_string(),
            embedding: Some(embedding),
            metadata: serde_json::json!({ "byte_start": 0 }),
        }
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = SqliteIndex::in_memory().unwrap();
        index
            .upsert_chunks(&[
                chunk("c1", 0, 0, "Engine oil", vec![1.0, 0.0, 0.0]),
                chunk("c2", 3, 1, "Wiper blades", vec![0.0, 1.0, 0.0]),
                chunk("c3", 3, 2, "Oil filter", vec![0.9, 0.1, 0.0]),
            ])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "c1");
        assert_eq!(results[1].0.id, "c3");
        assert!(results[0].1 > results[1].1);
        assert_eq!(results[1].0.page, 3);
        assert_eq!(results[0].0.metadata["byte_start"], 0);
    }

    #[test]
    fn test_upsert_replaces_existing_chunk() {
        let mut index = SqliteIndex::in_memory().unwrap();
        index.upsert_chunk(&chunk("c1", 0, 0, "old", vec![1.0, 0.0])).unwrap();
        index.upsert_chunk(&chunk("c1", 0, 0, "new", vec![1.0, 0.0])).unwrap();

        assert_eq!(index.stats().unwrap(), (1, 1));
        assert_eq!(index.search(&[1.0, 0.0], 5).unwrap()[0].0.text, "new");
    }

    #[test]
    fn test_missing_embedding_rejected() {
        let mut index = SqliteIndex::in_memory().unwrap();
        let mut c = chunk("c1", 0, 0, "text", vec![]);
        c.embedding = None;
        assert!(index.upsert_chunk(&c).is_err());
    }

    #[test]
    fn test_stats_counts_distinct_pages() {
        let mut index = SqliteIndex::in_memory().unwrap();
        index
            .upsert_chunks(&[
                chunk("a", 0, 0, "a", vec![1.0]),
                chunk("b", 0, 1, "b", vec![1.0]),
                chunk("c", 5, 2, "c", vec![1.0]),
            ])
            .unwrap();

        assert_eq!(index.stats().unwrap(), (2, 3));
    }

    #[test]
    fn test_fingerprint_and_reset() {
        let mut index = SqliteIndex::in_memory().unwrap();
        assert_eq!(index.fingerprint().unwrap(), None);

        index.upsert_chunk(&chunk("a", 0, 0, "a", vec![1.0])).unwrap();
        index.set_fingerprint("abc123").unwrap();
        assert_eq!(index.fingerprint().unwrap().as_deref(), Some("abc123"));
        assert!(index.indexed_at().unwrap().is_some());

        index.reset().unwrap();
        assert_eq!(index.fingerprint().unwrap(), None);
        assert_eq!(index.stats().unwrap(), (0, 0));
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/index.sqlite");

        {
            let mut index = SqliteIndex::open(&path).unwrap();
            index.upsert_chunk(&chunk("a", 1, 0, "Jack location", vec![0.0, 1.0])).unwrap();
            index.set_fingerprint("fp").unwrap();
        }

        let index = SqliteIndex::open(&path).unwrap();
        assert_eq!(index.fingerprint().unwrap().as_deref(), Some("fp"));
        assert_eq!(index.search(&[0.0, 1.0], 1).unwrap()[0].0.text, "Jack location");
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }
}
