//! Relational Store Adapter (C1) — the required, durable primary store.
//!
//! Backed by `rusqlite` (bundled SQLite), matching the single-executable
//! deployment model: one file at `DB_PATH`, no external database process.
//! All write APIs are single-transaction; `next_vector_ids` is made
//! serializable by allocating from a single-row sequence table inside the
//! same transaction as its caller's other writes.

use crate::ltmc::error::{LtmcError, LtmcResult};
use crate::ltmc::store::{
    now_iso8601, ChatMessage, ChunkRow, ContextLink, RepairQueueEntry, Resource, RetrievalWeights,
    ThoughtNodeRow, Todo,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

const SCHEMA_VERSION: i64 = 1;

pub struct RelationalStore {
    conn: Mutex<Connection>,
}

impl RelationalStore {
    pub fn open(path: &str) -> LtmcResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.bootstrap()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> LtmcResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.bootstrap()?;
        Ok(store)
    }

    /// Idempotent schema bootstrap, keyed off a single-row `schema_version`
    /// table (§4.1). Every statement is `CREATE TABLE IF NOT EXISTS`, so
    /// re-running this on an already-migrated database is a no-op.
    fn bootstrap(&self) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

            CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL UNIQUE,
                content_type TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS resource_chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL REFERENCES resources(id),
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                vector_id INTEGER,
                archived INTEGER NOT NULL DEFAULT 0,
                retrieval_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                UNIQUE(resource_id, chunk_index)
            );

            CREATE TABLE IF NOT EXISTS vector_id_sequence (
                next_id INTEGER NOT NULL
            );

            -- Canonical chat log. New writes target only this table (§9):
            -- there is no legacy fragmented-chat data to reconcile in this
            -- deployment, but the column set matches what a future
            -- reconciling view would project so callers never change.
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                agent TEXT,
                source_tool TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS context_links (
                message_id INTEGER NOT NULL REFERENCES chat_messages(id),
                chunk_id INTEGER NOT NULL REFERENCES resource_chunks(id),
                created_at TEXT NOT NULL,
                PRIMARY KEY (message_id, chunk_id)
            );

            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                priority TEXT NOT NULL DEFAULT 'medium',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS retrieval_weights (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                alpha REAL NOT NULL,
                beta REAL NOT NULL,
                gamma REAL NOT NULL,
                delta REAL NOT NULL,
                epsilon REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS repair_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL,
                chunk_id INTEGER NOT NULL,
                vector_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS thought_nodes (
                ulid TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                step_number INTEGER NOT NULL,
                kind TEXT NOT NULL,
                previous_thought_id TEXT,
                resource_id INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(session_id, step_number)
            );
            ",
        )
        .map_err(LtmcError::from)?;

        let version: Option<i64> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |r| r.get(0))
            .optional()
            .map_err(LtmcError::from)?;
        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(LtmcError::from)?;
        }

        let seq_exists: Option<i64> = conn
            .query_row("SELECT next_id FROM vector_id_sequence LIMIT 1", [], |r| r.get(0))
            .optional()
            .map_err(LtmcError::from)?;
        if seq_exists.is_none() {
            conn.execute("INSERT INTO vector_id_sequence (next_id) VALUES (0)", [])
                .map_err(LtmcError::from)?;
        }

        let weights_exist: Option<i64> = conn
            .query_row("SELECT id FROM retrieval_weights LIMIT 1", [], |r| r.get(0))
            .optional()
            .map_err(LtmcError::from)?;
        if weights_exist.is_none() {
            conn.execute(
                "INSERT INTO retrieval_weights (id, alpha, beta, gamma, delta, epsilon)
                 VALUES (1, 0.6, 0.2, 0.1, 0.05, 0.05)",
                [],
            )
            .map_err(LtmcError::from)?;
        }

        Ok(())
    }

    pub fn create_resource(
        &self,
        file_name: &str,
        content_type: &str,
        content: &str,
    ) -> LtmcResult<i64> {
        let conn = self.conn.lock().unwrap();
        let created_at = now_iso8601();
        let result = conn.execute(
            "INSERT INTO resources (file_name, content_type, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![file_name, content_type, content, created_at],
        );
        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(LtmcError::AlreadyExists(format!(
                    "resource file_name already exists: {file_name}"
                )))
            }
            Err(e) => Err(LtmcError::from(e)),
        }
    }

    /// Deletes a Resource and everything that cascades from it: its
    /// Chunks, Context Links referencing those chunks. Vector/graph
    /// cleanup is the caller's (C7's) responsibility, per the mirror
    /// delete order in §4.7.
    pub fn delete_resource(&self, resource_id: i64) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM context_links WHERE chunk_id IN
                (SELECT id FROM resource_chunks WHERE resource_id = ?1)",
            params![resource_id],
        )
        .map_err(LtmcError::from)?;
        conn.execute(
            "DELETE FROM resource_chunks WHERE resource_id = ?1",
            params![resource_id],
        )
        .map_err(LtmcError::from)?;
        let affected = conn
            .execute("DELETE FROM resources WHERE id = ?1", params![resource_id])
            .map_err(LtmcError::from)?;
        if affected == 0 {
            return Err(LtmcError::NotFound(format!("resource {resource_id}")));
        }
        Ok(())
    }

    pub fn get_resource(&self, resource_id: i64) -> LtmcResult<Resource> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, file_name, content_type, content, created_at FROM resources WHERE id = ?1",
            params![resource_id],
            |r| {
                Ok(Resource {
                    id: r.get(0)?,
                    file_name: r.get(1)?,
                    content_type: r.get(2)?,
                    content: r.get(3)?,
                    created_at: r.get(4)?,
                })
            },
        )
        .optional()
        .map_err(LtmcError::from)?
        .ok_or_else(|| LtmcError::NotFound(format!("resource {resource_id}")))
    }

    /// Looks up a Resource by its unique file_name, for the `replace=true`
    /// re-ingest path (§4.1 invariant 8).
    pub fn find_resource_by_file_name(&self, file_name: &str) -> LtmcResult<Resource> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, file_name, content_type, content, created_at FROM resources WHERE file_name = ?1",
            params![file_name],
            |r| {
                Ok(Resource {
                    id: r.get(0)?,
                    file_name: r.get(1)?,
                    content_type: r.get(2)?,
                    content: r.get(3)?,
                    created_at: r.get(4)?,
                })
            },
        )
        .optional()
        .map_err(LtmcError::from)?
        .ok_or_else(|| LtmcError::NotFound(format!("resource with file_name {file_name}")))
    }

    /// Atomically reserves `n` contiguous vector ids. Serializable against
    /// concurrent callers because the whole read-modify-write happens
    /// inside one SQLite transaction, which the connection-level mutex
    /// also protects against other in-process writers.
    pub fn next_vector_ids(&self, n: i64) -> LtmcResult<Vec<i64>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(LtmcError::from)?;
        let start: i64 = tx
            .query_row("SELECT next_id FROM vector_id_sequence LIMIT 1", [], |r| r.get(0))
            .map_err(LtmcError::from)?;
        tx.execute(
            "UPDATE vector_id_sequence SET next_id = next_id + ?1",
            params![n],
        )
        .map_err(LtmcError::from)?;
        tx.commit().map_err(LtmcError::from)?;
        Ok((start..start + n).collect())
    }

    /// Inserts chunk rows for a resource. `items` is `(index, text, vector_id)`.
    pub fn upsert_chunks(
        &self,
        resource_id: i64,
        items: &[(i64, String, Option<i64>)],
    ) -> LtmcResult<Vec<i64>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(LtmcError::from)?;
        let mut ids = Vec::with_capacity(items.len());
        let created_at = now_iso8601();
        for (index, text, vector_id) in items {
            tx.execute(
                "INSERT INTO resource_chunks (resource_id, chunk_index, text, vector_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![resource_id, index, text, vector_id, created_at],
            )
            .map_err(LtmcError::from)?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit().map_err(LtmcError::from)?;
        Ok(ids)
    }

    pub fn get_chunks_by_vector_ids(&self, vids: &[i64]) -> LtmcResult<Vec<ChunkRow>> {
        if vids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, resource_id, chunk_index, text, vector_id, archived, created_at, retrieval_count
             FROM resource_chunks WHERE vector_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql).map_err(LtmcError::from)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            vids.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(params.as_slice(), Self::map_chunk_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    pub fn get_chunk(&self, chunk_id: i64) -> LtmcResult<ChunkRow> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, resource_id, chunk_index, text, vector_id, archived, created_at, retrieval_count
             FROM resource_chunks WHERE id = ?1",
            params![chunk_id],
            Self::map_chunk_row,
        )
        .optional()
        .map_err(LtmcError::from)?
        .ok_or_else(|| LtmcError::NotFound(format!("chunk {chunk_id}")))
    }

    pub fn chunks_by_type(&self, content_type: Option<&str>, limit: i64) -> LtmcResult<Vec<ChunkRow>> {
        let conn = self.conn.lock().unwrap();
        let sql = "SELECT c.id, c.resource_id, c.chunk_index, c.text, c.vector_id, c.archived, c.created_at, c.retrieval_count
                   FROM resource_chunks c JOIN resources r ON r.id = c.resource_id
                   WHERE c.archived = 0 AND (?1 IS NULL OR r.content_type = ?1)
                   ORDER BY c.created_at DESC LIMIT ?2";
        let mut stmt = conn.prepare(sql).map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![content_type, limit], Self::map_chunk_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    /// Unlike `chunks_by_type`, this does not filter on `archived` — callers
    /// tearing down a resource (e.g. delete) need every chunk regardless of
    /// archive state, or an archived chunk's vector would never be tombstoned.
    pub fn chunks_by_resource_id(&self, resource_id: i64) -> LtmcResult<Vec<ChunkRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, resource_id, chunk_index, text, vector_id, archived, created_at, retrieval_count
                 FROM resource_chunks WHERE resource_id = ?1",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![resource_id], Self::map_chunk_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    /// Soft-delete: marks every chunk of a resource archived rather than
    /// removing rows, so it drops out of both the vector-backed and
    /// degraded retrieval paths (both already filter `archived = 0`).
    pub fn archive_chunks_by_resource_id(&self, resource_id: i64) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE resource_chunks SET archived = 1 WHERE resource_id = ?1",
            params![resource_id],
        )
        .map_err(LtmcError::from)?;
        Ok(())
    }

    pub fn bump_retrieval_count(&self, chunk_ids: &[i64]) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        for id in chunk_ids {
            conn.execute(
                "UPDATE resource_chunks SET retrieval_count = retrieval_count + 1 WHERE id = ?1",
                params![id],
            )
            .map_err(LtmcError::from)?;
        }
        Ok(())
    }

    fn map_chunk_row(r: &rusqlite::Row) -> rusqlite::Result<ChunkRow> {
        Ok(ChunkRow {
            id: r.get(0)?,
            resource_id: r.get(1)?,
            chunk_index: r.get(2)?,
            text: r.get(3)?,
            vector_id: r.get(4)?,
            archived: r.get::<_, i64>(5)? != 0,
            created_at: r.get(6)?,
            retrieval_count: r.get(7)?,
        })
    }

    pub fn log_chat(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        agent: Option<&str>,
        source_tool: Option<&str>,
        metadata: Option<&str>,
    ) -> LtmcResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_messages (conversation_id, role, content, agent, source_tool, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![conversation_id, role, content, agent, source_tool, metadata, now_iso8601()],
        )
        .map_err(LtmcError::from)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_chat_by_conversation(&self, conversation_id: &str) -> LtmcResult<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, conversation_id, role, content, agent, source_tool, metadata, created_at
                 FROM chat_messages WHERE conversation_id = ?1 ORDER BY id ASC",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![conversation_id], Self::map_chat_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    pub fn get_chat_by_tool(&self, source_tool: &str) -> LtmcResult<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, conversation_id, role, content, agent, source_tool, metadata, created_at
                 FROM chat_messages WHERE source_tool = ?1 ORDER BY id ASC",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![source_tool], Self::map_chat_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    fn map_chat_row(r: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
        Ok(ChatMessage {
            id: r.get(0)?,
            conversation_id: r.get(1)?,
            role: r.get(2)?,
            content: r.get(3)?,
            agent: r.get(4)?,
            source_tool: r.get(5)?,
            metadata: r.get(6)?,
            created_at: r.get(7)?,
        })
    }

    pub fn add_context_links(&self, message_id: i64, chunk_ids: &[i64]) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        let msg_exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM chat_messages WHERE id = ?1",
                params![message_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(LtmcError::from)?;
        if msg_exists.is_none() {
            return Err(LtmcError::NotFound(format!("chat message {message_id}")));
        }
        for chunk_id in chunk_ids {
            let chunk_exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM resource_chunks WHERE id = ?1",
                    params![chunk_id],
                    |r| r.get(0),
                )
                .optional()
                .map_err(LtmcError::from)?;
            if chunk_exists.is_none() {
                return Err(LtmcError::InvalidParams(format!(
                    "context link references missing chunk {chunk_id}"
                )));
            }
            conn.execute(
                "INSERT OR IGNORE INTO context_links (message_id, chunk_id, created_at) VALUES (?1, ?2, ?3)",
                params![message_id, chunk_id, now_iso8601()],
            )
            .map_err(LtmcError::from)?;
        }
        Ok(())
    }

    pub fn get_links_for_message(&self, message_id: i64) -> LtmcResult<Vec<ContextLink>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT message_id, chunk_id, created_at FROM context_links WHERE message_id = ?1")
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![message_id], |r| {
                Ok(ContextLink {
                    message_id: r.get(0)?,
                    chunk_id: r.get(1)?,
                    created_at: r.get(2)?,
                })
            })
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    pub fn get_messages_for_chunk(&self, chunk_id: i64) -> LtmcResult<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT m.id, m.conversation_id, m.role, m.content, m.agent, m.source_tool, m.metadata, m.created_at
                 FROM chat_messages m JOIN context_links l ON l.message_id = m.id
                 WHERE l.chunk_id = ?1 ORDER BY m.id ASC",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![chunk_id], Self::map_chat_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    pub fn context_link_stats(&self) -> LtmcResult<(i64, i64)> {
        let conn = self.conn.lock().unwrap();
        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM context_links", [], |r| r.get(0))
            .map_err(LtmcError::from)?;
        let messages: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT message_id) FROM context_links",
                [],
                |r| r.get(0),
            )
            .map_err(LtmcError::from)?;
        Ok((links, messages))
    }

    pub fn add_todo(&self, title: &str, description: &str, priority: &str) -> LtmcResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = now_iso8601();
        conn.execute(
            "INSERT INTO todos (title, description, status, priority, created_at, updated_at)
             VALUES (?1, ?2, 'pending', ?3, ?4, ?4)",
            params![title, description, priority, now],
        )
        .map_err(LtmcError::from)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_todos(&self, status: Option<&str>) -> LtmcResult<Vec<Todo>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, status, priority, created_at, updated_at
                 FROM todos WHERE (?1 IS NULL OR status = ?1) ORDER BY id ASC",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![status], Self::map_todo_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    pub fn complete_todo(&self, id: i64) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "UPDATE todos SET status = 'completed', updated_at = ?2 WHERE id = ?1",
                params![id, now_iso8601()],
            )
            .map_err(LtmcError::from)?;
        if affected == 0 {
            return Err(LtmcError::NotFound(format!("todo {id}")));
        }
        Ok(())
    }

    pub fn search_todos(&self, query: &str) -> LtmcResult<Vec<Todo>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{query}%");
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, status, priority, created_at, updated_at
                 FROM todos WHERE title LIKE ?1 OR description LIKE ?1 ORDER BY id ASC",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![pattern], Self::map_todo_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    fn map_todo_row(r: &rusqlite::Row) -> rusqlite::Result<Todo> {
        Ok(Todo {
            id: r.get(0)?,
            title: r.get(1)?,
            description: r.get(2)?,
            status: r.get(3)?,
            priority: r.get(4)?,
            created_at: r.get(5)?,
            updated_at: r.get(6)?,
        })
    }

    pub fn get_retrieval_weights(&self) -> LtmcResult<RetrievalWeights> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT alpha, beta, gamma, delta, epsilon FROM retrieval_weights WHERE id = 1",
            [],
            |r| {
                Ok(RetrievalWeights {
                    alpha: r.get(0)?,
                    beta: r.get(1)?,
                    gamma: r.get(2)?,
                    delta: r.get(3)?,
                    epsilon: r.get(4)?,
                })
            },
        )
        .map_err(LtmcError::from)
    }

    pub fn set_retrieval_weights(&self, w: &RetrievalWeights) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE retrieval_weights SET alpha=?1, beta=?2, gamma=?3, delta=?4, epsilon=?5 WHERE id = 1",
            params![w.alpha, w.beta, w.gamma, w.delta, w.epsilon],
        )
        .map_err(LtmcError::from)?;
        Ok(())
    }

    pub fn enqueue_repair(
        &self,
        resource_id: i64,
        chunk_id: i64,
        vector_id: i64,
        text: &str,
        last_error: &str,
    ) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO repair_queue (resource_id, chunk_id, vector_id, text, attempts, last_error, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            params![resource_id, chunk_id, vector_id, text, last_error, now_iso8601()],
        )
        .map_err(LtmcError::from)?;
        Ok(())
    }

    pub fn repair_queue_fifo(&self, limit: i64) -> LtmcResult<Vec<RepairQueueEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, resource_id, chunk_id, vector_id, text, attempts, last_error, created_at
                 FROM repair_queue ORDER BY id ASC LIMIT ?1",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![limit], |r| {
                Ok(RepairQueueEntry {
                    id: r.get(0)?,
                    resource_id: r.get(1)?,
                    chunk_id: r.get(2)?,
                    vector_id: r.get(3)?,
                    text: r.get(4)?,
                    attempts: r.get(5)?,
                    last_error: r.get(6)?,
                    created_at: r.get(7)?,
                })
            })
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    pub fn remove_repair_entry(&self, id: i64) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM repair_queue WHERE id = ?1", params![id])
            .map_err(LtmcError::from)?;
        Ok(())
    }

    pub fn bump_repair_attempt(&self, id: i64, error: &str) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE repair_queue SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
            params![id, error],
        )
        .map_err(LtmcError::from)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_thought_node(
        &self,
        ulid: &str,
        session_id: &str,
        step_number: i64,
        kind: &str,
        previous_thought_id: Option<&str>,
        resource_id: i64,
        content_hash: &str,
        metadata: &str,
    ) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO thought_nodes
                (ulid, session_id, step_number, kind, previous_thought_id, resource_id, content_hash, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                ulid,
                session_id,
                step_number,
                kind,
                previous_thought_id,
                resource_id,
                content_hash,
                metadata,
                now_iso8601()
            ],
        )
        .map_err(LtmcError::from)?;
        Ok(())
    }

    pub fn get_thought_node(&self, ulid: &str) -> LtmcResult<ThoughtNodeRow> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT ulid, session_id, step_number, kind, previous_thought_id, resource_id, content_hash, metadata, created_at
             FROM thought_nodes WHERE ulid = ?1",
            params![ulid],
            Self::map_thought_row,
        )
        .optional()
        .map_err(LtmcError::from)?
        .ok_or_else(|| LtmcError::NotFound(format!("thought {ulid}")))
    }

    pub fn thought_node_by_resource_id(&self, resource_id: i64) -> LtmcResult<Option<ThoughtNodeRow>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT ulid, session_id, step_number, kind, previous_thought_id, resource_id, content_hash, metadata, created_at
             FROM thought_nodes WHERE resource_id = ?1",
            params![resource_id],
            Self::map_thought_row,
        )
        .optional()
        .map_err(LtmcError::from)
    }

    pub fn session_head_from_db(&self, session_id: &str) -> LtmcResult<Option<ThoughtNodeRow>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT ulid, session_id, step_number, kind, previous_thought_id, resource_id, content_hash, metadata, created_at
             FROM thought_nodes WHERE session_id = ?1 ORDER BY step_number DESC LIMIT 1",
            params![session_id],
            Self::map_thought_row,
        )
        .optional()
        .map_err(LtmcError::from)
    }

    pub fn thought_chain(&self, session_id: &str) -> LtmcResult<Vec<ThoughtNodeRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT ulid, session_id, step_number, kind, previous_thought_id, resource_id, content_hash, metadata, created_at
                 FROM thought_nodes WHERE session_id = ?1 ORDER BY step_number ASC",
            )
            .map_err(LtmcError::from)?;
        let rows = stmt
            .query_map(params![session_id], Self::map_thought_row)
            .map_err(LtmcError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LtmcError::from)?);
        }
        Ok(out)
    }

    fn map_thought_row(r: &rusqlite::Row) -> rusqlite::Result<ThoughtNodeRow> {
        Ok(ThoughtNodeRow {
            ulid: r.get(0)?,
            session_id: r.get(1)?,
            step_number: r.get(2)?,
            kind: r.get(3)?,
            previous_thought_id: r.get(4)?,
            resource_id: r.get(5)?,
            content_hash: r.get(6)?,
            metadata: r.get(7)?,
            created_at: r.get(8)?,
        })
    }

    /// Test-only hook for simulating a corrupted thought record: writes a
    /// content_hash that no longer matches the resource's actual content,
    /// without going through any public write path.
    #[cfg(test)]
    pub(crate) fn test_corrupt_thought_hash(&self, ulid: &str, bad_hash: &str) -> LtmcResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE thought_nodes SET content_hash = ?1 WHERE ulid = ?2",
            params![bad_hash, ulid],
        )
        .map_err(LtmcError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_file_name_is_already_exists() {
        let store = RelationalStore::open_in_memory().unwrap();
        store.create_resource("a.txt", "document", "hello").unwrap();
        let err = store.create_resource("a.txt", "document", "again").unwrap_err();
        assert!(matches!(err, LtmcError::AlreadyExists(_)));
    }

    #[test]
    fn vector_ids_never_reused_and_are_contiguous() {
        let store = RelationalStore::open_in_memory().unwrap();
        let first = store.next_vector_ids(3).unwrap();
        let second = store.next_vector_ids(2).unwrap();
        assert_eq!(first, vec![0, 1, 2]);
        assert_eq!(second, vec![3, 4]);
    }

    #[test]
    fn context_link_to_missing_chunk_is_rejected() {
        let store = RelationalStore::open_in_memory().unwrap();
        let rid = store.create_resource("a.txt", "document", "hi").unwrap();
        let msg_id = store.log_chat("c1", "user", "hi", None, None, None).unwrap();
        let _ = rid;
        let err = store.add_context_links(msg_id, &[9999]).unwrap_err();
        assert!(matches!(err, LtmcError::InvalidParams(_)));
    }

    #[test]
    fn delete_resource_cascades_chunks_and_links() {
        let store = RelationalStore::open_in_memory().unwrap();
        let rid = store.create_resource("a.txt", "document", "hello world").unwrap();
        let ids = store
            .upsert_chunks(rid, &[(0, "hello".into(), Some(0))])
            .unwrap();
        store.delete_resource(rid).unwrap();
        let err = store.get_chunk(ids[0]).unwrap_err();
        assert!(matches!(err, LtmcError::NotFound(_)));
    }

    #[test]
    fn retrieval_weights_round_trip() {
        let store = RelationalStore::open_in_memory().unwrap();
        let mut w = store.get_retrieval_weights().unwrap();
        w.alpha = 1.0;
        w.beta = 0.0;
        store.set_retrieval_weights(&w).unwrap();
        let reloaded = store.get_retrieval_weights().unwrap();
        assert_eq!(reloaded.alpha, 1.0);
    }
}
