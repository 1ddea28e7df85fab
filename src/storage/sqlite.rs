//! SQLite storage implementation

use crate::model::{EnrichedItem, RunSummary, SourceDescriptor, SourceEntry, SourceKind};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    ItemSink, RunLog, SourceRegistry, StorageError, StorageResult, SummaryCache,
};
use crate::storage::{ItemRecord, RunRecord, RunStatus, SourceStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite storage backend
///
/// Statements are short, so the connection sits behind a plain mutex and
/// is used directly from async code.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Database file; `:memory:` opens a private in-memory database
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Connection with pragmas applied and schema created
    /// * `Err(StorageError)` - The file could not be opened or initialized
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    // ===== Source registry =====

    /// Inserts or updates the given sources, returning how many were written
    ///
    /// # Arguments
    ///
    /// * `sources` - Validated descriptors, keyed by name
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of rows inserted or updated
    /// * `Err(StorageError)` - The transaction failed and nothing was written
    pub fn sync_sources(&self, sources: &[SourceDescriptor]) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for source in sources {
            let entry = SourceEntry::from(source.clone());
            tx.execute(
                "INSERT INTO sources (name, type, url, config, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(name) DO UPDATE SET
                    type = excluded.type,
                    url = excluded.url,
                    config = excluded.config",
                params![
                    entry.name,
                    entry.kind.as_str(),
                    entry.url,
                    serde_json::to_string(&entry.config)?,
                    now
                ],
            )?;
        }
        tx.commit()?;
        Ok(sources.len())
    }

    /// Registers a new source; fails if the name is taken
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The source was stored
    /// * `Err(StorageError::DuplicateSource)` - A source with this name exists
    pub fn add_source(&self, source: &SourceDescriptor) -> StorageResult<()> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sources WHERE name = ?1)",
            params![source.name],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StorageError::DuplicateSource(source.name.clone()));
        }

        let entry = SourceEntry::from(source.clone());
        conn.execute(
            "INSERT INTO sources (name, type, url, config, added_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.name,
                entry.kind.as_str(),
                entry.url,
                serde_json::to_string(&entry.config)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn load_sources(&self) -> StorageResult<Vec<SourceDescriptor>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, type, url, config FROM sources ORDER BY added_at, name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sources = Vec::with_capacity(rows.len());
        for (name, kind, url, config) in rows {
            match decode_source(&name, &kind, url, &config) {
                Ok(source) => sources.push(source),
                Err(e) => tracing::warn!("Skipping stored source: {}", e),
            }
        }
        Ok(sources)
    }

    // ===== Items =====

    fn upsert_items(&self, source_name: &str, items: &[EnrichedItem]) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO items
                    (id, source, title, url, date, upvotes, discussion_url, content, first_seen_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    date = excluded.date,
                    upvotes = excluded.upvotes,
                    discussion_url = excluded.discussion_url,
                    content = excluded.content,
                    updated_at = excluded.updated_at",
            )?;
            for item in items {
                stmt.execute(params![
                    item.record_id(source_name),
                    source_name,
                    item.title,
                    item.url,
                    item.date,
                    item.upvotes,
                    item.discussion_url,
                    item.content,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    /// Looks up one stored item
    ///
    /// # Arguments
    ///
    /// * `source_name` - Source the item was harvested from
    /// * `url` - Item URL as stored
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ItemRecord))` - The stored record
    /// * `Ok(None)` - No such item
    pub fn get_item(&self, source_name: &str, url: &str) -> StorageResult<Option<ItemRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, source, title, url, date, upvotes, discussion_url, content, first_seen_at, updated_at
                 FROM items WHERE source = ?1 AND url = ?2",
                params![source_name, url],
                item_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count_items(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Item counts per source, busiest first
    pub fn source_stats(&self) -> StorageResult<Vec<SourceStats>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source,
                    COUNT(*),
                    SUM(CASE WHEN content = '' THEN 1 ELSE 0 END),
                    MAX(updated_at)
             FROM items
             GROUP BY source
             ORDER BY COUNT(*) DESC, source",
        )?;
        let stats = stmt
            .query_map([], |row| {
                Ok(SourceStats {
                    source: row.get(0)?,
                    items: row.get::<_, i64>(1)? as u64,
                    empty_content: row.get::<_, i64>(2)? as u64,
                    last_updated: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }
}

fn decode_source(name: &str, kind: &str, url: String, config: &str) -> StorageResult<SourceDescriptor> {
    let invalid = |message: String| StorageError::InvalidSource {
        name: name.to_string(),
        message,
    };
    let kind = SourceKind::parse(kind).ok_or_else(|| invalid(format!("unknown type '{}'", kind)))?;
    let config = serde_json::from_str(config)?;
    SourceDescriptor::try_from(SourceEntry {
        name: name.to_string(),
        kind,
        url,
        config,
    })
    .map_err(|e| invalid(e.to_string()))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        id: row.get(0)?,
        source: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        date: row.get(4)?,
        upvotes: row.get(5)?,
        discussion_url: row.get(6)?,
        content: row.get(7)?,
        first_seen_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        summary: RunSummary {
            sources_processed: row.get(5)?,
            sources_failed: row.get(6)?,
            items_resolved: row.get::<_, i64>(7)? as u64,
            items_persisted: row.get::<_, i64>(8)? as u64,
            batches_failed: row.get(9)?,
        },
    })
}

#[async_trait]
impl ItemSink for SqliteStorage {
    async fn upsert(&self, source_name: &str, items: &[EnrichedItem]) -> StorageResult<usize> {
        self.upsert_items(source_name, items)
    }
}

#[async_trait]
impl SourceRegistry for SqliteStorage {
    async fn list_sources(&self) -> StorageResult<Vec<SourceDescriptor>> {
        self.load_sources()
    }
}

#[async_trait]
impl SummaryCache for SqliteStorage {
    async fn get_summary(&self, key: &str, ttl: Duration) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let cached: Option<(String, String)> = conn
            .query_row(
                "SELECT summary, created_at FROM summaries WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((summary, created_at)) = cached else {
            return Ok(None);
        };

        let fresh = DateTime::parse_from_rfc3339(&created_at)
            .ok()
            .and_then(|created| Utc::now().signed_duration_since(created).to_std().ok())
            .map(|age| age < ttl)
            .unwrap_or(false);

        if fresh {
            Ok(Some(summary))
        } else {
            conn.execute("DELETE FROM summaries WHERE cache_key = ?1", params![key])?;
            tracing::debug!("Expired summary removed for {}", key);
            Ok(None)
        }
    }

    async fn put_summary(&self, key: &str, summary: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO summaries (cache_key, summary, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(cache_key) DO UPDATE SET
                summary = excluded.summary,
                created_at = excluded.created_at",
            params![key, summary, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl RunLog for SqliteStorage {
    fn start_run(&self, config_hash: &str) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                Utc::now().to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(&self, run_id: i64, status: RunStatus, summary: &RunSummary) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE runs SET
                status = ?1,
                finished_at = ?2,
                sources_processed = ?3,
                sources_failed = ?4,
                items_resolved = ?5,
                items_persisted = ?6,
                batches_failed = ?7
             WHERE id = ?8",
            params![
                status.to_db_string(),
                Utc::now().to_rfc3339(),
                summary.sources_processed,
                summary.sources_failed,
                summary.items_resolved as i64,
                summary.items_persisted as i64,
                summary.batches_failed,
                run_id
            ],
        )?;
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status,
                        sources_processed, sources_failed, items_resolved, items_persisted, batches_failed
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}
