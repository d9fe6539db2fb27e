use crate::types::*;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Could not locate home directory")]
    NoHomeDir,
}

/// Durable per-user store: one SQLite file, five tables, opened once per
/// process and treated as exclusively owned.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store at `~/.nlsh/nlsh.db`.
    pub fn open() -> Result<Self, StoreError> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Self::open_at(dir.join("nlsh.db"))
    }

    /// Open a store at an explicit path. Used by tests.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::init_schema(&conn)?;
        tracing::debug!("Store opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn data_dir() -> Result<PathBuf, StoreError> {
        Ok(dirs::home_dir().ok_or(StoreError::NoHomeDir)?.join(".nlsh"))
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 role      TEXT NOT NULL,
                 content   TEXT NOT NULL,
                 timestamp TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tools (
                 id          INTEGER PRIMARY KEY AUTOINCREMENT,
                 name        TEXT NOT NULL UNIQUE,
                 description TEXT NOT NULL,
                 usage       TEXT NOT NULL,
                 examples    TEXT NOT NULL,
                 learned_at  TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS brew_cache (
                 name        TEXT PRIMARY KEY,
                 installed   INTEGER NOT NULL,
                 description TEXT NOT NULL,
                 updated_at  TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS preferences (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS history (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 input     TEXT NOT NULL,
                 timestamp TEXT NOT NULL
             );",
        )
    }

    // Messages

    pub fn append_message(&self, role: Role, content: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (role, content, timestamp) VALUES (?1, ?2, ?3)",
            params![role.as_str(), content, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The most recent `limit` messages in ascending chronological order:
    /// take the N newest by id, then reverse.
    pub fn recent_messages(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, role, content, timestamp FROM messages ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(Message {
                id: row.get(0)?,
                role: Role::parse(&row.get::<_, String>(1)?),
                content: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?;
        let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Delete all message rows. The history log is untouched.
    pub fn clear_messages(&self) -> Result<(), StoreError> {
        self.conn.lock().execute("DELETE FROM messages", [])?;
        Ok(())
    }

    // Learned tools

    pub fn upsert_tool(
        &self,
        name: &str,
        description: &str,
        usage: &str,
        examples: &str,
    ) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO tools (name, description, usage, examples, learned_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, description, usage, examples, Utc::now()],
        )?;
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Result<Option<ToolRecord>, StoreError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT id, name, description, usage, examples, learned_at
                 FROM tools WHERE name = ?1",
                params![name],
                Self::tool_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn all_tools(&self) -> Result<Vec<ToolRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, usage, examples, learned_at FROM tools ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::tool_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn tool_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ToolRecord> {
        Ok(ToolRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            usage: row.get(3)?,
            examples: row.get(4)?,
            learned_at: row.get(5)?,
        })
    }

    // Package cache

    pub fn get_package_cache(&self, name: &str) -> Result<Option<PackageCacheEntry>, StoreError> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                "SELECT name, installed, description, updated_at FROM brew_cache WHERE name = ?1",
                params![name],
                |row| {
                    Ok(PackageCacheEntry {
                        name: row.get(0)?,
                        installed: row.get(1)?,
                        description: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn upsert_package_cache(
        &self,
        name: &str,
        installed: bool,
        description: &str,
    ) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO brew_cache (name, installed, description, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, installed, description, Utc::now()],
        )?;
        Ok(())
    }

    // Preferences

    pub fn get_preference(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // History

    pub fn append_history(&self, input: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO history (input, timestamp) VALUES (?1, ?2)",
            params![input, Utc::now()],
        )?;
        Ok(())
    }

    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, input, timestamp FROM history ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                input: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?;
        let mut entries = rows.collect::<Result<Vec<_>, _>>()?;
        entries.reverse();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_message_ids_are_monotonic() {
        let (_dir, store) = test_store();
        let a = store.append_message(Role::User, "one").unwrap();
        let b = store.append_message(Role::Assistant, "two").unwrap();
        let c = store.append_message(Role::User, "three").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_recent_messages_chronological() {
        let (_dir, store) = test_store();
        for content in ["M1", "M2", "M3", "M4"] {
            store.append_message(Role::User, content).unwrap();
        }

        let recent = store.recent_messages(3).unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["M2", "M3", "M4"]);
    }

    #[test]
    fn test_recent_messages_fewer_than_limit() {
        let (_dir, store) = test_store();
        store.append_message(Role::User, "only").unwrap();

        let recent = store.recent_messages(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "only");
        assert_eq!(recent[0].role, Role::User);
    }

    #[test]
    fn test_clear_messages_keeps_history() {
        let (_dir, store) = test_store();
        store.append_message(Role::User, "hello").unwrap();
        store.append_history("hello").unwrap();

        store.clear_messages().unwrap();

        assert!(store.recent_messages(10).unwrap().is_empty());
        assert_eq!(store.recent_history(10).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_tool_replaces_on_conflict() {
        let (_dir, store) = test_store();
        store.upsert_tool("ffmpeg", "video tool", "ffmpeg -i", "").unwrap();
        store
            .upsert_tool("ffmpeg", "media converter", "ffmpeg -i in out", "ex")
            .unwrap();

        let tools = store.all_tools().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].description, "media converter");
        assert_eq!(tools[0].usage, "ffmpeg -i in out");
    }

    #[test]
    fn test_get_tool_missing() {
        let (_dir, store) = test_store();
        assert!(store.get_tool("nope").unwrap().is_none());
    }

    #[test]
    fn test_package_cache_roundtrip() {
        let (_dir, store) = test_store();
        assert!(store.get_package_cache("jq").unwrap().is_none());

        store.upsert_package_cache("jq", true, "").unwrap();
        let entry = store.get_package_cache("jq").unwrap().unwrap();
        assert!(entry.installed);

        store.upsert_package_cache("jq", false, "").unwrap();
        let entry = store.get_package_cache("jq").unwrap().unwrap();
        assert!(!entry.installed);
    }

    #[test]
    fn test_preferences_last_write_wins() {
        let (_dir, store) = test_store();
        assert!(store.get_preference("theme").unwrap().is_none());

        store.set_preference("theme", "dark").unwrap();
        store.set_preference("theme", "light").unwrap();
        assert_eq!(store.get_preference("theme").unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_recent_history_order() {
        let (_dir, store) = test_store();
        for input in ["first", "second", "third"] {
            store.append_history(input).unwrap();
        }

        let history = store.recent_history(2).unwrap();
        let inputs: Vec<&str> = history.iter().map(|h| h.input.as_str()).collect();
        assert_eq!(inputs, vec!["second", "third"]);
    }
}
