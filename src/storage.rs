//! Persistent translation cache (tier 2), backed by SQLite.
//!
//! Lookups sit on the translation hot path, so every operation degrades to
//! a cache miss on error instead of failing the caller. The connection is
//! shared behind a mutex; critical sections are sub-millisecond.

use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (
                id INTEGER PRIMARY KEY,
                source_text TEXT NOT NULL,
                source_lang TEXT NOT NULL,
                target_lang TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(source_text, source_lang, target_lang)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a cached translation if it exists. Errors degrade to a miss.
    pub fn get(&self, text: &str, src: &str, tgt: &str) -> Option<String> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT translated_text FROM cache
             WHERE source_text = ?1 AND source_lang = ?2 AND target_lang = ?3",
            params![text, src, tgt],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(translated) => Some(translated),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                log::warn!("cache lookup failed: {}", e);
                None
            }
        }
    }

    /// Cache a translation. Identical keys overwrite; errors are logged and
    /// swallowed so the translation path never blocks on the store.
    pub fn put(&self, text: &str, translated: &str, src: &str, tgt: &str) {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT OR REPLACE INTO cache
             (source_text, source_lang, target_lang, translated_text)
             VALUES (?1, ?2, ?3, ?4)",
            params![text, src, tgt, translated],
        );
        if let Err(e) = result {
            log::warn!("cache insert failed: {}", e);
        }
    }

    pub fn len(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get::<_, usize>(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute("DELETE FROM cache", []) {
            log::warn!("cache clear failed: {}", e);
        }
    }
}
