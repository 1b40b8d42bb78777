//! Append-only translation history, backed by SQLite.
//!
//! All writes go through a dedicated DB thread fed by a channel, so pipeline
//! workers never block on disk. Reads open short-lived connections of their
//! own; SQLite forbids sharing one handle across threads.

use chrono::Local;
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::thread;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryRecord {
    pub source_text: String,
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub mode: String,
    pub engine: String,
    pub confidence: f32,
    pub duration_ms: u64,
    pub timestamp: String,
}

enum HistoryAction {
    Append(HistoryRecord),
    ClearAll,
    Prune(usize),
    Flush(Sender<()>),
}

pub struct HistoryManager {
    tx: Sender<HistoryAction>,
    db_path: PathBuf,
}

impl HistoryManager {
    pub fn new(db_path: &Path, max_items: usize) -> Self {
        let (tx, rx) = channel();
        let path = db_path.to_path_buf();

        thread::spawn(move || {
            let conn = match setup_db(&path) {
                Ok(conn) => conn,
                Err(e) => {
                    log::error!("failed to open history database: {}", e);
                    return;
                }
            };

            let mut max_items = max_items;
            while let Ok(action) = rx.recv() {
                match action {
                    HistoryAction::Append(mut record) => {
                        if record.timestamp.is_empty() {
                            record.timestamp =
                                Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
                        }
                        let result = conn.execute(
                            "INSERT INTO translations
                             (source_text, translated_text, source_lang, target_lang,
                              mode, engine, confidence, duration_ms, timestamp)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                            params![
                                record.source_text,
                                record.translated_text,
                                record.source_lang,
                                record.target_lang,
                                record.mode,
                                record.engine,
                                record.confidence,
                                record.duration_ms as i64,
                                record.timestamp,
                            ],
                        );
                        if let Err(e) = result {
                            log::warn!("history insert failed: {}", e);
                        }
                        prune_db(&conn, max_items);
                    }
                    HistoryAction::ClearAll => {
                        if let Err(e) = conn.execute("DELETE FROM translations", []) {
                            log::warn!("history clear failed: {}", e);
                        }
                    }
                    HistoryAction::Prune(new_limit) => {
                        max_items = new_limit;
                        prune_db(&conn, max_items);
                    }
                    HistoryAction::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self {
            tx,
            db_path: db_path.to_path_buf(),
        }
    }

    /// Fire-and-forget append from any thread.
    pub fn append(&self, record: HistoryRecord) {
        let _ = self.tx.send(HistoryAction::Append(record));
    }

    /// Bulk clear, the only deletion the history supports.
    pub fn clear_all(&self) {
        let _ = self.tx.send(HistoryAction::ClearAll);
    }

    pub fn request_prune(&self, limit: usize) {
        let _ = self.tx.send(HistoryAction::Prune(limit));
    }

    /// Block until every previously queued write has been applied.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = channel();
        if self.tx.send(HistoryAction::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(Duration::from_secs(5));
        }
    }

    /// Most-recent-first records, optionally filtered by a search term over
    /// both source and translated text.
    pub fn query(&self, search: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let conn = setup_db(&self.db_path)?;
        let mut records = Vec::new();

        let map_row = |row: &rusqlite::Row<'_>| -> Result<HistoryRecord> {
            Ok(HistoryRecord {
                source_text: row.get(0)?,
                translated_text: row.get(1)?,
                source_lang: row.get(2)?,
                target_lang: row.get(3)?,
                mode: row.get(4)?,
                engine: row.get(5)?,
                confidence: row.get(6)?,
                duration_ms: row.get::<_, i64>(7)? as u64,
                timestamp: row.get(8)?,
            })
        };

        if search.is_empty() {
            let mut stmt = conn.prepare(
                "SELECT source_text, translated_text, source_lang, target_lang,
                        mode, engine, confidence, duration_ms, timestamp
                 FROM translations ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], map_row)?;
            for row in rows {
                records.push(row?);
            }
        } else {
            let pattern = format!("%{}%", search);
            let mut stmt = conn.prepare(
                "SELECT source_text, translated_text, source_lang, target_lang,
                        mode, engine, confidence, duration_ms, timestamp
                 FROM translations
                 WHERE source_text LIKE ?1 OR translated_text LIKE ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![pattern, limit], map_row)?;
            for row in rows {
                records.push(row?);
            }
        }

        Ok(records)
    }

    /// Export the full history as plain text.
    pub fn export(&self, filepath: &Path) -> anyhow::Result<()> {
        let records = self.query("", 1_000_000)?;
        let mut out = String::new();
        for r in &records {
            out.push_str(&format!(
                "[{}] {}->{} ({}/{})\nSource: {}\nTranslation: {}\n{}\n\n",
                r.timestamp,
                r.source_lang,
                r.target_lang,
                r.mode,
                r.engine,
                r.source_text,
                r.translated_text,
                "-".repeat(80)
            ));
        }
        std::fs::write(filepath, out)?;
        Ok(())
    }
}

fn setup_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY,
            source_text TEXT NOT NULL,
            translated_text TEXT NOT NULL,
            source_lang TEXT NOT NULL,
            target_lang TEXT NOT NULL,
            mode TEXT NOT NULL,
            engine TEXT NOT NULL,
            confidence REAL NOT NULL,
            duration_ms INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    Ok(conn)
}

fn prune_db(conn: &Connection, limit: usize) {
    if limit == 0 {
        return;
    }
    let count: Result<usize> =
        conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0));
    if let Ok(c) = count {
        if c > limit {
            let overflow = c - limit;
            let result = conn.execute(
                "DELETE FROM translations WHERE id IN
                 (SELECT id FROM translations ORDER BY id ASC LIMIT ?1)",
                params![overflow],
            );
            if let Err(e) = result {
                log::warn!("history prune failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, translated: &str) -> HistoryRecord {
        HistoryRecord {
            source_text: source.to_string(),
            translated_text: translated.to_string(),
            source_lang: "en".to_string(),
            target_lang: "fr".to_string(),
            mode: "standard".to_string(),
            engine: "cloud".to_string(),
            confidence: 0.95,
            duration_ms: 50,
            timestamp: String::new(),
        }
    }

    #[test]
    fn append_then_query() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryManager::new(&dir.path().join("history.db"), 100);

        history.append(record("hello there", "bonjour"));
        history.flush();

        let records = history.query("", 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_text, "hello there");
        assert_eq!(records[0].translated_text, "bonjour");
        assert!(!records[0].timestamp.is_empty());
    }

    #[test]
    fn search_filters_both_columns() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryManager::new(&dir.path().join("history.db"), 100);

        history.append(record("hello there", "bonjour"));
        history.append(record("good night", "bonne nuit"));
        history.flush();

        assert_eq!(history.query("hello", 10).unwrap().len(), 1);
        assert_eq!(history.query("bonne", 10).unwrap().len(), 1);
        assert_eq!(history.query("zzz", 10).unwrap().len(), 0);
    }

    #[test]
    fn newest_first_with_limit() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryManager::new(&dir.path().join("history.db"), 100);

        for i in 0..5 {
            history.append(record(&format!("phrase {}", i), "x"));
        }
        history.flush();

        let records = history.query("", 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_text, "phrase 4");
        assert_eq!(records[1].source_text, "phrase 3");
    }

    #[test]
    fn clear_all_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryManager::new(&dir.path().join("history.db"), 100);

        history.append(record("hello", "bonjour"));
        history.clear_all();
        history.flush();

        assert!(history.query("", 10).unwrap().is_empty());
    }

    #[test]
    fn prune_keeps_newest_records() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryManager::new(&dir.path().join("history.db"), 3);

        for i in 0..10 {
            history.append(record(&format!("phrase {}", i), "x"));
        }
        history.flush();

        let records = history.query("", 100).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].source_text, "phrase 9");
    }
}
