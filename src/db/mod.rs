use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use crate::models::ImageRecord;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn record_from_row(row: &rusqlite::Row<'_>) -> Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        ocr_text: row.get(2)?,
        lang: row.get(3)?,
        uploaded_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

/// Handle to the image store. All statements run on one dedicated worker
/// thread that owns the SQLite connection; callers hand it closures and await
/// the result.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("gifgrep-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_image(
        &self,
        filename: &str,
        ocr_text: &str,
        lang: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<i64> {
        let filename = filename.to_string();
        let ocr_text = ocr_text.to_string();
        let lang = lang.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO images (filename, ocr_text, lang, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![filename, ocr_text, lang, uploaded_at.to_rfc3339()],
            )
            .with_context(|| "failed to insert image record")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// List records, newest first. With `search`, only rows whose transcript
    /// contains the query as a substring.
    pub async fn list_images(&self, search: Option<String>) -> Result<Vec<ImageRecord>> {
        self.execute(move |conn| {
            let mut records = Vec::new();
            match search {
                Some(query) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, filename, ocr_text, lang, uploaded_at FROM images
                         WHERE ocr_text LIKE ?1
                         ORDER BY uploaded_at DESC, id DESC",
                    )?;
                    let pattern = format!("%{query}%");
                    let mut rows = stmt.query(params![pattern])?;
                    while let Some(row) = rows.next()? {
                        records.push(record_from_row(row)?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, filename, ocr_text, lang, uploaded_at FROM images
                         ORDER BY uploaded_at DESC, id DESC",
                    )?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        records.push(record_from_row(row)?);
                    }
                }
            }
            Ok(records)
        })
        .await
    }

    pub async fn find_language(&self, filename: &str) -> Result<Option<String>> {
        let filename = filename.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT lang FROM images WHERE filename = ?1",
                params![filename],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    /// Rewrite a row after a rescan: new transcript, and a new filename when
    /// a legacy upload got normalized to GIF along the way.
    pub async fn update_scan(
        &self,
        old_filename: &str,
        new_filename: &str,
        ocr_text: &str,
    ) -> Result<()> {
        let old_filename = old_filename.to_string();
        let new_filename = new_filename.to_string();
        let ocr_text = ocr_text.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE images SET filename = ?1, ocr_text = ?2 WHERE filename = ?3",
                params![new_filename, ocr_text, old_filename],
            )
            .with_context(|| "failed to update rescanned image")?;
            Ok(())
        })
        .await
    }

    pub async fn update_filename(&self, id: i64, new_filename: &str) -> Result<()> {
        let new_filename = new_filename.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE images SET filename = ?1 WHERE id = ?2",
                params![new_filename, id],
            )
            .with_context(|| "failed to update filename")?;
            Ok(())
        })
        .await
    }

    pub async fn delete_by_filename(&self, filename: &str) -> Result<usize> {
        let filename = filename.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM images WHERE filename = ?1", params![filename])
                .with_context(|| "failed to delete image record")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_db_path() -> PathBuf {
        let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("gifgrep-test-{}-{n}.sqlite", std::process::id()))
    }

    #[tokio::test]
    async fn insert_and_list_round_trip() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        let now = Utc::now();
        db.insert_image("2025-08-29/cat.gif", "hello cat", "eng", now)
            .await
            .unwrap();
        db.insert_image("2025-08-29/dog.gif", "good dog", "eng", now)
            .await
            .unwrap();

        let all = db.list_images(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let hits = db.list_images(Some("cat".into())).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "2025-08-29/cat.gif");
        assert_eq!(hits[0].lang, "eng");

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn language_lookup_and_delete() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        db.insert_image("x/a.gif", "text", "chi_sim", Utc::now())
            .await
            .unwrap();

        assert_eq!(
            db.find_language("x/a.gif").await.unwrap(),
            Some("chi_sim".to_string())
        );
        assert_eq!(db.find_language("missing.gif").await.unwrap(), None);

        assert_eq!(db.delete_by_filename("x/a.gif").await.unwrap(), 1);
        assert!(db.list_images(None).await.unwrap().is_empty());

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn rescan_and_filename_updates_apply() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        let id = db
            .insert_image("y/old.png", "first read", "eng", Utc::now())
            .await
            .unwrap();

        db.update_scan("y/old.png", "y/old.gif", "second read")
            .await
            .unwrap();

        let all = db.list_images(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ocr_text, "second read");
        assert_eq!(all[0].filename, "y/old.gif");

        db.update_filename(id, "y/renamed.gif").await.unwrap();
        let all = db.list_images(None).await.unwrap();
        assert_eq!(all[0].filename, "y/renamed.gif");

        drop(db);
        let _ = std::fs::remove_file(path);
    }
}
