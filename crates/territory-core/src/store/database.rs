//! SQLite-backed key-value store.
//!
//! Every operation opens its own connection so callers never manage
//! connection lifetime, and the handle stays `Send + Sync`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::errors::{TerritoryError, TerritoryResult};
use crate::store::kv::KvStore;
use crate::store::schema;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if path.len() > 2 {
                expanded.push(&path[2..]);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}

/// Expand `~` and make `path` absolute against the current directory.
fn resolve_path(path: &Path) -> TerritoryResult<PathBuf> {
    let expanded = expand_tilde(&path.to_string_lossy());
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Persistent key-value store in a single SQLite file.
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    /// Resolve `db_path`, create its parent directories, and initialise the
    /// schema.
    pub fn open(db_path: impl AsRef<Path>) -> TerritoryResult<Self> {
        let resolved = resolve_path(db_path.as_ref())?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Self { db_path: resolved };
        db.init_schema()?;
        Ok(db)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> TerritoryResult<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Set WAL mode, create tables, then run pending migrations.
    pub fn init_schema(&self) -> TerritoryResult<()> {
        let conn = self.connect()?;
        // journal_mode returns a row, so it cannot go through execute_batch.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)?;
        Ok(())
    }

    pub fn schema_version(&self) -> TerritoryResult<i32> {
        let conn = self.connect()?;
        Ok(schema::get_schema_version(&conn))
    }

    // -----------------------------------------------------------------------
    // Backup
    // -----------------------------------------------------------------------

    /// Copy the database to `destination` with the SQLite backup API and
    /// return the resolved path.
    pub fn backup_to(&self, destination: impl AsRef<Path>) -> TerritoryResult<PathBuf> {
        let resolved = resolve_path(destination.as_ref())?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let src_conn = self.connect()?;
        let mut dst_conn = Connection::open(&resolved)?;
        let backup = Backup::new(&src_conn, &mut dst_conn)?;
        backup.run_to_completion(100, Duration::from_millis(10), None)?;
        debug!("Backed up {} to {}", self.db_path.display(), resolved.display());
        Ok(resolved)
    }

    /// Replace the database contents with those of a backup file.
    pub fn restore_from(&self, source: impl AsRef<Path>) -> TerritoryResult<()> {
        let resolved = resolve_path(source.as_ref())?;
        if !resolved.exists() {
            return Err(TerritoryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Backup file does not exist: {}", resolved.display()),
            )));
        }
        let src_conn = Connection::open(&resolved)?;
        let mut dst_conn = self.connect()?;
        let backup = Backup::new(&src_conn, &mut dst_conn)?;
        backup.run_to_completion(100, Duration::from_millis(10), None)?;
        Ok(())
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> TerritoryResult<Option<String>> {
        let conn = self.connect()?;
        let result: Result<String, _> = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1 LIMIT 1;",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> TerritoryResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO kv_store(key, value, updated_at) VALUES(?1, ?2, CURRENT_TIMESTAMP) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> TerritoryResult<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1;", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("nested/state.db")).unwrap();
        assert!(db.db_path().exists());
        assert_eq!(db.schema_version().unwrap(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn kv_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("state.db")).unwrap();
        assert_eq!(db.get("assignments").unwrap(), None);
        db.set("assignments", "{}").unwrap();
        db.set("assignments", r#"{"CA":1}"#).unwrap();
        db.set("panel_width", "320").unwrap();
        assert_eq!(db.get("assignments").unwrap().as_deref(), Some(r#"{"CA":1}"#));
        assert_eq!(db.get("panel_width").unwrap().as_deref(), Some("320"));
        db.remove("assignments").unwrap();
        assert_eq!(db.get("assignments").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        Database::open(&path).unwrap().set("k", "v").unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn backup_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("state.db")).unwrap();
        db.set("k", "before").unwrap();
        let backup = db.backup_to(dir.path().join("backups/state.bak")).unwrap();
        assert!(backup.exists());

        db.set("k", "after").unwrap();
        db.restore_from(&backup).unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("before"));
    }

    #[test]
    fn restore_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("state.db")).unwrap();
        let err = db.restore_from(dir.path().join("missing.bak")).unwrap_err();
        assert!(matches!(err, TerritoryError::Io(_)));
    }

    #[test]
    fn expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/tmp/x.db"), PathBuf::from("/tmp/x.db"));
        assert_eq!(expand_tilde("rel/x.db"), PathBuf::from("rel/x.db"));
    }
}
