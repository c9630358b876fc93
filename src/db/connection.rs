// Database connection management
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;

use super::migrations::run_migrations;
use crate::error::StorageError;

pub struct DatabaseConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        run_migrations(&conn)?;
        log::debug!("[DB] Opened {:?}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, used by tests and the `memory` backend.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn get_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }
}

impl Clone for DatabaseConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("player.db");

        DatabaseConnection::new(path.clone()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn clones_share_one_connection() {
        let db = DatabaseConnection::in_memory().unwrap();
        let clone = db.clone();
        assert!(Arc::ptr_eq(&db.get_connection(), &clone.get_connection()));
    }
}
