//! Student identity store.
//!
//! Student profiles belong to the account subsystem; the kernel only needs
//! to confirm an identity exists before enrolling it.

use crate::model::enrollment::StudentId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

pub trait StudentStore {
    fn create_student(&self, display_name: &str) -> RepoResult<StudentId>;
    fn student_exists(&self, id: StudentId) -> RepoResult<bool>;
}

/// SQLite-backed student identity store.
pub struct SqliteStudentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["students"])?;
        Ok(Self { conn })
    }
}

impl StudentStore for SqliteStudentStore<'_> {
    fn create_student(&self, display_name: &str) -> RepoResult<StudentId> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(RepoError::InvalidData(
                "student display_name must not be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO students (id, display_name) VALUES (?1, ?2);",
            params![id.to_string(), trimmed],
        )?;
        Ok(id)
    }

    fn student_exists(&self, id: StudentId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
