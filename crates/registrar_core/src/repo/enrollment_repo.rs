//! Enrollment store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Look up enrollments by `(student_id, section_id)` and by id.
//! - Insert active enrollments and flip them to dropped.
//!
//! # Invariants
//! - The partial unique index `enrollments_active_unique` allows one active
//!   row per `(student_id, section_id, term_id)`; inserts that would break
//!   it fail with `RepoError::UniqueViolation`.
//! - Rows are never deleted; `mark_dropped` only touches active rows.

use crate::model::enrollment::{Enrollment, EnrollmentId, EnrollmentStatus, StudentId};
use crate::model::section::SectionId;
use crate::repo::{
    ensure_connection_ready, map_unique_violation, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ENROLLMENT_SELECT_SQL: &str = "SELECT
    id,
    student_id,
    section_id,
    term_id,
    status,
    enrolled_at,
    dropped_at
FROM enrollments";

const ACTIVE_UNIQUE_INDEX: &str = "enrollments_active_unique";

/// Repository interface for enrollment lookups and state transitions.
pub trait EnrollmentStore {
    /// Loads the active enrollment for the pair, if any.
    fn find_active(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> RepoResult<Option<Enrollment>>;
    /// Loads the most recent enrollment for the pair regardless of status.
    fn find_latest(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> RepoResult<Option<Enrollment>>;
    fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<Enrollment>>;
    /// Inserts a new active enrollment row.
    fn insert_active(
        &self,
        student_id: StudentId,
        section_id: SectionId,
        term_id: &str,
    ) -> RepoResult<Enrollment>;
    /// Sets `status=dropped` and `dropped_at=now`; returns false when the
    /// row is missing or no longer active.
    fn mark_dropped(&self, id: EnrollmentId) -> RepoResult<bool>;
    fn list_for_section(
        &self,
        section_id: SectionId,
        include_dropped: bool,
    ) -> RepoResult<Vec<Enrollment>>;
    fn count_active(&self, section_id: SectionId) -> RepoResult<u32>;
}

/// SQLite-backed enrollment store.
pub struct SqliteEnrollmentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEnrollmentStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["enrollments"])?;
        Ok(Self { conn })
    }

    fn query_one(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Option<Enrollment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let row = stmt
            .query_row(params, |row| Ok(parse_enrollment_row(row)))
            .optional()?;
        row.transpose()
    }
}

impl EnrollmentStore for SqliteEnrollmentStore<'_> {
    fn find_active(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> RepoResult<Option<Enrollment>> {
        self.query_one(
            &format!(
                "{ENROLLMENT_SELECT_SQL}
                 WHERE student_id = ?1
                   AND section_id = ?2
                   AND status = 'active';"
            ),
            params![student_id.to_string(), section_id.to_string()],
        )
    }

    fn find_latest(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> RepoResult<Option<Enrollment>> {
        self.query_one(
            &format!(
                "{ENROLLMENT_SELECT_SQL}
                 WHERE student_id = ?1
                   AND section_id = ?2
                 ORDER BY enrolled_at DESC, rowid DESC
                 LIMIT 1;"
            ),
            params![student_id.to_string(), section_id.to_string()],
        )
    }

    fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<Enrollment>> {
        self.query_one(
            &format!("{ENROLLMENT_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
        )
    }

    fn insert_active(
        &self,
        student_id: StudentId,
        section_id: SectionId,
        term_id: &str,
    ) -> RepoResult<Enrollment> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO enrollments (
                    id,
                    student_id,
                    section_id,
                    term_id,
                    status
                ) VALUES (?1, ?2, ?3, ?4, 'active');",
                params![
                    id.to_string(),
                    student_id.to_string(),
                    section_id.to_string(),
                    term_id,
                ],
            )
            .map_err(|err| map_unique_violation(err, ACTIVE_UNIQUE_INDEX))?;

        self.get_enrollment(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("enrollment {id} missing after insert")))
    }

    fn mark_dropped(&self, id: EnrollmentId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE enrollments
             SET
                status = 'dropped',
                dropped_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND status = 'active';",
            [id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn list_for_section(
        &self,
        section_id: SectionId,
        include_dropped: bool,
    ) -> RepoResult<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENROLLMENT_SELECT_SQL}
             WHERE section_id = ?1
               AND (?2 = 1 OR status = 'active')
             ORDER BY enrolled_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![section_id.to_string(), i64::from(include_dropped)])?;
        let mut enrollments = Vec::new();
        while let Some(row) = rows.next()? {
            enrollments.push(parse_enrollment_row(row)?);
        }
        Ok(enrollments)
    }

    fn count_active(&self, section_id: SectionId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM enrollments
             WHERE section_id = ?1
               AND status = 'active';",
            [section_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_enrollment_row(row: &Row<'_>) -> RepoResult<Enrollment> {
    let id_text: String = row.get("id")?;
    let student_text: String = row.get("student_id")?;
    let section_text: String = row.get("section_id")?;

    let status_text: String = row.get("status")?;
    let status = parse_enrollment_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid enrollment status `{status_text}` in enrollments.status"
        ))
    })?;

    let dropped_at: Option<i64> = row.get("dropped_at")?;
    if (status == EnrollmentStatus::Dropped) != dropped_at.is_some() {
        return Err(RepoError::InvalidData(format!(
            "enrollment {id_text} has status `{status_text}` but dropped_at={dropped_at:?}"
        )));
    }

    Ok(Enrollment {
        id: parse_uuid(&id_text, "enrollments.id")?,
        student_id: parse_uuid(&student_text, "enrollments.student_id")?,
        section_id: parse_uuid(&section_text, "enrollments.section_id")?,
        term_id: row.get("term_id")?,
        status,
        enrolled_at: row.get("enrolled_at")?,
        dropped_at,
    })
}

fn parse_enrollment_status(value: &str) -> Option<EnrollmentStatus> {
    match value {
        "active" => Some(EnrollmentStatus::Active),
        "dropped" => Some(EnrollmentStatus::Dropped),
        _ => None,
    }
}
