//! Section store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read section snapshots (capacity, counter, status, version).
//! - Apply version-guarded seat counter writes for the enrollment kernel.
//! - Register sections and change their status for the catalog side.
//!
//! # Invariants
//! - Every write to a section row increments `version`.
//! - Guarded writes report `false` instead of erroring when the stored
//!   version no longer matches the caller's snapshot.
//! - A reserve never lifts the counter above `capacity`; a release never
//!   lowers it below zero.

use crate::model::section::{CourseSection, NewSection, SectionId, SectionStatus, VersionToken};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SECTION_SELECT_SQL: &str = "SELECT
    id,
    course_code,
    term_id,
    capacity,
    current_enrollment_count,
    status,
    version
FROM sections";

/// Direction of a guarded seat counter write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatAdjustment {
    /// Take one seat; only applies while the section is open and not full.
    Reserve,
    /// Give back one seat, flooring the counter at zero.
    Release,
}

/// Repository interface for section reads and guarded writes.
pub trait SectionStore {
    fn create_section(&self, section: &NewSection) -> RepoResult<CourseSection>;
    fn get_section(&self, id: SectionId) -> RepoResult<Option<CourseSection>>;
    /// Compare-and-swap on `version`; returns whether the row was written.
    fn try_adjust_enrollment_count(
        &self,
        id: SectionId,
        expected_version: VersionToken,
        adjustment: SeatAdjustment,
    ) -> RepoResult<bool>;
    /// Compare-and-swap on `version`; returns whether the row was written.
    fn try_set_status(
        &self,
        id: SectionId,
        expected_version: VersionToken,
        status: SectionStatus,
    ) -> RepoResult<bool>;
}

/// SQLite-backed section store.
pub struct SqliteSectionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSectionStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["sections"])?;
        Ok(Self { conn })
    }
}

impl SectionStore for SqliteSectionStore<'_> {
    fn create_section(&self, section: &NewSection) -> RepoResult<CourseSection> {
        section
            .validate()
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO sections (
                id,
                course_code,
                term_id,
                capacity,
                current_enrollment_count,
                status,
                version
            ) VALUES (?1, ?2, ?3, ?4, 0, 'open', 1);",
            params![
                id.to_string(),
                section.course_code.trim(),
                section.term_id.trim(),
                section.capacity,
            ],
        )?;

        self.get_section(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("section {id} missing after insert")))
    }

    fn get_section(&self, id: SectionId) -> RepoResult<Option<CourseSection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SECTION_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_section_row(row)))
            .optional()?;
        row.transpose()
    }

    fn try_adjust_enrollment_count(
        &self,
        id: SectionId,
        expected_version: VersionToken,
        adjustment: SeatAdjustment,
    ) -> RepoResult<bool> {
        let sql = match adjustment {
            SeatAdjustment::Reserve => {
                "UPDATE sections
                 SET
                    current_enrollment_count = current_enrollment_count + 1,
                    version = version + 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                   AND version = ?2
                   AND status = 'open'
                   AND current_enrollment_count < capacity;"
            }
            SeatAdjustment::Release => {
                "UPDATE sections
                 SET
                    current_enrollment_count = MAX(current_enrollment_count - 1, 0),
                    version = version + 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                   AND version = ?2;"
            }
        };

        let changed = self
            .conn
            .execute(sql, params![id.to_string(), expected_version])?;
        Ok(changed == 1)
    }

    fn try_set_status(
        &self,
        id: SectionId,
        expected_version: VersionToken,
        status: SectionStatus,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE sections
             SET
                status = ?3,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND version = ?2;",
            params![id.to_string(), expected_version, section_status_to_db(status)],
        )?;
        Ok(changed == 1)
    }
}

fn parse_section_row(row: &Row<'_>) -> RepoResult<CourseSection> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "sections.id")?;

    let status_text: String = row.get("status")?;
    let status = parse_section_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid section status `{status_text}` in sections.status"
        ))
    })?;

    let capacity: u32 = row.get("capacity")?;
    let current_enrollment_count: u32 = row.get("current_enrollment_count")?;
    if current_enrollment_count > capacity {
        return Err(RepoError::InvalidData(format!(
            "section {id} counter {current_enrollment_count} exceeds capacity {capacity}"
        )));
    }

    Ok(CourseSection {
        id,
        course_code: row.get("course_code")?,
        term_id: row.get("term_id")?,
        capacity,
        current_enrollment_count,
        status,
        version: row.get("version")?,
    })
}

fn section_status_to_db(status: SectionStatus) -> &'static str {
    match status {
        SectionStatus::Open => "open",
        SectionStatus::Closed => "closed",
        SectionStatus::Cancelled => "cancelled",
    }
}

fn parse_section_status(value: &str) -> Option<SectionStatus> {
    match value {
        "open" => Some(SectionStatus::Open),
        "closed" => Some(SectionStatus::Closed),
        "cancelled" => Some(SectionStatus::Cancelled),
        _ => None,
    }
}
