//! Attendance store contracts and SQLite implementation.
//!
//! # Invariants
//! - Lookups by key compare `day` with `IS`, so a missing day only matches
//!   another missing day.
//! - The expression index `attendance_slot_unique` rejects duplicate keys
//!   even when two writers pass the pre-insert check concurrently.

use crate::model::attendance::{
    AttendanceId, AttendanceKey, AttendanceRecord, AttendanceStatus, DayOfWeek,
};
use crate::model::enrollment::EnrollmentId;
use crate::repo::{
    ensure_connection_ready, map_unique_violation, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ATTENDANCE_SELECT_SQL: &str = "SELECT
    id,
    enrollment_id,
    week,
    day,
    status,
    recorded_at,
    updated_at
FROM attendance";

const SLOT_UNIQUE_INDEX: &str = "attendance_slot_unique";

pub trait AttendanceStore {
    fn find_record(&self, key: &AttendanceKey) -> RepoResult<Option<AttendanceRecord>>;
    fn get_record(&self, id: AttendanceId) -> RepoResult<Option<AttendanceRecord>>;
    fn insert_record(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord>;
    /// Returns false when no record has the given id.
    fn update_status(&self, id: AttendanceId, status: AttendanceStatus) -> RepoResult<bool>;
    fn list_for_enrollment(&self, enrollment_id: EnrollmentId) -> RepoResult<Vec<AttendanceRecord>>;
}

/// SQLite-backed attendance store.
pub struct SqliteAttendanceStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["attendance"])?;
        Ok(Self { conn })
    }
}

impl AttendanceStore for SqliteAttendanceStore<'_> {
    fn find_record(&self, key: &AttendanceKey) -> RepoResult<Option<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE enrollment_id = ?1
               AND week = ?2
               AND day IS ?3;"
        ))?;
        let row = stmt
            .query_row(
                params![
                    key.enrollment_id.to_string(),
                    key.week,
                    key.day.map(day_to_db),
                ],
                |row| Ok(parse_attendance_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn get_record(&self, id: AttendanceId) -> RepoResult<Option<AttendanceRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATTENDANCE_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_attendance_row(row)))
            .optional()?;
        row.transpose()
    }

    fn insert_record(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO attendance (
                    id,
                    enrollment_id,
                    week,
                    day,
                    status
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    id.to_string(),
                    key.enrollment_id.to_string(),
                    key.week,
                    key.day.map(day_to_db),
                    status_to_db(status),
                ],
            )
            .map_err(|err| map_unique_violation(err, SLOT_UNIQUE_INDEX))?;

        self.get_record(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("attendance record {id} missing after insert"))
        })
    }

    fn update_status(&self, id: AttendanceId, status: AttendanceStatus) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE attendance
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), status_to_db(status)],
        )?;
        Ok(changed == 1)
    }

    fn list_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        // Records without a day sort before weekday records of the same week.
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE enrollment_id = ?1
             ORDER BY
                week ASC,
                CASE day
                    WHEN 'mon' THEN 1
                    WHEN 'tue' THEN 2
                    WHEN 'wed' THEN 3
                    WHEN 'thu' THEN 4
                    WHEN 'fri' THEN 5
                    WHEN 'sat' THEN 6
                    WHEN 'sun' THEN 7
                    ELSE 0
                END ASC;"
        ))?;
        let mut rows = stmt.query([enrollment_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }
        Ok(records)
    }
}

fn parse_attendance_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let id_text: String = row.get("id")?;
    let enrollment_text: String = row.get("enrollment_id")?;

    let day = match row.get::<_, Option<String>>("day")? {
        Some(value) => Some(parse_day(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid day `{value}` in attendance.day"))
        })?),
        None => None,
    };

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid attendance status `{status_text}` in attendance.status"
        ))
    })?;

    Ok(AttendanceRecord {
        id: parse_uuid(&id_text, "attendance.id")?,
        enrollment_id: parse_uuid(&enrollment_text, "attendance.enrollment_id")?,
        week: row.get("week")?,
        day,
        status,
        recorded_at: row.get("recorded_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn day_to_db(day: DayOfWeek) -> &'static str {
    match day {
        DayOfWeek::Mon => "mon",
        DayOfWeek::Tue => "tue",
        DayOfWeek::Wed => "wed",
        DayOfWeek::Thu => "thu",
        DayOfWeek::Fri => "fri",
        DayOfWeek::Sat => "sat",
        DayOfWeek::Sun => "sun",
    }
}

fn parse_day(value: &str) -> Option<DayOfWeek> {
    match value {
        "mon" => Some(DayOfWeek::Mon),
        "tue" => Some(DayOfWeek::Tue),
        "wed" => Some(DayOfWeek::Wed),
        "thu" => Some(DayOfWeek::Thu),
        "fri" => Some(DayOfWeek::Fri),
        "sat" => Some(DayOfWeek::Sat),
        "sun" => Some(DayOfWeek::Sun),
        _ => None,
    }
}

fn status_to_db(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "present",
        AttendanceStatus::Absent => "absent",
    }
}

fn parse_status(value: &str) -> Option<AttendanceStatus> {
    match value {
        "present" => Some(AttendanceStatus::Present),
        "absent" => Some(AttendanceStatus::Absent),
        _ => None,
    }
}
