//! Grade store contracts and SQLite implementation.
//!
//! # Invariants
//! - One grade row per enrollment; the derived score/letter columns are
//!   written together with the components they were derived from.
//! - Decimals are stored as canonical text so reads reproduce the exact
//!   value that was written.

use crate::model::enrollment::EnrollmentId;
use crate::model::grade::{GradeComponents, GradeRecord, GradeResult, LetterGrade, TeacherId};
use crate::model::section::SectionId;
use crate::repo::{
    ensure_connection_ready, map_unique_violation, parse_uuid, RepoError, RepoResult,
};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

const GRADE_SELECT_SQL: &str = "SELECT
    enrollment_id,
    exam1,
    exam2,
    final_exam,
    project,
    score,
    letter,
    submitted_by,
    updated_at
FROM grades";

const GRADE_PRIMARY_KEY: &str = "grades.enrollment_id";

/// Score of one active enrollment, as cached in the grade row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionScore {
    pub enrollment_id: EnrollmentId,
    pub score: Decimal,
}

pub trait GradeStore {
    fn get_grade(&self, enrollment_id: EnrollmentId) -> RepoResult<Option<GradeRecord>>;
    fn insert_grade(
        &self,
        enrollment_id: EnrollmentId,
        components: &GradeComponents,
        result: &GradeResult,
        submitted_by: TeacherId,
    ) -> RepoResult<GradeRecord>;
    /// Replaces components and cached result; returns false when no grade
    /// row exists for the enrollment.
    fn update_grade(
        &self,
        enrollment_id: EnrollmentId,
        components: &GradeComponents,
        result: &GradeResult,
    ) -> RepoResult<bool>;
    /// Cached scores of active enrollments in the section, in enrollment order.
    fn list_section_scores(&self, section_id: SectionId) -> RepoResult<Vec<SectionScore>>;
}

/// SQLite-backed grade store.
pub struct SqliteGradeStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGradeStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["grades", "enrollments"])?;
        Ok(Self { conn })
    }
}

impl GradeStore for SqliteGradeStore<'_> {
    fn get_grade(&self, enrollment_id: EnrollmentId) -> RepoResult<Option<GradeRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GRADE_SELECT_SQL} WHERE enrollment_id = ?1;"))?;
        let row = stmt
            .query_row([enrollment_id.to_string()], |row| Ok(parse_grade_row(row)))
            .optional()?;
        row.transpose()
    }

    fn insert_grade(
        &self,
        enrollment_id: EnrollmentId,
        components: &GradeComponents,
        result: &GradeResult,
        submitted_by: TeacherId,
    ) -> RepoResult<GradeRecord> {
        self.conn
            .execute(
                "INSERT INTO grades (
                    enrollment_id,
                    exam1,
                    exam2,
                    final_exam,
                    project,
                    score,
                    letter,
                    submitted_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    enrollment_id.to_string(),
                    components.exam1.map(decimal_to_db),
                    components.exam2.map(decimal_to_db),
                    components.final_exam.map(decimal_to_db),
                    components.project.map(decimal_to_db),
                    decimal_to_db(result.score),
                    result.letter.as_str(),
                    submitted_by.to_string(),
                ],
            )
            .map_err(|err| map_unique_violation(err, GRADE_PRIMARY_KEY))?;

        self.get_grade(enrollment_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("grade for {enrollment_id} missing after insert"))
        })
    }

    fn update_grade(
        &self,
        enrollment_id: EnrollmentId,
        components: &GradeComponents,
        result: &GradeResult,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE grades
             SET
                exam1 = ?2,
                exam2 = ?3,
                final_exam = ?4,
                project = ?5,
                score = ?6,
                letter = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE enrollment_id = ?1;",
            params![
                enrollment_id.to_string(),
                components.exam1.map(decimal_to_db),
                components.exam2.map(decimal_to_db),
                components.final_exam.map(decimal_to_db),
                components.project.map(decimal_to_db),
                decimal_to_db(result.score),
                result.letter.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn list_section_scores(&self, section_id: SectionId) -> RepoResult<Vec<SectionScore>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.enrollment_id AS enrollment_id, g.score AS score
             FROM grades g
             INNER JOIN enrollments e ON e.id = g.enrollment_id
             WHERE e.section_id = ?1
               AND e.status = 'active'
             ORDER BY e.enrolled_at ASC, e.rowid ASC;",
        )?;
        let mut rows = stmt.query([section_id.to_string()])?;
        let mut scores = Vec::new();
        while let Some(row) = rows.next()? {
            let enrollment_text: String = row.get("enrollment_id")?;
            let score_text: String = row.get("score")?;
            scores.push(SectionScore {
                enrollment_id: parse_uuid(&enrollment_text, "grades.enrollment_id")?,
                score: parse_decimal(&score_text, "grades.score")?,
            });
        }
        Ok(scores)
    }
}

fn parse_grade_row(row: &Row<'_>) -> RepoResult<GradeRecord> {
    let enrollment_text: String = row.get("enrollment_id")?;
    let submitted_text: String = row.get("submitted_by")?;
    let score_text: String = row.get("score")?;

    let letter_text: String = row.get("letter")?;
    let letter = LetterGrade::parse(&letter_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid letter `{letter_text}` in grades.letter"))
    })?;

    let components = GradeComponents {
        exam1: parse_optional_decimal(row, "exam1")?,
        exam2: parse_optional_decimal(row, "exam2")?,
        final_exam: parse_optional_decimal(row, "final_exam")?,
        project: parse_optional_decimal(row, "project")?,
    };

    Ok(GradeRecord {
        enrollment_id: parse_uuid(&enrollment_text, "grades.enrollment_id")?,
        components,
        result: GradeResult {
            score: parse_decimal(&score_text, "grades.score")?,
            letter,
        },
        submitted_by: parse_uuid(&submitted_text, "grades.submitted_by")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_optional_decimal(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Decimal>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_decimal(&value, column))
        .transpose()
}

fn parse_decimal(value: &str, column: &'static str) -> RepoResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid decimal `{value}` in {column}")))
}

fn decimal_to_db(value: Decimal) -> String {
    value.to_string()
}
