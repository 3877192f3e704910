//! Enrollment transaction coordinator.
//!
//! # Responsibility
//! - Run enroll/drop as all-or-nothing units: the enrollment row change and
//!   the section seat counter change commit together or not at all.
//! - Detect lost updates on the section row through its version token and
//!   retry the whole operation, up to `EnrollmentPolicy::max_attempts`.
//!
//! # Invariants
//! - `0 <= current_enrollment_count <= capacity` after every commit, and the
//!   counter equals the number of active enrollments in the section.
//! - Validation reads happen outside the write transaction; the write itself
//!   only applies against the exact section version that was validated.
//! - Only version contention is retried. Every other failure is returned on
//!   the attempt that produced it.

use crate::config::EnrollmentPolicy;
use crate::error::{ConflictKind, CoreError, CoreResult, EntityRef};
use crate::model::enrollment::{
    Enrollment, EnrollmentId, EnrollmentReceipt, SectionOccupancy, StudentId,
};
use crate::model::section::{has_capacity, CourseSection, SectionId, SectionStatus};
use crate::repo::enrollment_repo::{EnrollmentStore, SqliteEnrollmentStore};
use crate::repo::section_repo::{SeatAdjustment, SectionStore, SqliteSectionStore};
use crate::repo::student_repo::{SqliteStudentStore, StudentStore};
use crate::repo::RepoError;
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Outcome of one optimistic attempt.
enum Attempt<T> {
    Done(T),
    /// The guarded write lost to a concurrent writer; the attempt rolled back.
    Contended,
}

/// Coordinates enroll/drop against one connection.
///
/// Stores must operate on the same connection passed as `conn`, so their
/// writes land inside the coordinator's transaction.
pub struct EnrollmentCoordinator<'conn, S, P, E> {
    conn: &'conn Connection,
    sections: S,
    students: P,
    enrollments: E,
    policy: EnrollmentPolicy,
}

impl<'conn>
    EnrollmentCoordinator<
        'conn,
        SqliteSectionStore<'conn>,
        SqliteStudentStore<'conn>,
        SqliteEnrollmentStore<'conn>,
    >
{
    /// Creates a coordinator backed by SQLite stores on `conn`.
    pub fn try_new(conn: &'conn Connection, policy: EnrollmentPolicy) -> CoreResult<Self> {
        Ok(Self::with_stores(
            conn,
            SqliteSectionStore::try_new(conn)?,
            SqliteStudentStore::try_new(conn)?,
            SqliteEnrollmentStore::try_new(conn)?,
            policy,
        ))
    }
}

impl<'conn, S, P, E> EnrollmentCoordinator<'conn, S, P, E>
where
    S: SectionStore,
    P: StudentStore,
    E: EnrollmentStore,
{
    pub fn with_stores(
        conn: &'conn Connection,
        sections: S,
        students: P,
        enrollments: E,
        policy: EnrollmentPolicy,
    ) -> Self {
        Self {
            conn,
            sections,
            students,
            enrollments,
            policy: EnrollmentPolicy::with_max_attempts(policy.max_attempts),
        }
    }

    /// Enrolls a student into a section for the section's term.
    ///
    /// # Errors
    /// - `NotFound` for an unknown section or student.
    /// - `Conflict::AlreadyEnrolled` when an active enrollment exists.
    /// - `Conflict::SectionNotOpen` / `Conflict::SectionFull` when the
    ///   section cannot admit another student.
    /// - `Conflict::ConcurrentUpdate` when every attempt lost the version race.
    pub fn enroll(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> CoreResult<EnrollmentReceipt> {
        let started_at = Instant::now();
        let result = self.with_retry("enroll", section_id, || {
            self.try_enroll(student_id, section_id)
        });

        match &result {
            Ok(receipt) => info!(
                "event=enroll module=enrollment status=ok section_id={} enrollment_id={} duration_ms={}",
                section_id,
                receipt.enrollment_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => debug!(
                "event=enroll module=enrollment status=rejected section_id={} duration_ms={} reason={}",
                section_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Drops the student's active enrollment in a section.
    ///
    /// A second drop of the same enrollment is reported as
    /// `Conflict::AlreadyDropped`, never as success.
    ///
    /// # Errors
    /// - `NotFound` when the student never enrolled in the section.
    /// - `Conflict::AlreadyDropped` when no active enrollment remains.
    /// - `Conflict::ConcurrentUpdate` when every attempt lost the version race.
    pub fn drop_enrollment(&self, student_id: StudentId, section_id: SectionId) -> CoreResult<()> {
        let started_at = Instant::now();
        let result = self.with_retry("drop", section_id, || {
            self.try_drop(student_id, section_id)
        });

        match &result {
            Ok(enrollment_id) => info!(
                "event=drop module=enrollment status=ok section_id={} enrollment_id={} duration_ms={}",
                section_id,
                enrollment_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => debug!(
                "event=drop module=enrollment status=rejected section_id={} duration_ms={} reason={}",
                section_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result.map(|_| ())
    }

    /// Reports the seat counter next to the number of active rows.
    pub fn section_occupancy(&self, section_id: SectionId) -> CoreResult<SectionOccupancy> {
        // Both reads come from one snapshot.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let section = self.load_section(section_id)?;
        let active_enrollments = self.enrollments.count_active(section_id)?;
        tx.commit()?;
        Ok(SectionOccupancy {
            capacity: section.capacity,
            current_enrollment_count: section.current_enrollment_count,
            active_enrollments,
        })
    }

    pub fn get_enrollment(&self, enrollment_id: EnrollmentId) -> CoreResult<Enrollment> {
        self.enrollments
            .get_enrollment(enrollment_id)?
            .ok_or(CoreError::NotFound(EntityRef::Enrollment(enrollment_id)))
    }

    pub fn list_section_enrollments(
        &self,
        section_id: SectionId,
        include_dropped: bool,
    ) -> CoreResult<Vec<Enrollment>> {
        self.load_section(section_id)?;
        Ok(self
            .enrollments
            .list_for_section(section_id, include_dropped)?)
    }

    fn try_enroll(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> CoreResult<Attempt<EnrollmentReceipt>> {
        let section = self.load_section(section_id)?;
        if !self.students.student_exists(student_id)? {
            return Err(CoreError::NotFound(EntityRef::Student(student_id)));
        }
        if self
            .enrollments
            .find_active(student_id, section_id)?
            .is_some()
        {
            return Err(ConflictKind::AlreadyEnrolled.into());
        }
        if !has_capacity(&section) {
            return Err(admission_conflict(&section).into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let term_id = section.term_id.as_str();
        let enrollment = match self.enrollments.insert_active(student_id, section_id, term_id) {
            Ok(enrollment) => enrollment,
            // A concurrent enroll of the same student committed first.
            Err(RepoError::UniqueViolation(_)) => {
                tx.rollback()?;
                return Err(ConflictKind::AlreadyEnrolled.into());
            }
            Err(err) => return Err(err.into()),
        };

        if !self.sections.try_adjust_enrollment_count(
            section.id,
            section.version,
            SeatAdjustment::Reserve,
        )? {
            tx.rollback()?;
            return Ok(Attempt::Contended);
        }

        tx.commit()?;
        Ok(Attempt::Done(EnrollmentReceipt {
            enrollment_id: enrollment.id,
            status: enrollment.status,
        }))
    }

    fn try_drop(
        &self,
        student_id: StudentId,
        section_id: SectionId,
    ) -> CoreResult<Attempt<EnrollmentId>> {
        let Some(enrollment) = self.enrollments.find_active(student_id, section_id)? else {
            return Err(match self.enrollments.find_latest(student_id, section_id)? {
                Some(_) => ConflictKind::AlreadyDropped.into(),
                None => CoreError::NotFound(EntityRef::StudentSection {
                    student_id,
                    section_id,
                }),
            });
        };
        let section = self.load_section(enrollment.section_id)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        // A concurrent drop committed first; the row is no longer active.
        if !self.enrollments.mark_dropped(enrollment.id)? {
            tx.rollback()?;
            return Err(ConflictKind::AlreadyDropped.into());
        }
        if !self.sections.try_adjust_enrollment_count(
            section.id,
            section.version,
            SeatAdjustment::Release,
        )? {
            tx.rollback()?;
            return Ok(Attempt::Contended);
        }

        tx.commit()?;
        Ok(Attempt::Done(enrollment.id))
    }

    fn with_retry<T>(
        &self,
        operation: &'static str,
        section_id: SectionId,
        mut attempt: impl FnMut() -> CoreResult<Attempt<T>>,
    ) -> CoreResult<T> {
        let max_attempts = self.policy.max_attempts;
        for attempt_number in 1..=max_attempts {
            match attempt()? {
                Attempt::Done(value) => return Ok(value),
                Attempt::Contended => debug!(
                    "event={} module=enrollment status=retry section_id={} attempt={} max_attempts={}",
                    operation, section_id, attempt_number, max_attempts
                ),
            }
        }

        warn!(
            "event={} module=enrollment status=error error_code=concurrent_update section_id={} attempts={}",
            operation, section_id, max_attempts
        );
        Err(ConflictKind::ConcurrentUpdate {
            attempts: max_attempts,
        }
        .into())
    }

    fn load_section(&self, section_id: SectionId) -> CoreResult<CourseSection> {
        self.sections
            .get_section(section_id)?
            .ok_or(CoreError::NotFound(EntityRef::Section(section_id)))
    }
}

fn admission_conflict(section: &CourseSection) -> ConflictKind {
    match section.status {
        SectionStatus::Open => ConflictKind::SectionFull,
        other => ConflictKind::SectionNotOpen(other),
    }
}
