//! Attendance recording with per-slot uniqueness.
//!
//! # Responsibility
//! - Guard inserts so each `(enrollment, week, day)` slot holds one record.
//! - Allow in-place status corrections without re-checking uniqueness.
//!
//! # Invariants
//! - The pre-insert check is advisory under concurrency; the storage index
//!   is authoritative and its rejection maps to the same conflict.

use crate::error::{ConflictKind, CoreError, CoreResult, EntityRef, ValidationError};
use crate::model::attendance::{
    AttendanceId, AttendanceKey, AttendanceRecord, AttendanceStatus, DayOfWeek,
};
use crate::model::enrollment::EnrollmentId;
use crate::repo::attendance_repo::AttendanceStore;
use crate::repo::enrollment_repo::EnrollmentStore;
use crate::repo::RepoError;
use log::debug;

/// Use-case service for attendance records.
pub struct AttendanceService<A: AttendanceStore, E: EnrollmentStore> {
    attendance: A,
    enrollments: E,
}

impl<A: AttendanceStore, E: EnrollmentStore> AttendanceService<A, E> {
    pub fn new(attendance: A, enrollments: E) -> Self {
        Self {
            attendance,
            enrollments,
        }
    }

    /// True iff no record exists for the slot yet.
    pub fn can_record(
        &self,
        enrollment_id: EnrollmentId,
        week: u32,
        day: Option<DayOfWeek>,
    ) -> CoreResult<bool> {
        let key = AttendanceKey {
            enrollment_id,
            week,
            day,
        };
        Ok(self.attendance.find_record(&key)?.is_none())
    }

    /// Inserts a record for a new slot.
    ///
    /// # Errors
    /// - `Validation::InvalidWeek` when `week == 0`.
    /// - `NotFound` for an unknown enrollment.
    /// - `Conflict::AttendanceAlreadyRecorded` when the slot is taken.
    pub fn record_attendance(
        &self,
        enrollment_id: EnrollmentId,
        week: u32,
        day: Option<DayOfWeek>,
        status: AttendanceStatus,
    ) -> CoreResult<AttendanceRecord> {
        if week == 0 {
            return Err(ValidationError::InvalidWeek(week).into());
        }
        if self.enrollments.get_enrollment(enrollment_id)?.is_none() {
            return Err(CoreError::NotFound(EntityRef::Enrollment(enrollment_id)));
        }
        if !self.can_record(enrollment_id, week, day)? {
            return Err(ConflictKind::AttendanceAlreadyRecorded.into());
        }

        let key = AttendanceKey {
            enrollment_id,
            week,
            day,
        };
        match self.attendance.insert_record(&key, status) {
            Ok(record) => Ok(record),
            Err(RepoError::UniqueViolation(index)) => {
                debug!(
                    "event=attendance_record module=attendance status=conflict enrollment_id={} week={} index={}",
                    enrollment_id, week, index
                );
                Err(ConflictKind::AttendanceAlreadyRecorded.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Changes the status of an existing record in place.
    pub fn update_status(
        &self,
        record_id: AttendanceId,
        status: AttendanceStatus,
    ) -> CoreResult<AttendanceRecord> {
        if !self.attendance.update_status(record_id, status)? {
            return Err(CoreError::NotFound(EntityRef::Attendance(record_id)));
        }
        self.attendance
            .get_record(record_id)?
            .ok_or(CoreError::NotFound(EntityRef::Attendance(record_id)))
    }

    /// Lists an enrollment's records ordered by week, then day.
    pub fn list_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        if self.enrollments.get_enrollment(enrollment_id)?.is_none() {
            return Err(CoreError::NotFound(EntityRef::Enrollment(enrollment_id)));
        }
        Ok(self.attendance.list_for_enrollment(enrollment_id)?)
    }
}
