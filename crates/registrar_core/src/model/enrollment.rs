//! Enrollment model.
//!
//! # Invariants
//! - At most one `Active` enrollment per `(student_id, section_id, term_id)`.
//! - Re-enrolling after a drop creates a new record; dropped rows are kept
//!   as history and never flipped back to `Active`.
//! - `dropped_at` is set iff `status == Dropped`.

use crate::model::section::{SectionId, TermId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EnrollmentId = Uuid;

/// Identity resolved by the surrounding account subsystem.
pub type StudentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub section_id: SectionId,
    pub term_id: TermId,
    pub status: EnrollmentStatus,
    /// Unix epoch milliseconds.
    pub enrolled_at: i64,
    /// Unix epoch milliseconds, present once dropped.
    pub dropped_at: Option<i64>,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }
}

/// Result handed back to the API layer after a successful enroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentReceipt {
    pub enrollment_id: EnrollmentId,
    pub status: EnrollmentStatus,
}

/// Counter and row-count view of one section, used to audit the seat counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOccupancy {
    pub capacity: u32,
    pub current_enrollment_count: u32,
    pub active_enrollments: u32,
}

impl SectionOccupancy {
    /// True when the persisted counter agrees with the active rows and
    /// stays within `0..=capacity`.
    pub fn is_consistent(&self) -> bool {
        self.current_enrollment_count == self.active_enrollments
            && self.current_enrollment_count <= self.capacity
    }
}
