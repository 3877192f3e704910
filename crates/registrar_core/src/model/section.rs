//! Course section model and the seat-capacity predicate.
//!
//! # Responsibility
//! - Represent one scheduled offering with its seat counter and version.
//! - Decide whether a section snapshot can admit one more student.
//!
//! # Invariants
//! - `0 <= current_enrollment_count <= capacity` for every persisted row.
//! - `version` advances on every mutation of the section row.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SectionId = Uuid;

/// Catalog term code, e.g. `2026-fall`.
pub type TermId = String;

/// Opaque optimistic-concurrency marker for a section row.
pub type VersionToken = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Open,
    Closed,
    Cancelled,
}

/// Snapshot of a section row as read at the start of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSection {
    pub id: SectionId,
    pub course_code: String,
    pub term_id: TermId,
    pub capacity: u32,
    pub current_enrollment_count: u32,
    pub status: SectionStatus,
    /// Compared-and-swapped by every write to this row.
    pub version: VersionToken,
}

impl CourseSection {
    /// Seats still available according to this snapshot.
    pub fn open_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.current_enrollment_count)
    }

    pub fn has_capacity(&self) -> bool {
        has_capacity(self)
    }
}

/// Returns true iff the snapshot is open and below capacity.
///
/// This is a pure predicate over the snapshot the caller supplies; it says
/// nothing about freshness. The enrollment coordinator re-checks the same
/// condition inside its version-guarded write.
pub fn has_capacity(section: &CourseSection) -> bool {
    section.status == SectionStatus::Open && section.current_enrollment_count < section.capacity
}

/// Input for registering a section with the catalog tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub course_code: String,
    pub term_id: TermId,
    pub capacity: u32,
}

impl NewSection {
    pub fn new(course_code: impl Into<String>, term_id: impl Into<TermId>, capacity: u32) -> Self {
        Self {
            course_code: course_code.into(),
            term_id: term_id.into(),
            capacity,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity == 0 {
            return Err(ValidationError::InvalidCapacity(self.capacity));
        }
        if self.course_code.trim().is_empty() {
            return Err(ValidationError::EmptyField("course_code"));
        }
        if self.term_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("term_id"));
        }
        Ok(())
    }
}
