//! Error taxonomy surfaced by the enrollment and grading kernel.
//!
//! # Responsibility
//! - Give the API layer a closed set of failure kinds to map onto its own
//!   status codes and messages.
//! - Keep storage failures wrapped, never flattened into strings.
//!
//! # Invariants
//! - Only `Conflict(ConflictKind::ConcurrentUpdate)` is retryable; the
//!   coordinator has already exhausted its own retries when it returns it.
//! - Display strings are diagnostic, not user-facing copy.

use crate::model::attendance::AttendanceId;
use crate::model::enrollment::{EnrollmentId, StudentId};
use crate::model::grade::{GradeComponent, TeacherId};
use crate::model::section::{SectionId, SectionStatus};
use crate::repo::RepoError;
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Student(StudentId),
    Section(SectionId),
    Enrollment(EnrollmentId),
    /// No enrollment of any status exists for the pair.
    StudentSection {
        student_id: StudentId,
        section_id: SectionId,
    },
    Grade(EnrollmentId),
    Attendance(AttendanceId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student(id) => write!(f, "student {id}"),
            Self::Section(id) => write!(f, "section {id}"),
            Self::Enrollment(id) => write!(f, "enrollment {id}"),
            Self::StudentSection {
                student_id,
                section_id,
            } => write!(f, "enrollment of student {student_id} in section {section_id}"),
            Self::Grade(id) => write!(f, "grade for enrollment {id}"),
            Self::Attendance(id) => write!(f, "attendance record {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    AlreadyEnrolled,
    SectionFull,
    /// Section is closed or cancelled; seats do not matter.
    SectionNotOpen(SectionStatus),
    /// The version-guarded write kept losing to concurrent writers.
    ConcurrentUpdate { attempts: u32 },
    AlreadyDropped,
    AttendanceAlreadyRecorded,
    GradeAlreadySubmitted,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyEnrolled => f.write_str("student already has an active enrollment"),
            Self::SectionFull => f.write_str("section has no free seats"),
            Self::SectionNotOpen(status) => write!(f, "section is not open: {status:?}"),
            Self::ConcurrentUpdate { attempts } => {
                write!(f, "concurrent update persisted after {attempts} attempts")
            }
            Self::AlreadyDropped => f.write_str("enrollment already dropped"),
            Self::AttendanceAlreadyRecorded => {
                f.write_str("attendance already recorded for this week and day")
            }
            Self::GradeAlreadySubmitted => f.write_str("grade already submitted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    ScoreOutOfRange {
        component: GradeComponent,
        value: Decimal,
    },
    /// A persisted grade needs at least one component.
    NoComponents,
    InvalidCapacity(u32),
    InvalidWeek(u32),
    EmptyField(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScoreOutOfRange { component, value } => write!(
                f,
                "{} score {value} is outside 0..=100",
                component.as_str()
            ),
            Self::NoComponents => f.write_str("at least one grade component is required"),
            Self::InvalidCapacity(value) => write!(f, "capacity must be positive, got {value}"),
            Self::InvalidWeek(value) => write!(f, "week must be at least 1, got {value}"),
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
        }
    }
}

impl Error for ValidationError {}

#[derive(Debug)]
pub enum CoreError {
    NotFound(EntityRef),
    Conflict(ConflictKind),
    Validation(ValidationError),
    /// Caller does not own the resource it tried to mutate.
    Forbidden {
        enrollment_id: EnrollmentId,
        requested_by: TeacherId,
    },
    Repo(RepoError),
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(ConflictKind::ConcurrentUpdate { .. })
        )
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "not found: {entity}"),
            Self::Conflict(kind) => write!(f, "conflict: {kind}"),
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Forbidden {
                enrollment_id,
                requested_by,
            } => write!(
                f,
                "teacher {requested_by} may not modify grade for enrollment {enrollment_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) | Self::Forbidden { .. } => None,
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConflictKind> for CoreError {
    fn from(value: ConflictKind) -> Self {
        Self::Conflict(value)
    }
}
