//! Enrollment capacity and grade-computation kernel for the registrar.
//! This crate is the single source of truth for seat and grading invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod grading;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{load_config, ConfigError, CoreConfig, EnrollmentPolicy, LoggingConfig};
pub use error::{ConflictKind, CoreError, CoreResult, EntityRef, ValidationError};
pub use grading::aggregate::{compute_grade, letter_for_score};
pub use grading::curve::rank_cohort;
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::attendance::{AttendanceId, AttendanceRecord, AttendanceStatus, DayOfWeek};
pub use model::enrollment::{
    Enrollment, EnrollmentId, EnrollmentReceipt, EnrollmentStatus, SectionOccupancy, StudentId,
};
pub use model::grade::{GradeComponents, GradeRecord, GradeResult, LetterGrade, TeacherId};
pub use model::section::{has_capacity, CourseSection, NewSection, SectionId, SectionStatus};
pub use repo::attendance_repo::{AttendanceStore, SqliteAttendanceStore};
pub use repo::enrollment_repo::{EnrollmentStore, SqliteEnrollmentStore};
pub use repo::grade_repo::{GradeStore, SqliteGradeStore};
pub use repo::section_repo::{SeatAdjustment, SectionStore, SqliteSectionStore};
pub use repo::student_repo::{SqliteStudentStore, StudentStore};
pub use repo::{RepoError, RepoResult};
pub use service::attendance_service::AttendanceService;
pub use service::enrollment_service::EnrollmentCoordinator;
pub use service::grade_service::{CurvePreviewEntry, GradeService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
