//! Domain model for sections, enrollments, attendance and grades.
//!
//! # Responsibility
//! - Define the records the enrollment and grading kernel reads and writes.
//! - Keep status sets closed: every lifecycle state is an enum variant.
//!
//! # Invariants
//! - Every record is identified by a stable UUID (terms use catalog codes).
//! - Enrollments are never deleted; drops are recorded as a status change.

pub mod attendance;
pub mod enrollment;
pub mod grade;
pub mod section;
