//! Kernel use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into the enroll/drop, attendance and grading
//!   entry points the API layer invokes.
//! - Own transaction boundaries; stores never commit on their own.

pub mod attendance_service;
pub mod enrollment_service;
pub mod grade_service;
