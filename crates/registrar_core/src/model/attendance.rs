//! Attendance record model.
//!
//! # Invariants
//! - At most one record per `(enrollment_id, week, day)`; a missing day is
//!   its own key value, distinct from every weekday.
//! - `week` starts at 1.

use crate::model::enrollment::EnrollmentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AttendanceId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

/// Uniqueness key of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttendanceKey {
    pub enrollment_id: EnrollmentId,
    pub week: u32,
    pub day: Option<DayOfWeek>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub enrollment_id: EnrollmentId,
    pub week: u32,
    pub day: Option<DayOfWeek>,
    pub status: AttendanceStatus,
    /// Unix epoch milliseconds.
    pub recorded_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl AttendanceRecord {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            enrollment_id: self.enrollment_id,
            week: self.week,
            day: self.day,
        }
    }
}
