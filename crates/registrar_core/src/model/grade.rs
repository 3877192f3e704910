//! Grade components, derived results and the letter scale.
//!
//! # Invariants
//! - Every present component lies in `0..=100`.
//! - `GradeResult` is always derived from `GradeComponents`; persisted
//!   results are a cache of that derivation.

use crate::error::ValidationError;
use crate::model::enrollment::EnrollmentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identity of the teacher who submitted a grade.
pub type TeacherId = Uuid;

/// Letter scale shared by fixed-threshold banding and curve previews.
///
/// Variants are ordered best-first, so `LetterGrade::A < LetterGrade::F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 10] = [
        Self::A,
        Self::AMinus,
        Self::BPlus,
        Self::B,
        Self::BMinus,
        Self::CPlus,
        Self::C,
        Self::CMinus,
        Self::D,
        Self::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::D => "D",
            Self::F => "F",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|letter| letter.as_str() == value)
    }
}

impl Display for LetterGrade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named grade component, used for weights and validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeComponent {
    Exam1,
    Exam2,
    FinalExam,
    Project,
}

impl GradeComponent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exam1 => "exam1",
            Self::Exam2 => "exam2",
            Self::FinalExam => "final",
            Self::Project => "project",
        }
    }
}

/// Raw per-student scores; any component may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeComponents {
    pub exam1: Option<Decimal>,
    pub exam2: Option<Decimal>,
    #[serde(rename = "final")]
    pub final_exam: Option<Decimal>,
    pub project: Option<Decimal>,
}

impl GradeComponents {
    /// Iterates present components in declaration order.
    pub fn present(&self) -> impl Iterator<Item = (GradeComponent, Decimal)> {
        [
            (GradeComponent::Exam1, self.exam1),
            (GradeComponent::Exam2, self.exam2),
            (GradeComponent::FinalExam, self.final_exam),
            (GradeComponent::Project, self.project),
        ]
        .into_iter()
        .filter_map(|(component, value)| value.map(|value| (component, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Rejects any present component outside `0..=100`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (component, value) in self.present() {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(ValidationError::ScoreOutOfRange { component, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeResult {
    /// Two-decimal score in `0.00..=100.00`.
    pub score: Decimal,
    pub letter: LetterGrade,
}

/// Persisted grade row: components, cached result and ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub enrollment_id: EnrollmentId,
    pub components: GradeComponents,
    pub result: GradeResult,
    pub submitted_by: TeacherId,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}
