//! Weighted grade aggregation and fixed-threshold letter banding.
//!
//! # Invariants
//! - Weights are exam1 20%, exam2 20%, final 40%, project 20%.
//! - Only present components contribute; weights are not renormalized, so
//!   a partial set scores against a reduced ceiling.
//! - Scores are rounded to 2 dp, midpoint away from zero.

use crate::error::ValidationError;
use crate::model::grade::{GradeComponent, GradeComponents, GradeResult, LetterGrade};
use rust_decimal::{Decimal, RoundingStrategy};

const SCORE_DECIMAL_PLACES: u32 = 2;

/// Top-down threshold ladder, in whole points.
const LETTER_THRESHOLDS: [(i64, LetterGrade); 9] = [
    (90, LetterGrade::A),
    (85, LetterGrade::AMinus),
    (80, LetterGrade::BPlus),
    (75, LetterGrade::B),
    (70, LetterGrade::BMinus),
    (65, LetterGrade::CPlus),
    (60, LetterGrade::C),
    (55, LetterGrade::CMinus),
    (50, LetterGrade::D),
];

/// Fractional weight of one component.
pub fn component_weight(component: GradeComponent) -> Decimal {
    match component {
        GradeComponent::Exam1 | GradeComponent::Exam2 | GradeComponent::Project => {
            Decimal::new(20, 2)
        }
        GradeComponent::FinalExam => Decimal::new(40, 2),
    }
}

/// Computes the weighted score and letter for one student.
///
/// Returns a zero score (letter `F`) when no component is present.
///
/// # Errors
/// - `ValidationError::ScoreOutOfRange` when a present component is outside
///   `0..=100`.
pub fn compute_grade(components: &GradeComponents) -> Result<GradeResult, ValidationError> {
    components.validate()?;

    let raw: Decimal = components
        .present()
        .map(|(component, value)| value * component_weight(component))
        .sum();
    let score =
        raw.round_dp_with_strategy(SCORE_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);

    Ok(GradeResult {
        score,
        letter: letter_for_score(score),
    })
}

/// Maps a score onto the fixed letter ladder.
pub fn letter_for_score(score: Decimal) -> LetterGrade {
    LETTER_THRESHOLDS
        .iter()
        .find(|(threshold, _)| score >= Decimal::from(*threshold))
        .map_or(LetterGrade::F, |(_, letter)| *letter)
}
