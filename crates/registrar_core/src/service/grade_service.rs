//! Grade submission, regrade and curve preview.
//!
//! # Responsibility
//! - Persist grade components together with the result derived from them.
//! - Restrict regrades to the teacher who submitted the grade.
//! - Preview a section's bell-curve letters without persisting them.
//!
//! # Invariants
//! - The stored score/letter always equal `compute_grade(stored components)`.
//! - Curve previews never overwrite the fixed-threshold letters.

use crate::error::{ConflictKind, CoreError, CoreResult, EntityRef, ValidationError};
use crate::grading::aggregate::compute_grade;
use crate::grading::curve::rank_cohort;
use crate::model::enrollment::EnrollmentId;
use crate::model::grade::{GradeComponents, GradeRecord, GradeResult, LetterGrade, TeacherId};
use crate::model::section::SectionId;
use crate::repo::enrollment_repo::EnrollmentStore;
use crate::repo::grade_repo::GradeStore;
use crate::repo::RepoError;
use log::info;
use rust_decimal::Decimal;

/// One row of a curve preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePreviewEntry {
    pub enrollment_id: EnrollmentId,
    pub score: Decimal,
    pub curved_letter: LetterGrade,
}

/// Use-case service for grade records.
pub struct GradeService<G: GradeStore, E: EnrollmentStore> {
    grades: G,
    enrollments: E,
}

impl<G: GradeStore, E: EnrollmentStore> GradeService<G, E> {
    pub fn new(grades: G, enrollments: E) -> Self {
        Self {
            grades,
            enrollments,
        }
    }

    /// Records the first grade for an enrollment.
    ///
    /// # Errors
    /// - `Validation` when no component is present or one is out of range.
    /// - `NotFound` for an unknown enrollment.
    /// - `Conflict::GradeAlreadySubmitted` when a grade exists; use `regrade`.
    pub fn submit_grade(
        &self,
        enrollment_id: EnrollmentId,
        teacher_id: TeacherId,
        components: &GradeComponents,
    ) -> CoreResult<GradeRecord> {
        let result = derive_result(components)?;
        if self.enrollments.get_enrollment(enrollment_id)?.is_none() {
            return Err(CoreError::NotFound(EntityRef::Enrollment(enrollment_id)));
        }
        if self.grades.get_grade(enrollment_id)?.is_some() {
            return Err(ConflictKind::GradeAlreadySubmitted.into());
        }

        let record = match self
            .grades
            .insert_grade(enrollment_id, components, &result, teacher_id)
        {
            Ok(record) => record,
            Err(RepoError::UniqueViolation(_)) => {
                return Err(ConflictKind::GradeAlreadySubmitted.into())
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            "event=grade_submit module=grading status=ok enrollment_id={}",
            enrollment_id
        );
        Ok(record)
    }

    /// Replaces the components of an existing grade and re-derives it.
    ///
    /// # Errors
    /// - `NotFound` when no grade exists for the enrollment.
    /// - `Forbidden` when `teacher_id` did not submit the grade.
    /// - `Validation` for missing or out-of-range components.
    pub fn regrade(
        &self,
        enrollment_id: EnrollmentId,
        teacher_id: TeacherId,
        components: &GradeComponents,
    ) -> CoreResult<GradeRecord> {
        let existing = self.get_grade(enrollment_id)?;
        if existing.submitted_by != teacher_id {
            return Err(CoreError::Forbidden {
                enrollment_id,
                requested_by: teacher_id,
            });
        }

        let result = derive_result(components)?;
        if !self.grades.update_grade(enrollment_id, components, &result)? {
            return Err(CoreError::NotFound(EntityRef::Grade(enrollment_id)));
        }

        info!(
            "event=grade_regrade module=grading status=ok enrollment_id={}",
            enrollment_id
        );
        self.get_grade(enrollment_id)
    }

    pub fn get_grade(&self, enrollment_id: EnrollmentId) -> CoreResult<GradeRecord> {
        self.grades
            .get_grade(enrollment_id)?
            .ok_or(CoreError::NotFound(EntityRef::Grade(enrollment_id)))
    }

    /// Re-derives the cached result from stored components and rewrites the
    /// cache when it drifted.
    pub fn rederive(&self, enrollment_id: EnrollmentId) -> CoreResult<GradeResult> {
        let record = self.get_grade(enrollment_id)?;
        let result = compute_grade(&record.components)?;
        if result != record.result {
            self.grades
                .update_grade(enrollment_id, &record.components, &result)?;
            info!(
                "event=grade_rederive module=grading status=rewritten enrollment_id={}",
                enrollment_id
            );
        }
        Ok(result)
    }

    /// Ranks the section's active, graded enrollments on the bell curve.
    pub fn preview_curve(&self, section_id: SectionId) -> CoreResult<Vec<CurvePreviewEntry>> {
        let scores = self.grades.list_section_scores(section_id)?;
        let values: Vec<Decimal> = scores.iter().map(|entry| entry.score).collect();
        let letters = rank_cohort(&values);

        Ok(scores
            .into_iter()
            .zip(letters)
            .map(|(entry, curved_letter)| CurvePreviewEntry {
                enrollment_id: entry.enrollment_id,
                score: entry.score,
                curved_letter,
            })
            .collect())
    }
}

fn derive_result(components: &GradeComponents) -> Result<GradeResult, ValidationError> {
    if components.is_empty() {
        return Err(ValidationError::NoComponents);
    }
    compute_grade(components)
}
