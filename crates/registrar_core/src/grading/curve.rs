//! Percentile bell-curve ranking for grade previews.
//!
//! Sorted descending, a cohort of `n` scores is cut at `ceil(n * p)` for
//! p = 10%, 30%, 60%, 85%: ranks before the first cut get `A`, then `B`,
//! `C`, `D`, and the remainder `F`.
//!
//! Cuts fall on rank, not value: equal scores that straddle a cut receive
//! different letters, and the earlier input wins the better one.

use crate::model::grade::LetterGrade;
use rust_decimal::Decimal;
use std::cmp::Reverse;

/// Cumulative percentile ceilings in whole percent, paired with their band.
const CURVE_BANDS: [(usize, LetterGrade); 4] = [
    (10, LetterGrade::A),
    (30, LetterGrade::B),
    (60, LetterGrade::C),
    (85, LetterGrade::D),
];

/// Ranks a cohort and returns one letter per input score, in input order.
pub fn rank_cohort(scores: &[Decimal]) -> Vec<LetterGrade> {
    let cohort_size = scores.len();
    let mut order: Vec<usize> = (0..cohort_size).collect();
    // Stable sort keeps input order among equal scores.
    order.sort_by_key(|&index| Reverse(scores[index]));

    let cuts = band_cuts(cohort_size);
    let mut letters = vec![LetterGrade::F; cohort_size];
    for (rank, index) in order.into_iter().enumerate() {
        letters[index] = letter_for_rank(rank, &cuts);
    }
    letters
}

/// Exclusive rank boundaries for each band, `ceil(size * percent / 100)`.
fn band_cuts(cohort_size: usize) -> [(usize, LetterGrade); 4] {
    CURVE_BANDS.map(|(percent, letter)| ((cohort_size * percent).div_ceil(100), letter))
}

fn letter_for_rank(rank: usize, cuts: &[(usize, LetterGrade); 4]) -> LetterGrade {
    cuts.iter()
        .find(|(cut, _)| rank < *cut)
        .map_or(LetterGrade::F, |(_, letter)| *letter)
}
