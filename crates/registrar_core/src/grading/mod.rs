//! Pure grade derivation: weighted aggregation and curve ranking.
//!
//! # Responsibility
//! - Derive a `GradeResult` from `GradeComponents` deterministically.
//! - Rank a cohort into percentile letter bands for curve previews.
//!
//! # Invariants
//! - No function here touches storage or shared state.
//! - Decimal arithmetic only; results are reproducible bit-for-bit.

pub mod aggregate;
pub mod curve;
