//! Per-group performance: questions attempted, correct, wrong, score, and
//! whether the score clears a passing threshold.
//!
//! The same calculation serves individual and cohort analysis. Pass key
//! columns that include [`Column::StudentId`] for one row per student, or
//! leave it out to pool everyone.

use serde::{Deserialize, Serialize};

use crate::aggregate::{group_by, Column, GroupKey, KeyValue, Measure, Tabular};
use crate::error::PipelineError;

/// Default minimum score counted as passing.
pub const DEFAULT_PASSING_THRESHOLD: f64 = 0.5;

/// Key columns for one row per student per concept.
pub const STUDENT_CONCEPT: [Column; 3] = [Column::StudentId, Column::Subject, Column::Concept];

/// Key columns for one row per concept.
pub const SUBJECT_CONCEPT: [Column; 2] = [Column::Subject, Column::Concept];

/// Performance of one key combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub key: GroupKey,
    pub num_questions: usize,
    pub num_correct: usize,
    pub num_wrong: usize,
    /// Mean correctness, in `[0, 1]`.
    pub score: f64,
    pub passing: bool,
}

impl Tabular for PerformanceRow {
    fn key(&self, column: Column) -> Option<KeyValue> {
        self.key.get(column).cloned()
    }

    fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Count => Some(self.num_questions as f64),
            Measure::Sum => Some(self.num_correct as f64),
            Measure::Score | Measure::Mean => Some(self.score),
            Measure::Passing => Some(if self.passing { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Compute performance rows grouped by `columns`.
///
/// `passing` is set when `score >= passing_threshold`.
pub fn performance_by<I, R>(
    rows: I,
    columns: &[Column],
    passing_threshold: f64,
) -> Result<Vec<PerformanceRow>, PipelineError>
where
    I: IntoIterator<Item = R>,
    R: Tabular,
{
    let groups = group_by(rows, columns, Measure::Correct)?;
    Ok(groups
        .into_iter()
        .map(|g| {
            // correctness is 0/1, so the sum is an exact integer
            let num_correct = g.sum.round() as usize;
            PerformanceRow {
                key: g.key,
                num_questions: g.count,
                num_correct,
                num_wrong: g.count - num_correct,
                score: g.mean,
                passing: g.mean >= passing_threshold,
            }
        })
        .collect())
}
