//! Performance over time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{group_by, Column, Measure};
use crate::error::PipelineError;
use crate::model::{AnswerRecord, StudentId, Subject};
use crate::performance::performance_by;

/// A student's score on one concept in one test administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub test_id: String,
    pub test_date: NaiveDate,
    pub concept: String,
    pub score: f64,
}

/// Class-wide correctness for one subject on one test date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTrend {
    pub subject: Subject,
    pub test_date: NaiveDate,
    pub num_answers: usize,
    pub avg_score: f64,
}

/// Scores of `student` on each of `concepts`, per test, in date order.
///
/// Every record in scope must carry a test date.
pub fn concept_trends(
    records: &[AnswerRecord],
    student: StudentId,
    concepts: &[String],
) -> Result<Vec<TrendPoint>, PipelineError> {
    let scope = records
        .iter()
        .filter(|r| r.student_id == student)
        .filter(|r| concepts.contains(&r.concept));

    let perf = performance_by(scope, &[Column::TestId, Column::TestDate, Column::Concept], 0.5)?;
    let mut points = perf
        .into_iter()
        .map(|p| {
            let missing = |column| PipelineError::MissingColumn { column };
            Ok(TrendPoint {
                test_id: p.key.text(Column::TestId).ok_or(missing(Column::TestId))?.to_string(),
                test_date: p.key.test_date().ok_or(missing(Column::TestDate))?,
                concept: p.key.concept().ok_or(missing(Column::Concept))?.to_string(),
                score: p.score,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    points.sort_by(|a, b| {
        a.test_date
            .cmp(&b.test_date)
            .then_with(|| a.concept.cmp(&b.concept))
            .then_with(|| a.test_id.cmp(&b.test_id))
    });
    Ok(points)
}

/// Class average correctness per subject per test date.
pub fn subject_trends(records: &[AnswerRecord]) -> Result<Vec<SubjectTrend>, PipelineError> {
    group_by(records, &[Column::Subject, Column::TestDate], Measure::Correct)?
        .into_iter()
        .map(|g| {
            Ok(SubjectTrend {
                subject: g.key.subject().ok_or(PipelineError::MissingColumn {
                    column: Column::Subject,
                })?,
                test_date: g.key.test_date().ok_or(PipelineError::MissingColumn {
                    column: Column::TestDate,
                })?,
                num_answers: g.count,
                avg_score: g.mean,
            })
        })
        .collect()
}
