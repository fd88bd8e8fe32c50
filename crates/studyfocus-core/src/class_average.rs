//! Class-wide baselines per concept.
//!
//! The class average is a mean of per-student scores: every student counts
//! once per concept regardless of how many questions they answered on it.
//! It is not the pooled correctness rate of all answers.

use serde::{Deserialize, Serialize};

use crate::aggregate::{group_by, Measure, Tabular};
use crate::error::PipelineError;
use crate::model::Subject;
use crate::performance::{performance_by, PerformanceRow, STUDENT_CONCEPT, SUBJECT_CONCEPT};

/// Class baseline for one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAverage {
    pub subject: Subject,
    pub concept: String,
    /// Students with at least one answer on the concept.
    pub num_students: usize,
    /// Mean of the students' own scores.
    pub class_avg: f64,
}

/// Share of students passing one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPassRate {
    pub subject: Subject,
    pub concept: String,
    pub num_students: usize,
    pub num_passed: usize,
    pub pct_passed: f64,
}

/// Per-student performance and per-concept class averages over `records`.
///
/// Returns both tables so callers can join a student's rows against the
/// baseline without recomputing them.
pub fn class_averages<I, R>(
    records: I,
    passing_threshold: f64,
) -> Result<(Vec<PerformanceRow>, Vec<ClassAverage>), PipelineError>
where
    I: IntoIterator<Item = R>,
    R: Tabular,
{
    let student_perf = performance_by(records, &STUDENT_CONCEPT, passing_threshold)?;
    let groups = group_by(&student_perf, &SUBJECT_CONCEPT, Measure::Score)?;

    let averages = groups
        .into_iter()
        .map(|g| {
            let (subject, concept) = g.key.subject_concept()?;
            Ok(ClassAverage {
                subject,
                concept,
                num_students: g.count,
                class_avg: g.mean,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    tracing::debug!(
        students_x_concepts = student_perf.len(),
        concepts = averages.len(),
        "computed class averages"
    );
    Ok((student_perf, averages))
}

/// Per-student performance and per-concept pass rates over `records`.
pub fn class_pass_rates<I, R>(
    records: I,
    passing_threshold: f64,
) -> Result<(Vec<PerformanceRow>, Vec<ClassPassRate>), PipelineError>
where
    I: IntoIterator<Item = R>,
    R: Tabular,
{
    let student_perf = performance_by(records, &STUDENT_CONCEPT, passing_threshold)?;
    let groups = group_by(&student_perf, &SUBJECT_CONCEPT, Measure::Passing)?;

    let rates = groups
        .into_iter()
        .map(|g| {
            let (subject, concept) = g.key.subject_concept()?;
            Ok(ClassPassRate {
                subject,
                concept,
                num_students: g.count,
                num_passed: g.sum.round() as usize,
                pct_passed: g.mean,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    Ok((student_perf, rates))
}
