//! Detail tables: one student's scores by concept and difficulty, and the
//! class's most-missed concepts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{group_by, Column, KeyValue, Measure};
use crate::error::PipelineError;
use crate::model::{AnswerRecord, Difficulty, StudentId, Subject};
use crate::performance::{performance_by, DEFAULT_PASSING_THRESHOLD};

/// One student's performance on one concept at one difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub subject: Subject,
    pub concept: String,
    pub difficulty: Difficulty,
    pub num_questions: usize,
    pub num_correct: usize,
    pub num_wrong: usize,
    pub score: f64,
}

/// Wrong answers of one student on one concept, with the average number of
/// concept tags on the questions involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedConcept {
    pub subject: Subject,
    pub concept: String,
    pub student_id: StudentId,
    pub num_questions: usize,
    pub num_wrong: usize,
    /// Mean concept tags per question on this concept, class-wide.
    pub mean_num_concepts: f64,
}

/// Scores of `student` by subject, concept, and difficulty.
///
/// Subjects are listed in descending name order.
pub fn concept_breakdown(
    records: &[AnswerRecord],
    student: StudentId,
    test_id: Option<&str>,
) -> Result<Vec<BreakdownRow>, PipelineError> {
    let scope = records
        .iter()
        .filter(|r| r.student_id == student)
        .filter(|r| test_id.map_or(true, |t| r.test_id == t));

    let perf = performance_by(
        scope,
        &[Column::Subject, Column::Concept, Column::Difficulty],
        DEFAULT_PASSING_THRESHOLD,
    )?;

    let mut rows = perf
        .into_iter()
        .map(|p| {
            let (subject, concept) = p.key.subject_concept()?;
            let difficulty = match p.key.get(Column::Difficulty) {
                Some(KeyValue::Difficulty(d)) => *d,
                _ => {
                    return Err(PipelineError::MissingColumn {
                        column: Column::Difficulty,
                    })
                }
            };
            Ok(BreakdownRow {
                subject,
                concept,
                difficulty,
                num_questions: p.num_questions,
                num_correct: p.num_correct,
                num_wrong: p.num_wrong,
                score: p.score,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    // stable: key order is kept within a subject
    rows.sort_by(|a, b| b.subject.to_string().cmp(&a.subject.to_string()));
    Ok(rows)
}

/// Per-student wrong counts for every concept, most wrong first, optionally
/// restricted to one subject.
pub fn most_missed_concepts(
    records: &[AnswerRecord],
    subject: Option<Subject>,
) -> Result<Vec<MissedConcept>, PipelineError> {
    let scope: Vec<&AnswerRecord> = records
        .iter()
        .filter(|r| subject.map_or(true, |s| r.subject == s))
        .collect();

    // concept tag density is taken over the whole batch
    let density: HashMap<String, f64> = group_by(records, &[Column::Concept], Measure::NumConcepts)?
        .into_iter()
        .filter_map(|g| g.key.concept().map(|c| (c.to_string(), g.mean)))
        .collect();

    let perf = performance_by(
        scope,
        &[Column::Subject, Column::Concept, Column::StudentId],
        DEFAULT_PASSING_THRESHOLD,
    )?;

    let mut rows = perf
        .into_iter()
        .map(|p| {
            let (subject, concept) = p.key.subject_concept()?;
            let student_id = p.key.student_id().ok_or(PipelineError::MissingColumn {
                column: Column::StudentId,
            })?;
            let mean_num_concepts = density.get(&concept).copied().unwrap_or(1.0);
            Ok(MissedConcept {
                subject,
                concept,
                student_id,
                num_questions: p.num_questions,
                num_wrong: p.num_wrong,
                mean_num_concepts,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    rows.sort_by(|a, b| b.num_wrong.cmp(&a.num_wrong));
    Ok(rows)
}
