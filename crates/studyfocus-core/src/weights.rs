//! Concept weights: how much of a subject's question budget a concept
//! typically occupies on one test.
//!
//! For each student and test, count the questions tagged with each concept;
//! average those counts per concept; divide by the subject-wide sum of the
//! averages. Weights within a subject sum to 1.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::{group_by, Column, Measure};
use crate::error::PipelineError;
use crate::model::{AnswerRecord, Subject};

/// Tests left out of the weight computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    /// A test is excluded when its id contains any of these patterns.
    #[serde(default = "default_excluded_tests")]
    pub excluded_tests: Vec<String>,
}

fn default_excluded_tests() -> Vec<String> {
    // abbreviated "BB" forms, and one full test without concept tags
    vec!["BB".to_string(), "YL_6_PP_SAT_S0111".to_string()]
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            excluded_tests: default_excluded_tests(),
        }
    }
}

impl WeightConfig {
    /// A config that keeps every test.
    pub fn keep_all() -> Self {
        Self {
            excluded_tests: Vec::new(),
        }
    }

    pub fn excludes(&self, test_id: &str) -> bool {
        self.excluded_tests
            .iter()
            .any(|pattern| !pattern.is_empty() && test_id.contains(pattern.as_str()))
    }

    /// Distinct excluded test ids present in `records`, sorted.
    pub fn excluded_in<'a, I>(&self, records: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a AnswerRecord>,
    {
        records
            .into_iter()
            .filter(|r| self.excludes(&r.test_id))
            .map(|r| r.test_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }
}

/// Relative emphasis of one concept within its subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptWeight {
    pub subject: Subject,
    pub concept: String,
    /// Average questions per student-test tagged with the concept.
    pub mean_questions: f64,
    pub weight: f64,
}

/// Compute concept weights over `records`, skipping excluded tests.
///
/// Concepts with no retained records are absent from the output. Rows are
/// ordered by subject, then concept.
pub fn concept_weights<'a, I>(
    records: I,
    config: &WeightConfig,
) -> Result<Vec<ConceptWeight>, PipelineError>
where
    I: IntoIterator<Item = &'a AnswerRecord>,
{
    let mut excluded = 0usize;
    let retained: Vec<&AnswerRecord> = records
        .into_iter()
        .filter(|r| {
            let skip = config.excludes(&r.test_id);
            excluded += skip as usize;
            !skip
        })
        .collect();
    if excluded > 0 {
        tracing::debug!(excluded, "skipped rows from excluded tests for concept weights");
    }

    let per_student_test = group_by(
        retained.iter().copied(),
        &[Column::StudentId, Column::TestId, Column::Subject, Column::Concept],
        Measure::Correct,
    )?;
    let per_concept = group_by(
        &per_student_test,
        &[Column::Subject, Column::Concept],
        Measure::Count,
    )?;
    let per_subject = group_by(&per_concept, &[Column::Subject], Measure::Mean)?;

    let mut subject_mass: BTreeMap<Subject, f64> = BTreeMap::new();
    for g in &per_subject {
        let subject = g.key.subject().ok_or(PipelineError::MissingColumn {
            column: Column::Subject,
        })?;
        subject_mass.insert(subject, g.sum);
    }

    per_concept
        .into_iter()
        .map(|g| {
            let (subject, concept) = g.key.subject_concept()?;
            let mass = subject_mass.get(&subject).copied().unwrap_or(g.mean);
            Ok(ConceptWeight {
                subject,
                concept,
                mean_questions: g.mean,
                weight: g.mean / mass,
            })
        })
        .collect()
}

/// The `n` heaviest concepts of `subject`, heaviest first.
pub fn heaviest(weights: &[ConceptWeight], subject: Subject, n: usize) -> Vec<&ConceptWeight> {
    let mut selected: Vec<&ConceptWeight> =
        weights.iter().filter(|w| w.subject == subject).collect();
    selected.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.concept.cmp(&b.concept))
    });
    selected.truncate(n);
    selected
}
