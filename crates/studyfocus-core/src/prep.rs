//! Cleaning raw response rows into answer records.
//!
//! Drops rows without an answer key, remaps concepts to their broad
//! concept, drops excluded concepts, assigns student ids in first-seen
//! order, and counts the concept tags on each question.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::{group_by, Column, GroupKey, Measure};
use crate::error::PipelineError;
use crate::model::{AnswerRecord, Difficulty, RawResponse, Roster, Subject};

/// Maps fine-grained concept tags to broad concepts, and names broad
/// concepts to drop entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptMap {
    mapping: HashMap<(String, Subject), String>,
    excluded: HashSet<String>,
}

impl ConceptMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `concept` within `subject` to `broad`.
    pub fn insert(
        &mut self,
        concept: impl Into<String>,
        subject: Subject,
        broad: impl Into<String>,
    ) {
        self.mapping.insert((concept.into(), subject), broad.into());
    }

    /// Drop every row whose broad concept is `concept`.
    pub fn exclude(&mut self, concept: impl Into<String>) {
        self.excluded.insert(concept.into());
    }

    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(excluded.into_iter().map(Into::into));
        self
    }

    /// The broad concept for `concept`, or `None` if it is excluded.
    /// Unmapped concepts stand for themselves.
    pub fn resolve(&self, concept: &str, subject: Subject) -> Option<String> {
        let broad = self
            .mapping
            .get(&(concept.to_string(), subject))
            .cloned()
            .unwrap_or_else(|| concept.to_string());
        if self.excluded.contains(&broad) {
            None
        } else {
            Some(broad)
        }
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Data-quality counts from one preparation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepSummary {
    pub input_rows: usize,
    /// Rows dropped because the answer key was null.
    pub dropped_missing_key: usize,
    /// Rows dropped because their concept is excluded.
    pub dropped_excluded_concept: usize,
    pub records: usize,
    pub students: usize,
}

/// Output of [`prepare`].
#[derive(Debug, Clone)]
pub struct Prepared {
    pub records: Vec<AnswerRecord>,
    pub roster: Roster,
    pub summary: PrepSummary,
}

/// Clean `raw` rows into answer records.
pub fn prepare(raw: Vec<RawResponse>, concepts: &ConceptMap) -> Result<Prepared, PipelineError> {
    let mut summary = PrepSummary {
        input_rows: raw.len(),
        ..PrepSummary::default()
    };
    let mut roster = Roster::default();
    let mut records = Vec::with_capacity(raw.len());

    for row in raw {
        let Some(correct_answer) = row.correct_answer else {
            summary.dropped_missing_key += 1;
            continue;
        };
        let subject: Subject = row.subject.parse()?;
        let Some(concept) = concepts.resolve(&row.concept, subject) else {
            summary.dropped_excluded_concept += 1;
            continue;
        };
        let difficulty: Difficulty = row.difficulty.parse()?;
        let student_id = roster.register(&row.identity);

        records.push(AnswerRecord {
            student_id,
            test_id: row.test_id,
            question_number: row.question_number,
            section_number: row.section_number,
            subject,
            concept,
            difficulty,
            student_answer: row.student_answer,
            correct_answer,
            test_date: row.test_date,
            num_concepts: 1,
        });
    }

    if summary.dropped_missing_key > 0 {
        tracing::warn!(
            dropped = summary.dropped_missing_key,
            "dropped rows with no correct answer"
        );
    }
    if summary.dropped_excluded_concept > 0 {
        tracing::warn!(
            dropped = summary.dropped_excluded_concept,
            "dropped rows with excluded concepts"
        );
    }

    assign_num_concepts(&mut records)?;

    summary.records = records.len();
    summary.students = roster.len();
    tracing::debug!(records = summary.records, students = summary.students, "prepared records");

    Ok(Prepared {
        records,
        roster,
        summary,
    })
}

const QUESTION: [Column; 3] = [Column::TestId, Column::QuestionNumber, Column::SectionNumber];

/// Tag each record with the number of concepts on its question: the largest
/// per-student row count for that question.
fn assign_num_concepts(records: &mut [AnswerRecord]) -> Result<(), PipelineError> {
    let per_student = group_by(
        records.iter(),
        &[
            Column::StudentId,
            Column::TestId,
            Column::QuestionNumber,
            Column::SectionNumber,
        ],
        Measure::Correct,
    )?;

    let mut per_question: HashMap<GroupKey, usize> = HashMap::new();
    for g in per_student {
        let Some(question) = g.key.project(&QUESTION) else {
            continue;
        };
        let entry = per_question.entry(question).or_insert(0);
        *entry = (*entry).max(g.count);
    }

    for record in records.iter_mut() {
        let key = GroupKey::from_row(&*record, &QUESTION)?;
        if let Some(&n) = per_question.get(&key) {
            record.num_concepts = n as u32;
        }
    }
    Ok(())
}
