//! Group-by aggregation over answer records and derived tables.
//!
//! Every statistic in the pipeline is built from [`group_by`]: pick a set of
//! key columns and one numeric measure, get back one [`Group`] per distinct
//! key with the count, sum, and mean of that measure. Groups come out in
//! lexicographic key order so downstream joins are reproducible.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{AnswerRecord, Difficulty, StudentId, Subject};

/// Columns a table can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    StudentId,
    TestId,
    QuestionNumber,
    SectionNumber,
    Subject,
    Concept,
    Difficulty,
    TestDate,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Column::StudentId => "studentID",
            Column::TestId => "testID",
            Column::QuestionNumber => "testQuestionNumber",
            Column::SectionNumber => "testSectionNumber",
            Column::Subject => "subject",
            Column::Concept => "concept",
            Column::Difficulty => "difficulty",
            Column::TestDate => "testDate",
        };
        f.write_str(name)
    }
}

/// Numeric columns that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    /// 1 when the answer matched the key, else 0.
    Correct,
    /// Concept tags attached to the question.
    NumConcepts,
    /// Row count of a previous aggregation.
    Count,
    /// Sum of a previous aggregation.
    Sum,
    /// Mean of a previous aggregation.
    Mean,
    /// Mean correctness of a performance row.
    Score,
    /// Passing flag of a performance row, as 0 or 1.
    Passing,
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Measure::Correct => "correct",
            Measure::NumConcepts => "numConcepts",
            Measure::Count => "size",
            Measure::Sum => "sum",
            Measure::Mean => "mean",
            Measure::Score => "score",
            Measure::Passing => "passing",
        };
        f.write_str(name)
    }
}

/// A single key cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyValue {
    Int(u64),
    Subject(Subject),
    Difficulty(Difficulty),
    Date(NaiveDate),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Subject(s) => write!(f, "{s}"),
            KeyValue::Difficulty(d) => write!(f, "{d}"),
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            KeyValue::Text(t) => f.write_str(t),
        }
    }
}

/// Anything that exposes named key columns and numeric measures.
///
/// `None` means the column is not part of this row's schema.
pub trait Tabular {
    fn key(&self, column: Column) -> Option<KeyValue>;
    fn measure(&self, measure: Measure) -> Option<f64>;
}

impl<T: Tabular + ?Sized> Tabular for &T {
    fn key(&self, column: Column) -> Option<KeyValue> {
        (**self).key(column)
    }

    fn measure(&self, measure: Measure) -> Option<f64> {
        (**self).measure(measure)
    }
}

impl Tabular for AnswerRecord {
    fn key(&self, column: Column) -> Option<KeyValue> {
        match column {
            Column::StudentId => Some(KeyValue::Int(self.student_id as u64)),
            Column::TestId => Some(KeyValue::Text(self.test_id.clone())),
            Column::QuestionNumber => Some(KeyValue::Int(self.question_number as u64)),
            Column::SectionNumber => Some(KeyValue::Int(self.section_number as u64)),
            Column::Subject => Some(KeyValue::Subject(self.subject)),
            Column::Concept => Some(KeyValue::Text(self.concept.clone())),
            Column::Difficulty => Some(KeyValue::Difficulty(self.difficulty)),
            Column::TestDate => self.test_date.map(KeyValue::Date),
        }
    }

    fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Correct => Some(if self.is_correct() { 1.0 } else { 0.0 }),
            Measure::NumConcepts => Some(self.num_concepts as f64),
            _ => None,
        }
    }
}

/// The key tuple of a group, as `(column, value)` pairs in grouping order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey(Vec<(Column, KeyValue)>);

impl GroupKey {
    /// Build a key from `row`, failing on the first absent column.
    pub fn from_row<R: Tabular>(row: &R, columns: &[Column]) -> Result<Self, PipelineError> {
        columns
            .iter()
            .map(|&column| {
                row.key(column)
                    .map(|value| (column, value))
                    .ok_or(PipelineError::MissingColumn { column })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(GroupKey)
    }

    pub fn get(&self, column: Column) -> Option<&KeyValue> {
        self.0.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().map(|(c, _)| *c)
    }

    pub fn text(&self, column: Column) -> Option<&str> {
        match self.get(column) {
            Some(KeyValue::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn student_id(&self) -> Option<StudentId> {
        match self.get(Column::StudentId) {
            Some(KeyValue::Int(v)) => Some(*v as StudentId),
            _ => None,
        }
    }

    pub fn subject(&self) -> Option<Subject> {
        match self.get(Column::Subject) {
            Some(KeyValue::Subject(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn concept(&self) -> Option<&str> {
        self.text(Column::Concept)
    }

    pub fn test_date(&self) -> Option<NaiveDate> {
        match self.get(Column::TestDate) {
            Some(KeyValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    /// The `(subject, concept)` join key, required by every per-concept table.
    pub fn subject_concept(&self) -> Result<(Subject, String), PipelineError> {
        let subject = self.subject().ok_or(PipelineError::MissingColumn {
            column: Column::Subject,
        })?;
        let concept = self.concept().ok_or(PipelineError::MissingColumn {
            column: Column::Concept,
        })?;
        Ok((subject, concept.to_string()))
    }

    /// Key restricted to `columns`, in the given order.
    pub fn project(&self, columns: &[Column]) -> Option<GroupKey> {
        columns
            .iter()
            .map(|&c| self.get(c).cloned().map(|v| (c, v)))
            .collect::<Option<Vec<_>>>()
            .map(GroupKey)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(c, v)| format!("{c}={v}")).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// One output row of [`group_by`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: GroupKey,
    /// Number of input rows in the group.
    pub count: usize,
    /// Sum of the measure.
    pub sum: f64,
    /// Arithmetic mean of the measure.
    pub mean: f64,
}

impl Tabular for Group {
    fn key(&self, column: Column) -> Option<KeyValue> {
        self.key.get(column).cloned()
    }

    fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Count => Some(self.count as f64),
            Measure::Sum => Some(self.sum),
            Measure::Mean => Some(self.mean),
            _ => None,
        }
    }
}

/// Group `rows` by `columns` and aggregate `measure` into count, sum, and mean.
///
/// Output is sorted by key tuple. Fails with a schema error if any row lacks
/// one of the grouping columns or the measure. Empty input yields no groups.
pub fn group_by<I, R>(
    rows: I,
    columns: &[Column],
    measure: Measure,
) -> Result<Vec<Group>, PipelineError>
where
    I: IntoIterator<Item = R>,
    R: Tabular,
{
    let mut acc: BTreeMap<GroupKey, (usize, f64)> = BTreeMap::new();
    for row in rows {
        let key = GroupKey::from_row(&row, columns)?;
        let value = row
            .measure(measure)
            .ok_or(PipelineError::MissingMeasure { measure })?;
        let entry = acc.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += value;
    }

    Ok(acc
        .into_iter()
        .map(|(key, (count, sum))| Group {
            key,
            count,
            sum,
            mean: sum / count as f64,
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Difficulty;

    pub(crate) fn record(
        student_id: StudentId,
        test_id: &str,
        question: u32,
        concept: &str,
        correct: bool,
    ) -> AnswerRecord {
        AnswerRecord {
            student_id,
            test_id: test_id.into(),
            question_number: question,
            section_number: 1,
            subject: Subject::Math,
            concept: concept.into(),
            difficulty: Difficulty::Medium,
            student_answer: if correct { "A".into() } else { "B".into() },
            correct_answer: "A".into(),
            test_date: None,
            num_concepts: 1,
        }
    }

    #[test]
    fn counts_sums_and_means() {
        let rows = vec![
            record(0, "T1", 1, "algebra", true),
            record(0, "T1", 2, "algebra", false),
            record(0, "T1", 3, "geometry", true),
            record(1, "T1", 1, "algebra", true),
        ];
        let groups =
            group_by(&rows, &[Column::StudentId, Column::Concept], Measure::Correct).unwrap();
        assert_eq!(groups.len(), 3);

        let first = &groups[0];
        assert_eq!(first.key.student_id(), Some(0));
        assert_eq!(first.key.concept(), Some("algebra"));
        assert_eq!(first.count, 2);
        assert_eq!(first.sum, 1.0);
        assert!((first.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn output_is_sorted_by_key_tuple() {
        let rows = vec![
            record(2, "T1", 1, "b", true),
            record(0, "T1", 1, "z", true),
            record(0, "T1", 2, "a", true),
            record(1, "T1", 1, "m", true),
        ];
        let groups =
            group_by(&rows, &[Column::StudentId, Column::Concept], Measure::Correct).unwrap();
        let keys: Vec<(Option<StudentId>, Option<&str>)> = groups
            .iter()
            .map(|g| (g.key.student_id(), g.key.concept()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Some(0), Some("a")),
                (Some(0), Some("z")),
                (Some(1), Some("m")),
                (Some(2), Some("b")),
            ]
        );
    }

    #[test]
    fn subject_keys_sort_by_name() {
        let mut rows = Vec::new();
        for (i, subject) in [Subject::Writing, Subject::Sentence, Subject::Math, Subject::Reading]
            .into_iter()
            .enumerate()
        {
            let mut r = record(0, "T1", i as u32, "c", true);
            r.subject = subject;
            rows.push(r);
        }
        let groups = group_by(&rows, &[Column::Subject], Measure::Correct).unwrap();
        let names: Vec<String> = groups
            .iter()
            .map(|g| g.key.subject().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["math", "reading", "sentence", "writing"]);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let rows: Vec<AnswerRecord> = (0..50)
            .map(|i| record(i % 7, "T1", i, &format!("c{}", i % 5), i % 3 == 0))
            .collect();
        let columns = [Column::Concept, Column::StudentId];
        let a = group_by(&rows, &columns, Measure::Correct).unwrap();
        let b = group_by(&rows, &columns, Measure::Correct).unwrap();
        assert_eq!(a, b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.mean.to_bits(), y.mean.to_bits());
        }
    }

    #[test]
    fn missing_key_column_is_schema_error() {
        let rows = vec![record(0, "T1", 1, "algebra", true)];
        let err = group_by(&rows, &[Column::TestDate], Measure::Correct).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumn {
                column: Column::TestDate
            }
        );
    }

    #[test]
    fn missing_measure_is_schema_error() {
        let rows = vec![record(0, "T1", 1, "algebra", true)];
        let err = group_by(&rows, &[Column::Concept], Measure::Score).unwrap_err();
        assert!(matches!(err, PipelineError::MissingMeasure { .. }));
    }

    #[test]
    fn groups_can_be_regrouped() {
        let rows = vec![
            record(0, "T1", 1, "algebra", true),
            record(0, "T1", 2, "algebra", true),
            record(1, "T1", 1, "algebra", true),
        ];
        let per_student =
            group_by(&rows, &[Column::StudentId, Column::Concept], Measure::Correct).unwrap();
        let per_concept = group_by(&per_student, &[Column::Concept], Measure::Count).unwrap();
        assert_eq!(per_concept.len(), 1);
        assert_eq!(per_concept[0].count, 2);
        assert!((per_concept[0].mean - 1.5).abs() < 1e-12);

        let err = group_by(&per_student, &[Column::TestId], Measure::Count).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let rows: Vec<AnswerRecord> = Vec::new();
        assert!(group_by(&rows, &[Column::Concept], Measure::Correct)
            .unwrap()
            .is_empty());
    }
}
