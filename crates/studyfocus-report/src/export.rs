//! CSV export of per-student detail tables.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use studyfocus_core::breakdown::BreakdownRow;

#[derive(Serialize)]
struct BreakdownRecord<'a> {
    subject: String,
    concept: &'a str,
    difficulty: String,
    #[serde(rename = "numQuestions")]
    num_questions: usize,
    #[serde(rename = "numCorrect")]
    num_correct: usize,
    #[serde(rename = "numWrong")]
    num_wrong: usize,
    score: String,
}

impl<'a> From<&'a BreakdownRow> for BreakdownRecord<'a> {
    fn from(row: &'a BreakdownRow) -> Self {
        Self {
            subject: row.subject.to_string(),
            concept: &row.concept,
            difficulty: row.difficulty.to_string(),
            num_questions: row.num_questions,
            num_correct: row.num_correct,
            num_wrong: row.num_wrong,
            score: format!("{:.2}", row.score),
        }
    }
}

/// Write a concept breakdown as CSV, creating parent directories.
///
/// The header row is written even when `rows` is empty.
pub fn write_breakdown_csv(rows: &[BreakdownRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    wtr.write_record([
        "subject",
        "concept",
        "difficulty",
        "numQuestions",
        "numCorrect",
        "numWrong",
        "score",
    ])?;
    for row in rows {
        wtr.serialize(BreakdownRecord::from(row))?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyfocus_core::model::{Difficulty, Subject};

    fn row(concept: &str, difficulty: Difficulty, correct: usize, total: usize) -> BreakdownRow {
        BreakdownRow {
            subject: Subject::Math,
            concept: concept.into(),
            difficulty,
            num_questions: total,
            num_correct: correct,
            num_wrong: total - correct,
            score: correct as f64 / total as f64,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores_by_concept").join("T1").join("ann.csv");
        let rows = vec![
            row("algebra, linear", Difficulty::Easy, 2, 3),
            row("geometry", Difficulty::Hard, 0, 1),
        ];

        write_breakdown_csv(&rows, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "subject,concept,difficulty,numQuestions,numCorrect,numWrong,score"
        );
        assert_eq!(lines[1], "math,\"algebra, linear\",easy,3,2,1,0.67");
        assert_eq!(lines[2], "math,geometry,hard,1,0,1,0.00");
    }

    #[test]
    fn empty_breakdown_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_breakdown_csv(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
