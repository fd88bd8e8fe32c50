//! Study recommendations for one student.
//!
//! Two rankings are produced:
//!
//! - **Focus**: concepts where the student trails the class the most,
//!   scaled by concept weight. Only concepts with enough wrong answers are
//!   considered.
//! - **Opportunity**: concepts with the most wrong answers. Restricted to
//!   easy questions (and ignoring blanks) it becomes the careless-error list.
//!
//! An empty result is a normal outcome, not an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::class_average::class_averages;
use crate::error::PipelineError;
use crate::model::{AnswerRecord, Difficulty, StudentId, Subject};
use crate::performance::{performance_by, SUBJECT_CONCEPT};
use crate::weights::{concept_weights, WeightConfig};

/// Tuning for the focus ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusOptions {
    /// Minimum score counted as passing.
    #[serde(default = "default_focus_threshold")]
    pub passing_threshold: f64,
    /// Concepts with fewer wrong answers than this are not recommended.
    #[serde(default = "default_min_wrong")]
    pub min_wrong: usize,
    /// Maximum rows returned.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_focus_threshold() -> f64 {
    0.6
}

fn default_min_wrong() -> usize {
    5
}

pub(crate) fn default_limit() -> usize {
    5
}

impl Default for FocusOptions {
    fn default() -> Self {
        Self {
            passing_threshold: default_focus_threshold(),
            min_wrong: default_min_wrong(),
            limit: default_limit(),
        }
    }
}

/// One ranked focus concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub subject: Subject,
    pub concept: String,
    pub weight: f64,
    pub wrong: usize,
    pub score: f64,
    pub class_avg: f64,
    /// `score - class_avg`.
    pub score_diff: f64,
    /// `score_diff * weight`.
    pub weighted_score_diff: f64,
}

/// One ranked opportunity or careless-error concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub subject: Subject,
    pub concept: String,
    pub num_questions: usize,
    pub num_correct: usize,
    pub num_wrong: usize,
    pub score: f64,
}

/// Records of `subject`, and of `test_id` when given.
fn in_scope<'a>(
    records: &'a [AnswerRecord],
    subject: Subject,
    test_id: Option<&str>,
) -> Vec<&'a AnswerRecord> {
    records
        .iter()
        .filter(|r| r.subject == subject)
        .filter(|r| test_id.map_or(true, |t| r.test_id == t))
        .collect()
}

/// Concepts where `student` is furthest behind the class, weighted by
/// concept importance, most negative first.
///
/// Weights, student scores, and class averages are all computed over the
/// same scope (the subject, narrowed to one test when `test_id` is given).
/// Concepts without a weight are dropped.
pub fn focus_concepts(
    records: &[AnswerRecord],
    student: StudentId,
    subject: Subject,
    test_id: Option<&str>,
    weight_config: &WeightConfig,
    options: &FocusOptions,
) -> Result<Vec<RecommendationRow>, PipelineError> {
    let scope = in_scope(records, subject, test_id);

    let weights: HashMap<(Subject, String), f64> =
        concept_weights(scope.iter().copied(), weight_config)?
            .into_iter()
            .map(|w| ((w.subject, w.concept), w.weight))
            .collect();

    let (student_perf, class_perf) =
        class_averages(scope.iter().copied(), options.passing_threshold)?;
    let class_avg: HashMap<(Subject, String), f64> = class_perf
        .into_iter()
        .map(|c| ((c.subject, c.concept), c.class_avg))
        .collect();

    let mut unweighted = 0usize;
    let mut rows = Vec::new();
    for perf in student_perf.iter().filter(|p| p.key.student_id() == Some(student)) {
        let join_key = perf.key.subject_concept()?;
        let Some(&avg) = class_avg.get(&join_key) else {
            continue;
        };
        let Some(&weight) = weights.get(&join_key) else {
            unweighted += 1;
            continue;
        };
        if perf.num_wrong < options.min_wrong {
            continue;
        }
        let score_diff = perf.score - avg;
        let (subject, concept) = join_key;
        rows.push(RecommendationRow {
            subject,
            concept,
            weight,
            wrong: perf.num_wrong,
            score: perf.score,
            class_avg: avg,
            score_diff,
            weighted_score_diff: score_diff * weight,
        });
    }
    if unweighted > 0 {
        tracing::debug!(student, %subject, unweighted, "dropped concepts without a weight");
    }

    rows.sort_by(|a, b| {
        a.weighted_score_diff
            .total_cmp(&b.weighted_score_diff)
            .then_with(|| a.concept.cmp(&b.concept))
    });
    rows.truncate(options.limit);
    Ok(rows)
}

/// Concepts where `student` got the most answers wrong, most first.
///
/// With `difficulty` set only questions of that tier count. For the easy tier
/// blank answers are also ignored: an omission is not a careless error.
pub fn opportunity_concepts(
    records: &[AnswerRecord],
    student: StudentId,
    subject: Subject,
    test_id: Option<&str>,
    difficulty: Option<Difficulty>,
    limit: usize,
) -> Result<Vec<OpportunityRow>, PipelineError> {
    let scope: Vec<&AnswerRecord> = in_scope(records, subject, test_id)
        .into_iter()
        .filter(|r| r.student_id == student)
        .filter(|r| difficulty.map_or(true, |d| r.difficulty == d))
        .filter(|r| difficulty != Some(Difficulty::Easy) || !r.is_blank())
        .collect();

    let perf = performance_by(scope, &SUBJECT_CONCEPT, 0.5)?;
    let mut rows = perf
        .into_iter()
        .map(|p| {
            let (subject, concept) = p.key.subject_concept()?;
            Ok(OpportunityRow {
                subject,
                concept,
                num_questions: p.num_questions,
                num_correct: p.num_correct,
                num_wrong: p.num_wrong,
                score: p.score,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    rows.sort_by(|a, b| b.num_wrong.cmp(&a.num_wrong).then_with(|| a.concept.cmp(&b.concept)));
    rows.truncate(limit);
    Ok(rows)
}

/// Most-missed easy concepts, blanks excluded.
pub fn careless_errors(
    records: &[AnswerRecord],
    student: StudentId,
    subject: Subject,
    test_id: Option<&str>,
    limit: usize,
) -> Result<Vec<OpportunityRow>, PipelineError> {
    opportunity_concepts(records, student, subject, test_id, Some(Difficulty::Easy), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BLANK_ANSWER;

    fn answer(
        student: StudentId,
        test: &str,
        q: u32,
        concept: &str,
        correct: bool,
    ) -> AnswerRecord {
        crate::aggregate::tests::record(student, test, q, concept, correct)
    }

    /// `correct` right answers followed by `total - correct` wrong ones.
    fn block(
        student: StudentId,
        test: &str,
        concept: &str,
        correct: u32,
        total: u32,
    ) -> Vec<AnswerRecord> {
        (0..total)
            .map(|i| answer(student, test, i, concept, i < correct))
            .collect()
    }

    fn lenient() -> FocusOptions {
        FocusOptions {
            min_wrong: 1,
            ..FocusOptions::default()
        }
    }

    #[test]
    fn ranks_by_weighted_deficit() {
        let mut rows = Vec::new();
        // heavy concept: student 0 far behind
        rows.extend(block(0, "T1", "heavy", 2, 10));
        rows.extend(block(1, "T1", "heavy", 9, 10));
        // light concept: student 0 behind by more, but weighted less
        rows.extend(block(0, "T1", "light", 0, 2));
        rows.extend(block(1, "T1", "light", 2, 2));

        let rec =
            focus_concepts(&rows, 0, Subject::Math, None, &WeightConfig::keep_all(), &lenient())
                .unwrap();
        assert_eq!(rec.len(), 2);
        assert_eq!(rec[0].concept, "heavy");
        assert!((rec[0].score_diff - (0.2 - 0.55)).abs() < 1e-12);
        assert!((rec[0].weighted_score_diff - rec[0].score_diff * rec[0].weight).abs() < 1e-12);
        assert!(rec[0].weighted_score_diff <= rec[1].weighted_score_diff);
    }

    #[test]
    fn min_wrong_filters_low_volume_concepts() {
        let mut rows = Vec::new();
        rows.extend(block(0, "T1", "many", 0, 6));
        rows.extend(block(0, "T1", "few", 0, 4));
        rows.extend(block(1, "T1", "many", 6, 6));
        rows.extend(block(1, "T1", "few", 4, 4));

        let rec = focus_concepts(
            &rows,
            0,
            Subject::Math,
            None,
            &WeightConfig::keep_all(),
            &FocusOptions::default(),
        )
        .unwrap();
        assert_eq!(rec.len(), 1);
        assert_eq!(rec[0].concept, "many");
        assert!(rec.iter().all(|r| r.wrong >= 5));
    }

    #[test]
    fn at_most_limit_rows() {
        let mut rows = Vec::new();
        for c in 0..8 {
            let concept = format!("c{c}");
            rows.extend(block(0, "T1", &concept, 0, 5));
            rows.extend(block(1, "T1", &concept, 5, 5));
        }
        let rec =
            focus_concepts(&rows, 0, Subject::Math, None, &WeightConfig::keep_all(), &lenient())
                .unwrap();
        assert_eq!(rec.len(), 5);
    }

    #[test]
    fn perfect_student_gets_no_focus() {
        let mut rows = Vec::new();
        rows.extend(block(0, "T1", "A", 10, 10));
        rows.extend(block(0, "T1", "B", 5, 5));
        rows.extend(block(1, "T1", "A", 0, 10));
        let rec = focus_concepts(
            &rows,
            0,
            Subject::Math,
            Some("T1"),
            &WeightConfig::keep_all(),
            &FocusOptions::default(),
        )
        .unwrap();
        assert!(rec.is_empty());
    }

    #[test]
    fn unweighted_concepts_never_recommended() {
        // all of "untagged" lives on an excluded test, so it has no weight
        let mut rows = Vec::new();
        rows.extend(block(0, "T1", "tagged", 3, 10));
        rows.extend(block(1, "T1", "tagged", 5, 10));
        rows.extend(block(0, "XBB", "untagged", 0, 10));
        rows.extend(block(1, "XBB", "untagged", 10, 10));

        let config = WeightConfig {
            excluded_tests: vec!["BB".into()],
        };
        let rec = focus_concepts(&rows, 0, Subject::Math, None, &config, &lenient()).unwrap();
        assert_eq!(rec.len(), 1);
        assert_eq!(rec[0].concept, "tagged");
    }

    #[test]
    fn test_filter_narrows_scope() {
        let mut rows = Vec::new();
        rows.extend(block(0, "T1", "A", 0, 6));
        rows.extend(block(1, "T1", "A", 6, 6));
        rows.extend(block(0, "T2", "B", 0, 6));
        rows.extend(block(1, "T2", "B", 6, 6));

        let rec = focus_concepts(
            &rows,
            0,
            Subject::Math,
            Some("T2"),
            &WeightConfig::keep_all(),
            &lenient(),
        )
        .unwrap();
        assert_eq!(rec.len(), 1);
        assert_eq!(rec[0].concept, "B");
        assert!((rec[0].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opportunity_ranks_by_wrong_count() {
        let mut rows = Vec::new();
        rows.extend(block(0, "T1", "A", 8, 10));
        rows.extend(block(0, "T1", "B", 1, 5));
        rows.extend(block(0, "T1", "C", 0, 3));
        rows.extend(block(1, "T1", "A", 0, 10));

        let rec = opportunity_concepts(&rows, 0, Subject::Math, None, None, 5).unwrap();
        let order: Vec<(&str, usize)> =
            rec.iter().map(|r| (r.concept.as_str(), r.num_wrong)).collect();
        assert_eq!(order, vec![("B", 4), ("C", 3), ("A", 2)]);
    }

    #[test]
    fn careless_errors_skip_blanks_but_opportunity_counts_them() {
        let mut rows = block(0, "T1", "A", 0, 4);
        for r in rows.iter_mut() {
            r.difficulty = Difficulty::Easy;
        }
        rows[0].student_answer = BLANK_ANSWER.into();
        rows[1].student_answer = String::new();

        let all = opportunity_concepts(&rows, 0, Subject::Math, None, None, 5).unwrap();
        assert_eq!(all[0].num_wrong, 4);

        let careless = careless_errors(&rows, 0, Subject::Math, None, 5).unwrap();
        assert_eq!(careless[0].num_wrong, 2);
        assert_eq!(careless[0].num_questions, 2);
    }

    #[test]
    fn difficulty_filter_restricts_tier() {
        let mut rows = block(0, "T1", "A", 0, 4);
        rows[0].difficulty = Difficulty::Hard;
        let hard =
            opportunity_concepts(&rows, 0, Subject::Math, None, Some(Difficulty::Hard), 5).unwrap();
        assert_eq!(hard[0].num_questions, 1);

        let easy = careless_errors(&rows, 0, Subject::Math, None, 5).unwrap();
        assert!(easy.is_empty());
    }
}
