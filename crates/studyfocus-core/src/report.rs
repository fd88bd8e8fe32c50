//! Per-student score report assembly with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StudyfocusConfig;
use crate::error::PipelineError;
use crate::model::{AnswerRecord, Roster, Student, StudentId, Subject};
use crate::recommend::{
    careless_errors, focus_concepts, opportunity_concepts, OpportunityRow, RecommendationRow,
};
use crate::trends::{concept_trends, TrendPoint};

/// A complete score report for one student and one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub student: Student,
    /// Test the recommendations are based on.
    pub test_id: String,
    /// Earlier test whose focus concepts are tracked over time.
    pub last_test_id: Option<String>,
    /// One section per subject, in report order.
    pub sections: Vec<SubjectSection>,
}

/// Recommendations for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSection {
    pub subject: Subject,
    pub title: String,
    pub focus: Vec<RecommendationRow>,
    pub opportunity: Vec<OpportunityRow>,
    pub careless: Vec<OpportunityRow>,
    /// Scores over time on the tracked focus concepts.
    pub trend: Vec<TrendPoint>,
}

impl SubjectSection {
    /// True when no list has any row.
    pub fn is_empty(&self) -> bool {
        self.focus.is_empty() && self.opportunity.is_empty() && self.careless.is_empty()
    }
}

impl ScoreReport {
    /// File name for the rendered report, e.g. `Ann_Lee_3_YL_2.html`.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "{}_{}_{}.{extension}",
            self.student.file_stem(),
            self.student.id,
            self.test_id
        )
    }

    /// Total recommendation rows across all sections.
    pub fn recommendation_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.focus.len() + s.opportunity.len() + s.careless.len())
            .sum()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoreReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

/// Build the score report of `student` for `test_id`.
///
/// The trend tracks the focus concepts of `last_test_id` over every dated
/// test. Without `last_test_id` the tracked concepts are ranked over all
/// tests instead of one.
pub fn build_score_report(
    records: &[AnswerRecord],
    roster: &Roster,
    student: StudentId,
    test_id: &str,
    last_test_id: Option<&str>,
    config: &StudyfocusConfig,
) -> Result<ScoreReport> {
    let student_info = roster
        .get(student)
        .cloned()
        .with_context(|| format!("unknown student id: {student}"))?;

    let mut sections = Vec::with_capacity(config.report.subjects.len());
    for &subject in &config.report.subjects {
        let section = build_section(records, student, subject, test_id, last_test_id, config)
            .with_context(|| format!("failed to build {subject} section for student {student}"))?;
        sections.push(section);
    }

    Ok(ScoreReport {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        student: student_info,
        test_id: test_id.to_string(),
        last_test_id: last_test_id.map(String::from),
        sections,
    })
}

fn build_section(
    records: &[AnswerRecord],
    student: StudentId,
    subject: Subject,
    test_id: &str,
    last_test_id: Option<&str>,
    config: &StudyfocusConfig,
) -> Result<SubjectSection, PipelineError> {
    let focus = focus_concepts(
        records,
        student,
        subject,
        Some(test_id),
        &config.weights,
        &config.focus,
    )?;
    let limit = config.opportunity.limit;
    let opportunity = opportunity_concepts(records, student, subject, Some(test_id), None, limit)?;
    let careless = careless_errors(records, student, subject, Some(test_id), limit)?;

    // without an earlier test, rank focus over every test
    let tracked: Vec<String> = focus_concepts(
        records,
        student,
        subject,
        last_test_id,
        &config.weights,
        &config.focus,
    )?
    .into_iter()
    .map(|r| r.concept)
    .collect();

    let scoped: Vec<AnswerRecord> = records
        .iter()
        .filter(|r| r.subject == subject)
        .cloned()
        .collect();
    let trend = match concept_trends(&scoped, student, &tracked) {
        Ok(points) => points,
        Err(PipelineError::MissingColumn { column }) => {
            tracing::warn!(student, %subject, %column, "skipping trend chart");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(SubjectSection {
        subject,
        title: subject.title().to_string(),
        focus,
        opportunity,
        careless,
        trend,
    })
}
