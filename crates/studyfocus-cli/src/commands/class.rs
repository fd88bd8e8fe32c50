//! The `studyfocus class` command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyfocus_core::breakdown::most_missed_concepts;
use studyfocus_core::class_average::{class_averages, class_pass_rates};
use studyfocus_core::config::load_config_from;
use studyfocus_core::model::{AnswerRecord, Subject};

pub fn execute(
    responses: PathBuf,
    test_id: Option<String>,
    subject: Option<String>,
    top: usize,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let subject = subject.map(|s| s.parse::<Subject>()).transpose()?;
    let prepared = super::load_batch(&responses, &config)?;

    let scope: Vec<AnswerRecord> = prepared
        .records
        .iter()
        .filter(|r| test_id.as_deref().map_or(true, |t| r.test_id == t))
        .filter(|r| subject.map_or(true, |s| r.subject == s))
        .cloned()
        .collect();
    anyhow::ensure!(!scope.is_empty(), "no responses match the given filters");

    let threshold = config.pipeline.passing_threshold;
    let (_, averages) = class_averages(&scope, threshold)?;
    let (_, rates) = class_pass_rates(&scope, threshold)?;
    let pass_rate: HashMap<(Subject, &str), f64> = rates
        .iter()
        .map(|r| ((r.subject, r.concept.as_str()), r.pct_passed))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Concept", "Students", "Class Avg", "Passing"]);
    for avg in &averages {
        let passing = pass_rate
            .get(&(avg.subject, avg.concept.as_str()))
            .map(|p| format!("{:.0}%", p * 100.0))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(avg.subject),
            Cell::new(&avg.concept),
            Cell::new(avg.num_students),
            Cell::new(format!("{:.2}", avg.class_avg)),
            Cell::new(passing),
        ]);
    }
    println!("{table}");

    let missed = most_missed_concepts(&scope, subject)?;
    let mut table = Table::new();
    table.set_header(vec![
        "Student",
        "Subject",
        "Concept",
        "Wrong",
        "Questions",
        "Concepts/question",
    ]);
    for m in missed.iter().take(top) {
        let name = prepared
            .roster
            .get(m.student_id)
            .map(|s| s.display_name())
            .unwrap_or_else(|| m.student_id.to_string());
        table.add_row(vec![
            Cell::new(name),
            Cell::new(m.subject),
            Cell::new(&m.concept),
            Cell::new(m.num_wrong),
            Cell::new(m.num_questions),
            Cell::new(format!("{:.2}", m.mean_num_concepts)),
        ]);
    }
    println!("\nMost missed:\n{table}");

    Ok(())
}
