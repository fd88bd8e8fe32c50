//! The `studyfocus validate` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use studyfocus_core::config::load_config_from;
use studyfocus_core::model::AnswerRecord;
use studyfocus_core::trends::subject_trends;

pub fn execute(responses: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let prepared = super::load_batch(&responses, &config)?;
    let summary = &prepared.summary;

    println!("Responses: {}", responses.display());
    println!("  Input rows: {}", summary.input_rows);
    println!("  Dropped (no answer key): {}", summary.dropped_missing_key);
    println!("  Dropped (excluded concept): {}", summary.dropped_excluded_concept);
    println!("  Answer records: {}", summary.records);
    println!("  Students: {}", summary.students);

    let mut tests: BTreeMap<&str, usize> = BTreeMap::new();
    for r in &prepared.records {
        *tests.entry(r.test_id.as_str()).or_default() += 1;
    }
    println!("  Tests: {}", tests.len());
    for (test, answers) in &tests {
        let excluded = if config.weights.excludes(test) {
            " (excluded from weights)"
        } else {
            ""
        };
        println!("    {test}: {answers} answers{excluded}");
    }

    let dated: Vec<AnswerRecord> = prepared
        .records
        .iter()
        .filter(|r| r.test_date.is_some())
        .cloned()
        .collect();
    let undated = prepared.records.len() - dated.len();
    if !dated.is_empty() {
        use comfy_table::{Cell, Table};

        let mut table = Table::new();
        table.set_header(vec!["Subject", "Date", "Answers", "Avg Score"]);
        for t in subject_trends(&dated)? {
            table.add_row(vec![
                Cell::new(t.subject),
                Cell::new(t.test_date.format("%Y-%m-%d")),
                Cell::new(t.num_answers),
                Cell::new(format!("{:.2}", t.avg_score)),
            ]);
        }
        println!("\n{table}");
    }

    if undated > 0 {
        println!("\n{undated} record(s) without a test date; trend charts will skip them.");
    }
    if summary.dropped_missing_key == 0 && summary.dropped_excluded_concept == 0 {
        println!("\nNo rows dropped.");
    }

    Ok(())
}
