//! The `studyfocus report` command.

use std::path::PathBuf;

use anyhow::Result;

use studyfocus_core::breakdown::concept_breakdown;
use studyfocus_core::config::load_config_from;
use studyfocus_core::model::StudentId;
use studyfocus_core::report::{build_score_report, ScoreReport};
use studyfocus_report::export::write_breakdown_csv;
use studyfocus_report::html::{append_index, write_html_report};

pub fn execute(
    responses: PathBuf,
    test_id: String,
    last_test_id: Option<String>,
    student: Option<StudentId>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let prepared = super::load_batch(&responses, &config)?;
    let records = &prepared.records;

    anyhow::ensure!(
        records.iter().any(|r| r.test_id == test_id),
        "no responses found for test '{test_id}'"
    );
    if let Some(last) = &last_test_id {
        anyhow::ensure!(
            records.iter().any(|r| &r.test_id == last),
            "no responses found for test '{last}'"
        );
    }

    let formats: Vec<&str> = if format == "all" {
        vec!["html", "json"]
    } else {
        format.split(',').map(str::trim).collect()
    };
    if let Some(unknown) = formats.iter().find(|f| !matches!(**f, "html" | "json")) {
        anyhow::bail!("unknown format: {unknown}");
    }

    // students who sat the test, in id order
    let students: Vec<StudentId> = match student {
        Some(id) => {
            anyhow::ensure!(
                records.iter().any(|r| r.student_id == id && r.test_id == test_id),
                "student {id} has no responses for test '{test_id}'"
            );
            vec![id]
        }
        None => {
            let mut ids: Vec<StudentId> = records
                .iter()
                .filter(|r| r.test_id == test_id)
                .map(|r| r.student_id)
                .collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        }
    };

    let output = output.unwrap_or_else(|| config.report.output_dir.clone());
    let report_dir = output.join("reports");
    let breakdown_dir = output.join("scores_by_concept").join(&test_id);

    let mut reports = Vec::with_capacity(students.len());
    for id in students {
        let report = build_score_report(
            records,
            &prepared.roster,
            id,
            &test_id,
            last_test_id.as_deref(),
            &config,
        )?;
        let name = report.student.display_name();
        tracing::info!(student = id, %name, "building report");

        for fmt in &formats {
            match *fmt {
                "html" => {
                    let file = report.file_name("html");
                    write_html_report(&report, &report_dir.join(&test_id).join(&file))?;
                    append_index(
                        &report_dir,
                        &format!("{test_id}/{file}"),
                        &format!("{name} ({test_id})"),
                    )?;
                }
                "json" => {
                    report.save_json(&report_dir.join(&test_id).join(report.file_name("json")))?;
                }
                _ => {}
            }
        }

        let breakdown = concept_breakdown(records, id, Some(&test_id))?;
        write_breakdown_csv(&breakdown, &breakdown_dir.join(report.file_name("csv")))?;

        reports.push(report);
    }

    print_summary(&reports);
    eprintln!("Reports written to: {}", report_dir.join(&test_id).display());
    Ok(())
}

fn print_summary(reports: &[ScoreReport]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["ID", "Student", "Focus", "Opportunity", "Careless", "Top focus"]);

    for report in reports {
        let (focus, opportunity, careless) =
            report.sections.iter().fold((0, 0, 0), |(f, o, c), s| {
                (f + s.focus.len(), o + s.opportunity.len(), c + s.careless.len())
            });
        let top_focus = report
            .sections
            .iter()
            .filter_map(|s| s.focus.first())
            .min_by(|a, b| a.weighted_score_diff.total_cmp(&b.weighted_score_diff))
            .map(|r| format!("{} ({})", r.concept, r.subject))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(report.student.id),
            Cell::new(report.student.display_name()),
            Cell::new(focus),
            Cell::new(opportunity),
            Cell::new(careless),
            Cell::new(top_focus),
        ]);
    }

    println!("{table}");
}
