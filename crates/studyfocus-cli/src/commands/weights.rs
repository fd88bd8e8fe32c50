//! The `studyfocus weights` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use studyfocus_core::config::load_config_from;
use studyfocus_core::model::Subject;
use studyfocus_core::weights::concept_weights;
use studyfocus_report::html::generate_weight_chart;

pub fn execute(
    responses: PathBuf,
    subject: Option<String>,
    chart: Option<PathBuf>,
    top: usize,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if !matches!(format.as_str(), "text" | "json") {
        bail!("unknown format: {format}");
    }
    let config = load_config_from(config_path.as_deref())?;
    let subject = subject.map(|s| s.parse::<Subject>()).transpose()?;
    let prepared = super::load_batch(&responses, &config)?;

    let mut weights = concept_weights(&prepared.records, &config.weights)?;
    if let Some(subject) = subject {
        weights.retain(|w| w.subject == subject);
    }

    if let (Some(path), Some(subject)) = (&chart, subject) {
        let svg = generate_weight_chart(&weights, subject, top);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, svg)
            .with_context(|| format!("failed to write chart to {}", path.display()))?;
        eprintln!("Weight chart: {}", path.display());
    }

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&weights)?);
        }
        _ => {
            use comfy_table::{Cell, Table};

            let mut table = Table::new();
            table.set_header(vec!["Subject", "Concept", "Questions/test", "Weight"]);
            for w in &weights {
                table.add_row(vec![
                    Cell::new(w.subject),
                    Cell::new(&w.concept),
                    Cell::new(format!("{:.2}", w.mean_questions)),
                    Cell::new(format!("{:.3}", w.weight)),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}
