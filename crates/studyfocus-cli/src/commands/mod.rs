pub mod class;
pub mod init;
pub mod report;
pub mod validate;
pub mod weights;

use std::path::Path;

use anyhow::Result;

use studyfocus_core::config::StudyfocusConfig;
use studyfocus_core::loader::{load_concept_map, load_responses};
use studyfocus_core::prep::{prepare, ConceptMap, Prepared};

/// Load and clean a response export with the configured concept map.
pub fn load_batch(responses: &Path, config: &StudyfocusConfig) -> Result<Prepared> {
    let concepts = match &config.concepts.map_file {
        Some(path) => load_concept_map(path, &config.concepts.excluded)?,
        None => ConceptMap::new().with_excluded(config.concepts.excluded.iter().cloned()),
    };
    let raw = load_responses(responses, &config.identity_columns)?;
    let prepared = prepare(raw, &concepts)?;
    let excluded = config.weights.excluded_in(&prepared.records);
    if !excluded.is_empty() {
        tracing::warn!("excluding tests from concept weights: {}", excluded.join(", "));
    }
    tracing::info!(
        records = prepared.summary.records,
        students = prepared.summary.students,
        "loaded {}",
        responses.display()
    );
    Ok(prepared)
}
