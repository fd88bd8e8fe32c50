//! studyfocus configuration.
//!
//! Every lookup table the pipeline depends on (excluded tests, excluded
//! concepts, identity columns, thresholds) lives here and is passed to the
//! components explicitly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Subject;
use crate::performance::DEFAULT_PASSING_THRESHOLD;
use crate::recommend::{default_limit, FocusOptions};
use crate::weights::WeightConfig;

/// Top-level studyfocus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyfocusConfig {
    /// Raw columns that together identify a student.
    #[serde(default = "default_identity_columns")]
    pub identity_columns: Vec<String>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub weights: WeightConfig,
    #[serde(default)]
    pub focus: FocusOptions,
    #[serde(default)]
    pub opportunity: OpportunityConfig,
    #[serde(default)]
    pub concepts: ConceptConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// General scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Passing threshold for performance tables outside the focus ranking.
    #[serde(default = "default_passing_threshold")]
    pub passing_threshold: f64,
}

/// Opportunity and careless-error list settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Concept remapping settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptConfig {
    /// Broad concepts dropped from the data entirely.
    #[serde(default)]
    pub excluded: Vec<String>,
    /// CSV with `concept,subject,broad_concept` rows.
    #[serde(default)]
    pub map_file: Option<PathBuf>,
}

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Subjects in report order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<Subject>,
}

fn default_identity_columns() -> Vec<String> {
    vec!["firstName".to_string(), "lastName".to_string()]
}
fn default_passing_threshold() -> f64 {
    DEFAULT_PASSING_THRESHOLD
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./studyfocus-reports")
}
fn default_subjects() -> Vec<Subject> {
    Subject::ALL.to_vec()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passing_threshold: default_passing_threshold(),
        }
    }
}

impl Default for OpportunityConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            subjects: default_subjects(),
        }
    }
}

impl Default for StudyfocusConfig {
    fn default() -> Self {
        Self {
            identity_columns: default_identity_columns(),
            pipeline: PipelineConfig::default(),
            weights: WeightConfig::default(),
            focus: FocusOptions::default(),
            opportunity: OpportunityConfig::default(),
            concepts: ConceptConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl StudyfocusConfig {
    /// Check values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.identity_columns.is_empty(),
            "identity_columns must name at least one column"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.pipeline.passing_threshold),
            "pipeline.passing_threshold must be between 0.0 and 1.0"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.focus.passing_threshold),
            "focus.passing_threshold must be between 0.0 and 1.0"
        );
        anyhow::ensure!(self.focus.limit >= 1, "focus.limit must be at least 1");
        anyhow::ensure!(
            self.opportunity.limit >= 1,
            "opportunity.limit must be at least 1"
        );
        Ok(())
    }
}

/// Load config from an explicit path, or `studyfocus.toml` in the current
/// directory, or fall back to defaults.
///
/// `STUDYFOCUS_OUTPUT_DIR` overrides `report.output_dir`.
pub fn load_config_from(path: Option<&Path>) -> Result<StudyfocusConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("studyfocus.toml");
        local.exists().then_some(local)
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let mut config = toml::from_str::<StudyfocusConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            // a relative map file is relative to the config file
            if let (Some(map), Some(dir)) = (config.concepts.map_file.as_mut(), path.parent()) {
                if map.is_relative() {
                    *map = dir.join(&*map);
                }
            }
            config
        }
        None => StudyfocusConfig::default(),
    };

    if let Ok(dir) = std::env::var("STUDYFOCUS_OUTPUT_DIR") {
        config.report.output_dir = PathBuf::from(dir);
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StudyfocusConfig::default();
        assert_eq!(config.identity_columns, vec!["firstName", "lastName"]);
        assert_eq!(config.focus.min_wrong, 5);
        assert!((config.focus.passing_threshold - 0.6).abs() < f64::EPSILON);
        assert!((config.pipeline.passing_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.opportunity.limit, 5);
        assert!(config.weights.excludes("YL_3_BB_SAT"));
        assert_eq!(config.report.subjects.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
identity_columns = ["email"]

[focus]
min_wrong = 3

[weights]
excluded_tests = ["SHORT"]

[concepts]
excluded = ["untagged"]

[report]
subjects = ["math", "reading"]
"#;
        let config: StudyfocusConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.identity_columns, vec!["email"]);
        assert_eq!(config.focus.min_wrong, 3);
        assert_eq!(config.focus.limit, 5);
        assert!(config.weights.excludes("YL_SHORT_1"));
        assert!(!config.weights.excludes("YL_3_BB_SAT"));
        assert_eq!(config.concepts.excluded, vec!["untagged"]);
        assert_eq!(config.report.subjects, vec![Subject::Math, Subject::Reading]);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let mut config = StudyfocusConfig::default();
        config.focus.passing_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_path_fails() {
        let result = load_config_from(Some(Path::new("/nonexistent/studyfocus.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn map_file_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studyfocus.toml");
        std::fs::write(&path, "[concepts]\nmap_file = \"concepts.csv\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.concepts.map_file, Some(dir.path().join("concepts.csv")));
    }
}
