//! Pipeline error types.
//!
//! Structural problems with the input (a missing column, a value that cannot
//! be mapped to a known subject) abort the run. Data-quality problems are not
//! errors; they are counted in [`crate::prep::PrepSummary`] instead.

use thiserror::Error;

use crate::aggregate::{Column, Measure};

/// Errors raised by the aggregation and recommendation pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// A grouping key is absent from the input schema.
    #[error("missing column: {column}")]
    MissingColumn { column: Column },

    /// A raw input header is absent.
    #[error("missing input column: {0}")]
    MissingInputColumn(String),

    /// The aggregation column is absent from the input schema.
    #[error("missing aggregation column: {measure}")]
    MissingMeasure { measure: Measure },

    /// A subject outside the known set.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    /// A difficulty label outside the known set.
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

impl PipelineError {
    /// Returns `true` if the error is caused by the shape of the input rather
    /// than by a single bad value.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumn { .. }
                | PipelineError::MissingInputColumn(_)
                | PipelineError::MissingMeasure { .. }
        )
    }
}
