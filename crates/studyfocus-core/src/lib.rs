//! studyfocus-core: answer-record model, aggregation, and recommendations.
//!
//! Raw response exports are cleaned into [`model::AnswerRecord`]s, grouped
//! with [`aggregate::group_by`], and turned into per-student performance,
//! class averages, concept weights, and ranked study recommendations.

pub mod aggregate;
pub mod breakdown;
pub mod class_average;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod performance;
pub mod prep;
pub mod recommend;
pub mod report;
pub mod trends;
pub mod weights;
