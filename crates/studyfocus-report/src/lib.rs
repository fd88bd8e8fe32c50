//! studyfocus-report: HTML score reports and CSV exports.

pub mod export;
pub mod html;
