//! CSV ingestion of response exports and concept maps.
//!
//! Headers are resolved to column positions up front, so a missing required
//! column fails the whole load before any row is read.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::error::PipelineError;
use crate::model::{RawResponse, Subject};
use crate::prep::ConceptMap;

/// Accepted header names for each field, preferred name first.
const TEST_ID: &[&str] = &["testID", "name"];
const QUESTION_NUMBER: &[&str] = &["testQuestionNumber"];
const SECTION_NUMBER: &[&str] = &["testSectionNumber"];
const SUBJECT: &[&str] = &["subject"];
const CONCEPT: &[&str] = &["concept", "topic", "name.1"];
const DIFFICULTY: &[&str] = &["difficulty"];
const STUDENT_ANSWER: &[&str] = &["studentAnswer", "Studentsanswer"];
const CORRECT_ANSWER: &[&str] = &["correctAnswer", "CorrectAnswer"];
const TEST_DATE: &[&str] = &["testDate"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

struct HeaderIndex {
    identity: Vec<usize>,
    test_id: usize,
    question_number: usize,
    section_number: usize,
    subject: usize,
    concept: usize,
    difficulty: usize,
    student_answer: usize,
    correct_answer: usize,
    test_date: Option<usize>,
}

fn find(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
}

fn require(headers: &csv::StringRecord, names: &[&str]) -> Result<usize, PipelineError> {
    find(headers, names).ok_or_else(|| PipelineError::MissingInputColumn(names[0].to_string()))
}

impl HeaderIndex {
    fn resolve(
        headers: &csv::StringRecord,
        identity_columns: &[String],
    ) -> Result<Self, PipelineError> {
        let identity = identity_columns
            .iter()
            .map(|c| require(headers, &[c.as_str()]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            identity,
            test_id: require(headers, TEST_ID)?,
            question_number: require(headers, QUESTION_NUMBER)?,
            section_number: require(headers, SECTION_NUMBER)?,
            subject: require(headers, SUBJECT)?,
            concept: require(headers, CONCEPT)?,
            difficulty: require(headers, DIFFICULTY)?,
            student_answer: require(headers, STUDENT_ANSWER)?,
            correct_answer: require(headers, CORRECT_ANSWER)?,
            test_date: find(headers, TEST_DATE),
        })
    }
}

fn cell(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).map(str::trim).unwrap_or("")
}

/// Parse a question or section number. Spreadsheet exports sometimes write
/// whole numbers as `3.0`.
fn parse_number(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Read a response export from `path`.
pub fn load_responses(path: &Path, identity_columns: &[String]) -> Result<Vec<RawResponse>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open responses: {}", path.display()))?;
    parse_responses(file, identity_columns)
        .with_context(|| format!("failed to load responses: {}", path.display()))
}

/// Read a response export from any reader (useful for testing).
pub fn parse_responses<R: Read>(
    reader: R,
    identity_columns: &[String],
) -> Result<Vec<RawResponse>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("failed to read CSV header")?.clone();
    let index = HeaderIndex::resolve(&headers, identity_columns)?;

    let mut rows = Vec::new();
    let mut bad_dates = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("malformed CSV row {}", line + 2))?;

        let number = |i: usize, what: &str| {
            parse_number(cell(&record, i)).with_context(|| {
                format!("row {}: invalid {what}: {:?}", line + 2, cell(&record, i))
            })
        };

        let test_date = match index.test_date.map(|i| cell(&record, i)) {
            Some("") | None => None,
            Some(raw) => {
                let parsed = parse_date(raw);
                bad_dates += parsed.is_none() as usize;
                parsed
            }
        };

        let correct_answer = match cell(&record, index.correct_answer) {
            "" => None,
            key => Some(key.to_string()),
        };

        rows.push(RawResponse {
            identity: index
                .identity
                .iter()
                .map(|&i| cell(&record, i).to_string())
                .collect(),
            test_id: cell(&record, index.test_id).to_string(),
            question_number: number(index.question_number, "testQuestionNumber")?,
            section_number: number(index.section_number, "testSectionNumber")?,
            subject: cell(&record, index.subject).to_string(),
            concept: cell(&record, index.concept).to_string(),
            difficulty: cell(&record, index.difficulty).to_string(),
            student_answer: cell(&record, index.student_answer).to_string(),
            correct_answer,
            test_date,
        });
    }

    if bad_dates > 0 {
        tracing::warn!(rows = bad_dates, "ignored unparseable test dates");
    }
    tracing::debug!(rows = rows.len(), "read response rows");
    Ok(rows)
}

/// Read a concept map CSV with `concept,subject,broad_concept` columns.
pub fn load_concept_map(path: &Path, excluded: &[String]) -> Result<ConceptMap> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open concept map: {}", path.display()))?;
    parse_concept_map(file, excluded)
        .with_context(|| format!("failed to load concept map: {}", path.display()))
}

/// Parse a concept map from any reader.
pub fn parse_concept_map<R: Read>(reader: R, excluded: &[String]) -> Result<ConceptMap> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context("failed to read CSV header")?.clone();
    let concept = require(&headers, &["concept"])?;
    let subject = require(&headers, &["subject"])?;
    let broad = require(&headers, &["broad_concept"])?;

    let mut map = ConceptMap::new().with_excluded(excluded.iter().cloned());
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("malformed CSV row {}", line + 2))?;
        let parsed = cell(&record, subject)
            .parse::<Subject>()
            .with_context(|| format!("row {}", line + 2))?;
        let broad_concept = cell(&record, broad);
        let fine = cell(&record, concept);
        if fine.is_empty() || broad_concept.is_empty() {
            continue;
        }
        map.insert(fine, parsed, broad_concept);
    }
    tracing::debug!(entries = map.len(), "loaded concept map");
    Ok(map)
}
