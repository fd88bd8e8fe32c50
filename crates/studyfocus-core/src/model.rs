//! Core data model types for studyfocus.
//!
//! These are the fundamental types the pipeline works on: the raw rows read
//! from an export, the cleaned per-question answer records, and the roster
//! mapping student ids back to identities.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Student identifier, assigned by first-seen order within one batch.
pub type StudentId = u32;

/// Answer text recorded when a student left a question unanswered.
pub const BLANK_ANSWER: &str = "BLANK";

/// Test subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Reading,
    Sentence,
    Writing,
}

impl Subject {
    /// Every subject, in report order.
    pub const ALL: [Subject; 4] = [
        Subject::Sentence,
        Subject::Reading,
        Subject::Math,
        Subject::Writing,
    ];

    /// Section heading used in score reports.
    pub fn title(&self) -> &'static str {
        match self {
            Subject::Math => "Math",
            Subject::Reading => "Reading Comprehension",
            Subject::Writing => "Writing",
            Subject::Sentence => "Sentence Completion",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Math => write!(f, "math"),
            Subject::Reading => write!(f, "reading"),
            Subject::Writing => write!(f, "writing"),
            Subject::Sentence => write!(f, "sentence"),
        }
    }
}

impl FromStr for Subject {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "reading" => Ok(Subject::Reading),
            "writing" => Ok(Subject::Writing),
            "sentence" => Ok(Subject::Sentence),
            other => Err(PipelineError::UnknownSubject(other.to_string())),
        }
    }
}

/// Question difficulty tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "med" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(PipelineError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// A response row as read from the export, before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Values of the configured identity columns, in configuration order.
    pub identity: Vec<String>,
    pub test_id: String,
    pub question_number: u32,
    pub section_number: u32,
    pub subject: String,
    pub concept: String,
    pub difficulty: String,
    pub student_answer: String,
    /// `None` when the answer key cell was empty.
    pub correct_answer: Option<String>,
    pub test_date: Option<NaiveDate>,
}

/// One student's response to one question, after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub student_id: StudentId,
    pub test_id: String,
    pub question_number: u32,
    pub section_number: u32,
    pub subject: Subject,
    /// Concept tag, already remapped to its broad concept when a mapping exists.
    pub concept: String,
    pub difficulty: Difficulty,
    pub student_answer: String,
    pub correct_answer: String,
    pub test_date: Option<NaiveDate>,
    /// Number of concept tags attached to this question instance.
    pub num_concepts: u32,
}

impl AnswerRecord {
    /// Whether the student's answer matches the key.
    pub fn is_correct(&self) -> bool {
        self.student_answer == self.correct_answer
    }

    /// Whether the question was left unanswered.
    pub fn is_blank(&self) -> bool {
        self.student_answer.is_empty() || self.student_answer == BLANK_ANSWER
    }
}

/// A student known to the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Identity key values, e.g. first and last name.
    pub identity: Vec<String>,
}

impl Student {
    /// Display name, identity values joined by spaces.
    pub fn display_name(&self) -> String {
        self.identity.join(" ")
    }

    /// Name fragment safe to embed in file names.
    pub fn file_stem(&self) -> String {
        self.identity
            .iter()
            .map(|part| {
                part.chars()
                    .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Students of one batch, indexed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    students: Vec<Student>,
    ids: HashMap<Vec<String>, StudentId>,
}

impl Roster {
    /// Register an identity, returning its id. Ids are handed out in
    /// first-seen order and are stable for repeated identities.
    pub(crate) fn register(&mut self, identity: &[String]) -> StudentId {
        if let Some(&id) = self.ids.get(identity) {
            return id;
        }
        let id = self.students.len() as StudentId;
        self.ids.insert(identity.to_vec(), id);
        self.students.push(Student {
            id,
            identity: identity.to_vec(),
        });
        id
    }

    pub fn get(&self, id: StudentId) -> Option<&Student> {
        self.students.get(id as usize)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}
