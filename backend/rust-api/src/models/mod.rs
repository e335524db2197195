use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Number of questions every exit ticket carries.
pub const QUESTIONS_PER_TICKET: usize = 3;

/// Option labels every question must offer, in order.
pub const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// A single multiple-choice question as produced by the generator.
///
/// `options` maps label (A..D) to answer text; `correct_answer` must be one of
/// the labels present in `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub correct_answer: String,
    pub explanation: String,
}

/// An exit ticket as stored on disk. The ticket ID is the key in the store
/// document, not a field of the ticket itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub name: String,
    pub questions: Vec<Question>,
    pub submissions: Vec<Submission>,
    pub created_at: DateTime<Utc>,
}

/// One student's recorded quiz run. `answers` and `correctness` are keyed by
/// question index rendered as a string ("0", "1", "2"). Within a ticket the
/// identity key is `student_name`; a retake replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub student_name: String,
    pub answers: BTreeMap<String, String>,
    pub correctness: BTreeMap<String, bool>,
    pub score: u32,
    pub submitted_at: DateTime<Utc>,
}

/// The full contents of the ticket store file: `{"tickets": {<id>: Ticket}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub tickets: BTreeMap<String, Ticket>,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("expected exactly {QUESTIONS_PER_TICKET} questions, got {0}")]
    QuestionCount(usize),
    #[error("question {number} has no text")]
    EmptyQuestion { number: usize },
    #[error("question {number} must offer exactly options A-D, got {got:?}")]
    BadOptions { number: usize, got: Vec<String> },
    #[error("question {number}: correct answer {label:?} is not one of the options")]
    CorrectAnswerMissing { number: usize, label: String },
}

/// Structural checks applied to generator output before a ticket is persisted.
/// Content quality is not checked, only the shape contract.
pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    if questions.len() != QUESTIONS_PER_TICKET {
        return Err(ValidationError::QuestionCount(questions.len()));
    }

    for (index, question) in questions.iter().enumerate() {
        let number = index + 1;

        if question.question.trim().is_empty() {
            return Err(ValidationError::EmptyQuestion { number });
        }

        let labels: Vec<String> = question.options.keys().cloned().collect();
        if !labels.iter().map(|label| label.as_str()).eq(OPTION_LABELS) {
            return Err(ValidationError::BadOptions {
                number,
                got: labels,
            });
        }

        if !question.options.contains_key(&question.correct_answer) {
            return Err(ValidationError::CorrectAnswerMissing {
                number,
                label: question.correct_answer.clone(),
            });
        }
    }

    Ok(())
}

pub mod quiz;
pub mod ticket;
