use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::Question;

/// Where a quiz run currently is. Carried as a value inside the session so
/// progression is explicit instead of scattered over mutable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Question `index` is on screen and the answer form is open.
    Answering { index: usize },
    /// Question `index` has a recorded answer and its feedback is on screen.
    Feedback { index: usize },
    /// All questions answered and the submission has been persisted.
    Completed,
}

/// One student's in-flight quiz run. Lives only in memory; nothing is written
/// to the ticket store until the run completes. `answers` is keyed by question
/// index rendered as a string, matching the stored submission shape.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: String,
    pub ticket_id: String,
    pub ticket_name: String,
    pub student_name: String,
    pub questions: Vec<Question>,
    pub answers: BTreeMap<String, String>,
    pub phase: QuizPhase,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    pub ticket_id: Option<String>,
}

/// Entry-point payload behind the shareable link. Question material is not
/// included; it is only revealed one question at a time through a session.
#[derive(Debug, Serialize)]
pub struct TicketPreview {
    pub ticket_id: String,
    pub name: String,
    pub question_count: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(length(min = 1, message = "No ticket ID provided. Please use a valid exit ticket link."))]
    pub ticket_id: String,
    #[validate(length(min = 1, max = 100, message = "Please enter your name."))]
    pub student_name: String,
}

#[derive(Debug, Serialize)]
pub struct StartQuizResponse {
    pub session_id: String,
    pub view: QuizView,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, message = "Select your answer."))]
    pub answer: String,
}

/// What the student client renders for the current phase. Unanswered material
/// never appears: answering views carry only the open question, feedback views
/// reveal that question's answer, and the full review appears once completed.
#[derive(Debug, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum QuizView {
    Answering {
        ticket_name: String,
        question_number: usize,
        question_count: usize,
        question: String,
        options: BTreeMap<String, String>,
        /// Present after "back to question"; the previously recorded answer.
        selected_answer: Option<String>,
    },
    Feedback {
        ticket_name: String,
        question_number: usize,
        question_count: usize,
        question: String,
        options: BTreeMap<String, String>,
        your_answer: String,
        correct: bool,
        correct_answer: String,
        correct_answer_text: String,
        explanation: String,
    },
    Completed {
        ticket_name: String,
        score: u32,
        question_count: usize,
        score_percent: f64,
        review: Vec<QuestionReview>,
    },
}

#[derive(Debug, Serialize)]
pub struct QuestionReview {
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub your_answer: Option<String>,
    pub correct_answer: String,
    pub correct: bool,
    pub explanation: String,
}
