use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Question, Submission};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Please enter an exit ticket name."
    ))]
    pub name: String,

    /// Main topics, concepts and key points covered in the lecture.
    #[validate(length(min = 1, message = "Please enter lecture topics."))]
    pub topics: String,

    /// Extra generation instructions appended to the prompt (optional).
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Faculty see the generated questions in full, answers included.
#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub ticket_id: String,
    pub name: String,
    pub questions: Vec<Question>,
    pub share_url: String,
}

/// List row for the results selector.
#[derive(Debug, Serialize)]
pub struct TicketSummary {
    pub ticket_id: String,
    pub name: String,
    pub question_count: usize,
    pub submission_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TicketResultsResponse {
    pub ticket_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
    pub submissions: Vec<Submission>,
}
