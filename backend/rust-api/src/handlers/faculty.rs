use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::extractors::AppJson;
use crate::metrics::EXIT_TICKETS_CREATED_TOTAL;
use crate::models::ticket::{
    CreateTicketRequest, CreateTicketResponse, TicketResultsResponse, TicketSummary,
};
use crate::models::{validate_questions, Ticket};
use crate::services::question_generator::GenerationError;
use crate::services::ticket_store::StoreError;
use crate::services::AppState;

/// Instruction suggestions the faculty form offers for the optional prompt
/// field.
const PROMPT_SUGGESTIONS: [&str; 5] = [
    "Focus on conceptual understanding",
    "Include at least one calculation-based question",
    "Emphasize real-world applications",
    "Ask about common misconceptions",
    "Include a question that requires critical thinking",
];

/// POST /api/v1/faculty/tickets - Generate questions and persist a new exit ticket
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateTicketRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!("Creating exit ticket {:?}", req.name);

    let questions = state
        .generator
        .generate(&req.topics, req.instructions.as_deref().unwrap_or(""))
        .await
        .map_err(generation_error_response)?;

    validate_questions(&questions)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let ticket_id = Uuid::new_v4().to_string();
    let ticket = Ticket {
        name: req.name.clone(),
        questions: questions.clone(),
        submissions: Vec::new(),
        created_at: Utc::now(),
    };

    state
        .store
        .save_ticket(&ticket_id, ticket)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    EXIT_TICKETS_CREATED_TOTAL.inc();
    tracing::info!("Exit ticket {} created ({:?})", ticket_id, req.name);

    let response = CreateTicketResponse {
        share_url: share_url(&state.config.app_url, &ticket_id),
        ticket_id,
        name: req.name,
        questions,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/faculty/tickets - List tickets for the results selector, newest first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state
        .store
        .load()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut summaries: Vec<TicketSummary> = document
        .tickets
        .into_iter()
        .map(|(ticket_id, ticket)| TicketSummary {
            ticket_id,
            name: ticket.name,
            question_count: ticket.questions.len(),
            submission_count: ticket.submissions.len(),
            created_at: ticket.created_at,
        })
        .collect();
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(summaries))
}

/// GET /api/v1/faculty/tickets/:id/results - Full ticket with all submissions.
/// A ticket nobody has taken yet returns an empty submission list, not an error.
pub async fn get_ticket_results(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ticket = state
        .store
        .get_ticket(&ticket_id)
        .await
        .map_err(store_error_response)?;

    Ok(Json(TicketResultsResponse {
        ticket_id,
        name: ticket.name,
        created_at: ticket.created_at,
        questions: ticket.questions,
        submissions: ticket.submissions,
    }))
}

/// GET /api/v1/faculty/tickets/:id/results/export - Results table as a CSV download
pub async fn export_ticket_results(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let ticket = state
        .store
        .get_ticket(&ticket_id)
        .await
        .map_err(store_error_response)?;

    let mut csv = String::from("student_name");
    for number in 1..=ticket.questions.len() {
        csv.push_str(&format!(",q{number}_answer,q{number}_result"));
    }
    csv.push_str(",score\n");

    for submission in &ticket.submissions {
        csv.push_str(&escape_csv(&submission.student_name));
        for index in 0..ticket.questions.len() {
            let key = index.to_string();
            let answer = submission.answers.get(&key).map(String::as_str).unwrap_or("");
            let result = match submission.correctness.get(&key) {
                Some(true) => "Correct",
                _ => "Incorrect",
            };
            csv.push_str(&format!(",{},{}", escape_csv(answer), result));
        }
        csv.push_str(&format!(
            ",{}/{}\n",
            submission.score,
            ticket.questions.len()
        ));
    }

    let mut response = Response::new(csv.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"exit-ticket-results.csv\""),
    );

    Ok(response)
}

/// GET /api/v1/faculty/prompt-suggestions
pub async fn prompt_suggestions() -> impl IntoResponse {
    Json(json!({ "suggestions": PROMPT_SUGGESTIONS }))
}

fn share_url(app_url: &str, ticket_id: &str) -> String {
    match Url::parse(app_url) {
        Ok(mut url) => {
            url.set_path("/student");
            url.query_pairs_mut().append_pair("ticket_id", ticket_id);
            url.to_string()
        }
        // A relative or otherwise odd app_url still yields a usable link
        Err(_) => format!("{}/student?ticket_id={}", app_url, ticket_id),
    }
}

fn generation_error_response(error: GenerationError) -> (StatusCode, String) {
    tracing::error!("Question generation failed: {}", error);

    // The raw model output is surfaced on purpose so faculty can see what the
    // model actually returned when it breaks the JSON contract.
    let message = match &error {
        GenerationError::MalformedJson { raw, source } => format!(
            "The model returned malformed JSON ({}). Raw response:\n{}",
            source, raw
        ),
        other => other.to_string(),
    };

    (StatusCode::BAD_GATEWAY, message)
}

fn store_error_response(error: StoreError) -> (StatusCode, String) {
    match error {
        StoreError::UnknownTicket(_) => (
            StatusCode::NOT_FOUND,
            "Exit ticket not found.".to_string(),
        ),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn escape_csv(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("\"{}\"", value.replace('"', "\"\""))
    }
}
