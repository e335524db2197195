use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::extractors::AppJson;
use crate::models::quiz::{
    StartQuizRequest, StartQuizResponse, SubmitAnswerRequest, TicketPreview, TicketQuery,
};
use crate::services::quiz_service::{QuizError, QuizService};
use crate::services::ticket_store::StoreError;
use crate::services::AppState;

/// GET /api/v1/student/ticket?ticket_id=... - Entry point behind the shareable
/// link. Fails closed: no parameter and unknown IDs both block progress.
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicketQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ticket_id = query.ticket_id.filter(|id| !id.trim().is_empty()).ok_or((
        StatusCode::BAD_REQUEST,
        "No ticket ID provided. Please use a valid exit ticket link.".to_string(),
    ))?;

    let ticket = state
        .store
        .get_ticket(&ticket_id)
        .await
        .map_err(|e| match e {
            StoreError::UnknownTicket(_) => (
                StatusCode::NOT_FOUND,
                "Invalid ticket ID. Please check the link.".to_string(),
            ),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    Ok(Json(TicketPreview {
        ticket_id,
        name: ticket.name,
        question_count: ticket.questions.len(),
    }))
}

/// POST /api/v1/student/sessions - Start a quiz run on a ticket
pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StartQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let service = QuizService::new(state.store.clone(), state.sessions.clone());

    let (session_id, view) = service
        .start(&req.ticket_id, &req.student_name)
        .await
        .map_err(quiz_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse { session_id, view }),
    ))
}

/// GET /api/v1/student/sessions/:id - Current view of a quiz run
pub async fn get_quiz_view(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = QuizService::new(state.store.clone(), state.sessions.clone());

    let view = service
        .view(&session_id)
        .await
        .map_err(quiz_error_response)?;

    Ok(Json(view))
}

/// POST /api/v1/student/sessions/:id/answers - Answer the current question
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let service = QuizService::new(state.store.clone(), state.sessions.clone());

    let view = service
        .submit_answer(&session_id, &req.answer)
        .await
        .map_err(quiz_error_response)?;

    Ok(Json(view))
}

/// POST /api/v1/student/sessions/:id/next - Move past the current feedback;
/// after the last question this persists the submission and completes the run
pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = QuizService::new(state.store.clone(), state.sessions.clone());

    let view = service
        .advance(&session_id)
        .await
        .map_err(quiz_error_response)?;

    Ok(Json(view))
}

/// POST /api/v1/student/sessions/:id/back - Reopen the current question
pub async fn back_to_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = QuizService::new(state.store.clone(), state.sessions.clone());

    let view = service
        .back(&session_id)
        .await
        .map_err(quiz_error_response)?;

    Ok(Json(view))
}

fn quiz_error_response(error: QuizError) -> (StatusCode, String) {
    let status = match &error {
        QuizError::SessionNotFound | QuizError::UnknownTicket(_) => StatusCode::NOT_FOUND,
        QuizError::InvalidAnswer(_) => StatusCode::BAD_REQUEST,
        QuizError::NoAnswerSubmitted | QuizError::NoFeedbackShown | QuizError::AlreadyCompleted => {
            StatusCode::CONFLICT
        }
        QuizError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Quiz transition failed: {}", error);
    }

    (status, error.to_string())
}
