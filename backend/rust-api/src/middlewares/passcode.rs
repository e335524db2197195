use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::services::AppState;

pub const PASSCODE_HEADER: &str = "x-faculty-passcode";

/// Faculty gate: every faculty route requires the shared passcode in the
/// `x-faculty-passcode` header, compared by exact string match. There are no
/// accounts or roles behind it.
pub async fn faculty_passcode_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let presented = request
        .headers()
        .get(PASSCODE_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(passcode) if passcode == state.config.faculty_passcode => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            tracing::warn!("Faculty request rejected: incorrect passcode");
            Err((
                StatusCode::UNAUTHORIZED,
                "Incorrect passcode. Please try again.".to_string(),
            ))
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            "Faculty passcode required.".to_string(),
        )),
    }
}
