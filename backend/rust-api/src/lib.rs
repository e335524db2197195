use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // The quiz form is typically served from a separate origin, so the
    // student routes answer cross-origin requests.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to the quiz form origin in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Student endpoints (public; the shareable link is the only gate)
        .nest("/api/v1/student", student_routes().layer(cors))
        // Faculty endpoints (shared passcode)
        .nest(
            "/api/v1/faculty",
            faculty_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::passcode::faculty_passcode_middleware,
            )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn student_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/ticket", get(handlers::student::get_ticket))
        .route("/sessions", post(handlers::student::start_quiz))
        .route("/sessions/{id}", get(handlers::student::get_quiz_view))
        .route(
            "/sessions/{id}/answers",
            post(handlers::student::submit_answer),
        )
        .route("/sessions/{id}/next", post(handlers::student::next_question))
        .route(
            "/sessions/{id}/back",
            post(handlers::student::back_to_question),
        )
}

fn faculty_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/tickets",
            get(handlers::faculty::list_tickets).post(handlers::faculty::create_ticket),
        )
        .route(
            "/tickets/{id}/results",
            get(handlers::faculty::get_ticket_results),
        )
        .route(
            "/tickets/{id}/results/export",
            get(handlers::faculty::export_ticket_results),
        )
        .route(
            "/prompt-suggestions",
            get(handlers::faculty::prompt_suggestions),
        )
}
