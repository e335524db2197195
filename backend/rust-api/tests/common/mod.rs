use axum::Router;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use exitticket_api::{
    config::Config,
    create_router,
    models::{Question, Ticket},
    services::AppState,
};

pub const FACULTY_PASSCODE: &str = "test-passcode";

/// Config pointing at a per-test temp data dir, so parallel tests never share
/// a store file. The generator base URL points at a closed port on purpose:
/// no test should ever reach the real generation API.
pub fn test_config() -> Config {
    let data_dir = std::env::temp_dir().join(format!("exitticket-test-{}", Uuid::new_v4()));

    Config {
        google_api_key: "test-key".to_string(),
        gemini_model: "gemini-2.0-flash".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        faculty_passcode: FACULTY_PASSCODE.to_string(),
        data_file: data_dir
            .join("exit_tickets.json")
            .to_string_lossy()
            .into_owned(),
        app_url: "http://localhost:8081".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

pub async fn create_test_app() -> (Router, Arc<AppState>) {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let app_state = Arc::new(AppState::new(test_config()));

    (create_router(app_state.clone()), app_state)
}

pub fn sample_questions(correct: [&str; 3]) -> Vec<Question> {
    correct
        .iter()
        .enumerate()
        .map(|(index, label)| Question {
            question: format!("Sample question {}?", index + 1),
            options: BTreeMap::from([
                ("A".to_string(), "First option".to_string()),
                ("B".to_string(), "Second option".to_string()),
                ("C".to_string(), "Third option".to_string()),
                ("D".to_string(), "Fourth option".to_string()),
            ]),
            correct_answer: label.to_string(),
            explanation: "This was covered in the lecture.".to_string(),
        })
        .collect()
}

/// Seeds a ticket straight through the store, bypassing the generator.
pub async fn seed_ticket(state: &AppState, name: &str, correct: [&str; 3]) -> String {
    let ticket_id = Uuid::new_v4().to_string();
    let ticket = Ticket {
        name: name.to_string(),
        questions: sample_questions(correct),
        submissions: Vec::new(),
        created_at: Utc::now(),
    };

    state
        .store
        .save_ticket(&ticket_id, ticket)
        .await
        .expect("Failed to seed test ticket");

    ticket_id
}
