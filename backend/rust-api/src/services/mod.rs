use crate::config::Config;
use crate::models::quiz::QuizSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use question_generator::QuestionGenerator;
use ticket_store::TicketStore;

/// In-flight quiz runs, keyed by session ID. Shared across handlers; every
/// transition takes the write guard so racing requests on one session
/// serialize. Completed sessions stay resident so results can be re-reviewed;
/// a student's earlier run is pruned only when they restart the same ticket,
/// so sessions abandoned under a different name live until process exit.
pub type SessionMap = Arc<RwLock<HashMap<String, QuizSession>>>;

pub struct AppState {
    pub config: Config,
    pub store: TicketStore,
    pub generator: QuestionGenerator,
    pub sessions: SessionMap,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = TicketStore::new(&config.data_file);
        let generator = QuestionGenerator::new(&config);

        Self {
            config,
            store,
            generator,
            sessions: SessionMap::default(),
        }
    }
}

pub mod question_generator;
pub mod quiz_service;
pub mod scoring;
pub mod ticket_store;
