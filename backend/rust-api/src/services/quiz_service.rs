use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::{
    ANSWERS_SUBMITTED_TOTAL, QUIZ_SESSIONS_ACTIVE, QUIZ_SESSIONS_TOTAL,
    SUBMISSIONS_RECORDED_TOTAL,
};
use crate::models::quiz::{QuestionReview, QuizPhase, QuizSession, QuizView};
use crate::models::Submission;
use crate::services::scoring;
use crate::services::ticket_store::{StoreError, TicketStore};
use crate::services::SessionMap;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("Quiz session not found")]
    SessionNotFound,
    #[error("Invalid ticket ID. Please check the link.")]
    UnknownTicket(String),
    #[error("Answer {0:?} is not one of the options for this question")]
    InvalidAnswer(String),
    #[error("Submit an answer before moving on")]
    NoAnswerSubmitted,
    #[error("No feedback is on screen to go back from")]
    NoFeedbackShown,
    #[error("This quiz has already been completed")]
    AlreadyCompleted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives a student's run through an exit ticket.
///
/// The whole run is a phase value moved through Answering -> Feedback ->
/// Answering ... -> Completed. Every transition happens under the session
/// map's write guard, so two requests racing on one session serialize. The
/// ticket store is touched exactly once, on the completing transition.
pub struct QuizService {
    store: TicketStore,
    sessions: SessionMap,
}

impl QuizService {
    pub fn new(store: TicketStore, sessions: SessionMap) -> Self {
        Self { store, sessions }
    }

    /// Resolves the ticket, snapshots its questions and opens a session at
    /// the first question.
    pub async fn start(
        &self,
        ticket_id: &str,
        student_name: &str,
    ) -> Result<(String, QuizView), QuizError> {
        let document = self.store.load().await?;
        let ticket = document
            .tickets
            .get(ticket_id)
            .ok_or_else(|| QuizError::UnknownTicket(ticket_id.to_string()))?;

        let session = QuizSession {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            ticket_name: ticket.name.clone(),
            student_name: student_name.trim().to_string(),
            questions: ticket.questions.clone(),
            answers: Default::default(),
            phase: QuizPhase::Answering { index: 0 },
            started_at: Utc::now(),
        };

        let session_id = session.id.clone();
        let view = build_view(&session);
        {
            let mut sessions = self.sessions.write().await;
            // A restart supersedes the student's earlier run on this ticket;
            // dropping it here keeps abandoned sessions from accumulating.
            sessions.retain(|_, existing| {
                let superseded = existing.ticket_id == session.ticket_id
                    && existing.student_name == session.student_name;
                if superseded && existing.phase != QuizPhase::Completed {
                    QUIZ_SESSIONS_ACTIVE.dec();
                }
                !superseded
            });
            sessions.insert(session_id.clone(), session);
        }

        QUIZ_SESSIONS_TOTAL.with_label_values(&["started"]).inc();
        QUIZ_SESSIONS_ACTIVE.inc();

        tracing::info!(
            "Quiz session {} started for ticket {} by {}",
            session_id,
            ticket_id,
            student_name
        );

        Ok((session_id, view))
    }

    pub async fn view(&self, session_id: &str) -> Result<QuizView, QuizError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(session_id).ok_or(QuizError::SessionNotFound)?;
        Ok(build_view(session))
    }

    /// Records an answer for the current question and moves to its feedback.
    /// Valid while answering and also while feedback is on screen, where a
    /// re-submission overwrites the recorded answer.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        answer: &str,
    ) -> Result<QuizView, QuizError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or(QuizError::SessionNotFound)?;

        let index = match session.phase {
            QuizPhase::Answering { index } | QuizPhase::Feedback { index } => index,
            QuizPhase::Completed => return Err(QuizError::AlreadyCompleted),
        };

        let question = &session.questions[index];
        if !question.options.contains_key(answer) {
            return Err(QuizError::InvalidAnswer(answer.to_string()));
        }

        let correct = question.correct_answer == answer;
        session.answers.insert(index.to_string(), answer.to_string());
        session.phase = QuizPhase::Feedback { index };

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[if correct { "true" } else { "false" }])
            .inc();

        tracing::info!(
            "Answer recorded: session={}, question={}, correct={}",
            session_id,
            index + 1,
            correct
        );

        Ok(build_view(session))
    }

    /// Moves off the current feedback, either to the next question or, after
    /// the last one, into Completed. Completion persists the submission
    /// before the phase flips, so a failed write leaves the session on the
    /// last feedback and the student can press next again. Once completed,
    /// further calls just return the results view and persist nothing.
    pub async fn advance(&self, session_id: &str) -> Result<QuizView, QuizError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or(QuizError::SessionNotFound)?;

        match session.phase {
            QuizPhase::Answering { .. } => Err(QuizError::NoAnswerSubmitted),
            QuizPhase::Completed => Ok(build_view(session)),
            QuizPhase::Feedback { index } if index + 1 < session.questions.len() => {
                session.phase = QuizPhase::Answering { index: index + 1 };
                Ok(build_view(session))
            }
            QuizPhase::Feedback { .. } => {
                let submission = build_submission(session);
                let score = submission.score;

                self.store
                    .append_submission(&session.ticket_id, submission)
                    .await?;
                session.phase = QuizPhase::Completed;

                SUBMISSIONS_RECORDED_TOTAL.inc();
                QUIZ_SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
                QUIZ_SESSIONS_ACTIVE.dec();

                tracing::info!(
                    "Quiz completed: session={}, student={}, score={}/{}",
                    session.id,
                    session.student_name,
                    score,
                    session.questions.len()
                );

                Ok(build_view(session))
            }
        }
    }

    /// Hides the feedback and reopens the current question's answer form.
    /// The recorded answer stays in place until re-submitted over.
    pub async fn back(&self, session_id: &str) -> Result<QuizView, QuizError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or(QuizError::SessionNotFound)?;

        match session.phase {
            QuizPhase::Feedback { index } => {
                session.phase = QuizPhase::Answering { index };
                Ok(build_view(session))
            }
            QuizPhase::Answering { .. } => Err(QuizError::NoFeedbackShown),
            QuizPhase::Completed => Err(QuizError::AlreadyCompleted),
        }
    }
}

fn build_submission(session: &QuizSession) -> Submission {
    let (correctness, score) = scoring::score(&session.questions, &session.answers);
    Submission {
        student_name: session.student_name.clone(),
        answers: session.answers.clone(),
        correctness,
        score,
        submitted_at: Utc::now(),
    }
}

fn build_view(session: &QuizSession) -> QuizView {
    let question_count = session.questions.len();

    match session.phase {
        QuizPhase::Answering { index } => {
            let question = &session.questions[index];
            QuizView::Answering {
                ticket_name: session.ticket_name.clone(),
                question_number: index + 1,
                question_count,
                question: question.question.clone(),
                options: question.options.clone(),
                selected_answer: session.answers.get(&index.to_string()).cloned(),
            }
        }
        QuizPhase::Feedback { index } => {
            let question = &session.questions[index];
            let your_answer = session
                .answers
                .get(&index.to_string())
                .cloned()
                .unwrap_or_default();
            let correct = your_answer == question.correct_answer;

            QuizView::Feedback {
                ticket_name: session.ticket_name.clone(),
                question_number: index + 1,
                question_count,
                question: question.question.clone(),
                options: question.options.clone(),
                your_answer,
                correct,
                correct_answer: question.correct_answer.clone(),
                correct_answer_text: question
                    .options
                    .get(&question.correct_answer)
                    .cloned()
                    .unwrap_or_default(),
                explanation: question.explanation.clone(),
            }
        }
        QuizPhase::Completed => {
            let (correctness, score) = scoring::score(&session.questions, &session.answers);
            let review = session
                .questions
                .iter()
                .enumerate()
                .map(|(index, question)| QuestionReview {
                    question: question.question.clone(),
                    options: question.options.clone(),
                    your_answer: session.answers.get(&index.to_string()).cloned(),
                    correct_answer: question.correct_answer.clone(),
                    correct: correctness.get(&index.to_string()).copied().unwrap_or(false),
                    explanation: question.explanation.clone(),
                })
                .collect();

            QuizView::Completed {
                ticket_name: session.ticket_name.clone(),
                score,
                question_count,
                score_percent: if question_count == 0 {
                    0.0
                } else {
                    (score as f64 / question_count as f64) * 100.0
                },
                review,
            }
        }
    }
}
