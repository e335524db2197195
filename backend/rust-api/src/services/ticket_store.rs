use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task;

use crate::metrics::track_store_operation;
use crate::models::{StoreDocument, Submission, Ticket};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ticket store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ticket store contains invalid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("unknown ticket id: {0}")]
    UnknownTicket(String),
    #[error("ticket store worker failed: {0}")]
    Worker(#[from] task::JoinError),
}

/// Durable map from ticket ID to ticket, kept in one JSON file.
///
/// Every operation takes an exclusive advisory lock on a companion `.lock`
/// file for the duration of its read-modify-write, serializing all access
/// within this process and across cooperating processes. There is no snapshot
/// isolation between two operations; lock acquisition blocks without a bound.
#[derive(Debug, Clone)]
pub struct TicketStore {
    data_path: PathBuf,
    lock_path: PathBuf,
}

impl TicketStore {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        let lock_path = lock_path_for(&data_path);
        Self {
            data_path,
            lock_path,
        }
    }

    /// Reads the full store document, creating an empty one (and the parent
    /// directory) on first access.
    pub async fn load(&self) -> Result<StoreDocument, StoreError> {
        let store = self.clone();
        track_store_operation("load", async move {
            task::spawn_blocking(move || store.load_blocking()).await?
        })
        .await
    }

    /// Inserts or replaces the ticket under `ticket_id`.
    pub async fn save_ticket(&self, ticket_id: &str, ticket: Ticket) -> Result<(), StoreError> {
        let store = self.clone();
        let ticket_id = ticket_id.to_string();
        track_store_operation("save_ticket", async move {
            task::spawn_blocking(move || store.save_ticket_blocking(&ticket_id, ticket)).await?
        })
        .await
    }

    /// Fetches one ticket, failing closed on unknown IDs.
    pub async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, StoreError> {
        let store = self.clone();
        let ticket_id = ticket_id.to_string();
        track_store_operation("get_ticket", async move {
            task::spawn_blocking(move || {
                let document = store.load_blocking()?;
                document
                    .tickets
                    .get(&ticket_id)
                    .cloned()
                    .ok_or(StoreError::UnknownTicket(ticket_id))
            })
            .await?
        })
        .await
    }

    /// Records a student's run on a ticket. Any earlier submission with the
    /// same `student_name` is dropped first, so a retake fully replaces the
    /// previous record rather than merging with it.
    pub async fn append_submission(
        &self,
        ticket_id: &str,
        submission: Submission,
    ) -> Result<(), StoreError> {
        let store = self.clone();
        let ticket_id = ticket_id.to_string();
        track_store_operation("append_submission", async move {
            task::spawn_blocking(move || store.append_submission_blocking(&ticket_id, submission))
                .await?
        })
        .await
    }

    fn load_blocking(&self) -> Result<StoreDocument, StoreError> {
        let _lock = FileLockGuard::acquire(&self.lock_path)?;
        self.read_document()
    }

    fn save_ticket_blocking(&self, ticket_id: &str, ticket: Ticket) -> Result<(), StoreError> {
        let _lock = FileLockGuard::acquire(&self.lock_path)?;
        let mut document = self.read_document()?;
        document.tickets.insert(ticket_id.to_string(), ticket);
        self.write_document(&document)
    }

    fn append_submission_blocking(
        &self,
        ticket_id: &str,
        submission: Submission,
    ) -> Result<(), StoreError> {
        let _lock = FileLockGuard::acquire(&self.lock_path)?;
        let mut document = self.read_document()?;
        let ticket = document
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| StoreError::UnknownTicket(ticket_id.to_string()))?;

        ticket
            .submissions
            .retain(|existing| existing.student_name != submission.student_name);
        ticket.submissions.push(submission);

        self.write_document(&document)
    }

    /// Caller must hold the file lock.
    fn read_document(&self) -> Result<StoreDocument, StoreError> {
        if !self.data_path.exists() {
            let empty = StoreDocument::default();
            self.write_document(&empty)?;
            return Ok(empty);
        }

        let contents = fs::read_to_string(&self.data_path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Caller must hold the file lock.
    fn write_document(&self, document: &StoreDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.data_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.data_path, serde_json::to_string_pretty(document)?)?;
        Ok(())
    }
}

/// Exclusive advisory lock on the store's companion lock file. Released on
/// drop, so no error path can leak the lock.
struct FileLockGuard {
    file: File,
}

impl FileLockGuard {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).write(true).open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release ticket store lock: {}", e);
        }
    }
}

fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut lock = data_path.as_os_str().to_os_string();
    lock.push(".lock");
    PathBuf::from(lock)
}
