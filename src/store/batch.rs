//! Batch ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an ingestion batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Batch is currently running
    Running,
    /// Batch committed successfully
    Completed,
    /// Batch failed and was rolled back
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Running => write!(f, "running"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(BatchStatus::Running),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            _ => Err(format!("Invalid batch status: {}", s)),
        }
    }
}

/// Row counts per bucket for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCounts {
    /// Rows read from source files
    pub raw: u64,
    /// Rows that passed validation
    pub valid: u64,
    /// Rows routed to quarantine
    pub quarantined: u64,
    /// Valid rows superseded by a later copy of the same key
    pub duplicates_dropped: u64,
    /// Keys newly inserted into the canonical table
    pub inserted: u64,
    /// Existing keys whose values changed
    pub updated: u64,
}

impl BatchCounts {
    /// Rows the merge actually wrote
    pub fn upserted(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// A batch ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    /// Unique batch identifier
    pub id: String,
    /// Source directory read by the batch
    pub source_path: String,
    /// SHA-256 over the source files' names and contents
    pub source_digest: String,
    pub status: BatchStatus,
    /// Number of source files read
    pub files_total: u64,
    pub counts: BatchCounts,
    /// Ingestion timestamp shared by the batch's rows
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message if failed
    pub error_message: Option<String>,
}

impl BatchRecord {
    /// Create a running batch
    pub fn new(
        id: impl Into<String>,
        source_path: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            source_path: source_path.into(),
            source_digest: String::new(),
            status: BatchStatus::Running,
            files_total: 0,
            counts: BatchCounts::default(),
            started_at,
            completed_at: None,
            error_message: None,
        }
    }

    /// Generate a new batch ID
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Mark the batch as completed
    pub fn complete(&mut self) {
        self.status = BatchStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.error_message = None;
    }

    /// Mark the batch as failed
    pub fn fail(&mut self, error: &str) {
        self.status = BatchStatus::Failed;
        self.error_message = Some(error.to_string());
        self.completed_at = Some(Utc::now());
    }

    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}
