use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Server-reported lifecycle state of a bulk job.
///
/// `Pending` and `Processing` mean the server is still working on the job;
/// every other status is terminal for automatic processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    PartiallyFailed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::PartiallyFailed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn can_cancel(self) -> bool {
        self.is_active()
    }

    /// `PartiallyFailed` is terminal but its failed items can be resubmitted.
    pub fn can_retry(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::PartiallyFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::PartiallyFailed => "partially_failed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown job status: {}", s))
    }
}

/// A command the client may request for a job, depending on its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    Cancel,
    RetryFailed,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobAction::Cancel => f.write_str("cancel"),
            JobAction::RetryFailed => f.write_str("retry-failed"),
        }
    }
}

/// Read-only snapshot of a server-owned bulk job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkJob {
    pub id: JobId,
    pub job_type: String,
    pub status: JobStatus,
    pub total_items: u32,
    pub completed_items: u32,
    pub failed_items: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BulkJob {
    pub fn processed_items(&self) -> u32 {
        self.completed_items.saturating_add(self.failed_items)
    }

    pub fn counters_consistent(&self) -> bool {
        u64::from(self.completed_items) + u64::from(self.failed_items) <= u64::from(self.total_items)
    }

    pub fn progress_percent(&self) -> u8 {
        if self.total_items == 0 {
            return 0;
        }
        let pct = u64::from(self.processed_items()) * 100 / u64::from(self.total_items);
        pct.min(100) as u8
    }

    pub fn available_actions(&self) -> Vec<JobAction> {
        let mut actions = Vec::new();
        if self.status.can_cancel() {
            actions.push(JobAction::Cancel);
        }
        if self.status.can_retry() {
            actions.push(JobAction::RetryFailed);
        }
        actions
    }

    pub fn allows(&self, action: JobAction) -> bool {
        match action {
            JobAction::Cancel => self.status.can_cancel(),
            JobAction::RetryFailed => self.status.can_retry(),
        }
    }
}

/// True while at least one job in the set still needs server-side work.
pub fn any_active(jobs: &[BulkJob]) -> bool {
    jobs.iter().any(|job| job.status.is_active())
}

#[cfg(test)]
pub(crate) fn sample_job(id: &str, status: JobStatus) -> BulkJob {
    BulkJob {
        id: JobId::from(id),
        job_type: "outline_generation".to_string(),
        status,
        total_items: 10,
        completed_items: 0,
        failed_items: 0,
        created_at: DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        template_id: None,
        updated_at: None,
    }
}
